//! Session errors.

use moltbunker_auth::AuthError;
use moltbunker_protocols::FrameError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised by event stream and exec sessions.
///
/// `Clone` so the last fatal error can be kept for inspection after the
/// receive loop has exited.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Transport failed to open or dropped.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Challenge, signing, or credential rejection.
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthError),

    /// Zero-length or structurally invalid frame or message.
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),

    /// A caller-supplied callback panicked.
    #[error("Callback for '{channel}' failed: {message}")]
    Callback { channel: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not connected")]
    NotConnected,

    /// Session reached its terminal state.
    #[error("Session closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tungstenite::Error> for SessionError {
    fn from(e: tungstenite::Error) -> Self {
        if let tungstenite::Error::Http(ref response) = e {
            let status = response.status().as_u16();
            if status == 401 || status == 403 {
                return SessionError::Authentication(AuthError::Rejected {
                    status,
                    message: "WebSocket upgrade refused".to_string(),
                });
            }
        }
        SessionError::Connection(e.to_string())
    }
}

impl From<url::ParseError> for SessionError {
    fn from(e: url::ParseError) -> Self {
        SessionError::InvalidUrl(e.to_string())
    }
}

impl SessionError {
    /// Whether a reconnect attempt could help.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::Connection(_))
    }
}
