//! Exec terminal session.
//!
//! Binary-framed interactive terminal over the `/exec` endpoint. Each
//! connect fetches and signs a fresh one-time challenge. A dropped
//! connection ends the session; there is no reconnect.
//!
//! Inbound data is consumed either push style ([`ExecSession::on_data`]) or
//! pull style ([`ExecSession::recv`]). Pick one per session: while a data
//! callback is registered, `recv` sees nothing. Without a callback the pull
//! queue is unbounded, so a session that never calls `recv` keeps every
//! payload in memory until it is dropped.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use moltbunker_auth::{ChallengeSigner, MessageSigner, SignedChallenge, WalletSigner};
use moltbunker_config::ExecConfig;
use moltbunker_protocols::ExecMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use crate::endpoint::{Endpoint, exec_url};
use crate::error::SessionError;
use crate::registry::invoke_guarded;
use crate::state::ConnectionState;
use crate::supervisor::{ConnectionSupervisor, Dispatch, Link, SessionHandler, SupervisorConfig};

type DataCallback = Arc<dyn Fn(Bytes) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Exec session settings.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Endpoint path appended to the WebSocket base URL.
    pub path: String,
    pub cols: u16,
    pub rows: u16,
    /// Idle time after the last send before a ping frame is sent.
    pub ping_interval: Duration,
    pub challenge_timeout: Duration,
}

impl Default for ExecOptions {
    fn default() -> Self {
        (&ExecConfig::default()).into()
    }
}

impl From<&ExecConfig> for ExecOptions {
    fn from(config: &ExecConfig) -> Self {
        Self {
            path: config.path.clone(),
            cols: config.cols,
            rows: config.rows,
            ping_interval: config.ping_interval(),
            challenge_timeout: config.challenge_timeout(),
        }
    }
}

/// Result of [`ExecSession::recv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Payload of the next Data frame.
    Data(Bytes),
    /// The session ended and no queued data remains.
    Closed,
    /// Nothing arrived within the timeout.
    Timeout,
}

#[derive(Default)]
struct Callbacks {
    data: Mutex<Option<DataCallback>>,
    error: Mutex<Option<ErrorCallback>>,
}

/// Interactive terminal attached to one container.
pub struct ExecSession {
    base_url: String,
    container_id: String,
    bearer_token: String,
    signer: Arc<dyn MessageSigner>,
    options: ExecOptions,
    callbacks: Arc<Callbacks>,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
    link: Link,
    pending: Mutex<Option<(ConnectionSupervisor, mpsc::UnboundedSender<Bytes>)>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExecSession {
    /// Validate credentials and build an unconnected session.
    ///
    /// Fails without network traffic on an empty token, empty container id,
    /// or a malformed private key.
    pub fn new(
        base_url: &str,
        container_id: &str,
        bearer_token: &str,
        private_key: &str,
        options: ExecOptions,
    ) -> Result<Self, SessionError> {
        let signer = WalletSigner::from_hex(private_key)?;
        Self::with_signer(base_url, container_id, bearer_token, Arc::new(signer), options)
    }

    pub fn with_signer(
        base_url: &str,
        container_id: &str,
        bearer_token: &str,
        signer: Arc<dyn MessageSigner>,
        options: ExecOptions,
    ) -> Result<Self, SessionError> {
        if bearer_token.is_empty() {
            return Err(moltbunker_auth::AuthError::MissingCredentials(
                "exec requires a bearer token".to_string(),
            )
            .into());
        }
        if container_id.is_empty() {
            return Err(SessionError::Config("container id cannot be empty".to_string()));
        }

        let supervisor = ConnectionSupervisor::new(SupervisorConfig {
            auto_reconnect: false,
            ping_interval: options.ping_interval,
            ..Default::default()
        });
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            container_id: container_id.to_string(),
            bearer_token: bearer_token.to_string(),
            signer,
            options,
            callbacks: Arc::new(Callbacks::default()),
            inbox: tokio::sync::Mutex::new(inbox_rx),
            link: supervisor.link(),
            pending: Mutex::new(Some((supervisor, inbox_tx))),
            task: Mutex::new(None),
        })
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Fetch and sign a challenge, then open the terminal.
    pub async fn connect(&self) -> Result<(), SessionError> {
        if self.pending.lock().is_none() {
            return self.already_started();
        }

        let challenges = ChallengeSigner::new(
            self.base_url.clone(),
            self.signer.clone(),
            self.options.challenge_timeout,
        )?;
        match challenges
            .obtain_and_sign(&self.container_id, &self.bearer_token)
            .await
        {
            Ok(signed) => self.connect_with(signed).await,
            Err(e) => {
                let error = SessionError::from(e);
                match self.pending.lock().take() {
                    Some((supervisor, _)) => Err(supervisor.fail(error)),
                    None => Err(error),
                }
            }
        }
    }

    /// Open the terminal with a challenge signed elsewhere.
    pub async fn connect_with(&self, signed: SignedChallenge) -> Result<(), SessionError> {
        let Some((supervisor, inbox)) = self.pending.lock().take() else {
            return self.already_started();
        };

        let url = match exec_url(
            &self.base_url,
            &self.options.path,
            &signed,
            &self.container_id,
            self.options.cols,
            self.options.rows,
        ) {
            Ok(url) => url,
            Err(e) => return Err(supervisor.fail(e)),
        };
        let endpoint = Endpoint::new(url, Some(self.bearer_token.clone()));
        let handler = ExecHandler {
            callbacks: self.callbacks.clone(),
            inbox,
        };

        let task = supervisor.start(endpoint, handler).await?;
        info!("Exec session open for {}", self.container_id);
        *self.task.lock() = Some(task);
        Ok(())
    }

    fn already_started(&self) -> Result<(), SessionError> {
        if self.link.state().is_terminal() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    /// Send terminal input as a Data frame.
    pub fn send(&self, data: impl Into<Bytes>) -> Result<(), SessionError> {
        self.send_frame(ExecMessage::Data(data.into()))
    }

    /// Announce a new terminal size.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), SessionError> {
        self.send_frame(ExecMessage::Resize { cols, rows })
    }

    fn send_frame(&self, message: ExecMessage) -> Result<(), SessionError> {
        self.link.send(Message::Binary(message.encode()))
    }

    /// Register the Data frame callback. Last registration wins.
    pub fn on_data<F>(&self, callback: F)
    where
        F: Fn(Bytes) + Send + Sync + 'static,
    {
        *self.callbacks.data.lock() = Some(Arc::new(callback));
    }

    /// Register the Error frame callback. Last registration wins.
    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        *self.callbacks.error.lock() = Some(Arc::new(callback));
    }

    /// Wait up to `timeout` for the next Data payload.
    ///
    /// Data that arrived before the session closed is still returned before
    /// [`Received::Closed`].
    pub async fn recv(&self, timeout: Duration) -> Received {
        let next = async {
            let mut inbox = self.inbox.lock().await;
            if let Ok(data) = inbox.try_recv() {
                return Received::Data(data);
            }
            if self.link.state().is_terminal() {
                return Received::Closed;
            }
            match inbox.recv().await {
                Some(data) => Received::Data(data),
                None => Received::Closed,
            }
        };
        tokio::time::timeout(timeout, next)
            .await
            .unwrap_or(Received::Timeout)
    }

    /// Resolve once the session ends. Returns immediately if never connected.
    pub async fn wait(&self) {
        if self.pending.lock().is_some() {
            return;
        }
        self.link.closed().await;
    }

    /// Send a Close frame (best effort) and tear down the connection.
    pub async fn close(&self) {
        self.link.cancel();
        if let Some((supervisor, _)) = self.pending.lock().take() {
            supervisor.abandon();
        }
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Exec task ended abnormally: {}", e);
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn is_connected(&self) -> bool {
        self.link.state().is_connected()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.link.last_error()
    }
}

impl Drop for ExecSession {
    fn drop(&mut self) {
        self.link.cancel();
    }
}

struct ExecHandler {
    callbacks: Arc<Callbacks>,
    inbox: mpsc::UnboundedSender<Bytes>,
}

impl ExecHandler {
    fn deliver_data(&self, data: Bytes) {
        let callback = self.callbacks.data.lock().clone();
        match callback {
            Some(callback) => {
                if let Err(e) = invoke_guarded("exec data", || callback(data)) {
                    error!("{}", e);
                }
            }
            None => {
                // Unbounded: the receive loop never waits on a slow reader.
                // Receiver lives as long as the session.
                let _ = self.inbox.send(data);
            }
        }
    }

    fn deliver_error(&self, text: String) {
        let callback = self.callbacks.error.lock().clone();
        match callback {
            Some(callback) => {
                if let Err(e) = invoke_guarded("exec error", || callback(text)) {
                    error!("{}", e);
                }
            }
            None => warn!("Remote error: {}", text),
        }
    }
}

impl SessionHandler for ExecHandler {
    fn on_connected(&mut self) -> Vec<Message> {
        Vec::new()
    }

    fn keepalive(&self) -> Message {
        Message::Binary(ExecMessage::Ping.encode())
    }

    fn on_message(&mut self, message: Message) -> Dispatch {
        let data = match message {
            Message::Binary(data) => data,
            Message::Text(text) => {
                debug!("Ignoring text message on exec channel: {}", text.as_str());
                return Dispatch::none();
            }
            _ => return Dispatch::none(),
        };

        match ExecMessage::decode(data) {
            Ok(ExecMessage::Data(payload)) => {
                trace!("Exec data: {} bytes", payload.len());
                self.deliver_data(payload);
            }
            Ok(ExecMessage::Ping) => {
                return Dispatch::reply(Message::Binary(ExecMessage::Pong.encode()));
            }
            Ok(ExecMessage::Pong) => trace!("Exec pong"),
            Ok(ExecMessage::Close) => {
                info!("Exec session closed by remote");
                return Dispatch::terminate();
            }
            Ok(ExecMessage::Error(text)) => self.deliver_error(text),
            Ok(ExecMessage::Resize { cols, rows }) => {
                debug!("Ignoring resize from remote: {}x{}", cols, rows);
            }
            Err(e) => warn!("Dropping malformed exec frame: {}", e),
        }
        Dispatch::none()
    }

    fn farewell(&self) -> Option<Message> {
        Some(Message::Binary(ExecMessage::Close.encode()))
    }
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
