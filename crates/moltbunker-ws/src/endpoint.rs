//! WebSocket endpoints and upgrade requests.
//!
//! The socket lives on the same host as the REST API: `https` becomes
//! `wss`, `http` becomes `ws`, and the endpoint path is appended to the
//! base path (`https://host/v1` + `/ws` = `wss://host/v1/ws`).

use moltbunker_auth::{AuthError, SignedChallenge};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use url::Url;

use crate::error::SessionError;

/// Where to connect and which bearer token to present.
#[derive(Clone)]
pub struct Endpoint {
    url: Url,
    bearer_token: Option<String>,
}

impl Endpoint {
    pub fn new(url: Url, bearer_token: Option<String>) -> Self {
        Self {
            url,
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Build a fresh upgrade request. Called once per connection attempt.
    pub fn request(&self) -> Result<Request, SessionError> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(token) = &self.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                AuthError::InvalidKey("bearer token is not a valid header value".to_string())
            })?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(request)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Query strings may carry signatures.
        f.debug_struct("Endpoint")
            .field("host", &self.url.host_str())
            .field("path", &self.url.path())
            .field("authenticated", &self.bearer_token.is_some())
            .finish()
    }
}

/// Derive a WebSocket URL from a REST base URL and an endpoint path.
pub fn websocket_url(base_url: &str, path: &str) -> Result<Url, SessionError> {
    let mut url = Url::parse(base_url.trim_end_matches('/'))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(SessionError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                other
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| SessionError::InvalidUrl(format!("cannot use scheme {}", scheme)))?;

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Exec endpoint URL carrying the signed challenge and terminal size.
pub fn exec_url(
    base_url: &str,
    path: &str,
    signed: &SignedChallenge,
    container_id: &str,
    cols: u16,
    rows: u16,
) -> Result<Url, SessionError> {
    let mut url = websocket_url(base_url, path)?;
    url.query_pairs_mut()
        .append_pair("nonce", &signed.nonce)
        .append_pair("signature", &signed.signature)
        .append_pair("container_id", container_id)
        .append_pair("cols", &cols.to_string())
        .append_pair("rows", &rows.to_string());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_mapping() {
        let url = websocket_url("https://api.moltbunker.com/v1", "/ws").unwrap();
        assert_eq!(url.as_str(), "wss://api.moltbunker.com/v1/ws");

        let url = websocket_url("http://localhost:8080/v1/", "/exec").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/v1/exec");
    }

    #[test]
    fn test_root_base_path() {
        let url = websocket_url("http://127.0.0.1:9000", "/ws").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/ws");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            websocket_url("ftp://example.com", "/ws"),
            Err(SessionError::InvalidUrl(_))
        ));
        assert!(matches!(
            websocket_url("not a url", "/ws"),
            Err(SessionError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_request_carries_bearer() {
        let url = Url::parse("ws://127.0.0.1:9000/ws").unwrap();
        let request = Endpoint::new(url.clone(), Some("wt_abc".to_string()))
            .request()
            .unwrap();
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer wt_abc");

        let request = Endpoint::new(url, Some(String::new())).request().unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_bad_token_rejected() {
        let url = Url::parse("ws://127.0.0.1:9000/ws").unwrap();
        let result = Endpoint::new(url, Some("bad\ntoken".to_string())).request();
        assert!(matches!(result, Err(SessionError::Authentication(_))));
    }

    #[test]
    fn test_exec_query_parameters() {
        let signed = SignedChallenge {
            nonce: "n 1".to_string(),
            signature: "0xabc".to_string(),
        };
        let url = exec_url("https://api.example.com/v1", "/exec", &signed, "mb-1", 120, 40).unwrap();

        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/v1/exec");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("nonce".to_string(), "n 1".to_string()),
                ("signature".to_string(), "0xabc".to_string()),
                ("container_id".to_string(), "mb-1".to_string()),
                ("cols".to_string(), "120".to_string()),
                ("rows".to_string(), "40".to_string()),
            ]
        );
    }
}
