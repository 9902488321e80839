//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default REST API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.moltbunker.com/v1";

/// Environment variable holding an API key.
pub const ENV_API_KEY: &str = "MOLTBUNKER_API_KEY";
/// Environment variable holding a wallet private key.
pub const ENV_PRIVATE_KEY: &str = "MOLTBUNKER_PRIVATE_KEY";
/// Environment variable overriding the derived wallet address.
pub const ENV_WALLET_ADDRESS: &str = "MOLTBUNKER_WALLET_ADDRESS";
/// Environment variable overriding the API base URL.
pub const ENV_BASE_URL: &str = "MOLTBUNKER_BASE_URL";

fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub exec: ExecConfig,
}

impl ClientConfig {
    /// Overlay credentials and base URL from `MOLTBUNKER_*` environment variables.
    ///
    /// Set variables win over file values; empty variables are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(api_key) = var(ENV_API_KEY) {
            self.auth.api_key = Some(api_key);
        }
        if let Some(private_key) = var(ENV_PRIVATE_KEY) {
            self.auth.private_key = Some(private_key);
        }
        if let Some(address) = var(ENV_WALLET_ADDRESS) {
            self.auth.wallet_address = Some(address);
        }
        if let Some(base_url) = var(ENV_BASE_URL) {
            self.api.base_url = base_url;
        }
        self
    }
}

/// REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API; WebSocket URLs are derived from it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ApiConfig {
    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Credentials.
///
/// An API key takes precedence over a private key when both are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub private_key: Option<String>,

    #[serde(default)]
    pub wallet_address: Option<String>,
}

impl AuthConfig {
    /// Whether any credential is configured.
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
            || self.private_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// What to do with inbound event-stream text that is not valid JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Log and drop.
    #[default]
    Drop,
    /// Drop, and record the error as the session's last error.
    Report,
}

/// Event stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Endpoint path appended to the WebSocket base URL.
    #[serde(default = "default_events_path")]
    pub path: String,

    /// Reconnect after transport failures.
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Reconnect delay cap in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Idle time before a keep-alive ping is sent, in seconds.
    #[serde(default = "default_events_ping_secs")]
    pub ping_interval_secs: u64,

    #[serde(default)]
    pub malformed_messages: MalformedPolicy,
}

fn default_events_path() -> String {
    "/ws".to_string()
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_events_ping_secs() -> u64 {
    25
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            path: default_events_path(),
            auto_reconnect: default_true(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            ping_interval_secs: default_events_ping_secs(),
            malformed_messages: MalformedPolicy::default(),
        }
    }
}

impl EventsConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

/// Exec terminal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Endpoint path appended to the WebSocket base URL.
    #[serde(default = "default_exec_path")]
    pub path: String,

    /// Initial terminal columns.
    #[serde(default = "default_cols")]
    pub cols: u16,

    /// Initial terminal rows.
    #[serde(default = "default_rows")]
    pub rows: u16,

    /// Idle time before a keep-alive ping frame is sent, in seconds.
    #[serde(default = "default_exec_ping_secs")]
    pub ping_interval_secs: u64,

    /// Timeout for the challenge request, in seconds.
    #[serde(default = "default_challenge_timeout_secs")]
    pub challenge_timeout_secs: u64,
}

fn default_exec_path() -> String {
    "/exec".to_string()
}

fn default_cols() -> u16 {
    80
}

fn default_rows() -> u16 {
    24
}

fn default_exec_ping_secs() -> u64 {
    30
}

fn default_challenge_timeout_secs() -> u64 {
    10
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            path: default_exec_path(),
            cols: default_cols(),
            rows: default_rows(),
            ping_interval_secs: default_exec_ping_secs(),
            challenge_timeout_secs: default_challenge_timeout_secs(),
        }
    }
}

impl ExecConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.challenge_timeout_secs)
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
