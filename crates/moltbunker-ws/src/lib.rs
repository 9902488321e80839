//! # Moltbunker WebSocket sessions
//!
//! Two session types share one connection supervisor:
//!
//! - [`EventStream`] - JSON pub/sub over `/ws`, reconnects with exponential
//!   backoff and replays channel subscriptions after every reconnect
//! - [`ExecSession`] - binary-framed interactive terminal over `/exec`,
//!   authenticated with a signed one-time challenge; never reconnects
//!
//! Both are tokio based. [`blocking`] wraps them for callers without an
//! async runtime; the receive loop then runs on a dedicated worker thread.
//!
//! ```rust,ignore
//! let stream = EventStream::new(&config.api.base_url, Some(token), &config.events)?;
//! stream.subscribe("containers", |data| println!("{data}"));
//! stream.connect().await?;
//! stream.wait().await;
//! ```

pub mod backoff;
pub mod blocking;
pub mod endpoint;
mod error;
pub mod events;
pub mod exec;
pub mod registry;
mod state;
mod supervisor;

pub use backoff::Backoff;
pub use endpoint::Endpoint;
pub use error::SessionError;
pub use events::EventStream;
pub use exec::{ExecOptions, ExecSession, Received};
pub use registry::{ChannelCallback, SubscriptionRegistry};
pub use state::ConnectionState;
pub use supervisor::SupervisorConfig;
