//! # Moltbunker Config
//!
//! Configuration for the Moltbunker SDK: API endpoint, credentials,
//! event stream reconnect policy and exec terminal defaults.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
