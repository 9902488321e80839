//! # Moltbunker Protocols
//!
//! Wire formats shared by the Moltbunker WebSocket channels.
//!
//! - [`frame`] - single-byte-tag binary frames used by exec terminals
//! - [`event`] - JSON control and update messages used by event streams
//! - [`error`] - malformed frame/message errors

pub mod error;
pub mod event;
pub mod frame;

pub use error::FrameError;
pub use event::{ControlMessage, InboundMessage};
pub use frame::{ExecMessage, Frame, FrameType};
