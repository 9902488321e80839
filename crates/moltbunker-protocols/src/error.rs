//! Malformed frame and message errors.

use thiserror::Error;

/// A frame or message that does not follow the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Zero-length binary frame.
    #[error("Malformed frame: empty message")]
    Empty,

    /// Type byte outside the known frame set.
    #[error("Malformed frame: unknown frame type 0x{0:02x}")]
    UnknownType(u8),

    /// Resize payload that is not exactly four bytes.
    #[error("Malformed frame: resize payload must be 4 bytes, got {len}")]
    InvalidResize { len: usize },

    /// Text message that is not a JSON object.
    #[error("Malformed message: {0}")]
    InvalidJson(String),
}

impl From<serde_json::Error> for FrameError {
    fn from(e: serde_json::Error) -> Self {
        FrameError::InvalidJson(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_display_is_hex() {
        let err = FrameError::UnknownType(0x7f);
        assert!(err.to_string().contains("0x7f"));
    }

    #[test]
    fn test_invalid_resize_display() {
        let err = FrameError::InvalidResize { len: 3 };
        let display = err.to_string();
        assert!(display.contains("4 bytes"));
        assert!(display.contains('3'));
    }

    #[test]
    fn test_from_serde_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = FrameError::from(parse_err);
        assert!(matches!(err, FrameError::InvalidJson(_)));
    }
}
