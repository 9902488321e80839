//! Event stream JSON messages.
//!
//! Outbound control messages:
//!
//! ```json
//! {"type": "subscribe", "data": {"channels": ["containers", "health"]}}
//! {"type": "unsubscribe", "data": {"channels": ["health"]}}
//! {"type": "ping"}
//! ```
//!
//! Inbound messages carry a `type` discriminator; `update` messages also carry
//! `channel` and `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameError;

/// Channel list payload of subscribe/unsubscribe messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelList {
    pub channels: Vec<String>,
}

/// Message sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Subscribe { data: ChannelList },
    Unsubscribe { data: ChannelList },
    Ping,
    Pong,
}

impl ControlMessage {
    /// Subscribe to the given channels.
    pub fn subscribe<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ControlMessage::Subscribe {
            data: ChannelList {
                channels: channels.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Unsubscribe from the given channels.
    pub fn unsubscribe<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ControlMessage::Unsubscribe {
            data: ChannelList {
                channels: channels.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> String {
        // Serializing these variants cannot fail: no maps with non-string keys.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Loose shape of an inbound message before classification.
#[derive(Debug, Deserialize)]
struct RawInbound {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Message received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Server keep-alive probe; answer with `pong`.
    Ping,
    /// Keep-alive acknowledgment.
    Pong,
    /// Subscription acknowledgment.
    Subscribed(Value),
    /// Unsubscription acknowledgment.
    Unsubscribed(Value),
    /// Channel update.
    Update { channel: String, data: Value },
    /// Any other `type`; ignored for forward compatibility.
    Unrecognized(String),
}

impl InboundMessage {
    /// Parse a text message.
    ///
    /// Fails only when the text is not a JSON object. Unknown or missing
    /// `type` values yield [`InboundMessage::Unrecognized`].
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawInbound = serde_json::from_str(text)?;
        let data = raw.data.filter(|v| !v.is_null());

        Ok(match raw.kind.as_str() {
            "ping" => InboundMessage::Ping,
            "pong" => InboundMessage::Pong,
            "subscribed" => InboundMessage::Subscribed(data.unwrap_or(Value::Null)),
            "unsubscribed" => InboundMessage::Unsubscribed(data.unwrap_or(Value::Null)),
            "update" => InboundMessage::Update {
                channel: raw.channel.unwrap_or_default(),
                data: data.unwrap_or_else(|| Value::Object(Default::default())),
            },
            _ => InboundMessage::Unrecognized(raw.kind),
        })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
