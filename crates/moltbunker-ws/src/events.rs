//! Event stream session.
//!
//! JSON pub/sub over the `/ws` endpoint. Channel bindings survive
//! reconnects: after every successful connect one `subscribe` message
//! listing all registered channels is sent before any inbound update is
//! dispatched.

use std::sync::Arc;

use moltbunker_config::{EventsConfig, MalformedPolicy};
use moltbunker_protocols::{ControlMessage, InboundMessage};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::endpoint::{Endpoint, websocket_url};
use crate::error::SessionError;
use crate::registry::{ChannelCallback, SubscriptionRegistry};
use crate::state::ConnectionState;
use crate::supervisor::{
    ConnectionSupervisor, Dispatch, ErrorSlot, Link, SessionHandler, SupervisorConfig,
};

/// Realtime event subscription client.
///
/// Single use: once closed (locally or after an unrecoverable failure) a
/// new stream must be constructed.
pub struct EventStream {
    endpoint: Endpoint,
    registry: Arc<SubscriptionRegistry>,
    policy: MalformedPolicy,
    link: Link,
    pending: Mutex<Option<ConnectionSupervisor>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventStream {
    /// Stream for the events endpoint under a REST `base_url`.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        config: &EventsConfig,
    ) -> Result<Self, SessionError> {
        let url = websocket_url(base_url, &config.path)?;
        Ok(Self::with_url(url, token.map(str::to_string), config.into())
            .with_malformed_policy(config.malformed_messages))
    }

    /// Stream for an explicit WebSocket URL.
    pub fn with_url(url: Url, token: Option<String>, config: SupervisorConfig) -> Self {
        let supervisor = ConnectionSupervisor::new(config);
        Self {
            endpoint: Endpoint::new(url, token),
            registry: Arc::new(SubscriptionRegistry::new()),
            policy: MalformedPolicy::default(),
            link: supervisor.link(),
            pending: Mutex::new(Some(supervisor)),
            task: Mutex::new(None),
        }
    }

    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Open the connection and start the receive loop.
    ///
    /// Channels subscribed beforehand are sent in the initial replay.
    /// Calling again while running is a no-op.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let Some(supervisor) = self.pending.lock().take() else {
            return if self.link.state().is_terminal() {
                Err(SessionError::Closed)
            } else {
                Ok(())
            };
        };

        let handler = EventHandler {
            registry: self.registry.clone(),
            policy: self.policy,
            errors: self.link.errors(),
        };
        let task = supervisor.start(self.endpoint.clone(), handler).await?;
        *self.task.lock() = Some(task);
        Ok(())
    }

    /// Bind `callback` to `channel`, replacing any earlier binding.
    ///
    /// Sends a subscribe message now if connected; otherwise the channel is
    /// included in the replay after the next connect.
    pub fn subscribe<F>(&self, channel: impl Into<String>, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let channel = channel.into();
        let callback: ChannelCallback = Arc::new(callback);
        if self.registry.insert(channel.clone(), callback) {
            debug!("Replaced callback for channel {}", channel);
        }
        self.send_control(ControlMessage::subscribe([channel]));
    }

    /// Drop the binding for `channel` and tell the server. Unknown channels
    /// are not an error.
    pub fn unsubscribe(&self, channel: &str) {
        if !self.registry.remove(channel) {
            debug!("Unsubscribing unknown channel {}", channel);
        }
        self.send_control(ControlMessage::unsubscribe([channel]));
    }

    /// Currently registered channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.registry.channels()
    }

    /// Resolve once the stream is closed.
    ///
    /// Returns immediately if the stream was never connected.
    pub async fn wait(&self) {
        if self.pending.lock().is_some() {
            return;
        }
        self.link.closed().await;
    }

    /// Close the stream. Interrupts a pending backoff wait.
    pub async fn close(&self) {
        self.link.cancel();
        if let Some(supervisor) = self.pending.lock().take() {
            supervisor.abandon();
        }
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Event stream task ended abnormally: {}", e);
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn is_connected(&self) -> bool {
        self.link.state().is_connected()
    }

    /// Most recent transport or reported error, if any.
    pub fn last_error(&self) -> Option<SessionError> {
        self.link.last_error()
    }

    fn send_control(&self, message: ControlMessage) {
        // Dropped when offline: the replay covers subscriptions.
        if let Err(e) = self.link.send(Message::Text(message.to_json().into())) {
            trace!("Not sent ({}): {:?}", e, message);
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.link.cancel();
    }
}

struct EventHandler {
    registry: Arc<SubscriptionRegistry>,
    policy: MalformedPolicy,
    errors: ErrorSlot,
}

impl EventHandler {
    fn on_text(&self, text: &str) -> Dispatch {
        trace!("Event recv: {}", text);
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping unparseable event message: {}", e);
                if self.policy == MalformedPolicy::Report {
                    self.errors.record(e.into());
                }
                return Dispatch::none();
            }
        };

        match message {
            InboundMessage::Ping => return Dispatch::reply(control(&ControlMessage::Pong)),
            InboundMessage::Pong => debug!("Keep-alive acknowledged"),
            InboundMessage::Subscribed(data) => debug!("Subscribed: {}", data),
            InboundMessage::Unsubscribed(data) => debug!("Unsubscribed: {}", data),
            InboundMessage::Update { channel, data } => {
                match self.registry.dispatch(&channel, data) {
                    Ok(true) => {}
                    Ok(false) => trace!("No callback for channel {}", channel),
                    Err(e) => error!("{}", e),
                }
            }
            InboundMessage::Unrecognized(kind) => debug!("Ignoring message type '{}'", kind),
        }
        Dispatch::none()
    }
}

impl SessionHandler for EventHandler {
    fn on_connected(&mut self) -> Vec<Message> {
        self.registry
            .replay_message()
            .map(|message| control(&message))
            .into_iter()
            .collect()
    }

    fn keepalive(&self) -> Message {
        control(&ControlMessage::Ping)
    }

    fn on_message(&mut self, message: Message) -> Dispatch {
        match message {
            Message::Text(text) => self.on_text(text.as_str()),
            Message::Binary(data) => {
                debug!("Ignoring {} byte binary message on event stream", data.len());
                Dispatch::none()
            }
            _ => Dispatch::none(),
        }
    }
}

fn control(message: &ControlMessage) -> Message {
    Message::Text(message.to_json().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handler(policy: MalformedPolicy) -> EventHandler {
        EventHandler {
            registry: Arc::new(SubscriptionRegistry::new()),
            policy,
            errors: ErrorSlot::default(),
        }
    }

    fn text_of(message: &Message) -> Value {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_ping_answered_with_single_pong() {
        let mut h = handler(MalformedPolicy::Drop);
        let dispatch = h.on_message(Message::Text(r#"{"type":"ping"}"#.into()));
        assert_eq!(dispatch.replies.len(), 1);
        assert_eq!(text_of(&dispatch.replies[0]), json!({"type": "pong"}));
        assert!(!dispatch.terminate);
    }

    #[test]
    fn test_replay_empty_without_channels() {
        let mut h = handler(MalformedPolicy::Drop);
        assert!(h.on_connected().is_empty());

        h.registry.insert("a", Arc::new(|_: Value| {}));
        h.registry.insert("b", Arc::new(|_: Value| {}));
        let replay = h.on_connected();
        assert_eq!(replay.len(), 1);
        assert_eq!(
            text_of(&replay[0]),
            json!({"type": "subscribe", "data": {"channels": ["a", "b"]}})
        );
    }

    #[test]
    fn test_malformed_text_policy() {
        let h = handler(MalformedPolicy::Drop);
        h.on_text("{oops");
        assert!(h.errors.get().is_none());

        let h = handler(MalformedPolicy::Report);
        let dispatch = h.on_text("{oops");
        assert!(dispatch.replies.is_empty());
        assert!(matches!(h.errors.get(), Some(SessionError::MalformedFrame(_))));
    }

    #[test]
    fn test_keepalive_is_json_ping() {
        let h = handler(MalformedPolicy::Drop);
        assert_eq!(text_of(&h.keepalive()), json!({"type": "ping"}));
    }

    #[test]
    fn test_new_derives_url() {
        let stream = EventStream::new(
            "https://api.moltbunker.com/v1",
            Some("wt_token"),
            &EventsConfig::default(),
        )
        .unwrap();
        assert_eq!(stream.endpoint.url().as_str(), "wss://api.moltbunker.com/v1/ws");
        assert_eq!(stream.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_subscribe_offline_records_binding() {
        let stream = EventStream::new("http://127.0.0.1:1", None, &EventsConfig::default()).unwrap();
        stream.subscribe("containers", |_| {});
        stream.subscribe("health", |_| {});
        stream.unsubscribe("health");
        stream.unsubscribe("never");
        assert_eq!(stream.channels(), vec!["containers".to_string()]);
    }

    #[tokio::test]
    async fn test_close_before_connect_is_terminal() {
        let stream = EventStream::new("http://127.0.0.1:1", None, &EventsConfig::default()).unwrap();
        stream.close().await;
        assert!(stream.state().is_terminal());
        assert!(matches!(stream.connect().await, Err(SessionError::Closed)));
    }
}
