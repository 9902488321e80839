//! Channel subscription registry.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use moltbunker_protocols::ControlMessage;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::SessionError;

/// Callback invoked with the `data` payload of a channel update.
pub type ChannelCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Channel name to callback bindings for one event stream.
///
/// Written from caller tasks (subscribe/unsubscribe) and read from the
/// receive loop (dispatch, replay). Callbacks are cloned out of the lock
/// before they run, so a callback may itself subscribe or unsubscribe.
#[derive(Default)]
pub struct SubscriptionRegistry {
    callbacks: Mutex<HashMap<String, ChannelCallback>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callback` to `channel`. Returns `true` if a binding was replaced.
    pub fn insert(&self, channel: impl Into<String>, callback: ChannelCallback) -> bool {
        self.callbacks
            .lock()
            .insert(channel.into(), callback)
            .is_some()
    }

    /// Remove the binding. Returns `false` if the channel was not registered.
    pub fn remove(&self, channel: &str) -> bool {
        self.callbacks.lock().remove(channel).is_some()
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.callbacks.lock().contains_key(channel)
    }

    /// Registered channel names, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.callbacks.lock().keys().cloned().collect();
        channels.sort();
        channels
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().is_empty()
    }

    /// Single subscribe message covering every registered channel, or
    /// `None` when nothing is registered.
    pub fn replay_message(&self) -> Option<ControlMessage> {
        let channels = self.channels();
        if channels.is_empty() {
            None
        } else {
            Some(ControlMessage::subscribe(channels))
        }
    }

    /// Deliver `data` to the callback bound to `channel`.
    ///
    /// Returns `Ok(false)` when no callback is bound. A panicking callback
    /// is contained and reported as [`SessionError::Callback`].
    pub fn dispatch(&self, channel: &str, data: Value) -> Result<bool, SessionError> {
        let callback = self.callbacks.lock().get(channel).cloned();
        match callback {
            Some(callback) => {
                invoke_guarded(channel, || callback(data))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("channels", &self.channels())
            .finish()
    }
}

/// Run a caller-supplied callback, turning a panic into an error.
pub(crate) fn invoke_guarded(label: &str, f: impl FnOnce()) -> Result<(), SessionError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| SessionError::Callback {
        channel: label.to_string(),
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, ChannelCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (
            count,
            Arc::new(move |_: Value| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_dispatch_to_registered_channel() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        registry.insert(
            "containers",
            Arc::new(move |data: Value| s.lock().push(data)),
        );

        let delivered = registry
            .dispatch("containers", json!({"status": "running"}))
            .unwrap();
        assert!(delivered);
        assert_eq!(*seen.lock(), vec![json!({"status": "running"})]);
    }

    #[test]
    fn test_unregistered_channel_is_dropped() {
        let registry = SubscriptionRegistry::new();
        assert!(!registry.dispatch("health", json!({})).unwrap());
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = SubscriptionRegistry::new();
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();

        assert!(!registry.insert("a", first_cb));
        assert!(registry.insert("a", second_cb));
        registry.dispatch("a", Value::Null).unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = SubscriptionRegistry::new();
        assert!(!registry.remove("never"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replay_message_lists_all_channels() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.replay_message().is_none());

        let (_, cb) = counter();
        registry.insert("health", cb.clone());
        registry.insert("containers", cb);
        assert_eq!(
            registry.replay_message(),
            Some(ControlMessage::subscribe(["containers", "health"]))
        );
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let registry = SubscriptionRegistry::new();
        fn explode(_: Value) {
            panic!("bad payload");
        }
        registry.insert("boom", Arc::new(explode));
        let (count, cb) = counter();
        registry.insert("ok", cb);

        let err = registry.dispatch("boom", Value::Null).unwrap_err();
        match err {
            SessionError::Callback { channel, message } => {
                assert_eq!(channel, "boom");
                assert_eq!(message, "bad payload");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        registry.dispatch("ok", Value::Null).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let r = registry.clone();
        registry.insert(
            "once",
            Arc::new(move |_: Value| {
                r.remove("once");
            }),
        );

        registry.dispatch("once", Value::Null).unwrap();
        assert!(!registry.contains("once"));
    }
}
