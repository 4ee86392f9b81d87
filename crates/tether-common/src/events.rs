use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// What a push asks the shell to do with `object` under `subject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushAction {
    Replace,
    Prepend,
    Append,
    Reload,
}

/// Structured form of a push payload emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub subject: String,
    pub action: PushAction,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub object: serde_json::Value,
}

impl PushEvent {
    pub fn new(subject: impl Into<String>, action: PushAction, object: serde_json::Value) -> Self {
        Self {
            subject: subject.into(),
            action,
            object,
        }
    }

    pub fn reload(subject: impl Into<String>) -> Self {
        Self::new(subject, PushAction::Reload, serde_json::Value::Null)
    }

    /// Parse a raw push payload. Returns `None` for payloads that are not
    /// push events; the bridge itself never requires this shape.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }
}

/// Events fanned out to shell-side listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BridgeEvent {
    Push(PushEvent),
    UnparsedPush(String),
    UserNotification(String),
    Shutdown,
    #[serde(other)]
    Unknown,
}

pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: BridgeEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::trace!("event published with no subscribers");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_event_parses_engine_shape() {
        let raw = r#"{"subject":"devices/registered","action":"reload"}"#;
        let event = PushEvent::from_json(raw).unwrap();
        assert_eq!(event.subject, "devices/registered");
        assert_eq!(event.action, PushAction::Reload);
        assert!(event.object.is_null());
    }

    #[test]
    fn push_event_with_object() {
        let event = PushEvent::new("online", PushAction::Replace, serde_json::json!(true));
        let json = event.to_json();
        assert!(json.contains("\"action\":\"replace\""));
        assert!(json.contains("\"object\":true"));
        assert_eq!(PushEvent::from_json(&json).unwrap(), event);
    }

    #[test]
    fn non_event_payload_is_none() {
        assert!(PushEvent::from_json("hello").is_none());
        assert!(PushEvent::from_json(r#"{"subject":"x","action":"explode"}"#).is_none());
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(BridgeEvent::Push(PushEvent::reload("accounts")));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, BridgeEvent::Push(ref e) if e.subject == "accounts"));
    }

    #[tokio::test]
    async fn multiple_subscribers_see_same_order() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(BridgeEvent::UnparsedPush("a".into()));
        bus.publish(BridgeEvent::Shutdown);

        for rx in [&mut rx1, &mut rx2] {
            assert!(matches!(
                rx.recv().await.unwrap(),
                BridgeEvent::UnparsedPush(ref s) if s == "a"
            ));
            assert!(matches!(rx.recv().await.unwrap(), BridgeEvent::Shutdown));
        }
    }

    #[test]
    fn publish_returns_zero_with_no_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(BridgeEvent::Shutdown), 0);
    }

    #[test]
    fn unknown_event_deserializes() {
        let json = r#"{"type":"SomethingNew","data":null}"#;
        let event: BridgeEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, BridgeEvent::Unknown));
    }
}
