use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tether_bridge::Receiver;
use tether_common::{BridgeEvent, EventBus, PushEvent, QueryId};

/// Console shell's receiver: pushes become [`BridgeEvent`]s on the bus.
///
/// Starts out not ready; the shell flips [`ready_flag`](Self::ready_flag)
/// once its UI loop is running.
pub struct ConsoleReceiver {
    bus: Arc<EventBus>,
    ready: Arc<AtomicBool>,
}

impl ConsoleReceiver {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared readiness flag; `false` drops deliveries.
    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.ready)
    }
}

impl Receiver for ConsoleReceiver {
    fn on_push(&self, payload: &str) {
        let event = match PushEvent::from_json(payload) {
            Some(event) => BridgeEvent::Push(event),
            None => BridgeEvent::UnparsedPush(payload.to_string()),
        };
        self.bus.publish(event);
    }

    fn on_response(&self, id: QueryId, payload: &str) {
        tracing::debug!(query_id = %id, payload_len = payload.len(), "response received");
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
