//! The shell-side delivery target.

use tether_common::QueryId;

/// Shell object that receives engine-originated deliveries.
///
/// Exactly one receiver is attached to a bridge at a time. Its methods run on
/// engine threads (or the delivery thread) while the bridge holds the
/// receiver lock, so deliveries never interleave. Implementations must not
/// call back into `Bridge::shutdown` from these methods.
pub trait Receiver: Send + Sync {
    /// An unsolicited message from the engine.
    fn on_push(&self, payload: &str);

    /// Observes a response just before its interest is resolved.
    fn on_response(&self, _id: QueryId, _payload: &str) {}

    /// Whether the shell can consume deliveries yet. Deliveries arriving
    /// while this is `false` are dropped, same as with no receiver.
    fn is_ready(&self) -> bool {
        true
    }
}
