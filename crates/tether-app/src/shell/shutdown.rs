//! Graceful shell shutdown.

use std::thread::JoinHandle;

use tether_bridge::Bridge;
use tether_common::{BridgeEvent, EventBus};

/// Tear the shell down.
///
/// Order matters:
/// 1. Shut the bridge down (receiver detached, pending queries abandoned,
///    engine stopped)
/// 2. Tell bus listeners the session is over
/// 3. Wait for the event printer to drain
///
/// Safe to call more than once; returns `false` if the bridge was already
/// down.
pub fn shutdown(bridge: &Bridge, bus: &EventBus, printer: Option<JoinHandle<()>>) -> bool {
    tracing::info!(session = %bridge.session(), "Initiating graceful shutdown");

    // 1. Nothing reaches the receiver after this
    let first = bridge.shutdown();

    // 2. Wake listeners
    bus.publish(BridgeEvent::Shutdown);

    // 3. Printer exits on Shutdown
    if let Some(printer) = printer {
        if printer.join().is_err() {
            tracing::warn!("event printer panicked");
        }
    }

    tracing::info!(pending = bridge.pending_count(), "Graceful shutdown complete");
    first
}
