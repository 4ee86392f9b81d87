//! Receiver lifetime protection and ordered teardown.
//!
//! `LifecycleGuard` owns the one receiver slot every delivery path goes
//! through. `ShutdownCoordinator` drives the one-way
//! `Running -> Detaching -> Stopped` sequence that empties that slot.

mod guard;
mod shutdown;

pub use guard::LifecycleGuard;
pub use shutdown::{LifecycleState, ShutdownCoordinator, ShutdownSequence};
