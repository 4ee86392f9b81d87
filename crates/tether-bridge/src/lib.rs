//! Query correlation and callback bridge between a GUI shell and a backend
//! engine.
//!
//! The shell builds one [`Bridge`] around its [`Receiver`] and a
//! [`UiMarshaler`] for its UI thread, then hands it an [`Engine`] to serve.
//! Queries go out through [`Bridge::dispatch`] and friends; answers come
//! back through the [`Host`] the engine was given and are routed to the
//! caller that asked. Pushes from the engine reach the receiver in order.
//! [`Bridge::shutdown`] is the single point after which nothing reaches the
//! receiver any more.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tether_bridge::{Bridge, BridgeOptions, Engine, Receiver, UiLoop};
//!
//! struct Printer;
//!
//! impl Receiver for Printer {
//!     fn on_push(&self, payload: &str) {
//!         println!("push: {payload}");
//!     }
//! }
//!
//! # fn engine() -> Arc<dyn Engine> { unimplemented!() }
//! let ui = UiLoop::headless();
//! let bridge = Bridge::new(Box::new(Printer), ui.marshaler(), BridgeOptions::default())?;
//! bridge.serve(engine())?;
//! let query = bridge.dispatch(r#"{"method":"GET","endpoint":"version"}"#)?;
//! # let _ = query;
//! bridge.shutdown();
//! # Ok::<(), tether_common::TetherError>(())
//! ```

mod bridge;
mod capability;
mod dispatcher;
pub mod ffi;
mod host;
pub mod lifecycle;
mod link;
pub mod marshal;
pub mod ownership;
mod push;
mod receiver;
mod router;

pub use bridge::{Bridge, BridgeOptions};
pub use capability::{Engine, Host};
pub use dispatcher::{PendingQuery, QueryDispatcher, Response};
pub use lifecycle::{LifecycleGuard, LifecycleState, ShutdownCoordinator, ShutdownSequence};
pub use marshal::{HeadlessUi, UiContext, UiLoop, UiMarshaler, UiServices};
pub use ownership::{Allocate, CrossBoundaryBuffer, Deallocate, ForeignHeap, ShellHeap, Side};
pub use push::PushStats;
pub use receiver::Receiver;
pub use tether_config::DeliveryMode;
