//! C ABI for engines compiled separately from the shell.
//!
//! A foreign engine exports an [`EngineVTable`]; [`ForeignEngine`] wraps it
//! as an [`Engine`](crate::Engine) so it can be served by a
//! [`Bridge`](crate::Bridge). In `serve` the engine receives a
//! [`HostVTable`] whose callbacks lead back into the bridge.
//!
//! Ownership across the boundary:
//! - shell → engine arguments are borrowed for the duration of the call
//! - engine → shell strings are copied by the shell, then released through
//!   the engine's `free_buffer`
//! - shell → engine return values are released by the engine through
//!   [`tether_free_buffer`]

mod engine;
mod host;
mod types;

pub use engine::ForeignEngine;
pub use host::tether_free_buffer;
pub use types::{EngineVTable, HostVTable};

#[cfg(test)]
mod tests;
