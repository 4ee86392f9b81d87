//! The two capability surfaces exchanged at startup.
//!
//! The shell hands the engine a [`Host`] once, when it starts serving; the
//! engine is driven through the [`Engine`] trait. Neither side sees the
//! other's internals.

use std::sync::Arc;

use tether_common::{BridgeError, QueryId};

/// Callbacks the engine may invoke, from any of its threads.
///
/// After the bridge has shut down every method is a harmless no-op (or
/// returns an empty / default value), so a slow engine may keep calling them
/// while it winds down.
pub trait Host: Send + Sync {
    /// Unsolicited message for the shell.
    fn push_notify(&self, payload: &str);

    /// Answer to the query with this id.
    fn respond(&self, id: QueryId, payload: &str);

    /// Show a short message to the user (tray balloon). Does not wait.
    fn notify_user(&self, message: &str);

    /// The user's preferred UI language, e.g. `"en-US"`. May be empty.
    fn preferred_locale(&self) -> String;

    /// Ask the user for a save location. Blocks until the dialog closes;
    /// returns an empty string when the user cancels.
    fn get_save_filename(&self, suggested: &str) -> String;

    /// Open a URL with the system's default handler.
    fn system_open(&self, url: &str) -> Result<(), BridgeError>;

    /// Diagnostic line from the engine. An optional `LEVEL:` prefix selects
    /// the level.
    fn log(&self, message: &str);

    fn detect_dark_theme(&self) -> bool;

    fn set_dark_theme(&self, dark: bool);

    fn using_mobile_data(&self) -> bool;
}

/// The backend engine as seen from the shell.
pub trait Engine: Send + Sync {
    /// Register the host callbacks and start processing. Called once.
    fn serve(&self, host: Arc<dyn Host>) -> Result<(), BridgeError>;

    /// Forward a query. Must not block; the answer arrives later through
    /// [`Host::respond`], possibly on another thread.
    fn call(&self, id: QueryId, payload: &str) -> Result<(), BridgeError>;

    fn set_online(&self, online: bool);

    fn handle_uri(&self, uri: &str);

    fn log(&self, message: &str) {
        tracing::debug!(target: "tether::engine", message, "shell log line (ignored by engine)");
    }

    fn manual_reconnect(&self) {}

    fn using_mobile_data_changed(&self) {}

    /// Stop processing. No host callbacks may be issued after this returns.
    fn shutdown(&self);
}
