//! UI services of the console shell. Only ever used on the main thread.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tether_bridge::UiServices;
use tether_common::{BridgeEvent, EventBus};
use tracing::info;

pub struct ConsoleUi {
    save_dir: Option<PathBuf>,
    bus: Arc<EventBus>,
    dark: Cell<bool>,
}

impl ConsoleUi {
    pub fn new(save_dir: Option<PathBuf>, bus: Arc<EventBus>) -> Self {
        Self {
            save_dir,
            bus,
            dark: Cell::new(false),
        }
    }
}

impl UiServices for ConsoleUi {
    /// Answers with `<save_dir>/<file name>`; with no save directory the
    /// dialog counts as cancelled.
    fn save_file_dialog(&self, suggested: &str) -> Option<PathBuf> {
        let dir = self.save_dir.as_ref()?;
        let name = Path::new(suggested)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("export"));
        Some(dir.join(name))
    }

    fn show_tray_message(&self, title: &str, message: &str) {
        self.bus
            .publish(BridgeEvent::UserNotification(format!("{title}: {message}")));
    }

    fn open_external(&self, url: &str) -> Result<(), String> {
        if url.starts_with("https://") || url.starts_with("http://") {
            info!(url, "open requested");
            Ok(())
        } else {
            Err(format!("refusing to open non-web url {url}"))
        }
    }

    fn detect_dark_theme(&self) -> bool {
        self.dark.get()
    }

    fn set_dark_theme(&self, dark: bool) {
        self.dark.set(dark);
    }
}
