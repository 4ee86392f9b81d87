use std::sync::Arc;

use tether_common::{BridgeError, QueryId, SessionId};
use tracing::{debug, error, info, trace, warn, Level};

use crate::capability::Host;
use crate::marshal::UiMarshaler;
use crate::push::PushChannel;
use crate::router::ResponseRouter;

/// The bridge's [`Host`]: engine callbacks land here and are routed to the
/// push channel, the response router or the UI thread.
pub(crate) struct BridgeHost {
    push: Arc<PushChannel>,
    router: Arc<ResponseRouter>,
    marshaler: UiMarshaler,
    locale: String,
    session: SessionId,
}

impl BridgeHost {
    pub(crate) fn new(
        push: Arc<PushChannel>,
        router: Arc<ResponseRouter>,
        marshaler: UiMarshaler,
        locale: String,
        session: SessionId,
    ) -> Self {
        Self {
            push,
            router,
            marshaler,
            locale,
            session,
        }
    }
}

impl Host for BridgeHost {
    fn push_notify(&self, payload: &str) {
        self.push.push(payload);
    }

    fn respond(&self, id: QueryId, payload: &str) {
        self.router.route(id, payload);
    }

    fn notify_user(&self, message: &str) {
        let message = message.to_owned();
        let posted = self.marshaler.post(move |ctx| {
            ctx.services().show_tray_message("Tether", &message);
        });
        if posted.is_err() {
            debug!(session = %self.session, "user notification dropped; UI loop closed");
        }
    }

    fn preferred_locale(&self) -> String {
        self.locale.clone()
    }

    fn get_save_filename(&self, suggested: &str) -> String {
        let suggested = suggested.to_owned();
        let chosen = self.marshaler.run_on_ui_thread(move |ctx| {
            ctx.services()
                .save_file_dialog(&suggested)
                .map(|path| path.display().to_string())
                .unwrap_or_default()
        });
        match chosen {
            Ok(path) => {
                if path.is_empty() {
                    debug!("save dialog cancelled");
                }
                path
            }
            Err(err) => {
                debug!(%err, "save dialog unavailable");
                String::new()
            }
        }
    }

    fn system_open(&self, url: &str) -> Result<(), BridgeError> {
        let url = url.to_owned();
        self.marshaler
            .run_on_ui_thread(move |ctx| ctx.services().open_external(&url))?
            .map_err(BridgeError::Shell)
    }

    fn log(&self, message: &str) {
        let (level, text) = split_level(message);
        match level {
            Level::ERROR => error!(target: "tether::engine", "{text}"),
            Level::WARN => warn!(target: "tether::engine", "{text}"),
            Level::DEBUG => debug!(target: "tether::engine", "{text}"),
            Level::TRACE => trace!(target: "tether::engine", "{text}"),
            _ => info!(target: "tether::engine", "{text}"),
        }
    }

    fn detect_dark_theme(&self) -> bool {
        self.marshaler
            .run_on_ui_thread(|ctx| ctx.services().detect_dark_theme())
            .unwrap_or(false)
    }

    fn set_dark_theme(&self, dark: bool) {
        if self
            .marshaler
            .post(move |ctx| ctx.services().set_dark_theme(dark))
            .is_err()
        {
            debug!(dark, "theme change dropped; UI loop closed");
        }
    }

    fn using_mobile_data(&self) -> bool {
        self.marshaler
            .run_on_ui_thread(|ctx| ctx.services().using_mobile_data())
            .unwrap_or(false)
    }
}

/// Split an optional `LEVEL:` prefix off an engine log line. Lines without a
/// recognised prefix are logged at info.
pub(crate) fn split_level(message: &str) -> (Level, &str) {
    if let Some((prefix, rest)) = message.split_once(':') {
        let level = match prefix.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Some(Level::ERROR),
            "WARN" | "WARNING" => Some(Level::WARN),
            "INFO" => Some(Level::INFO),
            "DEBUG" => Some(Level::DEBUG),
            "TRACE" => Some(Level::TRACE),
            _ => None,
        };
        if let Some(level) = level {
            return (level, rest.trim_start());
        }
    }
    (Level::INFO, message)
}
