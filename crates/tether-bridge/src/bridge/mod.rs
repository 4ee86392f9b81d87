//! The constructed bridge: one receiver slot, one pending table, one engine.

use std::cell::Cell;
use std::sync::Arc;

use tether_common::{BridgeError, QueryId, SessionId};
use tether_config::{DeliveryMode, TetherConfig};
use tracing::{debug, info};

use crate::capability::{Engine, Host};
use crate::dispatcher::{PendingQuery, PendingTable, QueryDispatcher, Response};
use crate::host::BridgeHost;
use crate::lifecycle::{LifecycleGuard, LifecycleState, ShutdownCoordinator, ShutdownSequence};
use crate::link::EngineLink;
use crate::marshal::UiMarshaler;
use crate::push::{PushChannel, PushStats};
use crate::receiver::Receiver;
use crate::router::ResponseRouter;


/// Construction-time settings.
#[derive(Debug, Clone, Default)]
pub struct BridgeOptions {
    pub delivery: DeliveryMode,
    /// Locale reported to the engine. Falls back to the process locale.
    pub preferred_locale: Option<String>,
}

impl BridgeOptions {
    pub fn from_config(config: &TetherConfig) -> Self {
        Self {
            delivery: config.delivery.mode,
            preferred_locale: config.locale.preferred.clone(),
        }
    }

    fn locale(&self) -> String {
        self.preferred_locale
            .clone()
            .or_else(system_locale)
            .unwrap_or_default()
    }
}

/// `LANG=de_CH.UTF-8` becomes `de-CH`.
fn system_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
        .map(|value| normalize_locale(&value))
}

pub(crate) fn normalize_locale(raw: &str) -> String {
    let base = raw.split(&['.', '@'][..]).next().unwrap_or_default();
    base.replace('_', "-")
}

/// Shell side of the shell/engine boundary.
///
/// Owns the receiver slot, the pending-query table and the link to the
/// engine. Dropping the bridge shuts it down.
pub struct Bridge {
    session: SessionId,
    guard: Arc<LifecycleGuard>,
    coordinator: ShutdownCoordinator,
    link: Arc<EngineLink>,
    pending: Arc<PendingTable>,
    dispatcher: QueryDispatcher,
    router: Arc<ResponseRouter>,
    push: Arc<PushChannel>,
    marshaler: UiMarshaler,
    host: Arc<BridgeHost>,
}

impl Bridge {
    pub fn new(
        receiver: Box<dyn Receiver>,
        marshaler: UiMarshaler,
        options: BridgeOptions,
    ) -> tether_common::Result<Self> {
        let session = SessionId::new();
        let guard = Arc::new(LifecycleGuard::with_receiver(receiver));
        let link = Arc::new(EngineLink::new());
        let pending = Arc::new(PendingTable::new());
        let router = Arc::new(ResponseRouter::new(
            Arc::clone(&pending),
            Arc::clone(&guard),
            options.delivery,
        )?);
        let push = Arc::new(PushChannel::new(Arc::clone(&guard)));
        let host = Arc::new(BridgeHost::new(
            Arc::clone(&push),
            Arc::clone(&router),
            marshaler.clone(),
            options.locale(),
            session.clone(),
        ));

        info!(session = %session, delivery = ?options.delivery, "bridge created");
        Ok(Self {
            session,
            guard,
            coordinator: ShutdownCoordinator::new(),
            dispatcher: QueryDispatcher::new(Arc::clone(&pending), Arc::clone(&link)),
            link,
            pending,
            router,
            push,
            marshaler,
            host,
        })
    }

    /// Hand the engine its host callbacks and start it. Only one engine may
    /// ever serve a bridge.
    pub fn serve(&self, engine: Arc<dyn Engine>) -> Result<(), BridgeError> {
        if !self.coordinator.is_running() {
            return Err(BridgeError::Closed);
        }
        let host: Arc<dyn Host> = self.host.clone();
        self.link.attach(engine, |engine| engine.serve(host))?;
        info!(session = %self.session, "engine serving");
        Ok(())
    }

    pub fn dispatch(&self, payload: &str) -> Result<PendingQuery, BridgeError> {
        self.dispatcher.dispatch(payload)
    }

    pub fn dispatch_with<F>(&self, payload: &str, on_response: F) -> Result<QueryId, BridgeError>
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.dispatcher.dispatch_with(payload, on_response)
    }

    pub fn dispatch_with_id<F>(
        &self,
        id: QueryId,
        payload: &str,
        on_response: F,
    ) -> Result<(), BridgeError>
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.dispatcher.dispatch_with_id(id, payload, on_response)
    }

    pub fn set_online(&self, online: bool) -> Result<(), BridgeError> {
        self.link.with_engine(|engine| {
            engine.set_online(online);
            Ok(())
        })
    }

    pub fn handle_uri(&self, uri: &str) -> Result<(), BridgeError> {
        self.link.with_engine(|engine| {
            engine.handle_uri(uri);
            Ok(())
        })
    }

    /// Forward a shell log line to the engine.
    pub fn log_to_engine(&self, message: &str) -> Result<(), BridgeError> {
        self.link.with_engine(|engine| {
            engine.log(message);
            Ok(())
        })
    }

    pub fn manual_reconnect(&self) -> Result<(), BridgeError> {
        self.link.with_engine(|engine| {
            engine.manual_reconnect();
            Ok(())
        })
    }

    pub fn using_mobile_data_changed(&self) -> Result<(), BridgeError> {
        self.link.with_engine(|engine| {
            engine.using_mobile_data_changed();
            Ok(())
        })
    }

    /// The callbacks handed to the engine on `serve`.
    pub fn host(&self) -> Arc<dyn Host> {
        self.host.clone()
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn state(&self) -> LifecycleState {
        self.coordinator.state()
    }

    pub fn is_serving(&self) -> bool {
        self.link.is_serving()
    }

    pub fn pending_count(&self) -> usize {
        self.dispatcher.pending_count()
    }

    pub fn push_stats(&self) -> PushStats {
        self.push.stats()
    }

    /// Tear the bridge down. After this returns no push or response reaches
    /// the receiver, pending queries are abandoned, the UI marshaler is
    /// closed and the engine has been told to stop. Returns `false` if the
    /// bridge was already shut down; a call that overlaps another shutdown
    /// waits for it to finish first.
    ///
    /// Must not be called from inside a [`Receiver`] callback.
    pub fn shutdown(&self) -> bool {
        let teardown = Teardown {
            bridge: self,
            engine: Cell::new(None),
        };
        self.coordinator.shutdown(&self.guard, &teardown)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Teardown<'a> {
    bridge: &'a Bridge,
    engine: Cell<Option<Arc<dyn Engine>>>,
}

impl ShutdownSequence for Teardown<'_> {
    fn stop_accepting(&self) {
        let dropped = self.bridge.marshaler.close();
        self.engine.set(self.bridge.link.close());
        debug!(
            session = %self.bridge.session,
            dropped_ui_tasks = dropped,
            "bridge no longer accepting calls"
        );
    }

    fn abandon_pending(&self) -> usize {
        self.bridge.pending.close()
    }

    fn stop_engine(&self) {
        if let Some(engine) = self.engine.take() {
            engine.shutdown();
            info!(session = %self.bridge.session, "engine stopped");
        }
        self.bridge.router.stop();
    }
}
