//! In-process stand-in for the backend engine.
//!
//! Queries are answered from a tokio worker pool, so responses arrive on
//! engine threads and out of order, the way a real backend delivers them.

mod handlers;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde_json::json;
use tether_bridge::{Engine, Host};
use tether_common::{BridgeError, PushAction, PushEvent, QueryId};
use tether_config::EngineConfig;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// State shared by the engine and its in-flight tasks.
pub struct EngineState {
    host: RwLock<Option<Arc<dyn Host>>>,
    online: AtomicBool,
    testnet: bool,
}

impl EngineState {
    pub fn new(testnet: bool) -> Self {
        Self {
            host: RwLock::new(None),
            online: AtomicBool::new(true),
            testnet,
        }
    }

    fn attach(&self, host: Arc<dyn Host>) {
        *self.host.write().unwrap_or_else(PoisonError::into_inner) = Some(host);
    }

    /// Waits for callbacks in progress, then stops any new ones.
    fn detach(&self) {
        self.host
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Run `f` against the host, unless the engine has stopped.
    pub fn with_host<R>(&self, f: impl FnOnce(&dyn Host) -> R) -> Option<R> {
        let host = self.host.read().unwrap_or_else(PoisonError::into_inner);
        host.as_deref().map(f)
    }

    fn push(&self, event: PushEvent) {
        let payload = event.to_json();
        self.with_host(|host| host.push_notify(&payload));
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn testnet(&self) -> bool {
        self.testnet
    }
}

pub struct LoopbackEngine {
    state: Arc<EngineState>,
    runtime: Mutex<Option<Runtime>>,
    stop_timeout: Duration,
}

impl LoopbackEngine {
    pub fn new(config: &EngineConfig) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1) as usize)
            .thread_name("tether-engine")
            .enable_all()
            .build()?;
        Ok(Self {
            state: Arc::new(EngineState::new(config.testnet)),
            runtime: Mutex::new(Some(runtime)),
            stop_timeout: Duration::from_millis(u64::from(config.stop_timeout_ms)),
        })
    }

    fn spawn<F>(&self, task: F) -> Result<(), BridgeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        match runtime.as_ref() {
            Some(runtime) => {
                runtime.spawn(task);
                Ok(())
            }
            None => Err(BridgeError::Engine("engine stopped".into())),
        }
    }
}

impl Engine for LoopbackEngine {
    fn serve(&self, host: Arc<dyn Host>) -> Result<(), BridgeError> {
        host.log(&format!(
            "INFO: loopback engine serving (testnet: {})",
            self.state.testnet
        ));
        self.state.attach(host);
        Ok(())
    }

    fn call(&self, id: QueryId, payload: &str) -> Result<(), BridgeError> {
        let state = Arc::clone(&self.state);
        let payload = payload.to_owned();
        self.spawn(async move {
            let response = handlers::handle(&state, &payload).await;
            state.with_host(|host| host.respond(id, &response));
        })
    }

    fn set_online(&self, online: bool) {
        self.state.online.store(online, Ordering::SeqCst);
        self.state
            .push(PushEvent::new("online", PushAction::Replace, json!(online)));
    }

    fn handle_uri(&self, uri: &str) {
        self.state
            .push(PushEvent::new("uri", PushAction::Replace, json!(uri)));
    }

    fn log(&self, message: &str) {
        info!(target: "tether::loopback", "shell: {message}");
    }

    fn manual_reconnect(&self) {
        debug!("manual reconnect requested");
        self.state.push(PushEvent::reload("online"));
    }

    fn using_mobile_data_changed(&self) {
        let mobile = self
            .state
            .with_host(|host| host.using_mobile_data())
            .unwrap_or(false);
        self.state
            .push(PushEvent::new("mobile-data", PushAction::Replace, json!(mobile)));
    }

    fn shutdown(&self) {
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_timeout(self.stop_timeout);
        }
        self.state.detach();
        info!("loopback engine stopped");
    }
}
