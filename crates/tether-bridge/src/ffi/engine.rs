use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tether_common::{BridgeError, QueryId};
use tracing::debug;

use super::host::HostContext;
use super::types::EngineVTable;
use crate::capability::{Engine, Host};
use crate::ownership::{CrossBoundaryBuffer, ForeignHeap, ShellHeap};

/// An engine reached through a C vtable.
///
/// Strings passed to the engine are allocated on the shell heap and freed
/// once the call returns. The host context given to the engine stays alive
/// until [`Engine::shutdown`] has returned.
pub struct ForeignEngine {
    vtable: EngineVTable,
    engine_heap: Arc<ForeignHeap>,
    shell_heap: Arc<ShellHeap>,
    host_context: Mutex<Option<Box<HostContext>>>,
}

// SAFETY: the engine's entry points are callable from any thread, as
// required by `ForeignEngine::new`.
unsafe impl Send for ForeignEngine {}
unsafe impl Sync for ForeignEngine {}

impl ForeignEngine {
    /// # Safety
    /// - every function pointer in `vtable` must be valid for the lifetime
    ///   of the returned value and callable from any thread with `context`
    /// - `free_buffer` must release strings the engine hands to the host
    pub unsafe fn new(vtable: EngineVTable) -> Self {
        Self {
            engine_heap: Arc::new(ForeignHeap::new(vtable.free_buffer)),
            shell_heap: Arc::new(ShellHeap),
            vtable,
            host_context: Mutex::new(None),
        }
    }

    fn host_context(&self) -> MutexGuard<'_, Option<Box<HostContext>>> {
        self.host_context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn borrowed(&self, text: &str) -> Result<CrossBoundaryBuffer, BridgeError> {
        CrossBoundaryBuffer::allocate(Arc::clone(&self.shell_heap), text)
    }
}

impl Engine for ForeignEngine {
    fn serve(&self, host: Arc<dyn Host>) -> Result<(), BridgeError> {
        let mut slot = self.host_context();
        if slot.is_some() {
            return Err(BridgeError::AlreadyServing);
        }
        let context = Box::new(HostContext::new(host, Arc::clone(&self.engine_heap)));
        let vtable = context.vtable();
        // SAFETY: the vtable outlives the call; the engine copies it.
        let accepted = unsafe { (self.vtable.serve)(self.vtable.context, &vtable) };
        if !accepted {
            return Err(BridgeError::Engine("engine refused to serve".into()));
        }
        *slot = Some(context);
        Ok(())
    }

    fn call(&self, id: QueryId, payload: &str) -> Result<(), BridgeError> {
        let payload = self.borrowed(payload)?;
        // SAFETY: payload stays alive until after the call returns.
        let accepted =
            unsafe { (self.vtable.call)(self.vtable.context, id.get(), payload.as_ptr()) };
        if accepted {
            Ok(())
        } else {
            Err(BridgeError::Engine(format!("engine rejected query {id}")))
        }
    }

    fn set_online(&self, online: bool) {
        unsafe { (self.vtable.set_online)(self.vtable.context, online) }
    }

    fn handle_uri(&self, uri: &str) {
        match self.borrowed(uri) {
            Ok(uri) => unsafe { (self.vtable.handle_uri)(self.vtable.context, uri.as_ptr()) },
            Err(err) => debug!(%err, "uri not forwarded"),
        }
    }

    fn log(&self, message: &str) {
        match self.borrowed(message) {
            Ok(message) => unsafe { (self.vtable.log)(self.vtable.context, message.as_ptr()) },
            Err(err) => debug!(%err, "log line not forwarded"),
        }
    }

    fn manual_reconnect(&self) {
        if let Some(reconnect) = self.vtable.manual_reconnect {
            unsafe { reconnect(self.vtable.context) }
        }
    }

    fn using_mobile_data_changed(&self) {
        if let Some(changed) = self.vtable.using_mobile_data_changed {
            unsafe { changed(self.vtable.context) }
        }
    }

    fn shutdown(&self) {
        unsafe { (self.vtable.shutdown)(self.vtable.context) }
        // The engine has stopped calling back; its host context can go.
        if self.host_context().take().is_some() {
            debug!("foreign engine host context released");
        }
    }
}
