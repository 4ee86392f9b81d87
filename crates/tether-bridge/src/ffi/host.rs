//! `extern "C"` trampolines from a foreign engine into a [`Host`].

use std::ffi::{c_char, c_void};
use std::ptr::{self, NonNull};
use std::sync::Arc;

use tether_common::QueryId;
use tracing::warn;

use super::types::HostVTable;
use crate::capability::Host;
use crate::ownership::{CrossBoundaryBuffer, Deallocate, ForeignHeap, ShellHeap};

/// What the host vtable's `context` points at. Lives in a `Box` owned by
/// the `ForeignEngine` until the engine has shut down.
pub(crate) struct HostContext {
    host: Arc<dyn Host>,
    engine_heap: Arc<ForeignHeap>,
}

impl HostContext {
    pub(crate) fn new(host: Arc<dyn Host>, engine_heap: Arc<ForeignHeap>) -> Self {
        Self { host, engine_heap }
    }

    pub(crate) fn vtable(&self) -> HostVTable {
        HostVTable {
            context: self as *const Self as *mut c_void,
            push_notify: host_push_notify,
            respond: host_respond,
            notify_user: host_notify_user,
            preferred_locale: host_preferred_locale,
            get_save_filename: host_get_save_filename,
            system_open: host_system_open,
            log: host_log,
            detect_dark_theme: host_detect_dark_theme,
            set_dark_theme: host_set_dark_theme,
            using_mobile_data: host_using_mobile_data,
            free_host_buffer: tether_free_buffer,
        }
    }

    /// Copy an engine-allocated string and hand it back to the engine's heap.
    unsafe fn take_string(&self, ptr: *mut c_char) -> Option<String> {
        let heap: Arc<dyn Deallocate> = self.engine_heap.clone();
        let buffer = CrossBoundaryBuffer::from_raw(ptr, heap)?;
        match buffer.into_string() {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(%err, "dropping engine string");
                None
            }
        }
    }
}

unsafe fn context<'a>(ctx: *mut c_void) -> Option<&'a HostContext> {
    (ctx as *const HostContext).as_ref()
}

/// Allocate a string for the engine on the shell heap. Null on failure.
fn give_string(text: &str) -> *mut c_char {
    match CrossBoundaryBuffer::allocate(Arc::new(ShellHeap), text) {
        Ok(buffer) => buffer.into_raw(),
        Err(err) => {
            warn!(%err, "cannot hand string to engine");
            ptr::null_mut()
        }
    }
}

unsafe extern "C" fn host_push_notify(ctx: *mut c_void, payload: *mut c_char) {
    let Some(ctx) = context(ctx) else { return };
    if let Some(payload) = ctx.take_string(payload) {
        ctx.host.push_notify(&payload);
    }
}

unsafe extern "C" fn host_respond(ctx: *mut c_void, id: u64, payload: *mut c_char) {
    let Some(ctx) = context(ctx) else { return };
    if let Some(payload) = ctx.take_string(payload) {
        ctx.host.respond(QueryId(id), &payload);
    }
}

unsafe extern "C" fn host_notify_user(ctx: *mut c_void, message: *mut c_char) {
    let Some(ctx) = context(ctx) else { return };
    if let Some(message) = ctx.take_string(message) {
        ctx.host.notify_user(&message);
    }
}

unsafe extern "C" fn host_preferred_locale(ctx: *mut c_void) -> *mut c_char {
    let Some(ctx) = context(ctx) else {
        return ptr::null_mut();
    };
    give_string(&ctx.host.preferred_locale())
}

unsafe extern "C" fn host_get_save_filename(
    ctx: *mut c_void,
    suggested: *mut c_char,
) -> *mut c_char {
    let Some(ctx) = context(ctx) else {
        return ptr::null_mut();
    };
    let suggested = ctx.take_string(suggested).unwrap_or_default();
    give_string(&ctx.host.get_save_filename(&suggested))
}

unsafe extern "C" fn host_system_open(ctx: *mut c_void, url: *mut c_char) -> bool {
    let Some(ctx) = context(ctx) else { return false };
    let Some(url) = ctx.take_string(url) else {
        return false;
    };
    match ctx.host.system_open(&url) {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, url = %url, "system open failed");
            false
        }
    }
}

unsafe extern "C" fn host_log(ctx: *mut c_void, message: *mut c_char) {
    let Some(ctx) = context(ctx) else { return };
    if let Some(message) = ctx.take_string(message) {
        ctx.host.log(&message);
    }
}

unsafe extern "C" fn host_detect_dark_theme(ctx: *mut c_void) -> bool {
    context(ctx).is_some_and(|ctx| ctx.host.detect_dark_theme())
}

unsafe extern "C" fn host_set_dark_theme(ctx: *mut c_void, dark: bool) {
    if let Some(ctx) = context(ctx) {
        ctx.host.set_dark_theme(dark);
    }
}

unsafe extern "C" fn host_using_mobile_data(ctx: *mut c_void) -> bool {
    context(ctx).is_some_and(|ctx| ctx.host.using_mobile_data())
}

/// Release a string the shell handed to the engine.
///
/// # Safety
/// - `ptr` must be null or a string returned by a host callback
/// - `ptr` must not be used after this call
#[no_mangle]
pub unsafe extern "C" fn tether_free_buffer(ptr: *mut c_char) {
    if let Some(ptr) = NonNull::new(ptr) {
        ShellHeap.free(ptr);
    }
}
