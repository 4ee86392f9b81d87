use std::ffi::{c_char, c_void};

/// Callbacks the shell hands to a foreign engine in `serve`.
///
/// Every callback takes `context` as its first argument. String arguments
/// are allocated by the engine; the host copies them and releases them
/// through the engine's `free_buffer`. Strings the host returns are
/// allocated by the host; the engine releases them with `free_host_buffer`
/// (the same function as [`tether_free_buffer`](super::tether_free_buffer)).
///
/// The engine must copy this struct during `serve`; the pointer it is handed
/// is only valid for that call.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HostVTable {
    pub context: *mut c_void,
    pub push_notify: unsafe extern "C" fn(*mut c_void, *mut c_char),
    pub respond: unsafe extern "C" fn(*mut c_void, u64, *mut c_char),
    pub notify_user: unsafe extern "C" fn(*mut c_void, *mut c_char),
    pub preferred_locale: unsafe extern "C" fn(*mut c_void) -> *mut c_char,
    pub get_save_filename: unsafe extern "C" fn(*mut c_void, *mut c_char) -> *mut c_char,
    pub system_open: unsafe extern "C" fn(*mut c_void, *mut c_char) -> bool,
    pub log: unsafe extern "C" fn(*mut c_void, *mut c_char),
    pub detect_dark_theme: unsafe extern "C" fn(*mut c_void) -> bool,
    pub set_dark_theme: unsafe extern "C" fn(*mut c_void, bool),
    pub using_mobile_data: unsafe extern "C" fn(*mut c_void) -> bool,
    pub free_host_buffer: unsafe extern "C" fn(*mut c_char),
}

/// Entry points of a foreign engine.
///
/// String arguments are borrowed for the duration of the call; the engine
/// copies what it keeps. Optional entries may be null.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct EngineVTable {
    pub context: *mut c_void,
    /// Returns `false` if the engine refuses to start.
    pub serve: unsafe extern "C" fn(*mut c_void, *const HostVTable) -> bool,
    /// Returns `false` if the query was not accepted.
    pub call: unsafe extern "C" fn(*mut c_void, u64, *const c_char) -> bool,
    pub set_online: unsafe extern "C" fn(*mut c_void, bool),
    pub handle_uri: unsafe extern "C" fn(*mut c_void, *const c_char),
    pub log: unsafe extern "C" fn(*mut c_void, *const c_char),
    pub manual_reconnect: Option<unsafe extern "C" fn(*mut c_void)>,
    pub using_mobile_data_changed: Option<unsafe extern "C" fn(*mut c_void)>,
    /// Blocks until the engine has stopped issuing host callbacks.
    pub shutdown: unsafe extern "C" fn(*mut c_void),
    /// Releases strings the engine allocated.
    pub free_buffer: unsafe extern "C" fn(*mut c_char),
}
