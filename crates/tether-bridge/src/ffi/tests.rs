//! Drives a bridge through the C ABI with an engine double built from
//! `extern "C"` functions.

use super::*;
use crate::marshal::UiLoop;
use crate::{Bridge, BridgeOptions, Engine, Receiver};
use std::cell::Cell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tether_common::{BridgeError, QueryId};
use tether_config::DeliveryMode;

thread_local! {
    static ENGINE_ALLOCS: Cell<usize> = const { Cell::new(0) };
    static ENGINE_FREES: Cell<usize> = const { Cell::new(0) };
}

fn engine_string(text: &[u8]) -> *mut c_char {
    ENGINE_ALLOCS.with(|n| n.set(n.get() + 1));
    CString::new(text).unwrap().into_raw()
}

unsafe extern "C" fn fake_free(ptr: *mut c_char) {
    ENGINE_FREES.with(|n| n.set(n.get() + 1));
    drop(CString::from_raw(ptr));
}

fn outstanding_engine_strings() -> isize {
    ENGINE_ALLOCS.with(Cell::get) as isize - ENGINE_FREES.with(Cell::get) as isize
}

#[derive(Default)]
struct FakeEngine {
    host: Mutex<Option<HostVTable>>,
    calls: Mutex<Vec<(u64, String)>>,
    uris: Mutex<Vec<String>>,
    online: Mutex<Vec<bool>>,
    reconnects: AtomicUsize,
    shutdowns: AtomicUsize,
    refuse: AtomicBool,
}

unsafe fn fake<'a>(ctx: *mut c_void) -> &'a FakeEngine {
    &*(ctx as *const FakeEngine)
}

unsafe fn copied(text: *const c_char) -> String {
    CStr::from_ptr(text).to_str().unwrap().to_owned()
}

unsafe extern "C" fn fake_serve(ctx: *mut c_void, host: *const HostVTable) -> bool {
    let engine = fake(ctx);
    if engine.refuse.load(Ordering::SeqCst) {
        return false;
    }
    *engine.host.lock().unwrap() = Some(*host);
    true
}

unsafe extern "C" fn fake_call(ctx: *mut c_void, id: u64, payload: *const c_char) -> bool {
    fake(ctx).calls.lock().unwrap().push((id, copied(payload)));
    true
}

unsafe extern "C" fn fake_set_online(ctx: *mut c_void, online: bool) {
    fake(ctx).online.lock().unwrap().push(online);
}

unsafe extern "C" fn fake_handle_uri(ctx: *mut c_void, uri: *const c_char) {
    fake(ctx).uris.lock().unwrap().push(copied(uri));
}

unsafe extern "C" fn fake_log(_ctx: *mut c_void, _message: *const c_char) {}

unsafe extern "C" fn fake_reconnect(ctx: *mut c_void) {
    fake(ctx).reconnects.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn fake_shutdown(ctx: *mut c_void) {
    let engine = fake(ctx);
    engine.shutdowns.fetch_add(1, Ordering::SeqCst);
    engine.host.lock().unwrap().take();
}

impl FakeEngine {
    fn vtable(&self) -> EngineVTable {
        EngineVTable {
            context: self as *const Self as *mut c_void,
            serve: fake_serve,
            call: fake_call,
            set_online: fake_set_online,
            handle_uri: fake_handle_uri,
            log: fake_log,
            manual_reconnect: Some(fake_reconnect),
            using_mobile_data_changed: None,
            shutdown: fake_shutdown,
            free_buffer: fake_free,
        }
    }

    fn host(&self) -> HostVTable {
        self.host.lock().unwrap().expect("not served")
    }

    fn respond(&self, id: u64, payload: &str) {
        let host = self.host();
        unsafe { (host.respond)(host.context, id, engine_string(payload.as_bytes())) }
    }

    fn push(&self, payload: &[u8]) {
        let host = self.host();
        unsafe { (host.push_notify)(host.context, engine_string(payload)) }
    }

    fn log(&self, message: &str) {
        let host = self.host();
        unsafe { (host.log)(host.context, engine_string(message.as_bytes())) }
    }

    /// Read a host-allocated string and give it back through the host's
    /// free function.
    unsafe fn take_host_string(&self, text: *mut c_char) -> Option<String> {
        if text.is_null() {
            return None;
        }
        let copy = copied(text);
        (self.host().free_host_buffer)(text);
        Some(copy)
    }

    fn save_filename(&self, suggested: &str) -> Option<String> {
        let host = self.host();
        unsafe {
            let suggested = engine_string(suggested.as_bytes());
            let chosen = (host.get_save_filename)(host.context, suggested);
            self.take_host_string(chosen)
        }
    }

    fn locale(&self) -> Option<String> {
        let host = self.host();
        unsafe { self.take_host_string((host.preferred_locale)(host.context)) }
    }
}

#[derive(Default)]
struct Inbox {
    pushes: Mutex<Vec<String>>,
}

struct Collector(Arc<Inbox>);

impl Receiver for Collector {
    fn on_push(&self, payload: &str) {
        self.0.pushes.lock().unwrap().push(payload.to_string());
    }
}

fn bridge(ui: &UiLoop, inbox: &Arc<Inbox>) -> Bridge {
    Bridge::new(
        Box::new(Collector(inbox.clone())),
        ui.marshaler(),
        BridgeOptions {
            delivery: DeliveryMode::Inline,
            preferred_locale: Some("pt-BR".into()),
        },
    )
    .unwrap()
}

#[test]
fn query_round_trip_through_c_abi() {
    let ui = UiLoop::headless();
    let inbox = Arc::new(Inbox::default());
    let fake = Box::new(FakeEngine::default());
    let bridge = bridge(&ui, &inbox);
    bridge
        .serve(Arc::new(unsafe { ForeignEngine::new(fake.vtable()) }))
        .unwrap();

    let answer = Arc::new(Mutex::new(None));
    let sink = answer.clone();
    let id = bridge
        .dispatch_with("ping", move |response| {
            *sink.lock().unwrap() = Some(response.payload);
        })
        .unwrap();
    assert_eq!(
        *fake.calls.lock().unwrap(),
        vec![(id.get(), "ping".to_string())]
    );

    fake.respond(id.get(), "pong");
    fake.respond(id.get(), "pong again");

    assert_eq!(answer.lock().unwrap().as_deref(), Some("pong"));
    assert_eq!(outstanding_engine_strings(), 0);
    bridge.shutdown();
}

#[test]
fn engine_strings_are_freed_exactly_once() {
    let ui = UiLoop::headless();
    let inbox = Arc::new(Inbox::default());
    let fake = Box::new(FakeEngine::default());
    let bridge = bridge(&ui, &inbox);
    bridge
        .serve(Arc::new(unsafe { ForeignEngine::new(fake.vtable()) }))
        .unwrap();

    let frees_before = ENGINE_FREES.with(Cell::get);
    fake.push(br#"{"subject":"accounts","action":"reload"}"#);
    fake.push(&[0xff, 0xfe]);
    fake.log("INFO: synced");
    fake.respond(999, "nobody asked");

    assert_eq!(ENGINE_FREES.with(Cell::get) - frees_before, 4);
    assert_eq!(outstanding_engine_strings(), 0);
    assert_eq!(
        *inbox.pushes.lock().unwrap(),
        vec![r#"{"subject":"accounts","action":"reload"}"#.to_string()]
    );
    bridge.shutdown();
}

#[test]
fn host_returned_strings_use_host_heap() {
    let ui = UiLoop::headless();
    let inbox = Arc::new(Inbox::default());
    let fake = Box::new(FakeEngine::default());
    let bridge = bridge(&ui, &inbox);
    bridge
        .serve(Arc::new(unsafe { ForeignEngine::new(fake.vtable()) }))
        .unwrap();

    // Called on the UI thread, so the headless dialog runs inline and
    // reports a cancel.
    assert_eq!(fake.save_filename("wallet.csv"), Some(String::new()));
    assert_eq!(fake.locale(), Some("pt-BR".to_string()));
    assert_eq!(outstanding_engine_strings(), 0);
    bridge.shutdown();
}

#[test]
fn controls_reach_foreign_engine() {
    let ui = UiLoop::headless();
    let inbox = Arc::new(Inbox::default());
    let fake = Box::new(FakeEngine::default());
    let bridge = bridge(&ui, &inbox);
    bridge
        .serve(Arc::new(unsafe { ForeignEngine::new(fake.vtable()) }))
        .unwrap();

    bridge.set_online(true).unwrap();
    bridge.handle_uri("tether://send?amount=1").unwrap();
    bridge.manual_reconnect().unwrap();
    bridge.using_mobile_data_changed().unwrap();
    bridge.log_to_engine("shell says hi").unwrap();

    assert_eq!(*fake.online.lock().unwrap(), vec![true]);
    assert_eq!(
        *fake.uris.lock().unwrap(),
        vec!["tether://send?amount=1".to_string()]
    );
    assert_eq!(fake.reconnects.load(Ordering::SeqCst), 1);
    bridge.shutdown();
}

#[test]
fn shutdown_stops_engine_and_releases_host() {
    let ui = UiLoop::headless();
    let inbox = Arc::new(Inbox::default());
    let fake = Box::new(FakeEngine::default());
    let bridge = bridge(&ui, &inbox);
    bridge
        .serve(Arc::new(unsafe { ForeignEngine::new(fake.vtable()) }))
        .unwrap();

    assert!(bridge.shutdown());
    assert_eq!(fake.shutdowns.load(Ordering::SeqCst), 1);
    assert!(fake.host.lock().unwrap().is_none());
    assert_eq!(bridge.dispatch("late").unwrap_err(), BridgeError::Closed);
    assert!(fake.calls.lock().unwrap().is_empty());
}

#[test]
fn refused_serve_is_an_engine_error() {
    let fake = Box::new(FakeEngine::default());
    fake.refuse.store(true, Ordering::SeqCst);
    let engine = unsafe { ForeignEngine::new(fake.vtable()) };

    struct NoHost;
    impl crate::Host for NoHost {
        fn push_notify(&self, _payload: &str) {}
        fn respond(&self, _id: QueryId, _payload: &str) {}
        fn notify_user(&self, _message: &str) {}
        fn preferred_locale(&self) -> String {
            String::new()
        }
        fn get_save_filename(&self, _suggested: &str) -> String {
            String::new()
        }
        fn system_open(&self, _url: &str) -> Result<(), BridgeError> {
            Ok(())
        }
        fn log(&self, _message: &str) {}
        fn detect_dark_theme(&self) -> bool {
            false
        }
        fn set_dark_theme(&self, _dark: bool) {}
        fn using_mobile_data(&self) -> bool {
            false
        }
    }

    assert!(matches!(
        engine.serve(Arc::new(NoHost)),
        Err(BridgeError::Engine(_))
    ));
}

#[test]
fn free_buffer_accepts_null() {
    unsafe { tether_free_buffer(ptr::null_mut()) };
}
