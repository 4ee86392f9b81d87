//! Running UI-only work on the single UI thread.
//!
//! `UiLoop` is created on the UI thread and never leaves it. It owns a FIFO
//! of tasks that other threads submit through a cloneable [`UiMarshaler`].
//! Tasks receive a [`UiContext`], the only way to reach the shell's
//! [`UiServices`]. `UiContext` is neither `Send` nor `Sync`, so UI services
//! cannot be touched from another thread without going through the queue.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::ptr;
use std::rc::Rc;
use std::sync::{mpsc, Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tether_common::BridgeError;
use tracing::{debug, info, warn};


/// Shell operations that are only valid on the UI thread.
///
/// Every method is optional; the defaults describe a headless shell.
pub trait UiServices {
    /// Ask the user where to save a file. `None` means the dialog was
    /// dismissed.
    fn save_file_dialog(&self, _suggested: &str) -> Option<PathBuf> {
        None
    }

    fn show_tray_message(&self, title: &str, message: &str) {
        info!(title, message, "tray message (headless)");
    }

    fn open_external(&self, url: &str) -> Result<(), String> {
        Err(format!("cannot open {url}: no desktop integration"))
    }

    fn detect_dark_theme(&self) -> bool {
        false
    }

    fn set_dark_theme(&self, _dark: bool) {}

    fn using_mobile_data(&self) -> bool {
        false
    }
}

/// UI services for a shell with no windowing.
#[derive(Debug, Default)]
pub struct HeadlessUi;

impl UiServices for HeadlessUi {}

thread_local! {
    static UI_SERVICES: RefCell<Option<Rc<dyn UiServices>>> = const { RefCell::new(None) };
}

/// Proof of running on the UI thread, handed to marshaled tasks.
pub struct UiContext {
    services: Rc<dyn UiServices>,
    _not_send: PhantomData<*const ()>,
}

impl UiContext {
    fn current() -> Option<Self> {
        UI_SERVICES.with(|cell| {
            cell.borrow().as_ref().map(|services| Self {
                services: Rc::clone(services),
                _not_send: PhantomData,
            })
        })
    }

    pub fn services(&self) -> &dyn UiServices {
        &*self.services
    }
}

type Task = Box<dyn FnOnce(&UiContext) + Send>;

struct QueueState {
    tasks: VecDeque<Task>,
    closed: bool,
    quit: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Condvar,
    ui_thread: ThreadId,
    warn_depth: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The UI thread's cooperative task loop.
pub struct UiLoop {
    shared: Arc<Shared>,
    services: Rc<dyn UiServices>,
}

impl UiLoop {
    /// Bind a loop to the calling thread, which becomes the UI thread.
    pub fn new(services: Rc<dyn UiServices>) -> Self {
        Self::with_warn_depth(services, 64)
    }

    pub fn headless() -> Self {
        Self::new(Rc::new(HeadlessUi))
    }

    /// Like [`new`](Self::new), warning once the queue holds `warn_depth`
    /// waiting tasks.
    pub fn with_warn_depth(services: Rc<dyn UiServices>, warn_depth: usize) -> Self {
        let replaced = UI_SERVICES.with(|cell| cell.borrow_mut().replace(Rc::clone(&services)));
        if replaced.is_some() {
            warn!("a UI loop was already bound to this thread; replacing its services");
        }
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    tasks: VecDeque::new(),
                    closed: false,
                    quit: false,
                }),
                wake: Condvar::new(),
                ui_thread: thread::current().id(),
                warn_depth: warn_depth.max(1),
            }),
            services,
        }
    }

    pub fn marshaler(&self) -> UiMarshaler {
        UiMarshaler {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Context for code already running on the UI thread.
    pub fn context(&self) -> Option<UiContext> {
        UiContext::current()
    }

    /// Run every task queued right now, without blocking. Returns how many
    /// ran. Tasks queued by those tasks wait for the next call.
    pub fn pump(&self) -> usize {
        let batch: Vec<Task> = self.shared.lock().tasks.drain(..).collect();
        let count = batch.len();
        if let Some(ctx) = UiContext::current() {
            for task in batch {
                task(&ctx);
            }
        }
        count
    }

    /// Process tasks until [`UiMarshaler::quit`] or [`UiMarshaler::close`].
    pub fn run(&self) {
        let Some(ctx) = UiContext::current() else {
            warn!("UI loop run without services bound to this thread");
            return;
        };
        debug!("UI loop running");
        loop {
            let task = {
                let mut state = self.shared.lock();
                loop {
                    if state.closed {
                        debug!("UI loop closed");
                        return;
                    }
                    if state.quit {
                        state.quit = false;
                        debug!("UI loop quit requested");
                        return;
                    }
                    if let Some(task) = state.tasks.pop_front() {
                        break task;
                    }
                    state = self
                        .shared
                        .wake
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            };
            task(&ctx);
        }
    }
}

impl Drop for UiLoop {
    fn drop(&mut self) {
        self.marshaler().close();
        // Leave a newer loop's services in place.
        UI_SERVICES.with(|cell| {
            let mut slot = cell.borrow_mut();
            let ours = slot.as_ref().is_some_and(|bound| {
                ptr::addr_eq(Rc::as_ptr(bound), Rc::as_ptr(&self.services))
            });
            if ours {
                slot.take();
            }
        });
    }
}

/// Cloneable, thread-safe handle for submitting work to the UI thread.
#[derive(Clone)]
pub struct UiMarshaler {
    shared: Arc<Shared>,
}

impl UiMarshaler {
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.shared.ui_thread
    }

    /// Run `f` on the UI thread and return its result.
    ///
    /// On the UI thread `f` runs inline, so nested calls do not deadlock.
    /// Elsewhere the call is queued and the calling thread blocks until the
    /// UI loop has run it. Fails with `UiLoopClosed` if the loop is closed
    /// before `f` runs.
    pub fn run_on_ui_thread<R, F>(&self, f: F) -> Result<R, BridgeError>
    where
        R: Send + 'static,
        F: FnOnce(&UiContext) -> R + Send + 'static,
    {
        if self.is_ui_thread() {
            let ctx = UiContext::current().ok_or(BridgeError::UiLoopClosed)?;
            return Ok(f(&ctx));
        }

        let (tx, rx) = mpsc::sync_channel(1);
        self.enqueue(Box::new(move |ctx: &UiContext| {
            let _ = tx.send(f(ctx));
        }))?;
        rx.recv().map_err(|_| BridgeError::UiLoopClosed)
    }

    /// Queue `f` for the UI thread without waiting for it.
    pub fn post<F>(&self, f: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&UiContext) + Send + 'static,
    {
        self.enqueue(Box::new(f))
    }

    fn enqueue(&self, task: Task) -> Result<(), BridgeError> {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(BridgeError::UiLoopClosed);
        }
        state.tasks.push_back(task);
        let depth = state.tasks.len();
        drop(state);

        if depth == self.shared.warn_depth {
            warn!(depth, "UI queue is backing up");
        }
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Ask a running [`UiLoop::run`] to return after its current task.
    pub fn quit(&self) {
        self.shared.lock().quit = true;
        self.shared.wake.notify_all();
    }

    /// Reject further tasks and drop the queued ones. Threads blocked in
    /// `run_on_ui_thread` wake with `UiLoopClosed`. Returns how many tasks
    /// were dropped.
    pub fn close(&self) -> usize {
        let dropped: Vec<Task> = {
            let mut state = self.shared.lock();
            if state.closed {
                return 0;
            }
            state.closed = true;
            state.tasks.drain(..).collect()
        };
        self.shared.wake.notify_all();
        let count = dropped.len();
        // Dropping the tasks drops their result senders outside the lock.
        drop(dropped);
        if count > 0 {
            debug!(count, "queued UI tasks dropped on close");
        }
        count
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn queued(&self) -> usize {
        self.shared.lock().tasks.len()
    }
}
