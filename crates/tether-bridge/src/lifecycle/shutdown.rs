use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::{debug, info, warn};

use super::guard::LifecycleGuard;

/// Bridge lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Detaching,
    Stopped,
}

/// The participants of a teardown, called in order by
/// [`ShutdownCoordinator::shutdown`].
pub trait ShutdownSequence {
    /// Reject new calls and unblock engine threads waiting on the UI thread.
    fn stop_accepting(&self);

    /// Drop pending interests without invoking them. Returns how many.
    fn abandon_pending(&self) -> usize;

    /// Tell the engine to stop producing callbacks.
    fn stop_engine(&self);
}

struct Progress {
    state: LifecycleState,
    /// Thread running the teardown, while `Detaching`.
    owner: Option<ThreadId>,
}

/// Drives the ordered teardown exactly once. Concurrent callers wait for
/// the first one to finish.
pub struct ShutdownCoordinator {
    progress: Mutex<Progress>,
    stopped: Condvar,
}

/// Publishes `Stopped` even if a teardown step panics, so waiters wake up.
struct Finish<'a>(&'a ShutdownCoordinator);

impl Drop for Finish<'_> {
    fn drop(&mut self) {
        let mut progress = self.0.lock();
        progress.state = LifecycleState::Stopped;
        progress.owner = None;
        drop(progress);
        self.0.stopped.notify_all();
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(Progress {
                state: LifecycleState::Running,
                owner: None,
            }),
            stopped: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Run the teardown:
    /// 1. stop accepting new calls
    /// 2. detach the receiver (waits out in-flight deliveries)
    /// 3. abandon pending queries
    /// 4. drop the receiver, outside the receiver lock
    /// 5. stop the engine
    ///
    /// Returns `false` if another call already ran it. A call that overlaps
    /// a running teardown blocks until it has finished, except when made
    /// from the teardown itself.
    pub fn shutdown(&self, guard: &LifecycleGuard, sequence: &dyn ShutdownSequence) -> bool {
        let me = thread::current().id();
        {
            let mut progress = self.lock();
            match progress.state {
                LifecycleState::Running => {
                    progress.state = LifecycleState::Detaching;
                    progress.owner = Some(me);
                }
                LifecycleState::Detaching if progress.owner == Some(me) => {
                    warn!("shutdown re-entered from its own teardown");
                    return false;
                }
                LifecycleState::Detaching => {
                    debug!("shutdown in progress; waiting for it");
                    while progress.state != LifecycleState::Stopped {
                        progress = self
                            .stopped
                            .wait(progress)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    return false;
                }
                LifecycleState::Stopped => {
                    debug!("shutdown already done");
                    return false;
                }
            }
        }
        let _finish = Finish(self);
        info!("bridge shutdown started");

        sequence.stop_accepting();

        let receiver = guard.detach();
        let abandoned = sequence.abandon_pending();
        if abandoned > 0 {
            info!(abandoned, "pending queries abandoned");
        }

        drop(receiver);

        sequence.stop_engine();

        info!("bridge shutdown complete");
        true
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
