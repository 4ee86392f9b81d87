use std::sync::{
    Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use tether_common::BridgeError;

use crate::capability::Engine;

enum LinkState {
    Idle,
    Serving(Arc<dyn Engine>),
    Closed,
}

/// The shell's connection to the engine.
///
/// The state lock is only held long enough to register a forward as in
/// flight; the engine itself is called without it, so a call may re-enter
/// the bridge. [`close`](Self::close) flips the state and then waits for the
/// in-flight count to drain.
pub(crate) struct EngineLink {
    state: RwLock<LinkState>,
    in_flight: Mutex<usize>,
    drained: Condvar,
}

/// Marks one forward as in flight until dropped.
struct Flight<'a>(&'a EngineLink);

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let mut count = self.0.count();
        *count -= 1;
        if *count == 0 {
            self.0.drained.notify_all();
        }
    }
}

impl EngineLink {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(LinkState::Idle),
            in_flight: Mutex::new(0),
            drained: Condvar::new(),
        }
    }

    fn count(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, LinkState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LinkState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `engine` and run `start` against it. Calls issued meanwhile
    /// wait for `start` to finish; if it fails the link stays idle.
    pub(crate) fn attach(
        &self,
        engine: Arc<dyn Engine>,
        start: impl FnOnce(&dyn Engine) -> Result<(), BridgeError>,
    ) -> Result<(), BridgeError> {
        let mut state = self.write();
        match *state {
            LinkState::Idle => {
                start(engine.as_ref())?;
                *state = LinkState::Serving(engine);
                Ok(())
            }
            LinkState::Serving(_) => Err(BridgeError::AlreadyServing),
            LinkState::Closed => Err(BridgeError::Closed),
        }
    }

    /// Run `f` against the engine. `close` does not return while `f` runs.
    pub(crate) fn with_engine<R>(
        &self,
        f: impl FnOnce(&dyn Engine) -> Result<R, BridgeError>,
    ) -> Result<R, BridgeError> {
        let (engine, _flight) = {
            let state = self.read();
            match &*state {
                LinkState::Serving(engine) => {
                    *self.count() += 1;
                    (Arc::clone(engine), Flight(self))
                }
                LinkState::Idle => return Err(BridgeError::NotServing),
                LinkState::Closed => return Err(BridgeError::Closed),
            }
        };
        f(engine.as_ref())
    }

    /// Close the link, waiting out in-flight forwards. Returns the engine
    /// if one was serving.
    ///
    /// Must not be called from inside a forward on the same thread.
    pub(crate) fn close(&self) -> Option<Arc<dyn Engine>> {
        let engine = match std::mem::replace(&mut *self.write(), LinkState::Closed) {
            LinkState::Serving(engine) => Some(engine),
            LinkState::Idle | LinkState::Closed => None,
        };
        let mut count = self.count();
        while *count > 0 {
            count = self
                .drained
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
        engine
    }

    pub(crate) fn in_flight(&self) -> usize {
        *self.count()
    }

    pub(crate) fn is_serving(&self) -> bool {
        matches!(*self.read(), LinkState::Serving(_))
    }
}
