use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::receiver::Receiver;

type Slot = Option<Box<dyn Receiver>>;

/// Mutex-guarded slot holding the current receiver, or nothing.
///
/// Delivery checks for a receiver and invokes it under the same lock that
/// `detach` takes, so once `detach` returns no delivery can reach the
/// receiver it removed.
pub struct LifecycleGuard {
    slot: Mutex<Slot>,
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn with_receiver(receiver: Box<dyn Receiver>) -> Self {
        Self {
            slot: Mutex::new(Some(receiver)),
        }
    }

    // A receiver that panicked mid-delivery must not wedge teardown.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a receiver, returning the one it replaces.
    #[cfg(test)]
    pub(crate) fn attach(&self, receiver: Box<dyn Receiver>) -> Option<Box<dyn Receiver>> {
        self.lock().replace(receiver)
    }

    /// Empty the slot. Blocks until any in-flight delivery has returned. The
    /// caller drops the returned receiver outside the lock.
    pub fn detach(&self) -> Option<Box<dyn Receiver>> {
        let receiver = self.lock().take();
        if receiver.is_some() {
            debug!("receiver detached");
        }
        receiver
    }

    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    /// Run `deliver` against the current receiver while holding the lock.
    ///
    /// Returns `None` when there is no receiver or it is not ready yet.
    pub fn deliver<R>(&self, deliver: impl FnOnce(&dyn Receiver) -> R) -> Option<R> {
        let slot = self.lock();
        match slot.as_deref() {
            Some(receiver) if receiver.is_ready() => Some(deliver(receiver)),
            _ => None,
        }
    }
}

impl Default for LifecycleGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counter {
        pushes: AtomicUsize,
        not_ready: AtomicBool,
    }

    struct CountingReceiver(Arc<Counter>);

    impl Receiver for CountingReceiver {
        fn on_push(&self, _payload: &str) {
            self.0.pushes.fetch_add(1, Ordering::SeqCst);
        }

        fn is_ready(&self) -> bool {
            !self.0.not_ready.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn deliver_reaches_attached_receiver() {
        let counter = Arc::new(Counter::default());
        let guard = LifecycleGuard::with_receiver(Box::new(CountingReceiver(counter.clone())));

        assert_eq!(guard.deliver(|r| r.on_push("x")), Some(()));
        assert_eq!(counter.pushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deliver_without_receiver_is_none() {
        let guard = LifecycleGuard::new();
        assert!(!guard.is_attached());
        assert_eq!(guard.deliver(|r| r.on_push("x")), None);
    }

    #[test]
    fn deliver_skips_receiver_that_is_not_ready() {
        let counter = Arc::new(Counter::default());
        counter.not_ready.store(true, Ordering::SeqCst);
        let guard = LifecycleGuard::with_receiver(Box::new(CountingReceiver(counter.clone())));

        assert_eq!(guard.deliver(|r| r.on_push("x")), None);
        counter.not_ready.store(false, Ordering::SeqCst);
        assert_eq!(guard.deliver(|r| r.on_push("x")), Some(()));
        assert_eq!(counter.pushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detach_empties_slot() {
        let counter = Arc::new(Counter::default());
        let guard = LifecycleGuard::with_receiver(Box::new(CountingReceiver(counter.clone())));

        assert!(guard.detach().is_some());
        assert!(guard.detach().is_none());
        assert_eq!(guard.deliver(|r| r.on_push("late")), None);
        assert_eq!(counter.pushes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn attach_returns_previous_receiver() {
        let guard = LifecycleGuard::new();
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());

        assert!(guard.attach(Box::new(CountingReceiver(first.clone()))).is_none());
        assert!(guard.attach(Box::new(CountingReceiver(second.clone()))).is_some());

        guard.deliver(|r| r.on_push("x"));
        assert_eq!(first.pushes.load(Ordering::SeqCst), 0);
        assert_eq!(second.pushes.load(Ordering::SeqCst), 1);
    }
}
