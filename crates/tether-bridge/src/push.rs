//! Unsolicited engine messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::lifecycle::LifecycleGuard;

/// Delivery counters for pushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushStats {
    pub delivered: u64,
    /// Pushes that arrived with no ready receiver.
    pub dropped: u64,
}

/// Hands pushes to the current receiver, one at a time, in arrival order.
/// With no ready receiver a push is lost.
pub(crate) struct PushChannel {
    guard: Arc<LifecycleGuard>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl PushChannel {
    pub(crate) fn new(guard: Arc<LifecycleGuard>) -> Self {
        Self {
            guard,
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn push(&self, payload: &str) {
        match self.guard.deliver(|receiver| receiver.on_push(payload)) {
            Some(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(payload_len = payload.len(), "push dropped; no ready receiver");
            }
        }
    }

    pub(crate) fn stats(&self) -> PushStats {
        PushStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::Receiver;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Barrier, Mutex};
    use std::thread;

    #[derive(Default)]
    struct Log {
        pushes: Mutex<Vec<String>>,
        busy: AtomicBool,
        overlapped: AtomicBool,
    }

    struct Recorder(Arc<Log>);

    impl Receiver for Recorder {
        fn on_push(&self, payload: &str) {
            if self.0.busy.swap(true, Ordering::SeqCst) {
                self.0.overlapped.store(true, Ordering::SeqCst);
            }
            self.0.pushes.lock().unwrap().push(payload.to_string());
            thread::yield_now();
            self.0.busy.store(false, Ordering::SeqCst);
        }
    }

    #[test]
    fn pushes_from_one_thread_keep_their_order() {
        let log = Arc::new(Log::default());
        let channel = PushChannel::new(Arc::new(LifecycleGuard::with_receiver(Box::new(
            Recorder(log.clone()),
        ))));

        for i in 0..10 {
            channel.push(&format!("p{i}"));
        }

        let expected: Vec<_> = (0..10).map(|i| format!("p{i}")).collect();
        assert_eq!(*log.pushes.lock().unwrap(), expected);
        assert_eq!(
            channel.stats(),
            PushStats {
                delivered: 10,
                dropped: 0
            }
        );
    }

    #[test]
    fn concurrent_pushes_never_interleave() {
        let log = Arc::new(Log::default());
        let channel = Arc::new(PushChannel::new(Arc::new(LifecycleGuard::with_receiver(
            Box::new(Recorder(log.clone())),
        ))));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let channel = Arc::clone(&channel);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..50 {
                        channel.push(&format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(!log.overlapped.load(Ordering::SeqCst));
        let pushes = log.pushes.lock().unwrap();
        assert_eq!(pushes.len(), 200);
        for t in 0..4 {
            let mine: Vec<_> = pushes
                .iter()
                .filter(|p| p.starts_with(&format!("{t}-")))
                .cloned()
                .collect();
            let expected: Vec<_> = (0..50).map(|i| format!("{t}-{i}")).collect();
            assert_eq!(mine, expected);
        }
    }

    #[test]
    fn push_without_receiver_is_counted_as_dropped() {
        let channel = PushChannel::new(Arc::new(LifecycleGuard::new()));
        channel.push("lost");
        assert_eq!(
            channel.stats(),
            PushStats {
                delivered: 0,
                dropped: 1
            }
        );
    }
}
