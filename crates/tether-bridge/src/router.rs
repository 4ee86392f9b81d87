//! Routes engine answers to the interest registered for their id.

use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tether_common::QueryId;
use tether_config::DeliveryMode;
use tracing::{debug, trace, warn};

use crate::dispatcher::{Interest, PendingTable, Response};
use crate::lifecycle::LifecycleGuard;

struct Routed {
    id: QueryId,
    payload: String,
    interest: Interest,
}

struct DeliveryThread {
    tx: Mutex<Option<mpsc::Sender<Routed>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

pub(crate) struct ResponseRouter {
    pending: Arc<PendingTable>,
    guard: Arc<LifecycleGuard>,
    thread: Option<DeliveryThread>,
}

impl ResponseRouter {
    pub(crate) fn new(
        pending: Arc<PendingTable>,
        guard: Arc<LifecycleGuard>,
        mode: DeliveryMode,
    ) -> std::io::Result<Self> {
        let thread = match mode {
            DeliveryMode::Inline => None,
            DeliveryMode::Thread => {
                let (tx, rx) = mpsc::channel::<Routed>();
                let worker_guard = Arc::clone(&guard);
                let worker = thread::Builder::new()
                    .name("tether-delivery".into())
                    .spawn(move || {
                        for routed in rx {
                            deliver(&worker_guard, routed);
                        }
                        debug!("delivery thread exiting");
                    })?;
                Some(DeliveryThread {
                    tx: Mutex::new(Some(tx)),
                    worker: Mutex::new(Some(worker)),
                })
            }
        };
        Ok(Self {
            pending,
            guard,
            thread,
        })
    }

    /// Resolve the interest for `id` with `payload`. Any thread.
    pub(crate) fn route(&self, id: QueryId, payload: &str) {
        let Some(interest) = self.pending.take(id) else {
            if self.pending.is_closed() {
                debug!(query_id = %id, "response after shutdown dropped");
            } else {
                warn!(query_id = %id, "response for unknown or already answered query dropped");
            }
            return;
        };

        let routed = Routed {
            id,
            payload: payload.to_owned(),
            interest,
        };
        match &self.thread {
            None => deliver(&self.guard, routed),
            Some(thread) => {
                let tx = thread.tx.lock().unwrap_or_else(PoisonError::into_inner);
                match tx.as_ref() {
                    Some(tx) => {
                        if tx.send(routed).is_err() {
                            debug!(query_id = %id, "delivery thread gone; response dropped");
                        }
                    }
                    None => debug!(query_id = %id, "delivery stopped; response dropped"),
                }
            }
        }
    }

    /// Stop the delivery thread after it drains what is queued.
    pub(crate) fn stop(&self) {
        let Some(thread) = &self.thread else {
            return;
        };
        drop(
            thread
                .tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        let worker = thread
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                warn!("delivery thread panicked");
            }
        }
    }
}

fn deliver(guard: &LifecycleGuard, routed: Routed) {
    let Routed {
        id,
        payload,
        interest,
    } = routed;
    let delivered = guard.deliver(|receiver| {
        receiver.on_response(id, &payload);
        interest.resolve(Response {
            id,
            payload: payload.clone(),
        });
    });
    match delivered {
        Some(()) => trace!(query_id = %id, "response delivered"),
        None => debug!(query_id = %id, "no ready receiver; response dropped"),
    }
}
