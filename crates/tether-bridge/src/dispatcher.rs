//! Outgoing queries and the table of answers still owed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tether_common::{BridgeError, QueryId, QueryIdGenerator};
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::link::EngineLink;

/// An engine's answer to one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: QueryId,
    pub payload: String,
}

type Callback = Box<dyn FnOnce(Response) + Send>;

/// What the shell wants done with a response once it arrives.
pub(crate) enum Interest {
    Callback(Callback),
    Channel(oneshot::Sender<Response>),
}

impl Interest {
    pub(crate) fn resolve(self, response: Response) {
        match self {
            Interest::Callback(callback) => callback(response),
            Interest::Channel(tx) => {
                // The caller may have dropped its PendingQuery.
                let _ = tx.send(response);
            }
        }
    }
}

struct PendingState {
    closed: bool,
    entries: HashMap<QueryId, Interest>,
}

/// Interests keyed by query id. Internally synchronized; shared between the
/// dispatcher and the router.
pub(crate) struct PendingTable {
    state: Mutex<PendingState>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(PendingState {
                closed: false,
                entries: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(&self, id: QueryId, interest: Interest) -> Result<(), BridgeError> {
        let mut state = self.lock();
        if state.closed {
            return Err(BridgeError::Closed);
        }
        if state.entries.contains_key(&id) {
            return Err(BridgeError::IdCollision(id));
        }
        state.entries.insert(id, interest);
        Ok(())
    }

    pub(crate) fn take(&self, id: QueryId) -> Option<Interest> {
        self.lock().entries.remove(&id)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Refuse new entries and drop every pending interest uninvoked.
    pub(crate) fn close(&self) -> usize {
        let abandoned: Vec<Interest> = {
            let mut state = self.lock();
            state.closed = true;
            state.entries.drain().map(|(_, interest)| interest).collect()
        };
        // Dropped outside the lock: a callback's captures may take locks of
        // their own when they go.
        abandoned.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

/// Handle to the answer of a query dispatched with
/// [`QueryDispatcher::dispatch`].
///
/// Resolves to `Err(BridgeError::Closed)` if the bridge shuts down before the
/// engine answers.
#[derive(Debug)]
pub struct PendingQuery {
    id: QueryId,
    rx: oneshot::Receiver<Response>,
}

impl PendingQuery {
    pub fn id(&self) -> QueryId {
        self.id
    }

    pub async fn response(self) -> Result<String, BridgeError> {
        self.rx
            .await
            .map(|response| response.payload)
            .map_err(|_| BridgeError::Closed)
    }

    /// Block the current thread until the answer arrives. Must not be called
    /// from inside an async runtime.
    pub fn wait(self) -> Result<String, BridgeError> {
        self.rx
            .blocking_recv()
            .map(|response| response.payload)
            .map_err(|_| BridgeError::Closed)
    }

    /// The answer, if it has arrived. `None` while still pending.
    pub fn try_take(&mut self) -> Option<Result<String, BridgeError>> {
        match self.rx.try_recv() {
            Ok(response) => Some(Ok(response.payload)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(BridgeError::Closed)),
        }
    }
}

/// Tags outgoing queries with ids and forwards them to the engine.
///
/// The interest is registered before the engine sees the query, so an answer
/// can never race ahead of its registration.
pub struct QueryDispatcher {
    ids: QueryIdGenerator,
    pending: Arc<PendingTable>,
    link: Arc<EngineLink>,
}

impl QueryDispatcher {
    pub(crate) fn new(pending: Arc<PendingTable>, link: Arc<EngineLink>) -> Self {
        Self {
            ids: QueryIdGenerator::new(),
            pending,
            link,
        }
    }

    /// Send `payload` under a fresh id and return a handle to the answer.
    pub fn dispatch(&self, payload: &str) -> Result<PendingQuery, BridgeError> {
        let id = self.ids.next_id();
        let (tx, rx) = oneshot::channel();
        self.forward(id, payload, Interest::Channel(tx))?;
        Ok(PendingQuery { id, rx })
    }

    /// Send `payload` under a fresh id; `on_response` runs once with the
    /// answer.
    pub fn dispatch_with<F>(&self, payload: &str, on_response: F) -> Result<QueryId, BridgeError>
    where
        F: FnOnce(Response) + Send + 'static,
    {
        let id = self.ids.next_id();
        self.forward(id, payload, Interest::Callback(Box::new(on_response)))?;
        Ok(id)
    }

    /// Send `payload` under an id chosen by the caller. Fails with
    /// `IdCollision`, without contacting the engine, if that id is still
    /// pending.
    pub fn dispatch_with_id<F>(
        &self,
        id: QueryId,
        payload: &str,
        on_response: F,
    ) -> Result<(), BridgeError>
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.forward(id, payload, Interest::Callback(Box::new(on_response)))
    }

    fn forward(&self, id: QueryId, payload: &str, interest: Interest) -> Result<(), BridgeError> {
        self.link.with_engine(|engine| {
            if let Err(err) = self.pending.insert(id, interest) {
                if let BridgeError::IdCollision(_) = err {
                    error!(query_id = %id, "query id collision; call not forwarded");
                }
                return Err(err);
            }
            if let Err(err) = engine.call(id, payload) {
                self.pending.take(id);
                debug!(query_id = %id, %err, "engine rejected query");
                return Err(err);
            }
            debug!(query_id = %id, payload_len = payload.len(), "query dispatched");
            Ok(())
        })
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
