//! Single-owner actor for the routing state document

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::storage::{load_or_fresh, JsonFileStorage, StateStorage};
use super::{RoutingState, StateError};
use crate::router::RouteDecision;

enum Command {
    Record(Box<RouteDecision>),
    Read(oneshot::Sender<RoutingState>),
    History {
        limit: Option<usize>,
        reply: oneshot::Sender<Vec<RouteDecision>>,
    },
    Initialize(oneshot::Sender<()>),
    Reload(oneshot::Sender<()>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the routing state actor.
///
/// Cheap to clone. Every mutation is queued and applied by one task in the
/// order it was received, then persisted before the next command runs.
/// The actor stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct RoutingStateStore {
    tx: mpsc::UnboundedSender<Command>,
}

impl RoutingStateStore {
    /// Start the actor over `storage`. Must be called inside a tokio runtime.
    ///
    /// The existing document is loaded by the actor before it serves any
    /// command.
    pub fn spawn<S: StateStorage>(storage: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let storage: Arc<dyn StateStorage> = Arc::new(storage);
        tokio::spawn(run(storage, rx));
        Self { tx }
    }

    /// Start the actor over a JSON file
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(path = %path.display(), "Opening routing state store");
        Self::spawn(JsonFileStorage::new(path))
    }

    /// Queue a decision. Never blocks and never fails; persistence errors are
    /// logged by the actor.
    pub fn record(&self, decision: RouteDecision) {
        if self.tx.send(Command::Record(Box::new(decision))).is_err() {
            warn!("Routing state store has stopped, decision dropped");
        }
    }

    /// Snapshot of the current document
    pub async fn read(&self) -> Result<RoutingState, StateError> {
        self.request(Command::Read).await
    }

    /// The most recent `limit` decisions, oldest first. `None` or `Some(0)`
    /// returns the whole history.
    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<RouteDecision>, StateError> {
        self.request(|reply| Command::History { limit, reply }).await
    }

    /// Replace the document with a fresh empty one
    pub async fn initialize(&self) -> Result<(), StateError> {
        self.request(Command::Initialize).await
    }

    /// Re-read the document from storage, discarding the in-memory copy
    pub async fn reload(&self) -> Result<(), StateError> {
        self.request(Command::Reload).await
    }

    /// Wait until every command queued before this call has been applied
    /// and persisted
    pub async fn flush(&self) -> Result<(), StateError> {
        self.request(Command::Flush).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, StateError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| StateError::Closed)?;
        rx.await.map_err(|_| StateError::Closed)
    }
}

async fn persist(storage: &dyn StateStorage, state: &RoutingState) {
    if let Err(e) = storage.save(state).await {
        warn!(error = %e, "Failed to persist routing state");
    }
}

async fn run(storage: Arc<dyn StateStorage>, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut state = load_or_fresh(storage.as_ref()).await;
    debug!(
        requests = state.session.request_count,
        history = state.history.len(),
        "Routing state loaded"
    );

    while let Some(command) = rx.recv().await {
        match command {
            Command::Record(decision) => {
                state.apply(*decision);
                persist(storage.as_ref(), &state).await;
            }
            Command::Read(reply) => {
                let _ = reply.send(state.clone());
            }
            Command::History { limit, reply } => {
                let _ = reply.send(state.recent(limit).to_vec());
            }
            Command::Initialize(reply) => {
                state = RoutingState::fresh();
                persist(storage.as_ref(), &state).await;
                let _ = reply.send(());
            }
            Command::Reload(reply) => {
                state = load_or_fresh(storage.as_ref()).await;
                let _ = reply.send(());
            }
            Command::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }

    debug!("Routing state store stopped");
}
