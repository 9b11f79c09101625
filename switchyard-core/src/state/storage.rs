//! Storage backends for the routing state document

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{RoutingState, StateError};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Where the state document lives.
///
/// Only the store's actor calls these, one at a time.
#[async_trait]
pub trait StateStorage: Send + Sync + 'static {
    /// Read the document; `Ok(None)` when nothing has been written yet
    async fn load(&self) -> Result<Option<RoutingState>, StateError>;

    /// Replace the document
    async fn save(&self, state: &RoutingState) -> Result<(), StateError>;
}

/// Pretty-printed JSON file, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling of the document, unique per process and per save so
    /// concurrent writers never share a temp file
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "routing-state.json".into());
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        name.push(format!(".{}.{seq}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl StateStorage for JsonFileStorage {
    async fn load(&self) -> Result<Option<RoutingState>, StateError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let state = serde_json::from_str(&raw).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(state))
    }

    async fn save(&self, state: &RoutingState) -> Result<(), StateError> {
        let body = serde_json::to_vec_pretty(state).map_err(StateError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &body)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), bytes = body.len(), "Persisted routing state");
        Ok(())
    }
}

/// Keeps the document in memory; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    document: Mutex<Option<RoutingState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document
    pub fn with_state(state: RoutingState) -> Self {
        Self {
            document: Mutex::new(Some(state)),
        }
    }

    /// The last saved document
    pub fn snapshot(&self) -> Option<RoutingState> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<RoutingState>, StateError> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &RoutingState) -> Result<(), StateError> {
        *self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(state.clone());
        Ok(())
    }
}

/// Load a document from `storage`, falling back to a fresh one.
///
/// Never fails: missing documents are silent, anything else is logged.
/// Oversized history from older writers is cut to the most recent entries.
pub(crate) async fn load_or_fresh(storage: &dyn StateStorage) -> RoutingState {
    match storage.load().await {
        Ok(Some(mut state)) => {
            state.trim_history();
            state
        }
        Ok(None) => RoutingState::fresh(),
        Err(e) => {
            warn!(error = %e, "Routing state unreadable, starting fresh");
            RoutingState::fresh()
        }
    }
}

/// Read the state document at `path` without starting a store.
///
/// For display layers that only look at the document. A missing, unreadable
/// or malformed file yields an empty state.
pub async fn load_state(path: impl AsRef<Path>) -> RoutingState {
    load_or_fresh(&JsonFileStorage::new(path.as_ref())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Route;
    use crate::router::{RouteDecision, Scenario};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_round_trip_creates_parents() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nested/deeper/state.json"));

        let mut state = RoutingState::fresh();
        state.apply(RouteDecision::new(Route::new("openai", "gpt-4"), Scenario::Default, "r", 10));
        storage.save(&state).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded, state);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested/deeper"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn test_temp_paths_never_collide() {
        let path = PathBuf::from("/var/lib/switchyard/state.json");
        let a = JsonFileStorage::new(&path);
        let b = JsonFileStorage::new(&path);

        let first = a.temp_path();
        let second = b.temp_path();
        assert_ne!(first, second);
        assert_ne!(a.temp_path(), first);
        assert_eq!(first.parent(), path.parent());
        assert!(first.to_string_lossy().ends_with(".tmp"));
    }

    #[tokio::test]
    async fn test_concurrent_saves_to_one_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut state = RoutingState::fresh();
        state.apply(RouteDecision::new(Route::new("openai", "gpt-4"), Scenario::Default, "r", 10));

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let storage = JsonFileStorage::new(&path);
                let state = state.clone();
                tokio::spawn(async move { storage.save(&state).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        assert_eq!(JsonFileStorage::new(&path).load().await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn test_oversized_history_trimmed_on_load() {
        let mut state = RoutingState::fresh();
        for n in 0..150 {
            state.history.push(RouteDecision::new(
                Route::new("openai", format!("model-{n}")),
                Scenario::Default,
                "r",
                1,
            ));
        }

        let loaded = load_or_fresh(&MemoryStorage::with_state(state)).await;
        assert_eq!(loaded.history.len(), crate::state::MAX_HISTORY_ENTRIES);
        assert_eq!(loaded.history[0].model, "model-50");
        assert_eq!(loaded.history.last().map(|d| d.model.as_str()), Some("model-149"));
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("absent.json"));
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error_but_load_state_is_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStorage::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StateError::Corrupt { .. }));

        let state = load_state(&path).await;
        assert_eq!(state.session.request_count, 0);
        assert!(state.history.is_empty());
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.load().await.unwrap().is_none());
        storage.save(&RoutingState::fresh()).await.unwrap();
        assert!(storage.snapshot().is_some());
    }
}
