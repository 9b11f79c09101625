//! Routing state: latest decision, bounded history and session counters
//!
//! The document is owned by a single actor task ([`RoutingStateStore`]).
//! Callers record decisions without waiting and read snapshots over a reply
//! channel. Storage failures never reach request handling: a document that
//! cannot be read starts the session fresh, and a failed write is logged.
//!
//! ```json
//! {
//!   "lastUpdated": "2025-01-31T09:15:02.417Z",
//!   "lastRequest": { "provider": "openai", "model": "gpt-4", ... },
//!   "session": {
//!     "startTime": "2025-01-31T09:00:00.000Z",
//!     "requestCount": 12,
//!     "modelBreakdown": { "openai/gpt-4": 12 }
//!   },
//!   "history": [ ... ]
//! }
//! ```

mod storage;
mod store;
mod types;

pub use storage::{load_state, JsonFileStorage, MemoryStorage, StateStorage};
pub use store::RoutingStateStore;
pub use types::{RoutingState, SessionStats, MAX_HISTORY_ENTRIES};

use std::path::PathBuf;
use thiserror::Error;

/// State store I/O failures. Logged by the store, never surfaced through
/// `record()`.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {} is not a valid routing state document: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize routing state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The actor task is gone (runtime shut down)
    #[error("routing state store is closed")]
    Closed,
}
