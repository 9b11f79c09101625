//! The persisted routing state document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::router::{iso8601, RouteDecision};

/// Ring buffer capacity for [`RoutingState::history`]
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Counters for the current session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// When the session (document) was started
    #[serde(with = "iso8601")]
    pub start_time: DateTime<Utc>,

    /// Decisions recorded this session
    #[serde(default)]
    pub request_count: u64,

    /// Decisions per `provider/model`
    #[serde(default)]
    pub model_breakdown: BTreeMap<String, u64>,
}

/// Latest decision, bounded history and session counters.
///
/// Top-level keys this crate does not know about are kept in `extra` and
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingState {
    /// Last time the document changed
    #[serde(with = "iso8601")]
    pub last_updated: DateTime<Utc>,

    /// Most recent decision
    #[serde(default)]
    pub last_request: Option<RouteDecision>,

    pub session: SessionStats,

    /// Most recent decisions, oldest first
    #[serde(default)]
    pub history: Vec<RouteDecision>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoutingState {
    /// An empty document stamped with the current time
    pub fn fresh() -> Self {
        let now = Utc::now();
        Self {
            last_updated: now,
            last_request: None,
            session: SessionStats {
                start_time: now,
                request_count: 0,
                model_breakdown: BTreeMap::new(),
            },
            history: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Fold one decision into the document
    pub fn apply(&mut self, decision: RouteDecision) {
        self.session.request_count += 1;
        *self
            .session
            .model_breakdown
            .entry(decision.route().breakdown_key())
            .or_insert(0) += 1;

        self.history.push(decision.clone());
        self.trim_history();

        self.last_request = Some(decision);
        self.last_updated = Utc::now();
    }

    /// Drop the oldest entries beyond [`MAX_HISTORY_ENTRIES`]
    pub fn trim_history(&mut self) {
        if self.history.len() > MAX_HISTORY_ENTRIES {
            let overflow = self.history.len() - MAX_HISTORY_ENTRIES;
            self.history.drain(..overflow);
        }
    }

    /// The last `limit` history entries, oldest first. `None` or `Some(0)`
    /// returns everything.
    pub fn recent(&self, limit: Option<usize>) -> &[RouteDecision] {
        match limit {
            Some(limit) if limit > 0 && limit < self.history.len() => {
                &self.history[self.history.len() - limit..]
            }
            _ => &self.history,
        }
    }
}

impl Default for RoutingState {
    fn default() -> Self {
        Self::fresh()
    }
}
