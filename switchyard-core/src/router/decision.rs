//! Routing decisions and the scenarios that produce them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::route::Route;

/// Named request category used to pick a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scenario {
    /// Nothing more specific matched
    Default,
    /// Cheap background work (titles, summaries)
    Background,
    /// Extended reasoning requested
    Think,
    /// Prompt too large for the default model
    LongContext,
    /// Request needs a web search tool
    WebSearch,
}

impl Scenario {
    /// Every scenario, highest routing priority first
    pub const PRIORITY: [Scenario; 5] = [
        Scenario::LongContext,
        Scenario::Background,
        Scenario::Think,
        Scenario::WebSearch,
        Scenario::Default,
    ];

    /// Configuration / wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Background => "background",
            Self::Think => "think",
            Self::LongContext => "longContext",
            Self::WebSearch => "webSearch",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved route plus metadata for one request.
///
/// Created once by the scenario router and never mutated afterwards. The
/// `reason` is observability text only and is never parsed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDecision {
    /// Provider that handles the request
    pub provider: String,

    /// Model sent to the provider
    pub model: String,

    /// Scenario that selected the route
    pub scenario: Scenario,

    /// Human-readable explanation
    #[serde(alias = "reasonText")]
    pub reason: String,

    /// Estimated input tokens at routing time
    #[serde(default)]
    pub input_tokens: u64,

    /// When the decision was made
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
}

impl RouteDecision {
    /// Build a decision stamped with the current time
    pub fn new(route: Route, scenario: Scenario, reason: impl Into<String>, input_tokens: u64) -> Self {
        Self {
            provider: route.provider,
            model: route.model,
            scenario,
            reason: reason.into(),
            input_tokens,
            timestamp: Utc::now(),
        }
    }

    /// The provider/model pair of this decision
    pub fn route(&self) -> Route {
        Route::new(self.provider.clone(), self.model.clone())
    }
}

/// Fixed-width RFC 3339 timestamps (`2025-01-31T09:15:02.417Z`).
///
/// Millisecond precision with a `Z` suffix keeps the text lexically sortable.
pub(crate) mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
