//! Scenario routing
//!
//! Maps one inbound request to exactly one [`RouteDecision`]. Scenarios are
//! tried in a fixed priority order and the first one that both matches the
//! request signals and has a usable route wins:
//!
//! 1. `longContext` when the estimated token count exceeds the threshold
//! 2. `background`
//! 3. `think`
//! 4. `webSearch`
//! 5. `default`
//!
//! A configured route that fails to parse is skipped in favour of the next
//! candidate. The router never invents a provider: without a usable default
//! route it reports [`RoutingError::NoRouteConfigured`].

mod classifier;
mod decision;

pub use classifier::{estimate_tokens, HeuristicClassifier, RequestClassifier, RequestSignals};
pub use decision::{RouteDecision, Scenario};
pub(crate) use decision::iso8601;

use crate::config::RoutingConfig;
use crate::protocol::UnifiedChatRequest;
use crate::route::Route;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while choosing a route
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// A configured route string is not `provider,model`
    #[error("invalid route string '{route}' for scenario '{scenario}'")]
    InvalidRouteString { scenario: Scenario, route: String },

    /// No scenario, including the default, produced a usable route
    #[error("no route configured: {detail}")]
    NoRouteConfigured { detail: String },
}

/// Priority-ordered scenario router
#[derive(Debug, Clone)]
pub struct ScenarioRouter {
    config: RoutingConfig,
}

impl ScenarioRouter {
    /// Create a router over a routing table
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    /// The routing table in use
    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Check that every configured route string parses
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.config.default.is_none() {
            return Err(RoutingError::NoRouteConfigured {
                detail: "the default route is not set".to_string(),
            });
        }
        for scenario in Scenario::PRIORITY {
            if let Some(raw) = self.config.route_for(scenario) {
                if Route::parse(raw).is_none() {
                    return Err(RoutingError::InvalidRouteString {
                        scenario,
                        route: raw.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Choose a route for `request` given its classification signals
    pub fn route(
        &self,
        request: &UnifiedChatRequest,
        signals: &RequestSignals,
    ) -> Result<RouteDecision, RoutingError> {
        let threshold = self.config.long_context_threshold;
        let mut skipped: Vec<String> = Vec::new();

        for scenario in Scenario::PRIORITY {
            let Some(reason) = self.match_reason(scenario, signals, threshold) else {
                continue;
            };
            let Some(raw) = self.config.route_for(scenario) else {
                continue;
            };

            match Route::parse(raw) {
                Some(route) => {
                    let reason = if skipped.is_empty() {
                        reason
                    } else {
                        format!("{} (skipped {})", reason, skipped.join(", "))
                    };
                    info!(
                        provider = %route.provider,
                        model = %route.model,
                        scenario = %scenario,
                        input_tokens = signals.estimated_tokens,
                        requested_model = %request.model,
                        "Routing decision: {}",
                        reason
                    );
                    return Ok(RouteDecision::new(
                        route,
                        scenario,
                        reason,
                        signals.estimated_tokens,
                    ));
                }
                None => {
                    let err = RoutingError::InvalidRouteString {
                        scenario,
                        route: raw.to_string(),
                    };
                    warn!(error = %err, "Skipping unusable route");
                    skipped.push(format!("invalid {} route '{}'", scenario, raw));
                }
            }
        }

        let detail = if skipped.is_empty() {
            "the default route is not set".to_string()
        } else {
            skipped.join(", ")
        };
        debug!(requested_model = %request.model, %detail, "No usable route");
        Err(RoutingError::NoRouteConfigured { detail })
    }

    /// Reason text when `scenario` applies to the signals, `None` otherwise
    fn match_reason(&self, scenario: Scenario, signals: &RequestSignals, threshold: u64) -> Option<String> {
        match scenario {
            Scenario::LongContext => (signals.estimated_tokens > threshold).then(|| {
                format!(
                    "token count {} exceeds longContext threshold {}",
                    signals.estimated_tokens, threshold
                )
            }),
            Scenario::Background => signals
                .background
                .then(|| "background task detected".to_string()),
            Scenario::Think => signals
                .think
                .then(|| "reasoning requested".to_string()),
            Scenario::WebSearch => signals
                .web_search
                .then(|| "web search tool requested".to_string()),
            Scenario::Default => Some("default routing".to_string()),
        }
    }
}
