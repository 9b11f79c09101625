//! Switchyard Core Library
//!
//! Routing and normalization core for an LLM gateway that sits between a
//! unified chat-completion API and several provider backends:
//!
//! - [`router`] picks a provider and model per request from a scenario table
//! - [`transform`] rewrites requests and responses for each provider's quirks
//! - [`state`] keeps a bounded, persisted trail of routing decisions
//! - [`engine`] ties the three together for one request
//!
//! ```no_run
//! use switchyard_core::{config, RoutingEngine, RoutingStateStore, TransformerRegistry};
//! use switchyard_core::protocol::{Message, UnifiedChatRequest};
//!
//! # async fn example() -> switchyard_core::Result<()> {
//! let config = config::load_from_path("switchyard.yaml")?;
//! switchyard_core::logging::init(&config.logging)?;
//!
//! let store = RoutingStateStore::open(config.state.resolve_path());
//! let engine = RoutingEngine::from_config(&config, &TransformerRegistry::with_builtins(), store)?;
//!
//! let prepared = engine.prepare(UnifiedChatRequest::new("claude-sonnet", vec![Message::user("hi")]))?;
//! println!("{} via {}", prepared.decision.model, prepared.decision.provider);
//! # Ok(()) }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod route;
pub mod router;
pub mod state;
pub mod transform;

pub use engine::{PreparedRequest, RoutingEngine};
pub use error::{Error, Result};
pub use route::{Route, RouteError};
pub use router::{RouteDecision, RoutingError, Scenario, ScenarioRouter};
pub use state::{RoutingState, RoutingStateStore};
pub use transform::{TransformError, Transformer, TransformerPipeline, TransformerRegistry};

/// Returns the version of the Switchyard Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
