//! Crate-level error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::route::RouteError;
use crate::router::RoutingError;
use crate::state::StateError;
use crate::transform::TransformError;

/// Any error surfaced by the public API
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Result alias over [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;
