//! Route string codec
//!
//! Routes are written as `"provider,model"` throughout configuration and
//! persisted state. The provider is everything before the first comma; the
//! model is everything after it, commas included, since some model
//! identifiers legitimately contain commas.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between the provider and the model in a route string
pub const ROUTE_SEPARATOR: char = ',';

/// Errors produced while decoding route strings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The text is not of the form `provider,model`
    #[error("invalid route string '{0}': expected \"provider,model\"")]
    InvalidRouteString(String),
}

/// A provider and model pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Route {
    /// Provider name as declared in configuration
    pub provider: String,
    /// Model identifier sent to the provider
    pub model: String,
}

impl Route {
    /// Create a route from its parts
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Parse a `provider,model` string.
    ///
    /// Returns `None` when there is no separator or when either side is empty.
    /// An empty provider or model is rejected on purpose: such a route can
    /// never be dispatched.
    pub fn parse(route: &str) -> Option<Self> {
        let (provider, model) = route.split_once(ROUTE_SEPARATOR)?;
        if provider.is_empty() || model.is_empty() {
            return None;
        }
        Some(Self::new(provider, model))
    }

    /// Encode back to `provider,model`
    pub fn format(&self) -> String {
        self.to_string()
    }

    /// Key used for per-model counters (`provider/model`)
    pub fn breakdown_key(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.provider, ROUTE_SEPARATOR, self.model)
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| RouteError::InvalidRouteString(s.to_string()))
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Route {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
