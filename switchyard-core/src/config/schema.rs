//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use crate::route::ROUTE_SEPARATOR;
use crate::router::Scenario;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Environment variable overriding the state document location
pub const STATE_PATH_ENV: &str = "SWITCHYARD_STATE_PATH";

/// Root configuration structure for Switchyard
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchyardConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Providers and their transformer chains
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Scenario routing table
    #[serde(default)]
    pub router: RoutingConfig,

    /// Built-in request classifier settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Routing state persistence
    #[serde(default)]
    pub state: StateConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One provider backend and the transformers its wire format needs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique provider name, the left half of route strings
    pub name: String,

    /// Model identifiers served by this provider
    #[serde(default)]
    pub models: Vec<String>,

    /// Transformers applied to every model of this provider, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformers: Vec<TransformerSpec>,

    /// Extra transformers for specific models, appended after `transformers`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub model_transformers: BTreeMap<String, Vec<TransformerSpec>>,
}

/// A transformer reference: a bare name or `[name, options]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TransformerSpec {
    /// Transformer with default options
    Name(String),
    /// Transformer with an options object
    WithOptions(String, Value),
}

impl TransformerSpec {
    /// Registered transformer name
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::WithOptions(name, _) => name,
        }
    }

    /// Options passed to the transformer factory (`null` when absent)
    pub fn options(&self) -> &Value {
        static NO_OPTIONS: Value = Value::Null;
        match self {
            Self::Name(_) => &NO_OPTIONS,
            Self::WithOptions(_, options) => options,
        }
    }
}

/// Scenario routing table.
///
/// Routes are kept as raw `provider,model` strings so a malformed entry can
/// be reported with its scenario at load time and skipped at routing time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Fallback route, required for routing to succeed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Route for background work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    /// Route for reasoning requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub think: Option<String>,

    /// Route for prompts above `long_context_threshold`
    #[serde(default, alias = "long_context", skip_serializing_if = "Option::is_none")]
    pub long_context: Option<String>,

    /// Route for requests carrying a web search tool
    #[serde(default, alias = "web_search", skip_serializing_if = "Option::is_none")]
    pub web_search: Option<String>,

    /// Token count above which `long_context` applies
    #[serde(default = "default_long_context_threshold", alias = "long_context_threshold")]
    pub long_context_threshold: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default: None,
            background: None,
            think: None,
            long_context: None,
            web_search: None,
            long_context_threshold: default_long_context_threshold(),
        }
    }
}

impl RoutingConfig {
    /// Raw route string configured for a scenario
    pub fn route_for(&self, scenario: Scenario) -> Option<&str> {
        let route = match scenario {
            Scenario::Default => &self.default,
            Scenario::Background => &self.background,
            Scenario::Think => &self.think,
            Scenario::LongContext => &self.long_context,
            Scenario::WebSearch => &self.web_search,
        };
        route.as_deref()
    }
}

/// Built-in classifier settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Requested model ids containing this marker count as background work
    #[serde(default = "default_background_marker")]
    pub background_model_marker: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            background_model_marker: default_background_marker(),
        }
    }
}

/// Routing state persistence
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    /// State document path; see [`StateConfig::resolve_path`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StateConfig {
    /// Resolve the state document location.
    ///
    /// `SWITCHYARD_STATE_PATH` wins, then the configured path, then
    /// `~/.switchyard/routing-state.json`.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = std::env::var_os(STATE_PATH_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.path {
            return path.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".switchyard")
            .join("routing-state.json")
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value functions for serde
fn default_long_context_threshold() -> u64 { 60_000 }
fn default_background_marker() -> String { "haiku".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl SwitchyardConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Validate version
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        // Currently support only version 0.1
        if self.version != "0.1" {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::InvalidVersion {
                    expected: "0.1".to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        if self.providers.is_empty() {
            return Err(ValidationError::required("providers")
                .with_context("At least one provider must be configured"));
        }

        let mut seen_names = HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            if !seen_names.insert(&provider.name) {
                return Err(ValidationError::new(
                    format!("providers[{}].name", i),
                    ValidationErrorKind::DuplicateValue {
                        value: provider.name.clone(),
                    },
                ));
            }

            provider.validate(&format!("providers[{}]", i))?;
        }

        if self.router.long_context_threshold == 0 {
            return Err(ValidationError::out_of_range(
                "router.longContextThreshold",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Look up a provider by name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }
}

impl ProviderConfig {
    /// Validate provider configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::required(format!("{}.name", path)));
        }

        // The provider name is the left half of a route string
        if self.name.contains(ROUTE_SEPARATOR) {
            return Err(ValidationError::invalid_format(
                format!("{}.name", path),
                format!("provider names cannot contain '{}'", ROUTE_SEPARATOR),
            ));
        }

        if self.models.is_empty() {
            return Err(ValidationError::required(format!("{}.models", path))
                .with_context("A provider must serve at least one model"));
        }

        let mut seen_models = HashSet::new();
        for (i, model) in self.models.iter().enumerate() {
            if model.is_empty() {
                return Err(ValidationError::required(format!("{}.models[{}]", path, i)));
            }
            if !seen_models.insert(model) {
                return Err(ValidationError::new(
                    format!("{}.models[{}]", path, i),
                    ValidationErrorKind::DuplicateValue {
                        value: model.clone(),
                    },
                ));
            }
        }

        for model in self.model_transformers.keys() {
            if !seen_models.contains(model) {
                return Err(ValidationError::invalid_value(
                    format!("{}.model_transformers.{}", path, model),
                    "a model declared by this provider",
                    model.clone(),
                ));
            }
        }

        Ok(())
    }

    /// Whether this provider serves `model`
    pub fn serves(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }
}
