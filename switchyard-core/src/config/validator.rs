//! Cross-field configuration validation

use super::error::{ValidationError, ValidationErrorKind};
use super::schema::{SwitchyardConfig, TransformerSpec};
use crate::route::Route;
use crate::router::Scenario;
use crate::transform::TransformerRegistry;

/// Checks the rules serde alone cannot: routes resolve to declared
/// providers and models, and every transformer name is registered.
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    registry: TransformerRegistry,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    /// Validator aware of the built-in transformers
    pub fn new() -> Self {
        Self::with_registry(TransformerRegistry::with_builtins())
    }

    /// Validator checking transformer names against `registry`
    pub fn with_registry(registry: TransformerRegistry) -> Self {
        Self { registry }
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &SwitchyardConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_routes(config)?;
        self.validate_transformers(config)?;

        Ok(())
    }

    /// Every configured route parses and names a declared provider/model
    fn validate_routes(&self, config: &SwitchyardConfig) -> Result<(), ValidationError> {
        if config.router.default.is_none() {
            return Err(ValidationError::required("router.default")
                .with_context("Requests that match no other scenario need a default route"));
        }

        for scenario in Scenario::PRIORITY {
            let Some(raw) = config.router.route_for(scenario) else {
                continue;
            };
            let field = format!("router.{}", scenario);

            let route = Route::parse(raw).ok_or_else(|| {
                ValidationError::invalid_format(
                    field.clone(),
                    format!("expected 'provider,model', got '{}'", raw),
                )
            })?;

            let provider = config.provider(&route.provider).ok_or_else(|| {
                ValidationError::unknown_reference(
                    field.clone(),
                    format!("provider '{}' is not declared", route.provider),
                )
            })?;

            if !provider.serves(&route.model) {
                return Err(ValidationError::unknown_reference(
                    field,
                    format!(
                        "model '{}' is not declared by provider '{}'",
                        route.model, route.provider
                    ),
                ));
            }
        }

        Ok(())
    }

    /// Every transformer reference resolves in the registry
    fn validate_transformers(&self, config: &SwitchyardConfig) -> Result<(), ValidationError> {
        for (i, provider) in config.providers.iter().enumerate() {
            self.check_chain(&format!("providers[{}].transformers", i), &provider.transformers)?;
            for (model, chain) in &provider.model_transformers {
                self.check_chain(&format!("providers[{}].model_transformers.{}", i, model), chain)?;
            }
        }
        Ok(())
    }

    fn check_chain(&self, path: &str, chain: &[TransformerSpec]) -> Result<(), ValidationError> {
        for (j, spec) in chain.iter().enumerate() {
            if !self.registry.contains(spec.name()) {
                return Err(ValidationError::new(
                    format!("{}[{}]", path, j),
                    ValidationErrorKind::UnknownReference {
                        message: format!("transformer '{}' is not registered", spec.name()),
                    },
                )
                .with_context(format!("registered: {}", self.registry.names().join(", "))));
            }
            // Options are checked by building the transformer once
            if let Err(e) = self.registry.create(spec) {
                return Err(ValidationError::invalid_value(
                    format!("{}[{}]", path, j),
                    format!("valid options for '{}'", spec.name()),
                    e.to_string(),
                ));
            }
        }
        Ok(())
    }
}
