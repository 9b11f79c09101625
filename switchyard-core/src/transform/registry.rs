//! Transformer registration and per-provider chain resolution

use super::pipeline::TransformerPipeline;
use super::transformers;
use super::{TransformError, Transformer};
use crate::config::{ProviderConfig, TransformerSpec};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds a transformer from its configured options (`null` when none)
pub type TransformerFactory =
    Arc<dyn Fn(&Value) -> Result<Arc<dyn Transformer>, TransformError> + Send + Sync>;

/// Name to factory mapping
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    factories: BTreeMap<String, TransformerFactory>,
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl TransformerRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in transformer
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        transformers::register_builtins(&mut registry);
        registry
    }

    /// Register (or replace) a factory under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Arc<dyn Transformer>, TransformError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate one configured transformer
    pub fn create(&self, spec: &TransformerSpec) -> Result<Arc<dyn Transformer>, TransformError> {
        let factory = self
            .factories
            .get(spec.name())
            .ok_or_else(|| TransformError::UnknownTransformer {
                name: spec.name().to_string(),
            })?;
        factory(spec.options())
    }

    /// Instantiate a chain in order
    pub fn create_chain(&self, specs: &[TransformerSpec]) -> Result<Vec<Arc<dyn Transformer>>, TransformError> {
        specs.iter().map(|spec| self.create(spec)).collect()
    }
}

#[derive(Debug, Default)]
struct ProviderChains {
    base: Vec<Arc<dyn Transformer>>,
    per_model: HashMap<String, Vec<Arc<dyn Transformer>>>,
}

/// Transformer chains for every configured provider, resolved once at startup
#[derive(Debug, Default)]
pub struct PipelineTable {
    providers: HashMap<String, ProviderChains>,
}

impl PipelineTable {
    /// Resolve every provider's chains; any unknown name fails the whole table
    pub fn from_providers(
        providers: &[ProviderConfig],
        registry: &TransformerRegistry,
    ) -> Result<Self, TransformError> {
        let mut table = Self::default();
        for provider in providers {
            let base = registry.create_chain(&provider.transformers)?;
            let per_model = provider
                .model_transformers
                .iter()
                .map(|(model, specs)| Ok((model.clone(), registry.create_chain(specs)?)))
                .collect::<Result<HashMap<_, _>, TransformError>>()?;

            debug!(
                provider = %provider.name,
                transformers = base.len(),
                model_overrides = per_model.len(),
                "Resolved transformer chains"
            );
            table
                .providers
                .insert(provider.name.clone(), ProviderChains { base, per_model });
        }
        Ok(table)
    }

    /// Chain for `provider`/`model`: provider transformers, then model ones.
    ///
    /// Unknown providers get an empty pass-through pipeline.
    pub fn pipeline_for(&self, provider: &str, model: &str) -> TransformerPipeline {
        let Some(chains) = self.providers.get(provider) else {
            return TransformerPipeline::default();
        };
        let mut stages = chains.base.clone();
        if let Some(extra) = chains.per_model.get(model) {
            stages.extend(extra.iter().cloned());
        }
        TransformerPipeline::new(stages)
    }
}
