//! Per-request orchestration of routing, state recording and transformation

use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::{ConfigValidator, SwitchyardConfig};
use crate::error::Result;
use crate::protocol::UnifiedChatRequest;
use crate::router::{
    HeuristicClassifier, RequestClassifier, RequestSignals, RouteDecision, ScenarioRouter,
};
use crate::state::RoutingStateStore;
use crate::transform::{
    PipelineTable, ProviderResponse, TransformContext, TransformError, TransformerPipeline,
    TransformerRegistry,
};

/// A routed, provider-ready request
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// Where the request goes and why
    pub decision: RouteDecision,
    /// Request after the inbound transformers, with the routed model set
    pub request: UnifiedChatRequest,
    pipeline: TransformerPipeline,
}

impl PreparedRequest {
    /// Context the transformers run with
    pub fn context(&self) -> TransformContext {
        TransformContext::new(&self.decision.provider, &self.decision.model)
    }

    /// The transformer chain selected for this request
    pub fn pipeline(&self) -> &TransformerPipeline {
        &self.pipeline
    }

    /// Run the outbound stage over the provider's response
    pub fn transform_response(&self, response: ProviderResponse) -> Result<ProviderResponse> {
        Ok(self.pipeline.transform_response(response, &self.context())?)
    }
}

/// Routes requests, records the decisions and runs the provider pipelines.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct RoutingEngine {
    router: ScenarioRouter,
    classifier: Arc<dyn RequestClassifier>,
    pipelines: PipelineTable,
    store: RoutingStateStore,
}

impl fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("router", &self.router)
            .field("pipelines", &self.pipelines)
            .finish_non_exhaustive()
    }
}

impl RoutingEngine {
    /// Validate `config` against `registry` and resolve every transformer
    /// chain. Unknown transformer names and unusable routes fail here.
    pub fn from_config(
        config: &SwitchyardConfig,
        registry: &TransformerRegistry,
        store: RoutingStateStore,
    ) -> Result<Self> {
        ConfigValidator::with_registry(registry.clone())
            .validate(config)
            .map_err(crate::config::ConfigError::from)?;

        let router = ScenarioRouter::new(config.router.clone());
        router.validate()?;

        let pipelines = PipelineTable::from_providers(&config.providers, registry)?;
        let classifier = HeuristicClassifier::new(config.classifier.background_model_marker.clone());

        debug!(providers = config.providers.len(), "Routing engine ready");
        Ok(Self {
            router,
            classifier: Arc::new(classifier),
            pipelines,
            store,
        })
    }

    /// Replace the request classifier
    pub fn with_classifier(mut self, classifier: impl RequestClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn router(&self) -> &ScenarioRouter {
        &self.router
    }

    /// Handle to the routing state store
    pub fn store(&self) -> &RoutingStateStore {
        &self.store
    }

    /// Classify, route, record and transform one request
    pub fn prepare(&self, request: UnifiedChatRequest) -> Result<PreparedRequest> {
        let signals = self.classifier.classify(&request);
        self.prepare_with_signals(request, signals)
    }

    /// Like [`prepare`](Self::prepare) with caller-supplied signals.
    ///
    /// The decision is recorded before the inbound transformers run, so it
    /// is kept even if transformation or the provider call later fails.
    /// A streaming request whose chain cannot rewrite stream chunks is
    /// refused here, before any provider call.
    #[instrument(level = "debug", skip_all, fields(requested_model = %request.model))]
    pub fn prepare_with_signals(
        &self,
        mut request: UnifiedChatRequest,
        signals: RequestSignals,
    ) -> Result<PreparedRequest> {
        let decision = self.router.route(&request, &signals)?;
        self.store.record(decision.clone());

        request.model = decision.model.clone();
        let pipeline = self.pipelines.pipeline_for(&decision.provider, &decision.model);
        if request.is_streaming() {
            if let Some(blocker) = pipeline.streaming_blocker() {
                return Err(TransformError::StreamingUnsupported {
                    transformer: blocker.to_string(),
                }
                .into());
            }
        }
        let ctx = TransformContext::new(&decision.provider, &decision.model);
        let request = pipeline.transform_request(request, &ctx)?;

        Ok(PreparedRequest {
            decision,
            request,
            pipeline,
        })
    }

    /// Run the outbound stage for a response to `decision`
    pub fn process_response(
        &self,
        decision: &RouteDecision,
        response: ProviderResponse,
    ) -> Result<ProviderResponse> {
        let pipeline = self.pipelines.pipeline_for(&decision.provider, &decision.model);
        let ctx = TransformContext::new(&decision.provider, &decision.model);
        Ok(pipeline.transform_response(response, &ctx)?)
    }
}
