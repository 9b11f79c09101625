//! Transformer pipeline
//!
//! Bidirectional normalization between the unified request schema and each
//! provider's wire format. A pipeline is an ordered chain of named
//! transformers resolved from configuration when the engine is built:
//!
//! - inbound, `transform_request_in` is folded left to right over the request
//! - outbound, whole JSON bodies go through `transform_response_out`
//! - outbound, streamed events go through `transform_stream_chunk`
//!
//! Each transformer declares which of the three hooks it implements through
//! [`Capabilities`]. The pipeline only calls declared hooks, and a chain with a
//! response transformer that cannot handle chunks refuses streamed responses
//! instead of buffering them.

mod pipeline;
mod registry;
mod response;
pub mod transformers;

pub use pipeline::TransformerPipeline;
pub use registry::{PipelineTable, TransformerFactory, TransformerRegistry};
pub use response::{EventStream, ProviderResponse, ResponseBody, SseEvent};

use crate::protocol::UnifiedChatRequest;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Provider and model a transformer is running for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformContext {
    /// Provider handling the request
    pub provider: String,
    /// Model the request is sent to
    pub model: String,
}

impl TransformContext {
    /// Create a context
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Hooks a transformer implements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Rewrites outgoing requests
    pub request: bool,
    /// Rewrites whole JSON response bodies
    pub response: bool,
    /// Rewrites individual stream chunks
    pub stream: bool,
}

impl Capabilities {
    /// Request hook only
    pub const REQUEST: Self = Self {
        request: true,
        response: false,
        stream: false,
    };

    /// Every hook
    pub const ALL: Self = Self {
        request: true,
        response: true,
        stream: true,
    };
}

/// Pipeline stage, used in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Inbound request rewrite
    Request,
    /// Whole-body response rewrite
    Response,
    /// Per-chunk stream rewrite
    Stream,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Stream => "stream",
        })
    }
}

/// Failure reported by a single transformer hook
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransformFailure {
    /// What went wrong
    pub message: String,
}

impl TransformFailure {
    /// Create a failure
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the pipeline and the transformer registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// A transformer failed while processing a request or response
    #[error("transformer '{transformer}' failed during {stage} transformation: {message}")]
    TransformationFailed {
        transformer: String,
        stage: Stage,
        message: String,
    },

    /// A configured name has no registered factory
    #[error("unknown transformer '{name}'")]
    UnknownTransformer { name: String },

    /// A factory rejected its options
    #[error("invalid options for transformer '{transformer}': {message}")]
    InvalidOptions { transformer: String, message: String },

    /// The chain holds a whole-body transformer but the response is streamed
    #[error("transformer '{transformer}' cannot process streamed responses")]
    StreamingUnsupported { transformer: String },
}

/// A named bidirectional normalizer for one provider quirk.
///
/// Hooks default to pass-through. Implementations must leave fields they do
/// not own untouched, and a transformer scoped to one model must return its
/// input unchanged for every other model.
pub trait Transformer: Send + Sync {
    /// Registered name, used in configuration and error reports
    fn name(&self) -> &str;

    /// Hooks this transformer implements
    fn capabilities(&self) -> Capabilities;

    /// Rewrite the unified request into the provider's expected shape
    fn transform_request_in(
        &self,
        request: UnifiedChatRequest,
        _ctx: &TransformContext,
    ) -> Result<UnifiedChatRequest, TransformFailure> {
        Ok(request)
    }

    /// Normalize a complete JSON response body
    fn transform_response_out(
        &self,
        body: Value,
        _ctx: &TransformContext,
    ) -> Result<Value, TransformFailure> {
        Ok(body)
    }

    /// Normalize one parsed stream chunk
    fn transform_stream_chunk(
        &self,
        chunk: Value,
        _ctx: &TransformContext,
    ) -> Result<Value, TransformFailure> {
        Ok(chunk)
    }
}

impl fmt::Debug for dyn Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("name", &self.name())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
