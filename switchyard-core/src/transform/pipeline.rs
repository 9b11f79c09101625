//! Ordered transformer chains

use super::response::{EventStream, ProviderResponse, ResponseBody, SseEvent};
use super::{Stage, TransformContext, TransformError, Transformer};
use crate::protocol::UnifiedChatRequest;
use bytes::Bytes;
use futures::future;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// An ordered chain of transformers for one provider/model pair
#[derive(Debug, Clone, Default)]
pub struct TransformerPipeline {
    stages: Vec<Arc<dyn Transformer>>,
}

impl TransformerPipeline {
    /// Create a pipeline from resolved transformers, in application order
    pub fn new(stages: Vec<Arc<dyn Transformer>>) -> Self {
        Self { stages }
    }

    /// Names of the transformers in order
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|t| t.name()).collect()
    }

    /// Whether the chain has no transformers
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// First response transformer that lacks a stream hook, if any
    pub fn streaming_blocker(&self) -> Option<&str> {
        self.stages
            .iter()
            .find(|t| {
                let caps = t.capabilities();
                caps.response && !caps.stream
            })
            .map(|t| t.name())
    }

    /// Whether streamed responses can pass through this chain
    pub fn supports_streaming(&self) -> bool {
        self.streaming_blocker().is_none()
    }

    /// Inbound stage: fold every request hook over the request
    pub fn transform_request(
        &self,
        request: UnifiedChatRequest,
        ctx: &TransformContext,
    ) -> Result<UnifiedChatRequest, TransformError> {
        let mut request = request;
        for transformer in self.stages.iter().filter(|t| t.capabilities().request) {
            trace!(transformer = transformer.name(), model = %ctx.model, "Applying request transformer");
            request = transformer
                .transform_request_in(request, ctx)
                .map_err(|e| failed(transformer.as_ref(), Stage::Request, e.message))?;
        }
        Ok(request)
    }

    /// Outbound stage. Status and headers are forwarded unchanged, except
    /// `content-length`, which follows the rewritten body.
    pub fn transform_response(
        &self,
        response: ProviderResponse,
        ctx: &TransformContext,
    ) -> Result<ProviderResponse, TransformError> {
        let ProviderResponse {
            status,
            headers,
            body,
        } = response;

        match body {
            ResponseBody::Full(bytes) => {
                let rewritten = self.transform_body(bytes, ctx)?;
                let mut response = ProviderResponse {
                    status,
                    headers,
                    body: ResponseBody::Full(rewritten.clone()),
                };
                response.replace_header("content-length", rewritten.len().to_string());
                Ok(response)
            }
            ResponseBody::Stream(events) => {
                if let Some(blocker) = self.streaming_blocker() {
                    return Err(TransformError::StreamingUnsupported {
                        transformer: blocker.to_string(),
                    });
                }
                Ok(ProviderResponse {
                    status,
                    headers,
                    body: ResponseBody::Stream(self.transform_stream(events, ctx.clone())),
                })
            }
        }
    }

    /// Whole-body normalization. Non-JSON bodies are forwarded untouched.
    fn transform_body(&self, bytes: Bytes, ctx: &TransformContext) -> Result<Bytes, TransformError> {
        let response_stages: Vec<_> = self
            .stages
            .iter()
            .filter(|t| t.capabilities().response)
            .collect();
        if response_stages.is_empty() {
            return Ok(bytes);
        }

        let mut body: Value = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) => {
                debug!(provider = %ctx.provider, error = %e, "Response body is not JSON, forwarding as-is");
                return Ok(bytes);
            }
        };

        for transformer in response_stages {
            body = transformer
                .transform_response_out(body, ctx)
                .map_err(|e| failed(transformer.as_ref(), Stage::Response, e.message))?;
        }

        serde_json::to_vec(&body)
            .map(Bytes::from)
            .map_err(|e| TransformError::TransformationFailed {
                transformer: "pipeline".to_string(),
                stage: Stage::Response,
                message: e.to_string(),
            })
    }

    /// Per-chunk normalization.
    ///
    /// Events already yielded are never revisited. When a hook fails, one
    /// trailing `error` event is emitted and the stream ends.
    fn transform_stream(&self, events: EventStream, ctx: TransformContext) -> EventStream {
        let stages: Vec<Arc<dyn Transformer>> = self
            .stages
            .iter()
            .filter(|t| t.capabilities().stream)
            .cloned()
            .collect();
        if stages.is_empty() {
            return events;
        }

        let transformed = events.scan(false, move |failed, event| {
            if *failed {
                return future::ready(None);
            }
            let out = match apply_chunk(&stages, &ctx, event) {
                Ok(event) => event,
                Err(err) => {
                    warn!(provider = %ctx.provider, model = %ctx.model, error = %err, "Stream transformation failed");
                    *failed = true;
                    error_event(&err)
                }
            };
            future::ready(Some(out))
        });

        Box::pin(transformed)
    }
}

fn apply_chunk(
    stages: &[Arc<dyn Transformer>],
    ctx: &TransformContext,
    event: SseEvent,
) -> Result<SseEvent, TransformError> {
    if event.is_done() {
        return Ok(event);
    }
    let Ok(mut chunk) = serde_json::from_str::<Value>(&event.data) else {
        return Ok(event);
    };

    for transformer in stages {
        chunk = transformer
            .transform_stream_chunk(chunk, ctx)
            .map_err(|e| failed(transformer.as_ref(), Stage::Stream, e.message))?;
    }

    Ok(SseEvent {
        event: event.event,
        data: chunk.to_string(),
    })
}

fn failed(transformer: &dyn Transformer, stage: Stage, message: String) -> TransformError {
    TransformError::TransformationFailed {
        transformer: transformer.name().to_string(),
        stage,
        message,
    }
}

fn error_event(err: &TransformError) -> SseEvent {
    let transformer = match err {
        TransformError::TransformationFailed { transformer, .. } => transformer.as_str(),
        _ => "pipeline",
    };
    let payload = json!({
        "error": {
            "type": "transformation_failed",
            "transformer": transformer,
            "message": err.to_string(),
        }
    });
    SseEvent::named("error", payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Message;
    use crate::transform::{Capabilities, TransformFailure};
    use futures::stream;

    struct Tag(&'static str);

    impl Transformer for Tag {
        fn name(&self) -> &str {
            self.0
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::ALL
        }

        fn transform_request_in(
            &self,
            mut request: UnifiedChatRequest,
            _ctx: &TransformContext,
        ) -> Result<UnifiedChatRequest, TransformFailure> {
            request.model.push_str(self.0);
            Ok(request)
        }

        fn transform_stream_chunk(
            &self,
            mut chunk: Value,
            _ctx: &TransformContext,
        ) -> Result<Value, TransformFailure> {
            if chunk.get("boom").is_some() {
                return Err(TransformFailure::new("boom"));
            }
            chunk["seen"] = json!(self.0);
            Ok(chunk)
        }
    }

    struct WholeBodyOnly;

    impl Transformer for WholeBodyOnly {
        fn name(&self) -> &str {
            "whole-body"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                request: false,
                response: true,
                stream: false,
            }
        }
    }

    fn ctx() -> TransformContext {
        TransformContext::new("p", "m")
    }

    #[test]
    fn test_request_fold_is_left_to_right() {
        let pipeline = TransformerPipeline::new(vec![Arc::new(Tag("a")), Arc::new(Tag("b"))]);
        let out = pipeline
            .transform_request(UnifiedChatRequest::new("m-", vec![Message::user("x")]), &ctx())
            .unwrap();
        assert_eq!(out.model, "m-ab");
        assert_eq!(pipeline.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_non_json_body_forwarded() {
        let pipeline = TransformerPipeline::new(vec![Arc::new(WholeBodyOnly)]);
        let response = ProviderResponse {
            status: 502,
            headers: vec![],
            body: ResponseBody::Full(Bytes::from_static(b"<html>bad gateway</html>")),
        };
        let out = pipeline.transform_response(response, &ctx()).unwrap();
        assert_eq!(out.status, 502);
        assert_eq!(
            out.body_bytes().unwrap(),
            &Bytes::from_static(b"<html>bad gateway</html>")
        );
    }

    #[test]
    fn test_stream_refused_for_whole_body_transformer() {
        let pipeline = TransformerPipeline::new(vec![Arc::new(Tag("a")), Arc::new(WholeBodyOnly)]);
        assert!(!pipeline.supports_streaming());

        let events: EventStream = Box::pin(stream::iter(vec![SseEvent::data("{}")]));
        let err = pipeline
            .transform_response(ProviderResponse::event_stream(200, events), &ctx())
            .unwrap_err();
        assert_eq!(
            err,
            TransformError::StreamingUnsupported {
                transformer: "whole-body".into()
            }
        );
    }

    #[tokio::test]
    async fn test_stream_chunks_transformed_and_done_passes() {
        let pipeline = TransformerPipeline::new(vec![Arc::new(Tag("a"))]);
        let events: EventStream = Box::pin(stream::iter(vec![
            SseEvent::data(r#"{"id":1}"#),
            SseEvent::data("[DONE]"),
        ]));

        let out = pipeline
            .transform_response(ProviderResponse::event_stream(200, events), &ctx())
            .unwrap();
        let ResponseBody::Stream(events) = out.body else {
            panic!("expected stream");
        };
        let collected: Vec<SseEvent> = events.collect().await;

        assert_eq!(collected.len(), 2);
        let first: Value = serde_json::from_str(&collected[0].data).unwrap();
        assert_eq!(first, json!({"id": 1, "seen": "a"}));
        assert!(collected[1].is_done());
    }

    #[tokio::test]
    async fn test_stream_failure_emits_trailing_error_and_stops() {
        let pipeline = TransformerPipeline::new(vec![Arc::new(Tag("a"))]);
        let events: EventStream = Box::pin(stream::iter(vec![
            SseEvent::data(r#"{"n":1}"#),
            SseEvent::data(r#"{"boom":true}"#),
            SseEvent::data(r#"{"n":3}"#),
        ]));

        let out = pipeline
            .transform_response(ProviderResponse::event_stream(200, events), &ctx())
            .unwrap();
        let ResponseBody::Stream(events) = out.body else {
            panic!("expected stream");
        };
        let collected: Vec<SseEvent> = events.collect().await;

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].data, r#"{"n":1,"seen":"a"}"#);
        assert_eq!(collected[1].event.as_deref(), Some("error"));
        let error: Value = serde_json::from_str(&collected[1].data).unwrap();
        assert_eq!(error["error"]["transformer"], json!("a"));
    }
}
