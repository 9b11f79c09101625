//! `reasoning_content` handling for thinking models
//!
//! DeepSeek's reasoner requires every assistant turn in the history to carry
//! `reasoning_content`, even if empty, and multi-turn clients can only send it
//! back if responses always include it.

use crate::protocol::{MessageRole, UnifiedChatRequest};
use crate::transform::{Capabilities, TransformContext, TransformFailure, Transformer};
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

const REASONING_FIELD: &str = "reasoning_content";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReasoningOptions {
    #[serde(default = "default_model")]
    model: String,
}

impl Default for ReasoningOptions {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    "deepseek-reasoner".to_string()
}

/// Guarantees `reasoning_content` is present (defaulting to `""`) on every
/// assistant message, for one model id only. Other models pass through.
#[derive(Debug, Clone)]
pub struct ReasoningContentDefault {
    model: String,
}

impl ReasoningContentDefault {
    /// Configuration name
    pub const NAME: &'static str = "deepseek-thinking";

    /// Scope the transformer to `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub(crate) fn from_options(options: &Value) -> Result<Self, crate::transform::TransformError> {
        let options: ReasoningOptions = super::parse_options(Self::NAME, options)?;
        Ok(Self::new(options.model))
    }

    fn applies(&self, ctx: &TransformContext) -> bool {
        ctx.model == self.model
    }
}

impl Default for ReasoningContentDefault {
    fn default() -> Self {
        Self::new(default_model())
    }
}

/// Insert `reasoning_content: ""` when the key is missing or null
fn default_reasoning(message: &mut Value) {
    if let Some(object) = message.as_object_mut() {
        let entry = object
            .entry(REASONING_FIELD)
            .or_insert(Value::Null);
        if entry.is_null() {
            *entry = Value::String(String::new());
        }
    }
}

fn choices_mut(body: &mut Value) -> impl Iterator<Item = &mut Value> {
    body.get_mut("choices")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
}

impl Transformer for ReasoningContentDefault {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn transform_request_in(
        &self,
        mut request: UnifiedChatRequest,
        ctx: &TransformContext,
    ) -> Result<UnifiedChatRequest, TransformFailure> {
        if !self.applies(ctx) {
            return Ok(request);
        }

        let mut filled = 0usize;
        for message in request
            .messages
            .iter_mut()
            .filter(|m| m.role == MessageRole::Assistant)
        {
            if message.reasoning_content.is_none() {
                message.reasoning_content = Some(String::new());
                filled += 1;
            }
        }
        trace!(model = %ctx.model, filled, "Defaulted reasoning_content on assistant messages");
        Ok(request)
    }

    fn transform_response_out(
        &self,
        mut body: Value,
        ctx: &TransformContext,
    ) -> Result<Value, TransformFailure> {
        if !self.applies(ctx) {
            return Ok(body);
        }
        for choice in choices_mut(&mut body) {
            if let Some(message) = choice.get_mut("message") {
                default_reasoning(message);
            }
        }
        Ok(body)
    }

    fn transform_stream_chunk(
        &self,
        mut chunk: Value,
        ctx: &TransformContext,
    ) -> Result<Value, TransformFailure> {
        if !self.applies(ctx) {
            return Ok(chunk);
        }
        // Only the opening delta carries the role
        for choice in choices_mut(&mut chunk) {
            if let Some(delta) = choice.get_mut("delta") {
                if delta.get("role").and_then(Value::as_str) == Some("assistant") {
                    default_reasoning(delta);
                }
            }
        }
        Ok(chunk)
    }
}

/// Removes `reasoning_content` from outgoing messages, for providers that
/// reject the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripReasoning;

impl StripReasoning {
    /// Configuration name
    pub const NAME: &'static str = "strip-reasoning";
}

impl Transformer for StripReasoning {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REQUEST
    }

    fn transform_request_in(
        &self,
        mut request: UnifiedChatRequest,
        _ctx: &TransformContext,
    ) -> Result<UnifiedChatRequest, TransformFailure> {
        for message in &mut request.messages {
            message.reasoning_content = None;
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Message, MessageBuilder};
    use serde_json::json;

    fn reasoner() -> TransformContext {
        TransformContext::new("deepseek", "deepseek-reasoner")
    }

    fn history() -> UnifiedChatRequest {
        UnifiedChatRequest::new(
            "deepseek-reasoner",
            vec![
                Message::user("2+2?"),
                Message::assistant("4"),
                MessageBuilder::new(MessageRole::Assistant, "still 4")
                    .with_reasoning("checked twice")
                    .build(),
                Message::user("sure?"),
            ],
        )
    }

    #[test]
    fn test_request_fills_missing_reasoning_only() {
        let out = ReasoningContentDefault::default()
            .transform_request_in(history(), &reasoner())
            .unwrap();

        assert_eq!(out.messages[0].reasoning_content, None);
        assert_eq!(out.messages[1].reasoning_content.as_deref(), Some(""));
        assert_eq!(out.messages[2].reasoning_content.as_deref(), Some("checked twice"));
        assert_eq!(out.messages[3].reasoning_content, None);
    }

    #[test]
    fn test_other_model_is_untouched_byte_for_byte() {
        let request = history();
        let before = serde_json::to_vec(&request).unwrap();
        let ctx = TransformContext::new("deepseek", "deepseek-chat");

        let out = ReasoningContentDefault::default()
            .transform_request_in(request, &ctx)
            .unwrap();
        assert_eq!(serde_json::to_vec(&out).unwrap(), before);

        let body = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        let out = ReasoningContentDefault::default()
            .transform_response_out(body.clone(), &ctx)
            .unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn test_response_null_and_missing_become_empty() {
        let body = json!({
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "a"}},
                {"index": 1, "message": {"role": "assistant", "content": "b", "reasoning_content": null}},
                {"index": 2, "message": {"role": "assistant", "content": "c", "reasoning_content": "why"}}
            ]
        });
        let out = ReasoningContentDefault::default()
            .transform_response_out(body, &reasoner())
            .unwrap();

        assert_eq!(out["choices"][0]["message"]["reasoning_content"], json!(""));
        assert_eq!(out["choices"][1]["message"]["reasoning_content"], json!(""));
        assert_eq!(out["choices"][2]["message"]["reasoning_content"], json!("why"));
    }

    #[test]
    fn test_response_without_choices_is_untouched() {
        let body = json!({"error": {"message": "rate limited"}});
        let out = ReasoningContentDefault::default()
            .transform_response_out(body.clone(), &reasoner())
            .unwrap();
        assert_eq!(out, body);
    }

    #[test]
    fn test_stream_only_opening_delta() {
        let transformer = ReasoningContentDefault::default();
        let opening = json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": ""}}]});
        let later = json!({"choices": [{"index": 0, "delta": {"content": "hi"}}]});

        let opening = transformer.transform_stream_chunk(opening, &reasoner()).unwrap();
        let later_out = transformer.transform_stream_chunk(later.clone(), &reasoner()).unwrap();

        assert_eq!(opening["choices"][0]["delta"]["reasoning_content"], json!(""));
        assert_eq!(later_out, later);
    }

    #[test]
    fn test_custom_model_option() {
        let transformer =
            ReasoningContentDefault::from_options(&json!({"model": "kimi-thinking"})).unwrap();
        let ctx = TransformContext::new("moonshot", "kimi-thinking");
        let out = transformer
            .transform_request_in(UnifiedChatRequest::new("kimi-thinking", vec![Message::assistant("x")]), &ctx)
            .unwrap();
        assert_eq!(out.messages[0].reasoning_content.as_deref(), Some(""));

        assert!(ReasoningContentDefault::from_options(&json!({"modle": "typo"})).is_err());
    }

    #[test]
    fn test_strip_reasoning() {
        let out = StripReasoning
            .transform_request_in(history(), &reasoner())
            .unwrap();
        assert!(out.messages.iter().all(|m| m.reasoning_content.is_none()));
    }
}
