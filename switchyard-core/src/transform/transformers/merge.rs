//! Message-shape adapters for providers with stricter turn rules

use crate::protocol::{ContentPart, Message, MessageContent, MessageRole, UnifiedChatRequest};
use crate::transform::{Capabilities, TransformContext, TransformFailure, Transformer};

/// Folds system and developer messages into the next user message, for
/// providers without a system role. Trailing instructions become a user turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeSystem;

impl MergeSystem {
    /// Configuration name
    pub const NAME: &'static str = "merge-system";
}

fn is_instruction(role: MessageRole) -> bool {
    matches!(role, MessageRole::System | MessageRole::Developer)
}

fn prepend_text(content: Option<MessageContent>, prefix: &str) -> MessageContent {
    match content {
        None => MessageContent::Text(prefix.to_string()),
        Some(MessageContent::Text(text)) => MessageContent::Text(format!("{}\n\n{}", prefix, text)),
        Some(MessageContent::Parts(mut parts)) => {
            parts.insert(
                0,
                ContentPart::Text {
                    text: prefix.to_string(),
                },
            );
            MessageContent::Parts(parts)
        }
    }
}

impl Transformer for MergeSystem {
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
        if !request.messages.iter().any(|m| is_instruction(m.role)) {
            return Ok(request);
        }

        let mut merged = Vec::with_capacity(request.messages.len());
        let mut pending = String::new();

        for mut message in request.messages.drain(..) {
            if is_instruction(message.role) {
                let text = message
                    .content
                    .as_ref()
                    .map(MessageContent::joined_text)
                    .unwrap_or_default();
                if !pending.is_empty() {
                    pending.push_str("\n\n");
                }
                pending.push_str(&text);
                continue;
            }

            if message.role == MessageRole::User && !pending.is_empty() {
                message.content = Some(prepend_text(message.content.take(), &pending));
                pending.clear();
            }
            merged.push(message);
        }

        if !pending.is_empty() {
            merged.push(Message::user(pending));
        }

        request.messages = merged;
        Ok(request)
    }
}

/// Joins adjacent plain-text messages that share a role. Tool traffic and
/// multimodal turns are never merged.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeConsecutive;

impl MergeConsecutive {
    /// Configuration name
    pub const NAME: &'static str = "merge-consecutive";
}

fn mergeable(message: &Message) -> bool {
    message.tool_calls.is_none()
        && message.tool_call_id.is_none()
        && !matches!(message.role, MessageRole::Tool | MessageRole::Function)
        && matches!(message.content, Some(MessageContent::Text(_)))
}

impl Transformer for MergeConsecutive {
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
        let mut merged: Vec<Message> = Vec::with_capacity(request.messages.len());

        for message in request.messages.drain(..) {
            if let Some(previous) = merged.last_mut() {
                if previous.role == message.role && mergeable(previous) && mergeable(&message) {
                    if let (Some(MessageContent::Text(prev_text)), Some(text)) =
                        (previous.content.as_mut(), message.text())
                    {
                        prev_text.push_str("\n\n");
                        prev_text.push_str(text);
                        continue;
                    }
                }
            }
            merged.push(message);
        }

        request.messages = merged;
        Ok(request)
    }
}
