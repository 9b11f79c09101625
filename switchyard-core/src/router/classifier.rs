//! Request classification signals
//!
//! The router only consumes [`RequestSignals`]. Where they come from is up to
//! the caller: a real tokenizer, an upstream classifier, or the
//! [`HeuristicClassifier`] shipped here.

use crate::protocol::{MessageContent, UnifiedChatRequest};

/// Classification inputs for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSignals {
    /// Estimated input token count
    pub estimated_tokens: u64,
    /// Request is background work
    pub background: bool,
    /// Request asks for extended reasoning
    pub think: bool,
    /// Request needs web search
    pub web_search: bool,
}

/// Produces routing signals for a request. Must be a pure call.
pub trait RequestClassifier: Send + Sync {
    /// Classify one request
    fn classify(&self, request: &UnifiedChatRequest) -> RequestSignals;
}

/// Cheap classifier based on request shape.
///
/// - tokens: `(chars + 3) / 4` over all text the model will read
/// - background: requested model id contains the marker (default `haiku`)
/// - think: a `thinking` block is present and not disabled
/// - web search: a tool whose type starts with `web_search`
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    background_model_marker: String,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new("haiku")
    }
}

impl HeuristicClassifier {
    /// Create a classifier with a custom background marker
    pub fn new(background_model_marker: impl Into<String>) -> Self {
        Self {
            background_model_marker: background_model_marker.into(),
        }
    }
}

impl RequestClassifier for HeuristicClassifier {
    fn classify(&self, request: &UnifiedChatRequest) -> RequestSignals {
        let background = !self.background_model_marker.is_empty()
            && request.model.contains(&self.background_model_marker);

        // {"type": "disabled"} is how clients switch thinking off explicitly
        let think = request.thinking.as_ref().is_some_and(|thinking| {
            !thinking.is_null()
                && thinking.get("type").and_then(|t| t.as_str()) != Some("disabled")
        });

        let web_search = request
            .tools
            .as_ref()
            .is_some_and(|tools| tools.iter().any(|t| t.tool_type.starts_with("web_search")));

        RequestSignals {
            estimated_tokens: estimate_tokens(request),
            background,
            think,
            web_search,
        }
    }
}

/// Rough token estimate: four characters per token, rounded up
pub fn estimate_tokens(request: &UnifiedChatRequest) -> u64 {
    let mut chars = 0usize;

    for message in &request.messages {
        if let Some(content) = &message.content {
            chars += match content {
                MessageContent::Text(text) => text.chars().count(),
                MessageContent::Parts(_) => content.joined_text().chars().count(),
            };
        }
        if let Some(reasoning) = &message.reasoning_content {
            chars += reasoning.chars().count();
        }
        for call in message.tool_calls.iter().flatten() {
            chars += call.function.name.len() + call.function.arguments.chars().count();
        }
    }

    for tool in request.tools.iter().flatten() {
        if let Some(function) = &tool.function {
            chars += function.name.len();
            chars += function.description.as_deref().map_or(0, |d| d.chars().count());
            chars += function
                .parameters
                .as_ref()
                .map_or(0, |p| p.to_string().len());
        }
    }

    ((chars + 3) / 4) as u64
}
