use crate::protocol::UnifiedChatRequest;
use crate::transform::{Capabilities, TransformContext, TransformError, TransformFailure, Transformer};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaxTokenOptions {
    max_tokens: Option<u32>,
}

/// Clamps `max_tokens` to the provider's ceiling. Requests without
/// `max_tokens`, or already below the ceiling, are left alone.
#[derive(Debug, Clone, Copy)]
pub struct MaxTokenCap {
    ceiling: u32,
}

impl MaxTokenCap {
    /// Configuration name
    pub const NAME: &'static str = "maxtoken";

    /// Cap at `ceiling` tokens
    pub fn new(ceiling: u32) -> Self {
        Self { ceiling }
    }

    pub(crate) fn from_options(options: &Value) -> Result<Self, TransformError> {
        let options: MaxTokenOptions = super::parse_options(Self::NAME, options)?;
        match options.max_tokens {
            Some(ceiling) if ceiling > 0 => Ok(Self::new(ceiling)),
            _ => Err(TransformError::InvalidOptions {
                transformer: Self::NAME.to_string(),
                message: "max_tokens must be set to a positive integer".to_string(),
            }),
        }
    }
}

impl Transformer for MaxTokenCap {
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
        if let Some(requested) = request.max_tokens {
            request.max_tokens = Some(requested.min(self.ceiling));
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(Some(32_000), Some(8_192) ; "clamped")]
    #[test_case(Some(1_024), Some(1_024) ; "below ceiling")]
    #[test_case(None, None ; "unset")]
    fn test_cap(requested: Option<u32>, expected: Option<u32>) {
        let mut request = UnifiedChatRequest::new("m", vec![]);
        request.max_tokens = requested;
        let out = MaxTokenCap::new(8_192)
            .transform_request_in(request, &TransformContext::new("p", "m"))
            .unwrap();
        assert_eq!(out.max_tokens, expected);
    }

    #[test]
    fn test_options_required() {
        assert!(MaxTokenCap::from_options(&Value::Null).is_err());
        assert!(MaxTokenCap::from_options(&json!({"max_tokens": 0})).is_err());
        assert!(MaxTokenCap::from_options(&json!({"max_tokens": 4096})).is_ok());
    }
}
