//! Built-in transformers
//!
//! | name                | hooks                      | purpose                                   |
//! |---------------------|----------------------------|-------------------------------------------|
//! | `deepseek-thinking` | request, response, stream  | default `reasoning_content` to `""`       |
//! | `strip-reasoning`   | request                    | drop `reasoning_content` before sending   |
//! | `maxtoken`          | request                    | clamp `max_tokens`                        |
//! | `merge-system`      | request                    | fold system turns into the next user turn |
//! | `merge-consecutive` | request                    | join adjacent same-role text turns        |

mod max_tokens;
mod merge;
mod reasoning;

pub use max_tokens::MaxTokenCap;
pub use merge::{MergeConsecutive, MergeSystem};
pub use reasoning::{ReasoningContentDefault, StripReasoning};

use super::registry::TransformerRegistry;
use super::{TransformError, Transformer};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Register every built-in transformer under its configuration name
pub(crate) fn register_builtins(registry: &mut TransformerRegistry) {
    registry
        .register(ReasoningContentDefault::NAME, |options: &Value| {
            let transformer = ReasoningContentDefault::from_options(options)?;
            Ok(Arc::new(transformer) as Arc<dyn Transformer>)
        })
        .register(StripReasoning::NAME, |options: &Value| {
            no_options(StripReasoning::NAME, options)?;
            Ok(Arc::new(StripReasoning) as Arc<dyn Transformer>)
        })
        .register(MaxTokenCap::NAME, |options: &Value| {
            let transformer = MaxTokenCap::from_options(options)?;
            Ok(Arc::new(transformer) as Arc<dyn Transformer>)
        })
        .register(MergeSystem::NAME, |options: &Value| {
            no_options(MergeSystem::NAME, options)?;
            Ok(Arc::new(MergeSystem) as Arc<dyn Transformer>)
        })
        .register(MergeConsecutive::NAME, |options: &Value| {
            no_options(MergeConsecutive::NAME, options)?;
            Ok(Arc::new(MergeConsecutive) as Arc<dyn Transformer>)
        });
}

/// Decode a factory's options; `null` means "use defaults"
fn parse_options<T: DeserializeOwned + Default>(
    transformer: &str,
    options: &Value,
) -> Result<T, TransformError> {
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options.clone()).map_err(|e| TransformError::InvalidOptions {
        transformer: transformer.to_string(),
        message: e.to_string(),
    })
}

fn no_options(transformer: &str, options: &Value) -> Result<(), TransformError> {
    match options {
        Value::Null => Ok(()),
        Value::Object(map) if map.is_empty() => Ok(()),
        _ => Err(TransformError::InvalidOptions {
            transformer: transformer.to_string(),
            message: "this transformer takes no options".to_string(),
        }),
    }
}
