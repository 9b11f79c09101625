//! Routing Demo - Scenario Routing, Transformation and State
//!
//! This example walks a few requests through the routing engine:
//! - Scenario selection (default, think, long context)
//! - Provider-specific request/response normalization
//! - The persisted routing trail
//!
//! Run with: cargo run --example routing_demo

use serde_json::json;
use switchyard_core::config::{load_from_str, ConfigFormat, ConfigValidator};
use switchyard_core::protocol::{Message, UnifiedChatRequest};
use switchyard_core::transform::ProviderResponse;
use switchyard_core::{RoutingEngine, RoutingStateStore, TransformerRegistry};

const CONFIG: &str = r#"
version: "0.1"
providers:
  - name: openai
    models: [gpt-4, gpt-4-128k]
  - name: deepseek
    models: [deepseek-reasoner]
    model_transformers:
      deepseek-reasoner: [deepseek-thinking]
router:
  default: openai,gpt-4
  longContext: openai,gpt-4-128k
  think: deepseek,deepseek-reasoner
logging:
  level: info
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_from_str(CONFIG, ConfigFormat::Yaml, "routing_demo", &ConfigValidator::new())?;
    switchyard_core::logging::init(&config.logging)?;

    let state_dir = tempfile::tempdir()?;
    let store = RoutingStateStore::open(state_dir.path().join("routing-state.json"));
    let engine = RoutingEngine::from_config(&config, &TransformerRegistry::with_builtins(), store.clone())?;

    println!("\nSwitchyard Routing Demo\n=======================\n");

    let requests = vec![
        (
            "plain question",
            UnifiedChatRequest::new("claude-sonnet", vec![Message::user("What is a monad?")]),
        ),
        (
            "thinking enabled",
            UnifiedChatRequest::new(
                "claude-sonnet",
                vec![Message::user("Prove it"), Message::assistant("Sure"), Message::user("Go on")],
            )
            .with_thinking(json!({"type": "enabled", "budget_tokens": 4096})),
        ),
        (
            "huge prompt",
            UnifiedChatRequest::new("claude-sonnet", vec![Message::user("lorem ".repeat(50_000))]),
        ),
    ];

    for (label, request) in requests {
        let prepared = engine.prepare(request)?;
        println!("{label}:");
        println!("  -> {},{} [{}]", prepared.decision.provider, prepared.decision.model, prepared.decision.scenario);
        println!("  reason: {}", prepared.decision.reason);
        println!("  transformers: {:?}", prepared.pipeline().names());

        let provider_body = json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "..."}}]
        });
        let response = prepared.transform_response(ProviderResponse::json(200, &provider_body))?;
        if let Some(body) = response.body_bytes() {
            println!("  response: {}", String::from_utf8_lossy(body));
        }
        println!();
    }

    store.flush().await?;
    let state = store.read().await?;
    println!("Session: {} requests", state.session.request_count);
    for (model, count) in &state.session.model_breakdown {
        println!("  {model}: {count}");
    }

    Ok(())
}
