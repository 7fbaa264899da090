//! Runs one tool-using conversation against a real backend.
//!
//! ```sh
//! ULLM_PROVIDER=openai ULLM_MODEL=gpt-4o ULLM_API_KEY=sk-... \
//!     RUST_LOG=ullm_runtime=debug cargo run -p ullm-runtime --example weather
//! ```

use model::{ProviderConfig, Registry};
use serde_json::json;
use std::io::Write;
use ucore::{Conversation, Message, Tool};
use ullm_runtime::{Engine, Execute, Layer, ObserveLayer, RunConfig, Toolbox, TracingObserver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let provider = std::env::var("ULLM_PROVIDER").unwrap_or_else(|_| "openai".to_owned());
    let model = std::env::var("ULLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_owned());
    let mut config = ProviderConfig::new(provider, model.as_str());
    if let Ok(key) = std::env::var("ULLM_API_KEY") {
        config = config.api_key(key);
    }
    if let Ok(url) = std::env::var("ULLM_BASE_URL") {
        config = config.base_url(url);
    }

    let tools = Toolbox::new().with(
        Tool::new(
            "weather",
            "Current weather for a city",
            schemars::json_schema!({
                "type": "object",
                "required": ["city"],
                "properties": {
                    "city": { "type": "string", "description": "City name" },
                    "unit": { "type": "string", "enum": ["celsius", "fahrenheit"] }
                }
            }),
        ),
        |args, _| async move {
            let unit = args["unit"].as_str().unwrap_or("celsius");
            anyhow::Ok(json!({ "city": args["city"], "temperature": 21, "unit": unit }))
        },
    );

    let engine = ObserveLayer(TracingObserver).layer(Engine::new(Registry::new(), tools));
    let mut conversation = Conversation::new(model)
        .system("Answer in one sentence.")
        .user("What's the weather like in Paris and in Tokyo?");

    let mut stdout = std::io::stdout();
    let mut sink = |_: &Message, delta: Option<&str>, done: bool| {
        if let Some(delta) = delta {
            let _ = write!(stdout, "{delta}");
            let _ = stdout.flush();
        }
        if done {
            let _ = writeln!(stdout);
        }
    };

    let response = engine
        .execute_streaming(&mut conversation, &RunConfig::new(config), &mut sink)
        .await?;
    println!(
        "[{} messages, {} tokens]",
        conversation.len(),
        response.usage().total_tokens
    );
    Ok(())
}
