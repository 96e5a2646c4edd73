//! # LLM API Client
//!
//! Sends row-generation prompts to Claude or OpenAI and returns the raw
//! response text. Supports auto-detection of the API key from environment
//! variables and optional model overrides via `--model` or `synthseed.toml`.
//!
//! The client never retries on its own; the batch state machine owns all
//! retry logic.

use crate::error::{Result, SynthSeedError};

/// The text-generation capability the pipeline depends on.
pub trait TextGenerator: Send + Sync {
    /// Send a prompt and return the raw completion text.
    fn generate(&self, prompt: &str) -> impl std::future::Future<Output = Result<String>>;
}

/// Supported LLM providers.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Claude { api_key: String, model: String },
    OpenAI { api_key: String, model: String },
}

impl LlmProvider {
    /// Auto-detect provider from environment variables.
    ///
    /// Checks `ANTHROPIC_API_KEY` first, then `OPENAI_API_KEY`. Falls back to
    /// a sensible default model for each provider unless `model_override` is
    /// specified.
    pub fn from_env(model_override: Option<&str>) -> Result<Self> {
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            return Ok(LlmProvider::Claude {
                api_key: key,
                model: model_override
                    .unwrap_or("claude-sonnet-4-20250514")
                    .to_string(),
            });
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            return Ok(LlmProvider::OpenAI {
                api_key: key,
                model: model_override.unwrap_or("gpt-4o").to_string(),
            });
        }

        Err(SynthSeedError::LlmError {
            message: "No LLM API key found. Set ANTHROPIC_API_KEY or OPENAI_API_KEY environment variable.".to_string(),
        })
    }

    pub fn model(&self) -> &str {
        match self {
            LlmProvider::Claude { model, .. } | LlmProvider::OpenAI { model, .. } => model,
        }
    }
}

impl TextGenerator for LlmProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            LlmProvider::Claude { api_key, model } => call_claude(api_key, model, prompt).await,
            LlmProvider::OpenAI { api_key, model } => call_openai(api_key, model, prompt).await,
        }
    }
}

/// Maximum time to wait for an LLM API response before aborting.
const API_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(45);

/// Upper bound on completion size; ten wide rows fit comfortably.
const MAX_TOKENS: u32 = 8192;

fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(API_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Call the Anthropic Messages API.
///
/// Uses assistant pre-fill (`[`) so the completion starts inside a raw JSON
/// array instead of markdown fences or preamble text.
async fn call_claude(api_key: &str, model: &str, prompt: &str) -> Result<String> {
    let client = build_http_client();

    let body = serde_json::json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "messages": [
            {
                "role": "user",
                "content": prompt
            },
            {
                "role": "assistant",
                "content": "["
            }
        ]
    });

    let response = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| SynthSeedError::LlmError {
            message: format!("Failed to call Claude API: {}", e),
        })?;

    let status = response.status();
    let response_text = response.text().await.map_err(|e| SynthSeedError::LlmError {
        message: format!("Failed to read Claude API response: {}", e),
    })?;

    if !status.is_success() {
        return Err(SynthSeedError::LlmError {
            message: format!(
                "Claude API returned {}: {}",
                status,
                truncate(&response_text, 500),
            ),
        });
    }

    let parsed: serde_json::Value =
        serde_json::from_str(&response_text).map_err(|e| SynthSeedError::LlmError {
            message: format!("Failed to parse Claude API response JSON: {}", e),
        })?;

    let text = parsed["content"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|block| block["text"].as_str())
        .ok_or_else(|| SynthSeedError::LlmError {
            message: "Claude API response missing content[0].text".to_string(),
        })?;

    // The pre-filled `[` is not echoed back.
    Ok(format!("[{}", text))
}

/// Call the OpenAI Chat Completions API.
///
/// `response_format: json_object` is not used: it forces a top-level object
/// and the rows must come back as an array.
async fn call_openai(api_key: &str, model: &str, prompt: &str) -> Result<String> {
    let client = build_http_client();

    let body = serde_json::json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": "You output only raw JSON arrays."
            },
            {
                "role": "user",
                "content": prompt
            }
        ],
        "max_tokens": MAX_TOKENS
    });

    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| SynthSeedError::LlmError {
            message: format!("Failed to call OpenAI API: {}", e),
        })?;

    let status = response.status();
    let response_text = response.text().await.map_err(|e| SynthSeedError::LlmError {
        message: format!("Failed to read OpenAI API response: {}", e),
    })?;

    if !status.is_success() {
        return Err(SynthSeedError::LlmError {
            message: format!(
                "OpenAI API returned {}: {}",
                status,
                truncate(&response_text, 500),
            ),
        });
    }

    let parsed: serde_json::Value =
        serde_json::from_str(&response_text).map_err(|e| SynthSeedError::LlmError {
            message: format!("Failed to parse OpenAI API response JSON: {}", e),
        })?;

    let text = parsed["choices"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|choice| choice["message"]["content"].as_str())
        .ok_or_else(|| SynthSeedError::LlmError {
            message: "OpenAI API response missing choices[0].message.content".to_string(),
        })?;

    Ok(text.to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    crate::llm::parse::truncate(s, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them in one test so they
    // cannot interleave.
    #[test]
    fn test_from_env_detection() {
        let anthropic = std::env::var("ANTHROPIC_API_KEY").ok();
        let openai = std::env::var("OPENAI_API_KEY").ok();

        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
        assert!(LlmProvider::from_env(None).is_err());

        std::env::set_var("OPENAI_API_KEY", "sk-test");
        match LlmProvider::from_env(None).unwrap() {
            LlmProvider::OpenAI { api_key, model } => {
                assert_eq!(api_key, "sk-test");
                assert_eq!(model, "gpt-4o");
            }
            other => panic!("Expected OpenAI provider, got {:?}", other),
        }

        std::env::set_var("ANTHROPIC_API_KEY", "test-key-123");
        let provider = LlmProvider::from_env(Some("claude-opus-4-20250514")).unwrap();
        match &provider {
            LlmProvider::Claude { api_key, .. } => assert_eq!(api_key, "test-key-123"),
            other => panic!("Expected Claude provider, got {:?}", other),
        }
        assert_eq!(provider.model(), "claude-opus-4-20250514");

        match anthropic {
            Some(k) => std::env::set_var("ANTHROPIC_API_KEY", k),
            None => std::env::remove_var("ANTHROPIC_API_KEY"),
        }
        match openai {
            Some(k) => std::env::set_var("OPENAI_API_KEY", k),
            None => std::env::remove_var("OPENAI_API_KEY"),
        }
    }

    #[test]
    fn test_http_client_builds() {
        let client = build_http_client();
        assert!(std::mem::size_of_val(&client) > 0);
    }
}
