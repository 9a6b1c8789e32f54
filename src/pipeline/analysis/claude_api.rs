use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use super::base_analyzer::DocumentAnalyzer;
use super::prompts::SYSTEM_PROMPT;
use super::validation::{parse_response, prepare_input};
use crate::data_model::DocumentInfo;
use crate::error::{PipelineError, Result};

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Analysis through the Anthropic Messages API (key from `ANTHROPIC_API_KEY`).
pub struct ClaudeApiAnalyzer {
    client: Client,
    model: String,
    api_key: String,
}

impl ClaudeApiAnalyzer {
    pub fn new(model: &str, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            PipelineError::ConfigError("ANTHROPIC_API_KEY is not set".to_string())
        })?;
        Self::with_api_key(model, api_key, timeout)
    }

    pub fn with_api_key(model: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ClaudeApiAnalyzer {
            client,
            model: model.to_string(),
            api_key,
        })
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": 1024,
            "system": SYSTEM_PROMPT,
            "messages": [
                {"role": "user", "content": prepare_input(text)},
            ],
        })
    }
}

#[async_trait]
impl DocumentAnalyzer for ClaudeApiAnalyzer {
    fn name(&self) -> &'static str {
        "claude-api"
    }

    async fn analyze(&self, text: &str) -> Result<DocumentInfo> {
        info!(model = %self.model, "Analyzing document with Claude API");

        let response: Value = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request_body(text))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // A non-text first block is treated like an empty answer.
        let answer = response
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(parse_response(answer))
    }
}
