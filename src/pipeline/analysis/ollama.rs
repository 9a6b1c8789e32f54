use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::base_analyzer::DocumentAnalyzer;
use super::prompts::SYSTEM_PROMPT;
use super::validation::{parse_response, prepare_input};
use crate::data_model::DocumentInfo;
use crate::error::{PipelineError, Result};

/// Analysis through a local Ollama server's chat endpoint.
pub struct OllamaAnalyzer {
    client: Client,
    model: String,
    base_url: String,
}

impl OllamaAnalyzer {
    pub fn new(model: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let lower = base_url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(PipelineError::ConfigError(format!(
                "Invalid ollama_url scheme: {}",
                base_url
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(OllamaAnalyzer {
            client,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prepare_input(text)},
            ],
            "stream": false,
            "format": "json",
        })
    }
}

#[async_trait]
impl DocumentAnalyzer for OllamaAnalyzer {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn analyze(&self, text: &str) -> Result<DocumentInfo> {
        info!(model = %self.model, "Analyzing document with Ollama");

        let response: Value = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&self.request_body(text))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .pointer("/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PipelineError::AnalysisFailed("Ollama response has no message content".to_string())
            })?;
        debug!(chars = content.len(), "Received Ollama response");

        Ok(parse_response(content))
    }
}
