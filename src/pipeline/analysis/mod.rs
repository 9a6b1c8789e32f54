// src/pipeline/analysis/mod.rs

pub mod base_analyzer;
pub mod claude_api;
pub mod claude_cli;
pub mod ollama;
pub mod prompts;
pub mod validation;

pub use base_analyzer::DocumentAnalyzer;
pub use claude_api::ClaudeApiAnalyzer;
pub use claude_cli::ClaudeCliAnalyzer;
pub use ollama::OllamaAnalyzer;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Picks the analysis backend named in the configuration.
pub fn create_analyzer(config: &LlmConfig) -> Result<Arc<dyn DocumentAnalyzer>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let analyzer: Arc<dyn DocumentAnalyzer> = match config.provider {
        LlmProvider::Ollama => Arc::new(OllamaAnalyzer::new(
            &config.model,
            &config.ollama_url,
            timeout,
        )?),
        LlmProvider::ClaudeCli => Arc::new(ClaudeCliAnalyzer::default()),
        LlmProvider::ClaudeApi => {
            // The Ollama default model name means nothing to the Messages API.
            let model = if config.model == LlmConfig::default().model {
                claude_api::DEFAULT_CLAUDE_MODEL
            } else {
                config.model.as_str()
            };
            Arc::new(ClaudeApiAnalyzer::new(model, timeout)?)
        }
    };
    debug!(analyzer = analyzer.name(), "Analysis backend selected");
    Ok(analyzer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_selects_ollama() {
        let analyzer = create_analyzer(&LlmConfig::default()).unwrap();
        assert_eq!(analyzer.name(), "ollama");
    }

    #[test]
    fn test_cli_provider_selected() {
        let config = LlmConfig {
            provider: LlmProvider::ClaudeCli,
            ..LlmConfig::default()
        };
        assert_eq!(create_analyzer(&config).unwrap().name(), "claude-cli");
    }
}
