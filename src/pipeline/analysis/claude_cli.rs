use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

use super::base_analyzer::DocumentAnalyzer;
use super::prompts::{response_schema, SYSTEM_PROMPT};
use super::validation::{info_from_value, prepare_input};
use crate::data_model::DocumentInfo;
use crate::error::{PipelineError, Result};

/// Analysis through the `claude` command line client with structured output.
#[derive(Debug, Clone)]
pub struct ClaudeCliAnalyzer {
    command: String,
}

impl ClaudeCliAnalyzer {
    pub fn new(command: impl Into<String>) -> Self {
        ClaudeCliAnalyzer {
            command: command.into(),
        }
    }

    fn build_prompt(text: &str) -> String {
        format!("{}\n\n{}", SYSTEM_PROMPT, prepare_input(text))
    }
}

impl Default for ClaudeCliAnalyzer {
    fn default() -> Self {
        ClaudeCliAnalyzer::new("claude")
    }
}

/// Pulls the structured answer out of the CLI's JSON envelope.
fn structured_output(stdout: &str) -> Result<DocumentInfo> {
    let envelope: Value = serde_json::from_str(stdout)?;
    let content = envelope
        .get("structured_output")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    Ok(info_from_value(&content))
}

#[async_trait]
impl DocumentAnalyzer for ClaudeCliAnalyzer {
    fn name(&self) -> &'static str {
        "claude-cli"
    }

    async fn analyze(&self, text: &str) -> Result<DocumentInfo> {
        info!("Analyzing document with Claude CLI");

        let mut child = Command::new(&self.command)
            .arg("-p")
            .args(["--output-format", "json"])
            .arg("--json-schema")
            .arg(response_schema().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PipelineError::AnalysisFailed(format!("failed to start '{}': {}", self.command, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(Self::build_prompt(text).as_bytes()).await?;
            // Dropping stdin closes the pipe so the CLI sees EOF.
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(PipelineError::AnalysisFailed(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        structured_output(&String::from_utf8_lossy(&output.stdout))
    }
}
