use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SOURCE: &str = "~/Library/Mobile Documents/com~apple~Preview/Documents";
pub const DEFAULT_BASE: &str = "~/Documents/Inbox";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const ENV_PREFIX: &str = "PAPERTRAIL_";

/// Application settings, assembled once at startup and handed to each component.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub paths: PathsConfig,
    pub watch: WatchConfig,
    pub cleanup: CleanupConfig,
    pub llm: LlmConfig,
    pub ocr: OcrConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub source: PathBuf, // The synced drop folder being watched
    pub base: PathBuf,   // Archive root; holds .pending, .trash and .quarantine
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            source: PathBuf::from(DEFAULT_SOURCE),
            base: PathBuf::from(DEFAULT_BASE),
        }
    }
}

impl PathsConfig {
    pub fn pending(&self) -> PathBuf {
        self.base.join(".pending")
    }

    pub fn trash(&self) -> PathBuf {
        self.base.join(".trash")
    }

    pub fn quarantine(&self) -> PathBuf {
        self.base.join(".quarantine")
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WatchConfig {
    pub patterns: Vec<String>,
    pub stability_poll_ms: u64,
    pub stability_timeout_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            patterns: vec![
                "*.pdf".to_string(),
                "*.png".to_string(),
                "*.jpg".to_string(),
                "*.jpeg".to_string(),
            ],
            stability_poll_ms: 1000,
            stability_timeout_secs: 30,
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.stability_poll_ms)
    }

    pub fn stability_timeout(&self) -> Duration {
        Duration::from_secs(self.stability_timeout_secs)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CleanupConfig {
    pub retention_days: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        CleanupConfig {
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// Available analysis backends.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LlmProvider {
    #[default]
    Ollama,
    ClaudeCli,
    ClaudeApi,
}

impl FromStr for LlmProvider {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "claude-cli" => Ok(LlmProvider::ClaudeCli),
            "claude-api" => Ok(LlmProvider::ClaudeApi),
            other => Err(PipelineError::ConfigError(format!(
                "Unknown LLM provider: {}",
                other
            ))),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub ollama_url: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            provider: LlmProvider::Ollama,
            model: "gemma3:4b".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct OcrConfig {
    pub command: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            command: "ocrmypdf".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct MetricsConfig {
    pub port: Option<u16>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.watch.patterns.is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "watch.patterns must contain at least one pattern".to_string(),
            ));
        }
        if let Some(empty) = self.watch.patterns.iter().find(|p| p.trim().is_empty()) {
            return Err(PipelineError::ConfigValidationError(format!(
                "watch.patterns contains an empty pattern: '{}'",
                empty
            )));
        }
        for pattern in &self.watch.patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(PipelineError::ConfigValidationError(format!(
                    "watch.patterns contains an invalid glob '{}': {}",
                    pattern, e
                )));
            }
        }
        if self.watch.stability_poll_ms == 0 {
            return Err(PipelineError::ConfigValidationError(
                "watch.stability_poll_ms must be greater than 0".to_string(),
            ));
        }
        if self.watch.stability_timeout_secs == 0 {
            return Err(PipelineError::ConfigValidationError(
                "watch.stability_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.cleanup.retention_days == 0 {
            return Err(PipelineError::ConfigValidationError(
                "cleanup.retention_days must be at least 1".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "llm.model must not be empty".to_string(),
            ));
        }
        let url = self.llm.ollama_url.to_ascii_lowercase();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PipelineError::ConfigValidationError(format!(
                "llm.ollama_url must use http or https, got '{}'",
                self.llm.ollama_url
            )));
        }
        if self.ocr.command.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "ocr.command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies `PAPERTRAIL_*` overrides on top of the file values.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "SOURCE" => self.paths.source = PathBuf::from(value),
                "BASE" => self.paths.base = PathBuf::from(value),
                "RETENTION_DAYS" => {
                    self.cleanup.retention_days = value.parse().map_err(|e| {
                        PipelineError::ConfigError(format!(
                            "Invalid {}RETENTION_DAYS '{}': {}",
                            ENV_PREFIX, value, e
                        ))
                    })?
                }
                "LLM_PROVIDER" => self.llm.provider = value.parse()?,
                "LLM_MODEL" => self.llm.model = value,
                "OLLAMA_URL" => self.llm.ollama_url = value,
                "METRICS_PORT" => {
                    self.metrics.port = Some(value.parse().map_err(|e| {
                        PipelineError::ConfigError(format!(
                            "Invalid {}METRICS_PORT '{}': {}",
                            ENV_PREFIX, value, e
                        ))
                    })?)
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn expand_paths(&mut self) {
        self.paths.source = expand_tilde(&self.paths.source);
        self.paths.base = expand_tilde(&self.paths.base);
        if let Some(dir) = &self.logging.log_dir {
            self.logging.log_dir = Some(expand_tilde(dir));
        }
    }

    /// Creates the archive root and its holding directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.paths.base.clone(),
            self.paths.pending(),
            self.paths.trash(),
            self.paths.quarantine(),
        ] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

pub fn default_config_path() -> PathBuf {
    expand_tilde(Path::new("~/.config/papertrail/config.yaml"))
}

/// Loads settings from YAML (falling back to defaults when the default file is
/// absent), applies environment overrides and validates the result.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    load_settings_with_env(config_path, std::env::vars())
}

pub fn load_settings_with_env<I>(config_path: Option<&Path>, vars: I) -> Result<Settings>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut settings = match config_path {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                read_settings_file(&default_path)?
            } else {
                Settings::default()
            }
        }
    };

    settings.apply_env_overrides(vars)?;
    settings.expand_paths();
    settings.validate()?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    serde_yaml::from_str(&content).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to parse config YAML from '{}': {}",
            path.display(),
            e
        ))
    })
}
