#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    use papertrail::config::{load_settings_with_env, LlmProvider};
    use papertrail::error::PipelineError;

    fn create_temp_config_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "{}", content).expect("Failed to write to temp file");
        temp_file
    }

    #[test]
    fn test_load_full_config() {
        let yaml_content = r#"
paths:
  source: /scans/inbox
  base: /docs/archive
watch:
  patterns: ["*.pdf"]
  stability_poll_ms: 250
  stability_timeout_secs: 10
cleanup:
  retention_days: 14
llm:
  provider: ollama
  model: llama3
  ollama_url: http://gpu-box:11434
  timeout_secs: 60
ocr:
  command: /opt/bin/ocrmypdf
metrics:
  port: 9100
logging:
  log_dir: /var/log/papertrail
"#;
        let temp_file = create_temp_config_file(yaml_content);
        let settings = load_settings_with_env(Some(temp_file.path()), Vec::new()).unwrap();

        assert_eq!(settings.paths.pending(), PathBuf::from("/docs/archive/.pending"));
        assert_eq!(settings.watch.patterns, vec!["*.pdf".to_string()]);
        assert_eq!(settings.watch.poll_interval().as_millis(), 250);
        assert_eq!(settings.cleanup.retention_days, 14);
        assert_eq!(settings.llm.provider, LlmProvider::Ollama);
        assert_eq!(settings.llm.ollama_url, "http://gpu-box:11434");
        assert_eq!(settings.ocr.command, "/opt/bin/ocrmypdf");
        assert_eq!(settings.metrics.port, Some(9100));
        assert_eq!(
            settings.logging.log_dir,
            Some(PathBuf::from("/var/log/papertrail"))
        );
    }

    #[test]
    fn test_empty_file_means_defaults() {
        let temp_file = create_temp_config_file("");
        let settings = load_settings_with_env(Some(temp_file.path()), Vec::new()).unwrap();
        assert_eq!(settings.cleanup.retention_days, 30);
        assert_eq!(settings.llm.model, "gemma3:4b");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let temp_file = create_temp_config_file("llm:\n  provider: gpt\n");
        let result = load_settings_with_env(Some(temp_file.path()), Vec::new());
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_env_metrics_port_override() {
        let temp_file = create_temp_config_file("");
        let env = vec![("PAPERTRAIL_METRICS_PORT".to_string(), "9200".to_string())];
        let settings = load_settings_with_env(Some(temp_file.path()), env).unwrap();
        assert_eq!(settings.metrics.port, Some(9200));

        let bad = vec![("PAPERTRAIL_METRICS_PORT".to_string(), "abc".to_string())];
        let result = load_settings_with_env(Some(temp_file.path()), bad);
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }
}
