// src/config.rs

pub mod cli;
pub mod settings;

pub use cli::{Args, Command};
pub use settings::{
    load_settings, load_settings_with_env, CleanupConfig, LlmConfig, LlmProvider, PathsConfig,
    Settings, WatchConfig,
};
