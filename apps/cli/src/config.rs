//! CLI configuration loading and merging.
//!
//! Configuration precedence:
//! 1. CLI arguments (applied by each command)
//! 2. Environment variables
//! 3. Config file (`--config`, `./.tuneline.toml`, `../.tuneline.toml`, `~/.tuneline/config.toml`)
//! 4. Defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tuneline_models::{DEFAULT_DATASET_URL, DEFAULT_OPENAI_BASE_URL, DEFAULT_REPORT_URL};
use tuneline_training::{DEFAULT_BASE_MODEL, DEFAULT_CONCURRENCY, DEFAULT_POLL_INTERVAL};

pub const LOCAL_CONFIG_FILE: &str = ".tuneline.toml";

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_REPORT_API_KEY: &str = "API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "TUNELINE_OPENAI_BASE_URL";
pub const ENV_REPORT_URL: &str = "TUNELINE_REPORT_URL";
pub const ENV_DATASET_URL: &str = "TUNELINE_DATASET_URL";
pub const ENV_BASE_MODEL: &str = "TUNELINE_BASE_MODEL";
pub const ENV_MODEL: &str = "TUNELINE_MODEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Read(String),

    #[error("Failed to parse configuration file: {0}")]
    Parse(String),

    /// A credential the command needs is set nowhere.
    #[error("missing credential: set {env} or `{key}` in .tuneline.toml")]
    MissingCredential { env: &'static str, key: &'static str },
}

/// The TOML dotfile as written by the user. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub report_api_key: Option<String>,
    #[serde(default)]
    pub openai_base_url: Option<String>,
    #[serde(default)]
    pub report_url: Option<String>,
    #[serde(default)]
    pub dataset_url: Option<String>,
    #[serde(default)]
    pub base_model: Option<String>,
    /// Fine-tuned model used by `report` when no run has recorded one.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub workspace: Option<PathBuf>,
}

impl FileConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Candidate dotfiles, nearest first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE), Path::new("..").join(LOCAL_CONFIG_FILE)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".tuneline").join("config.toml"));
        }
        paths
    }

    /// Loads `explicit` if given, otherwise the first dotfile that exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::load_from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Settings shared by every command, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub openai_api_key: Option<String>,
    pub report_api_key: Option<String>,
    pub openai_base_url: String,
    pub report_url: String,
    pub dataset_url: String,
    pub base_model: String,
    pub model: Option<String>,
    pub poll_interval: Duration,
    pub concurrency: usize,
    pub workspace_root: PathBuf,
}

impl AppConfig {
    /// Layers `env` over `file` over defaults.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |name: &str, from_file: Option<String>| env(name).filter(|v| !v.is_empty()).or(from_file);

        Self {
            openai_api_key: pick(ENV_OPENAI_API_KEY, file.openai_api_key),
            report_api_key: pick(ENV_REPORT_API_KEY, file.report_api_key),
            openai_base_url: pick(ENV_OPENAI_BASE_URL, file.openai_base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            report_url: pick(ENV_REPORT_URL, file.report_url).unwrap_or_else(|| DEFAULT_REPORT_URL.to_string()),
            dataset_url: pick(ENV_DATASET_URL, file.dataset_url).unwrap_or_else(|| DEFAULT_DATASET_URL.to_string()),
            base_model: pick(ENV_BASE_MODEL, file.base_model).unwrap_or_else(|| DEFAULT_BASE_MODEL.to_string()),
            model: pick(ENV_MODEL, file.model),
            poll_interval: file.poll_interval_secs.map_or(DEFAULT_POLL_INTERVAL, Duration::from_secs),
            concurrency: file.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            workspace_root: file.workspace.unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Reads the dotfile and the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = FileConfig::discover(explicit)?;
        Ok(Self::resolve(file, |name| std::env::var(name).ok()))
    }

    #[must_use]
    pub fn with_workspace(mut self, workspace: Option<PathBuf>) -> Self {
        if let Some(root) = workspace {
            self.workspace_root = root;
        }
        self
    }

    pub fn openai_api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential { env: ENV_OPENAI_API_KEY, key: "openai_api_key" })
    }

    pub fn report_api_key(&self) -> Result<&str, ConfigError> {
        self.report_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential { env: ENV_REPORT_API_KEY, key: "report_api_key" })
    }
}
