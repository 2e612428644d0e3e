//! Configuration loader and validator for the classroom archive service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::download::PipelineOptions;

pub const DEFAULT_CLASSROOM_BASE_URL: &str = "https://classroom.googleapis.com/";
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub google: Google,
    #[serde(default)]
    pub download: Download,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub bind: String,
}

/// Credentials and endpoints of the remote Classroom/Drive services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Google {
    pub access_token: String,
    #[serde(default = "default_classroom_base_url")]
    pub classroom_base_url: String,
    #[serde(default = "default_drive_base_url")]
    pub drive_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub include_archived: bool,
}

/// Archive pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Download {
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for Download {
    fn default() -> Self {
        Self {
            fetch_concurrency: default_fetch_concurrency(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_classroom_base_url() -> String {
    DEFAULT_CLASSROOM_BASE_URL.to_string()
}

fn default_drive_base_url() -> String {
    DEFAULT_DRIVE_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_fetch_concurrency() -> usize {
    1
}

fn default_channel_capacity() -> usize {
    8
}

impl App {
    /// `data_dir` with a leading `~/` expanded against `$HOME`.
    pub fn resolved_data_dir(&self) -> String {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => match std::env::var("HOME") {
                Ok(home) => format!("{}/{}", home.trim_end_matches('/'), rest),
                Err(_) => self.data_dir.clone(),
            },
            None => self.data_dir.clone(),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid("app.bind must be a socket address"))
    }
}

impl Google {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        let dir = self.app.resolved_data_dir();
        if dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(dir)
    }

    /// Location of the sqlite download index; `DATABASE_URL` wins when set.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/index.db", self.app.resolved_data_dir()))
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            fetch_concurrency: self.download.fetch_concurrency,
            channel_capacity: self.download.channel_capacity,
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - `GOOGLE_ACCESS_TOKEN` overrides `google.access_token`.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    if let Ok(token) = std::env::var("GOOGLE_ACCESS_TOKEN") {
        if !token.trim().is_empty() {
            cfg.google.access_token = token;
        }
    }
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    cfg.app.bind_addr()?;

    if cfg.google.access_token.trim().is_empty() {
        return Err(ConfigError::Invalid("google.access_token must be non-empty"));
    }
    if reqwest::Url::parse(&cfg.google.classroom_base_url).is_err() {
        return Err(ConfigError::Invalid("google.classroom_base_url must be a URL"));
    }
    if reqwest::Url::parse(&cfg.google.drive_base_url).is_err() {
        return Err(ConfigError::Invalid("google.drive_base_url must be a URL"));
    }
    if cfg.google.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("google.request_timeout_secs must be > 0"));
    }

    if cfg.download.fetch_concurrency == 0 {
        return Err(ConfigError::Invalid("download.fetch_concurrency must be > 0"));
    }
    if cfg.download.channel_capacity == 0 {
        return Err(ConfigError::Invalid("download.channel_capacity must be > 0"));
    }

    Ok(())
}

/// Example configuration, kept in sync with `config.example.yaml`.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  bind: "127.0.0.1:8080"

google:
  access_token: "YOUR_GOOGLE_OAUTH_ACCESS_TOKEN"
  classroom_base_url: "https://classroom.googleapis.com/"
  drive_base_url: "https://www.googleapis.com/"
  request_timeout_secs: 120
  include_archived: true

download:
  fetch_concurrency: 1
  channel_capacity: 8
"#
}
