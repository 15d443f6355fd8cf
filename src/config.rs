//! Startup configuration: `auth.json` plus environment overrides.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chat_api::{ChatApiConfig, ResendPolicy, DEFAULT_BASE_URL};
use chat_session::{guest_username, unix_now, SessionSettings};
use history_store::DEFAULT_CAPACITY;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "auth.json";
pub const API_KEY_ENV: &str = "CHATLINE_API_KEY";
pub const MODEL_ENV: &str = "CHATLINE_MODEL";
pub const PROXY_ENV: &str = "HTTP_PROXY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} is not configured")]
    Missing { field: &'static str },

    #[error("capacity must be at least 1")]
    InvalidCapacity,
}

/// Raw file content; every key is optional at this level.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    api_key: Option<String>,
    model: Option<String>,
    username: Option<String>,
    capacity: Option<usize>,
    proxy: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_resends: Option<u32>,
    stream: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub username: String,
    pub capacity: usize,
    pub proxy: Option<String>,
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub max_resends: u32,
    pub stream: bool,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_json(&text, path)
    }

    /// Parse config text. `path` is only used in error messages.
    pub fn from_json(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::resolve(file)
    }

    fn resolve(file: ConfigFile) -> Result<Self, ConfigError> {
        let api_key = env_string_opt(API_KEY_ENV)
            .or(file.api_key.filter(|value| !value.trim().is_empty()))
            .ok_or(ConfigError::Missing { field: "apiKey" })?;
        let model = env_string_opt(MODEL_ENV)
            .or(file.model.filter(|value| !value.trim().is_empty()))
            .ok_or(ConfigError::Missing {
                field: "gpt model name",
            })?;

        let capacity = file.capacity.unwrap_or(DEFAULT_CAPACITY);
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }

        Ok(Self {
            api_key,
            model,
            username: file
                .username
                .unwrap_or_else(|| guest_username(unix_now())),
            capacity,
            proxy: file.proxy.or_else(|| env_string_opt(PROXY_ENV)),
            base_url: file
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: file.timeout_secs.map(Duration::from_secs),
            max_resends: file
                .max_resends
                .unwrap_or(ResendPolicy::default().max_resends),
            stream: file.stream.unwrap_or(true),
        })
    }

    pub fn api_config(&self) -> ChatApiConfig {
        let mut config = ChatApiConfig::new(&self.api_key).with_base_url(&self.base_url);
        if let Some(proxy) = self.proxy.as_deref().filter(|proxy| !proxy.is_empty()) {
            config = config.with_proxy(proxy);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }

    pub fn session_settings(&self, history_path: impl Into<PathBuf>) -> SessionSettings {
        SessionSettings::new(&self.model, history_path)
            .with_capacity(self.capacity)
            .with_streaming(self.stream)
            .with_resend_policy(ResendPolicy::new(self.max_resends))
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
