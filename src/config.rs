//! Configuration management for notesync.
//!
//! This module handles loading and saving client configuration to/from
//! a JSON file. The config directory can be customized.
//!
//! Besides connection settings the file doubles as session storage: the
//! bearer token obtained at login is persisted here and handed to the
//! gateway once, at construction.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NoteError, NoteResult};

fn default_api_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_search_debounce_ms() -> u64 {
    300
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigData {
    /// Base URL of the note store API (without trailing slash)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout for gateway calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Quiescence window for the search box
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    /// Bearer token from the last login (None when logged out)
    #[serde(default)]
    pub session_token: Option<String>,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            search_debounce_ms: default_search_debounce_ms(),
            session_token: None,
        }
    }
}

/// Configuration manager
pub struct Config {
    config_dir: PathBuf,
    config_file: PathBuf,
    data: ConfigData,
}

impl Config {
    /// Create a new configuration manager
    ///
    /// Without the `desktop` feature, `config_dir` is required.
    pub fn new(config_dir: Option<PathBuf>) -> NoteResult<Self> {
        let config_dir = match config_dir {
            Some(dir) => dir,
            None => {
                #[cfg(feature = "desktop")]
                {
                    dirs::config_dir()
                        .unwrap_or_else(|| PathBuf::from("."))
                        .join("notesync")
                }
                #[cfg(not(feature = "desktop"))]
                {
                    return Err(NoteError::Config(
                        "config_dir is required without the desktop feature".to_string(),
                    ));
                }
            }
        };

        fs::create_dir_all(&config_dir)?;
        let config_file = config_dir.join("config.json");

        let data = if config_file.exists() {
            match fs::read_to_string(&config_file) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    tracing::warn!("Ignoring unreadable config {}: {}", config_file.display(), e);
                    ConfigData::default()
                }),
                Err(_) => ConfigData::default(),
            }
        } else {
            ConfigData::default()
        };

        let config = Self {
            config_dir,
            config_file,
            data,
        };

        // Save default config if it doesn't exist
        if !config.config_file.exists() {
            config.save()?;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> NoteResult<()> {
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.config_file, content)?;
        Ok(())
    }

    /// Get the configuration directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn api_base_url(&self) -> &str {
        &self.data.api_base_url
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.data.request_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.data.search_debounce_ms)
    }

    /// Get the stored session token, if logged in
    pub fn session_token(&self) -> Option<&str> {
        self.data.session_token.as_deref()
    }

    /// Store the session token after a successful login
    pub fn set_session_token(&mut self, token: &str) -> NoteResult<()> {
        self.data.session_token = Some(token.to_string());
        self.save()
    }

    /// Forget the session token (logout)
    pub fn clear_session_token(&mut self) -> NoteResult<()> {
        self.data.session_token = None;
        self.save()
    }

    /// Get a configuration value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "api_base_url" => Some(self.data.api_base_url.clone()),
            "request_timeout_secs" => Some(self.data.request_timeout_secs.to_string()),
            "search_debounce_ms" => Some(self.data.search_debounce_ms.to_string()),
            "session_token" => self.data.session_token.clone(),
            _ => None,
        }
    }

    /// Set a configuration value
    pub fn set(&mut self, key: &str, value: &str) -> NoteResult<()> {
        match key {
            "api_base_url" => {
                self.data.api_base_url = value.trim_end_matches('/').to_string();
            }
            "request_timeout_secs" => {
                self.data.request_timeout_secs = parse_number(key, value)?;
            }
            "search_debounce_ms" => {
                self.data.search_debounce_ms = parse_number(key, value)?;
            }
            "session_token" => self.data.session_token = Some(value.to_string()),
            _ => return Err(NoteError::Config(format!("Unknown config key: {}", key))),
        }
        self.save()
    }
}

fn parse_number(key: &str, value: &str) -> NoteResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| NoteError::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}
