//! Configuration management for Chatpane.
//!
//! Provides configuration loading from TOML files with support for
//! multiple file locations, an environment variable override, and sensible
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::api::{DEFAULT_CHAT_PATH, DEFAULT_STREAM_PATH};
use crate::message::Mode;
use crate::present::{DEFAULT_COLLAPSE_THRESHOLD, Presenter, ToggleLabels};


/// Text shown in place of a reply when the exchange fails.
pub const DEFAULT_ERROR_MESSAGE: &str = "Sorry, I couldn't connect. Please try again later.";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        /// Path to the configuration file that could not be parsed.
        path: PathBuf,
        /// The underlying TOML parse error.
        source: toml::de::Error,
    },
}

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    /// Response mode used until the user switches it.
    #[serde(default)]
    pub mode: Mode,

    /// Where the chat endpoints live.
    #[serde(default)]
    pub api: ApiConfig,

    /// How replies are presented.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Optional file logging. Absent means stderr only.
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

/// Endpoint configuration (`[api]` section).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the chat service. Defaults to the local development
    /// server when absent.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Path of the streaming endpoint.
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Path of the non-streaming endpoint.
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
}

fn default_stream_path() -> String {
    DEFAULT_STREAM_PATH.to_string()
}

fn default_chat_path() -> String {
    DEFAULT_CHAT_PATH.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            stream_path: default_stream_path(),
            chat_path: default_chat_path(),
        }
    }
}

/// Presentation configuration (`[display]` section).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DisplayConfig {
    /// Replies longer than this many characters start collapsed.
    #[serde(default = "default_collapse_threshold")]
    pub collapse_threshold: usize,

    /// Toggle label while collapsed.
    #[serde(default = "default_show_more_label")]
    pub show_more_label: String,

    /// Toggle label while expanded.
    #[serde(default = "default_show_less_label")]
    pub show_less_label: String,

    /// Message shown when an exchange fails.
    #[serde(default = "default_error_message")]
    pub error_message: String,
}

fn default_collapse_threshold() -> usize {
    DEFAULT_COLLAPSE_THRESHOLD
}

fn default_show_more_label() -> String {
    ToggleLabels::default().show_more
}

fn default_show_less_label() -> String {
    ToggleLabels::default().show_less
}

fn default_error_message() -> String {
    DEFAULT_ERROR_MESSAGE.to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            collapse_threshold: default_collapse_threshold(),
            show_more_label: default_show_more_label(),
            show_less_label: default_show_less_label(),
            error_message: default_error_message(),
        }
    }
}

impl DisplayConfig {
    /// Build a [`Presenter`] from these settings.
    pub fn presenter(&self) -> Presenter {
        Presenter::new()
            .with_collapse_threshold(self.collapse_threshold)
            .with_labels(ToggleLabels {
                show_more: self.show_more_label.clone(),
                show_less: self.show_less_label.clone(),
            })
    }
}

/// Log file rotation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    /// New file every day.
    #[default]
    Daily,
    /// New file every hour.
    Hourly,
    /// Single file.
    Never,
}

/// File logging configuration (`[logging]` section).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Directory for log files.
    #[serde(default = "default_log_directory")]
    pub directory: String,

    /// Rotation policy.
    #[serde(default)]
    pub rotation: Rotation,

    /// Number of rotated files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_max_files() -> usize {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            rotation: Rotation::default(),
            max_files: default_max_files(),
        }
    }
}

impl Config {
    /// Load configuration from the file system.
    ///
    /// Priority order:
    /// 1. `path`, when given (must exist)
    /// 2. CHATPANE_CONFIG environment variable
    /// 3. ./config.toml (local directory)
    /// 4. ~/.config/chatpane/config.toml (user config)
    ///
    /// Returns default config if no config file is found.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if a found file cannot be read.
    /// Returns [`ConfigError::ParseError`] if a found file is not valid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // 1. Explicit path
        if let Some(path) = path {
            return Self::load_from(path);
        }

        // 2. Environment variable
        if let Ok(path) = std::env::var("CHATPANE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                return Self::load_from(p);
            }
        }

        // 3. Local directory
        let local = PathBuf::from("config.toml");
        if local.exists() {
            return Self::load_from(local);
        }

        // 4. User config directory (~/.config/chatpane/)
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config/chatpane/config.toml");
            if user_config.exists() {
                return Self::load_from(user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read.
    /// Returns [`ConfigError::ParseError`] if the file is not valid TOML.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }
}
