//! Configuration types.
//!
//! Every field has a default, so an empty or partial YAML file is valid.

use crate::monitor::ThrottleMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default Gemini API base URL.
pub const DEFAULT_SUGGESTION_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default model for suggestions.
pub const DEFAULT_SUGGESTION_MODEL: &str = "gemini-2.5-flash";

/// Environment variable holding the suggestion API key by default.
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite document store.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub reminders: ReminderConfig,

    #[serde(default)]
    pub transitions: TransitionConfig,

    #[serde(default)]
    pub suggestions: SuggestionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            notifications: NotificationConfig::default(),
            reminders: ReminderConfig::default(),
            transitions: TransitionConfig::default(),
            suggestions: SuggestionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load a single YAML file. An empty file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Option<AppConfig> = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config.unwrap_or_default())
    }
}

/// `<data dir>/focus-tasks/focus.db`, or `./focus-tasks/focus.db` when the
/// platform has no data directory.
fn default_database() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("focus-tasks")
        .join("focus.db")
}

/// Where notifications go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Print to the terminal (default).
    #[default]
    Terminal,
    /// Run `notifications.command` with title and body appended.
    Command,
    /// Never show anything.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub sink: SinkKind,

    /// Program and leading arguments, e.g. `["notify-send", "-a", "focus-tasks"]`.
    #[serde(default)]
    pub command: Vec<String>,
}

/// Reminder monitor timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default)]
    pub throttle: ThrottleMode,

    /// Seconds between ticks (default: 60).
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Delay before the startup focus check (default: 5).
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Minimum spacing of overdue reminders in cooldown mode (default: 30).
    #[serde(default = "default_overdue_cooldown_mins")]
    pub overdue_cooldown_mins: u64,

    /// Minimum spacing of idle reminders in cooldown mode (default: 60).
    #[serde(default = "default_idle_cooldown_mins")]
    pub idle_cooldown_mins: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottleMode::default(),
            tick_interval_secs: default_tick_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
            overdue_cooldown_mins: default_overdue_cooldown_mins(),
            idle_cooldown_mins: default_idle_cooldown_mins(),
        }
    }
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_startup_delay_secs() -> u64 {
    5
}

fn default_overdue_cooldown_mins() -> u64 {
    30
}

fn default_idle_cooldown_mins() -> u64 {
    60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Reject status changes outside the strict table (default: false).
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SuggestionConfig {
    /// The API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_endpoint() -> String {
    DEFAULT_SUGGESTION_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_SUGGESTION_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}
