//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::AppConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the user-level config inside the user directory.
pub const USER_CONFIG_FILE: &str = "config.yaml";

/// Project-level config file, relative to the working directory.
pub const PROJECT_CONFIG_FILE: &str = "focus-tasks.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Embedded defaults (lowest priority)
    Defaults = 0,
    /// User-level config (~/.focus-tasks/config.yaml)
    User = 1,
    /// Project-level config (./focus-tasks.yaml)
    Project = 2,
    /// Explicit file from --config or FOCUS_TASKS_CONFIG_PATH
    Explicit = 3,
    /// Environment variables
    Environment = 4,
    /// Command line flags (highest priority)
    CommandLine = 5,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::Explicit => write!(f, "explicit"),
            ConfigTier::Environment => write!(f, "environment"),
            ConfigTier::CommandLine => write!(f, "command line"),
        }
    }
}

/// Paths for each file tier.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
    /// Project-level config file
    pub project_file: Option<PathBuf>,
    /// Explicit config file; must exist when set
    pub explicit_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    ///
    /// `explicit` (the `--config` flag) wins over `FOCUS_TASKS_CONFIG_PATH`.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        // User dir: FOCUS_TASKS_USER_DIR or ~/.focus-tasks
        let user_dir = std::env::var("FOCUS_TASKS_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".focus-tasks")));

        let explicit_file = explicit.or_else(|| {
            std::env::var("FOCUS_TASKS_CONFIG_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
        });

        Self {
            user_dir,
            project_file: Some(PathBuf::from(PROJECT_CONFIG_FILE)),
            explicit_file,
        }
    }

    /// Create paths with explicit locations (no environment lookup).
    pub fn with_dirs(user_dir: Option<PathBuf>, project_file: Option<PathBuf>) -> Self {
        Self {
            user_dir,
            project_file,
            explicit_file: None,
        }
    }

    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Path of the user-level config file.
    pub fn user_file(&self) -> Option<PathBuf> {
        self.user_dir.as_ref().map(|d| d.join(USER_CONFIG_FILE))
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: AppConfig,
    /// Files that contributed, in merge order
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover(explicit))
    }

    /// Load configuration with explicit paths, then apply environment overrides.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        let mut loader = Self::load_files(paths)?;
        Self::apply_env_overrides(&mut loader.config);
        Ok(loader)
    }

    /// Load and merge the file tiers only.
    pub fn load_files(paths: ConfigPaths) -> Result<Self> {
        let mut configs: Vec<Value> = Vec::new();
        let mut sources = Vec::new();

        // Tier 1: Defaults (embedded)
        configs.push(serde_json::to_value(AppConfig::default())?);

        // Tier 2: User config
        if let Some(user_file) = paths.user_file()
            && let Some(value) = read_optional_tier(ConfigTier::User, &user_file)
        {
            configs.push(value);
            sources.push((ConfigTier::User, user_file));
        }

        // Tier 3: Project config
        if let Some(project_file) = &paths.project_file
            && let Some(value) = read_optional_tier(ConfigTier::Project, project_file)
        {
            configs.push(value);
            sources.push((ConfigTier::Project, project_file.clone()));
        }

        // Tier 4: Explicit file; unlike the others it must be readable
        if let Some(explicit) = &paths.explicit_file {
            configs.push(read_explicit(explicit)?);
            sources.push((ConfigTier::Explicit, explicit.clone()));
        }

        let merged = deep_merge_all(configs);
        let config: AppConfig =
            serde_json::from_value(merged).context("Invalid configuration values")?;

        debug!(files = sources.len(), "Configuration loaded");
        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Apply environment variable overrides to config.
    pub fn apply_env_overrides(config: &mut AppConfig) {
        if let Ok(db_path) = std::env::var("FOCUS_TASKS_DB_PATH")
            && !db_path.trim().is_empty()
        {
            config.database = PathBuf::from(db_path);
        }
    }

    /// Apply the `--database` flag.
    pub fn with_database(mut self, database: Option<PathBuf>) -> Self {
        if let Some(database) = database {
            self.config.database = database;
        }
        self
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// Files that contributed to the configuration, lowest tier first.
    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

/// Read a tier file that may be absent. A file that cannot be read or
/// parsed is skipped with a warning.
fn read_optional_tier(tier: ConfigTier, path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(%tier, path = %path.display(), error = %e, "Skipping unreadable config file");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%tier, path = %path.display(), error = %e, "Skipping invalid config file");
            None
        }
    }
}

fn read_explicit(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_yaml::from_str::<Value>(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}
