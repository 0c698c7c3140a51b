//! Configuration.
//!
//! Merges configuration from several tiers, field by field:
//! 1. **Defaults** - compiled in
//! 2. **User** - `~/.focus-tasks/config.yaml`
//! 3. **Project** - `./focus-tasks.yaml`
//! 4. **Explicit** - `--config <file>` or `FOCUS_TASKS_CONFIG_PATH`
//! 5. **Environment** - `FOCUS_TASKS_DB_PATH`
//! 6. **Command line** - `--database`
//!
//! ## Environment Variables
//! - `FOCUS_TASKS_CONFIG_PATH` - Explicit config file
//! - `FOCUS_TASKS_DB_PATH` - Database path
//! - `FOCUS_TASKS_USER_DIR` - User config dir (default: `~/.focus-tasks`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier, PROJECT_CONFIG_FILE, USER_CONFIG_FILE};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
