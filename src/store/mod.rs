//! Key-value persistence for the task, settings and filter documents.
//!
//! The core never touches a concrete backend: [`crate::app::AppState`] is
//! handed an `Arc<dyn KeyValueStore>` at startup.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Key holding the serialized task list.
pub const TASKS_KEY: &str = "focus-tasks.tasks";
/// Key holding the serialized [`crate::types::Settings`].
pub const SETTINGS_KEY: &str = "focus-tasks.settings";
/// Key holding the serialized [`crate::types::FilterState`].
pub const FILTERS_KEY: &str = "focus-tasks.filters";

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite failure.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure while preparing the database location.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// String key-value storage, the equivalent of browser local storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
