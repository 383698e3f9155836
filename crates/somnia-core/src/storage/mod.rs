mod config;
pub mod database;
mod memory;

pub use config::{Config, LogConfig, NotificationsConfig, WatchConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};

/// Durable string key/value storage that survives restarts.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Returns the data directory, creating it if needed.
///
/// `SOMNIA_DATA_DIR` overrides the location. Otherwise it is
/// `~/.config/somnia`, or `~/.config/somnia-dev` when `SOMNIA_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("SOMNIA_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("SOMNIA_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("somnia-dev")
            } else {
                base_dir.join("somnia")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
