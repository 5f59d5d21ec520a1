mod config;
pub mod state;

pub use config::{BellConfig, Config, MeditationConfig, MuteConfig, ScheduleConfig};
pub use state::{FileStore, MemoryStore, ScheduleMode, ScheduleRecord, ScheduleStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/mindbell[-dev]/` based on MINDBELL_ENV.
///
/// Set MINDBELL_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MINDBELL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("mindbell-dev")
    } else {
        base_dir.join("mindbell")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
