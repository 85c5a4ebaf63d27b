mod config;
pub mod database;

pub use config::{ApiConfig, Config, NotificationsConfig, TimerConfig};
pub use database::{Database, Stats};

use std::path::PathBuf;

/// Returns the studyplan data directory, creating it if needed.
///
/// `STUDYPLAN_DATA_DIR` wins when set. Otherwise `~/.config/studyplan`, or
/// `~/.config/studyplan-dev` when `STUDYPLAN_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = match std::env::var_os("STUDYPLAN_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYPLAN_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studyplan-dev")
            } else {
                base_dir.join("studyplan")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
