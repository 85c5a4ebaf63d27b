//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Study and break phase lengths
//! - Timer tick period
//! - The study-session backend (REST API) location
//! - Notification preferences
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::PhaseDurations;

/// Longest allowed study or break phase: one day.
const MAX_PHASE_SECS: u64 = 24 * 60 * 60;

/// Timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_study_secs")]
    pub study_secs: u64,
    #[serde(default = "default_break_secs")]
    pub break_secs: u64,
    /// How often the display is recomputed while running.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Study-session backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// When false, completed sessions go to the local database only.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ring the terminal bell along with the message.
    #[serde(default = "default_true")]
    pub sound: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_study_secs() -> u64 {
    PhaseDurations::DEFAULT_STUDY_SECS
}
fn default_break_secs() -> u64 {
    PhaseDurations::DEFAULT_BREAK_SECS
}
fn default_tick_interval_ms() -> u64 {
    100
}
fn default_base_url() -> String {
    "http://localhost:5000/api".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            study_secs: default_study_secs(),
            break_secs: default_break_secs(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err("config key is empty".into());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(value.parse::<bool>()?),
                    serde_json::Value::Number(_) => {
                        let n = value.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                            key: key.to_string(),
                            message: format!("cannot parse '{value}' as a whole number"),
                        })?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value)?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()).into())
    }

    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory. The key must already exist and the new value
    /// must parse as the existing value's type and pass validation.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.apply(key, value)?;
        self.save()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("timer.study_secs", self.timer.study_secs),
            ("timer.break_secs", self.timer.break_secs),
            ("timer.tick_interval_ms", self.timer.tick_interval_ms),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        for (key, value) in &positive[..2] {
            if *value > MAX_PHASE_SECS {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("must be at most {MAX_PHASE_SECS} seconds"),
                });
            }
        }

        url::Url::parse(&self.api.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "api.base_url".to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    pub fn phase_durations(&self) -> PhaseDurations {
        PhaseDurations {
            study_secs: self.timer.study_secs,
            break_secs: self.timer.break_secs,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.timer.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.study_secs, 1500);
        assert!(!parsed.api.enabled);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timer]\nstudy_secs = 3000\n").unwrap();
        assert_eq!(parsed.timer.study_secs, 3000);
        assert_eq!(parsed.timer.break_secs, 300);
        assert_eq!(parsed.timer.tick_interval_ms, 100);
        assert!(parsed.notifications.enabled);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.study_secs").as_deref(), Some("1500"));
        assert_eq!(cfg.get("api.enabled").as_deref(), Some("false"));
        assert_eq!(
            cfg.get("api.base_url").as_deref(),
            Some("http://localhost:5000/api")
        );
        assert!(cfg.get("timer.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("timer.break_secs", "600").unwrap();
        cfg.apply("api.enabled", "true").unwrap();
        cfg.apply("api.base_url", "https://planner.example/api").unwrap();
        assert_eq!(cfg.timer.break_secs, 600);
        assert!(cfg.api.enabled);
        assert_eq!(cfg.api.base_url, "https://planner.example/api");
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(cfg.apply("timer.nonexistent_key", "1").is_err());
        assert!(cfg.apply("nope", "1").is_err());
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("notifications.sound", "loud").is_err());
        assert!(cfg.apply("timer.study_secs", "-5").is_err());
        assert!(cfg.apply("timer.study_secs", "ten").is_err());
        assert_eq!(cfg.timer.study_secs, 1500);
    }

    #[test]
    fn apply_rejects_values_failing_validation() {
        let mut cfg = Config::default();
        assert!(cfg.apply("timer.study_secs", "0").is_err());
        assert!(cfg.apply("api.base_url", "not a url").is_err());
        assert_eq!(cfg.timer.study_secs, 1500);
        assert_eq!(cfg.api.base_url, "http://localhost:5000/api");
    }

    #[test]
    fn load_from_missing_path_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.timer.study_secs, 1500);
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timer]\nstudy_secs = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn apply_rejects_phase_longer_than_a_day() {
        let mut cfg = Config::default();
        assert!(cfg.apply("timer.study_secs", "86401").is_err());
        assert!(cfg.apply("timer.break_secs", "999999999999").is_err());
        cfg.apply("timer.study_secs", "86400").unwrap();
        assert_eq!(cfg.timer.study_secs, 86_400);
    }

    #[test]
    fn load_from_unreadable_path_keeps_it() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be: reading fails, but not with NotFound.
        let path = dir.path().join("config.toml");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
        assert!(path.is_dir());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn load_from_invalid_utf8_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(Config::load_from(&path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xff, 0xfe, 0x00]);
    }

    #[test]
    fn save_to_then_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.apply("timer.study_secs", "3000").unwrap();
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.phase_durations().study_secs, 3000);
        assert_eq!(loaded.tick_interval(), Duration::from_millis(100));
    }
}
