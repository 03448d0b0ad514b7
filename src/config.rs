//! TOML configuration for the `doit` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::notify::scheduler::AlarmSounds;
use crate::store::TASKS_KEY;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file holding tasks and pending alarms (None = OS data dir).
    pub db_path: Option<PathBuf>,
    /// Key the task list is saved under.
    pub tasks_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            tasks_key: TASKS_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub start_sound: Option<String>,
    pub deadline_sound: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        let sounds = AlarmSounds::default();
        Self {
            start_sound: sounds.start,
            deadline_sound: sounds.deadline,
        }
    }
}

impl NotificationConfig {
    pub fn sounds(&self) -> AlarmSounds {
        AlarmSounds {
            start: self.start_sound.clone(),
            deadline: self.deadline_sound.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Load the default config file, falling back to defaults when absent.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("doit").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.storage.tasks_key, "tasksKey");
        assert_eq!(cfg.storage.db_path, None);
        assert_eq!(cfg.notifications.sounds(), AlarmSounds::default());
        assert_eq!(cfg.log.filter, "warn");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[storage]
db_path = "/tmp/doit.sqlite"

[notifications]
deadline_sound = "bell.caf"
"#,
        )
        .unwrap();
        assert_eq!(cfg.storage.db_path, Some(PathBuf::from("/tmp/doit.sqlite")));
        assert_eq!(cfg.storage.tasks_key, "tasksKey");
        assert_eq!(cfg.notifications.start_sound.as_deref(), Some("start_notif.mp3"));
        assert_eq!(cfg.notifications.deadline_sound.as_deref(), Some("bell.caf"));
        assert_eq!(cfg.log.filter, "warn");
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[log]\nfilter = \"doit=debug\"\n").unwrap();

        let cfg = Config::from_file(&path).unwrap();
        assert_eq!(cfg.log.filter, "doit=debug");
    }

    #[test]
    fn from_file_errors() {
        assert!(Config::from_file(Path::new("/nonexistent/doit/config.toml")).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
