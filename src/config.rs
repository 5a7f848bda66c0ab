use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::plan::WorkoutKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub primary_inactivity_ceiling_secs: u64,
    pub final_inactivity_ceiling_secs: u64,
    pub rest_interval_secs: u64,
    pub rest_warning_secs: u64,
    pub go_banner_ms: u64,
    pub user_id: Option<String>,
    pub default_workout: WorkoutKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_inactivity_ceiling_secs: 30 * 60,
            final_inactivity_ceiling_secs: 30 * 60,
            rest_interval_secs: 120,
            rest_warning_secs: 10,
            go_banner_ms: 2000,
            user_id: Some("local".to_string()),
            default_workout: WorkoutKind::BasicUpperBody,
        }
    }
}

impl Config {
    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            primary_inactivity_ms: self.primary_inactivity_ceiling_secs.saturating_mul(1000),
            final_inactivity_ms: self.final_inactivity_ceiling_secs.saturating_mul(1000),
            rest_interval_ms: self.rest_interval_secs.saturating_mul(1000),
            rest_warning_ms: self.rest_warning_secs.saturating_mul(1000),
            go_banner_ms: self.go_banner_ms,
        }
    }
}

/// Durations handed to the timers, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub primary_inactivity_ms: u64,
    pub final_inactivity_ms: u64,
    pub rest_interval_ms: u64,
    pub rest_warning_ms: u64,
    pub go_banner_ms: u64,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Config::default().timings()
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path =
            AppDirs::config_path().unwrap_or_else(|| PathBuf::from("setpace_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!("Ignoring unreadable config {:?}: {}", self.path, e),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            primary_inactivity_ceiling_secs: 60,
            final_inactivity_ceiling_secs: 90,
            rest_interval_secs: 45,
            rest_warning_secs: 5,
            go_banner_ms: 500,
            user_id: None,
            default_workout: WorkoutKind::BasicLowerBody,
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn huge_second_values_saturate() {
        let cfg = Config {
            rest_interval_secs: u64::MAX,
            primary_inactivity_ceiling_secs: u64::MAX / 2,
            ..Config::default()
        };

        let timings = cfg.timings();

        assert_eq!(timings.rest_interval_ms, u64::MAX);
        assert_eq!(timings.primary_inactivity_ms, u64::MAX);
        assert_eq!(timings.final_inactivity_ms, 30 * 60 * 1000);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"rest_interval_secs": 90}"#).unwrap();

        let loaded = FileConfigStore::with_path(&path).load();

        assert_eq!(loaded.rest_interval_secs, 90);
        assert_eq!(loaded.primary_inactivity_ceiling_secs, 1800);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"]]").unwrap();

        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn timings_are_in_milliseconds() {
        let timings = Config::default().timings();
        assert_eq!(timings.rest_interval_ms, 120_000);
        assert_eq!(timings.rest_warning_ms, 10_000);
        assert_eq!(timings.primary_inactivity_ms, 1_800_000);
        assert_eq!(timings.final_inactivity_ms, 1_800_000);
        assert_eq!(timings.go_banner_ms, 2_000);
    }
}
