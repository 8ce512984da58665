//! # Daemon Configuration
//!
//! Loaded in three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. JSON file named by `HALD_CONFIG`
//! 3. Environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HALD_SYSFS_PATH` | `hotplug.sysfs_root` |
//! | `HALD_DEVICE_ROOT` | `hotplug.device_root` |
//! | `HALD_HELPER_DIR` | `hotplug.helper_dir` |
//! | `HALD_HELPER_TIMEOUT_MS` | `hotplug.helper_timeout_ms` |
//! | `HALD_LOG_LEVEL` | `logging.level` |
//! | `HALD_JSON_LOGS` | `logging.json` |

use hal_hotplug::{ConfigError, HotplugConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const CONFIG_FILE_VAR: &str = "HALD_CONFIG";

#[derive(Debug, Error)]
pub enum RuntimeConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete daemon configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub hotplug: HotplugConfig,
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, RuntimeConfigError> {
        Self::load_from(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RuntimeConfigError> {
        let mut config = match lookup(CONFIG_FILE_VAR) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Some(path) = lookup("HALD_SYSFS_PATH") {
            config.hotplug.sysfs_root = PathBuf::from(path);
        }
        if let Some(path) = lookup("HALD_DEVICE_ROOT") {
            config.hotplug.device_root = PathBuf::from(path);
        }
        if let Some(path) = lookup("HALD_HELPER_DIR") {
            config.hotplug.helper_dir = PathBuf::from(path);
        }
        if let Some(value) = lookup("HALD_HELPER_TIMEOUT_MS") {
            let Ok(timeout_ms) = value.trim().parse() else {
                return Err(RuntimeConfigError::InvalidEnv {
                    var: "HALD_HELPER_TIMEOUT_MS",
                    value,
                });
            };
            config.hotplug.helper_timeout_ms = timeout_ms;
        }
        if let Some(level) = lookup("HALD_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(value) = lookup("HALD_JSON_LOGS") {
            config.logging.json = parse_flag(&value).ok_or(RuntimeConfigError::InvalidEnv {
                var: "HALD_JSON_LOGS",
                value,
            })?;
        }

        config.hotplug.validate()?;
        Ok(config)
    }

    fn from_file(path: PathBuf) -> Result<Self, RuntimeConfigError> {
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(source) => return Err(RuntimeConfigError::Read { path, source }),
        };
        serde_json::from_str(&contents).map_err(|source| RuntimeConfigError::Parse { path, source })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = RuntimeConfig::load_from(env(&[])).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.hotplug.sysfs_root, PathBuf::from("/sys"));
    }

    #[test]
    fn test_environment_overrides() {
        let config = RuntimeConfig::load_from(env(&[
            ("HALD_SYSFS_PATH", "/tmp/sys"),
            ("HALD_DEVICE_ROOT", "/tmp/dev"),
            ("HALD_HELPER_DIR", "/opt/hal/libexec"),
            ("HALD_HELPER_TIMEOUT_MS", "2500"),
            ("HALD_LOG_LEVEL", "debug"),
            ("HALD_JSON_LOGS", "true"),
        ]))
        .unwrap();

        assert_eq!(config.hotplug.sysfs_root, PathBuf::from("/tmp/sys"));
        assert_eq!(config.hotplug.device_root, PathBuf::from("/tmp/dev"));
        assert_eq!(config.hotplug.helper_dir, PathBuf::from("/opt/hal/libexec"));
        assert_eq!(config.hotplug.helper_timeout(), Duration::from_millis(2500));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hald.json");
        std::fs::write(
            &path,
            r#"{"hotplug": {"sysfs_root": "/srv/sys", "helper_timeout_ms": 500}, "logging": {"json": true}}"#,
        )
        .unwrap();

        let path_str = path.to_string_lossy().into_owned();
        let config = RuntimeConfig::load_from(env(&[
            (CONFIG_FILE_VAR, path_str.as_str()),
            ("HALD_HELPER_TIMEOUT_MS", "750"),
        ]))
        .unwrap();

        assert_eq!(config.hotplug.sysfs_root, PathBuf::from("/srv/sys"));
        assert_eq!(config.hotplug.helper_timeout_ms, 750);
        assert_eq!(config.hotplug.device_root, PathBuf::from("/dev"));
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = RuntimeConfig::load_from(env(&[("HALD_HELPER_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(
            err,
            RuntimeConfigError::InvalidEnv { var: "HALD_HELPER_TIMEOUT_MS", .. }
        ));

        let err = RuntimeConfig::load_from(env(&[("HALD_HELPER_TIMEOUT_MS", "0")])).unwrap_err();
        assert!(matches!(
            err,
            RuntimeConfigError::Invalid(ConfigError::ZeroHelperTimeout)
        ));

        let err = RuntimeConfig::load_from(env(&[("HALD_SYSFS_PATH", "sys")])).unwrap_err();
        assert!(matches!(
            err,
            RuntimeConfigError::Invalid(ConfigError::RelativeSysfsRoot(_))
        ));

        let err = RuntimeConfig::load_from(env(&[("HALD_JSON_LOGS", "maybe")])).unwrap_err();
        assert!(matches!(err, RuntimeConfigError::InvalidEnv { var: "HALD_JSON_LOGS", .. }));
    }

    #[test]
    fn test_missing_or_broken_file() {
        let err = RuntimeConfig::load_from(env(&[(CONFIG_FILE_VAR, "/nonexistent/hald.json")]))
            .unwrap_err();
        assert!(matches!(err, RuntimeConfigError::Read { .. }));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hald.json");
        std::fs::write(&path, "{ not json").unwrap();
        let path_str = path.to_string_lossy().into_owned();
        let err = RuntimeConfig::load_from(env(&[(CONFIG_FILE_VAR, path_str.as_str())])).unwrap_err();
        assert!(matches!(err, RuntimeConfigError::Parse { .. }));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("On"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
