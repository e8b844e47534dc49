//! Lifecycle settings
//!
//! Tunables an orchestrator may load from a JSON file. Every field has a
//! default, so an empty object is a valid settings file.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::errors::{GrError, GrResult};
use crate::observability::{Logger, Severity};

/// Settings for the start/stop orchestrator and provisioning defaults
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LifecycleSettings {
    /// How long a bootstrap waits for super_read_only to clear (default: 900)
    #[serde(default = "default_read_only_timeout")]
    pub read_only_timeout_seconds: u32,

    /// Time between read-only polls (default: 1000)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Host used for the recovery account when none is given (default: "%")
    #[serde(default = "default_recovery_host")]
    pub recovery_user_host: String,

    /// Lowest severity written to the log (default: INFO)
    #[serde(default = "default_log_level")]
    pub log_level: Severity,
}

fn default_read_only_timeout() -> u32 {
    900
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_recovery_host() -> String {
    "%".to_string()
}

fn default_log_level() -> Severity {
    Severity::Info
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            read_only_timeout_seconds: default_read_only_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            recovery_user_host: default_recovery_host(),
            log_level: default_log_level(),
        }
    }
}

impl LifecycleSettings {
    /// Parse and validate settings from JSON text
    pub fn from_json(text: &str) -> GrResult<Self> {
        let settings: LifecycleSettings = serde_json::from_str(text)
            .map_err(|e| GrError::validation(format!("invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> GrResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| GrError::FileAccess {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> GrResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(GrError::validation("poll_interval_ms must be greater than 0"));
        }
        if self.recovery_user_host.is_empty() {
            return Err(GrError::validation("recovery_user_host must not be empty"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Make `log_level` the process-wide log threshold
    pub fn install_log_level(&self) {
        Logger::set_min_severity(self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let settings = LifecycleSettings::from_json("{}").unwrap();
        assert_eq!(settings, LifecycleSettings::default());
        assert_eq!(settings.read_only_timeout_seconds, 900);
        assert_eq!(settings.poll_interval(), Duration::from_secs(1));
        assert_eq!(settings.recovery_user_host, "%");
        assert_eq!(settings.log_level, Severity::Info);
    }

    #[test]
    fn test_overrides() {
        let settings = LifecycleSettings::from_json(
            r#"{"read_only_timeout_seconds": 30, "poll_interval_ms": 250, "log_level": "WARN"}"#,
        )
        .unwrap();
        assert_eq!(settings.read_only_timeout_seconds, 30);
        assert_eq!(settings.poll_interval(), Duration::from_millis(250));
        assert_eq!(settings.log_level, Severity::Warn);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = LifecycleSettings::from_json(r#"{"poll_interval_ms": 0}"#);
        assert!(matches!(result, Err(GrError::Validation(_))));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = LifecycleSettings::from_json("{not json");
        assert!(matches!(result, Err(GrError::Validation(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grprov.json");
        fs::write(&path, r#"{"recovery_user_host": "10.0.0.%"}"#).unwrap();
        let settings = LifecycleSettings::load(&path).unwrap();
        assert_eq!(settings.recovery_user_host, "10.0.0.%");

        let missing = LifecycleSettings::load(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(GrError::FileAccess { .. })));
    }
}
