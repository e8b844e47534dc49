//! # Provisioning Errors
//!
//! One variant per failure kind the core can raise. Collaborator failures
//! arrive as `GrError::Session` and are never rewritten.

use thiserror::Error;

use crate::instance::SessionError;

/// Result type for provisioning operations
pub type GrResult<T> = Result<T, GrError>;

/// Provisioning errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrError {
    /// A member state or role string outside the known set
    #[error("Unsupported member state: '{0}'")]
    UnsupportedState(String),

    /// Plugin is present but not active; only a restart can activate it
    #[error(
        "Group Replication plugin is {status} and cannot be enabled at runtime. \
         Please enable the plugin and restart the server."
    )]
    PluginDisabled { status: String },

    /// super_read_only did not clear after bootstrap
    #[error(
        "Timeout waiting for super_read_only to be unset after call to \
         start Group Replication plugin on '{instance}' ({seconds}s)"
    )]
    Timeout { instance: String, seconds: u32 },

    /// A version below the supported series was given
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    /// Malformed arguments, raised before any I/O
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// Option or settings file could not be read or written
    #[error("Cannot access '{path}': {message}")]
    FileAccess { path: String, message: String },

    /// Any failure from the Instance collaborator
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl GrError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        GrError::Validation(message.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            GrError::UnsupportedState(_) => "GR_UNSUPPORTED_STATE",
            GrError::PluginDisabled { .. } => "GR_PLUGIN_DISABLED",
            GrError::Timeout { .. } => "GR_TIMEOUT",
            GrError::UnsupportedVersion(_) => "GR_UNSUPPORTED_VERSION",
            GrError::Validation(_) => "GR_VALIDATION",
            GrError::FileAccess { .. } => "GR_FILE_ACCESS",
            GrError::Session(_) => "GR_SESSION",
        }
    }

    /// Fatal errors point at data or version skew; retrying cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GrError::UnsupportedState(_) | GrError::UnsupportedVersion(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_is_transparent() {
        let inner = SessionError::server(1045, "Access denied");
        let err: GrError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(err, GrError::Session(inner));
        assert_eq!(err.code(), "GR_SESSION");
    }

    #[test]
    fn test_plugin_disabled_names_status() {
        let err = GrError::PluginDisabled {
            status: "DISABLED".into(),
        };
        assert!(err.to_string().contains("DISABLED"));
        assert!(err.to_string().contains("restart"));
    }

    #[test]
    fn test_fatal_errors() {
        assert!(GrError::UnsupportedState("JOINING".into()).is_fatal());
        assert!(GrError::UnsupportedVersion("5.7.44".into()).is_fatal());
        assert!(!GrError::validation("empty user").is_fatal());
        assert!(!GrError::Timeout {
            instance: "db1:3306".into(),
            seconds: 5
        }
        .is_fatal());
    }
}
