//! Error types for passporter-core

use thiserror::Error;

/// Result type alias using passporter-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in passporter-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Location (or other device) permission is missing or was revoked
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Location settings need user resolution before updates can flow
    #[error("Location settings need attention: {0}")]
    SettingsResolvable(String),

    /// Email/password or federated token rejected by the identity provider
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Transport-level failure talking to a remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Registration for an account that already exists
    #[error("An account already exists for {0}")]
    UserCollision(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local input rejected before any remote call
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Remote failure that does not fit any other category
    #[error("{0}")]
    Unknown(String),

    /// Required configuration is missing
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether this failure means location access itself is unavailable.
    pub const fn is_permission_class(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::SettingsResolvable(_))
    }

    /// The human-readable cause, or `None` when the failure carries no text.
    pub fn message(&self) -> Option<String> {
        let message = match self {
            Self::PermissionDenied(message)
            | Self::SettingsResolvable(message)
            | Self::Network(message)
            | Self::Unknown(message)
            | Self::Database(message) => message.trim().to_string(),
            other => other.to_string(),
        };
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_class_covers_denial_and_settings() {
        assert!(Error::PermissionDenied("revoked".into()).is_permission_class());
        assert!(Error::SettingsResolvable("gps off".into()).is_permission_class());
        assert!(!Error::Network("offline".into()).is_permission_class());
        assert!(!Error::Unknown(String::new()).is_permission_class());
    }

    #[test]
    fn message_is_none_for_blank_causes() {
        assert_eq!(Error::Unknown("  ".into()).message(), None);
        assert_eq!(
            Error::Network("offline".into()).message().as_deref(),
            Some("offline")
        );
    }

    #[test]
    fn validation_renders_field_name() {
        let error = Error::validation("email", "must contain @");
        assert_eq!(error.to_string(), "Invalid email: must contain @");
    }
}
