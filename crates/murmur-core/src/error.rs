//! Error types for the Murmur session engine.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for every Murmur crate.
///
/// The first four variants are the user-facing taxonomy: all of them are
/// recoverable at the point of occurrence. The remaining variants come from
/// the storage and configuration layers.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionError {
    /// Malformed input that the user can correct.
    #[error("{0}")]
    Validation(String),

    /// The submitted OTP does not match the live challenge.
    #[error("Invalid OTP")]
    ChallengeMismatch,

    /// A superseded or cancelled async result arrived late.
    ///
    /// Never shown to the user; engines log and drop it.
    #[error("Stale {operation} result discarded")]
    StaleOperation { operation: &'static str },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Data access error (persistence layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a StaleOperation error
    pub fn stale(operation: &'static str) -> Self {
        Self::StaleOperation { operation }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_challenge_mismatch(&self) -> bool {
        matches!(self, Self::ChallengeMismatch)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleOperation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for errors the user caused and can fix by re-submitting.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::ChallengeMismatch)
    }

    /// Text for the single `error` message slot, if this error is ever shown.
    ///
    /// Stale results and not-found races are never surfaced.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::StaleOperation { .. } | Self::NotFound { .. } => None,
            other => Some(other.to_string()),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, SessionError>`.
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_races() {
        assert_eq!(SessionError::stale("verify_otp").user_message(), None);
        assert_eq!(SessionError::not_found("room", "r-1").user_message(), None);
        assert_eq!(
            SessionError::ChallengeMismatch.user_message().as_deref(),
            Some("Invalid OTP")
        );
        assert_eq!(
            SessionError::validation("Enter 6-digit OTP")
                .user_message()
                .as_deref(),
            Some("Enter 6-digit OTP")
        );
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err: SessionError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, SessionError::Io { ref message } if message.contains("NotFound")));
    }

    #[test]
    fn test_user_correctable() {
        assert!(SessionError::ChallengeMismatch.is_user_correctable());
        assert!(SessionError::validation("x").is_user_correctable());
        assert!(!SessionError::data_access("disk").is_user_correctable());
    }
}
