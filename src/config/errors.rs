//! Configuration error types
//!
//! All configuration errors are fatal: the process refuses to start with a
//! configuration it cannot fully compile.

use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path:?}: {reason}")]
    Read { path: String, reason: String },

    #[error("could not parse configuration {origin:?}: {reason}")]
    Parse { origin: String, reason: String },

    #[error("field {field:?}: unknown type {type_name:?}")]
    UnknownType { field: String, type_name: String },

    #[error("field {field:?}: invalid rule type {rule:?}")]
    UnknownRule { field: String, rule: String },

    #[error("field config error {field:?}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("invalid service name {name:?}: {reason}")]
    InvalidServiceName { name: String, reason: String },

    #[error("could not use reserved service name {0:?}")]
    ReservedServiceName(String),

    #[error("service {0:?} is defined more than once")]
    DuplicateService(String),

    #[error("service {service:?}: could not parse API {endpoint} limit {value:?}")]
    InvalidLimit {
        service: String,
        endpoint: &'static str,
        value: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CONFIG_READ_FAILED",
            ConfigError::Parse { .. } => "CONFIG_PARSE_FAILED",
            ConfigError::UnknownType { .. } => "UNKNOWN_TYPE",
            ConfigError::UnknownRule { .. } => "UNKNOWN_RULE",
            ConfigError::InvalidField { .. } => "INVALID_FIELD_CONFIG",
            ConfigError::InvalidServiceName { .. } => "INVALID_SERVICE_NAME",
            ConfigError::ReservedServiceName(_) => "RESERVED_SERVICE_NAME",
            ConfigError::DuplicateService(_) => "DUPLICATE_SERVICE",
            ConfigError::InvalidLimit { .. } => "INVALID_LIMIT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        let err = ConfigError::UnknownType {
            field: "age".into(),
            type_name: "integer".into(),
        };
        assert!(err.to_string().contains("age"));
        assert!(err.to_string().contains("integer"));
        assert_eq!(err.code(), "UNKNOWN_TYPE");
    }

    #[test]
    fn test_limit_message_names_endpoint() {
        let err = ConfigError::InvalidLimit {
            service: "dogs".into(),
            endpoint: "GET",
            value: "5x".into(),
        };
        assert!(err.to_string().contains("GET"));
        assert!(err.to_string().contains("5x"));
    }
}
