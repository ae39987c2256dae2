//! Configuration loader
//!
//! Reads the service file at startup, compiles every service's schema tree
//! and limits, and rejects the whole file on the first problem.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::schema::SchemaNode;

use super::errors::{ConfigError, ConfigResult};
use super::limits::EndpointLimits;
use super::types::ServiceConfig;

/// Names claimed by the HTTP layer's own endpoints
pub const RESERVED_SERVICE_NAMES: [&str; 2] = ["metrics", "log_level"];

fn service_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("service name pattern is valid"))
}

/// A fully compiled service
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    /// Raw configuration as loaded
    pub config: ServiceConfig,
    /// Root schema node (required object wrapping the configured fields)
    pub schema: SchemaNode,
    /// Parsed endpoint limits
    pub limits: EndpointLimits,
}

impl ServiceDefinition {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn bearer(&self) -> Option<&str> {
        self.config.api.bearer.as_deref().filter(|token| !token.is_empty())
    }
}

/// Compiled application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    services: Vec<ServiceDefinition>,
}

impl AppConfig {
    /// Loads and compiles the configuration file at `path`.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_json(&content, &path.display().to_string())
    }

    /// Parses and compiles configuration text. `origin` names the source in
    /// error messages.
    pub fn from_json(content: &str, origin: &str) -> ConfigResult<Self> {
        let services: Vec<ServiceConfig> =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                origin: origin.to_string(),
                reason: e.to_string(),
            })?;

        Self::from_services(services)
    }

    /// Compiles already-parsed service configurations.
    pub fn from_services(services: Vec<ServiceConfig>) -> ConfigResult<Self> {
        validate_service_names(services.iter().map(|s| s.name.as_str()))?;

        let services = services
            .into_iter()
            .map(|config| {
                let schema = config.schema()?;
                let limits = config.limits()?;
                Ok(ServiceDefinition {
                    config,
                    schema,
                    limits,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        tracing::info!(services = services.len(), "configuration loaded");

        Ok(Self { services })
    }

    /// Returns all services in file order
    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    /// Returns the named service
    pub fn service(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.name() == name)
    }

    /// Returns all service names in file order
    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name().to_string()).collect()
    }
}

/// Checks service names: non-empty, URL/key safe, unique, not reserved.
pub fn validate_service_names<'a>(names: impl IntoIterator<Item = &'a str>) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for name in names {
        if RESERVED_SERVICE_NAMES.contains(&name) {
            return Err(ConfigError::ReservedServiceName(name.to_string()));
        }
        if !service_name_pattern().is_match(name) {
            return Err(ConfigError::InvalidServiceName {
                name: name.to_string(),
                reason: "only letters, digits, '_' and '-' are allowed".into(),
            });
        }
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateService(name.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PEOPLE: &str = r#"[
        {
            "name": "people",
            "api": {"bearer": "secret", "limits": {"get": "0", "list": "10s", "put": "5m", "delete": "-1"}},
            "fields": {
                "name": {"type": "string", "required": true},
                "age": {"type": "int", "min": 0, "max": 150}
            }
        },
        {
            "name": "dogs",
            "fields": {"breed": {"type": "string"}}
        }
    ]"#;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PEOPLE.as_bytes()).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.service_names(), vec!["people", "dogs"]);

        let people = config.service("people").unwrap();
        assert_eq!(people.bearer(), Some("secret"));
        assert!(people.limits.delete.is_disabled());
        assert!(config.service("dogs").unwrap().bearer().is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/services.json")).unwrap_err();
        assert_eq!(err.code(), "CONFIG_READ_FAILED");
    }

    #[test]
    fn test_malformed_json() {
        let err = AppConfig::from_json("{not json", "inline").unwrap_err();
        assert_eq!(err.code(), "CONFIG_PARSE_FAILED");
    }

    #[test]
    fn test_reserved_names() {
        assert!(validate_service_names(["dogs", "very_long_service_name"]).is_ok());
        assert_eq!(
            validate_service_names(["metrics"]),
            Err(ConfigError::ReservedServiceName("metrics".into()))
        );
        assert_eq!(
            validate_service_names(["log_level"]),
            Err(ConfigError::ReservedServiceName("log_level".into()))
        );
    }

    #[test]
    fn test_invalid_and_duplicate_names() {
        assert_eq!(
            validate_service_names([""]).unwrap_err().code(),
            "INVALID_SERVICE_NAME"
        );
        assert_eq!(
            validate_service_names(["a/b"]).unwrap_err().code(),
            "INVALID_SERVICE_NAME"
        );
        assert_eq!(
            validate_service_names(["dogs", "dogs"]),
            Err(ConfigError::DuplicateService("dogs".into()))
        );
    }

    #[test]
    fn test_bad_field_rejects_whole_file() {
        let content = r#"[{"name": "people", "fields": {"age": {"type": "number"}}}]"#;
        let err = AppConfig::from_json(content, "inline").unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_TYPE");
    }
}
