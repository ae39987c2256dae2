//! Service configuration
//!
//! Loads the service definitions file and compiles it into schema trees and
//! endpoint limits. Remote backend settings come from the environment and
//! live with their backends in [`crate::storage`].

mod errors;
mod limits;
mod loader;
mod types;

pub use errors::{ConfigError, ConfigResult};
pub use limits::{EndpointLimits, Limit};
pub use loader::{validate_service_names, AppConfig, ServiceDefinition, RESERVED_SERVICE_NAMES};
pub use types::{ApiConfig, FieldConfig, LimitsConfig, ServiceConfig};
