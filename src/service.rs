//! Service layer
//!
//! A [`Service`] binds one configured resource type to its compiled schema
//! and the shared storage handle. Payloads are validated before they are
//! handed to storage; nothing invalid is ever persisted.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::config::{AppConfig, ServiceDefinition};
use crate::schema::{validate_payload, SchemaNode, ValidationError, ValidationResult};
use crate::storage::{self, Entity, Storage, StorageError, StorageSettings};

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(e) => e.code(),
            ServiceError::Storage(e) => e.code(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(e) => e.status_code(),
            ServiceError::Storage(e) => e.status_code(),
        }
    }
}

/// One configured resource type
#[derive(Debug, Clone)]
pub struct Service {
    definition: ServiceDefinition,
    storage: Arc<dyn Storage>,
}

impl Service {
    pub fn new(definition: ServiceDefinition, storage: Arc<dyn Storage>) -> Self {
        Self {
            definition,
            storage,
        }
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    /// Root schema node of the payload
    pub fn schema(&self) -> &SchemaNode {
        &self.definition.schema
    }

    /// Validates `payload` without storing it
    pub fn validate(&self, payload: &Value) -> ValidationResult<()> {
        validate_payload(self.schema(), payload)
    }

    /// Validates `payload`, then stores it as a new entity
    pub async fn put(&self, payload: Value) -> ServiceResult<Entity> {
        if let Err(e) = self.validate(&payload) {
            tracing::debug!(service = self.name(), field = %e.path(), code = e.code(), "payload rejected");
            return Err(e.into());
        }

        Ok(self.storage.add(self.name(), payload).await?)
    }

    pub async fn list(&self) -> ServiceResult<Vec<Entity>> {
        Ok(self.storage.list(self.name()).await?)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Entity> {
        Ok(self.storage.get(self.name(), id).await?)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        Ok(self.storage.delete(self.name(), id).await?)
    }
}

/// All configured services over one storage handle
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<Service>,
}

impl ServiceRegistry {
    /// Builds a service per configured definition, all sharing `storage`
    pub fn new(config: &AppConfig, storage: Arc<dyn Storage>) -> Self {
        let services = config
            .services()
            .iter()
            .map(|definition| Service::new(definition.clone(), Arc::clone(&storage)))
            .collect();

        Self { services }
    }

    /// Connects the storage backend described by `settings`, then builds
    /// the registry over it
    pub async fn connect(config: &AppConfig, settings: &StorageSettings) -> ServiceResult<Self> {
        let storage = storage::connect(settings, &config.service_names()).await?;
        Ok(Self::new(config, storage))
    }

    pub fn service(&self, name: &str) -> ServiceResult<&Service> {
        self.services
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| StorageError::UnknownService(name.to_string()).into())
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }
}
