//! # Storage Port

use async_trait::async_trait;
use serde_json::Value;

use super::entity::Entity;
use super::errors::StorageResult;

/// Uniform CRUD contract over every backend.
///
/// Every operation is scoped to a configured service name; cross-service
/// queries do not exist. Ordering of `list` is backend-defined.
#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Mint a new entity for `payload` and make it durable
    async fn add(&self, service: &str, payload: Value) -> StorageResult<Entity>;

    /// All entities currently known for `service`
    async fn list(&self, service: &str) -> StorageResult<Vec<Entity>>;

    /// The entity with `id`, or `NotFound`
    async fn get(&self, service: &str, id: &str) -> StorageResult<Entity>;

    /// Remove the entity with `id`, or `NotFound`. Deleting twice fails
    /// the second time.
    async fn delete(&self, service: &str, id: &str) -> StorageResult<()>;
}
