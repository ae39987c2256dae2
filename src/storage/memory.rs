//! In-memory storage backend
//!
//! Holds an ordered sequence of entities per service, pre-seeded with an
//! empty sequence for every configured service. Lookups are linear scans by
//! id; the backend is meant for small data sets and as the local mirror of
//! [`CachedRemoteStorage`](super::CachedRemoteStorage).
//!
//! Thread-safety is provided by a single `RwLock` over the whole map.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::backend::Storage;
use super::entity::Entity;
use super::errors::{StorageError, StorageResult};

type ServiceMap = HashMap<String, Vec<Entity>>;

/// Canonical dependency-free storage backend
#[derive(Debug, Default)]
pub struct MemoryStorage {
    services: RwLock<ServiceMap>,
}

impl MemoryStorage {
    /// Create a backend seeded with an empty sequence per service
    pub fn new<I, S>(service_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let services = service_names
            .into_iter()
            .map(|name| (name.into(), Vec::new()))
            .collect();

        Self {
            services: RwLock::new(services),
        }
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, ServiceMap>> {
        self.services
            .read()
            .map_err(|_| StorageError::Internal("memory storage lock poisoned".into()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, ServiceMap>> {
        self.services
            .write()
            .map_err(|_| StorageError::Internal("memory storage lock poisoned".into()))
    }

    /// Returns true when `service` was configured
    pub fn has_service(&self, service: &str) -> StorageResult<bool> {
        Ok(self.read()?.contains_key(service))
    }

    /// Appends an existing entity to `service`
    pub(crate) fn insert(&self, service: &str, entity: Entity) -> StorageResult<()> {
        let mut services = self.write()?;
        let entities = services
            .get_mut(service)
            .ok_or_else(|| StorageError::UnknownService(service.to_string()))?;
        entities.push(entity);
        Ok(())
    }

    /// Returns true when `service` holds an entity with `id`
    pub(crate) fn contains(&self, service: &str, id: &str) -> StorageResult<bool> {
        let services = self.read()?;
        let entities = services
            .get(service)
            .ok_or_else(|| StorageError::UnknownService(service.to_string()))?;
        Ok(entities.iter().any(|e| e.id == id))
    }

    /// Removes the entity with `id`, keeping the order of the rest
    pub(crate) fn remove(&self, service: &str, id: &str) -> StorageResult<Entity> {
        let mut services = self.write()?;
        let entities = services
            .get_mut(service)
            .ok_or_else(|| StorageError::UnknownService(service.to_string()))?;
        let index = entities
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StorageError::not_found(service, id))?;
        Ok(entities.remove(index))
    }

    pub(crate) fn snapshot(&self, service: &str) -> StorageResult<Vec<Entity>> {
        self.read()?
            .get(service)
            .cloned()
            .ok_or_else(|| StorageError::UnknownService(service.to_string()))
    }

    pub(crate) fn find(&self, service: &str, id: &str) -> StorageResult<Entity> {
        let services = self.read()?;
        let entities = services
            .get(service)
            .ok_or_else(|| StorageError::UnknownService(service.to_string()))?;
        entities
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(service, id))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn add(&self, service: &str, payload: Value) -> StorageResult<Entity> {
        let entity = Entity::new(payload);
        self.insert(service, entity.clone())?;
        Ok(entity)
    }

    async fn list(&self, service: &str) -> StorageResult<Vec<Entity>> {
        self.snapshot(service)
    }

    async fn get(&self, service: &str, id: &str) -> StorageResult<Entity> {
        self.find(service, id)
    }

    async fn delete(&self, service: &str, id: &str) -> StorageResult<()> {
        self.remove(service, id).map(|_| ())
    }
}
