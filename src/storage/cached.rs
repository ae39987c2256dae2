//! # Cached Remote Storage
//!
//! Write-through backend over an [`ObjectStore`]:
//!
//! - the object store is the durability authority, one object per entity
//!   at `<service>/<id>.json`
//! - an in-memory mirror ([`MemoryStorage`]) is filled from the store once
//!   at startup and answers every `list`/`get` afterwards
//! - writes go to the store first; the mirror changes only after the store
//!   accepted the write
//!
//! One async write gate per service serializes "remote write, then mirror
//! update", so concurrent adds and deletes on a service never interleave.
//! Changes made to the bucket by other processes after startup are not seen.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use serde_json::Value;
use tokio::sync::Mutex;

use super::backend::Storage;
use super::entity::Entity;
use super::errors::{RemoteError, StorageError, StorageResult};
use super::memory::MemoryStorage;
use super::object_store::ObjectStore;
use super::remote::with_timeout;

/// Downloads in flight per service during hydration
const HYDRATION_CONCURRENCY: usize = 16;

/// Object key of an entity
pub fn object_key(service: &str, id: &str) -> String {
    format!("{}/{}.json", service, id)
}

/// Object-store backed storage with an in-memory read mirror
#[derive(Debug)]
pub struct CachedRemoteStorage<O: ObjectStore> {
    store: Arc<O>,
    mirror: MemoryStorage,
    gates: HashMap<String, Mutex<()>>,
    timeout: Duration,
}

impl<O: ObjectStore> CachedRemoteStorage<O> {
    /// Connects to `store` and hydrates the mirror for every service.
    ///
    /// Fails if any listing, download or decode fails; a backend that
    /// starts has a complete mirror.
    pub async fn open<I, S>(store: Arc<O>, service_names: I, timeout: Duration) -> StorageResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = service_names.into_iter().map(Into::into).collect();

        let storage = Self {
            store,
            mirror: MemoryStorage::new(names.iter().cloned()),
            gates: names.iter().map(|name| (name.clone(), Mutex::new(()))).collect(),
            timeout,
        };

        for name in &names {
            let count = storage.hydrate(name).await?;
            tracing::info!(service = %name, entities = count, "mirror hydrated");
        }

        Ok(storage)
    }

    /// The underlying object store
    pub fn object_store(&self) -> &Arc<O> {
        &self.store
    }

    async fn hydrate(&self, service: &str) -> StorageResult<usize> {
        let prefix = format!("{}/", service);
        let keys = with_timeout(self.timeout, self.store.list(&prefix))
            .await
            .map_err(|e| StorageError::remote("list", prefix.clone(), e))?;

        let mut entities: Vec<Entity> = stream::iter(keys)
            .map(|key| async move {
                let data = with_timeout(self.timeout, self.store.get(&key))
                    .await
                    .map_err(|e| StorageError::remote("download", key.clone(), e))?;
                let entity = Entity::from_json_slice(&data, &key)?;
                if object_key(service, &entity.id) != key {
                    return Err(StorageError::Decode {
                        context: key,
                        reason: format!("stored entity id {:?} does not match its key", entity.id),
                    });
                }
                Ok::<_, StorageError>(entity)
            })
            .buffered(HYDRATION_CONCURRENCY)
            .try_collect()
            .await?;

        // restore insertion order
        entities.sort_by_key(|entity| entity.created);

        let count = entities.len();
        for entity in entities {
            self.mirror.insert(service, entity)?;
        }
        Ok(count)
    }

    fn gate(&self, service: &str) -> StorageResult<&Mutex<()>> {
        self.gates
            .get(service)
            .ok_or_else(|| StorageError::UnknownService(service.to_string()))
    }
}

#[async_trait]
impl<O: ObjectStore> Storage for CachedRemoteStorage<O> {
    async fn add(&self, service: &str, payload: Value) -> StorageResult<Entity> {
        let _guard = self.gate(service)?.lock().await;

        let entity = Entity::new(payload);
        let key = object_key(service, &entity.id);
        let data = entity.to_json_vec()?;

        with_timeout(self.timeout, self.store.put(&key, data))
            .await
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "upload failed");
                StorageError::remote("upload", key.clone(), e)
            })?;

        self.mirror.insert(service, entity.clone())?;
        tracing::debug!(service, id = %entity.id, "entity stored");

        Ok(entity)
    }

    async fn list(&self, service: &str) -> StorageResult<Vec<Entity>> {
        self.mirror.snapshot(service)
    }

    async fn get(&self, service: &str, id: &str) -> StorageResult<Entity> {
        self.mirror.find(service, id)
    }

    async fn delete(&self, service: &str, id: &str) -> StorageResult<()> {
        let _guard = self.gate(service)?.lock().await;

        if !self.mirror.contains(service, id)? {
            return Err(StorageError::not_found(service, id));
        }

        let key = object_key(service, id);
        match with_timeout(self.timeout, self.store.delete(&key)).await {
            Ok(()) => {}
            Err(RemoteError::NotFound(_)) => {
                tracing::warn!(key = %key, "object already gone from the store");
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "remote delete failed");
                return Err(StorageError::remote("delete", key, e));
            }
        }

        self.mirror.remove(service, id)?;
        tracing::debug!(service, id, "entity deleted");

        Ok(())
    }
}
