//! # Direct Remote Storage
//!
//! Pass-through backend over a [`DocumentStore`]; every operation is one
//! remote call and nothing is cached.
//!
//! The payload object is stored as the document itself. The creation time
//! rides along under the reserved key [`CREATED_KEY`] and is stripped again
//! on the way out, so callers never see it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::SubsecRound;
use serde_json::Value;

use super::backend::Storage;
use super::document_store::{Document, DocumentStore, Field};
use super::entity::Entity;
use super::errors::{StorageError, StorageResult};
use super::remote::with_timeout;

/// Side-channel key holding the creation timestamp
pub const CREATED_KEY: &str = "usa-internal-created";

/// Document-store backed storage
#[derive(Debug)]
pub struct DirectRemoteStorage<D: DocumentStore> {
    store: Arc<D>,
    collection_prefix: String,
    services: HashSet<String>,
    timeout: Duration,
}

impl<D: DocumentStore> DirectRemoteStorage<D> {
    pub fn new<I, S>(
        store: Arc<D>,
        collection_prefix: impl Into<String>,
        service_names: I,
        timeout: Duration,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            store,
            collection_prefix: collection_prefix.into(),
            services: service_names.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    pub fn document_store(&self) -> &Arc<D> {
        &self.store
    }

    /// Collection holding `service`'s documents
    pub fn collection(&self, service: &str) -> StorageResult<String> {
        if !self.services.contains(service) {
            return Err(StorageError::UnknownService(service.to_string()));
        }
        Ok(format!("{}{}", self.collection_prefix, service))
    }
}

fn decode_entity(collection: &str, id: String, mut document: Document) -> StorageResult<Entity> {
    let created = match document.remove(CREATED_KEY) {
        Some(Field::Timestamp(created)) => created,
        other => {
            let reason = match other {
                None => "created value is missing".to_string(),
                Some(field) => format!("created value is a {}, not a timestamp", field.type_name()),
            };
            return Err(StorageError::Decode {
                context: format!("{}/{}", collection, id),
                reason,
            });
        }
    };

    Ok(Entity {
        id,
        created,
        payload: Field::Map(document).into_json(),
    })
}

#[async_trait]
impl<D: DocumentStore> Storage for DirectRemoteStorage<D> {
    async fn add(&self, service: &str, payload: Value) -> StorageResult<Entity> {
        let collection = self.collection(service)?;

        let Value::Object(fields) = &payload else {
            return Err(StorageError::InvalidPayload {
                service: service.to_string(),
                reason: "payload must be a JSON object".into(),
            });
        };
        if fields.contains_key(CREATED_KEY) {
            return Err(StorageError::InvalidPayload {
                service: service.to_string(),
                reason: format!("field {:?} is reserved", CREATED_KEY),
            });
        }

        let mut entity = Entity::new(payload);
        // document stores keep microseconds
        entity.created = entity.created.trunc_subsecs(6);

        let mut document: Document = match Field::from_json(entity.payload.clone()) {
            Field::Map(map) => map,
            _ => Document::new(),
        };
        document.insert(CREATED_KEY.to_string(), Field::Timestamp(entity.created));

        with_timeout(self.timeout, self.store.set(&collection, &entity.id, document))
            .await
            .map_err(|e| {
                tracing::warn!(collection = %collection, id = %entity.id, error = %e, "document write failed");
                StorageError::remote("write", format!("{}/{}", collection, entity.id), e)
            })?;

        tracing::debug!(service, id = %entity.id, "document stored");
        Ok(entity)
    }

    async fn list(&self, service: &str) -> StorageResult<Vec<Entity>> {
        let collection = self.collection(service)?;

        let documents = with_timeout(self.timeout, self.store.list(&collection))
            .await
            .map_err(|e| StorageError::remote("list", collection.clone(), e))?;

        documents
            .into_iter()
            .map(|(id, document)| decode_entity(&collection, id, document))
            .collect()
    }

    async fn get(&self, service: &str, id: &str) -> StorageResult<Entity> {
        let collection = self.collection(service)?;

        let document = with_timeout(self.timeout, self.store.get(&collection, id))
            .await
            .map_err(|e| StorageError::remote("read", format!("{}/{}", collection, id), e))?
            .ok_or_else(|| StorageError::not_found(service, id))?;

        decode_entity(&collection, id.to_string(), document)
    }

    async fn delete(&self, service: &str, id: &str) -> StorageResult<()> {
        let collection = self.collection(service)?;

        let existed = with_timeout(self.timeout, self.store.delete(&collection, id))
            .await
            .map_err(|e| StorageError::remote("delete", format!("{}/{}", collection, id), e))?;

        if !existed {
            return Err(StorageError::not_found(service, id));
        }
        tracing::debug!(service, id, "document deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::document_store::MemoryDocumentStore;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn storage(prefix: &str) -> (Arc<MemoryDocumentStore>, DirectRemoteStorage<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let storage = DirectRemoteStorage::new(store.clone(), prefix, ["people"], TIMEOUT);
        (store, storage)
    }

    #[tokio::test]
    async fn test_created_travels_in_side_channel() {
        let (store, storage) = storage("test_");
        let entity = storage
            .add("people", json!({"name": "Ann", "age": 31}))
            .await
            .unwrap();

        let raw = store.get_raw("test_people", &entity.id).unwrap();
        assert_eq!(raw[CREATED_KEY], Field::Timestamp(entity.created));
        assert_eq!(raw["age"], Field::Integer(31));

        let fetched = storage.get("people", &entity.id).await.unwrap();
        assert_eq!(fetched, entity);
        assert!(fetched.payload.get(CREATED_KEY).is_none());
    }

    #[tokio::test]
    async fn test_list_strips_side_channel() {
        let (_, storage) = storage("");
        storage.add("people", json!({"n": 1})).await.unwrap();
        storage.add("people", json!({"n": 2})).await.unwrap();

        let listed = storage.list("people").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|e| e.payload.get(CREATED_KEY).is_none()));
    }

    #[tokio::test]
    async fn test_missing_created_is_decode_error() {
        let (store, storage) = storage("");
        store.insert_raw(
            "people",
            "legacy",
            Document::from([("name".to_string(), Field::String("Old".into()))]),
        );

        let err = storage.get("people", "legacy").await.unwrap_err();
        assert_eq!(err.code(), "DECODE_ERROR");
        assert_eq!(storage.list("people").await.unwrap_err().code(), "DECODE_ERROR");
    }

    #[tokio::test]
    async fn test_created_of_wrong_type_is_decode_error() {
        let (store, storage) = storage("");
        store.insert_raw(
            "people",
            "odd",
            Document::from([(CREATED_KEY.to_string(), Field::String("yesterday".into()))]),
        );

        let err = storage.get("people", "odd").await.unwrap_err();
        assert!(err.to_string().contains("not a timestamp"));
    }

    #[tokio::test]
    async fn test_payload_must_be_object_without_reserved_key() {
        let (store, storage) = storage("");
        let err = storage.add("people", json!([1, 2])).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_PAYLOAD");

        let mut payload = serde_json::Map::new();
        payload.insert(CREATED_KEY.to_string(), json!("2020-01-01T00:00:00Z"));
        let err = storage.add("people", Value::Object(payload)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_document() {
        let (_, storage) = storage("");
        let entity = storage.add("people", json!({"n": 1})).await.unwrap();

        storage.delete("people", &entity.id).await.unwrap();
        assert!(storage.delete("people", &entity.id).await.unwrap_err().is_not_found());
        assert!(storage.get("people", &entity.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_remote_failure_surfaces() {
        let (store, storage) = storage("");
        store.set_failing(true);
        let err = storage.list("people").await.unwrap_err();
        assert_eq!(err.code(), "REMOTE_OPERATION_FAILED");
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn test_unknown_service() {
        let (store, storage) = storage("");
        assert!(matches!(
            storage.get("cats", "1").await,
            Err(StorageError::UnknownService(_))
        ));
        assert_eq!(store.calls(), 0);
    }
}
