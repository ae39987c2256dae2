//! Stored record wrapper

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{StorageError, StorageResult};

/// A stored record: identity, creation time and opaque payload.
///
/// Entities are minted by the storage layer on `add` and never mutated
/// afterwards. The JSON form (`id`, `created`, `payload`) is both the wire
/// representation and the object-store persistence format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub created: DateTime<Utc>,
    pub payload: Value,
}

impl Entity {
    /// Mints a new entity with a random v4 id and the current time.
    pub fn new(payload: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created: Utc::now(),
            payload,
        }
    }

    /// Serializes the entity for persistence
    pub fn to_json_vec(&self) -> StorageResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StorageError::Encode {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }

    /// Decodes a persisted entity. `context` names the source in errors.
    pub fn from_json_slice(data: &[u8], context: &str) -> StorageResult<Self> {
        serde_json::from_slice(data).map_err(|e| StorageError::Decode {
            context: context.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_entities_have_distinct_v4_ids() {
        let a = Entity::new(json!({"x": 1}));
        let b = Entity::new(json!({"x": 1}));
        assert_ne!(a.id, b.id);
        assert_eq!(Uuid::parse_str(&a.id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn test_persisted_form() {
        let entity = Entity::new(json!({"name": "Ann"}));
        let data = entity.to_json_vec().unwrap();

        let raw: Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(raw["id"], json!(entity.id));
        assert!(raw["created"].is_string());
        assert_eq!(raw["payload"], json!({"name": "Ann"}));

        let decoded = Entity::from_json_slice(&data, "test").unwrap();
        assert_eq!(decoded, entity);
    }

    #[test]
    fn test_decode_accepts_rfc3339_with_offset() {
        let data = br#"{"id":"abc","created":"2021-03-14T10:00:00.123456789+01:00","payload":{"x":1}}"#;
        let entity = Entity::from_json_slice(data, "people/abc.json").unwrap();
        assert_eq!(entity.id, "abc");
        assert_eq!(entity.created.to_rfc3339(), "2021-03-14T09:00:00.123456789+00:00");
    }

    #[test]
    fn test_decode_failure_names_source() {
        let err = Entity::from_json_slice(b"{}", "people/broken.json").unwrap_err();
        assert_eq!(err.code(), "DECODE_ERROR");
        assert!(err.to_string().contains("people/broken.json"));
    }
}
