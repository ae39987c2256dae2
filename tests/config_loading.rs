//! Configuration Loading Tests
//!
//! A configuration file becomes working services end to end:
//! - nested field definitions compile into schema trees
//! - invalid files are rejected as a whole
//! - compiled services validate before they store

use std::fs;
use std::sync::Arc;

use schemastore::config::{AppConfig, ConfigError, Limit};
use schemastore::service::{ServiceError, ServiceRegistry};
use schemastore::storage::{MemoryStorage, StorageKind, StorageSettings};
use serde_json::json;
use tempfile::TempDir;

fn write_config(temp: &TempDir, content: &serde_json::Value) -> std::path::PathBuf {
    let path = temp.path().join("services.json");
    fs::write(&path, content.to_string()).unwrap();
    path
}

fn people_config() -> serde_json::Value {
    json!([
        {
            "name": "people",
            "api": {"bearer": "s3cret", "limits": {"get": "100s", "list": "0", "put": "5m", "delete": "-1"}},
            "fields": {
                "name": {"type": "string", "required": true, "min": 2, "max": 32},
                "email": {"type": "string", "rule": "email"},
                "born": {"type": "date", "format": "2006-01-02"},
                "homes": {
                    "type": "array",
                    "max": 3,
                    "items": {
                        "type": "object",
                        "fields": {
                            "city": {"type": "string", "required": true},
                            "since": {"type": "int", "min": 1900}
                        }
                    }
                }
            }
        },
        {
            "name": "dogs",
            "fields": {"weight": {"type": "float", "min": 0}}
        }
    ])
}

#[test]
fn test_limits_and_bearer_exposed() {
    let temp = TempDir::new().unwrap();
    let config = AppConfig::load(&write_config(&temp, &people_config())).unwrap();

    let people = config.service("people").unwrap();
    assert_eq!(people.bearer(), Some("s3cret"));
    assert_eq!(people.limits.list, Limit::Unlimited);
    assert_eq!(people.limits.delete, Limit::Disabled);
    assert!(matches!(people.limits.put, Limit::Rate { count: 5, .. }));

    let dogs = config.service("dogs").unwrap();
    assert_eq!(dogs.bearer(), None);
    assert_eq!(dogs.limits.get, Limit::Unlimited);
}

#[tokio::test]
async fn test_compiled_services_validate_before_storing() {
    let temp = TempDir::new().unwrap();
    let config = AppConfig::load(&write_config(&temp, &people_config())).unwrap();
    let storage = Arc::new(MemoryStorage::new(config.service_names()));
    let registry = ServiceRegistry::new(&config, storage);
    let people = registry.service("people").unwrap();

    let valid = json!({
        "name": "Ann",
        "email": "ann@example.com",
        "born": "1990-04-01",
        "homes": [{"city": "Oslo", "since": 2001}, {"city": "Bergen"}]
    });
    let entity = people.put(valid.clone()).await.unwrap();
    assert_eq!(entity.payload, valid);

    let cases = [
        (json!({"name": "A"}), "TOO_SHORT", "name"),
        (json!({"name": "Ann", "email": "nope"}), "INVALID_FORMAT", "email"),
        (json!({"name": "Ann", "born": "01/04/1990"}), "INVALID_FORMAT", "born"),
        (json!({"name": "Ann", "homes": [{}, {}]}), "MISSING_REQUIRED_FIELD", "homes[0].city"),
        (json!({"name": "Ann", "homes": [{"city": "X", "since": 1800}]}), "BELOW_MINIMUM", "homes[0].since"),
        (
            json!({"name": "Ann", "homes": [{"city": "a"}, {"city": "b"}, {"city": "c"}, {"city": "d"}]}),
            "TOO_MANY_ITEMS",
            "homes",
        ),
    ];
    for (payload, code, path) in cases {
        let err = people.put(payload.clone()).await.unwrap_err();
        let ServiceError::Validation(ref validation) = err else {
            panic!("{payload}: expected validation error, got {err:?}");
        };
        assert_eq!(validation.code(), code, "{payload}");
        assert_eq!(validation.path(), path, "{payload}");
    }

    assert_eq!(people.list().await.unwrap(), vec![entity]);
}

#[test]
fn test_invalid_files_rejected() {
    let cases = [
        (json!([{"name": "metrics", "fields": {"a": {"type": "int"}}}]), "RESERVED_SERVICE_NAME"),
        (json!([{"name": "a b", "fields": {"a": {"type": "int"}}}]), "INVALID_SERVICE_NAME"),
        (
            json!([
                {"name": "dup", "fields": {"a": {"type": "int"}}},
                {"name": "dup", "fields": {"a": {"type": "int"}}}
            ]),
            "DUPLICATE_SERVICE",
        ),
        (json!([{"name": "x", "fields": {"a": {"type": "decimal"}}}]), "UNKNOWN_TYPE"),
        (json!([{"name": "x", "fields": {"a": {"type": "string", "rule": "url"}}}]), "UNKNOWN_RULE"),
        (json!([{"name": "x", "fields": {"a": {"type": "date"}}}]), "INVALID_FIELD_CONFIG"),
        (json!([{"name": "x", "fields": {"a": {"type": "int", "rule": "email"}}}]), "INVALID_FIELD_CONFIG"),
        (
            json!([{"name": "x", "api": {"limits": {"get": "10w"}}, "fields": {"a": {"type": "int"}}}]),
            "INVALID_LIMIT",
        ),
        (json!({"name": "x"}), "CONFIG_PARSE_FAILED"),
    ];

    let temp = TempDir::new().unwrap();
    for (content, code) in cases {
        let err = AppConfig::load(&write_config(&temp, &content)).unwrap_err();
        assert_eq!(err.code(), code, "{content}");
    }
}

#[test]
fn test_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = AppConfig::load(&temp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[tokio::test]
async fn test_registry_connects_configured_backend() {
    let temp = TempDir::new().unwrap();
    let config = AppConfig::load(&write_config(&temp, &people_config())).unwrap();
    let settings = StorageSettings {
        kind: StorageKind::Local,
        data_dir: temp.path().join("data"),
        ..StorageSettings::default()
    };

    let registry = ServiceRegistry::connect(&config, &settings).await.unwrap();
    let dogs = registry.service("dogs").unwrap();
    let entity = dogs.put(json!({"weight": 12.5})).await.unwrap();

    let reconnected = ServiceRegistry::connect(&config, &settings).await.unwrap();
    assert_eq!(reconnected.service("dogs").unwrap().get(&entity.id).await.unwrap(), entity);
}
