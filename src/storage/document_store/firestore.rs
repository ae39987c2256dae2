//! # Firestore Document Store
//!
//! Talks to the Firestore REST API (v1). Documents travel as
//! `{"fields": {<name>: <typed value>}}`; the typed value encoding lives in
//! [`RestValue`]. With `FIRESTORE_EMULATOR_HOST` set, requests go to the
//! emulator over plain HTTP with its fixed owner token.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{Document, DocumentStore, Field};
use crate::storage::errors::{RemoteError, RemoteResult, StorageError, StorageResult};
use crate::storage::remote::{optional_var, required_var};

pub const PROJECT_ID_VAR: &str = "GOOGLE_PROJECT_ID";
pub const COLLECTION_PREFIX_VAR: &str = "GOOGLE_FIRESTORE_COLLECTION_PREFIX";
pub const EMULATOR_HOST_VAR: &str = "FIRESTORE_EMULATOR_HOST";
pub const ACCESS_TOKEN_VAR: &str = "GOOGLE_ACCESS_TOKEN";

const PRODUCTION_HOST: &str = "https://firestore.googleapis.com";
const EMULATOR_TOKEN: &str = "owner";
const PAGE_SIZE: u32 = 300;

/// Connection settings for [`FirestoreDocumentStore`]
#[derive(Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Prepended to every service name to form the collection name
    pub collection_prefix: String,
    pub emulator_host: Option<String>,
    pub access_token: Option<String>,
}

impl std::fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("collection_prefix", &self.collection_prefix)
            .field("emulator_host", &self.emulator_host)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl FirestoreConfig {
    /// Reads the settings through `lookup`. The access token is only
    /// required when no emulator is configured.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> StorageResult<Self> {
        let project_id = required_var(lookup, PROJECT_ID_VAR)?;
        let emulator_host = optional_var(lookup, EMULATOR_HOST_VAR);
        let access_token = match emulator_host {
            Some(_) => None,
            None => Some(required_var(lookup, ACCESS_TOKEN_VAR)?),
        };

        Ok(Self {
            project_id,
            collection_prefix: optional_var(lookup, COLLECTION_PREFIX_VAR).unwrap_or_default(),
            emulator_host,
            access_token,
        })
    }

    fn base_url(&self) -> String {
        let host = match &self.emulator_host {
            Some(emulator) => format!("http://{}", emulator),
            None => PRODUCTION_HOST.to_string(),
        };
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            host, self.project_id
        )
    }

    fn token(&self) -> &str {
        self.access_token.as_deref().unwrap_or(EMULATOR_TOKEN)
    }
}

/// Firestore REST client
#[derive(Debug, Clone)]
pub struct FirestoreDocumentStore {
    http_client: HttpClient,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl FirestoreDocumentStore {
    /// Create a client whose requests give up after `timeout`
    pub fn new(config: &FirestoreConfig, timeout: Duration) -> StorageResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| StorageError::Internal(format!("could not build HTTP client: {e}")))?;

        if let Some(emulator) = &config.emulator_host {
            tracing::info!(host = %emulator, "using Firestore emulator");
        }

        Ok(Self {
            http_client,
            base_url: config.base_url(),
            token: config.token().to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout(self.timeout)
                } else {
                    RemoteError::Io(e.to_string())
                }
            })
    }
}

async fn unexpected(response: Response) -> RemoteError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RemoteError::Status { status, body }
}

async fn decode_body<T: for<'de> Deserialize<'de>>(response: Response) -> RemoteResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    async fn set(&self, collection: &str, id: &str, document: Document) -> RemoteResult<()> {
        let body = RestDocumentBody {
            fields: encode_document(&document),
        };
        let request = self
            .http_client
            .patch(self.document_url(collection, id))
            .json(&body);

        let response = self.send(request).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            _ => Err(unexpected(response).await),
        }
    }

    async fn get(&self, collection: &str, id: &str) -> RemoteResult<Option<Document>> {
        let request = self.http_client.get(self.document_url(collection, id));

        let response = self.send(request).await?;
        match response.status() {
            StatusCode::OK => {
                let document: RestDocument = decode_body(response).await?;
                decode_document(document.fields).map(Some)
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(unexpected(response).await),
        }
    }

    async fn list(&self, collection: &str) -> RemoteResult<Vec<(String, Document)>> {
        let url = format!("{}/{}", self.base_url, collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = page_token.take() {
                request = request.query(&[("pageToken", token)]);
            }

            let response = self.send(request).await?;
            let page: ListResponse = match response.status() {
                StatusCode::OK => decode_body(response).await?,
                // collections do not exist until their first document does
                StatusCode::NOT_FOUND => break,
                _ => return Err(unexpected(response).await),
            };

            for document in page.documents {
                let id = document_id(&document.name)?;
                documents.push((id, decode_document(document.fields)?));
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents)
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<bool> {
        let request = self
            .http_client
            .delete(self.document_url(collection, id))
            .query(&[("currentDocument.exists", "true")]);

        let response = self.send(request).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(unexpected(response).await),
        }
    }
}

// =============================================================================
// REST value codec
// =============================================================================

/// One Firestore value in its REST JSON encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum RestValue {
    NullValue(()),
    BooleanValue(bool),
    /// int64 values are sent as decimal strings
    IntegerValue(String),
    DoubleValue(f64),
    StringValue(String),
    TimestampValue(String),
    ArrayValue(RestArray),
    MapValue(RestMap),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct RestArray {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<RestValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct RestMap {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    fields: BTreeMap<String, RestValue>,
}

#[derive(Debug, Serialize)]
struct RestDocumentBody {
    fields: BTreeMap<String, RestValue>,
}

#[derive(Debug, Deserialize)]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, RestValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RestDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

fn document_id(name: &str) -> RemoteResult<String> {
    name.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RemoteError::Decode(format!("document name {name:?} has no id")))
}

pub(crate) fn encode_field(field: &Field) -> RestValue {
    match field {
        Field::Null => RestValue::NullValue(()),
        Field::Bool(b) => RestValue::BooleanValue(*b),
        Field::Integer(i) => RestValue::IntegerValue(i.to_string()),
        Field::Double(d) => RestValue::DoubleValue(*d),
        Field::String(s) => RestValue::StringValue(s.clone()),
        Field::Timestamp(t) => {
            RestValue::TimestampValue(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        Field::Array(items) => RestValue::ArrayValue(RestArray {
            values: items.iter().map(encode_field).collect(),
        }),
        Field::Map(map) => RestValue::MapValue(RestMap {
            fields: encode_document(map),
        }),
    }
}

pub(crate) fn decode_value(value: RestValue) -> RemoteResult<Field> {
    Ok(match value {
        RestValue::NullValue(()) => Field::Null,
        RestValue::BooleanValue(b) => Field::Bool(b),
        RestValue::IntegerValue(s) => Field::Integer(
            s.parse()
                .map_err(|_| RemoteError::Decode(format!("invalid integerValue {s:?}")))?,
        ),
        RestValue::DoubleValue(d) => Field::Double(d),
        RestValue::StringValue(s) => Field::String(s),
        RestValue::TimestampValue(s) => Field::Timestamp(
            DateTime::parse_from_rfc3339(&s)
                .map_err(|e| RemoteError::Decode(format!("invalid timestampValue {s:?}: {e}")))?
                .with_timezone(&Utc),
        ),
        RestValue::ArrayValue(array) => Field::Array(
            array
                .values
                .into_iter()
                .map(decode_value)
                .collect::<RemoteResult<_>>()?,
        ),
        RestValue::MapValue(map) => Field::Map(decode_document(map.fields)?),
    })
}

fn encode_document(document: &Document) -> BTreeMap<String, RestValue> {
    document
        .iter()
        .map(|(name, field)| (name.clone(), encode_field(field)))
        .collect()
}

fn decode_document(fields: BTreeMap<String, RestValue>) -> RemoteResult<Document> {
    fields
        .into_iter()
        .map(|(name, value)| Ok((name, decode_value(value)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_requires_project() {
        let err = FirestoreConfig::from_lookup(&env(&[])).unwrap_err();
        assert!(err.to_string().contains(PROJECT_ID_VAR));
    }

    #[test]
    fn test_config_requires_token_without_emulator() {
        let err = FirestoreConfig::from_lookup(&env(&[(PROJECT_ID_VAR, "p")])).unwrap_err();
        assert!(err.to_string().contains(ACCESS_TOKEN_VAR));

        let config = FirestoreConfig::from_lookup(&env(&[
            (PROJECT_ID_VAR, "p"),
            (ACCESS_TOKEN_VAR, "t"),
            (COLLECTION_PREFIX_VAR, "test_"),
        ]))
        .unwrap();
        assert_eq!(config.collection_prefix, "test_");
        assert_eq!(
            config.base_url(),
            "https://firestore.googleapis.com/v1/projects/p/databases/(default)/documents"
        );
    }

    #[test]
    fn test_emulator_config() {
        let config = FirestoreConfig::from_lookup(&env(&[
            (PROJECT_ID_VAR, "p"),
            (EMULATOR_HOST_VAR, "localhost:8080"),
        ]))
        .unwrap();
        assert_eq!(config.collection_prefix, "");
        assert_eq!(config.token(), "owner");
        assert!(config.base_url().starts_with("http://localhost:8080/v1/projects/p/"));
    }

    #[test]
    fn test_value_encoding_matches_rest_shape() {
        let created = DateTime::parse_from_rfc3339("2021-05-06T07:08:09.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let document = Document::from([
            ("age".to_string(), Field::Integer(42)),
            ("tags".to_string(), Field::Array(vec![Field::String("a".into())])),
            ("none".to_string(), Field::Null),
            ("created".to_string(), Field::Timestamp(created)),
            (
                "address".to_string(),
                Field::Map(BTreeMap::from([("city".to_string(), Field::Double(1.5))])),
            ),
        ]);

        let encoded = serde_json::to_value(encode_document(&document)).unwrap();
        assert_eq!(
            encoded,
            json!({
                "age": {"integerValue": "42"},
                "tags": {"arrayValue": {"values": [{"stringValue": "a"}]}},
                "none": {"nullValue": null},
                "created": {"timestampValue": "2021-05-06T07:08:09.500Z"},
                "address": {"mapValue": {"fields": {"city": {"doubleValue": 1.5}}}}
            })
        );

        let decoded: BTreeMap<String, RestValue> = serde_json::from_value(encoded).unwrap();
        assert_eq!(decode_document(decoded).unwrap(), document);
    }

    #[test]
    fn test_empty_containers_decode() {
        let value: RestValue = serde_json::from_value(json!({"arrayValue": {}})).unwrap();
        assert_eq!(decode_value(value).unwrap(), Field::Array(vec![]));
        let value: RestValue = serde_json::from_value(json!({"mapValue": {}})).unwrap();
        assert_eq!(decode_value(value).unwrap(), Field::Map(BTreeMap::new()));
    }

    #[test]
    fn test_bad_integer_is_decode_error() {
        let err = decode_value(RestValue::IntegerValue("4.2".into())).unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)));
    }

    #[test]
    fn test_list_response_parsing() {
        let page: ListResponse = serde_json::from_value(json!({
            "documents": [{
                "name": "projects/p/databases/(default)/documents/people/abc",
                "fields": {"name": {"stringValue": "Ann"}},
                "createTime": "2021-01-01T00:00:00Z",
                "updateTime": "2021-01-01T00:00:00Z"
            }],
            "nextPageToken": "next"
        }))
        .unwrap();

        assert_eq!(document_id(&page.documents[0].name).unwrap(), "abc");
        assert_eq!(page.next_page_token.as_deref(), Some("next"));

        let empty: ListResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.documents.is_empty());
    }

    #[test]
    fn test_client_builds() {
        let config = FirestoreConfig::from_lookup(&env(&[
            (PROJECT_ID_VAR, "p"),
            (EMULATOR_HOST_VAR, "localhost:8080"),
        ]))
        .unwrap();
        let store = FirestoreDocumentStore::new(&config, Duration::from_secs(5)).unwrap();
        assert!(store.document_url("people", "1").ends_with("/documents/people/1"));
        assert!(store.base_url().starts_with("http://localhost:8080"));
    }
}
