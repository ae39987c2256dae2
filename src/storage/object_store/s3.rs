//! # S3 Object Store
//!
//! Works against AWS and S3-compatible services (MinIO, localstack) when
//! `AWS_S3_ENDPOINT` is set. Path-style addressing is always used.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use super::ObjectStore;
use crate::storage::errors::{RemoteError, RemoteResult, StorageResult};
use crate::storage::remote::{optional_var, required_var};

pub const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY";
pub const SECRET_KEY_VAR: &str = "AWS_SECRET_KEY";
pub const BUCKET_VAR: &str = "AWS_BUCKET_NAME";
pub const REGION_VAR: &str = "AWS_REGION";
pub const ENDPOINT_VAR: &str = "AWS_S3_ENDPOINT";

/// Connection settings for [`S3ObjectStore`]
#[derive(Clone)]
pub struct S3Config {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl S3Config {
    /// Reads the settings through `lookup`, usually the process environment.
    /// Fails with `MissingConfiguration` naming the first absent variable.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> StorageResult<Self> {
        Ok(Self {
            access_key: required_var(lookup, ACCESS_KEY_VAR)?,
            secret_key: required_var(lookup, SECRET_KEY_VAR)?,
            bucket: required_var(lookup, BUCKET_VAR)?,
            region: required_var(lookup, REGION_VAR)?,
            endpoint: optional_var(lookup, ENDPOINT_VAR),
        })
    }
}

/// S3 bucket client
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key,
            config.secret_key,
            None,
            None,
            "schemastore",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true);
        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn service_error<E>(e: E) -> RemoteError
where
    E: std::error::Error,
{
    RemoteError::Service(DisplayErrorContext(e).to_string())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> RemoteResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(service_error)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> RemoteResult<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    RemoteError::NotFound(key.to_string())
                } else {
                    service_error(e)
                }
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| RemoteError::Io(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> RemoteResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(service_error)?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> RemoteResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(service_error)?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        keys.sort();
        Ok(keys)
    }
}
