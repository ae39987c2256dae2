//! # Object Store Clients
//!
//! Key/blob stores that act as the durability authority behind
//! [`CachedRemoteStorage`](super::CachedRemoteStorage). Keys are
//! `/`-separated paths such as `people/<id>.json`.

mod local;
mod memory;
mod s3;

use async_trait::async_trait;

use super::errors::RemoteResult;

pub use local::LocalObjectStore;
pub use memory::{MemoryObjectStore, ObjectStoreCalls};
pub use s3::{S3Config, S3ObjectStore};

/// Backend trait for object storage
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Write `data` under `key`, replacing any previous object
    async fn put(&self, key: &str, data: Vec<u8>) -> RemoteResult<()>;

    /// Read the object under `key`
    async fn get(&self, key: &str) -> RemoteResult<Vec<u8>>;

    /// Delete the object under `key`
    async fn delete(&self, key: &str) -> RemoteResult<()>;

    /// List keys starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> RemoteResult<Vec<String>>;
}
