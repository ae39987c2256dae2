//! Entity storage for schemastore
//!
//! Every backend implements the [`Storage`] port, scoped per service name:
//!
//! - [`MemoryStorage`]: process-local, lost on exit
//! - [`CachedRemoteStorage`]: an [`ObjectStore`] bucket as the durability
//!   authority, with an in-memory mirror hydrated at startup serving reads
//! - [`DirectRemoteStorage`]: every call goes to a [`DocumentStore`]; the
//!   creation time is kept under a reserved document key
//!
//! Backends are chosen at startup with [`StorageKind`] and built by
//! [`connect`]. Remote settings come from the environment.

mod backend;
mod cached;
mod direct;
mod entity;
mod errors;
mod memory;
mod remote;

pub mod document_store;
pub mod object_store;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub use backend::Storage;
pub use cached::{object_key, CachedRemoteStorage};
pub use direct::{DirectRemoteStorage, CREATED_KEY};
pub use document_store::{
    Document, DocumentStore, Field, FirestoreConfig, FirestoreDocumentStore, MemoryDocumentStore,
};
pub use entity::Entity;
pub use errors::{RemoteError, RemoteResult, StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use object_store::{
    LocalObjectStore, MemoryObjectStore, ObjectStore, ObjectStoreCalls, S3Config, S3ObjectStore,
};
pub use remote::DEFAULT_REMOTE_TIMEOUT;

/// Backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// [`MemoryStorage`]
    Memory,
    /// [`CachedRemoteStorage`] over a [`LocalObjectStore`]
    #[default]
    Local,
    /// [`CachedRemoteStorage`] over an [`S3ObjectStore`]
    S3,
    /// [`DirectRemoteStorage`] over a [`FirestoreDocumentStore`]
    Firestore,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Memory => "mem",
            StorageKind::Local => "local",
            StorageKind::S3 => "s3",
            StorageKind::Firestore => "firestore",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mem" | "memory" => Ok(StorageKind::Memory),
            "local" => Ok(StorageKind::Local),
            "s3" => Ok(StorageKind::S3),
            "firestore" => Ok(StorageKind::Firestore),
            other => Err(StorageError::UnknownStorageKind(other.to_string())),
        }
    }
}

/// Settings for [`connect`]
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub kind: StorageKind,
    /// Root directory of the local object store
    pub data_dir: PathBuf,
    /// Bound on each remote call
    pub remote_timeout: Duration,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            data_dir: PathBuf::from("data"),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

/// Builds the configured backend for `service_names`, reading remote
/// settings from the process environment.
pub async fn connect(
    settings: &StorageSettings,
    service_names: &[String],
) -> StorageResult<Arc<dyn Storage>> {
    connect_with_env(settings, service_names, &|name| std::env::var(name).ok()).await
}

/// Like [`connect`], with environment lookups going through `lookup`.
///
/// Remote settings are checked before any network call is made.
pub async fn connect_with_env(
    settings: &StorageSettings,
    service_names: &[String],
    lookup: &(dyn Fn(&str) -> Option<String> + Sync),
) -> StorageResult<Arc<dyn Storage>> {
    let names = service_names.iter().cloned();
    let timeout = settings.remote_timeout;

    let storage: Arc<dyn Storage> = match settings.kind {
        StorageKind::Memory => Arc::new(MemoryStorage::new(names)),
        StorageKind::Local => {
            let store = Arc::new(LocalObjectStore::new(&settings.data_dir));
            Arc::new(CachedRemoteStorage::open(store, names, timeout).await?)
        }
        StorageKind::S3 => {
            let config = S3Config::from_lookup(lookup)?;
            let store = Arc::new(S3ObjectStore::new(config));
            Arc::new(CachedRemoteStorage::open(store, names, timeout).await?)
        }
        StorageKind::Firestore => {
            let config = FirestoreConfig::from_lookup(lookup)?;
            let store = Arc::new(FirestoreDocumentStore::new(&config, timeout)?);
            Arc::new(DirectRemoteStorage::new(
                store,
                config.collection_prefix,
                names,
                timeout,
            ))
        }
    };

    tracing::info!(kind = %settings.kind, services = service_names.len(), "storage ready");
    Ok(storage)
}
