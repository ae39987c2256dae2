//! In-memory object store with call counters and fault injection

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::ObjectStore;
use crate::storage::errors::{RemoteError, RemoteResult};

/// Number of calls per operation seen by a [`MemoryObjectStore`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectStoreCalls {
    pub put: usize,
    pub get: usize,
    pub delete: usize,
    pub list: usize,
}

impl ObjectStoreCalls {
    pub fn total(&self) -> usize {
        self.put + self.get + self.delete + self.list
    }
}

/// Bucket held in a map. Counts every call, and can be told to fail or to
/// stall so callers' timeout and failure paths can be driven.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    put_calls: AtomicUsize,
    get_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    list_calls: AtomicUsize,
    failing: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object without counting a call
    pub fn insert_raw(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.lock().insert(key.into(), data.into());
    }

    /// Reads an object without counting a call
    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    /// All keys currently stored
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn calls(&self) -> ObjectStoreCalls {
        ObjectStoreCalls {
            put: self.put_calls.load(Ordering::SeqCst),
            get: self.get_calls.load(Ordering::SeqCst),
            delete: self.delete_calls.load(Ordering::SeqCst),
            list: self.list_calls.load(Ordering::SeqCst),
        }
    }

    /// Makes every following call fail with `Unavailable` until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every following call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // a panic while holding the lock cannot leave the map half-written
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, counter: &AtomicUsize) -> RemoteResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> RemoteResult<()> {
        self.enter(&self.put_calls).await?;
        self.lock().insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> RemoteResult<Vec<u8>> {
        self.enter(&self.get_calls).await?;
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> RemoteResult<()> {
        self.enter(&self.delete_calls).await?;
        self.lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> RemoteResult<Vec<String>> {
        self.enter(&self.list_calls).await?;
        Ok(self
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
