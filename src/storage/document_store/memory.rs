//! In-memory document store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Document, DocumentStore};
use crate::storage::errors::{RemoteError, RemoteResult};

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// Collections held in nested maps, with a call counter and a failure switch
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<Collections>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a document as-is, bypassing counters and failure injection
    pub fn insert_raw(&self, collection: &str, id: &str, document: Document) {
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    pub fn get_raw(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock().get(collection).and_then(|c| c.get(id)).cloned()
    }

    /// Total number of trait calls served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self) -> RemoteResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn set(&self, collection: &str, id: &str, document: Document) -> RemoteResult<()> {
        self.enter()?;
        self.insert_raw(collection, id, document);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> RemoteResult<Option<Document>> {
        self.enter()?;
        Ok(self.get_raw(collection, id))
    }

    async fn list(&self, collection: &str) -> RemoteResult<Vec<(String, Document)>> {
        self.enter()?;
        Ok(self
            .lock()
            .get(collection)
            .map(|docs| docs.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<bool> {
        self.enter()?;
        Ok(self
            .lock()
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }
}
