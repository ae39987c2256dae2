//! Concurrency Tests
//!
//! Parallel callers on a shared backend:
//! - no add is lost and every id is unique
//! - the cached mirror and the object store agree afterwards
//! - concurrent deletes of one id succeed exactly once

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use schemastore::storage::{
    object_key, CachedRemoteStorage, DirectRemoteStorage, MemoryDocumentStore, MemoryObjectStore,
    MemoryStorage, Storage,
};
use serde_json::json;

const TIMEOUT: Duration = Duration::from_secs(5);
const TASKS: usize = 16;
const ADDS_PER_TASK: usize = 25;

async fn add_concurrently(storage: Arc<dyn Storage>) -> Vec<String> {
    let mut handles = Vec::new();
    for task in 0..TASKS {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for n in 0..ADDS_PER_TASK {
                let entity = storage
                    .add("people", json!({"task": task, "n": n}))
                    .await
                    .unwrap();
                ids.push(entity.id);
            }
            ids
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.extend(handle.await.unwrap());
    }
    ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_adds_lose_nothing() {
    let backends: Vec<Arc<dyn Storage>> = vec![
        Arc::new(MemoryStorage::new(["people"])),
        Arc::new(
            CachedRemoteStorage::open(Arc::new(MemoryObjectStore::new()), ["people"], TIMEOUT)
                .await
                .unwrap(),
        ),
        Arc::new(DirectRemoteStorage::new(
            Arc::new(MemoryDocumentStore::new()),
            "",
            ["people"],
            TIMEOUT,
        )),
    ];

    for storage in backends {
        let ids = add_concurrently(Arc::clone(&storage)).await;

        let unique: HashSet<_> = ids.iter().cloned().collect();
        assert_eq!(unique.len(), TASKS * ADDS_PER_TASK, "{storage:?}");

        let listed: HashSet<_> = storage
            .list("people")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(listed, unique);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mirror_matches_store_after_mixed_writes() {
    let store = Arc::new(MemoryObjectStore::new());
    store.set_latency(Duration::from_millis(1));
    let storage = Arc::new(
        CachedRemoteStorage::open(store.clone(), ["people"], TIMEOUT)
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for task in 0..8 {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            for n in 0..10 {
                let entity = storage.add("people", json!({"task": task, "n": n})).await.unwrap();
                if n % 2 == 0 {
                    storage.delete("people", &entity.id).await.unwrap();
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mirrored: Vec<String> = storage
        .list("people")
        .await
        .unwrap()
        .iter()
        .map(|e| object_key("people", &e.id))
        .collect();
    assert_eq!(mirrored.len(), 40);

    let mut mirrored_sorted = mirrored.clone();
    mirrored_sorted.sort();
    assert_eq!(store.keys(), mirrored_sorted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deletes_of_one_id() {
    let storage: Arc<dyn Storage> = Arc::new(
        CachedRemoteStorage::open(Arc::new(MemoryObjectStore::new()), ["people"], TIMEOUT)
            .await
            .unwrap(),
    );
    let entity = storage.add("people", json!({})).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let storage = Arc::clone(&storage);
        let id = entity.id.clone();
        handles.push(tokio::spawn(async move { storage.delete("people", &id).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => succeeded += 1,
            Err(e) => assert!(e.is_not_found()),
        }
    }
    assert_eq!(succeeded, 1);
}
