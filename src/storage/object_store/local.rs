//! # Local Filesystem Object Store
//!
//! A directory tree standing in for a bucket: key `people/<id>.json` lives
//! at `<root>/people/<id>.json`. Writes go to a hidden temporary file first
//! and are renamed into place.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::ObjectStore;
use crate::storage::errors::{RemoteError, RemoteResult};

/// Local filesystem object store
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, key: &str) -> RemoteResult<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !is_plain {
            return Err(RemoteError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

fn io_error(key: &str, e: std::io::Error) -> RemoteError {
    if e.kind() == ErrorKind::NotFound {
        RemoteError::NotFound(key.to_string())
    } else {
        RemoteError::Io(e.to_string())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> RemoteResult<()> {
        let full_path = self.full_path(key)?;

        // Create parent directories
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RemoteError::Io(e.to_string()))?;
        }

        let file_name = full_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| RemoteError::InvalidKey(key.to_string()))?;
        let temp_path = full_path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&temp_path, &data)
            .await
            .map_err(|e| RemoteError::Io(e.to_string()))?;
        fs::rename(&temp_path, &full_path)
            .await
            .map_err(|e| RemoteError::Io(e.to_string()))
    }

    async fn get(&self, key: &str) -> RemoteResult<Vec<u8>> {
        let full_path = self.full_path(key)?;
        fs::read(&full_path).await.map_err(|e| io_error(key, e))
    }

    async fn delete(&self, key: &str) -> RemoteResult<()> {
        let full_path = self.full_path(key)?;
        fs::remove_file(&full_path).await.map_err(|e| io_error(key, e))
    }

    async fn list(&self, prefix: &str) -> RemoteResult<Vec<String>> {
        let dir_key = prefix.trim_end_matches('/');
        let dir = self.full_path(dir_key)?;
        let mut results = Vec::new();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(results),
            Err(e) => return Err(RemoteError::Io(e.to_string())),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RemoteError::Io(e.to_string()))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| RemoteError::Io(e.to_string()))?
                .is_file();
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                // skip in-flight temporary files
                if !name.starts_with('.') {
                    results.push(format!("{}/{}", dir_key, name));
                }
            }
        }

        results.sort();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        store.put("people/1.json", b"hello".to_vec()).await.unwrap();
        let data = store.get("people/1.json").await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn test_overwrite() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        store.put("a/b.json", b"one".to_vec()).await.unwrap();
        store.put("a/b.json", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("a/b.json").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        store.put("people/b.json", b"{}".to_vec()).await.unwrap();
        store.put("people/a.json", b"{}".to_vec()).await.unwrap();
        store.put("dogs/c.json", b"{}".to_vec()).await.unwrap();

        let keys = store.list("people/").await.unwrap();
        assert_eq!(keys, vec!["people/a.json", "people/b.json"]);
        assert!(store.list("cats/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        store.put("people/1.json", b"bye".to_vec()).await.unwrap();
        store.delete("people/1.json").await.unwrap();
        assert!(matches!(
            store.get("people/1.json").await,
            Err(RemoteError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("people/1.json").await,
            Err(RemoteError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_escaping_keys_rejected() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        for key in ["../outside.json", "/etc/passwd", "", "a/../../b", "a\\b"] {
            assert!(
                matches!(store.put(key, b"x".to_vec()).await, Err(RemoteError::InvalidKey(_))),
                "{key:?}"
            );
        }
    }
}
