//! In-memory backend
//!
//! Entries live in a sorted map keyed by `(container, name)`. Copies and
//! deletes are atomic under the map lock. The synchronous `get`/`insert`
//! helpers let tests arrange or inspect on-backend state directly, e.g. to
//! plant a torn primary.

use super::Backend;
use crate::{error::StoreResult, key::RecordKey};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

type EntryMap = BTreeMap<(PathBuf, String), Bytes>;

/// Process-local backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<EntryMap>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of an entry
    pub fn get(&self, key: &RecordKey) -> Option<Bytes> {
        self.entries.read().get(&map_key(key)).cloned()
    }

    /// Place raw bytes at an entry, bypassing any protocol
    pub fn insert(&self, key: &RecordKey, data: impl Into<Bytes>) {
        self.entries.write().insert(map_key(key), data.into());
    }

    /// Total entry count across all containers
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn map_key(key: &RecordKey) -> (PathBuf, String) {
    (key.container().to_path_buf(), key.name().to_string())
}

fn not_found(key: &RecordKey) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("entry not found: {key}"))
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn exists(&self, key: &RecordKey) -> StoreResult<bool> {
        Ok(self.entries.read().contains_key(&map_key(key)))
    }

    async fn read(&self, key: &RecordKey) -> StoreResult<Bytes> {
        self.get(key).ok_or_else(|| not_found(key).into())
    }

    async fn write(&self, key: &RecordKey, data: Bytes) -> StoreResult<()> {
        self.insert(key, data);
        Ok(())
    }

    async fn copy(&self, src: &RecordKey, dst: &RecordKey) -> StoreResult<()> {
        let mut entries = self.entries.write();
        let data = entries
            .get(&map_key(src))
            .cloned()
            .ok_or_else(|| not_found(src))?;
        entries.insert(map_key(dst), data);
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<()> {
        self.entries.write().remove(&map_key(key));
        Ok(())
    }

    async fn list(&self, container: &Path) -> StoreResult<Vec<String>> {
        let names = self
            .entries
            .read()
            .keys()
            .filter(|(entry_container, _)| entry_container == container)
            .map(|(_, name)| name.clone())
            .collect();
        Ok(names)
    }
}
