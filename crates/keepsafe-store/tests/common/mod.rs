//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use keepsafe_store::{Backend, MemoryBackend, RecordKey, StoreResult};
use std::{
    io::{Error as IoError, ErrorKind},
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

/// Backend wrapper that injects failures into selected primitives.
///
/// Failing copies leave half of the source behind in the destination, and
/// failing writes leave half of the new data in the target, the way an
/// interrupted operation would. A hanging write stores the torn half and
/// then never completes, which lets tests cancel mid-write.
#[derive(Debug, Default)]
pub struct FaultyBackend<B = MemoryBackend> {
    inner: B,
    fail_copy: AtomicBool,
    fail_write: AtomicBool,
    hang_write: AtomicBool,
    fail_delete: AtomicBool,
}

impl FaultyBackend<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::wrap(MemoryBackend::new())
    }
}

impl<B: Backend> FaultyBackend<B> {
    pub fn wrap(inner: B) -> Self {
        Self {
            inner,
            fail_copy: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
            hang_write: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn fail_copies(&self, enable: bool) {
        self.fail_copy.store(enable, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, enable: bool) {
        self.fail_write.store(enable, Ordering::SeqCst);
    }

    pub fn hang_writes(&self, enable: bool) {
        self.hang_write.store(enable, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, enable: bool) {
        self.fail_delete.store(enable, Ordering::SeqCst);
    }
}

#[async_trait]
impl<B: Backend> Backend for FaultyBackend<B> {
    async fn exists(&self, key: &RecordKey) -> StoreResult<bool> {
        self.inner.exists(key).await
    }

    async fn read(&self, key: &RecordKey) -> StoreResult<Bytes> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &RecordKey, data: Bytes) -> StoreResult<()> {
        if self.fail_write.load(Ordering::SeqCst) {
            let torn = data.slice(..data.len() / 2);
            self.inner.write(key, torn).await?;
            return Err(IoError::other("device disconnected mid-write").into());
        }
        if self.hang_write.load(Ordering::SeqCst) {
            let torn = data.slice(..data.len() / 2);
            self.inner.write(key, torn).await?;
            return std::future::pending().await;
        }
        self.inner.write(key, data).await
    }

    async fn copy(&self, src: &RecordKey, dst: &RecordKey) -> StoreResult<()> {
        if self.fail_copy.load(Ordering::SeqCst) {
            let data = self.inner.read(src).await?;
            self.inner.write(dst, data.slice(..data.len() / 2)).await?;
            return Err(IoError::new(ErrorKind::StorageFull, "no space left on device").into());
        }
        self.inner.copy(src, dst).await
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(IoError::new(ErrorKind::PermissionDenied, "entry is read-only").into());
        }
        self.inner.delete(key).await
    }

    async fn list(&self, container: &Path) -> StoreResult<Vec<String>> {
        self.inner.list(container).await
    }
}

pub fn key(name: &str) -> RecordKey {
    RecordKey::new("records", name).expect("Key should be valid")
}
