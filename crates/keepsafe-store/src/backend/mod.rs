//! Storage primitives the backup protocol is built on
//!
//! A [`Backend`] is an opaque, byte-addressable container of named entries.
//! The protocol assumes only that `copy` and `delete` are atomic at the leaf
//! level; `write` may be torn by a crash.
//!
//! # Implementors
//!
//! - [`FsBackend`] - general-purpose filesystem, containers are directories
//! - [`SandboxBackend`] - containers are folders inside one storage root
//! - [`MemoryBackend`] - in-process map for tests and ephemeral stores

use crate::{error::StoreResult, key::RecordKey};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

mod fs;
mod memory;
mod sandbox;

pub use fs::FsBackend;
pub use memory::MemoryBackend;
pub use sandbox::SandboxBackend;

/// Primitive entry operations.
///
/// Errors are reported as [`crate::StoreError::Backend`] carrying the
/// underlying `std::io::Error`, so callers can inspect its kind.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn exists(&self, key: &RecordKey) -> StoreResult<bool>;

    /// Fails with `NotFound` when the entry is absent.
    async fn read(&self, key: &RecordKey) -> StoreResult<Bytes>;

    /// Creates the entry or truncates and replaces its contents.
    async fn write(&self, key: &RecordKey, data: Bytes) -> StoreResult<()>;

    /// Fails with `NotFound` when `src` is absent; replaces `dst` if present.
    async fn copy(&self, src: &RecordKey, dst: &RecordKey) -> StoreResult<()>;

    /// Succeeds without doing anything when the entry is absent.
    async fn delete(&self, key: &RecordKey) -> StoreResult<()>;

    /// Entry names directly inside `container`, sorted. A missing container
    /// lists as empty.
    async fn list(&self, container: &Path) -> StoreResult<Vec<String>>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    async fn exists(&self, key: &RecordKey) -> StoreResult<bool> {
        (**self).exists(key).await
    }

    async fn read(&self, key: &RecordKey) -> StoreResult<Bytes> {
        (**self).read(key).await
    }

    async fn write(&self, key: &RecordKey, data: Bytes) -> StoreResult<()> {
        (**self).write(key, data).await
    }

    async fn copy(&self, src: &RecordKey, dst: &RecordKey) -> StoreResult<()> {
        (**self).copy(src, dst).await
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<()> {
        (**self).delete(key).await
    }

    async fn list(&self, container: &Path) -> StoreResult<Vec<String>> {
        (**self).list(container).await
    }
}
