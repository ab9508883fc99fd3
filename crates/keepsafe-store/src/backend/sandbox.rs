//! Sandboxed storage backend
//!
//! Models an application storage area: every container is a folder path
//! relative to a single root, and nothing outside the root is reachable.
//! Keys whose container is absolute or climbs out with `..` are rejected
//! before any I/O happens.

use super::{
    Backend,
    fs::{copy_file, delete_file, file_exists, list_files, read_file, write_file},
};
use crate::{
    config::FsBackendConfig,
    error::{StoreError, StoreResult},
    key::RecordKey,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};

/// Backend confined to one storage root
#[derive(Debug, Clone)]
pub struct SandboxBackend {
    root: PathBuf,
    config: FsBackendConfig,
}

impl SandboxBackend {
    /// Open (and create if needed) a storage area at `root`
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::with_config(root, FsBackendConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: FsBackendConfig) -> StoreResult<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfiguration(
                "sandbox root cannot be empty".to_string(),
            ));
        }

        std::fs::create_dir_all(&root)?;

        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a relative container to its folder inside the root
    fn resolve_container(&self, container: &Path) -> StoreResult<PathBuf> {
        let mut resolved = self.root.clone();

        for component in container.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StoreError::InvalidArgument(format!(
                        "container escapes the storage area: {}",
                        container.display()
                    )));
                }
            }
        }

        Ok(resolved)
    }

    fn resolve(&self, key: &RecordKey) -> StoreResult<PathBuf> {
        Ok(self.resolve_container(key.container())?.join(key.name()))
    }
}

#[async_trait]
impl Backend for SandboxBackend {
    async fn exists(&self, key: &RecordKey) -> StoreResult<bool> {
        file_exists(&self.resolve(key)?).await
    }

    async fn read(&self, key: &RecordKey) -> StoreResult<Bytes> {
        read_file(&self.resolve(key)?).await
    }

    async fn write(&self, key: &RecordKey, data: Bytes) -> StoreResult<()> {
        write_file(&self.resolve(key)?, &data, &self.config).await
    }

    async fn copy(&self, src: &RecordKey, dst: &RecordKey) -> StoreResult<()> {
        let src = self.resolve(src)?;
        let dst = self.resolve(dst)?;
        copy_file(&src, &dst, &self.config).await
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<()> {
        delete_file(&self.resolve(key)?).await
    }

    async fn list(&self, container: &Path) -> StoreResult<Vec<String>> {
        list_files(&self.resolve_container(container)?).await
    }
}
