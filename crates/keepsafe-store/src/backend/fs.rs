//! General-purpose filesystem backend
//!
//! Entries are plain files at `container/name`. Writes and copies land in a
//! hidden temporary sibling first and are renamed onto the target once
//! complete, so a crash never leaves a partial file under an entry name.
//! Orphaned temporaries are skipped by `list` and never read.

use super::Backend;
use crate::{config::FsBackendConfig, error::StoreResult, key::RecordKey};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};

const TEMP_MARKER: &str = ".keepsafe-";
const TEMP_EXTENSION: &str = ".tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem backend where containers are directories
#[derive(Debug, Clone, Default)]
pub struct FsBackend {
    config: FsBackendConfig,
}

impl FsBackend {
    /// Create a backend with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FsBackendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FsBackendConfig {
        &self.config
    }
}

#[async_trait]
impl Backend for FsBackend {
    async fn exists(&self, key: &RecordKey) -> StoreResult<bool> {
        file_exists(&key.path()).await
    }

    async fn read(&self, key: &RecordKey) -> StoreResult<Bytes> {
        read_file(&key.path()).await
    }

    async fn write(&self, key: &RecordKey, data: Bytes) -> StoreResult<()> {
        write_file(&key.path(), &data, &self.config).await
    }

    async fn copy(&self, src: &RecordKey, dst: &RecordKey) -> StoreResult<()> {
        copy_file(&src.path(), &dst.path(), &self.config).await
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<()> {
        delete_file(&key.path()).await
    }

    async fn list(&self, container: &Path) -> StoreResult<Vec<String>> {
        list_files(container).await
    }
}

// Path-level primitives, shared with the sandboxed backend once it has
// resolved a key to a concrete path.

/// Temporary file that is removed on drop unless persisted
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    /// Reserve a unique hidden sibling of `target`
    fn beside(target: &Path) -> Self {
        let name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let file_name = format!(
            ".{name}{TEMP_MARKER}{}-{seq}{TEMP_EXTENSION}",
            std::process::id()
        );

        Self {
            path: target.with_file_name(file_name),
            armed: true,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Rename onto `target`.
    ///
    /// The rename is synchronous so that a dropped future can never leave
    /// it in flight on the blocking pool.
    fn persist(mut self, target: &Path) -> StoreResult<()> {
        std::fs::rename(&self.path, target)?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// True for names produced by [`TempFile::beside`]
fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.contains(TEMP_MARKER) && name.ends_with(TEMP_EXTENSION)
}

pub(super) async fn file_exists(path: &Path) -> StoreResult<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn read_file(path: &Path) -> StoreResult<Bytes> {
    let data = fs::read(path).await?;
    Ok(Bytes::from(data))
}

pub(super) async fn write_file(
    path: &Path,
    data: &[u8],
    config: &FsBackendConfig,
) -> StoreResult<()> {
    if config.create_dirs
        && let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }

    let temp = TempFile::beside(path);
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp.path())
            .await?;

        file.write_all(data).await?;
        file.flush().await?;

        if config.sync_writes {
            file.sync_all().await?;
        }
    }

    temp.persist(path)?;

    if config.sync_writes {
        sync_parent(path).await?;
    }

    Ok(())
}

pub(super) async fn copy_file(
    src: &Path,
    dst: &Path,
    config: &FsBackendConfig,
) -> StoreResult<()> {
    let temp = TempFile::beside(dst);
    fs::copy(src, temp.path()).await?;

    if config.sync_writes {
        let file = OpenOptions::new().write(true).open(temp.path()).await?;
        file.sync_all().await?;
    }

    temp.persist(dst)?;

    if config.sync_writes {
        sync_parent(dst).await?;
    }

    Ok(())
}

/// Make a rename inside the parent directory durable
#[cfg(unix)]
async fn sync_parent(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::File::open(parent).await?.sync_all().await?;
    }

    Ok(())
}

#[cfg(not(unix))]
async fn sync_parent(_path: &Path) -> StoreResult<()> {
    Ok(())
}

pub(super) async fn delete_file(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub(super) async fn list_files(dir: &Path) -> StoreResult<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }

        // Names that are not valid UTF-8 cannot belong to a record key
        if let Some(name) = entry.file_name().to_str()
            && !is_temp_name(name)
        {
            names.push(name.to_string());
        }
    }

    names.sort_unstable();
    Ok(names)
}
