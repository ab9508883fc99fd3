//! Public read/write API over records
//!
//! [`RecordStore`] composes a [`Backend`], a [`Codec`] and the
//! [`BackupCoordinator`]. Writes stage a backup of the current value, replace
//! the primary, then retire the backup. Reads reconcile first, so a pending
//! backup always wins over whatever is in the primary.
//!
//! # Preconditions
//!
//! At most one write and no concurrent reader may be in flight per key. The
//! store does not lock the primary/backup pair; interleaving operations on
//! the same key can leave a torn primary next to a stale backup.

use crate::{
    backend::Backend,
    codec::{Codec, JsonCodec},
    config::StoreConfig,
    coordinator::{BackupCoordinator, BackupState},
    error::{StoreError, StoreResult},
    key::RecordKey,
    stats::{StoreStats, StoreStatsSnapshot},
};
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::BTreeSet, path::Path};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Crash-consistent record store
#[derive(Debug)]
pub struct RecordStore<B: Backend, C: Codec = JsonCodec> {
    backend: B,
    codec: C,
    config: StoreConfig,
    stats: StoreStats,
}

impl<B: Backend> RecordStore<B, JsonCodec> {
    /// Create a store using compact JSON
    pub fn new(backend: B, config: StoreConfig) -> StoreResult<Self> {
        Self::with_codec(backend, JsonCodec::new(), config)
    }
}

impl<B: Backend, C: Codec> RecordStore<B, C> {
    pub fn with_codec(backend: B, codec: C, config: StoreConfig) -> StoreResult<Self> {
        config
            .validate()
            .map_err(StoreError::InvalidConfiguration)?;

        Ok(Self {
            backend,
            codec,
            config,
            stats: StoreStats::new(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        self.stats.snapshot()
    }

    /// Coordinator bound to this store's backend and suffix
    pub fn coordinator(&self) -> BackupCoordinator<'_, B> {
        BackupCoordinator::new(&self.backend, &self.config.backup_suffix)
    }

    /// Persist `value` as the record's new content.
    ///
    /// On success the primary decodes to `value` and no backup remains. On
    /// failure the original error is returned and the on-backend state is:
    ///
    /// - staging failed: primary unchanged, no new backup
    /// - primary write failed: backup holds the previous value
    /// - retiring failed: primary holds `value` but the backup is still
    ///   present, so the next read restores the previous value
    pub async fn write<T>(&self, key: &RecordKey, value: &T) -> StoreResult<()>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.write_inner(key, value, None).await
    }

    /// Like [`write`](Self::write), honoring `token` until the primary has
    /// been replaced.
    ///
    /// Cancellation observed before or during the primary write returns
    /// [`StoreError::Cancelled`] and leaves any staged backup in place, so
    /// the next read recovers the pre-write value. Once the primary write
    /// completes the token is ignored and the backup is retired.
    pub async fn write_with_cancel<T>(
        &self,
        key: &RecordKey,
        value: &T,
        token: &CancellationToken,
    ) -> StoreResult<()>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.write_inner(key, value, Some(token)).await
    }

    async fn write_inner<T>(
        &self,
        key: &RecordKey,
        value: &T,
        token: Option<&CancellationToken>,
    ) -> StoreResult<()>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.check_key(key)?;

        // Encoding happens up front so a value the codec rejects never
        // touches the backend.
        let data = Bytes::from(self.codec.encode(value)?);

        if token.is_some_and(CancellationToken::is_cancelled) {
            return Err(StoreError::Cancelled);
        }

        let coordinator = self.coordinator();
        if coordinator.stage_backup(key).await? == BackupState::Staged {
            self.stats.record_backup_staged();
        }

        match token {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        warn!("write to {key} cancelled before the primary was replaced");
                        return Err(StoreError::Cancelled);
                    }
                    result = self.backend.write(key, data) => result?,
                }
            }
            None => self.backend.write(key, data).await?,
        }

        coordinator.retire_backup(key).await?;

        self.stats.record_write();
        debug!("wrote record {key}");
        Ok(())
    }

    /// Load the record, recovering from an interrupted write first.
    ///
    /// Returns `Ok(None)` for a record that was never written. A primary that
    /// fails to decode is reported as [`StoreError::CorruptRecord`].
    pub async fn read<T>(&self, key: &RecordKey) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.check_key(key)?;
        self.stats.record_read();

        let coordinator = self.coordinator();

        if !self.backend.exists(key).await? && !coordinator.is_pending(key).await? {
            return Ok(None);
        }

        if coordinator.reconcile(key).await? {
            self.stats.record_recovery();
        }

        if !self.backend.exists(key).await? {
            return Ok(None);
        }

        let data = self.backend.read(key).await?;
        match self.codec.decode(&data) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                self.stats.record_corrupt_read();
                warn!("record {key} failed to decode: {err}");

                let reason = match err {
                    StoreError::Decode(reason) => reason,
                    other => other.to_string(),
                };
                Err(StoreError::CorruptRecord {
                    key: key.to_string(),
                    reason,
                })
            }
        }
    }

    /// True if the record has a primary or a pending backup
    pub async fn contains(&self, key: &RecordKey) -> StoreResult<bool> {
        self.check_key(key)?;
        Ok(self.backend.exists(key).await? || self.coordinator().is_pending(key).await?)
    }

    /// True if an interrupted write left a backup that the next read will
    /// restore
    pub async fn is_pending(&self, key: &RecordKey) -> StoreResult<bool> {
        self.check_key(key)?;
        self.coordinator().is_pending(key).await
    }

    /// Delete both entries of a record. Returns whether anything existed.
    ///
    /// The backup goes first, so an interruption leaves the latest primary
    /// rather than resurrecting an older value.
    pub async fn remove(&self, key: &RecordKey) -> StoreResult<bool> {
        let existed = self.contains(key).await?;

        self.coordinator().retire_backup(key).await?;
        self.backend.delete(key).await?;

        Ok(existed)
    }

    /// Names of the records in `container`, sorted.
    ///
    /// A pending backup is reported under its record's name, even when the
    /// primary itself is missing.
    pub async fn list(&self, container: &Path) -> StoreResult<Vec<String>> {
        let suffix = self.config.backup_suffix.as_str();
        let names: BTreeSet<String> = self
            .backend
            .list(container)
            .await?
            .into_iter()
            .map(|name| match name.strip_suffix(suffix) {
                Some(record) if !record.is_empty() => record.to_string(),
                _ => name,
            })
            .collect();

        Ok(names.into_iter().collect())
    }

    /// Encode `value` straight into `writer`, without the backup protocol.
    pub async fn save<W, T>(&self, writer: &mut W, value: &T) -> StoreResult<()>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
        T: Serialize + ?Sized + Sync,
    {
        let data = self.codec.encode(value)?;
        writer.write_all(&data).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Decode a value from the whole of `reader`, without the backup
    /// protocol. Malformed input is a [`StoreError::Decode`].
    pub async fn load<R, T>(&self, reader: &mut R) -> StoreResult<T>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
        T: DeserializeOwned,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.codec.decode(&data)
    }

    /// Reject names that would alias another record's backup entry
    fn check_key(&self, key: &RecordKey) -> StoreResult<()> {
        if key.name().ends_with(&self.config.backup_suffix) {
            return Err(StoreError::InvalidArgument(format!(
                "record name cannot end with the backup suffix {:?}: {}",
                self.config.backup_suffix,
                key.name()
            )));
        }

        Ok(())
    }
}
