//! Primary/backup transitions for a single record
//!
//! Every record has at most two entries on the backend: the primary at the
//! key itself and a backup at `name + suffix`. A backup is only ever created
//! by copying a primary *before* a write starts, so when one is present it
//! holds the last value known to be complete.
//!
//! ```text
//!   Empty (-, -) --write--> Stable (V, -) --stage--> Pending (V|torn, V)
//!                                ^                          |
//!                                +--- retire / reconcile ---+
//! ```
//!
//! Reconciliation cannot tell a torn primary from a complete one whose backup
//! was never retired. In both cases the backup wins, so a write that finished
//! its primary but failed to retire reads back as the previous value.

use crate::{backend::Backend, error::StoreResult, key::RecordKey};
use tracing::{debug, warn};

/// Outcome of [`BackupCoordinator::stage_backup`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    /// The primary was copied to a fresh backup
    Staged,
    /// A backup from an interrupted write is still pending; left untouched
    AlreadyStaged,
    /// No primary exists, nothing to protect
    NoPriorState,
}

/// Owns the naming convention and state transitions of a record's
/// primary/backup pair.
///
/// Holds no state of its own. Callers must not run two operations on the
/// same key concurrently; the pair is not locked.
#[derive(Debug)]
pub struct BackupCoordinator<'a, B: Backend + ?Sized> {
    backend: &'a B,
    suffix: &'a str,
}

impl<'a, B: Backend + ?Sized> BackupCoordinator<'a, B> {
    pub fn new(backend: &'a B, suffix: &'a str) -> Self {
        Self { backend, suffix }
    }

    pub fn suffix(&self) -> &str {
        self.suffix
    }

    pub fn backup_key(&self, key: &RecordKey) -> RecordKey {
        key.with_suffix(self.suffix)
    }

    /// True while a backup is waiting to be retired or reconciled
    pub async fn is_pending(&self, key: &RecordKey) -> StoreResult<bool> {
        self.backend.exists(&self.backup_key(key)).await
    }

    /// Copy the primary to the backup ahead of a write.
    ///
    /// An existing backup is never overwritten: it belongs to an earlier
    /// interrupted write and is the only copy of the last good value. If the
    /// copy fails, any partial backup is removed and the copy error is
    /// returned as-is.
    pub async fn stage_backup(&self, key: &RecordKey) -> StoreResult<BackupState> {
        let backup = self.backup_key(key);

        if self.backend.exists(&backup).await? {
            debug!("backup {backup} already pending, keeping it");
            return Ok(BackupState::AlreadyStaged);
        }

        if !self.backend.exists(key).await? {
            return Ok(BackupState::NoPriorState);
        }

        if let Err(err) = self.backend.copy(key, &backup).await {
            if let Err(cleanup_err) = self.backend.delete(&backup).await {
                warn!("failed to remove partial backup {backup} after copy error: {cleanup_err}");
            }
            return Err(err);
        }

        debug!("staged backup {backup}");
        Ok(BackupState::Staged)
    }

    /// Delete the backup. Deleting an absent backup is not an error.
    ///
    /// Only call this once the new primary is completely written, and await
    /// it: a backup left behind makes the next read roll the record back.
    pub async fn retire_backup(&self, key: &RecordKey) -> StoreResult<()> {
        let backup = self.backup_key(key);
        self.backend.delete(&backup).await?;
        debug!("retired backup {backup}");
        Ok(())
    }

    /// Restore a pending backup over the primary and drop it.
    ///
    /// Returns `true` if a recovery happened.
    pub async fn reconcile(&self, key: &RecordKey) -> StoreResult<bool> {
        let backup = self.backup_key(key);

        if !self.backend.exists(&backup).await? {
            return Ok(false);
        }

        warn!("found pending backup {backup}, restoring it over {key}");
        self.backend.copy(&backup, key).await?;
        self.backend.delete(&backup).await?;

        Ok(true)
    }
}
