//! Store counters
//!
//! Lock-free counters recorded by [`crate::RecordStore`]. A recovery count
//! above zero means at least one read found a pending backup and rolled the
//! record back to it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters
#[derive(Debug, Default)]
pub struct StoreStats {
    reads: AtomicU64,
    writes: AtomicU64,
    backups_staged: AtomicU64,
    recoveries: AtomicU64,
    corrupt_reads: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub backups_staged: u64,
    pub recoveries: u64,
    pub corrupt_reads: u64,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_backup_staged(&self) {
        self.backups_staged.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_recovery(&self) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_corrupt_read(&self) {
        self.corrupt_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            backups_staged: self.backups_staged.load(Ordering::Relaxed),
            recoveries: self.recoveries.load(Ordering::Relaxed),
            corrupt_reads: self.corrupt_reads.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.backups_staged.store(0, Ordering::Relaxed);
        self.recoveries.store(0, Ordering::Relaxed);
        self.corrupt_reads.store(0, Ordering::Relaxed);
    }
}
