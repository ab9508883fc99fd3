//! Crash-consistent record persistence
//!
//! A record is a single serialized value stored under a name inside a
//! container: a directory on disk, a folder inside a sandboxed storage area,
//! or an in-memory map. Writes may be interrupted at any point by a crash,
//! power loss or cancellation. The store keeps one prior generation of each
//! record as a backup so that readers never see a torn write when a complete
//! earlier value is still recoverable.
//!
//! # Protocol
//!
//! ```text
//! write(key, V2)                        read(key)
//! ──────────────                        ─────────
//! 1. copy  name -> name.old             1. name.old present?
//!    (skipped if name.old exists)          copy name.old -> name
//! 2. write name <- encode(V2)              delete name.old
//! 3. delete name.old                    2. decode name
//! ```
//!
//! Only entry copy and entry delete are assumed atomic. The primary write
//! itself can be torn; a backup left behind by an interrupted write is
//! treated as authoritative on the next read.
//!
//! Because a read cannot tell a torn primary from a complete one whose
//! backup was never deleted, a write that fails in step 3 reads back as the
//! previous value.
//!
//! # Concurrency
//!
//! Operations are async. The store assumes a single writer and no concurrent
//! readers per key; it takes no locks around the primary/backup pair.
//!
//! # Example
//!
//! ```rust,no_run
//! use keepsafe_store::{FsBackend, RecordKey, RecordStore, StoreConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Settings {
//!     theme: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RecordStore::new(FsBackend::new(), StoreConfig::default())?;
//! let key = RecordKey::new("/var/lib/myapp", "settings.json")?;
//!
//! store.write(&key, &Settings { theme: "dark".into() }).await?;
//! let settings: Option<Settings> = store.read(&key).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)] // Builder patterns

#[allow(missing_docs)]
pub mod backend;
pub mod codec;
pub mod config;
#[allow(missing_docs)]
pub mod coordinator;
pub mod error;
#[allow(missing_docs)]
pub mod key;
#[allow(missing_docs)]
pub mod stats;
pub mod store;

pub use backend::{Backend, FsBackend, MemoryBackend, SandboxBackend};
pub use codec::{Codec, JsonCodec};
pub use config::{DEFAULT_BACKUP_SUFFIX, FsBackendConfig, StoreConfig};
pub use coordinator::{BackupCoordinator, BackupState};
pub use error::{StoreError, StoreResult};
pub use key::RecordKey;
pub use stats::{StoreStats, StoreStatsSnapshot};
pub use store::RecordStore;

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits

    pub use crate::{
        Backend, BackupCoordinator, BackupState, Codec, FsBackend, FsBackendConfig, JsonCodec,
        MemoryBackend, RecordKey, RecordStore, SandboxBackend, StoreConfig, StoreError,
        StoreResult,
    };
}
