//! Store and backend configuration
//!
//! Configuration objects are constructed by the caller and handed to the
//! store or backend explicitly. There is no process-wide default instance.

use serde::{Deserialize, Serialize};

/// Suffix appended to a record name to form its backup entry name
pub const DEFAULT_BACKUP_SUFFIX: &str = ".old";

/// Record store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Suffix for backup entries (`name + suffix`)
    pub backup_suffix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

impl StoreConfig {
    /// Create a new store configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backup suffix
    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.backup_suffix.trim().is_empty() {
            return Err("backup_suffix cannot be empty or whitespace".to_string());
        }

        if self.backup_suffix.contains(['/', '\\']) {
            return Err("backup_suffix cannot contain path separators".to_string());
        }

        Ok(())
    }
}

/// Filesystem backend configuration
///
/// Shared by the general-purpose and the sandboxed filesystem backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsBackendConfig {
    /// Flush file contents to stable storage before a write or copy returns
    pub sync_writes: bool,
    /// Create missing container directories on write
    pub create_dirs: bool,
}

impl Default for FsBackendConfig {
    fn default() -> Self {
        Self {
            sync_writes: true,
            create_dirs: true,
        }
    }
}

impl FsBackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable syncing after writes
    pub fn with_sync_writes(mut self, enable: bool) -> Self {
        self.sync_writes = enable;
        self
    }

    /// Enable or disable creating missing container directories
    pub fn with_create_dirs(mut self, enable: bool) -> Self {
        self.create_dirs = enable;
        self
    }
}
