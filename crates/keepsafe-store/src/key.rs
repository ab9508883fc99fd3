//! Record keys
//!
//! A record is addressed by a container (a directory, or a folder inside a
//! sandboxed storage area) and a leaf entry name inside it.

use crate::error::{StoreError, StoreResult};
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Identifies one record: `(container, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    container: PathBuf,
    name: String,
}

impl RecordKey {
    /// Create a key, validating both parts.
    ///
    /// The container must be non-empty. The name must not be blank, must not
    /// be `.` or `..` and must not contain path separators or NUL bytes.
    pub fn new(container: impl Into<PathBuf>, name: impl Into<String>) -> StoreResult<Self> {
        let container = container.into();
        let name = name.into();

        if container.as_os_str().is_empty() {
            return Err(StoreError::InvalidArgument(
                "container cannot be empty".to_string(),
            ));
        }

        validate_name(&name)?;

        Ok(Self { container, name })
    }

    /// Split a full entry path into container and name.
    ///
    /// A bare file name resolves against the current directory.
    pub fn from_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StoreError::InvalidArgument(format!(
                    "path has no valid file name: {}",
                    path.display()
                ))
            })?;

        let container = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Self::new(container, name)
    }

    pub fn container(&self) -> &Path {
        &self.container
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the sibling entry named `name + suffix` in the same container.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            container: self.container.clone(),
            name: format!("{}{suffix}", self.name),
        }
    }

    /// Joined `container/name` path
    pub fn path(&self) -> PathBuf {
        self.container.join(&self.name)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

fn validate_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidArgument(
            "name cannot be empty or whitespace".to_string(),
        ));
    }

    if name == "." || name == ".." {
        return Err(StoreError::InvalidArgument(format!(
            "name cannot be a relative path component: {name}"
        )));
    }

    if name.contains(['/', '\\', '\0']) {
        return Err(StoreError::InvalidArgument(format!(
            "name cannot contain path separators: {name}"
        )));
    }

    Ok(())
}
