//! Filesystem operations module.
//!
//! Low-level helpers shared by the stages:
//! - Checking that a source directory exists
//! - Creating directories recursively
//! - Removing stale files before a fresh write

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::DeployError;

/// Fail with `SourceNotFound` unless `path` is an existing directory.
pub fn require_directory(path: &Path) -> Result<(), DeployError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        _ => Err(DeployError::SourceNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Ensure `path` exists as a directory, creating it and all ancestors.
///
/// # Errors
/// Returns `DirectoryCreationFailed` if creation fails or `path` exists but
/// is not a directory.
pub fn ensure_dir_exists(path: &Path) -> Result<(), DeployError> {
    match fs::metadata(path) {
        Ok(metadata) => {
            if metadata.is_dir() {
                Ok(())
            } else {
                Err(DeployError::DirectoryCreationFailed {
                    path: path.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Path exists but is not a directory",
                    ),
                })
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "creating directory");
            fs::create_dir_all(path).map_err(|e| DeployError::DirectoryCreationFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(DeployError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Ensure the parent directory of a path exists, creating it if necessary.
pub fn ensure_parent_dir_exists(path: &Path) -> Result<(), DeployError> {
    match path.parent() {
        // Skip if parent is empty path (relative root)
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir_exists(parent),
        _ => Ok(()),
    }
}

/// Remove the file at `path` if one exists.
///
/// Returns whether a file was removed. A directory at `path` is an error:
/// stale outputs are always single files.
pub fn remove_existing_file(path: &Path) -> Result<bool, DeployError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => Err(DeployError::RemoveFailed {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "Path is a directory"),
        }),
        Ok(_) => {
            fs::remove_file(path).map_err(|e| DeployError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            debug!(path = %path.display(), "removed stale file");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DeployError::RemoveFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
