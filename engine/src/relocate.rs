//! ArchiveRelocator: move a finished archive into its final location.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::DeployError;
use crate::fs_ops;

/// Moves a complete archive over whatever occupies the destination.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveRelocator;

impl ArchiveRelocator {
    pub fn new() -> Self {
        ArchiveRelocator
    }

    /// Rename `archive` to `destination`, replacing any existing file.
    ///
    /// The rename replaces an existing destination atomically on platforms
    /// that support it. If the platform refuses, the old file is removed and
    /// the rename retried; a failure between the two steps leaves the
    /// destination absent, never half-written.
    ///
    /// # Errors
    /// - `RelocationFailed` if `archive` is missing, the destination is a
    ///   directory, or the rename fails (cross-device, permissions)
    /// - `DirectoryCreationFailed` if the destination's parent cannot be created
    pub fn relocate(&self, archive: &Path, destination: &Path) -> Result<(), DeployError> {
        let failed = |cause: String| DeployError::RelocationFailed {
            path: destination.to_path_buf(),
            cause,
        };

        match fs::metadata(archive) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(failed(format!("{} is not a file", archive.display()))),
            Err(e) => {
                return Err(failed(format!(
                    "archive {} not found: {e}",
                    archive.display()
                )))
            }
        }

        fs_ops::ensure_parent_dir_exists(destination)?;

        if destination.is_dir() {
            return Err(failed("destination is a directory".to_string()));
        }

        match fs::rename(archive, destination) {
            Ok(()) => {}
            Err(e) if destination.exists() && e.kind() != io::ErrorKind::NotFound => {
                warn!(error = %e, "rename over existing archive refused; removing it first");
                fs_ops::remove_existing_file(destination)?;
                fs::rename(archive, destination).map_err(|e| failed(e.to_string()))?;
            }
            Err(e) => return Err(failed(e.to_string())),
        }

        debug!(from = %archive.display(), "archive renamed");
        info!(destination = %destination.display(), "archive relocated");
        Ok(())
    }
}
