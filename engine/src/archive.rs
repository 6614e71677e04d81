//! ArchiveBuilder: pack a directory into a fresh zip archive.
//!
//! Tool selection:
//! 1. Probe the primary compressor.
//! 2. If the probe succeeds, build with the primary; its failure is final.
//! 3. Otherwise build with the secondary, which force-overwrites.
//!
//! Any archive already at the output path is deleted first. Archivers
//! like `7z a` update an existing archive in place, so skipping this step
//! would leak entries from a previous build into the new one.

use std::path::Path;

use tracing::{info, warn};

use crate::error::DeployError;
use crate::fs_ops;
use crate::model::ArchiveResult;
use crate::tools::Compressor;

/// Builds archives with a primary compressor and a fallback.
pub struct ArchiveBuilder<'a> {
    primary: &'a dyn Compressor,
    secondary: &'a dyn Compressor,
}

impl<'a> ArchiveBuilder<'a> {
    pub fn new(primary: &'a dyn Compressor, secondary: &'a dyn Compressor) -> Self {
        ArchiveBuilder { primary, secondary }
    }

    /// Build a zip of every entry under `source_dir` at `output_path`.
    ///
    /// Tool failures are returned as `Ok(ArchiveResult::Failed)`, which the
    /// pipeline treats as fatal.
    ///
    /// # Errors
    /// - `SourceNotFound` if `source_dir` is not a directory
    /// - `RemoveFailed` if a stale archive cannot be deleted
    /// - `DirectoryCreationFailed` if the output's parent cannot be created
    pub fn build(&self, source_dir: &Path, output_path: &Path) -> Result<ArchiveResult, DeployError> {
        fs_ops::require_directory(source_dir)?;

        if fs_ops::remove_existing_file(output_path)? {
            info!(path = %output_path.display(), "removed stale archive");
        }
        fs_ops::ensure_parent_dir_exists(output_path)?;

        let tool = self.select_tool();
        info!(
            tool = tool.name(),
            source = %source_dir.display(),
            output = %output_path.display(),
            "building archive"
        );

        match tool.build(source_dir, output_path) {
            Ok(()) => Ok(ArchiveResult::BuiltWith(tool.name().to_string())),
            Err(DeployError::ToolLaunchFailed { tool: name, source }) => {
                let unavailable = DeployError::ArchiveToolUnavailable { tool: name };
                warn!(error = %source, "{unavailable}");
                Ok(ArchiveResult::Failed(format!("{unavailable} ({source})")))
            }
            Err(DeployError::ArchiveBuildFailed { reason }) => Ok(ArchiveResult::Failed(reason)),
            Err(other) => Ok(ArchiveResult::Failed(other.to_string())),
        }
    }

    fn select_tool(&self) -> &'a dyn Compressor {
        if self.primary.probe() {
            self.primary
        } else {
            info!(
                tool = self.primary.name(),
                fallback = self.secondary.name(),
                "archive tool unavailable; using fallback"
            );
            self.secondary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockCompressor;
    use std::fs;
    use std::path::PathBuf;

    fn compressor(name: &'static str, available: bool) -> MockCompressor {
        let mut tool = MockCompressor::new();
        tool.expect_name().return_const(name);
        tool.expect_probe().return_const(available);
        tool
    }

    fn scratch() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("client");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::write(src.join("mod.lua"), "print(1)").expect("Failed to write file");
        let out = temp_dir.path().join("Mod.zip");
        (temp_dir, src, out)
    }

    #[test]
    fn test_primary_used_when_available() {
        let (_tmp, src, out) = scratch();
        let (expected_src, expected_out) = (src.clone(), out.clone());
        let mut primary = compressor("7z", true);
        primary
            .expect_build()
            .withf(move |s, o| s.to_path_buf() == expected_src && o.to_path_buf() == expected_out)
            .times(1)
            .returning(|_, _| Ok(()));
        let mut secondary = compressor("powershell", true);
        secondary.expect_build().times(0);

        let result = ArchiveBuilder::new(&primary, &secondary)
            .build(&src, &out)
            .expect("build should run");
        assert_eq!(result, ArchiveResult::BuiltWith("7z".to_string()));
    }

    #[test]
    fn test_falls_back_when_primary_probe_fails() {
        let (_tmp, src, out) = scratch();
        let mut primary = compressor("7z", false);
        primary.expect_build().times(0);
        let mut secondary = compressor("powershell", true);
        secondary.expect_build().times(1).returning(|_, _| Ok(()));

        let result = ArchiveBuilder::new(&primary, &secondary)
            .build(&src, &out)
            .expect("build should run");
        assert_eq!(result, ArchiveResult::BuiltWith("powershell".to_string()));
    }

    #[test]
    fn test_primary_failure_does_not_fall_back() {
        let (_tmp, src, out) = scratch();
        let mut primary = compressor("7z", true);
        primary.expect_build().times(1).returning(|_, _| {
            Err(DeployError::ArchiveBuildFailed {
                reason: "7z exited with code 2".to_string(),
            })
        });
        let mut secondary = compressor("powershell", true);
        secondary.expect_build().times(0);

        let result = ArchiveBuilder::new(&primary, &secondary)
            .build(&src, &out)
            .expect("build should run");
        assert_eq!(result, ArchiveResult::Failed("7z exited with code 2".to_string()));
    }

    #[test]
    fn test_both_tools_unavailable_is_a_failure() {
        let (_tmp, src, out) = scratch();
        let mut primary = compressor("7z", false);
        primary.expect_build().times(0);
        let mut secondary = compressor("powershell", false);
        secondary.expect_build().times(1).returning(|_, _| {
            Err(DeployError::ToolLaunchFailed {
                tool: "powershell".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        });

        match ArchiveBuilder::new(&primary, &secondary).build(&src, &out) {
            Ok(ArchiveResult::Failed(reason)) => {
                assert!(reason.contains("unavailable: powershell"), "{reason}")
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_stale_archive_removed_before_build() {
        let (_tmp, src, out) = scratch();
        fs::write(&out, "stale archive").expect("Failed to write stale archive");

        let mut primary = compressor("7z", true);
        primary.expect_build().times(1).returning(|_, output| {
            assert!(!output.exists(), "stale archive must be gone before the tool runs");
            fs::write(output, "fresh").map_err(|e| DeployError::ArchiveBuildFailed {
                reason: e.to_string(),
            })
        });
        let secondary = compressor("powershell", true);

        ArchiveBuilder::new(&primary, &secondary)
            .build(&src, &out)
            .expect("build should run");
        assert_eq!(fs::read_to_string(&out).expect("read archive"), "fresh");
    }

    #[test]
    fn test_missing_source_fails_without_touching_output() {
        let (tmp, _src, out) = scratch();
        fs::write(&out, "previous").expect("Failed to write archive");
        let mut primary = compressor("7z", true);
        primary.expect_build().times(0);
        let mut secondary = compressor("powershell", true);
        secondary.expect_build().times(0);

        let result = ArchiveBuilder::new(&primary, &secondary)
            .build(&tmp.path().join("nonexistent"), &out);

        assert!(matches!(result, Err(DeployError::SourceNotFound { .. })));
        assert!(out.exists());
    }
}
