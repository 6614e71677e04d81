//! DirectoryMirror: make a target tree identical to a source tree.

use std::path::Path;

use tracing::{info, warn};

use crate::error::DeployError;
use crate::exit_codes;
use crate::fs_ops;
use crate::model::MirrorOutcome;
use crate::tools::MirrorTool;

/// Runs the mirror tool and interprets its exit code.
pub struct DirectoryMirror<'a> {
    tool: &'a dyn MirrorTool,
}

impl<'a> DirectoryMirror<'a> {
    pub fn new(tool: &'a dyn MirrorTool) -> Self {
        DirectoryMirror { tool }
    }

    /// Mirror `source` into `target`.
    ///
    /// The target directory is created before the tool runs, so it exists
    /// even when mirroring fails. Outcomes with notes (codes 8-15) are
    /// logged and returned as success.
    ///
    /// # Errors
    /// - `SourceNotFound` if `source` is not a directory (the tool is not run)
    /// - `DirectoryCreationFailed` if `target` cannot be created
    /// - `MirrorFatal` if the tool's exit code classifies as fatal
    pub fn mirror(&self, source: &Path, target: &Path) -> Result<MirrorOutcome, DeployError> {
        fs_ops::require_directory(source)?;
        fs_ops::ensure_dir_exists(target)?;

        info!(
            tool = self.tool.name(),
            source = %source.display(),
            target = %target.display(),
            "mirroring directory"
        );
        let code = self.tool.mirror(source, target)?;

        match exit_codes::classify(code) {
            MirrorOutcome::Fatal(code, description) => {
                Err(DeployError::MirrorFatal { code, description })
            }
            MirrorOutcome::SuccessWithNotes(code, description) => {
                warn!(code, %description, "mirror finished with notes");
                Ok(MirrorOutcome::SuccessWithNotes(code, description))
            }
            MirrorOutcome::Success => {
                info!(code, "mirror finished");
                Ok(MirrorOutcome::Success)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockMirrorTool;
    use std::fs;

    fn tool_returning(code: i32) -> MockMirrorTool {
        let mut tool = MockMirrorTool::new();
        tool.expect_name().return_const("mock-mirror");
        tool.expect_mirror().times(1).returning(move |_, _| Ok(code));
        tool
    }

    #[test]
    fn test_missing_source_fails_before_tool_runs() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut tool = MockMirrorTool::new();
        tool.expect_name().return_const("mock-mirror");
        tool.expect_mirror().times(0);

        let result = DirectoryMirror::new(&tool)
            .mirror(&temp_dir.path().join("nonexistent"), &temp_dir.path().join("dst"));

        assert!(matches!(result, Err(DeployError::SourceNotFound { .. })));
        assert!(!temp_dir.path().join("dst").exists());
    }

    #[test]
    fn test_target_created_even_when_mirror_is_fatal() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");
        let dst = temp_dir.path().join("deploy").join("server");

        let tool = tool_returning(16);
        let result = DirectoryMirror::new(&tool).mirror(&src, &dst);

        assert!(dst.is_dir(), "target should exist for the next retry");
        match result {
            Err(DeployError::MirrorFatal { code, .. }) => assert_eq!(code, 16),
            other => panic!("expected MirrorFatal, got {other:?}"),
        }
    }

    #[test]
    fn test_notes_are_not_errors() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");

        let tool = tool_returning(9);
        let outcome = DirectoryMirror::new(&tool)
            .mirror(&src, &temp_dir.path().join("dst"))
            .expect("code 9 should not fail the stage");

        assert!(matches!(outcome, MirrorOutcome::SuccessWithNotes(9, _)));
    }

    #[test]
    fn test_plain_success() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");

        let tool = tool_returning(3);
        let outcome = DirectoryMirror::new(&tool)
            .mirror(&src, &temp_dir.path().join("dst"))
            .expect("mirror should succeed");
        assert_eq!(outcome, MirrorOutcome::Success);
    }

    #[test]
    fn test_signal_termination_is_fatal() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");

        let tool = tool_returning(crate::tools::NO_EXIT_CODE);
        let result = DirectoryMirror::new(&tool).mirror(&src, &temp_dir.path().join("dst"));
        assert!(matches!(result, Err(DeployError::MirrorFatal { code: -1, .. })));
    }
}
