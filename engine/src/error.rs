//! Error types for the deployment engine.
//!
//! `DeployError` represents stage-level failures that abort a pipeline run.
//! Non-fatal mirror notes (exit codes 8-15) are not errors; they are
//! carried in `MirrorOutcome::SuccessWithNotes` and only logged.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a pipeline stage.
///
/// Every variant carries enough context (path, exit code, tool name) to
/// diagnose the failure without rerunning with extra verbosity.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A source directory required by a stage does not exist
    #[error("Source directory not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// The mirror tool reported an unrecoverable condition
    #[error("Mirror tool failed (code {code}): {description}")]
    MirrorFatal { code: i32, description: String },

    /// An archive tool could not be used on this host
    #[error("Archive tool unavailable: {tool}")]
    ArchiveToolUnavailable { tool: String },

    /// The selected archive tool failed to produce an archive
    #[error("Archive build failed: {reason}")]
    ArchiveBuildFailed { reason: String },

    /// The built archive could not be moved into its final location
    #[error("Failed to relocate archive to {}: {cause}", path.display())]
    RelocationFailed { path: PathBuf, cause: String },

    /// Failed to create a directory
    #[error("Failed to create directory: {}", path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Failed to remove a stale file
    #[error("Failed to remove existing file: {}", path.display())]
    RemoveFailed { path: PathBuf, source: io::Error },

    /// An external tool could not be started at all
    #[error("Failed to launch {tool}")]
    ToolLaunchFailed { tool: String, source: io::Error },

    /// Configuration is incomplete or inconsistent
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The config file could not be read
    #[error("Failed to read config file: {}", path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    /// The config file is not valid TOML for this schema
    #[error("Failed to parse config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl DeployError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::DirectoryCreationFailed { source, .. }
            | Self::RemoveFailed { source, .. }
            | Self::ToolLaunchFailed { source, .. }
            | Self::ConfigRead { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// True for errors that only configuration changes can fix.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound { .. }
                | Self::InvalidConfig { .. }
                | Self::ConfigRead { .. }
                | Self::ConfigParse { .. }
        )
    }
}
