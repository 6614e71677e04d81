//! Core data model for deployment runs.
//!
//! This module defines the data passed between pipeline stages:
//! - PipelineConfig: the four resolved filesystem locations (plus staging)
//! - MirrorOutcome, ArchiveResult: per-stage results
//! - StageReport: the ordered diagnostic log of a run
//! - Stage, PipelineState: the pipeline state machine

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checksums::ChecksumValue;
use crate::error::DeployError;

/// Immutable set of locations a pipeline run operates on.
///
/// Built once before the run via [`PipelineConfig::new`], which rejects
/// empty paths and derives the staging archive location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    mirror_source: PathBuf,
    mirror_target: PathBuf,
    archive_source: PathBuf,
    archive_destination: PathBuf,
    staging_archive: PathBuf,
}

impl PipelineConfig {
    /// Create a config, staging the archive next to its final destination.
    ///
    /// # Errors
    /// Returns `DeployError::InvalidConfig` if any path is empty or the
    /// archive destination has no file name.
    pub fn new<P: Into<PathBuf>>(
        mirror_source: P,
        mirror_target: P,
        archive_source: P,
        archive_destination: P,
    ) -> Result<Self, DeployError> {
        let archive_destination = archive_destination.into();
        let staging_archive = default_staging_archive(&archive_destination)?;
        Self::with_staging_archive(
            mirror_source.into(),
            mirror_target.into(),
            archive_source.into(),
            archive_destination,
            staging_archive,
        )
    }

    /// Create a config with an explicit staging archive location.
    ///
    /// # Errors
    /// Returns `DeployError::InvalidConfig` if any path is empty, the
    /// staging archive is the same path as the destination, or it does not
    /// end in `.zip`.
    pub fn with_staging_archive(
        mirror_source: PathBuf,
        mirror_target: PathBuf,
        archive_source: PathBuf,
        archive_destination: PathBuf,
        staging_archive: PathBuf,
    ) -> Result<Self, DeployError> {
        for (name, path) in [
            ("mirror_source", &mirror_source),
            ("mirror_target", &mirror_target),
            ("archive_source", &archive_source),
            ("archive_destination", &archive_destination),
            ("staging_archive", &staging_archive),
        ] {
            if path.as_os_str().is_empty() {
                return Err(DeployError::InvalidConfig {
                    reason: format!("{name} is empty"),
                });
            }
        }

        if staging_archive == archive_destination {
            return Err(DeployError::InvalidConfig {
                reason: format!(
                    "staging_archive must differ from archive_destination ({})",
                    archive_destination.display()
                ),
            });
        }

        let is_zip = staging_archive
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if !is_zip {
            // Compress-Archive appends ".zip" to any other name
            return Err(DeployError::InvalidConfig {
                reason: format!(
                    "staging_archive must have a .zip extension ({})",
                    staging_archive.display()
                ),
            });
        }

        Ok(PipelineConfig {
            mirror_source,
            mirror_target,
            archive_source,
            archive_destination,
            staging_archive,
        })
    }

    pub fn mirror_source(&self) -> &Path {
        &self.mirror_source
    }

    pub fn mirror_target(&self) -> &Path {
        &self.mirror_target
    }

    pub fn archive_source(&self) -> &Path {
        &self.archive_source
    }

    pub fn archive_destination(&self) -> &Path {
        &self.archive_destination
    }

    /// Where the archive is built before being renamed into place.
    pub fn staging_archive(&self) -> &Path {
        &self.staging_archive
    }
}

/// Hidden `.<stem>.staging.zip` sibling of the destination.
///
/// Keeping the staging file on the destination's filesystem lets the final
/// rename replace the old archive atomically.
pub fn default_staging_archive(destination: &Path) -> Result<PathBuf, DeployError> {
    let stem = destination
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DeployError::InvalidConfig {
            reason: format!(
                "archive_destination must name a file: {}",
                destination.display()
            ),
        })?;

    let mut name = std::ffi::OsString::from(".");
    name.push(stem);
    name.push(".staging.zip");
    Ok(destination.with_file_name(name))
}

/// Semantic result of one mirror tool run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MirrorOutcome {
    /// Codes 0-7: files copied, extras removed, or nothing to do
    Success,
    /// Codes 8-15: mirroring completed but the tool reported mismatches
    SuccessWithNotes(i32, String),
    /// Code 16 and above, negative, or unknown
    Fatal(i32, String),
}

impl MirrorOutcome {
    /// Returns true unless the outcome must abort the pipeline.
    pub fn is_success(&self) -> bool {
        !matches!(self, MirrorOutcome::Fatal(..))
    }
}

impl fmt::Display for MirrorOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorOutcome::Success => write!(f, "success"),
            MirrorOutcome::SuccessWithNotes(code, description) => {
                write!(f, "success with notes (code {code}): {description}")
            }
            MirrorOutcome::Fatal(code, description) => {
                write!(f, "fatal (code {code}): {description}")
            }
        }
    }
}

/// Result of one archive build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArchiveResult {
    /// Archive written by the named tool
    BuiltWith(String),
    /// The chosen tool failed; no further fallback is attempted
    Failed(String),
}

impl ArchiveResult {
    /// Convert into a stage result, turning `Failed` into an error.
    pub fn into_result(self) -> Result<String, DeployError> {
        match self {
            ArchiveResult::BuiltWith(tool) => Ok(tool),
            ArchiveResult::Failed(reason) => Err(DeployError::ArchiveBuildFailed { reason }),
        }
    }
}

/// The three stages of a deployment run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Mirroring,
    Archiving,
    Relocating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Mirroring => write!(f, "Mirroring"),
            Stage::Archiving => write!(f, "Archiving"),
            Stage::Relocating => write!(f, "Relocating"),
        }
    }
}

/// What a single stage produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StageOutcome {
    Mirrored(MirrorOutcome),
    Archived(ArchiveResult),
    Relocated {
        destination: PathBuf,
        digest: Option<ChecksumValue>,
    },
    /// Stage aborted with the rendered error
    Failed(String),
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Mirrored(outcome) => write!(f, "mirror {outcome}"),
            StageOutcome::Archived(ArchiveResult::BuiltWith(tool)) => {
                write!(f, "archive built with {tool}")
            }
            StageOutcome::Archived(ArchiveResult::Failed(reason)) => {
                write!(f, "archive failed: {reason}")
            }
            StageOutcome::Relocated { destination, digest } => {
                write!(f, "archive moved to {}", destination.display())?;
                if let Some(digest) = digest {
                    write!(f, " ({})", digest.to_string_with_algo())?;
                }
                Ok(())
            }
            StageOutcome::Failed(cause) => write!(f, "failed: {cause}"),
        }
    }
}

/// One (stage, outcome) pair in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageEntry {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only, ordered log of stage outcomes for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    entries: Vec<StageEntry>,
}

impl StageReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome stamped with the current time.
    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.entries.push(StageEntry {
            stage,
            outcome,
            recorded_at: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[StageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stages in the order they were recorded.
    pub fn stages(&self) -> Vec<Stage> {
        self.entries.iter().map(|e| e.stage).collect()
    }
}

/// State of a deployment pipeline.
///
/// `Idle → Mirroring → Archiving → Relocating → Done`, with `Failed`
/// reachable from every non-idle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Mirroring,
    Archiving,
    Relocating,
    Done,
    Failed { stage: Stage, cause: String },
}

impl PipelineState {
    /// Returns true if this state is terminal (no further changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }

    /// The state a pipeline is in while running `stage`.
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::Mirroring => PipelineState::Mirroring,
            Stage::Archiving => PipelineState::Archiving,
            Stage::Relocating => PipelineState::Relocating,
        }
    }
}
