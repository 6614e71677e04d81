//! Deployment pipeline orchestration.
//!
//! Runs the three stages strictly in order:
//! 1. Mirror the server tree into its target
//! 2. Build the client archive at the staging path
//! 3. Relocate the archive to its final destination
//!
//! The first failing stage moves the pipeline to `Failed` and nothing after
//! it runs. Every stage outcome, including failures and mirror notes, is
//! appended to the run's StageReport.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::archive::ArchiveBuilder;
use crate::checksums::{compute_file_checksum, ChecksumAlgorithm, ChecksumValue};
use crate::error::DeployError;
use crate::mirror::DirectoryMirror;
use crate::model::{
    ArchiveResult, PipelineConfig, PipelineState, Stage, StageOutcome, StageReport,
};
use crate::observer::PipelineObserver;
use crate::relocate::ArchiveRelocator;
use crate::tools::{Compressor, MirrorTool};

/// Stage order of every run.
pub const STAGES: [Stage; 3] = [Stage::Mirroring, Stage::Archiving, Stage::Relocating];

/// Result of one pipeline run.
#[derive(Debug)]
pub struct PipelineRun {
    /// Unique identifier for this run (also the tracing span field)
    pub run_id: Uuid,

    /// Terminal state: `Done` or `Failed`
    pub state: PipelineState,

    /// Every stage outcome in execution order
    pub report: StageReport,

    /// The error that aborted the run, if any
    pub error: Option<DeployError>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Done
    }

    /// Process exit indicator: 0 when done, 1 when a stage failed.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// The report on success, the aborting error otherwise.
    pub fn into_result(self) -> Result<StageReport, DeployError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.report),
        }
    }
}

/// A single mirror → archive → relocate run over one config.
pub struct DeploymentPipeline<'a> {
    config: &'a PipelineConfig,
    mirror_tool: &'a dyn MirrorTool,
    primary: &'a dyn Compressor,
    secondary: &'a dyn Compressor,
    observer: Option<&'a dyn PipelineObserver>,
    digest: Option<ChecksumAlgorithm>,
    state: PipelineState,
    report: StageReport,
}

impl<'a> DeploymentPipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        mirror_tool: &'a dyn MirrorTool,
        primary: &'a dyn Compressor,
        secondary: &'a dyn Compressor,
    ) -> Self {
        DeploymentPipeline {
            config,
            mirror_tool,
            primary,
            secondary,
            observer: None,
            digest: None,
            state: PipelineState::Idle,
            report: StageReport::new(),
        }
    }

    /// Receive stage callbacks during the run.
    pub fn with_observer(mut self, observer: &'a dyn PipelineObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Record a digest of the relocated archive in the report.
    pub fn with_digest(mut self, algorithm: Option<ChecksumAlgorithm>) -> Self {
        self.digest = algorithm;
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Execute all stages and return the terminal state with its report.
    pub fn run(mut self) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", run_id = %run_id);
        let _guard = span.enter();

        let started_at = Utc::now();
        info!("pipeline started");
        if let Some(observer) = self.observer {
            observer.on_pipeline_started(self.config);
        }

        let error = self.run_stages().err();
        if error.is_none() {
            self.state = PipelineState::Done;
            info!("pipeline done");
        }

        if let Some(observer) = self.observer {
            observer.on_pipeline_completed(&self.state, &self.report);
        }

        PipelineRun {
            run_id,
            state: self.state,
            report: self.report,
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn run_stages(&mut self) -> Result<(), DeployError> {
        for stage in STAGES {
            if let Err(err) = self.execute(stage) {
                error!(%stage, error = %err, "stage failed; aborting pipeline");
                self.state = PipelineState::Failed {
                    stage,
                    cause: err.to_string(),
                };
                return Err(err);
            }
        }
        Ok(())
    }

    fn execute(&mut self, stage: Stage) -> Result<(), DeployError> {
        self.state = PipelineState::running(stage);
        info!(%stage, "stage started");
        if let Some(observer) = self.observer {
            observer.on_stage_started(stage);
        }

        let result = match stage {
            Stage::Mirroring => self.mirror_stage(),
            Stage::Archiving => self.archive_stage(),
            Stage::Relocating => self.relocate_stage(),
        };

        let outcome = match &result {
            Ok(outcome) => outcome.clone(),
            Err(err) => StageOutcome::Failed(err.to_string()),
        };
        self.report.record(stage, outcome);

        if let (Some(observer), Some(entry)) = (self.observer, self.report.entries().last()) {
            observer.on_stage_completed(entry);
        }

        result.map(|_| ())
    }

    fn mirror_stage(&self) -> Result<StageOutcome, DeployError> {
        let outcome = DirectoryMirror::new(self.mirror_tool)
            .mirror(self.config.mirror_source(), self.config.mirror_target())?;
        Ok(StageOutcome::Mirrored(outcome))
    }

    fn archive_stage(&self) -> Result<StageOutcome, DeployError> {
        let result = ArchiveBuilder::new(self.primary, self.secondary)
            .build(self.config.archive_source(), self.config.staging_archive())?;
        let tool = result.into_result()?;
        info!(tool = %tool, "archive built");
        Ok(StageOutcome::Archived(ArchiveResult::BuiltWith(tool)))
    }

    fn relocate_stage(&self) -> Result<StageOutcome, DeployError> {
        let destination = self.config.archive_destination();
        ArchiveRelocator::new().relocate(self.config.staging_archive(), destination)?;

        Ok(StageOutcome::Relocated {
            destination: destination.to_path_buf(),
            digest: self.digest.and_then(|algorithm| archive_digest(destination, algorithm)),
        })
    }
}

/// Digest of the deployed archive. The archive is already in place, so a
/// read failure is only logged.
fn archive_digest(path: &Path, algorithm: ChecksumAlgorithm) -> Option<ChecksumValue> {
    match compute_file_checksum(path, algorithm) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(%algorithm, error = %err, "could not digest relocated archive");
            None
        }
    }
}
