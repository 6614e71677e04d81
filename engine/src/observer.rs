//! Pipeline observer trait.
//!
//! This module defines the PipelineObserver trait, which decouples the
//! pipeline from any specific front end (CLI output, a status panel, etc.).

use crate::model::{PipelineConfig, PipelineState, Stage, StageEntry, StageReport};

/// Trait for receiving stage updates from a pipeline run.
///
/// All methods are called synchronously on the thread running the pipeline.
pub trait PipelineObserver {
    /// Called once before the first stage.
    fn on_pipeline_started(&self, config: &PipelineConfig);

    /// Called when a stage is about to run.
    fn on_stage_started(&self, stage: Stage);

    /// Called after a stage's outcome has been recorded (success or failure).
    fn on_stage_completed(&self, entry: &StageEntry);

    /// Called once the pipeline reaches a terminal state.
    fn on_pipeline_completed(&self, state: &PipelineState, report: &StageReport);
}
