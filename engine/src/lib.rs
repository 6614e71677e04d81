//! # modsync Engine - Mod Deployment Library
//!
//! A headless deployment engine that pushes a game-server mod into place.
//! Designed as the foundation for multiple front ends (CLI, status panels, automation).
//!
//! ## Overview
//!
//! One run of the pipeline performs three stages, strictly in order:
//! - Mirror the server-side tree into the server install (robocopy or rsync)
//! - Pack the client-side tree into a zip (7-Zip, falling back to PowerShell)
//! - Move the zip over the previously deployed archive
//!
//! The first failing stage aborts the run. Every stage outcome is recorded
//! in a [`StageReport`] and reported through an optional [`PipelineObserver`].
//!
//! ## Basic Usage
//!
//! ```no_run
//! use modsync_engine::{load_config_file, PathSettings};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load paths and tool settings
//! let file = load_config_file(Path::new("modsync.toml"))?;
//! let config = file.paths.merge(PathSettings::default()).resolve()?;
//!
//! // Run the pipeline
//! let toolchain = file.tools.toolchain();
//! let run = toolchain.pipeline(&config).run();
//!
//! // Check results
//! for entry in run.report.entries() {
//!     println!("{}: {}", entry.stage, entry.outcome);
//! }
//! std::process::exit(run.exit_code());
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Config, stage outcomes, report and pipeline state
//! - **error**: Error types and handling
//! - **exit_codes**: Mirror tool exit code classification
//! - **tools**: External tool adapters and the traits they implement
//! - **mirror**, **archive**, **relocate**: The three stages
//! - **pipeline**: Stage orchestration
//! - **config**: TOML config loading
//! - **checksums**: Digest of the deployed archive

pub mod archive;
pub mod checksums;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs_ops;
pub mod mirror;
pub mod model;
pub mod observer;
pub mod pipeline;
pub mod relocate;
pub mod tools;

// Re-export main types and functions
pub use archive::ArchiveBuilder;
pub use checksums::{compute_file_checksum, ChecksumAlgorithm, ChecksumValue};
pub use config::{load_config_file, parse_config, ConfigFile, PathSettings, ToolSettings, DEFAULT_CONFIG_FILE};
pub use error::DeployError;
pub use exit_codes::{classify, describe};
pub use mirror::DirectoryMirror;
pub use model::{
    ArchiveResult, MirrorOutcome, PipelineConfig, PipelineState, Stage, StageEntry, StageOutcome,
    StageReport,
};
pub use observer::PipelineObserver;
pub use pipeline::{DeploymentPipeline, PipelineRun, STAGES};
pub use relocate::ArchiveRelocator;
pub use tools::{
    Compressor, MirrorTool, MirrorToolKind, PowerShellArchive, Robocopy, Rsync, SevenZip, Toolchain,
};
