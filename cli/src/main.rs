//! modsync - Command-line front end for the deployment engine.
//!
//! Loads the deployment config, runs the mirror → archive → relocate
//! pipeline and reports each stage on stderr. With `--json` the final
//! report is printed to stdout instead of the summary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use modsync_engine::{
    load_config_file, ArchiveResult, ChecksumAlgorithm, ConfigFile, MirrorOutcome, PathSettings,
    PipelineConfig, PipelineObserver, PipelineRun, PipelineState, Stage, StageEntry, StageOutcome,
    StageReport, DEFAULT_CONFIG_FILE,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit code for usage and config errors (the pipeline never started)
const EXIT_USAGE: i32 = 2;

/// modsync - Deploy a mod's server files and client archive
#[derive(Parser, Debug, Default)]
#[command(name = "modsync")]
#[command(version)]
#[command(about = "Mirror server files and deploy the client archive")]
struct Args {
    /// Config file (defaults to ./modsync.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Server-side source tree
    #[arg(long, value_name = "PATH")]
    mirror_source: Option<PathBuf>,

    /// Server install directory to mirror into
    #[arg(long, value_name = "PATH")]
    mirror_target: Option<PathBuf>,

    /// Client-side tree to archive
    #[arg(long, value_name = "PATH")]
    archive_source: Option<PathBuf>,

    /// Final location of the client archive
    #[arg(long, value_name = "PATH")]
    archive_destination: Option<PathBuf>,

    /// Where the archive is built before it is moved into place
    #[arg(long, value_name = "PATH")]
    staging_archive: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long)]
    verbose: bool,

    /// Print the stage report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Record a digest of the deployed archive: md5, sha256, or blake3
    #[arg(long, value_name = "ALGORITHM")]
    digest: Option<String>,
}

/// CLI implementation of PipelineObserver, printing one line per stage
struct CliObserver {
    verbose: bool,
}

impl CliObserver {
    fn new(verbose: bool) -> Self {
        CliObserver { verbose }
    }

    fn started_line(stage: Stage) -> &'static str {
        match stage {
            Stage::Mirroring => "Mirroring server files...",
            Stage::Archiving => "Archiving client files...",
            Stage::Relocating => "Moving archive into place...",
        }
    }

    fn completed_line(entry: &StageEntry) -> String {
        match &entry.outcome {
            StageOutcome::Mirrored(MirrorOutcome::SuccessWithNotes(code, desc)) => {
                format!("✓ Server files mirrored (code {code}: {desc})")
            }
            StageOutcome::Mirrored(_) => "✓ Server files mirrored".to_string(),
            StageOutcome::Archived(ArchiveResult::BuiltWith(tool)) => {
                format!("✓ Client files archived with {tool}")
            }
            StageOutcome::Archived(ArchiveResult::Failed(reason)) => {
                format!("✗ Archiving failed: {reason}")
            }
            StageOutcome::Relocated { destination, digest } => match digest {
                Some(digest) => format!(
                    "✓ Archive moved to: {} ({})",
                    destination.display(),
                    digest.to_string_with_algo()
                ),
                None => format!("✓ Archive moved to: {}", destination.display()),
            },
            StageOutcome::Failed(cause) => format!("✗ {} failed: {cause}", entry.stage),
        }
    }
}

impl PipelineObserver for CliObserver {
    fn on_pipeline_started(&self, config: &PipelineConfig) {
        if self.verbose {
            eprintln!("Deploying...");
            eprintln!(
                "  Server: {} -> {}",
                config.mirror_source().display(),
                config.mirror_target().display()
            );
            eprintln!(
                "  Client: {} -> {}",
                config.archive_source().display(),
                config.archive_destination().display()
            );
            eprintln!();
        }
    }

    fn on_stage_started(&self, stage: Stage) {
        eprintln!("{}", Self::started_line(stage));
    }

    fn on_stage_completed(&self, entry: &StageEntry) {
        eprintln!("{}", Self::completed_line(entry));
    }

    fn on_pipeline_completed(&self, state: &PipelineState, _report: &StageReport) {
        eprintln!();
        match state {
            PipelineState::Done => eprintln!("All stages completed successfully"),
            PipelineState::Failed { stage, cause } => {
                eprintln!("Fatal error during {stage}: {cause}")
            }
            _ => {}
        }
    }
}

fn format_duration(elapsed: chrono::Duration) -> String {
    let millis = elapsed.num_milliseconds().max(0);
    let secs = millis / 1000;
    let mins = secs / 60;

    if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{}.{:03}s", secs, millis % 1000)
    }
}

/// Install the tracing subscriber; logs go to stderr
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parse arguments and run the pipeline
fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let exit_code = match run_cli(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            EXIT_USAGE
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability.
///
/// Returns the process exit code for a pipeline that ran; errors are
/// usage or config problems found before the first stage.
fn run_cli(args: &Args) -> Result<i32> {
    let digest = parse_digest(args.digest.as_deref())?;
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let file = load_settings(args, &cwd)?;

    let config = file
        .paths
        .merge(path_overrides(args).relative_to(&cwd))
        .resolve()
        .context("incomplete deployment config")?;
    debug!(tools = ?file.tools, "using tools");

    let toolchain = file.tools.toolchain();
    let observer = CliObserver::new(args.verbose);
    let run = toolchain
        .pipeline(&config)
        .with_observer(&observer)
        .with_digest(digest)
        .run();

    if args.json {
        println!("{}", render_json(&run)?);
    } else {
        eprintln!("Elapsed: {}", format_duration(run.finished_at - run.started_at));
    }

    Ok(run.exit_code())
}

fn parse_digest(value: Option<&str>) -> Result<Option<ChecksumAlgorithm>> {
    value
        .map(|s| s.parse::<ChecksumAlgorithm>())
        .transpose()
        .map_err(anyhow::Error::msg)
}

/// Paths given on the command line
fn path_overrides(args: &Args) -> PathSettings {
    PathSettings {
        mirror_source: args.mirror_source.clone(),
        mirror_target: args.mirror_target.clone(),
        archive_source: args.archive_source.clone(),
        archive_destination: args.archive_destination.clone(),
        staging_archive: args.staging_archive.clone(),
    }
}

/// Load the config file, if any.
///
/// An explicit `--config` must exist. The default file is optional, but
/// without it every required path has to come from the command line.
fn load_settings(args: &Args, cwd: &Path) -> Result<ConfigFile> {
    if let Some(path) = &args.config {
        return Ok(load_config_file(path)?);
    }

    let default_path = cwd.join(DEFAULT_CONFIG_FILE);
    if default_path.is_file() {
        return Ok(load_config_file(&default_path)?);
    }

    if path_overrides(args).is_complete() {
        Ok(ConfigFile::default())
    } else {
        anyhow::bail!(
            "no {} in {} and not every path was given on the command line",
            DEFAULT_CONFIG_FILE,
            cwd.display()
        )
    }
}

fn render_json(run: &PipelineRun) -> Result<String> {
    let value = serde_json::json!({
        "run_id": run.run_id.to_string(),
        "state": run.state,
        "report": run.report,
        "started_at": run.started_at.to_rfc3339(),
        "finished_at": run.finished_at.to_rfc3339(),
    });
    Ok(serde_json::to_string_pretty(&value)?)
}
