//! External tool adapters.
//!
//! The engine never copies or compresses anything itself. It drives:
//! - a mirror tool ([`Robocopy`], or [`Rsync`] on hosts without robocopy)
//! - one of two archive tools ([`SevenZip`], falling back to [`PowerShellArchive`])
//!
//! All invocations are blocking child processes with no timeout. Tool
//! stdout is discarded; stderr is captured for failure messages.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::DeployError;
use crate::model::PipelineConfig;
use crate::pipeline::DeploymentPipeline;

#[cfg(test)]
use mockall::automock;

/// Exit code reported when the child was terminated without one.
pub const NO_EXIT_CODE: i32 = -1;

/// Mirror-convention code used when a translated tool fails.
const TRANSLATED_FATAL_CODE: i32 = 16;

/// A tool that makes a target tree identical to a source tree.
///
/// Implementations return the raw exit code in the robocopy convention
/// (see [`crate::exit_codes`]); classification happens in the caller.
#[cfg_attr(test, automock)]
pub trait MirrorTool {
    fn name(&self) -> &'static str;

    /// Mirror `source` into `target`, deleting target-only entries.
    fn mirror(&self, source: &Path, target: &Path) -> Result<i32, DeployError>;
}

/// A tool that packs the contents of a directory into a zip archive.
#[cfg_attr(test, automock)]
pub trait Compressor {
    fn name(&self) -> &'static str;

    /// Cheap availability check with no filesystem side effects.
    fn probe(&self) -> bool;

    /// Write every entry under `source` to the root of a zip at `output`.
    fn build(&self, source: &Path, output: &Path) -> Result<(), DeployError>;
}

/// Which mirror tool to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorToolKind {
    Robocopy,
    Rsync,
}

impl Default for MirrorToolKind {
    fn default() -> Self {
        if cfg!(windows) {
            MirrorToolKind::Robocopy
        } else {
            MirrorToolKind::Rsync
        }
    }
}

impl MirrorToolKind {
    /// Build the adapter, optionally overriding the program path.
    pub fn create(self, program: Option<PathBuf>) -> Box<dyn MirrorTool> {
        match self {
            MirrorToolKind::Robocopy => Box::new(Robocopy {
                program: program.unwrap_or_else(|| PathBuf::from("robocopy")),
            }),
            MirrorToolKind::Rsync => Box::new(Rsync {
                program: program.unwrap_or_else(|| PathBuf::from("rsync")),
            }),
        }
    }
}

/// The three tools a pipeline drives, owned.
pub struct Toolchain {
    pub mirror: Box<dyn MirrorTool>,
    pub primary: Box<dyn Compressor>,
    pub secondary: Box<dyn Compressor>,
}

impl Toolchain {
    /// A pipeline over `config` borrowing these tools.
    pub fn pipeline<'a>(&'a self, config: &'a PipelineConfig) -> DeploymentPipeline<'a> {
        DeploymentPipeline::new(
            config,
            self.mirror.as_ref(),
            self.primary.as_ref(),
            self.secondary.as_ref(),
        )
    }
}

/// Exit status and captured stderr of a finished child.
#[derive(Debug)]
struct ToolExit {
    code: i32,
    stderr: String,
}

impl ToolExit {
    fn success(&self) -> bool {
        self.code == 0
    }

    /// Failure text: exit code plus the trimmed stderr, if any.
    fn reason(&self, tool: &str) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("{tool} exited with code {}", self.code)
        } else {
            format!("{tool} exited with code {}: {stderr}", self.code)
        }
    }
}

fn run_tool(tool: &str, mut cmd: Command) -> Result<ToolExit, DeployError> {
    debug!(tool, command = ?cmd, "invoking external tool");
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| DeployError::ToolLaunchFailed {
            tool: tool.to_string(),
            source: e,
        })?;

    let code = output.status.code().unwrap_or(NO_EXIT_CODE);
    debug!(tool, code, "external tool exited");
    Ok(ToolExit {
        code,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// `path` with a trailing separator, so copy tools treat it as "contents of".
fn with_trailing_slash(path: &Path) -> OsString {
    let mut s = path.as_os_str().to_owned();
    s.push("/");
    s
}

/// Windows robocopy in `/MIR` mode with all logging suppressed.
#[derive(Debug, Clone)]
pub struct Robocopy {
    program: PathBuf,
}

impl Default for Robocopy {
    fn default() -> Self {
        Robocopy {
            program: PathBuf::from("robocopy"),
        }
    }
}

impl Robocopy {
    fn command(&self, source: &Path, target: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(source)
            .arg(target)
            .args(["/E", "/MIR", "/NFL", "/NDL", "/NJH", "/NJS", "/NP"]);
        cmd
    }
}

impl MirrorTool for Robocopy {
    fn name(&self) -> &'static str {
        "robocopy"
    }

    fn mirror(&self, source: &Path, target: &Path) -> Result<i32, DeployError> {
        // Robocopy's own exit code is already in the mirror convention
        Ok(run_tool(self.name(), self.command(source, target))?.code)
    }
}

/// rsync with `--delete`, translated into the robocopy exit convention.
#[derive(Debug, Clone)]
pub struct Rsync {
    program: PathBuf,
}

impl Default for Rsync {
    fn default() -> Self {
        Rsync {
            program: PathBuf::from("rsync"),
        }
    }
}

impl Rsync {
    fn command(&self, source: &Path, target: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-a", "--delete", "--quiet"])
            .arg(with_trailing_slash(source))
            .arg(with_trailing_slash(target));
        cmd
    }
}

impl MirrorTool for Rsync {
    fn name(&self) -> &'static str {
        "rsync"
    }

    fn mirror(&self, source: &Path, target: &Path) -> Result<i32, DeployError> {
        let exit = run_tool(self.name(), self.command(source, target))?;
        if exit.success() {
            return Ok(0);
        }
        warn!(
            rsync_code = exit.code,
            stderr = %exit.stderr.trim(),
            "rsync failed; reporting as fatal mirror error"
        );
        Ok(TRANSLATED_FATAL_CODE)
    }
}

/// 7-Zip, the preferred archive tool.
#[derive(Debug, Clone)]
pub struct SevenZip {
    program: PathBuf,
}

impl Default for SevenZip {
    fn default() -> Self {
        SevenZip {
            program: PathBuf::from("7z"),
        }
    }
}

impl SevenZip {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        SevenZip {
            program: program.into(),
        }
    }

    fn command(&self, source: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        // "<dir>/*" puts the directory's entries at the archive root
        cmd.args(["a", "-tzip", "-y"]).arg(output).arg(source.join("*"));
        cmd
    }
}

impl Compressor for SevenZip {
    fn name(&self) -> &'static str {
        "7z"
    }

    fn probe(&self) -> bool {
        // Bare `7z` prints usage and exits 0
        Command::new(&self.program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn build(&self, source: &Path, output: &Path) -> Result<(), DeployError> {
        let exit = run_tool(self.name(), self.command(source, output))?;
        if exit.success() {
            Ok(())
        } else {
            Err(DeployError::ArchiveBuildFailed {
                reason: exit.reason(self.name()),
            })
        }
    }
}

/// PowerShell's `Compress-Archive`, the fallback archive tool.
#[derive(Debug, Clone)]
pub struct PowerShellArchive {
    program: PathBuf,
}

impl Default for PowerShellArchive {
    fn default() -> Self {
        let program = if cfg!(windows) { "powershell" } else { "pwsh" };
        PowerShellArchive {
            program: PathBuf::from(program),
        }
    }
}

impl PowerShellArchive {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        PowerShellArchive {
            program: program.into(),
        }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-NoProfile", "-NonInteractive", "-Command"]);
        cmd
    }

    fn script(source: &Path, output: &Path) -> String {
        format!(
            "Compress-Archive -Path {} -DestinationPath {} -Force",
            ps_quote(&source.join("*")),
            ps_quote(output)
        )
    }
}

/// Single-quote a path for a PowerShell command line.
fn ps_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "''"))
}

impl Compressor for PowerShellArchive {
    fn name(&self) -> &'static str {
        "powershell"
    }

    fn probe(&self) -> bool {
        let mut cmd = self.base_command();
        cmd.arg("exit 0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn build(&self, source: &Path, output: &Path) -> Result<(), DeployError> {
        let mut cmd = self.base_command();
        cmd.arg(Self::script(source, output));
        let exit = run_tool(self.name(), cmd)?;
        if exit.success() {
            Ok(())
        } else {
            Err(DeployError::ArchiveBuildFailed {
                reason: exit.reason(self.name()),
            })
        }
    }
}
