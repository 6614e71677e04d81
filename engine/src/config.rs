//! Config file loading.
//!
//! A deployment is described by a TOML file:
//!
//! ```toml
//! [paths]
//! mirror_source = "Resources/Server/mymod"
//! mirror_target = "D:/Server/Resources/Server/MyMod"
//! archive_source = "Resources/Client"
//! archive_destination = "D:/Server/Resources/Client/MyMod.zip"
//!
//! [tools]
//! mirror = "robocopy"
//! ```
//!
//! Relative paths resolve against the directory holding the file. Any path
//! can be overridden by the caller before the final [`PipelineConfig`] is
//! built.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::DeployError;
use crate::model::PipelineConfig;
use crate::tools::{MirrorToolKind, PowerShellArchive, SevenZip, Toolchain};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "modsync.toml";

/// Parsed contents of a config file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub tools: ToolSettings,
}

/// Location settings; all optional until [`PathSettings::resolve`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathSettings {
    pub mirror_source: Option<PathBuf>,
    pub mirror_target: Option<PathBuf>,
    pub archive_source: Option<PathBuf>,
    pub archive_destination: Option<PathBuf>,
    pub staging_archive: Option<PathBuf>,
}

impl PathSettings {
    /// Overlay `overrides` on top of these settings.
    pub fn merge(self, overrides: PathSettings) -> PathSettings {
        PathSettings {
            mirror_source: overrides.mirror_source.or(self.mirror_source),
            mirror_target: overrides.mirror_target.or(self.mirror_target),
            archive_source: overrides.archive_source.or(self.archive_source),
            archive_destination: overrides.archive_destination.or(self.archive_destination),
            staging_archive: overrides.staging_archive.or(self.staging_archive),
        }
    }

    /// Make every relative path absolute against `base`.
    pub fn relative_to(self, base: &Path) -> PathSettings {
        let anchor = |p: Option<PathBuf>| {
            p.map(|p| if p.is_relative() { base.join(p) } else { p })
        };
        PathSettings {
            mirror_source: anchor(self.mirror_source),
            mirror_target: anchor(self.mirror_target),
            archive_source: anchor(self.archive_source),
            archive_destination: anchor(self.archive_destination),
            staging_archive: anchor(self.staging_archive),
        }
    }

    /// True when the four required locations are all set.
    pub fn is_complete(&self) -> bool {
        self.mirror_source.is_some()
            && self.mirror_target.is_some()
            && self.archive_source.is_some()
            && self.archive_destination.is_some()
    }

    /// Build the immutable pipeline config.
    ///
    /// # Errors
    /// Returns `InvalidConfig` naming the first missing or invalid location.
    pub fn resolve(self) -> Result<PipelineConfig, DeployError> {
        fn required(value: Option<PathBuf>, name: &str) -> Result<PathBuf, DeployError> {
            value.ok_or_else(|| DeployError::InvalidConfig {
                reason: format!("{name} is not set"),
            })
        }

        let mirror_source = required(self.mirror_source, "mirror_source")?;
        let mirror_target = required(self.mirror_target, "mirror_target")?;
        let archive_source = required(self.archive_source, "archive_source")?;
        let archive_destination = required(self.archive_destination, "archive_destination")?;

        let config = match self.staging_archive {
            Some(staging) => PipelineConfig::with_staging_archive(
                mirror_source,
                mirror_target,
                archive_source,
                archive_destination,
                staging,
            )?,
            None => PipelineConfig::new(
                mirror_source,
                mirror_target,
                archive_source,
                archive_destination,
            )?,
        };

        info!(
            mirror_source = %config.mirror_source().display(),
            mirror_target = %config.mirror_target().display(),
            archive_source = %config.archive_source().display(),
            archive_destination = %config.archive_destination().display(),
            "resolved pipeline config"
        );
        Ok(config)
    }
}

/// External tool settings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSettings {
    /// Mirror tool; defaults to robocopy on Windows and rsync elsewhere
    #[serde(default)]
    pub mirror: MirrorToolKind,
    /// Program path for the mirror tool
    pub mirror_program: Option<PathBuf>,
    /// Program path for 7-Zip
    pub seven_zip: Option<PathBuf>,
    /// Program path for PowerShell
    pub powershell: Option<PathBuf>,
}

impl ToolSettings {
    /// Instantiate the configured tools.
    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            mirror: self.mirror.create(self.mirror_program.clone()),
            primary: Box::new(
                self.seven_zip
                    .clone()
                    .map(SevenZip::new)
                    .unwrap_or_default(),
            ),
            secondary: Box::new(
                self.powershell
                    .clone()
                    .map(PowerShellArchive::new)
                    .unwrap_or_default(),
            ),
        }
    }
}

/// Parse config text; relative paths are left as written.
pub fn parse_config(text: &str, origin: &Path) -> Result<ConfigFile, DeployError> {
    toml::from_str(text).map_err(|e| DeployError::ConfigParse {
        path: origin.to_path_buf(),
        source: e,
    })
}

/// Read and parse a config file, anchoring relative paths at its directory.
///
/// # Errors
/// Returns `ConfigRead` if the file cannot be read and `ConfigParse` if it
/// is not valid for this schema (unknown keys included).
pub fn load_config_file(path: &Path) -> Result<ConfigFile, DeployError> {
    let text = fs::read_to_string(path).map_err(|e| DeployError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut file = parse_config(&text, path)?;

    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    file.paths = file.paths.relative_to(base);

    debug!(path = %path.display(), ?file, "config file loaded");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[paths]
mirror_source = "server"
mirror_target = "/deploy/server"
archive_source = "client"
archive_destination = "/deploy/client/Mod.zip"

[tools]
mirror = "robocopy"
seven_zip = "C:/Program Files/7-Zip/7z.exe"
"#;

    #[test]
    fn test_parse_sample() {
        let file = parse_config(SAMPLE, Path::new("modsync.toml")).expect("valid config");
        assert_eq!(file.paths.mirror_source, Some(PathBuf::from("server")));
        assert_eq!(file.tools.mirror, MirrorToolKind::Robocopy);
        assert_eq!(
            file.tools.seven_zip,
            Some(PathBuf::from("C:/Program Files/7-Zip/7z.exe"))
        );
        assert!(file.tools.powershell.is_none());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = parse_config("[paths]\nmirror_sorce = \"x\"\n", Path::new("bad.toml"));
        assert!(matches!(result, Err(DeployError::ConfigParse { .. })));
    }

    #[test]
    fn test_load_anchors_relative_paths_at_file_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("modsync.toml");
        fs::write(&path, SAMPLE).expect("Failed to write config");

        let file = load_config_file(&path).expect("config should load");
        assert_eq!(file.paths.mirror_source, Some(temp_dir.path().join("server")));
        assert_eq!(file.paths.archive_source, Some(temp_dir.path().join("client")));
        assert_eq!(file.paths.mirror_target, Some(PathBuf::from("/deploy/server")));
    }

    #[test]
    fn test_missing_file_is_config_read_error() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = load_config_file(&temp_dir.path().join("absent.toml"));
        assert!(matches!(result, Err(DeployError::ConfigRead { .. })));
    }

    #[test]
    fn test_overrides_win() {
        let base = PathSettings {
            mirror_source: Some("a".into()),
            mirror_target: Some("b".into()),
            ..Default::default()
        };
        let overrides = PathSettings {
            mirror_target: Some("override".into()),
            ..Default::default()
        };

        let merged = base.merge(overrides);
        assert_eq!(merged.mirror_source, Some(PathBuf::from("a")));
        assert_eq!(merged.mirror_target, Some(PathBuf::from("override")));
        assert!(!merged.is_complete());
    }

    #[test]
    fn test_resolve_reports_missing_location() {
        let settings = PathSettings {
            mirror_source: Some("a".into()),
            mirror_target: Some("b".into()),
            archive_source: Some("c".into()),
            ..Default::default()
        };
        match settings.resolve() {
            Err(DeployError::InvalidConfig { reason }) => {
                assert_eq!(reason, "archive_destination is not set")
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_uses_explicit_staging() {
        let settings = PathSettings {
            mirror_source: Some("a".into()),
            mirror_target: Some("b".into()),
            archive_source: Some("c".into()),
            archive_destination: Some("out/Mod.zip".into()),
            staging_archive: Some("tmp/Mod.zip".into()),
        };
        let config = settings.resolve().expect("complete settings");
        assert_eq!(config.staging_archive(), Path::new("tmp/Mod.zip"));
    }

    #[test]
    fn test_resolve_rejects_non_zip_staging() {
        let settings = PathSettings {
            mirror_source: Some("a".into()),
            mirror_target: Some("b".into()),
            archive_source: Some("c".into()),
            archive_destination: Some("out/Mod.zip".into()),
            staging_archive: Some("tmp/Mod.part".into()),
        };
        assert!(matches!(
            settings.resolve(),
            Err(DeployError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_toolchain_honours_program_overrides() {
        let tools = ToolSettings {
            mirror: MirrorToolKind::Robocopy,
            ..Default::default()
        };
        let toolchain = tools.toolchain();
        assert_eq!(toolchain.mirror.name(), "robocopy");
        assert_eq!(toolchain.primary.name(), "7z");
        assert_eq!(toolchain.secondary.name(), "powershell");
    }
}
