//! Archive fingerprinting.
//!
//! After relocation the engine can record a digest of the archive now at
//! the destination, so reports from two runs can be compared without
//! unpacking anything.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use sha2::Digest;

use crate::error::DeployError;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5 (included for compatibility with older manifests)
    Md5,
    /// SHA-256
    Sha256,
    /// BLAKE3
    Blake3,
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!(
                "Invalid digest algorithm '{other}'. Must be 'md5', 'sha256', or 'blake3'"
            )),
        }
    }
}

/// A computed digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumValue {
    algorithm: ChecksumAlgorithm,
    hex: String,
}

impl ChecksumValue {
    fn new(algorithm: ChecksumAlgorithm, hex: String) -> Self {
        ChecksumValue { algorithm, hex }
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Format as "algo:hex"
    pub fn to_string_with_algo(&self) -> String {
        format!("{}:{}", self.algorithm, self.hex)
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex)
    }
}

enum Hasher {
    Md5(md5::Context),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => Hasher::Md5(md5::Context::new()),
            ChecksumAlgorithm::Sha256 => Hasher::Sha256(sha2::Sha256::new()),
            ChecksumAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(ctx) => ctx.consume(data),
            Hasher::Sha256(hasher) => hasher.update(data),
            Hasher::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finalize(self) -> ChecksumValue {
        match self {
            Hasher::Md5(ctx) => {
                ChecksumValue::new(ChecksumAlgorithm::Md5, format!("{:x}", ctx.compute()))
            }
            Hasher::Sha256(hasher) => {
                ChecksumValue::new(ChecksumAlgorithm::Sha256, format!("{:x}", hasher.finalize()))
            }
            Hasher::Blake3(hasher) => ChecksumValue::new(
                ChecksumAlgorithm::Blake3,
                hasher.finalize().to_hex().to_string(),
            ),
        }
    }
}

/// Compute the digest of a file.
///
/// # Errors
/// Returns `RelocationFailed` if the file cannot be read; digests are only
/// taken of relocated archives.
pub fn compute_file_checksum(
    path: &Path,
    algorithm: ChecksumAlgorithm,
) -> Result<ChecksumValue, DeployError> {
    let read_failed = |e: std::io::Error| DeployError::RelocationFailed {
        path: path.to_path_buf(),
        cause: format!("cannot read archive for digest: {e}"),
    };

    let mut file = File::open(path).map_err(read_failed)?;
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = [0u8; 65536];

    loop {
        let n = file.read(&mut buffer).map_err(read_failed)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}
