//! Client configuration
//!
//! Artifact paths default to one directory (`artifacts/`); a TOML file may
//! override any of them. A pinned proving key checksum is validated on load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{validation, TransferError, TransferResult};
use crate::proof::groth16::{PROVING_KEY_FILE, VERIFICATION_KEY_FILE};
use crate::proof::ProvingArtifacts;

const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
const DEFAULT_AGGREGATION_DIR: &str = "aggregation";

/// Paths and pins used by a [`crate::transfer::TransferClient`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub proving_key: PathBuf,
    /// Hex SHA-256 of the proving key, checked before every proof
    pub proving_key_sha256: Option<String>,
    pub verification_key: PathBuf,
    /// Where aggregated transfers persist their proofs and signals
    pub aggregation_dir: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self::with_artifacts_dir(DEFAULT_ARTIFACTS_DIR)
    }
}

impl TransferConfig {
    /// Standard file names under one directory
    pub fn with_artifacts_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            proving_key: dir.join(PROVING_KEY_FILE),
            proving_key_sha256: None,
            verification_key: dir.join(VERIFICATION_KEY_FILE),
            aggregation_dir: dir.join(DEFAULT_AGGREGATION_DIR),
        }
    }

    /// Load from a TOML file. Missing keys take their default.
    pub fn from_file(path: &Path) -> TransferResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| TransferError::io(path, e))?;
        let config = Self::from_toml(&raw)?;
        debug!(path = %path.display(), "transfer config loaded");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> TransferResult<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| TransferError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TransferResult<()> {
        if let Some(digest) = &self.proving_key_sha256 {
            validation::validate_sha256_hex(digest)?;
        }
        Ok(())
    }

    pub fn artifacts(&self) -> ProvingArtifacts {
        ProvingArtifacts {
            proving_key: self.proving_key.clone(),
            proving_key_sha256: self.proving_key_sha256.clone(),
        }
    }
}
