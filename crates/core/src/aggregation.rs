//! On-disk store for aggregated transfers
//!
//! Each aggregated transfer leaves two files keyed by its index:
//! `proof_{index}.json` and `public_signals_{index}.json`. Either both exist
//! or neither does. Writes go through a `.json.tmp` file that is renamed
//! into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{TransferError, TransferResult};
use crate::proof::{Groth16Proof, PublicSignals};

pub struct AggregationStore {
    dir: PathBuf,
}

impl AggregationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn proof_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("proof_{}.json", index))
    }

    pub fn signals_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("public_signals_{}.json", index))
    }

    /// Write both files for `index`, replacing an earlier pair.
    ///
    /// Both files are staged next to their targets and renamed into place.
    /// A failed staging write leaves any earlier pair untouched; a failed
    /// rename leaves no file for `index`.
    pub fn persist(
        &self,
        index: u64,
        proof: &Groth16Proof,
        signals: &PublicSignals,
    ) -> TransferResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| TransferError::io(&self.dir, e))?;

        let files = [
            (self.proof_path(index), serde_json::to_vec_pretty(proof)?),
            (self.signals_path(index), serde_json::to_vec_pretty(signals)?),
        ];

        for (path, contents) in &files {
            let staged = staging_path(path);
            if let Err(e) = fs::write(&staged, contents) {
                files.iter().for_each(|(p, _)| remove_quietly(&staging_path(p)));
                return Err(TransferError::io(&staged, e));
            }
        }

        for (path, _) in &files {
            if let Err(e) = fs::rename(staging_path(path), path) {
                for (p, _) in &files {
                    remove_quietly(&staging_path(p));
                    remove_quietly(p);
                }
                return Err(TransferError::io(path, e));
            }
        }

        debug!(index, dir = %self.dir.display(), "aggregated proof persisted");
        Ok(())
    }

    pub fn load(&self, index: u64) -> TransferResult<(Groth16Proof, PublicSignals)> {
        let proof = read_json(&self.proof_path(index))?;
        let signals = read_json(&self.signals_path(index))?;
        Ok((proof, signals))
    }

    pub fn contains(&self, index: u64) -> bool {
        self.proof_path(index).is_file() && self.signals_path(index).is_file()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            warn!(path = %path.display(), error = %e, "could not remove file");
        }
        _ => {}
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> TransferResult<T> {
    let raw = fs::read(path).map_err(|e| TransferError::io(path, e))?;
    Ok(serde_json::from_slice(&raw)?)
}
