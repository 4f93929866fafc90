//! zkSNARK proof generation and verification
//!
//! Components:
//! - `gadgets`: R1CS constraint gadgets (Poseidon sponge)
//! - `transfer_circuit`: the transfer circuit and its assignment
//! - `format`: snarkjs-layout JSON for proofs, signals and keys
//! - `groth16`: arkworks Groth16 backend
//!
//! [`ProofEngine`] is the entry point the transfer layer uses. It is generic
//! over the backend so that the circuit toolchain can be swapped without
//! touching the orchestration.

pub mod format;
pub mod gadgets;
pub mod groth16;
pub mod transfer_circuit;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{validation, ProofError, TransferError, TransferResult};
use crate::witness::TransferWitness;

pub use format::{reshape_pi_b, Groth16Proof, PublicSignals, SolidityProof, VerificationKeyJson};
pub use groth16::Groth16Backend;
pub use transfer_circuit::TransferCircuit;

/// Positions of the transfer circuit's public signals
pub mod signal {
    pub const ENCRYPTED_SENDER_BALANCE: usize = 0;
    pub const ENCRYPTED_SENDER_VALUE: usize = 1;
    pub const ENCRYPTED_RECEIVER_VALUE: usize = 2;
    pub const AUTH_COMMITMENT: usize = 3;

    pub const COUNT: usize = 4;
}

/// Location of the compiled proving material
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvingArtifacts {
    pub proving_key: PathBuf,
    /// Hex SHA-256 the proving key must match, if pinned
    pub proving_key_sha256: Option<String>,
}

impl ProvingArtifacts {
    pub fn new(proving_key: impl Into<PathBuf>) -> Self {
        Self {
            proving_key: proving_key.into(),
            proving_key_sha256: None,
        }
    }

    pub fn with_checksum(mut self, sha256: impl Into<String>) -> Self {
        self.proving_key_sha256 = Some(sha256.into());
        self
    }
}

/// Produces a proof and its public signals from a full witness
pub trait ProvingBackend: Send + Sync {
    fn full_prove(
        &self,
        witness: &TransferWitness,
        artifacts: &ProvingArtifacts,
    ) -> Result<(Groth16Proof, PublicSignals), ProofError>;
}

/// Checks a proof against a verification key and public signals.
///
/// Returns `Ok(false)` for a well-formed proof that does not verify and an
/// error only when an input can't be decoded at all.
pub trait VerifyingBackend: Send + Sync {
    fn verify(
        &self,
        vk: &VerificationKeyJson,
        signals: &PublicSignals,
        proof: &Groth16Proof,
    ) -> Result<bool, ProofError>;
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Read a snarkjs-layout verification key from disk
pub fn load_verification_key(path: &Path) -> TransferResult<VerificationKeyJson> {
    let raw = fs::read_to_string(path).map_err(|e| TransferError::io(path, e))?;
    let vk = serde_json::from_str(&raw)
        .map_err(|e| ProofError::Parse(format!("{}: {}", path.display(), e)))?;
    Ok(vk)
}

/// Proof engine over a proving and verifying backend
pub struct ProofEngine<B> {
    backend: Arc<B>,
}

impl<B> Clone for ProofEngine<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B> ProofEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_arc(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: ProvingBackend> ProofEngine<B> {
    /// Generate a proof and its four public signals
    pub fn prove(
        &self,
        witness: &TransferWitness,
        artifacts: &ProvingArtifacts,
    ) -> Result<(Groth16Proof, PublicSignals), ProofError> {
        prove_with(self.backend.as_ref(), witness, artifacts)
    }
}

impl<B: ProvingBackend + 'static> ProofEngine<B> {
    /// [`Self::prove`] on the blocking thread pool
    pub async fn prove_async(
        &self,
        witness: TransferWitness,
        artifacts: ProvingArtifacts,
    ) -> Result<(Groth16Proof, PublicSignals), ProofError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || prove_with(backend.as_ref(), &witness, &artifacts))
            .await
            .map_err(|e| ProofError::TaskAborted(e.to_string()))?
    }
}

impl<B: VerifyingBackend> ProofEngine<B> {
    pub fn verify(
        &self,
        vk: &VerificationKeyJson,
        signals: &PublicSignals,
        proof: &Groth16Proof,
    ) -> Result<bool, ProofError> {
        let valid = self.backend.verify(vk, signals, proof)?;
        debug!(valid, "proof verified");
        Ok(valid)
    }

    /// Verify against a verification key stored at `vk_path`
    pub fn verify_with_key_file(
        &self,
        vk_path: &Path,
        signals: &PublicSignals,
        proof: &Groth16Proof,
    ) -> TransferResult<bool> {
        let vk = load_verification_key(vk_path)?;
        Ok(self.verify(&vk, signals, proof)?)
    }
}

impl<B: VerifyingBackend + 'static> ProofEngine<B> {
    /// [`Self::verify`] on the blocking thread pool
    pub async fn verify_async(
        &self,
        vk: VerificationKeyJson,
        signals: PublicSignals,
        proof: Groth16Proof,
    ) -> Result<bool, ProofError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.verify(&vk, &signals, &proof))
            .await
            .map_err(|e| ProofError::TaskAborted(e.to_string()))?
    }
}

fn prove_with<B: ProvingBackend + ?Sized>(
    backend: &B,
    witness: &TransferWitness,
    artifacts: &ProvingArtifacts,
) -> Result<(Groth16Proof, PublicSignals), ProofError> {
    debug!(
        proving_key = %artifacts.proving_key.display(),
        pinned = artifacts.proving_key_sha256.is_some(),
        "generating transfer proof"
    );
    let (proof, signals) = backend.full_prove(witness, artifacts)?;
    validation::validate_signal_count(signals.len(), signal::COUNT)?;
    info!(signals = signals.len(), "transfer proof generated");
    Ok((proof, signals))
}
