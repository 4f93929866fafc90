//! Groth16 backend over BN254
//!
//! Proving keys are stored in arkworks' compressed encoding; verification
//! keys are stored as snarkjs-layout JSON so that anything able to read a
//! snarkjs key can verify our proofs.

use std::fs;
use std::path::{Path, PathBuf};

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use super::format::{Groth16Proof, PublicSignals, VerificationKeyJson};
use super::transfer_circuit::TransferCircuit;
use super::{sha256_hex, ProvingArtifacts, ProvingBackend, VerifyingBackend};
use crate::error::{ProofError, TransferError, TransferResult};
use crate::witness::TransferWitness;

pub const PROVING_KEY_FILE: &str = "transfer.pk";
pub const VERIFICATION_KEY_FILE: &str = "verification_key.json";

/// Files written by [`Groth16Backend::write_artifacts`]
#[derive(Clone, Debug)]
pub struct GeneratedArtifacts {
    pub proving: ProvingArtifacts,
    pub verification_key: PathBuf,
}

/// Groth16 proof system for the transfer circuit
#[derive(Clone, Copy, Debug, Default)]
pub struct Groth16Backend;

impl Groth16Backend {
    pub fn new() -> Self {
        Self
    }

    /// Generate proving and verifying keys for the transfer circuit
    ///
    /// WARNING: the toxic waste comes from `rng`, which is fine for tests
    /// and local deployments only. Production keys come from a ceremony.
    pub fn setup<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<(ProvingKey<Bn254>, VerifyingKey<Bn254>), ProofError> {
        let circuit = TransferCircuit::default();

        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng)
            .map_err(|e| ProofError::SetupFailed(e.to_string()))?;

        debug!(
            public_inputs = vk.gamma_abc_g1.len() - 1,
            "transfer circuit setup complete"
        );
        Ok((pk, vk))
    }

    /// Run a setup and write `transfer.pk` and `verification_key.json` into `dir`
    pub fn write_artifacts<R: RngCore + CryptoRng>(
        dir: &Path,
        rng: &mut R,
    ) -> TransferResult<GeneratedArtifacts> {
        fs::create_dir_all(dir).map_err(|e| TransferError::io(dir, e))?;

        let (pk, vk) = Self::setup(rng)?;

        let mut pk_bytes = Vec::new();
        pk.serialize_compressed(&mut pk_bytes)
            .map_err(|e| ProofError::SerializationError(e.to_string()))?;

        let pk_path = dir.join(PROVING_KEY_FILE);
        fs::write(&pk_path, &pk_bytes).map_err(|e| TransferError::io(&pk_path, e))?;

        let vk_path = dir.join(VERIFICATION_KEY_FILE);
        let vk_json = serde_json::to_vec_pretty(&VerificationKeyJson::from_arkworks(&vk))?;
        fs::write(&vk_path, vk_json).map_err(|e| TransferError::io(&vk_path, e))?;

        let checksum = sha256_hex(&pk_bytes);
        info!(
            dir = %dir.display(),
            proving_key_bytes = pk_bytes.len(),
            sha256 = %checksum,
            "transfer artifacts written"
        );

        Ok(GeneratedArtifacts {
            proving: ProvingArtifacts {
                proving_key: pk_path,
                proving_key_sha256: Some(checksum),
            },
            verification_key: vk_path,
        })
    }

    /// Load the proving key, checking its pinned digest if there is one
    pub fn load_proving_key(artifacts: &ProvingArtifacts) -> Result<ProvingKey<Bn254>, ProofError> {
        let bytes = fs::read(&artifacts.proving_key).map_err(|source| {
            ProofError::ArtifactUnavailable {
                path: artifacts.proving_key.clone(),
                source,
            }
        })?;

        if let Some(expected) = &artifacts.proving_key_sha256 {
            let actual = sha256_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(ProofError::ChecksumMismatch {
                    file: artifacts.proving_key.display().to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        ProvingKey::<Bn254>::deserialize_compressed(&bytes[..])
            .map_err(|_| ProofError::InvalidProvingKey)
    }

    /// Prove with an already loaded key
    pub fn prove_with_key(
        pk: &ProvingKey<Bn254>,
        witness: &TransferWitness,
    ) -> Result<(Groth16Proof, PublicSignals), ProofError> {
        let circuit = TransferCircuit::from_witness(witness)?;
        let public_inputs = circuit.public_inputs().ok_or_else(|| {
            ProofError::ConstraintNotSatisfied("incomplete assignment".to_string())
        })?;

        // The prover assumes a satisfying assignment, so check first
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit
            .clone()
            .generate_constraints(cs.clone())
            .map_err(|e| ProofError::ConstraintNotSatisfied(e.to_string()))?;
        let satisfied = cs
            .is_satisfied()
            .map_err(|e| ProofError::ConstraintNotSatisfied(e.to_string()))?;
        if !satisfied {
            let which = cs.which_is_unsatisfied().ok().flatten().unwrap_or_default();
            return Err(ProofError::ConstraintNotSatisfied(which));
        }

        let proof = Groth16::<Bn254>::prove(pk, circuit, &mut OsRng)
            .map_err(|e| ProofError::GenerationFailed(e.to_string()))?;

        Ok((
            Groth16Proof::from_arkworks(&proof),
            PublicSignals::from_fields(&public_inputs),
        ))
    }
}

impl ProvingBackend for Groth16Backend {
    fn full_prove(
        &self,
        witness: &TransferWitness,
        artifacts: &ProvingArtifacts,
    ) -> Result<(Groth16Proof, PublicSignals), ProofError> {
        let pk = Self::load_proving_key(artifacts)?;
        Self::prove_with_key(&pk, witness)
    }
}

impl VerifyingBackend for Groth16Backend {
    fn verify(
        &self,
        vk: &VerificationKeyJson,
        signals: &PublicSignals,
        proof: &Groth16Proof,
    ) -> Result<bool, ProofError> {
        let vk = vk.to_arkworks()?;

        if signals.len() + 1 != vk.gamma_abc_g1.len() {
            warn!(
                expected = vk.gamma_abc_g1.len() - 1,
                got = signals.len(),
                "public signal count does not match verification key"
            );
            return Ok(false);
        }

        let inputs = match signals.to_fields()? {
            Some(inputs) => inputs,
            None => {
                debug!("public signal outside the scalar field");
                return Ok(false);
            }
        };

        let proof = match proof.to_arkworks()? {
            Some(proof) => proof,
            None => {
                debug!("proof point is not on the curve");
                return Ok(false);
            }
        };

        let pvk = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| ProofError::InvalidVerifyingKey(e.to_string()))?;

        Groth16::<Bn254>::verify_with_processed_vk(&pvk, &inputs, &proof)
            .map_err(|e| ProofError::InvalidVerifyingKey(e.to_string()))
    }
}
