//! Python bindings, enabled with the `python` feature

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::crypto::CommitmentHasher;
use crate::proof::{Groth16Backend, Groth16Proof, PublicSignals, VerificationKeyJson, VerifyingBackend};

/// Sponge commitment over decimal field elements
///
/// # Arguments
/// * `inputs` - Field elements as decimal strings
///
/// # Returns
/// * Commitment as a decimal string
#[pyfunction]
fn commitment_hash(inputs: Vec<String>) -> PyResult<String> {
    let hasher = CommitmentHasher::initialized();
    hasher
        .multi_hash_decimal(&inputs)
        .map_err(|e| PyValueError::new_err(format!("Commitment hash failed: {}", e)))
}

/// Verify a Groth16 transfer proof
///
/// # Arguments
/// * `proof_json` - Proof in snarkjs layout
/// * `signals_json` - Public signals as a JSON array of decimal strings
/// * `vk_json` - Verification key in snarkjs layout
///
/// # Returns
/// * Boolean indicating if proof is valid
#[pyfunction]
fn verify_proof(proof_json: &str, signals_json: &str, vk_json: &str) -> PyResult<bool> {
    let proof: Groth16Proof = serde_json::from_str(proof_json)
        .map_err(|e| PyValueError::new_err(format!("Invalid proof JSON: {}", e)))?;
    let signals: PublicSignals = serde_json::from_str(signals_json)
        .map_err(|e| PyValueError::new_err(format!("Invalid signals JSON: {}", e)))?;
    let vk: VerificationKeyJson = serde_json::from_str(vk_json)
        .map_err(|e| PyValueError::new_err(format!("Invalid verification key JSON: {}", e)))?;

    Groth16Backend
        .verify(&vk, &signals, &proof)
        .map_err(|e| PyRuntimeError::new_err(format!("Proof verification failed: {}", e)))
}

/// Proof arguments for a Solidity verifier, as JSON
#[pyfunction]
fn solidity_calldata(proof_json: &str) -> PyResult<String> {
    let proof: Groth16Proof = serde_json::from_str(proof_json)
        .map_err(|e| PyValueError::new_err(format!("Invalid proof JSON: {}", e)))?;
    serde_json::to_string(&proof.to_solidity())
        .map_err(|e| PyRuntimeError::new_err(format!("Serialization failed: {}", e)))
}

/// Python module definition
#[pymodule]
fn _zktips_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(commitment_hash, m)?)?;
    m.add_function(wrap_pyfunction!(verify_proof, m)?)?;
    m.add_function(wrap_pyfunction!(solidity_calldata, m)?)?;

    // Add version
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
