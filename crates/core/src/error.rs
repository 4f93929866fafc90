//! Unified Error Types for zktips
//!
//! Every stage of a transfer has its own error enum; all of them fold into
//! [`TransferError`] so the orchestrator can propagate with `?`.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for transfer flows
#[derive(Error, Debug)]
pub enum TransferError {
    /// Commitment hasher misuse
    #[error("Hasher error: {0}")]
    Hasher(#[from] HasherError),

    /// Paillier arithmetic or key error
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// Witness could not be assembled
    #[error("Invalid witness: {0}")]
    Witness(#[from] WitnessError),

    /// Proof generation/verification error
    #[error("Proof error: {0}")]
    Proof(#[from] ProofError),

    /// Ledger contract call failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Artifact read/write failure
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;

impl TransferError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the commitment hasher
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HasherError {
    #[error("Hasher not initialized, call init() first")]
    Uninitialized,

    #[error("Cannot hash an empty input")]
    EmptyInput,

    #[error("Invalid field element: {0}")]
    InvalidFieldElement(String),
}

/// Errors from Paillier key handling and arithmetic
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Key size too small: {0} bits")]
    KeySizeTooSmall(u64),

    #[error("Primes must be distinct and odd")]
    InvalidPrimes,

    #[error("Value has no inverse modulo n")]
    NotInvertible,

    #[error("Plaintext out of range [0, n)")]
    PlaintextOutOfRange,

    #[error("Ciphertext out of range [0, n^2)")]
    CiphertextOutOfRange,

    #[error("Randomness bound must be greater than zero")]
    EmptyRange,
}

/// Errors from witness construction
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WitnessError {
    #[error("Value {value} is not below the {party} modulus")]
    ValueOutOfRange { party: &'static str, value: String },

    #[error("Encrypted sender balance is not below n^2")]
    BalanceOutOfRange,

    #[error("Encryption failed: {0}")]
    Encryption(#[from] CryptoError),

    #[error("Witness relation does not hold: {0}")]
    RelationViolated(String),
}

/// Errors from proof operations
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("Circuit constraint not satisfied: {0}")]
    ConstraintNotSatisfied(String),

    #[error("Witness value does not fit the scalar field: {0}")]
    FieldOverflow(&'static str),

    #[error("Proof generation failed: {0}")]
    GenerationFailed(String),

    #[error("Proving artifact unavailable at {}: {source}", path.display())]
    ArtifactUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid proving key")]
    InvalidProvingKey,

    #[error("Invalid verifying key: {0}")]
    InvalidVerifyingKey(String),

    #[error("Setup failed: {0}")]
    SetupFailed(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Expected {expected} public signals, got {got}")]
    SignalCount { expected: usize, got: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Proving task aborted: {0}")]
    TaskAborted(String),
}

/// Errors from ledger contract calls
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unknown account {0}")]
    UnknownAccount(u64),

    #[error("Account {0} already registered")]
    AlreadyRegistered(u64),

    #[error("Proof rejected by verifier")]
    InvalidProof,

    #[error("Auth commitment does not match the one registered for account {0}")]
    Unauthorized(u64),

    #[error("Proof was built against a stale balance for account {0}")]
    StaleBalance(u64),

    #[error("Transfer rejected: {0}")]
    Rejected(String),
}

/// Input validation utilities
pub mod validation {
    use num_bigint::BigUint;

    use super::*;

    /// Validate that a plaintext value lies in `[0, n)`
    pub fn validate_value(value: &BigUint, n: &BigUint, party: &'static str) -> Result<(), WitnessError> {
        if value >= n {
            return Err(WitnessError::ValueOutOfRange {
                party,
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Validate that a ciphertext lies in `[0, n^2)`
    pub fn validate_ciphertext(ciphertext: &BigUint, n_squared: &BigUint) -> Result<(), WitnessError> {
        if ciphertext >= n_squared {
            return Err(WitnessError::BalanceOutOfRange);
        }
        Ok(())
    }

    /// Validate the number of public signals a circuit produced
    pub fn validate_signal_count(got: usize, expected: usize) -> Result<(), ProofError> {
        if got != expected {
            return Err(ProofError::SignalCount { expected, got });
        }
        Ok(())
    }

    /// Validate a hex-encoded SHA-256 digest
    pub fn validate_sha256_hex(digest: &str) -> Result<(), TransferError> {
        let bytes = hex::decode(digest)
            .map_err(|e| TransferError::Configuration(format!("invalid checksum hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(TransferError::Configuration(format!(
                "checksum must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(())
    }
}
