//! zktips - Confidential Transfer Core
//!
//! Paillier-encrypted balances moved by Groth16-proven transfers.
//!
//! # Modules
//! - `crypto`: Cryptographic primitives (Poseidon sponge, commitment hasher, Paillier)
//! - `witness`: Transfer witness construction
//! - `proof`: Transfer circuit, proof formats and Groth16 proving/verification
//! - `ledger`: Encrypted-balance ledger interface and in-memory reference ledger
//! - `aggregation`: On-disk store for aggregated transfers
//! - `transfer`: Direct and aggregated transfer flows

pub mod aggregation;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod ledger;
pub mod proof;
pub mod transfer;
pub mod witness;

#[cfg(feature = "python")]
mod python;

// Re-export common types
pub use config::TransferConfig;
pub use crypto::{CommitmentHasher, KeyPair, PrivateKey, PublicKey};
pub use error::{
    CryptoError, HasherError, LedgerError, ProofError, TransferError, TransferResult, WitnessError,
};
pub use ledger::{InMemoryLedger, Ledger, TransferCall, TransferReceipt};
pub use proof::{
    reshape_pi_b, Groth16Backend, Groth16Proof, ProofEngine, ProvingArtifacts, ProvingBackend,
    PublicSignals, VerificationKeyJson, VerifyingBackend,
};
pub use transfer::TransferClient;
pub use witness::{build_witness, TransferWitness};
