//! Cryptographic primitives for confidential transfers

pub mod hasher;
pub mod paillier;
pub mod poseidon;
pub mod poseidon_constants;
pub mod randomness;

pub use hasher::CommitmentHasher;
pub use paillier::{KeyPair, PrivateKey, PublicKey};
pub use poseidon::Poseidon;
pub use randomness::{random_below, random_below_with, random_unit, random_unit_with};
