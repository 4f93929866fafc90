//! Circuit gadgets for zkSNARK proofs

pub mod poseidon;

pub use poseidon::PoseidonGadget;
