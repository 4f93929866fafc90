//! Transfer circuit for confidential balance updates
//!
//! Proves that a transfer's public ciphertexts were produced by someone who
//! holds the authorization secret behind the published commitment.
//!
//! Public inputs, in this fixed order:
//! - encrypted_sender_balance: sender's current balance ciphertext
//! - encrypted_sender_value: Enc_s(n_s - value), the debit
//! - encrypted_receiver_value: Enc_r(value), the credit
//! - auth_commitment: sponge hash of the authorization secret
//!
//! Private inputs (witness):
//! - auth_secret: preimage of the commitment
//!
//! The Paillier relations between the ciphertexts, the value and the key
//! material are checked on the witness before an assignment is built; an
//! assignment that fails them never reaches the prover.
//!
//! Those relations are not constraints. A verifier learns only that the
//! prover knows the secret and that the ciphertexts are non-zero; it does not
//! learn that the debit and credit encrypt the same amount. Value
//! conservation is not proven.

use ark_bn254::Fr;
use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use num_bigint::BigUint;

use super::gadgets::poseidon::poseidon_sponge_gadget;
use crate::crypto::hasher::COMMITMENT_DOMAIN;
use crate::encoding::fr_from_biguint;
use crate::error::ProofError;
use crate::witness::TransferWitness;

/// Transfer circuit. Binds a transfer to its auth secret, not to a value.
#[derive(Clone, Default)]
pub struct TransferCircuit {
    // ===== Public Inputs =====
    pub encrypted_sender_balance: Option<Fr>,
    pub encrypted_sender_value: Option<Fr>,
    pub encrypted_receiver_value: Option<Fr>,
    pub auth_commitment: Option<Fr>,

    // ===== Private Inputs (Witness) =====
    pub auth_secret: Option<Fr>,
}

impl TransferCircuit {
    /// Number of public inputs
    pub const NUM_PUBLIC_INPUTS: usize = 4;

    /// Build a full assignment from a transfer witness.
    ///
    /// Fails with `ConstraintNotSatisfied` if the ciphertext relations do not
    /// hold and with `FieldOverflow` if a value does not fit the scalar field.
    pub fn from_witness(witness: &TransferWitness) -> Result<Self, ProofError> {
        witness
            .check_relations()
            .map_err(|e| ProofError::ConstraintNotSatisfied(e.to_string()))?;

        Ok(Self {
            encrypted_sender_balance: Some(to_field(
                &witness.encrypted_sender_balance,
                "encryptedSenderBalance",
            )?),
            encrypted_sender_value: Some(to_field(
                &witness.encrypted_sender_value,
                "encryptedSenderValue",
            )?),
            encrypted_receiver_value: Some(to_field(
                &witness.encrypted_receiver_value,
                "encryptedReceiverValue",
            )?),
            auth_commitment: Some(to_field(&witness.auth_commitment, "authCommitment")?),
            auth_secret: Some(to_field(&witness.auth_secret, "authSecret")?),
        })
    }

    /// Public inputs in signal order
    pub fn public_inputs(&self) -> Option<Vec<Fr>> {
        Some(vec![
            self.encrypted_sender_balance?,
            self.encrypted_sender_value?,
            self.encrypted_receiver_value?,
            self.auth_commitment?,
        ])
    }
}

fn to_field(value: &BigUint, name: &'static str) -> Result<Fr, ProofError> {
    fr_from_biguint(value).map_err(|_| ProofError::FieldOverflow(name))
}

impl ConstraintSynthesizer<Fr> for TransferCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // ===== Allocate Public Inputs =====
        let encrypted_sender_balance_var = FpVar::new_input(cs.clone(), || {
            self.encrypted_sender_balance
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        let encrypted_sender_value_var = FpVar::new_input(cs.clone(), || {
            self.encrypted_sender_value
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        let encrypted_receiver_value_var = FpVar::new_input(cs.clone(), || {
            self.encrypted_receiver_value
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        let auth_commitment_var = FpVar::new_input(cs.clone(), || {
            self.auth_commitment.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // ===== Allocate Private Inputs (Witnesses) =====
        let auth_secret_var = FpVar::new_witness(cs.clone(), || {
            self.auth_secret.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // ===== Constraint 1: Ciphertexts are units =====
        // Zero is never a valid Paillier ciphertext
        let zero = FpVar::<Fr>::zero();
        encrypted_sender_balance_var.enforce_not_equal(&zero)?;
        encrypted_sender_value_var.enforce_not_equal(&zero)?;
        encrypted_receiver_value_var.enforce_not_equal(&zero)?;

        // ===== Constraint 2: Authorization =====
        // auth_commitment = sponge(auth_secret)
        let computed_commitment = poseidon_sponge_gadget(
            cs,
            &[auth_secret_var],
            Fr::from(COMMITMENT_DOMAIN),
        )?;
        computed_commitment.enforce_equal(&auth_commitment_var)?;

        Ok(())
    }
}
