//! Poseidon sponge gadget for R1CS circuits
//!
//! Constraint-level twin of `crypto::poseidon`; both read the same constants,
//! so a commitment computed natively satisfies the in-circuit recomputation.

use ark_bn254::Fr;
use ark_r1cs_std::{
    alloc::AllocVar,
    fields::fp::FpVar,
    prelude::*,
};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::crypto::poseidon_constants::{FULL_ROUNDS, PARTIAL_ROUNDS, RATE, WIDTH};

/// Poseidon hash gadget for circuits
pub struct PoseidonGadget {
    /// Round constants as constraint variables
    round_constants: Vec<FpVar<Fr>>,
    /// MDS matrix as constraint variables
    mds_matrix: Vec<Vec<FpVar<Fr>>>,
}

impl PoseidonGadget {
    /// Create a new Poseidon gadget with the standard constants
    pub fn new(cs: ConstraintSystemRef<Fr>) -> Result<Self, SynthesisError> {
        // Load constants from the standard module
        let rc = crate::crypto::poseidon_constants::round_constants();
        let mds = crate::crypto::poseidon_constants::mds_matrix();

        // Allocate round constants as constants (not witnesses)
        let round_constants: Result<Vec<FpVar<Fr>>, _> = rc
            .iter()
            .map(|c| FpVar::new_constant(cs.clone(), *c))
            .collect();

        // Allocate MDS matrix as constants
        let mds_matrix: Result<Vec<Vec<FpVar<Fr>>>, _> = mds
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| FpVar::new_constant(cs.clone(), *c))
                    .collect()
            })
            .collect();

        Ok(Self {
            round_constants: round_constants?,
            mds_matrix: mds_matrix?,
        })
    }

    /// Hash two field elements with domain separator 0
    pub fn hash2(
        &self,
        cs: ConstraintSystemRef<Fr>,
        a: &FpVar<Fr>,
        b: &FpVar<Fr>,
    ) -> Result<FpVar<Fr>, SynthesisError> {
        let zero = FpVar::new_constant(cs, Fr::from(0u64))?;
        let mut state = vec![zero, a.clone(), b.clone()];

        self.permute(&mut state)?;

        Ok(state[0].clone())
    }

    /// Sponge hash, identical to `crypto::poseidon::Poseidon::sponge`
    pub fn sponge(
        &self,
        cs: ConstraintSystemRef<Fr>,
        inputs: &[FpVar<Fr>],
        domain: Fr,
    ) -> Result<FpVar<Fr>, SynthesisError> {
        if inputs.is_empty() {
            return Err(SynthesisError::AssignmentMissing);
        }

        let zero = FpVar::new_constant(cs.clone(), Fr::from(0u64))?;
        let capacity = FpVar::new_constant(cs, domain)?;
        let mut state = vec![capacity, zero.clone(), zero];

        for chunk in inputs.chunks(RATE) {
            for (i, input) in chunk.iter().enumerate() {
                state[i + 1] = &state[i + 1] + input;
            }
            self.permute(&mut state)?;
        }

        Ok(state[0].clone())
    }

    /// Apply the Poseidon permutation to the state
    fn permute(&self, state: &mut [FpVar<Fr>]) -> Result<(), SynthesisError> {
        let t = WIDTH;
        let rf = FULL_ROUNDS;
        let rp = PARTIAL_ROUNDS;

        let mut round_ctr = 0;

        // First half of full rounds
        for _ in 0..(rf / 2) {
            self.full_round(state, round_ctr)?;
            round_ctr += t;
        }

        // Partial rounds
        for _ in 0..rp {
            self.partial_round(state, round_ctr)?;
            round_ctr += t;
        }

        // Second half of full rounds
        for _ in 0..(rf / 2) {
            self.full_round(state, round_ctr)?;
            round_ctr += t;
        }

        Ok(())
    }

    /// Full round: S-box on all elements, then MDS
    fn full_round(
        &self,
        state: &mut [FpVar<Fr>],
        round_ctr: usize,
    ) -> Result<(), SynthesisError> {
        // Add round constants
        for i in 0..WIDTH {
            state[i] = &state[i] + &self.round_constants[round_ctr + i];
        }

        // S-box (x^5) on all elements
        for elem in state.iter_mut() {
            *elem = self.sbox(elem)?;
        }

        // MDS matrix multiplication
        self.mds_multiply(state)?;

        Ok(())
    }

    /// Partial round: S-box on first element only, then MDS
    fn partial_round(
        &self,
        state: &mut [FpVar<Fr>],
        round_ctr: usize,
    ) -> Result<(), SynthesisError> {
        // Add round constants
        for i in 0..WIDTH {
            state[i] = &state[i] + &self.round_constants[round_ctr + i];
        }

        // S-box only on first element
        state[0] = self.sbox(&state[0])?;

        // MDS matrix multiplication
        self.mds_multiply(state)?;

        Ok(())
    }

    /// S-box function: x^5
    fn sbox(&self, x: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
        // x^2
        let x2 = x * x;
        // x^4
        let x4 = &x2 * &x2;
        // x^5
        Ok(&x4 * x)
    }

    /// Multiply state by MDS matrix
    fn mds_multiply(&self, state: &mut [FpVar<Fr>]) -> Result<(), SynthesisError> {
        let mut new_state = Vec::with_capacity(WIDTH);

        for i in 0..WIDTH {
            let mut sum = FpVar::zero();
            for j in 0..WIDTH {
                sum = sum + (&self.mds_matrix[i][j] * &state[j]);
            }
            new_state.push(sum);
        }

        // FpVar doesn't implement Copy, so clone each element
        for (i, val) in new_state.into_iter().enumerate() {
            state[i] = val;
        }
        Ok(())
    }
}

/// Standalone sponge over field element variables
pub fn poseidon_sponge_gadget(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
    domain: Fr,
) -> Result<FpVar<Fr>, SynthesisError> {
    let gadget = PoseidonGadget::new(cs.clone())?;
    gadget.sponge(cs, inputs, domain)
}
