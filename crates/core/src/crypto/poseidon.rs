//! Poseidon Sponge
//!
//! A zkSNARK-friendly hash over the BN254 scalar field, used for
//! authorization commitments. The permutation follows the Poseidon paper
//! (https://eprint.iacr.org/2019/458).
//!
//! Parameters:
//! - Field: BN254 scalar field (Fr)
//! - Width: 3 (rate 2, capacity 1)
//! - Full rounds: 8 (4 at start, 4 at end)
//! - Partial rounds: 57
//! - S-box: x^5
//!
//! The sponge seeds the capacity lane with a domain separator, absorbs two
//! elements per permutation by field addition and squeezes lane 0. The
//! circuit gadget in `proof::gadgets::poseidon` mirrors it exactly.

use ark_bn254::Fr;
use ark_ff::Field;

use super::poseidon_constants::{self, RATE, WIDTH};

/// Poseidon parameters for width t=3
pub struct PoseidonParams {
    /// Number of full rounds
    pub full_rounds: usize,
    /// Number of partial rounds
    pub partial_rounds: usize,
    /// Round constants
    pub round_constants: Vec<Fr>,
    /// MDS matrix
    pub mds_matrix: [[Fr; WIDTH]; WIDTH],
}

impl Default for PoseidonParams {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseidonParams {
    /// Create Poseidon parameters for BN254 with t=3
    pub fn new() -> Self {
        Self {
            full_rounds: poseidon_constants::FULL_ROUNDS,
            partial_rounds: poseidon_constants::PARTIAL_ROUNDS,
            round_constants: poseidon_constants::round_constants(),
            mds_matrix: poseidon_constants::mds_matrix(),
        }
    }
}

/// Poseidon permutation with its constants
pub struct Poseidon {
    params: PoseidonParams,
}

impl Default for Poseidon {
    fn default() -> Self {
        Self::new()
    }
}

impl Poseidon {
    pub fn new() -> Self {
        Self {
            params: PoseidonParams::new(),
        }
    }

    /// Hash two field elements with domain separator 0
    pub fn hash2(&self, a: &Fr, b: &Fr) -> Fr {
        let mut state = [Fr::from(0u64), *a, *b];
        self.permute(&mut state);
        state[0]
    }

    /// Sponge hash over an ordered, non-empty sequence of field elements.
    ///
    /// Returns `None` for an empty input.
    pub fn sponge(&self, inputs: &[Fr], domain: Fr) -> Option<Fr> {
        if inputs.is_empty() {
            return None;
        }

        let mut state = [domain, Fr::from(0u64), Fr::from(0u64)];
        for chunk in inputs.chunks(RATE) {
            for (i, input) in chunk.iter().enumerate() {
                state[i + 1] += input;
            }
            self.permute(&mut state);
        }

        Some(state[0])
    }

    /// Apply the Poseidon permutation to the state
    fn permute(&self, state: &mut [Fr; WIDTH]) {
        let rf = self.params.full_rounds;
        let rp = self.params.partial_rounds;

        let mut round_ctr = 0;

        for _ in 0..(rf / 2) {
            self.full_round(state, round_ctr);
            round_ctr += WIDTH;
        }

        for _ in 0..rp {
            self.partial_round(state, round_ctr);
            round_ctr += WIDTH;
        }

        for _ in 0..(rf / 2) {
            self.full_round(state, round_ctr);
            round_ctr += WIDTH;
        }
    }

    /// Full round: S-box on all elements, then MDS
    fn full_round(&self, state: &mut [Fr; WIDTH], round_ctr: usize) {
        for (i, elem) in state.iter_mut().enumerate() {
            *elem += self.params.round_constants[round_ctr + i];
        }

        for elem in state.iter_mut() {
            *elem = sbox(*elem);
        }

        self.mds_multiply(state);
    }

    /// Partial round: S-box on first element only, then MDS
    fn partial_round(&self, state: &mut [Fr; WIDTH], round_ctr: usize) {
        for (i, elem) in state.iter_mut().enumerate() {
            *elem += self.params.round_constants[round_ctr + i];
        }

        state[0] = sbox(state[0]);

        self.mds_multiply(state);
    }

    fn mds_multiply(&self, state: &mut [Fr; WIDTH]) {
        let mut new_state = [Fr::from(0u64); WIDTH];

        for (i, row) in self.params.mds_matrix.iter().enumerate() {
            for (j, m) in row.iter().enumerate() {
                new_state[i] += *m * state[j];
            }
        }

        *state = new_state;
    }
}

/// S-box function: x^5
#[inline]
fn sbox(x: Fr) -> Fr {
    let x2 = x.square();
    let x4 = x2.square();
    x4 * x
}
