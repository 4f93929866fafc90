//! Poseidon constants for the BN254 scalar field
//!
//! Parameters:
//! - Field: BN254 scalar field (Fr)
//! - Width: t = 3 (rate 2, capacity 1)
//! - Full rounds: RF = 8 (4 at start, 4 at end)
//! - Partial rounds: RP = 57
//! - S-box: x^5
//!
//! Round constants are read from a BLAKE3 extendable output keyed by
//! [`CONSTANTS_DOMAIN`], 64 bytes per constant reduced mod r. The MDS matrix
//! is the Cauchy matrix `1 / (i + t + j)`. The native sponge and the circuit
//! gadget both build their state from these two functions.

use ark_bn254::Fr;
use ark_ff::PrimeField;

pub const FULL_ROUNDS: usize = 8;

pub const PARTIAL_ROUNDS: usize = 57;

/// State width
pub const WIDTH: usize = 3;

/// Elements absorbed per permutation (capacity 1)
pub const RATE: usize = WIDTH - 1;

/// One constant per lane per round
pub const NUM_CONSTANTS: usize = WIDTH * (FULL_ROUNDS + PARTIAL_ROUNDS);

pub const CONSTANTS_DOMAIN: &[u8] = b"zktips/poseidon/bn254/t3/rf8/rp57";

/// Round constants in application order
pub fn round_constants() -> Vec<Fr> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CONSTANTS_DOMAIN);
    let mut stream = hasher.finalize_xof();

    let mut wide = [0u8; 64];
    (0..NUM_CONSTANTS)
        .map(|_| {
            stream.fill(&mut wide);
            Fr::from_le_bytes_mod_order(&wide)
        })
        .collect()
}

/// Cauchy MDS matrix
pub fn mds_matrix() -> [[Fr; WIDTH]; WIDTH] {
    let one = Fr::from(1u64);
    let mut matrix = [[Fr::from(0u64); WIDTH]; WIDTH];
    for (i, row) in matrix.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            // x_i + y_j ranges over [t, 3t - 2], never zero
            *cell = one / Fr::from((i + WIDTH + j) as u64);
        }
    }
    matrix
}
