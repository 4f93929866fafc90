//! Blinding randomness for Paillier encryption.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::error::CryptoError;

/// Uniform integer in `[0, bound)` from the OS CSPRNG
pub fn random_below(bound: &BigUint) -> Result<BigUint, CryptoError> {
    random_below_with(&mut OsRng, bound)
}

/// Uniform integer in `[0, bound)` from the given CSPRNG
pub fn random_below_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    bound: &BigUint,
) -> Result<BigUint, CryptoError> {
    if bound.is_zero() {
        return Err(CryptoError::EmptyRange);
    }
    Ok(rng.gen_biguint_below(bound))
}

pub fn random_unit(n: &BigUint) -> Result<BigUint, CryptoError> {
    random_unit_with(&mut OsRng, n)
}

/// Uniform unit of `Z_n`: non-zero and coprime to `n`.
///
/// A blinding factor sharing a factor with `n` yields a ciphertext that
/// does not decrypt, so such draws are rejected and redrawn.
pub fn random_unit_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    n: &BigUint,
) -> Result<BigUint, CryptoError> {
    if *n <= BigUint::one() {
        return Err(CryptoError::EmptyRange);
    }
    loop {
        let r = random_below_with(rng, n)?;
        if !r.is_zero() && r.gcd(n).is_one() {
            return Ok(r);
        }
    }
}
