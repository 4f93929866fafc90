//! Paillier cryptosystem
//!
//! Additively homomorphic public-key encryption over `Z_{n^2}`:
//!
//! - `Enc(m, r) = g^m * r^n mod n^2` with `g = n + 1`
//! - `Dec(c) = L(c^lambda mod n^2) * mu mod n`, `L(x) = (x - 1) / n`
//! - `Enc(a) * Enc(b) mod n^2 = Enc(a + b mod n)`
//!
//! Transfers subtract by adding the encryption of `n - value`.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::randomness::random_unit_with;
use crate::encoding::decimal;
use crate::error::CryptoError;

/// Smallest modulus accepted by key generation
pub const MIN_KEY_BITS: u64 = 32;

/// Miller-Rabin rounds for prime generation
const MILLER_RABIN_ROUNDS: usize = 40;

/// Paillier public key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PublicKeyRepr")]
pub struct PublicKey {
    #[serde(with = "decimal")]
    pub n: BigUint,
    #[serde(with = "decimal")]
    pub g: BigUint,
    #[serde(skip)]
    n_squared: BigUint,
}

#[derive(Deserialize)]
struct PublicKeyRepr {
    #[serde(with = "decimal")]
    n: BigUint,
    #[serde(with = "decimal")]
    g: BigUint,
}

impl From<PublicKeyRepr> for PublicKey {
    fn from(repr: PublicKeyRepr) -> Self {
        Self::with_generator(repr.n, repr.g)
    }
}

/// Paillier private key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKey {
    #[serde(with = "decimal")]
    pub lambda: BigUint,
    #[serde(with = "decimal")]
    pub mu: BigUint,
    #[serde(with = "decimal")]
    pub n: BigUint,
}

/// A Paillier key pair owned by one party
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl PublicKey {
    /// Public key with the standard generator `g = n + 1`
    pub fn new(n: BigUint) -> Self {
        let g = &n + 1u32;
        Self::with_generator(n, g)
    }

    pub fn with_generator(n: BigUint, g: BigUint) -> Self {
        let n_squared = &n * &n;
        Self { n, g, n_squared }
    }

    pub fn n_squared(&self) -> &BigUint {
        &self.n_squared
    }

    /// Encrypt `m` in `[0, n)` with blinding `r` in `[0, n)`
    pub fn encrypt(&self, m: &BigUint, r: &BigUint) -> Result<BigUint, CryptoError> {
        if *m >= self.n {
            return Err(CryptoError::PlaintextOutOfRange);
        }
        if *r >= self.n {
            return Err(CryptoError::PlaintextOutOfRange);
        }
        let gm = self.g.modpow(m, &self.n_squared);
        let rn = r.modpow(&self.n, &self.n_squared);
        Ok((gm * rn) % &self.n_squared)
    }

    /// Encrypt with fresh blinding; returns the ciphertext and the blinding
    pub fn encrypt_random<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        m: &BigUint,
    ) -> Result<(BigUint, BigUint), CryptoError> {
        let r = random_unit_with(rng, &self.n)?;
        let c = self.encrypt(m, &r)?;
        Ok((c, r))
    }

    /// Homomorphic addition of two ciphertexts
    pub fn addition(&self, a: &BigUint, b: &BigUint) -> Result<BigUint, CryptoError> {
        if *a >= self.n_squared || *b >= self.n_squared {
            return Err(CryptoError::CiphertextOutOfRange);
        }
        Ok((a * b) % &self.n_squared)
    }

    /// Fold any number of ciphertexts into one
    pub fn addition_all<'a, I>(&self, ciphertexts: I) -> Result<BigUint, CryptoError>
    where
        I: IntoIterator<Item = &'a BigUint>,
    {
        ciphertexts
            .into_iter()
            .try_fold(BigUint::one(), |acc, c| self.addition(&acc, c))
    }
}

impl PrivateKey {
    /// Recover the plaintext of a ciphertext
    pub fn decrypt(&self, c: &BigUint) -> Result<BigUint, CryptoError> {
        let n_squared = &self.n * &self.n;
        if *c >= n_squared || c.is_zero() {
            return Err(CryptoError::CiphertextOutOfRange);
        }
        let u = c.modpow(&self.lambda, &n_squared);
        if u.is_zero() {
            return Err(CryptoError::CiphertextOutOfRange);
        }
        Ok((l_function(&u, &self.n) * &self.mu) % &self.n)
    }
}

impl KeyPair {
    /// Build a key pair from two distinct odd primes
    pub fn from_primes(p: &BigUint, q: &BigUint) -> Result<Self, CryptoError> {
        if p == q || p.is_even() || q.is_even() {
            return Err(CryptoError::InvalidPrimes);
        }
        let n = p * q;
        let one = BigUint::one();
        let lambda = (p - &one).lcm(&(q - &one));
        let mu = lambda.modinv(&n).ok_or(CryptoError::NotInvertible)?;

        Ok(Self {
            public_key: PublicKey::new(n.clone()),
            private_key: PrivateKey { lambda, mu, n },
        })
    }

    /// Generate a key pair with an `n` of roughly `bits` bits
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R, bits: u64) -> Result<Self, CryptoError> {
        if bits < MIN_KEY_BITS {
            return Err(CryptoError::KeySizeTooSmall(bits));
        }
        let prime_bits = bits / 2;
        loop {
            let p = random_prime(rng, prime_bits);
            let q = random_prime(rng, prime_bits);
            if p == q {
                continue;
            }
            match Self::from_primes(&p, &q) {
                Ok(keys) => return Ok(keys),
                Err(CryptoError::NotInvertible) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// The modulus shared by both halves
    pub fn n(&self) -> &BigUint {
        &self.public_key.n
    }
}

fn l_function(u: &BigUint, n: &BigUint) -> BigUint {
    (u - 1u32) / n
}

/// Random prime with the top two bits set, so `p * q` has the full length
fn random_prime<R: RngCore + CryptoRng>(rng: &mut R, bits: u64) -> BigUint {
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(bits - 2, true);
        candidate.set_bit(0, true);
        if is_probable_prime(rng, &candidate, MILLER_RABIN_ROUNDS) {
            return candidate;
        }
    }
}

/// Miller-Rabin primality test
pub fn is_probable_prime<R: RngCore + CryptoRng>(rng: &mut R, n: &BigUint, rounds: usize) -> bool {
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    for small in [2u32, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        let small = BigUint::from(small);
        if *n == small {
            return true;
        }
        if (n % &small).is_zero() {
            return false;
        }
    }

    let one = BigUint::one();
    let n_minus_one = n - &one;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn small_keys() -> KeyPair {
        // 2^31 - 1 and 2^61 - 1
        KeyPair::from_primes(
            &BigUint::from(2_147_483_647u64),
            &BigUint::from(2_305_843_009_213_693_951u64),
        )
        .unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let keys = small_keys();
        let m = BigUint::from(4242u32);
        let (c, _) = keys.public_key.encrypt_random(&mut OsRng, &m).unwrap();

        assert_eq!(keys.private_key.decrypt(&c).unwrap(), m);
    }

    #[test]
    fn test_encryption_is_randomized() {
        let keys = small_keys();
        let m = BigUint::from(7u32);
        let (c1, _) = keys.public_key.encrypt_random(&mut OsRng, &m).unwrap();
        let (c2, _) = keys.public_key.encrypt_random(&mut OsRng, &m).unwrap();

        assert_ne!(c1, c2);
        assert_eq!(keys.private_key.decrypt(&c1).unwrap(), keys.private_key.decrypt(&c2).unwrap());
    }

    #[test]
    fn test_homomorphic_addition() {
        let keys = small_keys();
        let pk = &keys.public_key;
        let (a, _) = pk.encrypt_random(&mut OsRng, &BigUint::from(500u32)).unwrap();
        let (b, _) = pk.encrypt_random(&mut OsRng, &BigUint::from(250u32)).unwrap();

        let sum = pk.addition(&a, &b).unwrap();
        assert_eq!(keys.private_key.decrypt(&sum).unwrap(), BigUint::from(750u32));
    }

    #[test]
    fn test_additive_inverse_subtracts() {
        let keys = small_keys();
        let pk = &keys.public_key;
        let (balance, _) = pk.encrypt_random(&mut OsRng, &BigUint::from(500u32)).unwrap();
        let neg = &pk.n - BigUint::from(100u32);
        let (debit, _) = pk.encrypt_random(&mut OsRng, &neg).unwrap();

        let folded = pk.addition(&balance, &debit).unwrap();
        assert_eq!(keys.private_key.decrypt(&folded).unwrap(), BigUint::from(400u32));
    }

    #[test]
    fn test_addition_all() {
        let keys = small_keys();
        let pk = &keys.public_key;
        let cts: Vec<BigUint> = [1u32, 2, 3, 4]
            .iter()
            .map(|m| pk.encrypt_random(&mut OsRng, &BigUint::from(*m)).unwrap().0)
            .collect();

        let total = pk.addition_all(&cts).unwrap();
        assert_eq!(keys.private_key.decrypt(&total).unwrap(), BigUint::from(10u32));
    }

    #[test]
    fn test_out_of_range_inputs() {
        let keys = small_keys();
        let pk = &keys.public_key;
        let n = pk.n.clone();

        assert_eq!(pk.encrypt(&n, &BigUint::one()), Err(CryptoError::PlaintextOutOfRange));
        assert_eq!(
            pk.addition(pk.n_squared(), &BigUint::one()),
            Err(CryptoError::CiphertextOutOfRange)
        );
    }

    #[test]
    fn test_from_primes_rejects_bad_input() {
        let p = BigUint::from(11u32);
        assert_eq!(KeyPair::from_primes(&p, &p), Err(CryptoError::InvalidPrimes));
        assert_eq!(
            KeyPair::from_primes(&BigUint::from(4u32), &p),
            Err(CryptoError::InvalidPrimes)
        );
    }

    #[test]
    fn test_generate_keys() {
        let keys = KeyPair::generate(&mut OsRng, 96).unwrap();
        assert!(keys.n().bits() >= 95);

        let m = BigUint::from(123_456u32);
        let (c, _) = keys.public_key.encrypt_random(&mut OsRng, &m).unwrap();
        assert_eq!(keys.private_key.decrypt(&c).unwrap(), m);
    }

    #[test]
    fn test_generate_rejects_tiny_keys() {
        assert_eq!(
            KeyPair::generate(&mut OsRng, 16),
            Err(CryptoError::KeySizeTooSmall(16))
        );
    }

    #[test]
    fn test_miller_rabin() {
        let mut rng = OsRng;
        assert!(is_probable_prime(&mut rng, &BigUint::from(2_147_483_647u64), 20));
        assert!(!is_probable_prime(&mut rng, &BigUint::from(2_147_483_649u64), 20));
        // Carmichael number
        assert!(!is_probable_prime(&mut rng, &BigUint::from(561u32), 20));
        assert!(is_probable_prime(&mut rng, &BigUint::from(3u32), 20));
    }

    #[test]
    fn test_public_key_serde_restores_n_squared() {
        let keys = small_keys();
        let json = serde_json::to_string(&keys.public_key).unwrap();
        assert!(!json.contains("n_squared"));

        let parsed: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, keys.public_key);
        assert_eq!(parsed.n_squared(), keys.public_key.n_squared());
    }
}
