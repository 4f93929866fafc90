//! Decimal encodings shared by the witness, proof and ledger layers.
//!
//! Circuit inputs, proofs and public signals travel as decimal strings (the
//! snarkjs convention). Field elements must be strictly below the modulus;
//! nothing here reduces silently.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodingError {
    #[error("not a decimal integer: {0:?}")]
    NotDecimal(String),
    #[error("value is not below the field modulus")]
    OutOfField,
}

/// Modulus of a prime field as a big integer
pub fn field_modulus<F: PrimeField>() -> BigUint {
    BigUint::from_bytes_le(&F::MODULUS.to_bytes_le())
}

/// Canonical decimal form of a field element
pub fn field_to_decimal<F: PrimeField>(f: &F) -> String {
    field_to_biguint(f).to_str_radix(10)
}

pub fn field_to_biguint<F: PrimeField>(f: &F) -> BigUint {
    BigUint::from_bytes_le(&f.into_bigint().to_bytes_le())
}

/// Convert an integer into a field element, rejecting values >= modulus
pub fn biguint_to_field<F: PrimeField>(n: &BigUint) -> Result<F, EncodingError> {
    if *n >= field_modulus::<F>() {
        return Err(EncodingError::OutOfField);
    }
    Ok(F::from_le_bytes_mod_order(&n.to_bytes_le()))
}

pub fn parse_decimal(s: &str) -> Result<BigUint, EncodingError> {
    let trimmed = s.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EncodingError::NotDecimal(s.to_string()));
    }
    BigUint::parse_bytes(trimmed.as_bytes(), 10).ok_or_else(|| EncodingError::NotDecimal(s.to_string()))
}

pub fn field_from_decimal<F: PrimeField>(s: &str) -> Result<F, EncodingError> {
    biguint_to_field(&parse_decimal(s)?)
}

/// Scalar-field shorthand used by the hasher and circuit
pub fn fr_from_biguint(n: &BigUint) -> Result<Fr, EncodingError> {
    biguint_to_field::<Fr>(n)
}

/// `serde` adapters writing big integers as decimal strings
pub mod decimal {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_decimal(&s).map_err(de::Error::custom)
    }

    /// Fixed-size arrays of decimal strings, e.g. `(g, r, n)` key triples
    pub mod triple {
        use num_bigint::BigUint;
        use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(value: &[BigUint; 3], serializer: S) -> Result<S::Ok, S::Error> {
            let strings: Vec<String> = value.iter().map(|v| v.to_str_radix(10)).collect();
            strings.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[BigUint; 3], D::Error> {
            let strings = <[String; 3]>::deserialize(deserializer)?;
            let [a, b, c] = strings;
            let parse = |s: &str| crate::encoding::parse_decimal(s).map_err(de::Error::custom);
            Ok([parse(&a)?, parse(&b)?, parse(&c)?])
        }
    }
}
