//! Commitment hasher
//!
//! Wraps the Poseidon sponge behind an init-then-use lifecycle. Hashing
//! before [`CommitmentHasher::init`] is an error, never an empty digest, so a
//! witness can't be built around a placeholder commitment.

use ark_bn254::Fr;
use tracing::debug;

use super::poseidon::Poseidon;
use crate::encoding::{field_from_decimal, field_to_decimal};
use crate::error::HasherError;

/// Domain separator used for every commitment hash
pub const COMMITMENT_DOMAIN: u64 = 0;

/// Sponge hasher producing decimal-string commitments
#[derive(Default)]
pub struct CommitmentHasher {
    sponge: Option<Poseidon>,
}

impl CommitmentHasher {
    /// Create an uninitialized hasher
    pub fn new() -> Self {
        Self { sponge: None }
    }

    /// Create and initialize in one step
    pub fn initialized() -> Self {
        let mut hasher = Self::new();
        hasher.init();
        hasher
    }

    /// Build the permutation constants. Calling it again is a no-op.
    pub fn init(&mut self) {
        if self.sponge.is_none() {
            self.sponge = Some(Poseidon::new());
            debug!("commitment hasher initialized");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.sponge.is_some()
    }

    /// Hash a pair of field elements
    pub fn hash(&self, left: &Fr, right: &Fr) -> Result<String, HasherError> {
        self.multi_hash(&[*left, *right])
    }

    /// Hash a single field element, e.g. an authorization secret
    pub fn simple_hash(&self, input: &Fr) -> Result<String, HasherError> {
        self.multi_hash(&[*input])
    }

    /// Hash an ordered sequence of field elements
    pub fn multi_hash(&self, inputs: &[Fr]) -> Result<String, HasherError> {
        self.multi_hash_field(inputs).map(|h| field_to_decimal(&h))
    }

    /// Same as [`Self::multi_hash`] but keeps the result as a field element
    pub fn multi_hash_field(&self, inputs: &[Fr]) -> Result<Fr, HasherError> {
        let sponge = self.sponge.as_ref().ok_or(HasherError::Uninitialized)?;
        sponge
            .sponge(inputs, Fr::from(COMMITMENT_DOMAIN))
            .ok_or(HasherError::EmptyInput)
    }

    /// Hash a single decimal-string field element
    pub fn simple_hash_decimal(&self, input: &str) -> Result<String, HasherError> {
        let element = parse_element(input)?;
        self.simple_hash(&element)
    }

    /// Hash a sequence of decimal-string field elements
    pub fn multi_hash_decimal<S: AsRef<str>>(&self, inputs: &[S]) -> Result<String, HasherError> {
        let elements = inputs
            .iter()
            .map(|s| parse_element(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.multi_hash(&elements)
    }
}

fn parse_element(input: &str) -> Result<Fr, HasherError> {
    field_from_decimal(input).map_err(|e| HasherError::InvalidFieldElement(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_hash_before_init_fails() {
        let hasher = CommitmentHasher::new();

        assert_eq!(
            hasher.simple_hash(&Fr::from(1234u64)),
            Err(HasherError::Uninitialized)
        );
        assert_eq!(
            hasher.hash(&Fr::from(1u64), &Fr::from(2u64)),
            Err(HasherError::Uninitialized)
        );
        assert_eq!(
            hasher.multi_hash(&[Fr::from(1u64)]),
            Err(HasherError::Uninitialized)
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut hasher = CommitmentHasher::new();
        assert!(!hasher.is_initialized());

        hasher.init();
        let first = hasher.simple_hash(&Fr::from(5u64)).unwrap();
        hasher.init();
        let second = hasher.simple_hash(&Fr::from(5u64)).unwrap();

        assert!(hasher.is_initialized());
        assert_eq!(first, second);
    }

    #[test]
    fn test_commitment_binding() {
        let hasher = CommitmentHasher::initialized();

        let c1 = hasher.simple_hash(&Fr::from(1111u64)).unwrap();
        let c2 = hasher.simple_hash(&Fr::from(1111u64)).unwrap();
        let c3 = hasher.simple_hash(&Fr::from(1112u64)).unwrap();

        assert_eq!(c1, c2);
        assert_ne!(c1, c3);
        assert!(!c1.is_empty());
        assert!(c1.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        let hasher = CommitmentHasher::initialized();
        let a = Fr::from(1u64);
        let b = Fr::from(2u64);

        assert_ne!(hasher.hash(&a, &b).unwrap(), hasher.hash(&b, &a).unwrap());
        assert_eq!(
            hasher.hash(&a, &b).unwrap(),
            hasher.multi_hash(&[a, b]).unwrap()
        );
    }

    #[test]
    fn test_empty_input_rejected() {
        let hasher = CommitmentHasher::initialized();
        assert_eq!(hasher.multi_hash(&[]), Err(HasherError::EmptyInput));
    }

    #[test]
    fn test_decimal_inputs() {
        let hasher = CommitmentHasher::initialized();

        assert_eq!(
            hasher.simple_hash_decimal("98765").unwrap(),
            hasher.simple_hash(&Fr::from(98765u64)).unwrap()
        );
        assert_eq!(
            hasher.multi_hash_decimal(&["1", "2", "3"]).unwrap(),
            hasher
                .multi_hash(&[Fr::from(1u64), Fr::from(2u64), Fr::from(3u64)])
                .unwrap()
        );
        assert!(matches!(
            hasher.simple_hash_decimal("0x12"),
            Err(HasherError::InvalidFieldElement(_))
        ));
    }
}
