//! Transfer witness construction
//!
//! A [`TransferWitness`] is the full input record for the transfer circuit:
//! the sender's current encrypted balance, the debit and credit
//! ciphertexts, the plaintext value, the authorization commitment and its
//! secret, and the key material that lets the circuit check each
//! ciphertext's blinding.
//!
//! The debit is the encryption of `n_s - value` under the sender key, so
//! adding it to the balance subtracts `value`. The credit is the encryption
//! of `value` under the receiver key. Blinding factors are drawn fresh for
//! every witness.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::paillier::{KeyPair, PublicKey};
use crate::crypto::randomness::random_unit_with;
use crate::encoding::decimal;
use crate::error::{validation, WitnessError};

/// Private and public inputs of one transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferWitness {
    #[serde(with = "decimal")]
    pub encrypted_sender_balance: BigUint,
    #[serde(with = "decimal")]
    pub encrypted_sender_value: BigUint,
    #[serde(with = "decimal")]
    pub encrypted_receiver_value: BigUint,
    #[serde(with = "decimal")]
    pub value: BigUint,
    #[serde(with = "decimal")]
    pub auth_commitment: BigUint,
    #[serde(with = "decimal")]
    pub auth_secret: BigUint,
    /// `(g, r_sender, n_sender)`
    #[serde(with = "decimal::triple")]
    pub sender_pub_key: [BigUint; 3],
    /// `(g, r_receiver, n_receiver)`
    #[serde(with = "decimal::triple")]
    pub receiver_pub_key: [BigUint; 3],
    /// `(lambda, mu, n_sender)`
    #[serde(with = "decimal::triple")]
    pub sender_priv_key: [BigUint; 3],
}

/// Build a witness with blinding drawn from the OS CSPRNG
pub fn build_witness(
    sender_keys: &KeyPair,
    receiver_key: &PublicKey,
    value: &BigUint,
    encrypted_sender_balance: &BigUint,
    auth_commitment: &BigUint,
    auth_secret: &BigUint,
) -> Result<TransferWitness, WitnessError> {
    build_witness_with_rng(
        &mut OsRng,
        sender_keys,
        receiver_key,
        value,
        encrypted_sender_balance,
        auth_commitment,
        auth_secret,
    )
}

/// Build a witness with blinding drawn from `rng`
pub fn build_witness_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
    sender_keys: &KeyPair,
    receiver_key: &PublicKey,
    value: &BigUint,
    encrypted_sender_balance: &BigUint,
    auth_commitment: &BigUint,
    auth_secret: &BigUint,
) -> Result<TransferWitness, WitnessError> {
    let sender_key = &sender_keys.public_key;

    validation::validate_value(value, &sender_key.n, "sender")?;
    validation::validate_value(value, &receiver_key.n, "receiver")?;
    validation::validate_ciphertext(encrypted_sender_balance, sender_key.n_squared())?;

    let sender_rand_r = random_unit_with(rng, &sender_key.n)?;
    let receiver_rand_r = random_unit_with(rng, &receiver_key.n)?;

    let encrypted_sender_value =
        sender_key.encrypt(&additive_inverse(value, &sender_key.n), &sender_rand_r)?;
    let encrypted_receiver_value = receiver_key.encrypt(value, &receiver_rand_r)?;

    let private_key = &sender_keys.private_key;
    let witness = TransferWitness {
        encrypted_sender_balance: encrypted_sender_balance.clone(),
        encrypted_sender_value,
        encrypted_receiver_value,
        value: value.clone(),
        auth_commitment: auth_commitment.clone(),
        auth_secret: auth_secret.clone(),
        sender_pub_key: [sender_key.g.clone(), sender_rand_r, sender_key.n.clone()],
        receiver_pub_key: [receiver_key.g.clone(), receiver_rand_r, receiver_key.n.clone()],
        sender_priv_key: [
            private_key.lambda.clone(),
            private_key.mu.clone(),
            private_key.n.clone(),
        ],
    };

    debug!(
        sender_modulus_bits = sender_key.n.bits(),
        receiver_modulus_bits = receiver_key.n.bits(),
        "transfer witness built"
    );

    Ok(witness)
}

/// `n - value`, reduced so that a zero value maps to zero
pub fn additive_inverse(value: &BigUint, n: &BigUint) -> BigUint {
    (n - value) % n
}

impl TransferWitness {
    pub fn sender_public_key(&self) -> PublicKey {
        let [g, _, n] = &self.sender_pub_key;
        PublicKey::with_generator(n.clone(), g.clone())
    }

    pub fn receiver_public_key(&self) -> PublicKey {
        let [g, _, n] = &self.receiver_pub_key;
        PublicKey::with_generator(n.clone(), g.clone())
    }

    /// Circuit input map, as consumed by snarkjs-style provers
    pub fn to_input_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Check the ciphertext and key relations the circuit enforces.
    pub fn check_relations(&self) -> Result<(), WitnessError> {
        let sender = self.sender_public_key();
        let receiver = self.receiver_public_key();
        let [_, sender_r, _] = &self.sender_pub_key;
        let [_, receiver_r, _] = &self.receiver_pub_key;
        let [lambda, mu, priv_n] = &self.sender_priv_key;

        validation::validate_value(&self.value, &sender.n, "sender")?;
        validation::validate_value(&self.value, &receiver.n, "receiver")?;
        validation::validate_ciphertext(&self.encrypted_sender_balance, sender.n_squared())?;

        let debit = sender.encrypt(&additive_inverse(&self.value, &sender.n), sender_r)?;
        if debit != self.encrypted_sender_value {
            return Err(WitnessError::RelationViolated(
                "sender ciphertext does not encrypt n - value".to_string(),
            ));
        }

        let credit = receiver.encrypt(&self.value, receiver_r)?;
        if credit != self.encrypted_receiver_value {
            return Err(WitnessError::RelationViolated(
                "receiver ciphertext does not encrypt value".to_string(),
            ));
        }

        if *priv_n != sender.n {
            return Err(WitnessError::RelationViolated(
                "private key modulus differs from sender key".to_string(),
            ));
        }

        // L(g^lambda mod n^2) * mu == 1 (mod n)
        let u = sender.g.modpow(lambda, sender.n_squared());
        if u.is_zero() {
            return Err(WitnessError::RelationViolated(
                "sender generator is not a unit".to_string(),
            ));
        }
        let l = (u - 1u32) / &sender.n;
        if (l * mu) % &sender.n != BigUint::one() {
            return Err(WitnessError::RelationViolated(
                "private key does not match sender public key".to_string(),
            ));
        }

        Ok(())
    }
}
