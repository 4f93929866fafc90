//! Transfer orchestration
//!
//! Two flows share the same front half: commit to the authorization secret,
//! build the witness, prove.
//!
//! - Direct: the proof goes to a [`Ledger`], which verifies it and folds the
//!   ciphertexts into both balances.
//! - Aggregated: the proof and signals are persisted under an index for a
//!   later batch submission, and the sender's new balance ciphertext is
//!   folded locally and returned.

use num_bigint::BigUint;
use tracing::{debug, info, warn};

use crate::aggregation::AggregationStore;
use crate::config::TransferConfig;
use crate::crypto::hasher::CommitmentHasher;
use crate::crypto::paillier::{KeyPair, PublicKey};
use crate::encoding::{fr_from_biguint, parse_decimal};
use crate::error::{HasherError, TransferResult};
use crate::ledger::{Ledger, TransferCall, TransferReceipt};
use crate::proof::{
    load_verification_key, Groth16Proof, ProofEngine, ProvingBackend, PublicSignals,
    VerifyingBackend,
};
use crate::witness::build_witness;

/// Client driving transfers against one set of proving artifacts
pub struct TransferClient<B> {
    hasher: CommitmentHasher,
    engine: ProofEngine<B>,
    config: TransferConfig,
    store: AggregationStore,
}

impl<B> TransferClient<B> {
    pub fn new(backend: B, config: TransferConfig) -> Self {
        let store = AggregationStore::new(config.aggregation_dir.clone());
        Self {
            hasher: CommitmentHasher::initialized(),
            engine: ProofEngine::new(backend),
            config,
            store,
        }
    }

    /// Use an existing hasher, which must already be initialized
    pub fn with_hasher(
        hasher: CommitmentHasher,
        backend: B,
        config: TransferConfig,
    ) -> TransferResult<Self> {
        if !hasher.is_initialized() {
            return Err(HasherError::Uninitialized.into());
        }
        let store = AggregationStore::new(config.aggregation_dir.clone());
        Ok(Self {
            hasher,
            engine: ProofEngine::new(backend),
            config,
            store,
        })
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn engine(&self) -> &ProofEngine<B> {
        &self.engine
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    /// Commitment to an authorization secret
    pub fn commit_auth(&self, auth_secret: &BigUint) -> TransferResult<BigUint> {
        let secret = fr_from_biguint(auth_secret)
            .map_err(|e| HasherError::InvalidFieldElement(e.to_string()))?;
        let digest = self.hasher.simple_hash(&secret)?;
        parse_decimal(&digest).map_err(|e| HasherError::InvalidFieldElement(e.to_string()).into())
    }
}

impl<B: ProvingBackend + VerifyingBackend + 'static> TransferClient<B> {
    /// Build a witness and prove it, with no other side effect
    pub async fn transfer_proof(
        &self,
        sender_keys: &KeyPair,
        receiver_key: &PublicKey,
        value: &BigUint,
        auth_secret: &BigUint,
        encrypted_sender_balance: &BigUint,
    ) -> TransferResult<(Groth16Proof, PublicSignals)> {
        let auth_commitment = self.commit_auth(auth_secret)?;
        self.prove_committed(
            sender_keys,
            receiver_key,
            value,
            auth_secret,
            &auth_commitment,
            encrypted_sender_balance,
        )
        .await
    }

    async fn prove_committed(
        &self,
        sender_keys: &KeyPair,
        receiver_key: &PublicKey,
        value: &BigUint,
        auth_secret: &BigUint,
        auth_commitment: &BigUint,
        encrypted_sender_balance: &BigUint,
    ) -> TransferResult<(Groth16Proof, PublicSignals)> {
        let witness = build_witness(
            sender_keys,
            receiver_key,
            value,
            encrypted_sender_balance,
            auth_commitment,
            auth_secret,
        )?;

        let result = self
            .engine
            .prove_async(witness, self.config.artifacts())
            .await?;
        Ok(result)
    }

    /// Prove a transfer and submit it to `ledger`
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        sender_keys: &KeyPair,
        receiver_key: &PublicKey,
        value: &BigUint,
        auth_secret: &BigUint,
        id_from: u64,
        id_to: u64,
    ) -> TransferResult<TransferReceipt> {
        let auth_commitment = self.commit_auth(auth_secret)?;
        let balance = ledger.balance_of(id_from).await?;
        let (proof, signals) = self
            .prove_committed(
                sender_keys,
                receiver_key,
                value,
                auth_secret,
                &auth_commitment,
                &balance,
            )
            .await?;

        let call = TransferCall::new(id_from, id_to, &proof, &signals)?;
        debug!(from = id_from, to = id_to, "submitting transfer to ledger");

        let receipt = ledger.transfer(call).await?;
        info!(
            from = id_from,
            to = id_to,
            sequence = receipt.sequence,
            "direct transfer complete"
        );
        Ok(receipt)
    }

    /// Prove a transfer, persist it under `index` and return the sender's
    /// folded balance ciphertext
    pub async fn transfer_aggregation(
        &self,
        sender_keys: &KeyPair,
        receiver_key: &PublicKey,
        value: &BigUint,
        auth_secret: &BigUint,
        index: u64,
        encrypted_sender_balance: &BigUint,
    ) -> TransferResult<BigUint> {
        let (proof, signals) = self
            .transfer_proof(
                sender_keys,
                receiver_key,
                value,
                auth_secret,
                encrypted_sender_balance,
            )
            .await?;

        self.store.persist(index, &proof, &signals)?;

        let debit = signals.encrypted_sender_value()?;
        let folded = sender_keys
            .public_key
            .addition(encrypted_sender_balance, &debit)?;

        info!(index, "aggregated transfer folded");
        Ok(folded)
    }

    /// Verify against the configured verification key
    pub async fn verify_transfer_proof(
        &self,
        proof: &Groth16Proof,
        signals: &PublicSignals,
    ) -> TransferResult<bool> {
        let vk = load_verification_key(&self.config.verification_key)?;
        let valid = self
            .engine
            .verify_async(vk, signals.clone(), proof.clone())
            .await?;
        Ok(valid)
    }

    /// Reload and verify persisted aggregated transfers.
    ///
    /// `Ok(false)` as soon as one index fails to verify.
    pub async fn verify_aggregated(&self, indices: &[u64]) -> TransferResult<bool> {
        let vk = load_verification_key(&self.config.verification_key)?;
        for &index in indices {
            let (proof, signals) = self.store.load(index)?;
            if !self.engine.verify_async(vk.clone(), signals, proof).await? {
                warn!(index, "aggregated proof failed verification");
                return Ok(false);
            }
        }
        debug!(count = indices.len(), "aggregated proofs verified");
        Ok(true)
    }
}
