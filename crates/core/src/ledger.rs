//! Ledger interface
//!
//! The ledger holds each account's encrypted balance and applies a transfer
//! once its proof verifies. Balances are folded homomorphically: the debit
//! ciphertext (signal 1) is added to the sender's balance and the credit
//! ciphertext (signal 2) to the receiver's. The ledger never decrypts.
//!
//! Every account is registered with the auth commitment of its owner. A
//! transfer is only applied when signal 3 equals the sender's registered
//! commitment, so only the holder of the matching secret can debit it.
//!
//! [`InMemoryLedger`] is a reference implementation used by tests and local
//! tooling. A contract-backed ledger implements the same trait.
//!
//! The transfer circuit does not prove that the debit and credit ciphertexts
//! encrypt the same amount (see [`crate::proof::TransferCircuit`]). A sender
//! holding a valid secret can therefore credit more than it debits. This
//! ledger checks authorization and freshness only, not value conservation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::crypto::paillier::PublicKey;
use crate::error::{LedgerError, ProofError};
use crate::proof::{
    signal, Groth16Proof, PublicSignals, SolidityProof, VerificationKeyJson, VerifyingBackend,
};

/// Arguments of a ledger `transfer` call, proof already in Solidity layout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCall {
    pub id_from: u64,
    pub id_to: u64,
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
    pub public_signals: [String; signal::COUNT],
}

impl TransferCall {
    pub fn new(
        id_from: u64,
        id_to: u64,
        proof: &Groth16Proof,
        signals: &PublicSignals,
    ) -> Result<Self, ProofError> {
        let SolidityProof { a, b, c } = proof.to_solidity();
        Ok(Self {
            id_from,
            id_to,
            a,
            b,
            c,
            public_signals: signals.to_array()?,
        })
    }

    /// Proof back in snarkjs layout
    pub fn proof(&self) -> Groth16Proof {
        SolidityProof {
            a: self.a.clone(),
            b: self.b.clone(),
            c: self.c.clone(),
        }
        .to_groth16()
    }

    pub fn signals(&self) -> PublicSignals {
        PublicSignals::from(self.public_signals.clone())
    }
}

/// Outcome of an applied transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Position of this transfer in the ledger's history
    pub sequence: u64,
    pub id_from: u64,
    pub id_to: u64,
    #[serde(with = "crate::encoding::decimal")]
    pub sender_balance: BigUint,
    #[serde(with = "crate::encoding::decimal")]
    pub receiver_balance: BigUint,
}

/// Encrypted-balance ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current encrypted balance of `id`
    async fn balance_of(&self, id: u64) -> Result<BigUint, LedgerError>;

    /// Verify and apply a transfer
    async fn transfer(&self, call: TransferCall) -> Result<TransferReceipt, LedgerError>;
}

struct Account {
    key: PublicKey,
    auth_commitment: BigUint,
    balance: BigUint,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<u64, Account>,
    applied: u64,
}

/// In-process ledger verifying proofs with a local backend.
///
/// Checks proof validity, the sender's auth commitment and balance
/// freshness. Value conservation between debit and credit is not checked.
pub struct InMemoryLedger<B> {
    verifier: Arc<B>,
    verification_key: Arc<VerificationKeyJson>,
    state: RwLock<LedgerState>,
}

impl<B: VerifyingBackend> InMemoryLedger<B> {
    pub fn new(verifier: B, verification_key: VerificationKeyJson) -> Self {
        Self {
            verifier: Arc::new(verifier),
            verification_key: Arc::new(verification_key),
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Open an account bound to `auth_commitment` with an initial encrypted
    /// balance
    pub async fn register(
        &self,
        id: u64,
        key: PublicKey,
        auth_commitment: BigUint,
        encrypted_balance: BigUint,
    ) -> Result<(), LedgerError> {
        if encrypted_balance >= *key.n_squared() {
            return Err(LedgerError::Rejected(format!(
                "initial balance of account {} is not a ciphertext",
                id
            )));
        }

        let mut state = self.state.write().await;
        if state.accounts.contains_key(&id) {
            return Err(LedgerError::AlreadyRegistered(id));
        }
        state.accounts.insert(
            id,
            Account {
                key,
                auth_commitment,
                balance: encrypted_balance,
            },
        );
        debug!(account = id, "account registered");
        Ok(())
    }

    /// Number of transfers applied so far
    pub async fn applied_transfers(&self) -> u64 {
        self.state.read().await.applied
    }
}

fn rejected(e: impl ToString) -> LedgerError {
    LedgerError::Rejected(e.to_string())
}

#[async_trait]
impl<B: VerifyingBackend + 'static> Ledger for InMemoryLedger<B> {
    async fn balance_of(&self, id: u64) -> Result<BigUint, LedgerError> {
        let state = self.state.read().await;
        state
            .accounts
            .get(&id)
            .map(|account| account.balance.clone())
            .ok_or(LedgerError::UnknownAccount(id))
    }

    async fn transfer(&self, call: TransferCall) -> Result<TransferReceipt, LedgerError> {
        if call.id_from == call.id_to {
            return Err(LedgerError::Rejected("sender and receiver are the same account".to_string()));
        }

        let signals = call.signals();
        let proof = call.proof();
        let verifier = Arc::clone(&self.verifier);
        let vk = Arc::clone(&self.verification_key);
        let proof_signals = signals.clone();
        let valid = tokio::task::spawn_blocking(move || verifier.verify(&vk, &proof_signals, &proof))
            .await
            .map_err(rejected)?
            .map_err(rejected)?;

        if !valid {
            warn!(from = call.id_from, to = call.id_to, "transfer proof rejected");
            return Err(LedgerError::InvalidProof);
        }

        let expected_balance = signals.encrypted_sender_balance().map_err(rejected)?;
        let commitment = signals.auth_commitment().map_err(rejected)?;
        let debit = signals.encrypted_sender_value().map_err(rejected)?;
        let credit = signals.encrypted_receiver_value().map_err(rejected)?;

        let mut state = self.state.write().await;

        let sender = state
            .accounts
            .get(&call.id_from)
            .ok_or(LedgerError::UnknownAccount(call.id_from))?;
        let receiver = state
            .accounts
            .get(&call.id_to)
            .ok_or(LedgerError::UnknownAccount(call.id_to))?;

        if sender.auth_commitment != commitment {
            warn!(from = call.id_from, "auth commitment mismatch");
            return Err(LedgerError::Unauthorized(call.id_from));
        }
        if sender.balance != expected_balance {
            return Err(LedgerError::StaleBalance(call.id_from));
        }

        let sender_balance = sender.key.addition(&sender.balance, &debit).map_err(rejected)?;
        let receiver_balance = receiver
            .key
            .addition(&receiver.balance, &credit)
            .map_err(rejected)?;

        if let Some(account) = state.accounts.get_mut(&call.id_from) {
            account.balance = sender_balance.clone();
        }
        if let Some(account) = state.accounts.get_mut(&call.id_to) {
            account.balance = receiver_balance.clone();
        }
        state.applied += 1;
        let sequence = state.applied;

        info!(
            sequence,
            from = call.id_from,
            to = call.id_to,
            "transfer applied"
        );

        Ok(TransferReceipt {
            sequence,
            id_from: call.id_from,
            id_to: call.id_to,
            sender_balance,
            receiver_balance,
        })
    }
}
