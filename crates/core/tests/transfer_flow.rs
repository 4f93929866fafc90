//! End-to-end transfer flows against real Groth16 artifacts

use std::fs;
use std::path::Path;

use anyhow::Result;
use num_bigint::BigUint;
use rand::rngs::OsRng;
use tempfile::TempDir;

use zktips_core::proof::groth16::GeneratedArtifacts;
use zktips_core::proof::load_verification_key;
use zktips_core::{
    Groth16Backend, InMemoryLedger, KeyPair, Ledger, LedgerError, ProofError, PublicSignals,
    TransferClient, TransferConfig, TransferError,
};

fn sender_keys() -> KeyPair {
    KeyPair::from_primes(
        &BigUint::from(2_147_483_647u64),
        &BigUint::from(2_305_843_009_213_693_951u64),
    )
    .unwrap()
}

fn receiver_keys() -> KeyPair {
    KeyPair::from_primes(
        &BigUint::from(4_294_967_291u64),
        &BigUint::from(1_000_000_007u64),
    )
    .unwrap()
}

fn encrypt(keys: &KeyPair, m: u64) -> BigUint {
    keys.public_key
        .encrypt_random(&mut OsRng, &BigUint::from(m))
        .unwrap()
        .0
}

fn decrypt(keys: &KeyPair, c: &BigUint) -> BigUint {
    keys.private_key.decrypt(c).unwrap()
}

struct Fixture {
    _dir: TempDir,
    generated: GeneratedArtifacts,
    client: TransferClient<Groth16Backend>,
}

fn fixture() -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let generated = Groth16Backend::write_artifacts(dir.path(), &mut OsRng)?;

    let mut config = TransferConfig::with_artifacts_dir(dir.path());
    config.proving_key_sha256 = generated.proving.proving_key_sha256.clone();

    Ok(Fixture {
        client: TransferClient::new(Groth16Backend::new(), config),
        generated,
        _dir: dir,
    })
}

const SENDER_SECRET: u32 = 1234;
const RECEIVER_SECRET: u32 = 5678;

/// Account 1 holds 500 under `SENDER_SECRET`, account 2 holds 0
async fn ledger_for(
    fixture: &Fixture,
    sender: &KeyPair,
    receiver: &KeyPair,
) -> Result<InMemoryLedger<Groth16Backend>> {
    let vk = load_verification_key(&fixture.generated.verification_key)?;
    let ledger = InMemoryLedger::new(Groth16Backend::new(), vk);
    let client = &fixture.client;
    ledger
        .register(
            1,
            sender.public_key.clone(),
            client.commit_auth(&BigUint::from(SENDER_SECRET))?,
            encrypt(sender, 500),
        )
        .await?;
    ledger
        .register(
            2,
            receiver.public_key.clone(),
            client.commit_auth(&BigUint::from(RECEIVER_SECRET))?,
            encrypt(receiver, 0),
        )
        .await?;
    Ok(ledger)
}

#[tokio::test]
async fn test_direct_transfer_updates_both_balances() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();
    let ledger = ledger_for(&fixture, &sender, &receiver).await?;

    let receipt = fixture
        .client
        .transfer(
            &ledger,
            &sender,
            &receiver.public_key,
            &BigUint::from(100u32),
            &BigUint::from(SENDER_SECRET),
            1,
            2,
        )
        .await?;

    assert_eq!(receipt.sequence, 1);
    assert_eq!(decrypt(&sender, &receipt.sender_balance), BigUint::from(400u32));
    assert_eq!(decrypt(&receiver, &receipt.receiver_balance), BigUint::from(100u32));
    assert_eq!(ledger.balance_of(1).await?, receipt.sender_balance);
    Ok(())
}

#[tokio::test]
async fn test_consecutive_direct_transfers() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();
    let ledger = ledger_for(&fixture, &sender, &receiver).await?;

    for value in [100u32, 150] {
        fixture
            .client
            .transfer(
                &ledger,
                &sender,
                &receiver.public_key,
                &BigUint::from(value),
                &BigUint::from(SENDER_SECRET),
                1,
                2,
            )
            .await?;
    }

    assert_eq!(decrypt(&sender, &ledger.balance_of(1).await?), BigUint::from(250u32));
    assert_eq!(decrypt(&receiver, &ledger.balance_of(2).await?), BigUint::from(250u32));
    assert_eq!(ledger.applied_transfers().await, 2);
    Ok(())
}

#[tokio::test]
async fn test_stale_proof_rejected_by_ledger() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();
    let ledger = ledger_for(&fixture, &sender, &receiver).await?;

    // Proof against a balance the ledger does not hold
    let stale_balance = encrypt(&sender, 500);
    let (proof, signals) = fixture
        .client
        .transfer_proof(
            &sender,
            &receiver.public_key,
            &BigUint::from(10u32),
            &BigUint::from(SENDER_SECRET),
            &stale_balance,
        )
        .await?;
    let call = zktips_core::TransferCall::new(1, 2, &proof, &signals)?;

    assert_eq!(ledger.transfer(call).await, Err(LedgerError::StaleBalance(1)));
    Ok(())
}

#[tokio::test]
async fn test_foreign_secret_cannot_debit_account() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();
    let ledger = ledger_for(&fixture, &sender, &receiver).await?;

    // Only public data is needed to build a valid proof for account 1,
    // but with a secret that is not the one account 1 was opened with
    let balance = ledger.balance_of(1).await?;
    let (proof, signals) = fixture
        .client
        .transfer_proof(
            &sender,
            &receiver.public_key,
            &BigUint::from(1u32),
            &BigUint::from(666u32),
            &balance,
        )
        .await?;
    assert!(fixture.client.verify_transfer_proof(&proof, &signals).await?);

    let call = zktips_core::TransferCall::new(1, 2, &proof, &signals)?;
    assert_eq!(ledger.transfer(call).await, Err(LedgerError::Unauthorized(1)));
    assert_eq!(ledger.balance_of(1).await?, balance);
    assert_eq!(decrypt(&receiver, &ledger.balance_of(2).await?), BigUint::from(0u32));
    assert_eq!(ledger.applied_transfers().await, 0);

    // The receiver's own secret does not unlock the sender's account either
    let err = fixture
        .client
        .transfer(
            &ledger,
            &sender,
            &receiver.public_key,
            &BigUint::from(1u32),
            &BigUint::from(RECEIVER_SECRET),
            1,
            2,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::Ledger(LedgerError::Unauthorized(1))
    ));
    Ok(())
}

#[tokio::test]
async fn test_aggregated_transfer_folds_to_400() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();
    let balance = encrypt(&sender, 500);

    let folded = fixture
        .client
        .transfer_aggregation(
            &sender,
            &receiver.public_key,
            &BigUint::from(100u32),
            &BigUint::from(1234u32),
            0,
            &balance,
        )
        .await?;

    assert_eq!(decrypt(&sender, &folded), BigUint::from(400u32));

    let store = fixture.client.store();
    assert!(store.proof_path(0).is_file());
    assert!(store.signals_path(0).is_file());
    assert!(fixture.client.verify_aggregated(&[0]).await?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_aggregations_share_one_client() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();
    let client = &fixture.client;

    let first_balance = encrypt(&sender, 500);
    let second_balance = encrypt(&sender, 80);
    let first_amount = BigUint::from(100u32);
    let first_auth_secret = BigUint::from(11u32);
    let second_amount = BigUint::from(30u32);
    let second_auth_secret = BigUint::from(22u32);
    let (first, second) = tokio::join!(
        client.transfer_aggregation(
            &sender,
            &receiver.public_key,
            &first_amount,
            &first_auth_secret,
            10,
            &first_balance,
        ),
        client.transfer_aggregation(
            &sender,
            &receiver.public_key,
            &second_amount,
            &second_auth_secret,
            11,
            &second_balance,
        ),
    );

    assert_eq!(decrypt(&sender, &first?), BigUint::from(400u32));
    assert_eq!(decrypt(&sender, &second?), BigUint::from(50u32));

    // Each index kept its own proof and signals
    let (_, signals_10) = client.store().load(10)?;
    let (_, signals_11) = client.store().load(11)?;
    assert_eq!(
        decrypt(&receiver, &signals_10.encrypted_receiver_value()?),
        BigUint::from(100u32)
    );
    assert_eq!(
        decrypt(&receiver, &signals_11.encrypted_receiver_value()?),
        BigUint::from(30u32)
    );
    assert!(client.verify_aggregated(&[10, 11]).await?);
    Ok(())
}

#[tokio::test]
async fn test_zero_value_fold_preserves_balance() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();
    let balance = encrypt(&sender, 500);

    let folded = fixture
        .client
        .transfer_aggregation(
            &sender,
            &receiver.public_key,
            &BigUint::from(0u32),
            &BigUint::from(1u32),
            4,
            &balance,
        )
        .await?;

    assert_eq!(decrypt(&sender, &folded), BigUint::from(500u32));
    Ok(())
}

#[tokio::test]
async fn test_tampered_signal_fails_verification() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();

    let (proof, signals) = fixture
        .client
        .transfer_proof(
            &sender,
            &receiver.public_key,
            &BigUint::from(100u32),
            &BigUint::from(1234u32),
            &encrypt(&sender, 500),
        )
        .await?;
    assert!(fixture.client.verify_transfer_proof(&proof, &signals).await?);

    let mut tampered = signals.into_inner();
    tampered[2] = encrypt(&receiver, 1000).to_string();
    let tampered = PublicSignals::from(tampered);

    assert!(!fixture.client.verify_transfer_proof(&proof, &tampered).await?);
    Ok(())
}

#[tokio::test]
async fn test_tampered_persisted_signals_fail_reverification() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();

    for index in 0..2u64 {
        fixture
            .client
            .transfer_aggregation(
                &sender,
                &receiver.public_key,
                &BigUint::from(7u32),
                &BigUint::from(8u32),
                index,
                &encrypt(&sender, 50),
            )
            .await?;
    }
    assert!(fixture.client.verify_aggregated(&[0, 1]).await?);

    let path = fixture.client.store().signals_path(1);
    let mut signals: Vec<String> = serde_json::from_str(&fs::read_to_string(&path)?)?;
    signals[0] = "12345".to_string();
    fs::write(&path, serde_json::to_string(&signals)?)?;

    assert!(!fixture.client.verify_aggregated(&[0, 1]).await?);
    Ok(())
}

#[tokio::test]
async fn test_missing_aggregated_index_is_io_error() -> Result<()> {
    let fixture = fixture()?;
    let err = fixture.client.verify_aggregated(&[42]).await.unwrap_err();
    assert!(matches!(err, TransferError::Io { .. }));
    Ok(())
}

#[tokio::test]
async fn test_pinned_checksum_mismatch() -> Result<()> {
    let fixture = fixture()?;
    let sender = sender_keys();
    let receiver = receiver_keys();

    let mut config = fixture.client.config().clone();
    config.proving_key_sha256 = Some("ab".repeat(32));
    let client = TransferClient::new(Groth16Backend::new(), config);

    let err = client
        .transfer_proof(
            &sender,
            &receiver.public_key,
            &BigUint::from(1u32),
            &BigUint::from(2u32),
            &encrypt(&sender, 10),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::Proof(ProofError::ChecksumMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_verification_key_file_layout() -> Result<()> {
    let fixture = fixture()?;
    let raw = fs::read_to_string(&fixture.generated.verification_key)?;
    let json: serde_json::Value = serde_json::from_str(&raw)?;

    assert_eq!(json["protocol"], "groth16");
    assert_eq!(json["curve"], "bn128");
    assert_eq!(json["nPublic"], 4);
    assert!(Path::new(&fixture.generated.proving.proving_key).is_file());
    Ok(())
}
