//! Benchmarks for cryptographic operations

use ark_bn254::Fr;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use num_bigint::BigUint;
use rand::rngs::OsRng;
use zktips_core::crypto::{CommitmentHasher, KeyPair};
use zktips_core::witness::build_witness;

fn sender_keys() -> KeyPair {
    KeyPair::from_primes(
        &BigUint::from(2_147_483_647u64),
        &BigUint::from(2_305_843_009_213_693_951u64),
    )
    .unwrap()
}

fn bench_commitment_hash(c: &mut Criterion) {
    let hasher = CommitmentHasher::initialized();
    let secret = Fr::from(1234u64);

    c.bench_function("commitment_hash", |b| {
        b.iter(|| black_box(hasher.simple_hash(black_box(&secret)).unwrap()))
    });
}

fn bench_paillier_encrypt(c: &mut Criterion) {
    let keys = sender_keys();
    let value = BigUint::from(100u32);

    c.bench_function("paillier_encrypt", |b| {
        b.iter(|| black_box(keys.public_key.encrypt_random(&mut OsRng, black_box(&value)).unwrap()))
    });
}

fn bench_witness_build(c: &mut Criterion) {
    let sender = sender_keys();
    let receiver = KeyPair::from_primes(
        &BigUint::from(4_294_967_291u64),
        &BigUint::from(1_000_000_007u64),
    )
    .unwrap();
    let (balance, _) = sender
        .public_key
        .encrypt_random(&mut OsRng, &BigUint::from(500u32))
        .unwrap();
    let commitment = BigUint::from(77u32);
    let secret = BigUint::from(1234u32);

    c.bench_function("witness_build", |b| {
        b.iter(|| {
            black_box(
                build_witness(
                    &sender,
                    &receiver.public_key,
                    &BigUint::from(100u32),
                    &balance,
                    &commitment,
                    &secret,
                )
                .unwrap(),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_commitment_hash,
    bench_paillier_encrypt,
    bench_witness_build
);
criterion_main!(benches);
