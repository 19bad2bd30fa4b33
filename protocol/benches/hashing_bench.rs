// Hashing & signing benchmarks for the FNS primitives.
//
// Covers label hashing, namehash at several depths, the commitment-sized
// Keccak input, and envelope signing/verification.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use fns_protocol::crypto::keccak256_concat;
use fns_protocol::crypto::keys::FnsKeypair;
use fns_protocol::envelope::{sign_envelope, verify_envelope};
use fns_protocol::name::{labelhash, namehash};

fn bench_labelhash(c: &mut Criterion) {
    c.bench_function("keccak/labelhash", |b| {
        b.iter(|| labelhash("newname"));
    });
}

fn bench_namehash_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("keccak/namehash");
    for name in ["frax", "alice.frax", "pay.alice.frax", "a.b.c.d.alice.frax"] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, name| {
            b.iter(|| namehash(name));
        });
    }
    group.finish();
}

fn bench_commitment_preimage(c: &mut Criterion) {
    // Roughly the size of a commitment pre-image with a two-record batch.
    let label = b"newname";
    let owner = [0x11u8; 20];
    let secret = [0x22u8; 32];
    let resolver = [0x33u8; 20];
    let records = [0x44u8; 160];

    c.bench_function("keccak/commitment", |b| {
        b.iter(|| {
            keccak256_concat(&[
                label,
                &owner,
                &2_419_200u64.to_be_bytes(),
                &secret,
                &resolver,
                &records,
                &[1u8],
                &0u16.to_be_bytes(),
            ])
        });
    });
}

fn bench_envelope(c: &mut Criterion) {
    let kp = FnsKeypair::from_seed(&[8u8; 32]);
    let payload = json!({"method": "renew", "label": "newname", "duration": 2_419_200});

    c.bench_function("ed25519/sign_envelope", |b| {
        b.iter(|| sign_envelope(&kp, 1, payload.clone()).unwrap());
    });

    let envelope = sign_envelope(&kp, 1, payload.clone()).unwrap();
    c.bench_function("ed25519/verify_envelope", |b| {
        b.iter(|| verify_envelope(&envelope).unwrap());
    });
}

criterion_group!(
    benches,
    bench_labelhash,
    bench_namehash_depth,
    bench_commitment_preimage,
    bench_envelope,
);
criterion_main!(benches);
