//! # Filler Mesh Handshake Benchmarks
//!
//! | Operation | Target |
//! |-----------|--------|
//! | Create + sign a handshake | < 1ms |
//! | Verify (recover + compare) | < 1ms |
//! | Frame encode + decode | < 50μs |

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fm_01_handshake::{
    create_handshake, decode_message, encode_message, verify, PeerAddressRegistry, MIN_NONCE_LEN,
};
use shared_crypto::{Secp256k1Identity, SigningIdentity};
use shared_types::PeerIdentity;

const PEER: &str = "16Uiu2HAm8iRUsTzYepLP8pdJL3645ACP7VBfZQ7yFbLfdb7WvkL7";

fn bench_create(c: &mut Criterion) {
    let identity = Secp256k1Identity::generate();
    let peer = PeerIdentity::from(PEER);
    let address = identity.address();

    let mut group = c.benchmark_group("fm-01-handshake/create");
    group.throughput(Throughput::Elements(1));
    group.bench_function("sign", |b| {
        b.iter(|| create_handshake(&identity, black_box(&peer), &address, MIN_NONCE_LEN).unwrap())
    });
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let identity = Secp256k1Identity::generate();
    let msg = create_handshake(
        &identity,
        &PeerIdentity::from(PEER),
        &identity.address(),
        MIN_NONCE_LEN,
    )
    .unwrap();

    let mut forged = msg.clone();
    forged.claimed_address = Secp256k1Identity::generate().address().to_checksum_hex();

    let mut group = c.benchmark_group("fm-01-handshake/verify");
    group.throughput(Throughput::Elements(1));
    group.bench_function("valid", |b| b.iter(|| verify(black_box(&msg)).unwrap()));
    group.bench_function("address_mismatch", |b| {
        b.iter(|| verify(black_box(&forged)).unwrap_err())
    });
    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let identity = Secp256k1Identity::generate();
    let msg = create_handshake(
        &identity,
        &PeerIdentity::from(PEER),
        &identity.address(),
        MIN_NONCE_LEN,
    )
    .unwrap();
    let body = encode_message(&msg, 1024).unwrap();

    let mut group = c.benchmark_group("fm-01-handshake/codec");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("encode", |b| {
        b.iter(|| encode_message(black_box(&msg), 1024).unwrap())
    });
    group.bench_function("decode", |b| {
        b.iter(|| decode_message(black_box(&body)).unwrap())
    });
    group.finish();
}

fn bench_registry(c: &mut Criterion) {
    let registry = PeerAddressRegistry::new();
    let peers: Vec<(PeerIdentity, _)> = (0..1_000)
        .map(|i| {
            (
                PeerIdentity::new(format!("16Uiu2HAmPeer{:04}", i)),
                Secp256k1Identity::generate().address(),
            )
        })
        .collect();
    for (peer, address) in &peers {
        registry.record(peer.clone(), *address);
    }

    let mut group = c.benchmark_group("fm-01-handshake/registry");
    group.bench_function("lookup_1k", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % peers.len();
            registry.lookup(black_box(&peers[i].0))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_create, bench_verify, bench_codec, bench_registry);
criterion_main!(benches);
