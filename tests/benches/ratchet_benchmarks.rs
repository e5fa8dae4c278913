//! # Rendezvous Ratchet Benchmarks
//!
//! | Operation | Cost driver |
//! |-----------|-------------|
//! | Chain step | One SHA-256 |
//! | One-time key | One point multiplication and addition |
//! | Lookahead search | Up to `window` one-time keys |
//! | Message round | Envelope encryption, funding, matching |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::RngCore;
use rv_relationships::test_utils::TestParty;
use rv_relationships::{Member, PrivateMessage, RelationshipApi};
use shared_crypto::{advance, seed_hash, tweak_public, ChainWalk, PrivateKey};

fn random_seed() -> Vec<u8> {
    let mut seed = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    seed
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("rv-chain");
    let base = PrivateKey::generate().public_key();
    let hash = seed_hash(&random_seed());

    group.bench_function("advance", |b| b.iter(|| advance(black_box(&hash))));
    group.bench_function("tweak_public", |b| {
        b.iter(|| tweak_public(black_box(&base), black_box(&hash)).unwrap())
    });

    for window in [10u32, 50, 100] {
        let member = Member::new(base, hash).unwrap();
        let (_, last) = ChainWalk::from_seed_hash(hash)
            .nth(window as usize)
            .unwrap();
        let target = tweak_public(&base, &last).unwrap();

        group.throughput(Throughput::Elements(window as u64));
        group.bench_with_input(
            BenchmarkId::new("find_forward_worst_case", window),
            &window,
            |b, &window| b.iter(|| member.find_forward(black_box(&target), window).unwrap()),
        );
    }

    group.finish();
}

fn bench_message_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("rv-message");
    let alice = TestParty::new("alice");
    let bob = TestParty::new("bob");
    let (relationship, _) = alice
        .service
        .initiate_relationship(&[bob.wallet.contact_key()], None)
        .unwrap();
    let tx_id = relationship.tx_id;
    bob.service.process_transaction(&alice.last_sent()).unwrap();
    bob.service.accept_relationship(&tx_id, None).unwrap();
    alice.service.process_transaction(&bob.last_sent()).unwrap();

    let message = PrivateMessage {
        subject: "bench".to_string(),
        body: vec![0u8; 256],
    };
    group.bench_function("send_and_receive_direct", |b| {
        b.iter(|| {
            alice.service.send_message(&tx_id, message.clone()).unwrap();
            let outcome = bob
                .service
                .process_transaction(&alice.last_sent())
                .unwrap();
            black_box(outcome)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_chain, bench_message_round);
criterion_main!(benches);
