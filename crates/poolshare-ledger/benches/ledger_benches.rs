//! Criterion benchmarks for poolshare-ledger hot paths.
//!
//! Covers: deposit, direct claim and weight updates at increasing
//! participant counts. Deposit and claim cost should stay flat as the
//! registry grows.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use poolshare_core::event::VaultEvent;
use poolshare_core::traits::EventSink;
use poolshare_core::types::Address;
use poolshare_ledger::{ManualClock, MemoryToken, Vault, VaultConfig, VaultInit};

const SIZES: [u32; 3] = [10, 1_000, 100_000];

struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &VaultEvent) {}
}

fn participant(i: u32) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x01;
    bytes[16..].copy_from_slice(&i.to_be_bytes());
    Address::from_bytes(bytes)
}

fn depositor() -> Address {
    Address::repeat_byte(0xd0)
}

fn vault(participants: u32) -> Vault<MemoryToken, NullSink, ManualClock> {
    let mut init = VaultInit::new(Address::repeat_byte(0xe1), Address::repeat_byte(0xe2));
    for i in 0..participants {
        init = init.with_participant(participant(i), 1 + (i as u64 % 7));
    }
    let token = MemoryToken::new();
    token.mint(&depositor(), u128::MAX / 2);
    token.approve(&depositor(), u128::MAX);
    Vault::initialize(VaultConfig::default(), init, token, NullSink, ManualClock::new(0))
        .expect("valid bench vault")
}

fn bench_deposit(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit");
    for n in SIZES {
        let v = vault(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| v.deposit(black_box(&depositor()), black_box(1_000)))
        });
    }
    group.finish();
}

fn bench_claim(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit_then_claim");
    for n in SIZES {
        let v = vault(n);
        let who = participant(n / 2);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let _ = v.deposit(&depositor(), black_box(1_000_000));
                v.claim(black_box(&who), black_box(&who))
            })
        });
    }
    group.finish();
}

fn bench_set_weight(c: &mut Criterion) {
    let governor = Address::repeat_byte(0xe2);
    let mut group = c.benchmark_group("set_single_weight");
    for n in SIZES {
        let v = vault(n);
        let who = [participant(0)];
        let mut w = 1u64;
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                w = w % 1_000 + 1;
                v.set_weights(&governor, black_box(&who), black_box(&[w]))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_deposit, bench_claim, bench_set_weight);
criterion_main!(benches);
