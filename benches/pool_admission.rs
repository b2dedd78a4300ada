//! Throughput of the admission path (§4.6): validation plus pending/queued
//! insertion, both for gapless sequential-nonce submission (the common
//! case, stays entirely in `pending`) and for out-of-order submission that
//! exercises the queue manager and promotion.

use alloy_primitives::Address;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eth_txpool::config::PoolConfig;
use eth_txpool::pool::txpool::PoolInner;
use eth_txpool::test_utils::{MockStateReader, MockTransactionFactory};
use eth_txpool::traits::TransactionOrigin;
use eth_txpool::validate::pipeline::Validator;
use std::sync::Arc;
use tokio::runtime::Builder;

fn make_pool(config: PoolConfig) -> PoolInner<MockStateReader> {
    let validator = Validator::new(config.clone(), Arc::new(MockStateReader::new()), 1);
    PoolInner::new(config, validator)
}

fn bench_sequential_admission(c: &mut Criterion) {
    let rt = Builder::new_current_thread().build().unwrap();
    let mut group = c.benchmark_group("admission_sequential");

    for &count in &[100usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut config = PoolConfig::default();
                config.pending_limit.max_txs = count + 1;
                config.max_account_slots = count + 1;
                let pool = make_pool(config);
                let mut factory = MockTransactionFactory::new();
                let sender = Address::with_last_byte(1);
                rt.block_on(async {
                    for nonce in 0..count as u64 {
                        let tx = factory.dynamic_fee(sender, nonce, 100, 10);
                        black_box(pool.add_transaction(TransactionOrigin::External, None, tx).await.unwrap());
                    }
                });
            });
        });
    }
    group.finish();
}

/// Worst case for the queue manager: every transaction arrives with a
/// nonce one ahead of contiguity, so nothing promotes until the very last
/// submission closes the gap all the way back to nonce 0.
fn bench_reverse_order_admission(c: &mut Criterion) {
    let rt = Builder::new_current_thread().build().unwrap();
    let mut group = c.benchmark_group("admission_reverse_order");

    for &count in &[100usize, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut config = PoolConfig::default();
                config.queued_limit.max_txs = count + 1;
                config.max_account_slots = count + 1;
                let pool = make_pool(config);
                let mut factory = MockTransactionFactory::new();
                let sender = Address::with_last_byte(1);
                rt.block_on(async {
                    for nonce in (0..count as u64).rev() {
                        let tx = factory.dynamic_fee(sender, nonce, 100, 10);
                        black_box(pool.add_transaction(TransactionOrigin::External, None, tx).await.unwrap());
                    }
                });
            });
        });
    }
    group.finish();
}

fn bench_many_senders(c: &mut Criterion) {
    let rt = Builder::new_current_thread().build().unwrap();
    let mut group = c.benchmark_group("admission_many_senders");

    for &senders in &[100usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(senders), &senders, |b, &senders| {
            b.iter(|| {
                let mut config = PoolConfig::default();
                config.pending_limit.max_txs = senders + 1;
                let pool = make_pool(config);
                let mut factory = MockTransactionFactory::new();
                rt.block_on(async {
                    for i in 0..senders as u8 {
                        let sender = Address::with_last_byte(i);
                        let tx = factory.dynamic_fee(sender, 0, 100, 10);
                        black_box(pool.add_transaction(TransactionOrigin::External, None, tx).await.unwrap());
                    }
                });
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sequential_admission, bench_reverse_order_admission, bench_many_senders);
criterion_main!(benches);
