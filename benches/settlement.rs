//! Benchmark suite for the withdrawal engine
//!
//! Measures synchronous submission throughput and end-to-end settlement
//! throughput using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! Every benchmark spreads its withdrawals over a fixed set of accounts, so
//! both the per-account locking and the per-account queues are exercised.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use withdrawal_engine::core::{ScriptedGateway, SimulatedGateway};
use withdrawal_engine::{
    Ledger, PayoutGateway, RetryPolicy, SettlementConfig, SettlementWorkerPool,
    WithdrawalProcessor, WithdrawalRequest,
};

const ACCOUNTS: usize = 16;

fn main() {
    divan::main();
}

fn processor() -> Arc<WithdrawalProcessor> {
    let ledger = Arc::new(Ledger::new());
    for i in 0..ACCOUNTS {
        ledger
            .open_account(&format!("acc-{}", i), Decimal::new(1_000_000, 0))
            .expect("Failed to open account");
    }
    Arc::new(WithdrawalProcessor::new(ledger))
}

fn requests(count: usize, destination: &str) -> Vec<WithdrawalRequest> {
    (0..count)
        .map(|i| {
            WithdrawalRequest::new(
                format!("key-{}", i),
                format!("acc-{}", i % ACCOUNTS),
                Decimal::new(125, 2),
                format!("{}{}", destination, i),
            )
        })
        .collect()
}

fn settle(count: usize, workers: usize, gateway: Arc<dyn PayoutGateway>, destination: &str) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .expect("Failed to create runtime");

    runtime.block_on(async {
        let processor = processor();
        let config = SettlementConfig::new(
            workers,
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 2),
            Duration::from_secs(5),
        );
        let pool = SettlementWorkerPool::start(Arc::clone(&processor), gateway, config);

        for request in requests(count, destination) {
            processor.submit(request).expect("Submit failed");
        }

        processor.queue().wait_drained().await;
        pool.shutdown().await;
    });
}

/// Submission only: validation, idempotency, reservation and enqueue
#[divan::bench(args = [100, 1_000, 10_000])]
fn submit(bencher: divan::Bencher, count: usize) {
    bencher
        .with_inputs(|| (processor(), requests(count, "iban:")))
        .bench_values(|(processor, requests)| {
            for request in requests {
                processor.submit(request).expect("Submit failed");
            }
        });
}

/// Resubmitting keys that were already accepted
#[divan::bench(args = [1_000])]
fn submit_duplicates(bencher: divan::Bencher, count: usize) {
    bencher
        .with_inputs(|| {
            let processor = processor();
            let requests = requests(count, "iban:");
            for request in requests.iter().cloned() {
                processor.submit(request).expect("Submit failed");
            }
            (processor, requests)
        })
        .bench_values(|(processor, requests)| {
            for request in requests {
                processor.submit(request).expect("Submit failed");
            }
        });
}

/// Submit and settle against an always succeeding gateway
#[divan::bench(args = [1, 4])]
fn settle_succeeding(workers: usize) {
    settle(1_000, workers, Arc::new(ScriptedGateway::succeeding()), "iban:");
}

/// Submit and settle with one transient failure per withdrawal
#[divan::bench(args = [1, 4])]
fn settle_flaky(workers: usize) {
    settle(1_000, workers, Arc::new(SimulatedGateway::default()), "flaky:");
}
