//! Settlement worker pool
//!
//! A fixed number of tokio tasks pull work from the `WithdrawalQueue` and run
//! one settlement attempt at a time through the processor.
//!
//! # Lifecycle
//!
//! ```text
//! start ──► workers loop { next_ready -> settle_attempt -> report back }
//!                      │
//! shutdown ──► cancel ─┴─► in-flight attempts finish, workers exit, joined
//! ```
//!
//! A retried withdrawal is put back at the front of its account queue and a
//! timer task returns the account to the ready list once the backoff delay has
//! elapsed. Workers never sleep through a backoff themselves.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::config::SettlementConfig;
use super::processor::{AttemptOutcome, WithdrawalProcessor};
use super::traits::PayoutGateway;

/// Pool of settlement workers
///
/// Must be started from within a tokio runtime.
#[derive(Debug)]
pub struct SettlementWorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl SettlementWorkerPool {
    /// Spawn `config.worker_count` workers
    ///
    /// # Arguments
    ///
    /// * `processor` - Processor whose queue the workers drain
    /// * `gateway` - Payout rail shared by every worker
    /// * `config` - Pool size, retry policy and attempt timeout
    pub fn start(
        processor: Arc<WithdrawalProcessor>,
        gateway: Arc<dyn PayoutGateway>,
        config: SettlementConfig,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let config = Arc::new(config);

        let workers = (0..config.worker_count)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&processor),
                    Arc::clone(&gateway),
                    Arc::clone(&config),
                    shutdown.clone(),
                ))
            })
            .collect();

        info!(workers = config.worker_count, "settlement worker pool started");
        Self { workers, shutdown }
    }

    /// Number of workers in the pool
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Stop every worker and wait for them to exit
    ///
    /// Attempts already in flight run to completion first.
    pub async fn shutdown(self) {
        self.shutdown.cancel();

        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("settlement worker panicked: {}", e);
            }
        }
        info!("settlement worker pool stopped");
    }
}

async fn run_worker(
    worker: usize,
    processor: Arc<WithdrawalProcessor>,
    gateway: Arc<dyn PayoutGateway>,
    config: Arc<SettlementConfig>,
    shutdown: CancellationToken,
) {
    let queue = Arc::clone(processor.queue());
    debug!(worker, "settlement worker started");

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = queue.next_ready() => next,
        };
        let Some((account, withdrawal_id)) = next else {
            break;
        };

        let outcome = processor
            .settle_attempt(withdrawal_id, gateway.as_ref(), &config)
            .await;

        if outcome.is_terminal() {
            queue.complete_one();
            queue.finish_attempt(&account);
        } else if let AttemptOutcome::Retry { delay } = outcome {
            queue.requeue_front(&account, withdrawal_id);
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                queue.reschedule(&account);
            });
        }
    }

    debug!(worker, "settlement worker stopped");
}
