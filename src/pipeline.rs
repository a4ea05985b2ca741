//! CSV batch pipeline
//!
//! Drives the withdrawal engine from files, the way an inbound transport
//! would drive it from requests:
//!
//! ```text
//! accounts.csv ──► AccountReader ──► Ledger::open_account
//!                                         │
//! withdrawals.csv ──► WithdrawalReader ──► WithdrawalProcessor::submit ──► WithdrawalQueue
//!                                                                              │
//!                                              SettlementWorkerPool ◄──────────┘
//!                                                     │
//!                             wait_drained, shutdown, balances CSV (+ report)
//! ```
//!
//! Individual bad rows and rejected withdrawals are logged and counted; only
//! fatal problems (missing files, output errors, runtime creation) abort the
//! run.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{info, warn};

use crate::core::{
    Ledger, PayoutGateway, SettlementConfig, SettlementWorkerPool, WithdrawalProcessor,
};
use crate::io::{write_accounts_csv, write_withdrawal_report, AccountReader, WithdrawalReader};
use crate::types::{Account, WithdrawalIntent, WithdrawalState};

/// Default number of withdrawal rows read per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Counters collected during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// New withdrawals accepted and queued
    pub accepted: usize,
    /// Submissions answered from the idempotency registry
    pub duplicates: usize,
    /// Submissions rejected synchronously
    pub rejected: usize,
    pub settled: usize,
    pub failed: usize,
}

/// Final state of a run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Balances, sorted by account id
    pub accounts: Vec<Account>,
    /// Every withdrawal intent created during the run
    pub withdrawals: Vec<WithdrawalIntent>,
    pub summary: PipelineSummary,
}

/// Configured pipeline
#[derive(Clone)]
pub struct Pipeline {
    config: SettlementConfig,
    gateway: Arc<dyn PayoutGateway>,
    batch_size: usize,
}

impl Pipeline {
    pub fn new(config: SettlementConfig, gateway: Arc<dyn PayoutGateway>) -> Self {
        Self {
            config,
            gateway,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Number of withdrawal rows read per batch; zero keeps the default
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        if batch_size == 0 {
            warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size, DEFAULT_BATCH_SIZE
            );
        } else {
            self.batch_size = batch_size;
        }
        self
    }

    /// Run the pipeline on its own tokio runtime and write the results
    ///
    /// # Arguments
    ///
    /// * `accounts_path` - `account,balance` CSV
    /// * `withdrawals_path` - `key,account,amount,destination` CSV
    /// * `output` - Receives the `account,available,reserved,total` CSV
    /// * `report` - Optionally receives the per-withdrawal report
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineSummary)` if the run completed
    /// * `Err(String)` if a fatal error occurred
    pub fn process(
        &self,
        accounts_path: &Path,
        withdrawals_path: &Path,
        output: &mut dyn Write,
        report: Option<&mut dyn Write>,
    ) -> Result<PipelineSummary, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_count)
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        let result = runtime.block_on(self.run(accounts_path, withdrawals_path))?;

        write_accounts_csv(&result.accounts, output)?;
        if let Some(report) = report {
            write_withdrawal_report(&result.withdrawals, report)?;
        }

        Ok(result.summary)
    }

    /// Run the pipeline inside the current tokio runtime
    pub async fn run(
        &self,
        accounts_path: &Path,
        withdrawals_path: &Path,
    ) -> Result<PipelineResult, String> {
        let ledger = Arc::new(Ledger::new());
        for row in AccountReader::new(accounts_path)? {
            match row {
                Ok((account, balance)) => {
                    if let Err(e) = ledger.open_account(&account, balance) {
                        warn!(account = %account, "Skipping account: {}", e);
                    }
                }
                Err(e) => warn!("Skipping account row: {}", e),
            }
        }

        let file = tokio::fs::File::open(withdrawals_path).await.map_err(|e| {
            format!(
                "Failed to open file '{}': {}",
                withdrawals_path.display(),
                e
            )
        })?;
        let mut reader = WithdrawalReader::new(file.compat());

        let processor = Arc::new(WithdrawalProcessor::new(Arc::clone(&ledger)));
        let pool = SettlementWorkerPool::start(
            Arc::clone(&processor),
            Arc::clone(&self.gateway),
            self.config.clone(),
        );

        let mut summary = PipelineSummary::default();
        loop {
            let batch = reader.read_batch(self.batch_size).await;
            if batch.is_empty() {
                break;
            }

            for request in batch {
                match processor.submit(request) {
                    Ok(outcome) if outcome.duplicate => summary.duplicates += 1,
                    Ok(_) => summary.accepted += 1,
                    Err(_) => summary.rejected += 1,
                }
            }
        }

        processor.queue().wait_drained().await;
        pool.shutdown().await;

        let withdrawals = processor.status_store().all();
        for intent in &withdrawals {
            match intent.state {
                WithdrawalState::Settled => summary.settled += 1,
                WithdrawalState::Failed => summary.failed += 1,
                _ => {}
            }
        }

        info!(
            accepted = summary.accepted,
            duplicates = summary.duplicates,
            rejected = summary.rejected,
            settled = summary.settled,
            failed = summary.failed,
            "pipeline finished"
        );

        Ok(PipelineResult {
            accounts: ledger.accounts(),
            withdrawals,
            summary,
        })
    }
}

/// Run the pipeline with default batching and write the balances CSV
pub fn run(
    accounts_path: &Path,
    withdrawals_path: &Path,
    config: SettlementConfig,
    gateway: Arc<dyn PayoutGateway>,
    output: &mut dyn Write,
) -> Result<PipelineSummary, String> {
    Pipeline::new(config, gateway).process(accounts_path, withdrawals_path, output, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RetryPolicy, SimulatedGateway};
    use rust_decimal::Decimal;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file
    }

    fn config() -> SettlementConfig {
        SettlementConfig::new(
            2,
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 2),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_process_writes_balances() {
        let accounts = create_temp_csv("account,balance\nalice,100\nbob,50\n");
        let withdrawals = create_temp_csv(
            "key,account,amount,destination\n\
             k1,alice,60,iban:1\n\
             k2,alice,60,iban:2\n\
             k1,alice,60,iban:1\n\
             k3,bob,20,reject:iban:3\n",
        );

        let mut output = Vec::new();
        let summary = run(
            accounts.path(),
            withdrawals.path(),
            config(),
            Arc::new(SimulatedGateway::default()),
            &mut output,
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,available,reserved,total\n\
             alice,40.0000,0.0000,40.0000\n\
             bob,50.0000,0.0000,50.0000\n"
        );
        assert_eq!(
            summary,
            PipelineSummary {
                accepted: 2,
                duplicates: 1,
                rejected: 1,
                settled: 1,
                failed: 2,
            }
        );
    }

    #[test]
    fn test_process_writes_report() {
        let accounts = create_temp_csv("account,balance\nalice,100\n");
        let withdrawals =
            create_temp_csv("key,account,amount,destination\nk1,alice,10,flaky:iban\n");

        let mut output = Vec::new();
        let mut report = Vec::new();
        Pipeline::new(config(), Arc::new(SimulatedGateway::default()))
            .process(
                accounts.path(),
                withdrawals.path(),
                &mut output,
                Some(&mut report),
            )
            .unwrap();

        let report = String::from_utf8(report).unwrap();
        let row = report.lines().nth(1).unwrap();
        assert!(row.starts_with("k1,"));
        assert!(row.ends_with(",alice,10.0000,SETTLED,2,"));
    }

    #[test]
    fn test_missing_withdrawals_file_is_fatal() {
        let accounts = create_temp_csv("account,balance\nalice,100\n");

        let mut output = Vec::new();
        let result = run(
            accounts.path(),
            Path::new("missing.csv"),
            config(),
            Arc::new(SimulatedGateway::default()),
            &mut output,
        );

        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_inside_existing_runtime() {
        let accounts = create_temp_csv("account,balance\nalice,100\nalice,5\n");
        let withdrawals =
            create_temp_csv("key,account,amount,destination\nk1,alice,25,iban\nk2,ghost,1,iban\n");

        let result = Pipeline::new(config(), Arc::new(SimulatedGateway::default()))
            .run(accounts.path(), withdrawals.path())
            .await
            .unwrap();

        assert_eq!(result.accounts.len(), 1);
        assert_eq!(result.accounts[0].total, Decimal::new(75, 0));
        assert_eq!(result.summary.rejected, 1);
        assert_eq!(result.withdrawals.len(), 1);
    }
}
