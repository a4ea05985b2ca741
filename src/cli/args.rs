use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::core::{RetryPolicy, SettlementConfig};

/// Process withdrawal requests against account balances
#[derive(Parser, Debug)]
#[command(name = "withdrawal-engine")]
#[command(about = "Process withdrawal requests with idempotent, concurrent settlement", long_about = None)]
pub struct CliArgs {
    /// Accounts CSV file path (`account,balance`)
    #[arg(value_name = "ACCOUNTS", help = "Path to the accounts CSV file")]
    pub accounts_file: PathBuf,

    /// Withdrawals CSV file path (`key,account,amount,destination`)
    #[arg(value_name = "WITHDRAWALS", help = "Path to the withdrawals CSV file")]
    pub withdrawals_file: PathBuf,

    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of settlement workers (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        help = "Maximum gateway attempts per withdrawal (default: 5)"
    )]
    pub max_attempts: Option<u32>,

    #[arg(
        long = "initial-backoff-ms",
        value_name = "MILLIS",
        help = "Delay before the first retry (default: 50)"
    )]
    pub initial_backoff_ms: Option<u64>,

    #[arg(
        long = "max-backoff-ms",
        value_name = "MILLIS",
        help = "Upper bound for retry delays (default: 2000)"
    )]
    pub max_backoff_ms: Option<u64>,

    #[arg(
        long = "attempt-timeout-ms",
        value_name = "MILLIS",
        help = "Timeout of a single gateway call (default: 5000)"
    )]
    pub attempt_timeout_ms: Option<u64>,

    #[arg(
        long = "gateway-latency-ms",
        value_name = "MILLIS",
        default_value_t = 0,
        help = "Simulated payout gateway latency per call"
    )]
    pub gateway_latency_ms: u64,

    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of withdrawal rows read per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Optional per-withdrawal report output
    #[arg(long = "report", value_name = "PATH", help = "Write a per-withdrawal report CSV to PATH")]
    pub report: Option<PathBuf>,

    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        default_value = "warn",
        help = "Log level written to stderr (overridden by RUST_LOG)"
    )]
    pub log_level: String,
}

impl CliArgs {
    /// Create a SettlementConfig from CLI arguments
    ///
    /// Missing values fall back to defaults; zero values are replaced with
    /// defaults by the config constructors, which log a warning.
    pub fn to_settlement_config(&self) -> SettlementConfig {
        let default = SettlementConfig::default();

        let retry = RetryPolicy::new(
            self.max_attempts.unwrap_or(default.retry.max_attempts),
            self.initial_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(default.retry.initial_backoff),
            self.max_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(default.retry.max_backoff),
            default.retry.multiplier,
        );

        SettlementConfig::new(
            self.workers.unwrap_or(default.worker_count),
            retry,
            self.attempt_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default.attempt_timeout),
        )
    }

    pub fn gateway_latency(&self) -> Duration {
        Duration::from_millis(self.gateway_latency_ms)
    }
}
