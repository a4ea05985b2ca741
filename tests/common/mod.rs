//! Helpers shared by the integration test binaries

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use withdrawal_engine::{
    Ledger, RetryPolicy, SettlementConfig, WithdrawalProcessor, WithdrawalRequest,
};

/// Processor over a fresh ledger holding `accounts`
pub fn processor_with_accounts(accounts: &[(&str, i64)]) -> Arc<WithdrawalProcessor> {
    let ledger = Arc::new(Ledger::new());
    for (id, balance) in accounts {
        ledger
            .open_account(id, Decimal::new(*balance, 0))
            .expect("Failed to open account");
    }
    Arc::new(WithdrawalProcessor::new(ledger))
}

/// Settlement config with millisecond backoffs
pub fn fast_config(workers: usize, max_attempts: u32) -> SettlementConfig {
    SettlementConfig::new(
        workers,
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(10),
            2,
        ),
        Duration::from_millis(500),
    )
}

pub fn request(key: &str, account: &str, amount: i64) -> WithdrawalRequest {
    WithdrawalRequest::new(key, account, Decimal::new(amount, 0), format!("iban:{}", key))
}

/// Wait until every accepted withdrawal is terminal
///
/// # Panics
///
/// Panics if the queue does not drain within five seconds.
pub async fn drain(processor: &WithdrawalProcessor) {
    tokio::time::timeout(Duration::from_secs(5), processor.queue().wait_drained())
        .await
        .expect("Settlement did not drain in time");
}

/// Assert the balance invariants on every account of the ledger
pub fn assert_ledger_consistent(processor: &WithdrawalProcessor) {
    for account in processor.ledger().accounts() {
        assert!(account.is_consistent(), "Inconsistent account: {:?}", account);
        assert_eq!(
            account.available + account.reserved,
            account.total,
            "Balance mismatch on account {}",
            account.id
        );
    }
}
