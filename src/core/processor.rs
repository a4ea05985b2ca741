//! Withdrawal processing orchestration
//!
//! This module provides the `WithdrawalProcessor` struct, the public entry
//! point of the crate. It coordinates the idempotency registry, the ledger,
//! the status store and the settlement queue.
//!
//! # Architecture
//!
//! ```text
//! WithdrawalProcessor
//!     ├── Arc<Ledger>               (balances and reservations)
//!     ├── Arc<IdempotencyRegistry>  (key -> withdrawal id)
//!     ├── Arc<StatusStore>          (withdrawal id -> intent)
//!     └── Arc<WithdrawalQueue>      (per-account settlement order)
//! ```
//!
//! # Transitions
//!
//! Every state change goes through [`WithdrawalProcessor::apply`], which runs
//! inside the status store's per-intent lock. Ledger side effects (reserve,
//! commit, release) happen in the same critical section, and the registry's
//! recorded outcome is updated before the lock is released.
//!
//! Lock order is always status entry, then ledger account, then registry
//! entry. Nothing takes them the other way round.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use super::config::SettlementConfig;
use super::idempotency::IdempotencyRegistry;
use super::ledger::Ledger;
use super::queue::WithdrawalQueue;
use super::status_store::StatusStore;
use super::traits::{GatewayError, PayoutGateway};
use crate::types::{
    PayoutInstruction, SubmitOutcome, TransferReceipt, WithdrawalError, WithdrawalId,
    WithdrawalIntent, WithdrawalRequest, WithdrawalState,
};

/// Result of one settlement attempt, as seen by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Payout confirmed, reservation committed
    Settled,
    /// Permanent failure or retry budget exhausted, reservation released
    Failed,
    /// Transient failure; the withdrawal is `QUEUED` again and may be retried
    /// after `delay`
    Retry { delay: Duration },
    /// The attempt could not proceed because of an invariant violation
    Abandoned,
}

impl AttemptOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptOutcome::Retry { .. })
    }
}

/// Withdrawal processing engine
///
/// Cheap to share behind an `Arc`: `submit`, `status` and `transfer` take
/// `&self`, never await, and are safe to call from any number of threads.
#[derive(Debug)]
pub struct WithdrawalProcessor {
    ledger: Arc<Ledger>,
    registry: Arc<IdempotencyRegistry>,
    status: Arc<StatusStore>,
    queue: Arc<WithdrawalQueue>,
}

impl WithdrawalProcessor {
    /// Create a processor over `ledger` with fresh registry, store and queue
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self::with_components(
            ledger,
            Arc::new(IdempotencyRegistry::new()),
            Arc::new(StatusStore::new()),
            Arc::new(WithdrawalQueue::new()),
        )
    }

    /// Create a processor from explicitly provided components
    pub fn with_components(
        ledger: Arc<Ledger>,
        registry: Arc<IdempotencyRegistry>,
        status: Arc<StatusStore>,
        queue: Arc<WithdrawalQueue>,
    ) -> Self {
        Self {
            ledger,
            registry,
            status,
            queue,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn registry(&self) -> &Arc<IdempotencyRegistry> {
        &self.registry
    }

    pub fn status_store(&self) -> &Arc<StatusStore> {
        &self.status
    }

    pub fn queue(&self) -> &Arc<WithdrawalQueue> {
        &self.queue
    }

    /// Accept a withdrawal request
    ///
    /// # Arguments
    ///
    /// * `request` - The client's withdrawal request
    ///
    /// # Returns
    ///
    /// * `Ok(SubmitOutcome)` with `duplicate == false` - Funds reserved and the
    ///   withdrawal queued for settlement; `state` is `QUEUED`
    /// * `Ok(SubmitOutcome)` with `duplicate == true` - The key was already
    ///   accepted; nothing was re-processed and `state` is the current state
    ///   of the original withdrawal
    /// * `Err(WithdrawalError::InvalidRequest)` - Validation failed, or the key
    ///   was already used with different parameters
    /// * `Err(WithdrawalError::InsufficientFunds)` - The withdrawal was
    ///   recorded as `FAILED`; a resubmission of the same key returns that
    ///   outcome as a duplicate
    pub fn submit(&self, request: WithdrawalRequest) -> Result<SubmitOutcome, WithdrawalError> {
        if let Some(record) = self.registry.lookup(&request.key) {
            return self.duplicate(&request, record.withdrawal_id, &record.request, record.outcome);
        }

        if let Err(e) = self.validate(&request) {
            warn!(key = %request.key, account = %request.account, error = %e, "invalid withdrawal request");
            return Err(e);
        }

        let withdrawal_id = WithdrawalId::new();
        let registration = self.registry.register_if_absent(&request, withdrawal_id);
        if !registration.is_new {
            let outcome = self
                .registry
                .lookup(&request.key)
                .map(|record| record.outcome)
                .unwrap_or(WithdrawalState::Pending);
            return self.duplicate(
                &request,
                registration.withdrawal_id,
                &registration.original,
                outcome,
            );
        }

        self.status
            .insert(WithdrawalIntent::new(withdrawal_id, request.clone()))?;

        let reference = withdrawal_id.to_string();
        let reserved = self.apply(&withdrawal_id, |intent| {
            let reservation =
                self.ledger
                    .reserve(&intent.request.account, intent.request.amount, &reference);
            match reservation {
                Ok(handle) => {
                    if let Err(e) = intent.advance(WithdrawalState::Reserved) {
                        self.ledger.release(&handle, &reference)?;
                        return Err(e);
                    }
                    intent.reservation = Some(handle);
                    Ok(())
                }
                Err(e) => {
                    intent.fail(e.clone())?;
                    Err(e)
                }
            }
        });
        if let Err(e) = reserved {
            warn!(withdrawal_id = %withdrawal_id, key = %request.key, account = %request.account, error = %e, "withdrawal rejected");
            return Err(e);
        }

        self.apply(&withdrawal_id, |intent| {
            intent.advance(WithdrawalState::Queued).map(|_| ())
        })?;
        self.queue.enqueue(&request.account, withdrawal_id);

        info!(
            withdrawal_id = %withdrawal_id,
            key = %request.key,
            account = %request.account,
            amount = %request.amount,
            "withdrawal accepted"
        );

        Ok(SubmitOutcome {
            withdrawal_id,
            state: WithdrawalState::Queued,
            duplicate: false,
        })
    }

    /// Current intent of a withdrawal
    ///
    /// # Returns
    ///
    /// * `Ok(WithdrawalIntent)` - Snapshot of the intent
    /// * `Err(WithdrawalError::WithdrawalNotFound)` - No withdrawal with this id
    pub fn status(&self, withdrawal_id: &WithdrawalId) -> Result<WithdrawalIntent, WithdrawalError> {
        self.status
            .get(withdrawal_id)
            .ok_or_else(|| WithdrawalError::withdrawal_not_found(withdrawal_id))
    }

    /// Current intent of the withdrawal accepted under an idempotency key
    pub fn status_by_key(&self, key: &str) -> Result<WithdrawalIntent, WithdrawalError> {
        let record = self
            .registry
            .lookup(key)
            .ok_or_else(|| WithdrawalError::withdrawal_not_found(key))?;
        self.status(&record.withdrawal_id)
    }

    /// Move available funds between two accounts synchronously
    ///
    /// # Returns
    ///
    /// * `Ok(TransferReceipt)` - Funds moved; the receipt's reference appears in
    ///   both accounts' journals
    /// * `Err(WithdrawalError)` - See [`Ledger::transfer`]; nothing changed
    pub fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, WithdrawalError> {
        let reference = format!("transfer-{}", ulid::Ulid::new());

        if let Err(e) = self.ledger.transfer(from, to, amount, &reference) {
            warn!(from = %from, to = %to, amount = %amount, error = %e, "transfer rejected");
            return Err(e);
        }

        Ok(TransferReceipt {
            reference,
            from: from.to_string(),
            to: to.to_string(),
            amount,
        })
    }

    /// Run one settlement attempt for a queued withdrawal
    ///
    /// Moves the intent `QUEUED -> SETTLING`, calls the gateway under
    /// `config.attempt_timeout`, then applies the outcome together with its
    /// ledger effect:
    ///
    /// | gateway result                       | transition          | ledger  |
    /// |--------------------------------------|---------------------|---------|
    /// | success                              | `SETTLING -> SETTLED` | commit  |
    /// | permanent error                      | `SETTLING -> FAILED`  | release |
    /// | transient error, budget exhausted    | `SETTLING -> FAILED`  | release |
    /// | transient error, timeout or panic    | `SETTLING -> QUEUED`  | none    |
    pub async fn settle_attempt(
        &self,
        withdrawal_id: WithdrawalId,
        gateway: &dyn PayoutGateway,
        config: &SettlementConfig,
    ) -> AttemptOutcome {
        let started = self.apply(&withdrawal_id, |intent| {
            intent.advance(WithdrawalState::Settling)?;
            intent.attempts += 1;
            Ok(PayoutInstruction::for_intent(intent))
        });
        let instruction = match started {
            Ok(instruction) => instruction,
            Err(e) => {
                error!(withdrawal_id = %withdrawal_id, error = %e, "cannot start settlement attempt");
                return AttemptOutcome::Abandoned;
            }
        };
        let attempt = instruction.attempt;
        debug!(withdrawal_id = %withdrawal_id, attempt, "calling payout gateway");

        let call = AssertUnwindSafe(gateway.execute(&instruction)).catch_unwind();
        let result = match tokio::time::timeout(config.attempt_timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                error!(withdrawal_id = %withdrawal_id, attempt, panic = %message, "payout gateway panicked");
                Err(GatewayError::Transient(format!("gateway panicked: {}", message)))
            }
            Err(_) => Err(GatewayError::Transient(format!(
                "attempt timed out after {:?}",
                config.attempt_timeout
            ))),
        };

        let reference = withdrawal_id.to_string();
        let applied = match result {
            Ok(receipt) => self.apply(&withdrawal_id, |intent| {
                let handle = intent.reservation.clone().ok_or_else(|| {
                    WithdrawalError::invalid_state(format!(
                        "withdrawal {} has no reservation to commit",
                        withdrawal_id
                    ))
                })?;
                intent.state.transition(WithdrawalState::Settled)?;
                self.ledger.commit(&handle, &reference)?;
                intent.advance(WithdrawalState::Settled)?;
                intent.reservation = None;
                intent.gateway_reference = Some(receipt.reference);
                Ok(AttemptOutcome::Settled)
            }),
            Err(error) if !error.is_transient() => self.apply(&withdrawal_id, |intent| {
                intent.last_error = Some(error.message().to_string());
                self.release_and_fail(intent, &reference, WithdrawalError::from(error))
            }),
            Err(error) if !config.retry.allows_retry(attempt) => {
                self.apply(&withdrawal_id, |intent| {
                    let message = error.message().to_string();
                    intent.last_error = Some(message.clone());
                    self.release_and_fail(
                        intent,
                        &reference,
                        WithdrawalError::retry_exhausted(attempt, message),
                    )
                })
            }
            Err(error) => {
                let delay = config.retry.backoff_for(attempt);
                let message = error.message().to_string();
                let reason = WithdrawalError::from(error);
                let requeued = self.apply(&withdrawal_id, |intent| {
                    intent.advance(WithdrawalState::Queued)?;
                    intent.last_error = Some(message);
                    Ok(AttemptOutcome::Retry { delay })
                });
                if requeued.is_ok() {
                    warn!(withdrawal_id = %withdrawal_id, attempt, delay_ms = delay.as_millis() as u64, error = %reason, "transient payout failure, retrying");
                }
                requeued
            }
        };

        match applied {
            Ok(outcome) => {
                match &outcome {
                    AttemptOutcome::Settled => {
                        info!(withdrawal_id = %withdrawal_id, attempts = attempt, "withdrawal settled")
                    }
                    AttemptOutcome::Failed => {
                        warn!(withdrawal_id = %withdrawal_id, attempts = attempt, "withdrawal failed")
                    }
                    AttemptOutcome::Retry { .. } | AttemptOutcome::Abandoned => {}
                }
                outcome
            }
            Err(e) => {
                error!(withdrawal_id = %withdrawal_id, attempt, error = %e, "cannot apply settlement outcome");
                AttemptOutcome::Abandoned
            }
        }
    }

    fn validate(&self, request: &WithdrawalRequest) -> Result<(), WithdrawalError> {
        if request.key.trim().is_empty() {
            return Err(WithdrawalError::invalid_request("idempotency key must not be empty"));
        }
        if request.destination.trim().is_empty() {
            return Err(WithdrawalError::invalid_request("destination must not be empty"));
        }
        if request.amount <= Decimal::ZERO {
            return Err(WithdrawalError::invalid_request(format!(
                "amount {} must be positive",
                request.amount
            )));
        }
        if !self.ledger.contains(&request.account) {
            return Err(WithdrawalError::invalid_request(format!(
                "account {} does not exist",
                request.account
            )));
        }
        Ok(())
    }

    fn duplicate(
        &self,
        request: &WithdrawalRequest,
        withdrawal_id: WithdrawalId,
        original: &WithdrawalRequest,
        recorded: WithdrawalState,
    ) -> Result<SubmitOutcome, WithdrawalError> {
        if request != original {
            warn!(key = %request.key, withdrawal_id = %withdrawal_id, "idempotency key reused with different parameters");
            return Err(WithdrawalError::invalid_request(format!(
                "idempotency key {} was already used with different parameters",
                request.key
            )));
        }

        let state = self.status.state(&withdrawal_id).unwrap_or(recorded);
        debug!(key = %request.key, withdrawal_id = %withdrawal_id, state = %state, "duplicate submission");
        Ok(SubmitOutcome {
            withdrawal_id,
            state,
            duplicate: true,
        })
    }

    fn release_and_fail(
        &self,
        intent: &mut WithdrawalIntent,
        reference: &str,
        reason: WithdrawalError,
    ) -> Result<AttemptOutcome, WithdrawalError> {
        let handle = intent.reservation.clone().ok_or_else(|| {
            WithdrawalError::invalid_state(format!(
                "withdrawal {} has no reservation to release",
                intent.id
            ))
        })?;
        intent.state.transition(WithdrawalState::Failed)?;
        self.ledger.release(&handle, reference)?;
        intent.fail(reason)?;
        intent.reservation = None;
        Ok(AttemptOutcome::Failed)
    }

    /// Apply a change to one intent atomically
    ///
    /// Runs `f` inside the status store's entry lock. When the intent's state
    /// changed, the new state is recorded in the idempotency registry before
    /// the lock is released. `InvalidState` errors are logged.
    fn apply<T, F>(&self, withdrawal_id: &WithdrawalId, f: F) -> Result<T, WithdrawalError>
    where
        F: FnOnce(&mut WithdrawalIntent) -> Result<T, WithdrawalError>,
    {
        let result = self.status.update(withdrawal_id, |intent| {
            let before = intent.state;
            let result = f(intent);
            if intent.state == before {
                return result;
            }

            debug!(withdrawal_id = %withdrawal_id, from = %before, to = %intent.state, "state transition");
            let recorded = self
                .registry
                .record_outcome(&intent.request.key, intent.state);
            match (result, recorded) {
                (Ok(value), Ok(())) => Ok(value),
                (Err(e), _) | (Ok(_), Err(e)) => Err(e),
            }
        });

        if let Err(WithdrawalError::InvalidState { message }) = &result {
            error!(withdrawal_id = %withdrawal_id, "{}", message);
        }
        result
    }
}

/// Text of a caught panic payload
fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RetryPolicy;
    use crate::core::gateway::ScriptedGateway;

    fn processor_with(balance: i64) -> WithdrawalProcessor {
        let ledger = Arc::new(Ledger::new());
        ledger.open_account("x", Decimal::new(balance, 0)).unwrap();
        WithdrawalProcessor::new(ledger)
    }

    fn request(key: &str, amount: i64) -> WithdrawalRequest {
        WithdrawalRequest::new(key, "x", Decimal::new(amount, 0), "iban:DE001")
    }

    fn config(max_attempts: u32) -> SettlementConfig {
        SettlementConfig::new(
            1,
            RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(4), 2),
            Duration::from_millis(200),
        )
    }

    #[test]
    fn test_submit_reserves_and_queues() {
        let processor = processor_with(100);

        let outcome = processor.submit(request("k1", 60)).unwrap();

        assert_eq!(outcome.state, WithdrawalState::Queued);
        assert!(!outcome.duplicate);
        let account = processor.ledger().account("x").unwrap();
        assert_eq!(account.available, Decimal::new(40, 0));
        assert_eq!(account.reserved, Decimal::new(60, 0));
        assert_eq!(processor.queue().outstanding(), 1);
        assert_eq!(
            processor.registry().lookup("k1").unwrap().outcome,
            WithdrawalState::Queued
        );
    }

    #[test]
    fn test_insufficient_funds_fails_intent() {
        let processor = processor_with(100);
        processor.submit(request("k1", 60)).unwrap();

        let result = processor.submit(request("k2", 60));

        assert!(matches!(result, Err(WithdrawalError::InsufficientFunds { .. })));
        let intent = processor.status_by_key("k2").unwrap();
        assert_eq!(intent.state, WithdrawalState::Failed);
        assert!(intent.reservation.is_none());
        assert_eq!(
            processor.ledger().account("x").unwrap().available,
            Decimal::new(40, 0)
        );
        assert_eq!(processor.queue().outstanding(), 1);
    }

    #[test]
    fn test_duplicate_returns_same_id_without_reserving() {
        let processor = processor_with(100);
        let first = processor.submit(request("k1", 60)).unwrap();

        let second = processor.submit(request("k1", 60)).unwrap();

        assert!(second.duplicate);
        assert_eq!(second.withdrawal_id, first.withdrawal_id);
        assert_eq!(second.state, WithdrawalState::Queued);
        assert_eq!(processor.ledger().outstanding_reservations("x"), 1);
    }

    #[test]
    fn test_duplicate_of_failed_submission_is_not_retried() {
        let processor = processor_with(10);
        assert!(processor.submit(request("k1", 60)).is_err());

        let again = processor.submit(request("k1", 60)).unwrap();

        assert!(again.duplicate);
        assert_eq!(again.state, WithdrawalState::Failed);
    }

    #[test]
    fn test_key_reuse_with_different_parameters() {
        let processor = processor_with(100);
        processor.submit(request("k1", 60)).unwrap();

        let result = processor.submit(request("k1", 10));

        assert!(matches!(result, Err(WithdrawalError::InvalidRequest { .. })));
        assert_eq!(processor.ledger().outstanding_reservations("x"), 1);
    }

    #[test]
    fn test_validation_errors() {
        let processor = processor_with(100);

        let cases = vec![
            WithdrawalRequest::new("", "x", Decimal::ONE, "iban"),
            WithdrawalRequest::new("k", "x", Decimal::ONE, " "),
            WithdrawalRequest::new("k", "x", Decimal::ZERO, "iban"),
            WithdrawalRequest::new("k", "x", Decimal::new(-5, 0), "iban"),
            WithdrawalRequest::new("k", "ghost", Decimal::ONE, "iban"),
        ];

        for case in cases {
            let result = processor.submit(case);
            assert!(matches!(result, Err(WithdrawalError::InvalidRequest { .. })));
        }
        assert!(processor.registry().is_empty());
        assert!(processor.status_store().is_empty());
    }

    #[test]
    fn test_status_of_unknown_withdrawal() {
        let processor = processor_with(100);
        let id = WithdrawalId::new();

        assert_eq!(
            processor.status(&id),
            Err(WithdrawalError::withdrawal_not_found(id))
        );
    }

    #[tokio::test]
    async fn test_settle_attempt_success_commits() {
        let processor = processor_with(100);
        let outcome = processor.submit(request("k1", 60)).unwrap();
        let gateway = ScriptedGateway::succeeding();

        let attempt = processor
            .settle_attempt(outcome.withdrawal_id, &gateway, &config(3))
            .await;

        assert_eq!(attempt, AttemptOutcome::Settled);
        let intent = processor.status(&outcome.withdrawal_id).unwrap();
        assert_eq!(intent.state, WithdrawalState::Settled);
        assert_eq!(intent.attempts, 1);
        assert!(intent.gateway_reference.is_some());
        let account = processor.ledger().account("x").unwrap();
        assert_eq!(account.total, Decimal::new(40, 0));
        assert_eq!(account.reserved, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_settle_attempt_permanent_error_releases() {
        let processor = processor_with(100);
        let outcome = processor.submit(request("k1", 60)).unwrap();
        let gateway = ScriptedGateway::new(vec![ScriptedGateway::permanent("closed")]);

        let attempt = processor
            .settle_attempt(outcome.withdrawal_id, &gateway, &config(3))
            .await;

        assert_eq!(attempt, AttemptOutcome::Failed);
        let intent = processor.status(&outcome.withdrawal_id).unwrap();
        assert_eq!(intent.state, WithdrawalState::Failed);
        assert_eq!(
            intent.failure,
            Some(WithdrawalError::permanent_gateway_error("closed"))
        );
        assert_eq!(
            processor.ledger().account("x").unwrap().available,
            Decimal::new(100, 0)
        );
    }

    #[tokio::test]
    async fn test_settle_attempt_transient_requeues_then_exhausts() {
        let processor = processor_with(100);
        let outcome = processor.submit(request("k1", 60)).unwrap();
        let gateway = ScriptedGateway::failing(GatewayError::Transient("503".to_string()));
        let config = config(2);

        let first = processor
            .settle_attempt(outcome.withdrawal_id, &gateway, &config)
            .await;
        assert_eq!(
            first,
            AttemptOutcome::Retry {
                delay: Duration::from_millis(1)
            }
        );
        assert_eq!(
            processor.status(&outcome.withdrawal_id).unwrap().state,
            WithdrawalState::Queued
        );

        let second = processor
            .settle_attempt(outcome.withdrawal_id, &gateway, &config)
            .await;
        assert_eq!(second, AttemptOutcome::Failed);

        let intent = processor.status(&outcome.withdrawal_id).unwrap();
        assert_eq!(intent.failure, Some(WithdrawalError::retry_exhausted(2, "503")));
        assert_eq!(
            processor.ledger().account("x").unwrap().available,
            Decimal::new(100, 0)
        );
    }

    #[tokio::test]
    async fn test_settle_attempt_timeout_is_transient() {
        let processor = processor_with(100);
        let outcome = processor.submit(request("k1", 60)).unwrap();
        let gateway = ScriptedGateway::succeeding().with_delay(Duration::from_secs(5));
        let config = SettlementConfig::new(
            1,
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(4), 2),
            Duration::from_millis(10),
        );

        let attempt = processor
            .settle_attempt(outcome.withdrawal_id, &gateway, &config)
            .await;

        assert!(matches!(attempt, AttemptOutcome::Retry { .. }));
        let intent = processor.status(&outcome.withdrawal_id).unwrap();
        assert!(intent.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_settle_attempt_on_terminal_intent_is_abandoned() {
        let processor = processor_with(100);
        let outcome = processor.submit(request("k1", 60)).unwrap();
        let gateway = ScriptedGateway::succeeding();
        processor
            .settle_attempt(outcome.withdrawal_id, &gateway, &config(3))
            .await;

        let again = processor
            .settle_attempt(outcome.withdrawal_id, &gateway, &config(3))
            .await;

        assert_eq!(again, AttemptOutcome::Abandoned);
        assert_eq!(gateway.call_count(), 1);
        assert_eq!(
            processor.ledger().account("x").unwrap().total,
            Decimal::new(40, 0)
        );
    }

    #[test]
    fn test_transfer_returns_receipt() {
        let processor = processor_with(100);
        processor
            .ledger()
            .open_account("y", Decimal::ZERO)
            .unwrap();

        let receipt = processor.transfer("x", "y", Decimal::new(25, 0)).unwrap();

        assert!(receipt.reference.starts_with("transfer-"));
        assert_eq!(
            processor.ledger().account("y").unwrap().available,
            Decimal::new(25, 0)
        );
        assert_eq!(
            processor
                .ledger()
                .journal()
                .entries_for("x", &receipt.reference)
                .len(),
            1
        );
    }
}
