//! Idempotency registry for withdrawal submissions
//!
//! This module provides the `IdempotencyRegistry` struct, which maps a
//! client-supplied idempotency key to the withdrawal it created.
//!
//! # Design
//!
//! Registration is a single `DashMap` compare-and-insert: the shard lock held
//! by `entry()` makes exactly one concurrent caller the winner for a key. The
//! processor registers a key *before* reserving funds, so a resubmission can
//! never produce a second reservation.
//!
//! Records are never overwritten by another withdrawal id, and once their
//! outcome is terminal it is frozen.

use dashmap::DashMap;
use tracing::error;

use crate::types::{
    IdempotencyKey, WithdrawalError, WithdrawalId, WithdrawalRequest, WithdrawalState,
};

/// What the registry remembers about one key
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub withdrawal_id: WithdrawalId,

    /// The request first accepted under this key
    ///
    /// Used to detect a key being reused for a different withdrawal.
    pub request: WithdrawalRequest,

    /// Last outcome recorded by the processor
    pub outcome: WithdrawalState,
}

/// Result of `register_if_absent`
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// `true` for the single caller that created the record
    pub is_new: bool,

    /// Id of the winning registration
    pub withdrawal_id: WithdrawalId,

    /// Request stored by the winner
    pub original: WithdrawalRequest,
}

/// Thread-safe idempotency key registry
#[derive(Debug, Default)]
pub struct IdempotencyRegistry {
    records: DashMap<IdempotencyKey, IdempotencyRecord>,
}

impl IdempotencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `request.key` for `withdrawal_id` unless the key is known
    ///
    /// # Arguments
    ///
    /// * `request` - Request to remember for the key
    /// * `withdrawal_id` - Id proposed by the caller
    ///
    /// # Returns
    ///
    /// A `Registration`. When `is_new` is `false` the caller lost the race (or
    /// the key was used before) and must not reserve funds; `withdrawal_id` is
    /// the winner's id.
    pub fn register_if_absent(
        &self,
        request: &WithdrawalRequest,
        withdrawal_id: WithdrawalId,
    ) -> Registration {
        let mut is_new = false;
        let record = self
            .records
            .entry(request.key.clone())
            .or_insert_with(|| {
                is_new = true;
                IdempotencyRecord {
                    withdrawal_id,
                    request: request.clone(),
                    outcome: WithdrawalState::Pending,
                }
            });

        Registration {
            is_new,
            withdrawal_id: record.withdrawal_id,
            original: record.request.clone(),
        }
    }

    /// Look up the record for a key
    pub fn lookup(&self, key: &str) -> Option<IdempotencyRecord> {
        self.records.get(key).map(|record| record.value().clone())
    }

    /// Record the latest outcome for a key
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Outcome stored
    /// * `Err(WithdrawalError::InvalidState)` - Unknown key, or the stored
    ///   outcome is already terminal
    pub fn record_outcome(&self, key: &str, outcome: WithdrawalState) -> Result<(), WithdrawalError> {
        let result = match self.records.get_mut(key) {
            Some(record) if record.outcome.is_terminal() => {
                Err(WithdrawalError::invalid_state(format!(
                    "idempotency key {} is already final as {}",
                    key, record.outcome
                )))
            }
            Some(mut record) => {
                record.outcome = outcome;
                Ok(())
            }
            None => Err(WithdrawalError::invalid_state(format!(
                "idempotency key {} was never registered",
                key
            ))),
        };

        if let Err(e) = &result {
            error!(key = %key, "{}", e);
        }
        result
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::thread;

    fn request(key: &str) -> WithdrawalRequest {
        WithdrawalRequest::new(key, "acc-1", Decimal::new(10, 0), "iban:1")
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = IdempotencyRegistry::new();
        let first = WithdrawalId::new();

        let registration = registry.register_if_absent(&request("k1"), first);

        assert!(registration.is_new);
        assert_eq!(registration.withdrawal_id, first);
        assert_eq!(registry.lookup("k1").unwrap().outcome, WithdrawalState::Pending);
    }

    #[test]
    fn test_second_registration_returns_original_id() {
        let registry = IdempotencyRegistry::new();
        let first = WithdrawalId::new();
        registry.register_if_absent(&request("k1"), first);

        let registration = registry.register_if_absent(&request("k1"), WithdrawalId::new());

        assert!(!registration.is_new);
        assert_eq!(registration.withdrawal_id, first);
        assert_eq!(registration.original, request("k1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_registration_has_single_winner() {
        let registry = Arc::new(IdempotencyRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.register_if_absent(&request("k1"), WithdrawalId::new()))
            })
            .collect();

        let registrations: Vec<Registration> =
            handles.into_iter().map(|handle| handle.join().unwrap()).collect();

        let winners = registrations.iter().filter(|r| r.is_new).count();
        let winner_id = registrations[0].withdrawal_id;
        assert_eq!(winners, 1);
        assert!(registrations.iter().all(|r| r.withdrawal_id == winner_id));
    }

    #[test]
    fn test_record_outcome_until_terminal() {
        let registry = IdempotencyRegistry::new();
        registry.register_if_absent(&request("k1"), WithdrawalId::new());

        registry.record_outcome("k1", WithdrawalState::Queued).unwrap();
        registry.record_outcome("k1", WithdrawalState::Settled).unwrap();
        let result = registry.record_outcome("k1", WithdrawalState::Failed);

        assert!(matches!(result, Err(WithdrawalError::InvalidState { .. })));
        assert_eq!(registry.lookup("k1").unwrap().outcome, WithdrawalState::Settled);
    }

    #[test]
    fn test_record_outcome_for_unknown_key() {
        let registry = IdempotencyRegistry::new();

        let result = registry.record_outcome("ghost", WithdrawalState::Queued);

        assert!(matches!(result, Err(WithdrawalError::InvalidState { .. })));
    }
}
