//! Thread-safe store of withdrawal intents
//!
//! This module provides the `StatusStore` struct, which owns every
//! `WithdrawalIntent` the processor has accepted.
//!
//! # Design
//!
//! Intents are kept in a `DashMap` keyed by withdrawal id. All mutation goes
//! through [`StatusStore::update`], which runs a closure while holding the
//! entry's lock. The processor performs each state transition and its ledger
//! side effect inside that closure, so a status read either sees the state
//! before the transition or the state after it together with its effect.
//!
//! Intents are never removed.

use dashmap::DashMap;

use crate::types::{WithdrawalError, WithdrawalId, WithdrawalIntent, WithdrawalState};

/// Thread-safe withdrawal status store
#[derive(Debug, Default)]
pub struct StatusStore {
    intents: DashMap<WithdrawalId, WithdrawalIntent>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created intent
    ///
    /// Ids are generated per submission, so an existing entry is an invariant
    /// violation and is reported as `InvalidState` without touching it.
    pub fn insert(&self, intent: WithdrawalIntent) -> Result<(), WithdrawalError> {
        let id = intent.id;
        let mut inserted = false;
        self.intents.entry(id).or_insert_with(|| {
            inserted = true;
            intent
        });

        if inserted {
            Ok(())
        } else {
            Err(WithdrawalError::invalid_state(format!(
                "withdrawal {} is already tracked",
                id
            )))
        }
    }

    /// Get a copy of an intent
    pub fn get(&self, id: &WithdrawalId) -> Option<WithdrawalIntent> {
        self.intents.get(id).map(|entry| entry.value().clone())
    }

    /// Current state of an intent
    pub fn state(&self, id: &WithdrawalId) -> Option<WithdrawalState> {
        self.intents.get(id).map(|entry| entry.state)
    }

    /// Update an intent with a closure (atomic per intent)
    ///
    /// The closure receives a mutable reference to the intent and runs while
    /// the entry is locked; no other reader or writer can observe the intent
    /// until it returns.
    ///
    /// # Arguments
    ///
    /// * `id` - Withdrawal to update
    /// * `f` - Closure applying the change
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - Whatever the closure returned
    /// * `Err(WithdrawalError::WithdrawalNotFound)` - Unknown id
    /// * `Err(e)` - Error returned by the closure
    pub fn update<T, F>(&self, id: &WithdrawalId, f: F) -> Result<T, WithdrawalError>
    where
        F: FnOnce(&mut WithdrawalIntent) -> Result<T, WithdrawalError>,
    {
        match self.intents.get_mut(id) {
            Some(mut entry) => f(entry.value_mut()),
            None => Err(WithdrawalError::withdrawal_not_found(id)),
        }
    }

    /// Copies of all intents, sorted by withdrawal id
    pub fn all(&self) -> Vec<WithdrawalIntent> {
        let mut intents: Vec<WithdrawalIntent> = self
            .intents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        intents.sort_by_key(|intent| intent.id);
        intents
    }

    /// Copies of an account's intents, sorted by withdrawal id
    pub fn by_account(&self, account: &str) -> Vec<WithdrawalIntent> {
        let mut intents: Vec<WithdrawalIntent> = self
            .intents
            .iter()
            .filter(|entry| entry.request.account == account)
            .map(|entry| entry.value().clone())
            .collect();
        intents.sort_by_key(|intent| intent.id);
        intents
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
