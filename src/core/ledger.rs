//! Thread-safe balance store with reservation semantics
//!
//! This module provides the `Ledger` struct, the source of truth for account
//! balances. Withdrawals never debit an account directly: they first reserve
//! funds, and the reservation is later committed (payout confirmed) or
//! released (payout failed).
//!
//! # Design
//!
//! Accounts live in a `DashMap` of per-account `Mutex`es. The map is only
//! touched briefly to look an account up; every balance change happens while
//! holding that account's mutex, so `reserve`, `commit`, `release` and
//! `transfer` are linearizable per account while unrelated accounts proceed
//! in parallel. Outstanding reservations are stored next to the balances they
//! hold, under the same lock, which makes single-use handles trivial to
//! enforce.
//!
//! # Invariants
//!
//! After every operation, for every account:
//! - `available >= 0` and `reserved >= 0`
//! - `available + reserved == total`
//! - `reserved` equals the sum of the account's outstanding reservations

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use super::journal::{Journal, JournalEntryKind};
use crate::types::{Account, AccountId, ReservationHandle, ReservationId, WithdrawalError};

/// Balances of one account plus the reservations held against them
#[derive(Debug)]
struct AccountEntry {
    account: Account,
    holds: HashMap<ReservationId, Decimal>,
}

type AccountSlot = Arc<Mutex<AccountEntry>>;

fn lock(slot: &AccountSlot) -> MutexGuard<'_, AccountEntry> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe ledger of account balances
///
/// # Thread Safety
///
/// All methods take `&self` and are safe to call from any number of threads.
/// Operations on the same account are serialized by that account's mutex;
/// operations on different accounts never block each other beyond the
/// `DashMap` shard lookup.
#[derive(Debug)]
pub struct Ledger {
    accounts: DashMap<AccountId, AccountSlot>,
    next_reservation: AtomicU64,
    journal: Arc<Journal>,
}

impl Ledger {
    /// Create an empty ledger with its own journal
    pub fn new() -> Self {
        Self::with_journal(Arc::new(Journal::new()))
    }

    /// Create an empty ledger that records movements in `journal`
    pub fn with_journal(journal: Arc<Journal>) -> Self {
        Self {
            accounts: DashMap::new(),
            next_reservation: AtomicU64::new(1),
            journal,
        }
    }

    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    /// Open a new account
    ///
    /// # Arguments
    ///
    /// * `id` - Account identifier; must not be empty
    /// * `balance` - Opening balance; must not be negative
    ///
    /// # Returns
    ///
    /// * `Ok(Account)` - Snapshot of the new account
    /// * `Err(WithdrawalError::InvalidRequest)` - Empty id or negative balance
    /// * `Err(WithdrawalError::AccountAlreadyExists)` - The id is taken
    pub fn open_account(&self, id: &str, balance: Decimal) -> Result<Account, WithdrawalError> {
        if id.trim().is_empty() {
            return Err(WithdrawalError::invalid_request("account id must not be empty"));
        }
        if balance < Decimal::ZERO {
            return Err(WithdrawalError::invalid_request(format!(
                "opening balance {} for account {} is negative",
                balance, id
            )));
        }

        let mut created = false;
        let slot = self
            .accounts
            .entry(id.to_string())
            .or_insert_with(|| {
                created = true;
                self.journal
                    .record(id, JournalEntryKind::Opened, balance, "open");
                Arc::new(Mutex::new(AccountEntry {
                    account: Account::new(id, balance),
                    holds: HashMap::new(),
                }))
            })
            .value()
            .clone();

        if !created {
            return Err(WithdrawalError::account_already_exists(id));
        }

        let entry = lock(&slot);
        info!(account = %id, balance = %balance, "account opened");
        Ok(entry.account.clone())
    }

    /// Check whether an account exists
    pub fn contains(&self, id: &str) -> bool {
        self.accounts.contains_key(id)
    }

    /// Get a snapshot of an account
    pub fn account(&self, id: &str) -> Option<Account> {
        let slot = self.slot(id).ok()?;
        let entry = lock(&slot);
        Some(entry.account.clone())
    }

    /// Get snapshots of all accounts, sorted by id
    ///
    /// Each snapshot is individually consistent; the set as a whole is not a
    /// single atomic cut across accounts.
    pub fn accounts(&self) -> Vec<Account> {
        let slots: Vec<AccountSlot> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut accounts: Vec<Account> = slots
            .iter()
            .map(|slot| lock(slot).account.clone())
            .collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        accounts
    }

    /// Number of reservations currently outstanding on an account
    pub fn outstanding_reservations(&self, id: &str) -> usize {
        self.slot(id).map(|slot| lock(&slot).holds.len()).unwrap_or(0)
    }

    /// Hold `amount` of an account's available funds
    ///
    /// # Arguments
    ///
    /// * `id` - Account to reserve on
    /// * `amount` - Strictly positive amount
    /// * `reference` - Recorded in the journal (normally the withdrawal id)
    ///
    /// # Returns
    ///
    /// * `Ok(ReservationHandle)` - Funds moved from available to reserved
    /// * `Err(WithdrawalError::InsufficientFunds)` - `available < amount`; nothing changed
    /// * `Err(WithdrawalError::AccountNotFound)` - Unknown account
    /// * `Err(WithdrawalError::InvalidRequest)` - Non-positive amount
    pub fn reserve(
        &self,
        id: &str,
        amount: Decimal,
        reference: &str,
    ) -> Result<ReservationHandle, WithdrawalError> {
        if amount <= Decimal::ZERO {
            return Err(WithdrawalError::invalid_request(format!(
                "reservation amount {} must be positive",
                amount
            )));
        }

        self.update(id, |entry| {
            let account = &mut entry.account;
            if account.available < amount {
                return Err(WithdrawalError::insufficient_funds(
                    id,
                    account.available,
                    amount,
                ));
            }

            let available = account
                .available
                .checked_sub(amount)
                .ok_or_else(|| WithdrawalError::arithmetic_overflow("reserve", id))?;
            let reserved = account
                .reserved
                .checked_add(amount)
                .ok_or_else(|| WithdrawalError::arithmetic_overflow("reserve", id))?;

            let reservation = self.next_reservation.fetch_add(1, Ordering::SeqCst);
            account.available = available;
            account.reserved = reserved;
            entry.holds.insert(reservation, amount);

            self.journal
                .record(id, JournalEntryKind::Reserved, amount, reference);
            debug!(account = %id, reservation, amount = %amount, "funds reserved");

            Ok(ReservationHandle {
                id: reservation,
                account: id.to_string(),
                amount,
            })
        })
    }

    /// Turn a reservation into a permanent debit
    ///
    /// Reduces `reserved` and `total` by the held amount.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The reservation was consumed
    /// * `Err(WithdrawalError::InvalidState)` - The handle was already committed or released
    pub fn commit(&self, handle: &ReservationHandle, reference: &str) -> Result<(), WithdrawalError> {
        self.consume(handle, reference, JournalEntryKind::Settled, |account, amount| {
            account.reserved = account
                .reserved
                .checked_sub(amount)
                .ok_or_else(|| WithdrawalError::arithmetic_overflow("commit", &handle.account))?;
            account.total = account
                .total
                .checked_sub(amount)
                .ok_or_else(|| WithdrawalError::arithmetic_overflow("commit", &handle.account))?;
            Ok(())
        })
    }

    /// Return a reservation's funds to the available balance
    ///
    /// `total` is unchanged.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The reservation was consumed
    /// * `Err(WithdrawalError::InvalidState)` - The handle was already committed or released
    pub fn release(&self, handle: &ReservationHandle, reference: &str) -> Result<(), WithdrawalError> {
        self.consume(handle, reference, JournalEntryKind::Released, |account, amount| {
            account.reserved = account
                .reserved
                .checked_sub(amount)
                .ok_or_else(|| WithdrawalError::arithmetic_overflow("release", &handle.account))?;
            account.available = account
                .available
                .checked_add(amount)
                .ok_or_else(|| WithdrawalError::arithmetic_overflow("release", &handle.account))?;
            Ok(())
        })
    }

    /// Move available funds between two accounts
    ///
    /// Both accounts are locked for the duration of the move, always in
    /// ascending id order, so two opposite transfers cannot deadlock.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - `amount` moved from `from.available/total` to `to.available/total`
    /// * `Err(WithdrawalError::InvalidRequest)` - Same account or non-positive amount
    /// * `Err(WithdrawalError::AccountNotFound)` - Either account is unknown
    /// * `Err(WithdrawalError::InsufficientFunds)` - `from` lacks available funds
    pub fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        reference: &str,
    ) -> Result<(), WithdrawalError> {
        if from == to {
            return Err(WithdrawalError::invalid_request(
                "cannot transfer to the same account",
            ));
        }
        if amount <= Decimal::ZERO {
            return Err(WithdrawalError::invalid_request(format!(
                "transfer amount {} must be positive",
                amount
            )));
        }

        let source_slot = self.slot(from)?;
        let target_slot = self.slot(to)?;

        let (mut first, mut second) = if from < to {
            (lock(&source_slot), lock(&target_slot))
        } else {
            let target = lock(&target_slot);
            (lock(&source_slot), target)
        };
        let (source, target) = (&mut first.account, &mut second.account);

        if source.available < amount {
            return Err(WithdrawalError::insufficient_funds(
                from,
                source.available,
                amount,
            ));
        }

        let source_available = source
            .available
            .checked_sub(amount)
            .ok_or_else(|| WithdrawalError::arithmetic_overflow("transfer", from))?;
        let source_total = source
            .total
            .checked_sub(amount)
            .ok_or_else(|| WithdrawalError::arithmetic_overflow("transfer", from))?;
        let target_available = target
            .available
            .checked_add(amount)
            .ok_or_else(|| WithdrawalError::arithmetic_overflow("transfer", to))?;
        let target_total = target
            .total
            .checked_add(amount)
            .ok_or_else(|| WithdrawalError::arithmetic_overflow("transfer", to))?;

        source.available = source_available;
        source.total = source_total;
        target.available = target_available;
        target.total = target_total;

        self.journal
            .record(from, JournalEntryKind::TransferOut, amount, reference);
        self.journal
            .record(to, JournalEntryKind::TransferIn, amount, reference);
        info!(from = %from, to = %to, amount = %amount, reference = %reference, "internal transfer applied");
        Ok(())
    }

    fn slot(&self, id: &str) -> Result<AccountSlot, WithdrawalError> {
        self.accounts
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| WithdrawalError::account_not_found(id))
    }

    /// Run `f` with exclusive access to one account
    fn update<T, F>(&self, id: &str, f: F) -> Result<T, WithdrawalError>
    where
        F: FnOnce(&mut AccountEntry) -> Result<T, WithdrawalError>,
    {
        let slot = self.slot(id)?;
        let mut entry = lock(&slot);
        f(&mut entry)
    }

    /// Remove a hold and apply its balance effect atomically
    ///
    /// `apply` works on a copy of the account so a failure leaves both the
    /// balances and the hold untouched.
    fn consume<F>(
        &self,
        handle: &ReservationHandle,
        reference: &str,
        kind: JournalEntryKind,
        apply: F,
    ) -> Result<(), WithdrawalError>
    where
        F: FnOnce(&mut Account, Decimal) -> Result<(), WithdrawalError>,
    {
        let result = self.update(&handle.account, |entry| {
            let amount = *entry.holds.get(&handle.id).ok_or_else(|| {
                WithdrawalError::invalid_state(format!(
                    "reservation {} on account {} was already committed or released",
                    handle.id, handle.account
                ))
            })?;
            if amount != handle.amount {
                return Err(WithdrawalError::invalid_state(format!(
                    "reservation {} holds {} but handle claims {}",
                    handle.id, amount, handle.amount
                )));
            }

            let mut updated = entry.account.clone();
            apply(&mut updated, amount)?;
            entry.account = updated;
            entry.holds.remove(&handle.id);

            self.journal.record(&handle.account, kind, amount, reference);
            Ok(())
        });

        if let Err(WithdrawalError::InvalidState { message }) = &result {
            error!(account = %handle.account, reservation = handle.id, "{}", message);
        }
        result
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
