//! Append-only record of ledger movements
//!
//! Every balance change the ledger makes is appended here, per account, with a
//! global sequence number so entries from different accounts can be ordered.
//! The journal is written from inside the ledger's per-account lock, so the
//! entries of one account appear in the order the changes were applied.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::types::AccountId;

/// Kind of ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalEntryKind {
    /// Account created with an opening balance
    Opened,
    /// Funds moved from available to reserved
    Reserved,
    /// Reserved funds returned to available
    Released,
    /// Reserved funds debited for good
    Settled,
    /// Incoming internal transfer
    TransferIn,
    /// Outgoing internal transfer
    TransferOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Global, strictly increasing sequence number
    pub sequence: u64,
    pub kind: JournalEntryKind,
    pub amount: Decimal,

    /// Withdrawal id or transfer reference that caused the movement
    pub reference: String,
}

/// Thread-safe, per-account transaction journal
///
/// Uses `DashMap` so appends for different accounts do not contend.
#[derive(Debug, Default)]
pub struct Journal {
    entries: DashMap<AccountId, Vec<JournalEntry>>,
    sequence: AtomicU64,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to an account's journal
    ///
    /// # Returns
    ///
    /// The sequence number assigned to the entry.
    pub fn record(
        &self,
        account: &str,
        kind: JournalEntryKind,
        amount: Decimal,
        reference: impl Into<String>,
    ) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries
            .entry(account.to_string())
            .or_default()
            .push(JournalEntry {
                sequence,
                kind,
                amount,
                reference: reference.into(),
            });
        sequence
    }

    /// Get a copy of an account's entries, oldest first
    pub fn entries(&self, account: &str) -> Vec<JournalEntry> {
        self.entries
            .get(account)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    /// Get the entries of an account that mention `reference`
    pub fn entries_for(&self, account: &str, reference: &str) -> Vec<JournalEntry> {
        self.entries(account)
            .into_iter()
            .filter(|entry| entry.reference == reference)
            .collect()
    }

    /// Total number of entries across all accounts
    pub fn len(&self) -> usize {
        self.entries.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
