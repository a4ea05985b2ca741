//! Account-related types for the withdrawal engine
//!
//! This module defines the Account snapshot, the reservation handle that ties
//! held funds to a single withdrawal, and the receipt of an internal transfer.

use rust_decimal::Decimal;

/// Account identifier
///
/// Accounts are keyed by an opaque, caller-chosen string.
pub type AccountId = String;

/// Reservation identifier
///
/// Allocated by the ledger from a monotonic counter; never reused.
pub type ReservationId = u64;

/// Account balance state
///
/// Represents a point-in-time snapshot of an account held by the ledger.
/// The ledger keeps `available + reserved == total` after every operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The account identifier
    pub id: AccountId,

    /// Funds that can be reserved by new withdrawals or moved by transfers
    ///
    /// Never negative.
    pub available: Decimal,

    /// Funds held for in-flight withdrawals
    ///
    /// The sum of all outstanding reservations on this account.
    pub reserved: Decimal,

    /// The true balance of the account
    ///
    /// Only reduced by committed withdrawals and outgoing transfers.
    pub total: Decimal,
}

impl Account {
    /// Create a new account with the given opening balance
    ///
    /// # Arguments
    ///
    /// * `id` - The account identifier
    /// * `balance` - Opening balance, credited to both `available` and `total`
    pub fn new(id: impl Into<AccountId>, balance: Decimal) -> Self {
        Account {
            id: id.into(),
            available: balance,
            reserved: Decimal::ZERO,
            total: balance,
        }
    }

    /// Check the balance invariants of this snapshot
    ///
    /// Returns `true` when no balance is negative and
    /// `available + reserved` does not exceed `total`.
    pub fn is_consistent(&self) -> bool {
        self.available >= Decimal::ZERO
            && self.reserved >= Decimal::ZERO
            && self.available + self.reserved <= self.total
    }
}

/// Handle to funds held on an account for exactly one withdrawal
///
/// Handles are single-use: the ledger accepts one `commit` or one `release`
/// per handle and rejects any further use with `InvalidState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationHandle {
    /// Ledger-assigned reservation id
    pub id: ReservationId,

    /// Account the funds are held on
    pub account: AccountId,

    /// Amount held
    pub amount: Decimal,
}

/// Result of a completed internal transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    /// Unique reference recorded in both accounts' journals
    pub reference: String,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
}
