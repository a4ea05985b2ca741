//! Withdrawal-related types for the withdrawal engine
//!
//! This module defines the client-facing request, the system-generated
//! withdrawal id, the internal intent record tracked through the state
//! machine, and the instruction handed to the payout gateway.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::account::{AccountId, ReservationHandle};
use super::error::WithdrawalError;
use super::state::WithdrawalState;

/// Client-supplied idempotency key
///
/// Unique per logical withdrawal attempt.
pub type IdempotencyKey = String;

/// System-generated withdrawal identifier
///
/// ULID based: sortable by creation time and generated without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WithdrawalId(ulid::Ulid);

impl WithdrawalId {
    /// Generate a new unique WithdrawalId
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for WithdrawalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WithdrawalId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Withdrawal request as submitted by a client
///
/// Immutable once accepted. Two requests are considered the same logical
/// withdrawal only when every field matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRequest {
    /// Idempotency key chosen by the client
    pub key: IdempotencyKey,

    /// Account to debit
    pub account: AccountId,

    /// Amount to withdraw; must be strictly positive
    pub amount: Decimal,

    /// Opaque payout destination (bank account, wallet address, ...)
    pub destination: String,
}

impl WithdrawalRequest {
    pub fn new(
        key: impl Into<IdempotencyKey>,
        account: impl Into<AccountId>,
        amount: Decimal,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            account: account.into(),
            amount,
            destination: destination.into(),
        }
    }
}

/// Internal record of an accepted withdrawal
///
/// Created by the processor in `PENDING` and mutated only through
/// [`WithdrawalIntent::advance`] and [`WithdrawalIntent::fail`], both of which
/// go through the state machine's transition function. Intents are never
/// removed; they remain available for status queries.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalIntent {
    pub id: WithdrawalId,
    pub request: WithdrawalRequest,
    pub state: WithdrawalState,

    /// Number of gateway attempts started so far
    pub attempts: u32,

    /// Ledger hold backing this withdrawal
    ///
    /// `Some` from `RESERVED` until the hold is committed or released.
    pub reservation: Option<ReservationHandle>,

    /// Error of the most recent failed gateway attempt
    pub last_error: Option<String>,

    /// Gateway reference of the confirmed payout
    pub gateway_reference: Option<String>,

    /// Why the withdrawal ended in `FAILED`
    pub failure: Option<WithdrawalError>,
}

impl WithdrawalIntent {
    pub fn new(id: WithdrawalId, request: WithdrawalRequest) -> Self {
        Self {
            id,
            request,
            state: WithdrawalState::Pending,
            attempts: 0,
            reservation: None,
            last_error: None,
            gateway_reference: None,
            failure: None,
        }
    }

    /// Move to `next`, returning the previous state
    ///
    /// Leaves the intent untouched when the edge is illegal.
    pub fn advance(&mut self, next: WithdrawalState) -> Result<WithdrawalState, WithdrawalError> {
        let previous = self.state;
        self.state = previous.transition(next)?;
        Ok(previous)
    }

    /// Move to `FAILED` and remember why
    pub fn fail(&mut self, reason: WithdrawalError) -> Result<WithdrawalState, WithdrawalError> {
        let previous = self.advance(WithdrawalState::Failed)?;
        self.failure = Some(reason);
        Ok(previous)
    }
}

/// Result of a `submit` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub withdrawal_id: WithdrawalId,

    /// State observed when `submit` returned
    pub state: WithdrawalState,

    /// `true` when the key had already been accepted and nothing was re-processed
    pub duplicate: bool,
}

/// Instruction sent to the payout gateway for one settlement attempt
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutInstruction {
    /// Stable across attempts so the gateway can deduplicate
    pub withdrawal_id: WithdrawalId,
    pub idempotency_key: IdempotencyKey,
    pub account: AccountId,
    pub amount: Decimal,
    pub destination: String,

    /// 1-based attempt number
    pub attempt: u32,
}

impl PayoutInstruction {
    pub fn for_intent(intent: &WithdrawalIntent) -> Self {
        Self {
            withdrawal_id: intent.id,
            idempotency_key: intent.request.key.clone(),
            account: intent.request.account.clone(),
            amount: intent.request.amount,
            destination: intent.request.destination.clone(),
            attempt: intent.attempts,
        }
    }
}

/// Confirmation returned by the payout gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutReceipt {
    pub reference: String,
}
