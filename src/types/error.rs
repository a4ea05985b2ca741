//! Error types for the withdrawal engine
//!
//! This module defines every error the core can report. Errors are designed
//! to be descriptive enough to surface to a caller unchanged.
//!
//! # Error Categories
//!
//! - **Synchronous rejections**: returned from `submit` / `transfer`
//!   (`InvalidRequest`, `InsufficientFunds`, `AccountNotFound`, ...)
//! - **Settlement failures**: recorded on the intent and observable through
//!   status queries (`PermanentGatewayError`, `RetryExhausted`)
//! - **Invariant violations**: `InvalidState`, always logged, never ignored

use rust_decimal::Decimal;
use thiserror::Error;

use super::state::WithdrawalState;

/// Main error type for the withdrawal engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WithdrawalError {
    /// Malformed input
    ///
    /// Not retried; surfaced to the caller immediately.
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong with the request
        reason: String,
    },

    /// Available balance is lower than the requested amount
    ///
    /// Terminal for the withdrawal; no funds are held.
    #[error("Insufficient funds on account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Gateway reported a failure that may succeed on a later attempt
    #[error("Transient gateway error: {message}")]
    TransientGatewayError { message: String },

    /// Gateway refused the payout for good
    ///
    /// The withdrawal ends `FAILED` and its funds are released.
    #[error("Permanent gateway error: {message}")]
    PermanentGatewayError { message: String },

    /// Every allowed attempt ended in a transient error
    ///
    /// The withdrawal ends `FAILED` and its funds are released.
    #[error("Retry budget exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error reported by the final attempt
        last_error: String,
    },

    /// Internal invariant violation
    ///
    /// Indicates a bug (illegal transition, reused reservation handle, ...).
    /// Fatal to the operation that hit it.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Referenced account does not exist
    #[error("Account {account} not found")]
    AccountNotFound { account: String },

    /// Account id is already taken
    #[error("Account {account} already exists")]
    AccountAlreadyExists { account: String },

    /// No withdrawal with this id was ever accepted
    #[error("Withdrawal {withdrawal_id} not found")]
    WithdrawalNotFound { withdrawal_id: String },

    /// Balance arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow { operation: String, account: String },
}

// Helper functions for creating common errors

impl WithdrawalError {
    /// Create an InvalidRequest error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        WithdrawalError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: &str, available: Decimal, requested: Decimal) -> Self {
        WithdrawalError::InsufficientFunds {
            account: account.to_string(),
            available,
            requested,
        }
    }

    pub fn transient_gateway_error(message: impl Into<String>) -> Self {
        WithdrawalError::TransientGatewayError {
            message: message.into(),
        }
    }

    pub fn permanent_gateway_error(message: impl Into<String>) -> Self {
        WithdrawalError::PermanentGatewayError {
            message: message.into(),
        }
    }

    /// Create a RetryExhausted error
    pub fn retry_exhausted(attempts: u32, last_error: impl Into<String>) -> Self {
        WithdrawalError::RetryExhausted {
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Create an InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        WithdrawalError::InvalidState {
            message: message.into(),
        }
    }

    /// Create an InvalidState error for an illegal state machine edge
    pub fn invalid_transition(from: WithdrawalState, to: WithdrawalState) -> Self {
        WithdrawalError::invalid_state(format!("illegal transition {} -> {}", from, to))
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: &str) -> Self {
        WithdrawalError::AccountNotFound {
            account: account.to_string(),
        }
    }

    /// Create an AccountAlreadyExists error
    pub fn account_already_exists(account: &str) -> Self {
        WithdrawalError::AccountAlreadyExists {
            account: account.to_string(),
        }
    }

    /// Create a WithdrawalNotFound error
    pub fn withdrawal_not_found(withdrawal_id: impl ToString) -> Self {
        WithdrawalError::WithdrawalNotFound {
            withdrawal_id: withdrawal_id.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: &str) -> Self {
        WithdrawalError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }
}
