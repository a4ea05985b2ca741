//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account snapshots, reservation handles and transfer receipts
//! - `withdrawal`: Requests, intents and gateway instructions
//! - `state`: The withdrawal lifecycle state machine
//! - `error`: Error types for the withdrawal engine

pub mod account;
pub mod error;
pub mod state;
pub mod withdrawal;

pub use account::{Account, AccountId, ReservationHandle, ReservationId, TransferReceipt};
pub use error::WithdrawalError;
pub use state::WithdrawalState;
pub use withdrawal::{
    IdempotencyKey, PayoutInstruction, PayoutReceipt, SubmitOutcome, WithdrawalId,
    WithdrawalIntent, WithdrawalRequest,
};
