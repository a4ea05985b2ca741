//! Core business logic module
//!
//! This module contains the withdrawal processing components:
//! - `ledger` - Account balances with reserve / commit / release
//! - `journal` - Append-only record of ledger movements
//! - `idempotency` - Idempotency key registry
//! - `status_store` - Withdrawal intents and their lifecycle state
//! - `queue` - Per-account settlement queues and the ready list
//! - `processor` - Submission, status queries, transfers and settlement attempts
//! - `worker_pool` - Tokio workers driving settlement
//! - `traits` - The payout gateway abstraction
//! - `gateway` - Simulated and scripted gateway implementations
//! - `config` - Settlement configuration

pub mod config;
pub mod gateway;
pub mod idempotency;
pub mod journal;
pub mod ledger;
pub mod processor;
pub mod queue;
pub mod status_store;
pub mod traits;
pub mod worker_pool;

pub use config::{RetryPolicy, SettlementConfig};
pub use gateway::{ScriptedGateway, SimulatedGateway};
pub use idempotency::{IdempotencyRecord, IdempotencyRegistry, Registration};
pub use journal::{Journal, JournalEntry, JournalEntryKind};
pub use ledger::Ledger;
pub use processor::{AttemptOutcome, WithdrawalProcessor};
pub use queue::WithdrawalQueue;
pub use status_store::StatusStore;
pub use traits::{GatewayError, PayoutGateway};
pub use worker_pool::SettlementWorkerPool;
