//! Withdrawal Engine Library
//!
//! # Overview
//!
//! Accepts withdrawal requests, reserves funds immediately and settles them
//! asynchronously against an external payout gateway. Duplicate or concurrent
//! submissions of the same idempotency key never reserve funds twice.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, WithdrawalRequest, WithdrawalIntent, errors)
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Balances with reserve / commit / release
//!   - [`core::idempotency`] - Idempotency key registry
//!   - [`core::status_store`] - Withdrawal intents and lifecycle state
//!   - [`core::queue`] - Per-account settlement queues
//!   - [`core::worker_pool`] - Settlement workers with retry and backoff
//!   - [`core::processor`] - Public entry point
//! - [`io`] - CSV input and output
//! - [`pipeline`] - File driven runs of the engine
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - Tracing subscriber setup
//!
//! # Withdrawal Lifecycle
//!
//! ```text
//! PENDING -> RESERVED -> QUEUED -> SETTLING -> SETTLED
//! PENDING -> FAILED                 (insufficient funds)
//! SETTLING -> QUEUED                (transient gateway error, retried)
//! SETTLING -> FAILED                (permanent error or retries exhausted)
//! ```
//!
//! # Account Balances
//!
//! Each account maintains:
//! - `available`: Funds that new withdrawals and transfers can use
//! - `reserved`: Funds held for in-flight withdrawals
//! - `total`: `available + reserved`

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod types;

pub use core::{
    GatewayError, Ledger, PayoutGateway, RetryPolicy, SettlementConfig, SettlementWorkerPool,
    WithdrawalProcessor,
};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, ReservationHandle, SubmitOutcome, TransferReceipt, WithdrawalError,
    WithdrawalId, WithdrawalIntent, WithdrawalRequest, WithdrawalState,
};
