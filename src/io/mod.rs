//! I/O module
//!
//! Handles CSV parsing and output for the pipeline.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, output serialization)
//! - `sync_reader` - Synchronous accounts reader with iterator interface
//! - `async_reader` - Asynchronous withdrawals reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::WithdrawalReader;
pub use csv_format::{
    convert_account_record, convert_withdrawal_record, write_accounts_csv,
    write_withdrawal_report, AccountCsvRecord, WithdrawalCsvRecord,
};
pub use sync_reader::AccountReader;
