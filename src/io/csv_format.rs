//! CSV format handling for pipeline input and output
//!
//! This module centralizes all CSV format concerns, providing:
//! - Record structures for the accounts and withdrawals input files
//! - Conversion from CSV records to domain types
//! - Account balance output and the withdrawal report
//!
//! All functions are pure (no file I/O) for easy testing.

use std::io::Write;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{Account, AccountId, WithdrawalIntent, WithdrawalRequest};

/// Row of the accounts input file: `account,balance`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    pub account: String,
    pub balance: Option<String>,
}

/// Row of the withdrawals input file: `key,account,amount,destination`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WithdrawalCsvRecord {
    pub key: String,
    pub account: String,
    pub amount: Option<String>,
    pub destination: String,
}

fn parse_amount(raw: Option<String>, context: &str) -> Result<Decimal, String> {
    match raw {
        Some(amount) if !amount.trim().is_empty() => Decimal::from_str(amount.trim())
            .map_err(|_| format!("Invalid amount '{}' for {}", amount, context)),
        _ => Err(format!("{} requires an amount", context)),
    }
}

/// Convert an AccountCsvRecord to an account id and opening balance
///
/// # Returns
///
/// * `Ok((AccountId, Decimal))` - Parsed row
/// * `Err(String)` - Missing or unparseable balance
pub fn convert_account_record(record: AccountCsvRecord) -> Result<(AccountId, Decimal), String> {
    let context = format!("account {}", record.account);
    let balance = parse_amount(record.balance, &context)?;
    Ok((record.account, balance))
}

/// Convert a WithdrawalCsvRecord to a WithdrawalRequest
///
/// Only the amount is parsed here. Business validation (positive amount,
/// known account, non-empty key and destination) belongs to the processor.
///
/// # Returns
///
/// * `Ok(WithdrawalRequest)` - Parsed row
/// * `Err(String)` - Missing or unparseable amount
pub fn convert_withdrawal_record(record: WithdrawalCsvRecord) -> Result<WithdrawalRequest, String> {
    let context = format!("withdrawal {}", record.key);
    let amount = parse_amount(record.amount, &context)?;
    Ok(WithdrawalRequest::new(
        record.key,
        record.account,
        amount,
        record.destination,
    ))
}

/// Write account states to CSV format
///
/// Writes accounts with columns: account, available, reserved, total.
/// Accounts are sorted by id for deterministic output; amounts use four
/// decimal places.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["account", "available", "reserved", "total"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by(|a, b| a.id.cmp(&b.id));

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.id.clone(),
                format!("{:.4}", account.available),
                format!("{:.4}", account.reserved),
                format!("{:.4}", account.total),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write the per-withdrawal report
///
/// Columns: key, withdrawal_id, account, amount, state, attempts, reason.
/// Rows are sorted by idempotency key; `reason` is empty unless the
/// withdrawal failed.
pub fn write_withdrawal_report(
    intents: &[WithdrawalIntent],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record([
            "key",
            "withdrawal_id",
            "account",
            "amount",
            "state",
            "attempts",
            "reason",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&WithdrawalIntent> = intents.iter().collect();
    sorted.sort_by(|a, b| a.request.key.cmp(&b.request.key));

    for intent in sorted {
        let reason = intent
            .failure
            .as_ref()
            .map(|failure| failure.to_string())
            .unwrap_or_default();
        writer
            .write_record(&[
                intent.request.key.clone(),
                intent.id.to_string(),
                intent.request.account.clone(),
                format!("{:.4}", intent.request.amount),
                intent.state.to_string(),
                intent.attempts.to_string(),
                reason,
            ])
            .map_err(|e| format!("Failed to write report record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush report: {}", e))?;

    Ok(())
}
