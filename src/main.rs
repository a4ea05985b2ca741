//! Withdrawal Engine CLI
//!
//! Loads account balances, submits every withdrawal request from a CSV file,
//! settles them against a simulated payout gateway and prints the final
//! balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- accounts.csv withdrawals.csv > balances.csv
//! cargo run -- --workers 8 --max-attempts 3 accounts.csv withdrawals.csv > balances.csv
//! cargo run -- --report report.csv --log-level info accounts.csv withdrawals.csv
//! ```
//!
//! Destinations starting with `reject:` are refused by the simulated gateway;
//! destinations starting with `flaky:` fail once before succeeding.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, output not writable, etc.)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use std::sync::Arc;

use withdrawal_engine::cli;
use withdrawal_engine::core::SimulatedGateway;
use withdrawal_engine::logging;
use withdrawal_engine::pipeline::Pipeline;

fn main() {
    let args = cli::parse_args();
    logging::init_logging(&args.log_level);

    let mut pipeline = Pipeline::new(
        args.to_settlement_config(),
        Arc::new(SimulatedGateway::new(args.gateway_latency())),
    );
    if let Some(batch_size) = args.batch_size {
        pipeline = pipeline.with_batch_size(batch_size);
    }

    let mut report = match args.report.as_ref().map(File::create).transpose() {
        Ok(file) => file.map(BufWriter::new),
        Err(e) => {
            eprintln!("Error: Failed to create report file: {}", e);
            process::exit(1);
        }
    };

    let mut output = std::io::stdout();
    let result = pipeline.process(
        &args.accounts_file,
        &args.withdrawals_file,
        &mut output,
        report.as_mut().map(|writer| writer as &mut dyn Write),
    );

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Some(mut writer) = report {
        if let Err(e) = writer.flush() {
            eprintln!("Error: Failed to write report: {}", e);
            process::exit(1);
        }
    }
}
