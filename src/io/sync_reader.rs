//! Synchronous reader for the accounts CSV file
//!
//! The accounts file is small and read once before any withdrawal is
//! submitted, so it is parsed with the blocking `csv` crate and exposed as an
//! iterator.
//!
//! ```no_run
//! use withdrawal_engine::io::sync_reader::AccountReader;
//! use std::path::Path;
//!
//! let reader = AccountReader::new(Path::new("accounts.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok((account, balance)) => println!("{} opens with {}", account, balance),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found) are returned from `new()`
//! - Individual row errors are yielded as `Err` items carrying the line number

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;

use crate::io::csv_format::{convert_account_record, AccountCsvRecord};
use crate::types::AccountId;

/// Streaming reader over `account,balance` rows
#[derive(Debug)]
pub struct AccountReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl AccountReader {
    /// Open an accounts CSV file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(AccountReader)` if the file opened successfully
    /// * `Err(String)` if the file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for AccountReader {
    type Item = Result<(AccountId, Decimal), String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<AccountCsvRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;

        Some(match row {
            Ok(record) => {
                convert_account_record(record).map_err(|e| format!("Line {}: {}", self.line_num, e))
            }
            Err(e) => Err(format!("Line {}: CSV parse error: {}", self.line_num, e)),
        })
    }
}
