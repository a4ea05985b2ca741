//! Asynchronous reader for the withdrawals CSV file
//!
//! Withdrawal requests are streamed in batches so that submission can start
//! before the whole file is read and memory stays bounded.
//!
//! ```text
//! tokio::fs::File ─► compat ─► csv-async ─► WithdrawalReader ─► Vec<WithdrawalRequest>
//!                                                 │
//!                                          csv_format module
//! ```

use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

use crate::io::csv_format::{convert_withdrawal_record, WithdrawalCsvRecord};
use crate::types::WithdrawalRequest;

/// Batched reader over `key,account,amount,destination` rows
pub struct WithdrawalReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> WithdrawalReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
        }
    }

    /// Read up to `batch_size` withdrawal requests
    ///
    /// Rows that cannot be parsed are logged and skipped.
    ///
    /// # Returns
    ///
    /// The parsed requests, in file order. An empty vector means the end of
    /// the file was reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<WithdrawalRequest> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<WithdrawalCsvRecord>();

        while batch.len() < batch_size {
            let Some(row) = records.next().await else {
                break;
            };
            self.line_num += 1;

            match row {
                Ok(record) => match convert_withdrawal_record(record) {
                    Ok(request) => batch.push(request),
                    Err(e) => warn!(line = self.line_num, "Record conversion error: {}", e),
                },
                Err(e) => warn!(line = self.line_num, "CSV parse error: {}", e),
            }
        }

        batch
    }
}
