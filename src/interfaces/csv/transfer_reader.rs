use crate::error::{Result, SettlementError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a transfers file: `from,to,amount`.
///
/// The amount is kept raw; it is validated when the transfer is submitted.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TransferRecord {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

/// Reads transfer requests from a CSV source.
///
/// Whitespace is trimmed and record lengths are flexible, so hand-written
/// files with padding still parse.
pub struct TransferReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransferReader<R> {
    /// Creates a new `TransferReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes transfers.
    pub fn transfers(self) -> impl Iterator<Item = Result<TransferRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(SettlementError::from))
    }
}
