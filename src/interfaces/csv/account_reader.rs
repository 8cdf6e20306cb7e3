use crate::error::{Result, SettlementError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of an accounts file: `id,name,balance`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct AccountRecord {
    pub id: String,
    pub name: String,
    pub balance: Decimal,
}

/// Reads opening balances from a CSV source.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn accounts(self) -> impl Iterator<Item = Result<AccountRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(SettlementError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "id, name, balance\n1, Alice, 1000\n2, Bob, 500.25";
        let results: Vec<Result<AccountRecord>> = AccountReader::new(data.as_bytes())
            .accounts()
            .collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.id, "1");
        assert_eq!(first.name, "Alice");
        assert_eq!(first.balance, dec!(1000));
        assert_eq!(results[1].as_ref().unwrap().balance, dec!(500.25));
    }

    #[test]
    fn test_reader_malformed_balance() {
        let data = "id, name, balance\n1, Alice, lots";
        let results: Vec<Result<AccountRecord>> = AccountReader::new(data.as_bytes())
            .accounts()
            .collect();

        assert!(matches!(results[0], Err(SettlementError::Csv(_))));
    }
}
