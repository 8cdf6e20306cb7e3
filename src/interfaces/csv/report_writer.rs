use crate::domain::account::AccountSnapshot;
use crate::domain::transfer::{TransferOutcome, TransferStatus};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Writes final account balances as `id,name,balance` rows.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: &[AccountSnapshot]) -> Result<()> {
        if accounts.is_empty() {
            self.writer.write_record(["id", "name", "balance"])?;
        }
        for account in accounts {
            self.writer.serialize(account)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct OutcomeRecord<'a> {
    from: &'a str,
    to: &'a str,
    amount: Decimal,
    status: &'static str,
    reason: String,
}

impl<'a> From<&'a TransferOutcome> for OutcomeRecord<'a> {
    fn from(outcome: &'a TransferOutcome) -> Self {
        let (status, reason) = match &outcome.status {
            TransferStatus::Applied => ("applied", String::new()),
            TransferStatus::Failed(reason) => ("failed", reason.to_string()),
        };
        Self {
            from: outcome.request.from_id(),
            to: outcome.request.to_id(),
            amount: outcome.request.amount().value(),
            status,
            reason,
        }
    }
}

/// Writes per-transfer outcomes as `from,to,amount,status,reason` rows.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_outcomes(&mut self, outcomes: &[TransferOutcome]) -> Result<()> {
        if outcomes.is_empty() {
            self.writer
                .write_record(["from", "to", "amount", "status", "reason"])?;
        }
        for outcome in outcomes {
            self.writer.serialize(OutcomeRecord::from(outcome))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
