use super::account::{AccountId, Amount, Balance};
use crate::error::SettlementError;
use serde::Serialize;
use thiserror::Error;

/// An immutable request to move `amount` from one account to another.
///
/// The amount is validated when the request is built, so workers only ever
/// see positive amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    from: AccountId,
    to: AccountId,
    amount: Amount,
}

impl TransferRequest {
    pub fn new(from: impl Into<AccountId>, to: impl Into<AccountId>, amount: Amount) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    pub fn from_id(&self) -> &str {
        &self.from
    }

    pub fn to_id(&self) -> &str {
        &self.to
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// Why a transfer was not applied.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("account `{0}` not found")]
    AccountNotFound(AccountId),
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Balance, available: Balance },
    #[error("aborted after an earlier failure in the batch")]
    Aborted,
    #[error("ledger error: {0}")]
    Ledger(String),
}

impl From<SettlementError> for FailureReason {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::AccountNotFound(id) => FailureReason::AccountNotFound(id),
            SettlementError::InsufficientFunds {
                requested,
                available,
                ..
            } => FailureReason::InsufficientFunds {
                requested,
                available,
            },
            other => FailureReason::Ledger(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Applied,
    Failed(FailureReason),
}

/// The recorded result of one `TransferRequest`, produced exactly once per
/// request in a settlement cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub request: TransferRequest,
    pub status: TransferStatus,
}

impl TransferOutcome {
    pub fn applied(request: TransferRequest) -> Self {
        Self {
            request,
            status: TransferStatus::Applied,
        }
    }

    pub fn failed(request: TransferRequest, reason: FailureReason) -> Self {
        Self {
            request,
            status: TransferStatus::Failed(reason),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.status == TransferStatus::Applied
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            TransferStatus::Applied => None,
            TransferStatus::Failed(reason) => Some(reason),
        }
    }
}

/// Aggregate counts over the outcomes of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SettlementSummary {
    pub applied: usize,
    pub failed: usize,
    /// Sum of the amounts of applied transfers.
    pub volume: Balance,
}

impl SettlementSummary {
    pub fn from_outcomes(outcomes: &[TransferOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                if outcome.is_applied() {
                    summary.applied += 1;
                    summary.volume += Balance::from(outcome.request.amount());
                } else {
                    summary.failed += 1;
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.applied + self.failed
    }
}
