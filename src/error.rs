use crate::domain::account::{AccountId, Balance};
use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum SettlementError {
    #[error("account `{0}` is already registered")]
    #[diagnostic(code(settlement::duplicate_account))]
    DuplicateAccount(AccountId),

    #[error("account `{0}` not found")]
    #[diagnostic(code(settlement::account_not_found))]
    AccountNotFound(AccountId),

    #[error("invalid amount {0}: transfers must move a positive amount")]
    #[diagnostic(
        code(settlement::invalid_amount),
        help("amounts are validated when a transfer is submitted")
    )]
    InvalidAmount(Decimal),

    #[error("insufficient funds in `{account}`: requested {requested}, available {available}")]
    #[diagnostic(code(settlement::insufficient_funds))]
    InsufficientFunds {
        account: AccountId,
        requested: Balance,
        available: Balance,
    },

    #[error("CSV error: {0}")]
    #[diagnostic(code(settlement::csv))]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(settlement::io))]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = SettlementError> = std::result::Result<T, E>;
