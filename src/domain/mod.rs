//! Domain types: accounts, transfer requests and their outcomes, and the
//! storage port the ledger is built on.

pub mod account;
pub mod ports;
pub mod transfer;
