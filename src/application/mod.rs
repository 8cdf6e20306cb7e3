//! Application layer containing the settlement orchestration.
//!
//! This module defines the `SettlementEngine`, which acts as the primary entry
//! point for registering accounts, submitting transfers and settling them. A
//! cycle hands requests to a pool of `tokio` workers through a bounded
//! channel and waits on a `JoinSet` until every worker has drained it.

pub mod config;
pub mod engine;
pub mod queue;
pub mod worker;
