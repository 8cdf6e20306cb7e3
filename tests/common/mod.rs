#![allow(dead_code)]

use rust_decimal::Decimal;
use settlement_engine::application::config::EngineConfig;
use settlement_engine::application::engine::SettlementEngine;
use settlement_engine::domain::account::Balance;
use settlement_engine::infrastructure::in_memory::InMemoryLedger;
use std::num::NonZeroUsize;

pub fn engine_with_workers(workers: usize) -> SettlementEngine {
    engine_with_config(EngineConfig::default().with_workers(NonZeroUsize::new(workers).unwrap()))
}

pub fn engine_with_config(config: EngineConfig) -> SettlementEngine {
    SettlementEngine::new(Box::new(InMemoryLedger::new()), config)
}

pub async fn register_all(engine: &SettlementEngine, accounts: &[(&str, Decimal)]) {
    for (id, balance) in accounts {
        engine
            .register_account(*id, format!("holder of {id}"), *balance)
            .await
            .expect("Failed to register account");
    }
}

pub async fn total_balance(engine: &SettlementEngine) -> Balance {
    engine
        .accounts()
        .await
        .expect("Failed to list accounts")
        .into_iter()
        .map(|a| a.balance)
        .sum()
}
