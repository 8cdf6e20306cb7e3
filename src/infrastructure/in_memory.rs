use crate::domain::account::{Account, AccountId};
use crate::domain::ports::AccountRegistry;
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory account registry.
///
/// Uses `Arc<RwLock<HashMap<AccountId, Arc<Account>>>>`: the map lock only
/// serializes registration, while balances sit behind each account's own
/// guard. Settlement therefore takes the map lock in read mode only.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    accounts: Arc<RwLock<HashMap<AccountId, Arc<Account>>>>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRegistry for InMemoryLedger {
    async fn register(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        match accounts.entry(account.id().to_string()) {
            Entry::Occupied(entry) => Err(SettlementError::DuplicateAccount(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(account));
                Ok(())
            }
        }
    }

    async fn lookup(&self, id: &str) -> Result<Arc<Account>> {
        let accounts = self.accounts.read().await;
        accounts
            .get(id)
            .cloned()
            .ok_or_else(|| SettlementError::AccountNotFound(id.to_string()))
    }

    async fn all_accounts(&self) -> Result<Vec<Arc<Account>>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().cloned().collect())
    }
}
