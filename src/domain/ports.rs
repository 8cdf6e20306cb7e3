use super::account::{Account, AccountSnapshot, Balance, BankAccount};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Thread-safe registry of accounts backing a ledger.
///
/// Accounts are handed out as shared references; the registry keeps
/// ownership and never removes an id once registered.
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// Inserts `account`, failing with `DuplicateAccount` if its id is taken.
    async fn register(&self, account: Account) -> Result<()>;

    /// Fails with `AccountNotFound` if `id` was never registered.
    async fn lookup(&self, id: &str) -> Result<Arc<Account>>;

    async fn all_accounts(&self) -> Result<Vec<Arc<Account>>>;

    async fn balance_of(&self, id: &str) -> Result<Balance> {
        let account = self.lookup(id).await?;
        Ok(account.balance().await)
    }

    /// Snapshots of every account, sorted by id.
    async fn snapshots(&self) -> Result<Vec<AccountSnapshot>> {
        let mut snapshots = Vec::new();
        for account in self.all_accounts().await? {
            snapshots.push(account.snapshot().await);
        }
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(snapshots)
    }
}

pub type AccountRegistryBox = Box<dyn AccountRegistry>;
