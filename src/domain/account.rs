use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use tokio::sync::Mutex;

/// Unique identifier of an account inside a ledger.
pub type AccountId = String;

/// Represents a monetary value held by an account.
///
/// This is a wrapper around `rust_decimal::Decimal` so balances and transfer
/// amounts cannot be mixed up by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a strictly positive monetary amount moved by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(SettlementError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = SettlementError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl std::iter::Sum for Balance {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Balance::ZERO, |acc, b| acc + b)
    }
}

/// Something that holds funds and can be credited or debited.
///
/// Implementations must make every operation atomic with respect to the
/// other operations on the same instance.
#[async_trait]
pub trait BankAccount: Send + Sync {
    /// Credits `amount`. Never fails.
    async fn deposit(&self, amount: Amount);

    /// Debits `amount` if the balance covers it, otherwise leaves the
    /// balance untouched and returns `InsufficientFunds`.
    async fn withdraw(&self, amount: Amount) -> Result<()>;

    /// Current balance.
    async fn balance(&self) -> Balance;
}

/// A balance cell guarded by its own lock.
///
/// Accounts are owned by a ledger and shared by reference; they are never
/// cloned, so every holder sees the same guard.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    display_name: String,
    balance: Mutex<Balance>,
}

impl Account {
    /// Opens an account with a non-negative starting balance.
    pub fn open(
        id: impl Into<AccountId>,
        display_name: impl Into<String>,
        initial_balance: Decimal,
    ) -> Result<Self> {
        if initial_balance < Decimal::ZERO {
            return Err(SettlementError::InvalidAmount(initial_balance));
        }
        Ok(Self {
            id: id.into(),
            display_name: display_name.into(),
            balance: Mutex::new(Balance::new(initial_balance)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Reads the balance under the guard and returns a detached copy.
    pub async fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id.clone(),
            name: self.display_name.clone(),
            balance: self.balance().await,
        }
    }
}

#[async_trait]
impl BankAccount for Account {
    async fn deposit(&self, amount: Amount) {
        let mut balance = self.balance.lock().await;
        *balance += Balance::from(amount);
    }

    async fn withdraw(&self, amount: Amount) -> Result<()> {
        let mut balance = self.balance.lock().await;
        let requested = Balance::from(amount);
        if *balance >= requested {
            *balance -= requested;
            Ok(())
        } else {
            Err(SettlementError::InsufficientFunds {
                account: self.id.clone(),
                requested,
                available: *balance,
            })
        }
    }

    async fn balance(&self) -> Balance {
        *self.balance.lock().await
    }
}

/// Point-in-time view of an account, used for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub name: String,
    pub balance: Balance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10.0));
        let b2 = Balance::new(dec!(5.0));
        assert_eq!(b1 + b2, Balance::new(dec!(15.0)));
        assert_eq!(b1 - b2, Balance::new(dec!(5.0)));
        assert_eq!([b1, b2].into_iter().sum::<Balance>(), Balance::new(dec!(15)));
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(SettlementError::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-5)),
            Err(SettlementError::InvalidAmount(v)) if v == dec!(-5)
        ));
    }

    #[test]
    fn test_open_rejects_negative_balance() {
        assert!(Account::open("a", "Alice", dec!(0)).is_ok());
        assert!(matches!(
            Account::open("a", "Alice", dec!(-0.01)),
            Err(SettlementError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_account_deposit() {
        let account = Account::open("a", "Alice", dec!(10)).unwrap();
        account.deposit(amount(dec!(2.5))).await;
        assert_eq!(account.balance().await, Balance::new(dec!(12.5)));
    }

    #[tokio::test]
    async fn test_account_withdraw_success() {
        let account = Account::open("a", "Alice", dec!(10)).unwrap();
        account.withdraw(amount(dec!(10))).await.unwrap();
        assert_eq!(account.balance().await, Balance::ZERO);
    }

    #[tokio::test]
    async fn test_account_withdraw_insufficient() {
        let account = Account::open("a", "Alice", dec!(10)).unwrap();
        let result = account.withdraw(amount(dec!(20))).await;
        match result {
            Err(SettlementError::InsufficientFunds {
                account: id,
                requested,
                available,
            }) => {
                assert_eq!(id, "a");
                assert_eq!(requested, Balance::new(dec!(20)));
                assert_eq!(available, Balance::new(dec!(10)));
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_eq!(account.balance().await, Balance::new(dec!(10)));
    }

    #[tokio::test]
    async fn test_snapshot() {
        let account = Account::open("a", "Alice", dec!(7)).unwrap();
        let snapshot = account.snapshot().await;
        assert_eq!(snapshot.id, "a");
        assert_eq!(snapshot.name, "Alice");
        assert_eq!(snapshot.balance, Balance::new(dec!(7)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_withdrawals_never_overdraw() {
        let account = Arc::new(Account::open("a", "Alice", dec!(100)).unwrap());

        let mut handles = Vec::new();
        for _ in 0..50 {
            let account = Arc::clone(&account);
            handles.push(tokio::spawn(async move {
                account.withdraw(amount(dec!(3))).await.is_ok()
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        // 100 / 3 = 33 withdrawals fit, the rest must be refused.
        assert_eq!(succeeded, 33);
        assert_eq!(account.balance().await, Balance::new(dec!(1)));
    }
}
