use super::config::EngineConfig;
use super::queue::SettlementQueue;
use super::worker::{OutcomeCollector, WorkerPool};
use crate::domain::account::{Account, AccountSnapshot, Amount, Balance};
use crate::domain::ports::{AccountRegistry, AccountRegistryBox};
use crate::domain::transfer::{
    FailureReason, SettlementSummary, TransferOutcome, TransferRequest,
};
use crate::error::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{Instrument, debug, info, info_span, warn};

/// Where a settlement cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    /// Pending requests are being pushed into the queue.
    Filling,
    /// Workers are applying requests.
    Draining,
    /// Outcomes are being collected and state reset.
    Aggregating,
}

/// The main entry point for settling transfers.
///
/// `SettlementEngine` owns the ledger and the list of pending transfers.
/// Each call to [`settle`](Self::settle) runs one cycle: the pending
/// transfers are queued, a pool of workers applies them concurrently, and
/// the per-transfer outcomes are returned.
pub struct SettlementEngine {
    ledger: Arc<dyn AccountRegistry>,
    config: EngineConfig,
    pending: Mutex<Vec<TransferRequest>>,
    cycle: Mutex<()>,
    phase: watch::Sender<CyclePhase>,
    transitions: broadcast::Sender<CyclePhase>,
}

/// Buffered phase transitions per subscriber; one cycle publishes four.
const PHASE_CHANNEL_CAPACITY: usize = 16;

impl SettlementEngine {
    /// Creates a new `SettlementEngine` over `ledger`.
    ///
    /// # Arguments
    ///
    /// * `ledger` - The registry holding every account.
    /// * `config` - Worker count and failure policy, fixed for the engine's lifetime.
    pub fn new(ledger: AccountRegistryBox, config: EngineConfig) -> Self {
        let (phase, _) = watch::channel(CyclePhase::Idle);
        let (transitions, _) = broadcast::channel(PHASE_CHANNEL_CAPACITY);
        Self {
            ledger: Arc::from(ledger),
            config,
            pending: Mutex::new(Vec::new()),
            cycle: Mutex::new(()),
            phase,
            transitions,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Opens an account with `initial_balance` and adds it to the ledger.
    pub async fn register_account(
        &self,
        id: impl Into<String>,
        display_name: impl Into<String>,
        initial_balance: Decimal,
    ) -> Result<()> {
        let account = Account::open(id, display_name, initial_balance)?;
        self.ledger.register(account).await
    }

    /// Queues a transfer for the next settlement cycle.
    ///
    /// The amount is checked here; a non-positive amount is rejected with
    /// `InvalidAmount` and never reaches the queue.
    pub async fn submit_transfer(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: Decimal,
    ) -> Result<()> {
        let amount = Amount::new(amount)?;
        self.pending
            .lock()
            .await
            .push(TransferRequest::new(from, to, amount));
        Ok(())
    }

    pub async fn balance(&self, id: &str) -> Result<Balance> {
        self.ledger.balance_of(id).await
    }

    /// Snapshots of all accounts, sorted by id.
    pub async fn accounts(&self) -> Result<Vec<AccountSnapshot>> {
        self.ledger.snapshots().await
    }

    /// Number of transfers waiting for the next cycle.
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.borrow()
    }

    /// Receives every phase the engine enters from now on, in order.
    pub fn subscribe_phase(&self) -> broadcast::Receiver<CyclePhase> {
        self.transitions.subscribe()
    }

    fn enter(&self, phase: CyclePhase) {
        debug!(?phase, "settlement phase");
        self.phase.send_replace(phase);
        // No subscribers is fine.
        let _ = self.transitions.send(phase);
    }

    /// Runs one settlement cycle over every pending transfer.
    ///
    /// Outcomes are returned in completion order, which is not necessarily
    /// submission order. Concurrent calls are serialized.
    ///
    /// The returned future must be driven to completion: dropping it mid-cycle
    /// loses the batch and leaves the published phase where it stopped.
    pub async fn settle(&self) -> Vec<TransferOutcome> {
        let _cycle = self.cycle.lock().await;
        let batch = std::mem::take(&mut *self.pending.lock().await);
        if batch.is_empty() {
            return Vec::new();
        }

        let span = info_span!("settlement_cycle", transfers = batch.len());
        self.run_cycle(batch).instrument(span).await
    }

    async fn run_cycle(&self, batch: Vec<TransferRequest>) -> Vec<TransferOutcome> {
        self.enter(CyclePhase::Filling);
        let (producer, consumer) = SettlementQueue::bounded(batch.len());
        let collector = OutcomeCollector::new();
        for request in batch {
            if let Err(request) = producer.push(request).await {
                collector
                    .record(TransferOutcome::failed(request, FailureReason::Aborted))
                    .await;
            }
        }
        producer.close();

        self.enter(CyclePhase::Draining);
        let pool = WorkerPool::new(
            self.config.workers,
            Arc::clone(&self.ledger),
            self.config.failure_policy,
        );
        info!(workers = pool.size(), "settlement started");
        pool.drain(consumer.clone(), collector.clone()).await;

        self.enter(CyclePhase::Aggregating);
        let leftover = consumer.clear().await;
        if leftover > 0 {
            warn!(leftover, "requests left in the queue after draining");
        }
        let outcomes = collector.take().await;

        let summary = SettlementSummary::from_outcomes(&outcomes);
        info!(
            applied = summary.applied,
            failed = summary.failed,
            volume = %summary.volume,
            "settlement finished"
        );

        self.enter(CyclePhase::Idle);
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::FailurePolicy;
    use crate::domain::transfer::TransferStatus;
    use crate::error::SettlementError;
    use crate::infrastructure::in_memory::InMemoryLedger;
    use rust_decimal_macros::dec;
    use std::num::NonZeroUsize;

    fn engine() -> SettlementEngine {
        SettlementEngine::new(Box::new(InMemoryLedger::new()), EngineConfig::default())
    }

    #[tokio::test]
    async fn test_two_way_transfers() {
        let engine = engine();
        engine.register_account("1", "Alice", dec!(1000)).await.unwrap();
        engine.register_account("2", "Bob", dec!(500)).await.unwrap();
        engine.submit_transfer("1", "2", dec!(200)).await.unwrap();
        engine.submit_transfer("2", "1", dec!(50)).await.unwrap();

        let outcomes = engine.settle().await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(TransferOutcome::is_applied));
        assert_eq!(engine.balance("1").await.unwrap(), Balance::new(dec!(850)));
        assert_eq!(engine.balance("2").await.unwrap(), Balance::new(dec!(650)));
    }

    #[tokio::test]
    async fn test_submit_rejects_non_positive_amounts() {
        let engine = engine();
        assert!(matches!(
            engine.submit_transfer("a", "b", dec!(-5)).await,
            Err(SettlementError::InvalidAmount(_))
        ));
        assert!(matches!(
            engine.submit_transfer("a", "b", dec!(0)).await,
            Err(SettlementError::InvalidAmount(_))
        ));
        assert_eq!(engine.pending().await, 0);
        assert!(engine.settle().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_and_negative() {
        let engine = engine();
        engine.register_account("a", "Alice", dec!(1)).await.unwrap();
        assert!(matches!(
            engine.register_account("a", "Alice again", dec!(1)).await,
            Err(SettlementError::DuplicateAccount(_))
        ));
        assert!(matches!(
            engine.register_account("b", "Bob", dec!(-1)).await,
            Err(SettlementError::InvalidAmount(_))
        ));
        assert!(matches!(
            engine.balance("b").await,
            Err(SettlementError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_settle_clears_pending_and_returns_to_idle() {
        let engine = engine();
        engine.register_account("a", "Alice", dec!(10)).await.unwrap();
        engine.register_account("b", "Bob", dec!(0)).await.unwrap();
        engine.submit_transfer("a", "b", dec!(4)).await.unwrap();
        assert_eq!(engine.pending().await, 1);

        assert_eq!(engine.settle().await.len(), 1);
        assert_eq!(engine.pending().await, 0);
        assert_eq!(engine.phase(), CyclePhase::Idle);

        // A second cycle sees nothing from the first.
        assert!(engine.settle().await.is_empty());
        assert_eq!(engine.balance("a").await.unwrap(), Balance::new(dec!(6)));
    }

    #[tokio::test]
    async fn test_phase_transitions_are_published() {
        let engine = engine();
        engine.register_account("a", "Alice", dec!(10)).await.unwrap();
        engine.register_account("b", "Bob", dec!(0)).await.unwrap();
        engine.submit_transfer("a", "b", dec!(1)).await.unwrap();

        let mut phases = engine.subscribe_phase();
        engine.settle().await;

        let mut seen = Vec::new();
        while let Ok(phase) = phases.try_recv() {
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                CyclePhase::Filling,
                CyclePhase::Draining,
                CyclePhase::Aggregating,
                CyclePhase::Idle,
            ]
        );
        assert_eq!(engine.phase(), CyclePhase::Idle);
    }

    #[tokio::test]
    async fn test_empty_settle_publishes_no_phases() {
        let engine = engine();
        let mut phases = engine.subscribe_phase();
        assert!(engine.settle().await.is_empty());
        assert!(phases.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fail_fast_policy() {
        let config = EngineConfig::default()
            .with_workers(NonZeroUsize::new(1).unwrap())
            .with_failure_policy(FailurePolicy::FailFast);
        let engine = SettlementEngine::new(Box::new(InMemoryLedger::new()), config);
        engine.register_account("a", "Alice", dec!(10)).await.unwrap();
        engine.register_account("b", "Bob", dec!(0)).await.unwrap();
        engine.submit_transfer("a", "ghost", dec!(1)).await.unwrap();
        engine.submit_transfer("a", "b", dec!(1)).await.unwrap();

        let outcomes = engine.settle().await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[1].status,
            TransferStatus::Failed(FailureReason::Aborted)
        );
        assert_eq!(engine.balance("a").await.unwrap(), Balance::new(dec!(10)));
    }

    #[test]
    fn test_config_is_kept() {
        let config = EngineConfig::default().with_failure_policy(FailurePolicy::FailFast);
        let engine = SettlementEngine::new(Box::new(InMemoryLedger::new()), config);
        assert_eq!(engine.config(), &config);
        assert_eq!(engine.config().workers.get(), 3);
    }

    #[tokio::test]
    async fn test_accounts_snapshot() {
        let engine = engine();
        engine.register_account("b", "Bob", dec!(2)).await.unwrap();
        engine.register_account("a", "Alice", dec!(1)).await.unwrap();

        let accounts = engine.accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id, "a");
        assert_eq!(accounts[1].name, "Bob");
    }
}
