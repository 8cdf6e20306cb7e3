use super::config::FailurePolicy;
use super::queue::QueueConsumer;
use crate::domain::account::BankAccount;
use crate::domain::ports::AccountRegistry;
use crate::domain::transfer::{FailureReason, TransferOutcome, TransferRequest};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info_span, warn};

/// Shared, synchronized sink for the outcomes workers produce.
#[derive(Clone, Default)]
pub struct OutcomeCollector {
    outcomes: Arc<Mutex<Vec<TransferOutcome>>>,
}

impl OutcomeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, outcome: TransferOutcome) {
        self.outcomes.lock().await.push(outcome);
    }

    /// Removes and returns everything recorded so far, in completion order.
    pub async fn take(&self) -> Vec<TransferOutcome> {
        std::mem::take(&mut *self.outcomes.lock().await)
    }
}

/// A fixed number of workers draining a settlement queue against a ledger.
pub struct WorkerPool {
    size: NonZeroUsize,
    ledger: Arc<dyn AccountRegistry>,
    policy: FailurePolicy,
}

impl WorkerPool {
    pub fn new(size: NonZeroUsize, ledger: Arc<dyn AccountRegistry>, policy: FailurePolicy) -> Self {
        Self {
            size,
            ledger,
            policy,
        }
    }

    pub fn size(&self) -> usize {
        self.size.get()
    }

    /// Starts every worker on `queue` and waits until all of them have seen
    /// end-of-input.
    pub async fn drain(&self, queue: QueueConsumer, collector: OutcomeCollector) {
        let aborted = Arc::new(AtomicBool::new(false));
        let mut workers = JoinSet::new();

        for id in 0..self.size.get() {
            let worker = Worker {
                queue: queue.clone(),
                ledger: Arc::clone(&self.ledger),
                collector: collector.clone(),
                policy: self.policy,
                aborted: Arc::clone(&aborted),
            };
            workers.spawn(worker.run().instrument(info_span!("worker", worker = id)));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "settlement worker terminated abnormally");
            }
        }
    }
}

struct Worker {
    queue: QueueConsumer,
    ledger: Arc<dyn AccountRegistry>,
    collector: OutcomeCollector,
    policy: FailurePolicy,
    aborted: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self) {
        while let Some(request) = self.queue.recv().await {
            let outcome = if self.aborted.load(Ordering::Acquire) {
                TransferOutcome::failed(request, FailureReason::Aborted)
            } else {
                self.apply(request).await
            };

            if let Some(reason) = outcome.failure() {
                warn!(
                    "transfer {} -> {} of {} failed: {}",
                    outcome.request.from_id(),
                    outcome.request.to_id(),
                    outcome.request.amount(),
                    reason
                );
                if self.policy == FailurePolicy::FailFast {
                    self.aborted.store(true, Ordering::Release);
                }
            } else {
                debug!(
                    from = outcome.request.from_id(),
                    to = outcome.request.to_id(),
                    amount = %outcome.request.amount(),
                    "transfer applied"
                );
            }

            self.collector.record(outcome).await;
        }
    }

    /// Withdraws from the sender, then deposits to the recipient. Only one
    /// account guard is held at any moment.
    async fn apply(&self, request: TransferRequest) -> TransferOutcome {
        let from = match self.ledger.lookup(request.from_id()).await {
            Ok(account) => account,
            Err(err) => return TransferOutcome::failed(request, err.into()),
        };
        let to = match self.ledger.lookup(request.to_id()).await {
            Ok(account) => account,
            Err(err) => return TransferOutcome::failed(request, err.into()),
        };

        if let Err(err) = from.withdraw(request.amount()).await {
            return TransferOutcome::failed(request, err.into());
        }
        to.deposit(request.amount()).await;

        TransferOutcome::applied(request)
    }
}
