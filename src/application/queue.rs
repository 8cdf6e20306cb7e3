use crate::domain::transfer::TransferRequest;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Bounded multi-producer/multi-consumer handoff of transfer requests.
///
/// Built on a `tokio` mpsc channel whose receiver is shared behind a mutex,
/// so any number of workers can pull from it. Intake is closed by dropping
/// the producer; once the buffer is drained, `recv` returns `None`.
pub struct SettlementQueue;

impl SettlementQueue {
    /// Creates a queue holding at most `capacity` requests. A capacity of
    /// zero is rounded up to one.
    pub fn bounded(capacity: usize) -> (QueueProducer, QueueConsumer) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            QueueProducer { sender },
            QueueConsumer {
                receiver: Arc::new(Mutex::new(receiver)),
            },
        )
    }
}

/// Intake side of a `SettlementQueue`.
pub struct QueueProducer {
    sender: mpsc::Sender<TransferRequest>,
}

impl QueueProducer {
    /// Enqueues `request`, waiting for room if the queue is full.
    ///
    /// Hands the request back if every consumer is gone.
    pub async fn push(&self, request: TransferRequest) -> Result<(), TransferRequest> {
        self.sender.send(request).await.map_err(|err| err.0)
    }

    /// Signals that no more requests will be pushed.
    pub fn close(self) {
        drop(self.sender);
    }
}

/// Drain side of a `SettlementQueue`. Cloning shares the same queue.
#[derive(Clone)]
pub struct QueueConsumer {
    receiver: Arc<Mutex<mpsc::Receiver<TransferRequest>>>,
}

impl QueueConsumer {
    /// Next request, or `None` once intake is closed and the queue is empty.
    pub async fn recv(&self) -> Option<TransferRequest> {
        self.receiver.lock().await.recv().await
    }

    /// Discards anything left in the queue and returns how many were dropped.
    pub async fn clear(&self) -> usize {
        let mut receiver = self.receiver.lock().await;
        let mut dropped = 0;
        while receiver.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
