//! Shared work queue with bounded-wait dequeue

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

/// Multi-producer multi-consumer queue shared by a worker pool.
///
/// The queue owns its sender, so it never reports "closed": consumers stop
/// when [`WorkQueue::recv_timeout`] waits longer than its timeout.
#[derive(Debug)]
pub struct WorkQueue<T> {
    sender: mpsc::UnboundedSender<T>,
    receiver: Mutex<mpsc::UnboundedReceiver<T>>,
    pending: AtomicUsize,
}

impl<T: Send> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, item: T) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(item).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Wait up to `wait` for an item. `None` means the queue stayed empty
    /// for the whole wait.
    pub async fn recv_timeout(&self, wait: Duration) -> Option<T> {
        let received = tokio::time::timeout(wait, async {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await
        })
        .await
        .ok()
        .flatten();

        if received.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        received
    }

    /// Approximate number of queued items
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Extend<T> for WorkQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}
