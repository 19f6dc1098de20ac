//! A bounded FIFO, the sole channel from the retrievers to the caller
//! (§4.5). Backed by a [`tokio::sync::mpsc`] bounded channel, whose `send`
//! already blocks on a full queue — that is the entire backpressure
//! mechanism (P3). A side-channel atomic length is kept for the
//! non-blocking size check, since `mpsc::Receiver` does not expose one.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// The producer half, cloned once per retriever (multi-producer).
#[derive(Clone)]
pub struct QueueProducer<T> {
    tx: mpsc::Sender<T>,
    len: Arc<AtomicUsize>,
}

/// Error returned when the consumer half has been dropped.
#[derive(Debug, thiserror::Error)]
#[error("queue consumer has been dropped")]
pub struct QueueClosed;

impl<T> QueueProducer<T> {
    /// Blocking put: awaits if the queue is at capacity (backpressure, P3).
    pub async fn push(&self, item: T) -> Result<(), QueueClosed> {
        self.tx.send(item).await.map_err(|_| QueueClosed)?;
        self.len.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// The consumer half. There is exactly one per [`bounded`] call (single
/// consumer).
pub struct QueueConsumer<T> {
    rx: mpsc::Receiver<T>,
    len: Arc<AtomicUsize>,
}

impl<T> QueueConsumer<T> {
    /// Non-blocking size check.
    pub fn size(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    /// A cloneable handle to the length counter, for the metrics pump.
    pub fn len_handle(&self) -> Arc<AtomicUsize> {
        self.len.clone()
    }

    /// Non-blocking pop: returns `None` immediately if nothing is queued.
    pub fn try_pop(&mut self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => {
                self.len.fetch_sub(1, Ordering::SeqCst);
                Some(item)
            }
            Err(_) => None,
        }
    }

    /// Blocking get with a bound on how long to wait: `Ok(None)` on the
    /// timeout elapsing with nothing arriving, `Ok(Some(item))` otherwise,
    /// `Err(())` if all producers were dropped.
    pub async fn pop_timeout(&mut self, wait: Duration) -> Option<T> {
        match timeout(wait, self.rx.recv()).await {
            Ok(Some(item)) => {
                self.len.fetch_sub(1, Ordering::SeqCst);
                Some(item)
            }
            _ => None,
        }
    }
}

/// Create a bounded queue of the given capacity (`queue_size`, default 101).
pub fn bounded<T>(capacity: usize) -> (QueueProducer<T>, QueueConsumer<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    let len = Arc::new(AtomicUsize::new(0));
    (
        QueueProducer {
            tx,
            len: len.clone(),
        },
        QueueConsumer { rx, len },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn push_then_drain_in_order() {
        let (tx, mut rx) = bounded::<u32>(4);
        for i in 0..3 {
            tx.push(i).await.unwrap();
        }
        assert_eq!(rx.size(), 3);
        assert_eq!(rx.try_pop(), Some(0));
        assert_eq!(rx.try_pop(), Some(1));
        assert_eq!(rx.try_pop(), Some(2));
        assert_eq!(rx.try_pop(), None);
        assert_eq!(rx.size(), 0);
    }

    #[tokio::test]
    async fn full_queue_blocks_the_producer() {
        let (tx, mut rx) = bounded::<u32>(1);
        tx.push(1).await.unwrap();

        let tx2 = tx.clone();
        let blocked = tokio::spawn(async move { tx2.push(2).await });

        // Give the spawned push a chance to run; it must not complete
        // while the queue is full and nobody drains it (P3).
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        assert_eq!(rx.try_pop(), Some(1));
        blocked.await.unwrap().unwrap();
        assert_eq!(rx.try_pop(), Some(2));
    }

    #[tokio::test]
    async fn pop_timeout_returns_none_when_idle() {
        let (_tx, mut rx) = bounded::<u32>(1);
        let item = rx.pop_timeout(Duration::from_millis(20)).await;
        assert_eq!(item, None);
    }
}
