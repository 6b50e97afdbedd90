//! In-process queue used by the worker tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::errors::QueueError;
use crate::queue::{Delivery, JobQueue, QueueConsumer};
use crate::worker::StatsTracker;

#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Inner>,
}

struct Inner {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    wait: Duration,
    next_tag: AtomicU64,
    acked: AtomicUsize,
    connections: AtomicUsize,
    max_outstanding: AtomicUsize,
    refuse_connections: AtomicBool,
    failing_receives: AtomicUsize,
    closed: AtomicUsize,
    observer: std::sync::Mutex<Option<Arc<StatsTracker>>>,
    acks_before_outcome: AtomicUsize,
}

impl MemoryQueue {
    pub fn new(wait: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                tx,
                rx: Mutex::new(rx),
                wait,
                next_tag: AtomicU64::new(0),
                acked: AtomicUsize::new(0),
                connections: AtomicUsize::new(0),
                max_outstanding: AtomicUsize::new(0),
                refuse_connections: AtomicBool::new(false),
                failing_receives: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                observer: std::sync::Mutex::new(None),
                acks_before_outcome: AtomicUsize::new(0),
            }),
        }
    }

    pub fn push(&self, body: impl Into<Vec<u8>>) {
        // The queue owns the receiver, so the channel stays open.
        let _ = self.inner.tx.send(body.into());
    }

    pub fn refuse_connections(&self) {
        self.inner.refuse_connections.store(true, Ordering::SeqCst);
    }

    /// The next `count` receives fail as if the broker connection dropped.
    pub fn fail_next_receives(&self, count: usize) {
        self.inner.failing_receives.store(count, Ordering::SeqCst);
    }

    /// Checks every ack against `stats`: a job must be counted as completed or
    /// failed before its message is acknowledged.
    pub fn observe(&self, stats: Arc<StatsTracker>) {
        if let Ok(mut observer) = self.inner.observer.lock() {
            *observer = Some(stats);
        }
    }

    pub fn pending_failures(&self) -> usize {
        self.inner.failing_receives.load(Ordering::SeqCst)
    }

    pub fn acks_before_outcome(&self) -> usize {
        self.inner.acks_before_outcome.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn acked(&self) -> usize {
        self.inner.acked.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.inner.connections.load(Ordering::SeqCst)
    }

    /// Highest number of unacknowledged deliveries any single consumer held.
    pub fn max_outstanding(&self) -> usize {
        self.inner.max_outstanding.load(Ordering::SeqCst)
    }

    /// Polls until `count` messages were acknowledged or `deadline` passes.
    pub async fn wait_for_acks(&self, count: usize, deadline: Duration) -> bool {
        let started = tokio::time::Instant::now();
        while self.acked() < count {
            if started.elapsed() > deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn connect(&self, _worker_id: usize) -> Result<Box<dyn QueueConsumer>, QueueError> {
        if self.inner.refuse_connections.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        self.inner.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConsumer {
            inner: self.inner.clone(),
            outstanding: 0,
        }))
    }
}

struct MemoryConsumer {
    inner: Arc<Inner>,
    outstanding: usize,
}

#[async_trait]
impl QueueConsumer for MemoryConsumer {
    async fn receive(&mut self) -> Result<Option<Delivery>, QueueError> {
        let failing = self.inner.failing_receives.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |left| left.checked_sub(1),
        );
        if failing.is_ok() {
            return Err(QueueError::Closed);
        }

        let inner = self.inner.clone();
        let next = tokio::time::timeout(inner.wait, async {
            let mut rx = inner.rx.lock().await;
            rx.recv().await
        })
        .await;

        match next {
            Err(_elapsed) => Ok(None),
            Ok(None) => Err(QueueError::Closed),
            Ok(Some(body)) => {
                self.outstanding += 1;
                self.inner
                    .max_outstanding
                    .fetch_max(self.outstanding, Ordering::SeqCst);
                let tag = self.inner.next_tag.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Some(Delivery { tag, body }))
            }
        }
    }

    async fn ack(&mut self, _delivery: &Delivery) -> Result<(), QueueError> {
        self.outstanding = self.outstanding.saturating_sub(1);
        let acked = self.inner.acked.fetch_add(1, Ordering::SeqCst) + 1;

        let observer = self.inner.observer.lock().ok().and_then(|o| o.clone());
        if let Some(stats) = observer {
            let snapshot = stats.snapshot();
            if ((snapshot.completed + snapshot.failed) as usize) < acked {
                self.inner.acks_before_outcome.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), QueueError> {
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_each_message_goes_to_one_consumer() {
        let queue = MemoryQueue::new(Duration::from_millis(20));
        queue.push(b"a".to_vec());
        queue.push(b"b".to_vec());

        let mut first = queue.connect(0).await.unwrap();
        let mut second = queue.connect(1).await.unwrap();
        let a = first.receive().await.unwrap().unwrap();
        let b = second.receive().await.unwrap().unwrap();
        assert_eq!(a.body, b"a");
        assert_eq!(b.body, b"b");
        assert_ne!(a.tag, b.tag);
        assert!(first.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_receives_then_delivers() {
        let queue = MemoryQueue::new(Duration::from_millis(20));
        queue.push(b"a".to_vec());
        queue.fail_next_receives(2);

        let mut consumer = queue.connect(0).await.unwrap();
        assert!(consumer.receive().await.is_err());
        assert!(consumer.receive().await.is_err());
        let a = consumer.receive().await.unwrap().unwrap();
        assert_eq!(a.body, b"a");
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let queue = MemoryQueue::new(Duration::from_millis(20));
        queue.refuse_connections();
        assert!(matches!(queue.connect(0).await, Err(QueueError::Closed)));
    }
}
