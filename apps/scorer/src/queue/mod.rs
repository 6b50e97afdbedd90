//! Broker client seam.
//!
//! `JobQueue` hands each worker its own `QueueConsumer` (one logical
//! connection per worker). The broker delivers a message to one consumer at a
//! time and redelivers it if that consumer never acknowledges.

use async_trait::async_trait;

use crate::errors::QueueError;

#[cfg(test)]
pub mod memory;
pub mod redis_queue;

/// A message handed to a worker, pending acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Consumer-local tag identifying the message for acknowledgement.
    pub tag: u64,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Opens a dedicated consumer for `worker_id`.
    async fn connect(&self, worker_id: usize) -> Result<Box<dyn QueueConsumer>, QueueError>;
}

#[async_trait]
pub trait QueueConsumer: Send {
    /// Waits for the next message. `Ok(None)` means the bounded wait elapsed with
    /// nothing to deliver; callers loop, which lets them observe shutdown.
    async fn receive(&mut self) -> Result<Option<Delivery>, QueueError>;

    /// Removes the delivered message from the queue for good.
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Gives up the consumer id so another process may take it over at once.
    async fn close(&mut self) -> Result<(), QueueError> {
        Ok(())
    }
}
