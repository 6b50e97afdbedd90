//! Redis reliable queue.
//!
//! Producers `LPUSH` JSON jobs onto the queue list. Each consumer `BLMOVE`s the
//! oldest message into its own processing list and `LREM`s it from there once
//! the job is finished. Whatever is left in a processing list when its consumer
//! (re)connects was never acknowledged and goes back onto the queue.
//!
//! A consumer is `<instance>:<worker>`. Its processing list is guarded by a
//! lease key (`SET NX EX`, renewed on every receive and ack), so a second
//! process started with the same instance id cannot requeue jobs that a live
//! consumer still holds. It waits for the lease to lapse instead.
//!
//! Multiplexed connections do not reconnect by themselves. Any Redis error
//! drops the consumer's connection; the next call opens a fresh one, reclaims
//! the lease and requeues whatever the failure may have stranded.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError, Script};
use tracing::{debug, info, warn};

use crate::errors::QueueError;
use crate::queue::{Delivery, JobQueue, QueueConsumer};

/// Lifetime of a consumer lease. Receive and ack both renew it.
const LEASE_TTL: Duration = Duration::from_secs(60);
/// How long a starting consumer waits for someone else's lease to lapse.
const LEASE_WAIT: Duration = Duration::from_secs(65);
const LEASE_POLL: Duration = Duration::from_secs(1);

lazy_static! {
    static ref RENEW_LEASE: Script = Script::new(
        r#"if redis.call("GET", KEYS[1]) == ARGV[1] then
             return redis.call("EXPIRE", KEYS[1], ARGV[2])
           end
           return 0"#,
    );
    static ref RELEASE_LEASE: Script = Script::new(
        r#"if redis.call("GET", KEYS[1]) == ARGV[1] then
             return redis.call("DEL", KEYS[1])
           end
           return 0"#,
    );
}

pub struct RedisJobQueue {
    client: Client,
    queue: String,
    instance_id: String,
    block_timeout: Duration,
}

impl RedisJobQueue {
    pub fn new(
        client: Client,
        queue: impl Into<String>,
        instance_id: impl Into<String>,
        block_timeout: Duration,
    ) -> Self {
        Self {
            client,
            queue: queue.into(),
            instance_id: instance_id.into(),
            block_timeout,
        }
    }

    pub fn open(
        url: &str,
        queue: impl Into<String>,
        instance_id: impl Into<String>,
        block_timeout: Duration,
    ) -> Result<Self, QueueError> {
        Ok(Self::new(Client::open(url)?, queue, instance_id, block_timeout))
    }

    pub fn queue_name(&self) -> &str {
        &self.queue
    }

    /// PINGs the server and returns the number of messages waiting.
    pub async fn check(&self) -> Result<u64, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        let depth: u64 = redis::cmd("LLEN")
            .arg(&self.queue)
            .query_async(&mut conn)
            .await?;
        Ok(depth)
    }
}

/// Redis keys owned by one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConsumerKeys {
    pub queue: String,
    pub processing: String,
    pub lease: String,
}

impl ConsumerKeys {
    pub(crate) fn new(queue: &str, instance_id: &str, worker_id: usize) -> Self {
        let processing = format!("{queue}:processing:{instance_id}:{worker_id}");
        Self {
            queue: queue.to_string(),
            lease: format!("{processing}:lease"),
            processing,
        }
    }
}

/// Identifies this process as the lease holder.
fn lease_token(instance_id: &str) -> String {
    format!(
        "{instance_id}:{}:{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn connect(&self, worker_id: usize) -> Result<Box<dyn QueueConsumer>, QueueError> {
        let mut consumer = RedisConsumer {
            client: self.client.clone(),
            conn: None,
            keys: ConsumerKeys::new(&self.queue, &self.instance_id, worker_id),
            token: lease_token(&self.instance_id),
            block_timeout: self.block_timeout,
            needs_recovery: true,
            next_tag: 0,
        };
        consumer.recover().await?;
        info!(worker_id, processing = %consumer.keys.processing, "Queue consumer connected");
        Ok(Box::new(consumer))
    }
}

struct RedisConsumer {
    client: Client,
    conn: Option<MultiplexedConnection>,
    keys: ConsumerKeys,
    token: String,
    block_timeout: Duration,
    /// Set on start and after any Redis error: the processing list may hold
    /// messages nobody is working on.
    needs_recovery: bool,
    next_tag: u64,
}

impl RedisConsumer {
    /// Returns the live connection, opening one and claiming the lease if the
    /// previous connection was dropped.
    async fn connection(&mut self) -> Result<&mut MultiplexedConnection, QueueError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                let mut conn = self.client.get_multiplexed_async_connection().await?;
                claim_lease(&mut conn, &self.keys, &self.token).await?;
                conn
            }
        };
        Ok(self.conn.insert(conn))
    }

    fn disconnect(&mut self, err: RedisError) -> QueueError {
        self.conn = None;
        self.needs_recovery = true;
        err.into()
    }

    /// Requeues everything in this consumer's processing list.
    async fn recover(&mut self) -> Result<(), QueueError> {
        if !self.needs_recovery {
            return Ok(());
        }
        let mut lmove = redis::cmd("LMOVE");
        lmove
            .arg(&self.keys.processing)
            .arg(&self.keys.queue)
            .arg("RIGHT")
            .arg("RIGHT");

        let conn = self.connection().await?;
        let mut recovered = 0u64;
        let outcome = loop {
            match lmove.query_async::<_, Option<Vec<u8>>>(conn).await {
                Ok(Some(_)) => recovered += 1,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        if let Err(e) = outcome {
            return Err(self.disconnect(e));
        }

        if recovered > 0 {
            warn!(
                processing = %self.keys.processing,
                recovered,
                queue = %self.keys.queue,
                "Requeued unacknowledged messages"
            );
        }
        self.needs_recovery = false;
        Ok(())
    }

    /// Extends the lease; a lease that is no longer ours drops the connection.
    async fn renew_lease(&mut self) -> Result<(), QueueError> {
        let mut renew = RENEW_LEASE.key(&self.keys.lease);
        renew.arg(&self.token).arg(LEASE_TTL.as_secs());

        let conn = self.connection().await?;
        match renew.invoke_async::<_, i64>(conn).await {
            Ok(0) => {
                self.conn = None;
                self.needs_recovery = true;
                Err(QueueError::LeaseLost(self.keys.processing.clone()))
            }
            Ok(_) => Ok(()),
            Err(e) => Err(self.disconnect(e)),
        }
    }
}

async fn claim_lease(
    conn: &mut MultiplexedConnection,
    keys: &ConsumerKeys,
    token: &str,
) -> Result<(), QueueError> {
    let started = tokio::time::Instant::now();
    loop {
        let acquired: Option<String> = redis::cmd("SET")
            .arg(&keys.lease)
            .arg(token)
            .arg("NX")
            .arg("EX")
            .arg(LEASE_TTL.as_secs())
            .query_async(conn)
            .await?;
        if acquired.is_some() {
            debug!(lease = %keys.lease, "Consumer lease acquired");
            return Ok(());
        }

        let owner: Option<String> = redis::cmd("GET").arg(&keys.lease).query_async(conn).await?;
        if owner.as_deref() == Some(token) {
            // Reconnecting after a dropped connection; the lease is still ours.
            return Ok(());
        }
        if started.elapsed() >= LEASE_WAIT {
            return Err(QueueError::LeaseHeld {
                consumer: keys.processing.clone(),
                owner: owner.unwrap_or_default(),
            });
        }
        if started.elapsed() < LEASE_POLL {
            warn!(
                lease = %keys.lease,
                owner = owner.as_deref().unwrap_or("-"),
                "Consumer id held by another process, waiting for its lease to lapse"
            );
        }
        tokio::time::sleep(LEASE_POLL).await;
    }
}

#[async_trait]
impl QueueConsumer for RedisConsumer {
    async fn receive(&mut self) -> Result<Option<Delivery>, QueueError> {
        self.renew_lease().await?;
        self.recover().await?;

        let mut blmove = redis::cmd("BLMOVE");
        blmove
            .arg(&self.keys.queue)
            .arg(&self.keys.processing)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(self.block_timeout.as_secs_f64());

        let conn = self.connection().await?;
        match blmove.query_async::<_, Option<Vec<u8>>>(conn).await {
            Ok(body) => Ok(body.map(|body| {
                self.next_tag += 1;
                Delivery {
                    tag: self.next_tag,
                    body,
                }
            })),
            Err(e) => Err(self.disconnect(e)),
        }
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError> {
        self.renew_lease().await?;

        let mut lrem = redis::cmd("LREM");
        lrem.arg(&self.keys.processing).arg(1).arg(&delivery.body);

        let conn = self.connection().await?;
        match lrem.query_async::<_, i64>(conn).await {
            Ok(0) => {
                warn!(tag = delivery.tag, processing = %self.keys.processing, "Acknowledged message was not in the processing list");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => Err(self.disconnect(e)),
        }
    }

    async fn close(&mut self) -> Result<(), QueueError> {
        let mut release = RELEASE_LEASE.key(&self.keys.lease);
        release.arg(&self.token);

        let conn = self.connection().await?;
        match release.invoke_async::<_, i64>(conn).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.disconnect(e)),
        }
    }
}
