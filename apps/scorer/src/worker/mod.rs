//! Worker pool.
//!
//! N workers, each with its own queue consumer, run the per-job cycle
//!
//! ```text
//! Idle -> Receiving -> Scoring -> Persisting -> Recording -> Acknowledging -> Idle
//! ```
//!
//! Every received message is acknowledged exactly once, whatever happens to
//! it: malformed bodies, unknown requirement ids, scorer panics and write
//! failures are recorded as failed jobs and dropped, never requeued. A job's
//! outcome is counted before its message is acknowledged.
//!
//! A failed receive (broker connection lost) is logged and retried after a
//! backoff; the consumer reconnects on its next call.
//!
//! Shutdown is a `watch` flag. A worker checks it before every receive, so the
//! job it is holding always finishes its whole cycle first. An idle worker
//! notices within one queue block timeout.

pub mod stats;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context};
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::JobError;
use crate::models::job::{JobLabel, ScoringJob};
use crate::models::score::{ScoreArtifact, ScoreResult};
use crate::persistence::{LeadScoreSync, ResultStore};
use crate::queue::{Delivery, JobQueue, QueueConsumer};
use crate::registry::RequirementRegistry;
use crate::scoring::ProfileScorer;

pub use stats::{StatsSnapshot, StatsTracker};

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Everything a worker needs to process a job. Shared read-only.
struct JobContext {
    registry: Arc<RequirementRegistry>,
    scorer: Arc<dyn ProfileScorer>,
    store: Arc<dyn ResultStore>,
    lead_sync: Option<Arc<dyn LeadScoreSync>>,
    stats: Arc<StatsTracker>,
}

pub struct WorkerPool {
    workers: usize,
    queue: Arc<dyn JobQueue>,
    ctx: JobContext,
    receive_backoff: Duration,
}

impl WorkerPool {
    pub fn new(
        workers: usize,
        queue: Arc<dyn JobQueue>,
        registry: Arc<RequirementRegistry>,
        scorer: Arc<dyn ProfileScorer>,
        store: Arc<dyn ResultStore>,
        stats: Arc<StatsTracker>,
    ) -> Self {
        Self {
            workers,
            queue,
            ctx: JobContext {
                registry,
                scorer,
                store,
                lead_sync: None,
                stats,
            },
            receive_backoff: RECEIVE_ERROR_BACKOFF,
        }
    }

    /// Mirrors each successful score onto the lead row after the artifact is written.
    pub fn with_lead_sync(mut self, lead_sync: Arc<dyn LeadScoreSync>) -> Self {
        self.ctx.lead_sync = Some(lead_sync);
        self
    }

    pub fn with_receive_backoff(mut self, backoff: Duration) -> Self {
        self.receive_backoff = backoff;
        self
    }

    /// Connects every worker, then runs them until `shutdown` flips to `true`.
    ///
    /// A worker that cannot connect aborts start-up before any job is taken.
    /// Returns the final counters once every worker has drained.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<StatsSnapshot> {
        ensure!(self.workers >= 1, "worker count must be at least 1");

        let mut consumers = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let consumer = self
                .queue
                .connect(worker_id)
                .await
                .with_context(|| format!("worker {worker_id} could not connect to the queue"))?;
            consumers.push(consumer);
        }

        let ctx = Arc::new(self.ctx);
        let mut tasks = JoinSet::new();
        for (id, consumer) in consumers.into_iter().enumerate() {
            let worker = Worker {
                id,
                consumer,
                ctx: ctx.clone(),
                shutdown: shutdown.clone(),
                receive_backoff: self.receive_backoff,
            };
            tasks.spawn(worker.run());
        }
        info!(workers = self.workers, "Worker pool started");

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Worker task ended abnormally: {e}");
            }
        }

        let snapshot = ctx.stats.snapshot();
        info!(
            completed = snapshot.completed,
            failed = snapshot.failed,
            lead_sync_updated = snapshot.lead_sync_updated,
            lead_sync_failed = snapshot.lead_sync_failed,
            "Worker pool stopped. Success rate: {:.1}%",
            snapshot.success_percentage()
        );
        Ok(snapshot)
    }
}

struct Worker {
    id: usize,
    consumer: Box<dyn QueueConsumer>,
    ctx: Arc<JobContext>,
    shutdown: watch::Receiver<bool>,
    receive_backoff: Duration,
}

impl Worker {
    async fn run(mut self) {
        debug!(worker_id = self.id, "Worker idle");
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let delivery = match self.consumer.receive().await {
                Ok(Some(delivery)) => delivery,
                Ok(None) => continue,
                Err(e) => {
                    warn!(worker_id = self.id, "Queue receive failed: {e}");
                    if self.wait_or_shutdown(self.receive_backoff).await {
                        break;
                    }
                    continue;
                }
            };

            self.handle(delivery).await;
        }
        if let Err(e) = self.consumer.close().await {
            warn!(worker_id = self.id, "Queue consumer did not close cleanly: {e}");
        }
        info!(worker_id = self.id, "Worker stopped");
    }

    /// Sleeps for `delay`; returns `true` if shutdown was requested meanwhile.
    async fn wait_or_shutdown(&mut self, delay: Duration) -> bool {
        let changed = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.shutdown.changed() => true,
        };
        changed || *self.shutdown.borrow()
    }

    async fn handle(&mut self, delivery: Delivery) {
        let stats = &self.ctx.stats;
        stats.job_started();

        let outcome = process(&self.ctx, &delivery.body).await;

        // Counted before the ack: once the broker forgets the message, its
        // outcome is already on record.
        match outcome {
            Ok(done) => {
                stats.job_finished(true);
                info!(
                    worker_id = self.id,
                    requirements_id = %done.requirements_id,
                    profile_url = %done.profile_url,
                    total_score = done.score.total_score,
                    recommendation = %done.score.recommendation,
                    path = %done.path.display(),
                    "Profile scored"
                );
            }
            Err(e) => {
                stats.job_finished(false);
                let label = JobLabel::peek(&delivery.body);
                error!(
                    worker_id = self.id,
                    requirements_id = %label.requirements_id(),
                    profile_url = %label.profile_url(),
                    kind = e.kind(),
                    "Job failed: {e}"
                );
            }
        }

        if let Err(e) = self.consumer.ack(&delivery).await {
            warn!(worker_id = self.id, tag = delivery.tag, "Acknowledgement failed, message may be redelivered: {e}");
        }

        let snap = stats.snapshot();
        info!(
            worker_id = self.id,
            processing = snap.processing,
            completed = snap.completed,
            failed = snap.failed,
            "Stats"
        );
    }
}

struct Processed {
    requirements_id: String,
    profile_url: String,
    score: ScoreResult,
    path: PathBuf,
}

/// Receiving -> Scoring -> Persisting. Lead sync runs after the artifact is
/// safely written and never turns a success into a failure.
async fn process(ctx: &JobContext, body: &[u8]) -> Result<Processed, JobError> {
    let job = ScoringJob::from_slice(body)?;
    let requirement = ctx.registry.get(&job.requirements_id)?;

    let scorer = ctx.scorer.clone();
    let profile = job.profile_data;
    let scored_at = Utc::now();
    let (profile, score) = tokio::task::spawn_blocking(move || {
        let score = scorer.score(&profile, &requirement, scored_at);
        (profile, score)
    })
    .await
    .map_err(|e| {
        if e.is_panic() {
            JobError::ScoringComputation("scorer panicked".to_string())
        } else {
            JobError::ScoringComputation(e.to_string())
        }
    })?;

    let artifact = ScoreArtifact::new(profile, job.requirements_id, job.profile_url, score);
    let path = ctx.store.save(&artifact).await?;

    if let Some(lead_sync) = &ctx.lead_sync {
        sync_lead(lead_sync.as_ref(), &ctx.stats, &artifact).await;
    }

    Ok(Processed {
        requirements_id: artifact.requirements_id,
        profile_url: artifact.profile_url,
        score: artifact.score,
        path,
    })
}

async fn sync_lead(lead_sync: &dyn LeadScoreSync, stats: &StatsTracker, artifact: &ScoreArtifact) {
    let profile_url = artifact.profile_url.trim();
    if profile_url.is_empty() {
        debug!(requirements_id = %artifact.requirements_id, "No profile_url, lead sync skipped");
        return;
    }

    match lead_sync
        .sync_score(profile_url, artifact.score.total_score)
        .await
    {
        Ok(rows) if rows > 0 => {
            stats.lead_sync(true);
            debug!(profile_url, rows, "Lead score updated");
        }
        Ok(_) => {
            stats.lead_sync(false);
            warn!(profile_url, "No lead row matched profile_url");
        }
        Err(e) => {
            stats.lead_sync(false);
            warn!(profile_url, "Lead score sync failed: {e:#}");
        }
    }
}
