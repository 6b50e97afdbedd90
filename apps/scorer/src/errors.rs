use thiserror::Error;

/// Per-job failures. Every variant is isolated to the job that raised it: the
/// worker records it, acknowledges the message and moves on.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Malformed job message: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("Unknown requirements_id '{0}'")]
    UnknownRequirement(String),

    #[error("Scoring computation failed: {0}")]
    ScoringComputation(String),

    #[error("Failed to persist score artifact: {0}")]
    Persistence(String),
}

impl JobError {
    /// Short machine-friendly label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Deserialization(_) => "deserialization",
            JobError::UnknownRequirement(_) => "unknown_requirement",
            JobError::ScoringComputation(_) => "scoring_computation",
            JobError::Persistence(_) => "persistence",
        }
    }
}

/// Broker client failures.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Queue connection closed")]
    #[cfg_attr(not(test), allow(dead_code))]
    Closed,

    #[error("Consumer '{consumer}' is held by another process ({owner})")]
    LeaseHeld { consumer: String, owner: String },

    #[error("Lease on consumer '{0}' expired or was taken over")]
    LeaseLost(String),
}

/// Start-up failures while loading requirement specs. Both are fatal.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Cannot read requirements directory '{path}': {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No requirement specs could be loaded from '{0}'")]
    Empty(String),
}
