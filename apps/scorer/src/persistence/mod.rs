//! Where finished scores go.
//!
//! Every completed job writes one artifact through a `ResultStore`. Syncing the
//! score onto the lead row is optional and best-effort (`LeadScoreSync`).

pub mod artifact;
pub mod lead_sync;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::JobError;
use crate::models::score::ScoreArtifact;

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persists `artifact` under a name unique to this call. Returns where it went.
    async fn save(&self, artifact: &ScoreArtifact) -> Result<PathBuf, JobError>;
}

pub use artifact::FileResultStore;
pub use lead_sync::{LeadScoreSync, PgLeadSync};
