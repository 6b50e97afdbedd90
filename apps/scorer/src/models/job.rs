use serde::{Deserialize, Serialize};

use crate::errors::JobError;
use crate::models::profile::ProfileData;

/// One message on the scoring queue: score one profile against one requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringJob {
    pub profile_data: ProfileData,
    pub requirements_id: String,
    pub profile_url: String,
}

impl ScoringJob {
    /// Strict decode at the queue boundary.
    pub fn from_slice(body: &[u8]) -> Result<Self, JobError> {
        serde_json::from_slice(body).map_err(JobError::Deserialization)
    }
}

/// Identifying fields pulled from a message body without requiring it to be a
/// valid `ScoringJob`, so failures can still be logged with context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobLabel {
    pub requirements_id: Option<String>,
    pub profile_url: Option<String>,
}

impl JobLabel {
    pub fn peek(body: &[u8]) -> Self {
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
            return Self::default();
        };
        let field = |key: &str| value.get(key).and_then(|v| v.as_str()).map(String::from);
        Self {
            requirements_id: field("requirements_id"),
            profile_url: field("profile_url"),
        }
    }

    pub fn requirements_id(&self) -> &str {
        self.requirements_id.as_deref().unwrap_or("-")
    }

    pub fn profile_url(&self) -> &str {
        self.profile_url.as_deref().unwrap_or("-")
    }
}
