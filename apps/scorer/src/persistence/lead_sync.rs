use async_trait::async_trait;
use sqlx::PgPool;

/// Copies a finished score onto the matching lead row.
#[async_trait]
pub trait LeadScoreSync: Send + Sync {
    /// Returns the number of rows updated. Zero means no lead has that URL.
    async fn sync_score(&self, profile_url: &str, score: f64) -> anyhow::Result<u64>;
}

/// `leads_list.score` in PostgreSQL, keyed by `profile_url`.
#[derive(Clone)]
pub struct PgLeadSync {
    pool: PgPool,
}

impl PgLeadSync {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadScoreSync for PgLeadSync {
    async fn sync_score(&self, profile_url: &str, score: f64) -> anyhow::Result<u64> {
        let result = sqlx::query("UPDATE leads_list SET score = $1 WHERE profile_url = $2")
            .bind(score)
            .bind(profile_url)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
