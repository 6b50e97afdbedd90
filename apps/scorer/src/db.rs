use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates the PostgreSQL pool used for lead-score sync.
///
/// One connection per worker is enough: each worker issues at most one
/// UPDATE at a time.
pub async fn create_pool(database_url: &str, workers: usize) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let max_connections = u32::try_from(workers.max(1)).unwrap_or(u32::MAX);
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(max_connections, "PostgreSQL connection pool established");
    Ok(pool)
}
