mod config;
mod db;
mod errors;
mod models;
mod persistence;
mod queue;
mod registry;
mod routes;
mod scoring;
mod state;
mod worker;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::persistence::{FileResultStore, PgLeadSync};
use crate::queue::redis_queue::RedisJobQueue;
use crate::registry::RequirementRegistry;
use crate::routes::build_router;
use crate::scoring::CompositeScorer;
use crate::state::AppState;
use crate::worker::{StatsTracker, WorkerPool};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or invalid env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting profile scorer v{}", env!("CARGO_PKG_VERSION"));

    let scorer = Arc::new(CompositeScorer::new(config.scoring_config()?));
    info!(
        fuzzy_threshold = scorer.config().fuzzy_threshold,
        "Composite scorer configured"
    );

    // Requirement specs: loaded once, read-only afterwards
    let registry = RequirementRegistry::load_dir(&config.requirements_dir)
        .context("Failed to load requirement specs")?;
    info!(
        count = registry.len(),
        dir = %config.requirements_dir.display(),
        "Requirement specs loaded"
    );
    let requirement_ids = Arc::new(registry.ids());
    let registry = Arc::new(registry);

    // Redis queue: unreachable broker is fatal before any worker starts
    let queue = RedisJobQueue::open(
        &config.redis_url,
        config.queue_name.clone(),
        config.instance_id.clone(),
        config.queue_block_timeout,
    )?;
    let depth = queue
        .check()
        .await
        .context("Cannot reach Redis at start-up")?;
    info!(
        queue = %queue.queue_name(),
        instance = %config.instance_id,
        depth,
        "Redis queue reachable"
    );

    // Score artifacts
    let store = FileResultStore::new(&config.output_dir);
    store.ensure_dir().await.with_context(|| {
        format!("Cannot create output directory {}", config.output_dir.display())
    })?;
    info!(dir = %store.dir().display(), "Writing score artifacts");

    let stats = Arc::new(StatsTracker::new());
    let mut pool = WorkerPool::new(
        config.workers,
        Arc::new(queue),
        registry,
        scorer,
        Arc::new(store),
        stats.clone(),
    );

    // Optional lead-score sync
    match &config.database_url {
        Some(url) => {
            let db = create_pool(url, config.workers).await?;
            pool = pool.with_lead_sync(Arc::new(PgLeadSync::new(db)));
            info!("Lead-score sync enabled");
        }
        None => info!("DATABASE_URL not set, lead-score sync disabled"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Optional operator HTTP surface
    let server = match config.stats_port {
        Some(port) => {
            let state = AppState {
                stats: stats.clone(),
                requirements: requirement_ids,
                queue_name: config.queue_name.clone(),
                workers: config.workers,
            };
            let app = build_router(state).layer(TraceLayer::new_for_http());

            let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Stats server listening on {addr}");

            let mut stop = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = stop.wait_for(|stopping| *stopping).await;
                    })
                    .await
            }))
        }
        None => None,
    };

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, finishing in-flight jobs");
        let _ = signal_tx.send(true);
    });

    info!(
        workers = config.workers,
        queue = %config.queue_name,
        "Waiting for scoring jobs. Press Ctrl+C to stop."
    );
    let result = pool.run(shutdown_rx).await;
    // The pool may also stop on a start-up error; take the server down with it.
    let _ = shutdown_tx.send(true);

    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Stats server error: {e}"),
            Err(e) => warn!("Stats server task failed: {e}"),
        }
    }

    let snapshot = result?;
    info!(
        completed = snapshot.completed,
        failed = snapshot.failed,
        "Scorer stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
