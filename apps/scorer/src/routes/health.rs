use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "profile-scorer"
    }))
}

/// GET /stats
/// Current job counters plus what the pool was started with.
pub async fn stats_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "stats": state.stats.snapshot(),
        "queue": state.queue_name,
        "workers": state.workers,
        "requirements": state.requirements.as_slice(),
    }))
}
