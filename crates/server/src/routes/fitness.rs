// crates/server/src/routes/fitness.rs
//! Public fitness endpoints backed by the configured provider.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::fitness::{ActivitySummary, YtdStats};
use crate::state::AppState;

/// GET /api/fitness/ytd - Year-to-date ride totals.
pub async fn ytd(State(state): State<Arc<AppState>>) -> Json<YtdStats> {
    Json(state.fitness.ytd_stats().await)
}

/// GET /api/fitness/activities - Recent formatted rides.
pub async fn activities(State(state): State<Arc<AppState>>) -> Json<Vec<ActivitySummary>> {
    Json(state.fitness.recent_activities().await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/fitness/ytd", get(ytd))
        .route("/fitness/activities", get(activities))
}
