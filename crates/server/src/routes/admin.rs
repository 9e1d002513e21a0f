// crates/server/src/routes/admin.rs
//! Admin surface: login, post editing, and the traffic dashboard queries.
//!
//! Everything except `/admin/login` sits behind the bearer-token guard.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use trailhead_core::{BlogPost, PostFields};
use trailhead_db::{
    DailyTraffic, DateWindow, PageCount, PageViewRow, RealtimeSnapshot, ReferrerCount,
    TrafficSummary,
};

use crate::auth::require_admin;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Default traffic report window in days.
const DEFAULT_REPORT_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /api/admin/login - Exchange credentials for a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let token = state.auth.login(&req.username, &req.password)?;
    Ok(Json(LoginResponse { token }))
}

/// POST /api/admin/posts - Create a post.
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Json(fields): Json<PostFields>,
) -> ApiResult<(StatusCode, Json<BlogPost>)> {
    let post = state.blog.create_post(fields)?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/admin/posts/{id} - Update a post.
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(fields): Json<PostFields>,
) -> ApiResult<Json<BlogPost>> {
    Ok(Json(state.blog.update_post(id, fields)?))
}

/// DELETE /api/admin/posts/{id} - Delete a post. Unknown ids are a no-op.
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.blog.delete_post(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct TrafficParams {
    days: Option<i64>,
}

/// Everything the dashboard renders for one date window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficReport {
    pub days: u32,
    pub summary: TrafficSummary,
    pub top_pages: Vec<PageCount>,
    pub top_referrers: Vec<ReferrerCount>,
    pub daily: Vec<DailyTraffic>,
    pub recent_activity: Vec<PageViewRow>,
}

/// GET /api/admin/traffic?days=N - Aggregated traffic report.
///
/// `days` defaults to 30; `days=0` covers just today; negative or absurdly
/// large values are rejected.
pub async fn traffic(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrafficParams>,
) -> ApiResult<Json<TrafficReport>> {
    let days = params.days.unwrap_or(DEFAULT_REPORT_DAYS);
    let days = u32::try_from(days).map_err(|_| {
        ApiError::BadRequest("days must be a non-negative integer".to_string())
    })?;
    let window = DateWindow::last_days(days);

    Ok(Json(TrafficReport {
        days,
        summary: state.db.traffic_summary(&window).await?,
        top_pages: state.db.top_pages(&window).await?,
        top_referrers: state.db.top_referrers(&window).await?,
        daily: state.db.daily_views(&window).await?,
        recent_activity: state.db.recent_activity().await?,
    }))
}

/// GET /api/admin/traffic/realtime - Last five minutes of traffic.
pub async fn traffic_realtime(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RealtimeSnapshot>> {
    Ok(Json(state.db.realtime_snapshot().await?))
}

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let guarded = Router::new()
        .route("/admin/posts", post(create_post))
        .route("/admin/posts/{id}", put(update_post).delete(delete_post))
        .route("/admin/traffic", get(traffic))
        .route("/admin/traffic/realtime", get(traffic_realtime))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new()
        .route("/admin/login", post(login))
        .merge(guarded)
}
