//! API route handlers for the trailhead server.

pub mod admin;
pub mod blog;
pub mod fitness;
pub mod health;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET    /api/health - Health check
/// - GET    /api/blog/posts - All posts, newest first
/// - GET    /api/blog/posts/{id} - One post
/// - POST   /api/admin/login - Exchange credentials for a bearer token
/// - POST   /api/admin/posts - Create a post (token required)
/// - PUT    /api/admin/posts/{id} - Update a post (token required)
/// - DELETE /api/admin/posts/{id} - Delete a post (token required)
/// - GET    /api/admin/traffic?days=N - Traffic report (token required)
/// - GET    /api/admin/traffic/realtime - Last-5-minutes snapshot (token required)
/// - GET    /api/fitness/ytd - Year-to-date ride totals
/// - GET    /api/fitness/activities - Recent formatted rides
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", blog::router())
        .nest("/api", admin::router(state.clone()))
        .nest("/api", fitness::router())
        .with_state(state)
}
