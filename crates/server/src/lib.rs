// crates/server/src/lib.rs
//! Trailhead server library.
//!
//! Axum HTTP surface for the personal site backend: public blog and fitness
//! endpoints, a token-guarded admin surface, and the request instrumentation
//! middleware that feeds the traffic analytics database.

pub mod auth;
pub mod config;
pub mod error;
pub mod fitness;
pub mod routes;
pub mod state;
pub mod tracker;

pub use config::Config;
pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, blog, admin, fitness)
/// - The instrumentation middleware wrapping every route
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    create_app_with_static(state, None)
}

/// Like [`create_app`], additionally serving `static_dir` under `/static/`.
/// Static asset requests bypass the analytics pipeline.
pub fn create_app_with_static(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().merge(api_routes(state.clone()));
    if let Some(dir) = static_dir {
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    app.layer(middleware::from_fn_with_state(state, tracker::track_request))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
