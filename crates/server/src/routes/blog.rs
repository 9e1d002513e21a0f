// crates/server/src/routes/blog.rs
//! Public read-only blog endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use trailhead_core::BlogPost;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/blog/posts - All posts, newest first.
pub async fn list_posts(State(state): State<Arc<AppState>>) -> Json<Vec<BlogPost>> {
    let mut posts = state.blog.list_posts();
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    Json(posts)
}

/// GET /api/blog/posts/{id} - A single post.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BlogPost>> {
    state
        .blog
        .get_post(id)
        .map(Json)
        .ok_or(ApiError::PostNotFound(id))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/blog/posts", get(list_posts))
        .route("/blog/posts/{id}", get(get_post))
}
