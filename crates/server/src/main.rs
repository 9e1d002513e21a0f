// crates/server/src/main.rs
//! Trailhead server binary.

use std::net::SocketAddr;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use trailhead_core::BlogStore;
use trailhead_db::Database;
use trailhead_server::{create_app_with_static, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let db = match &config.db_path {
        Some(path) => Database::new(path).await?,
        None => Database::open_default().await?,
    };

    let blog_path = match &config.blog_path {
        Some(path) => path.clone(),
        None => trailhead_core::paths::blog_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?,
    };
    let blog = BlogStore::new(blog_path)?;

    let state = AppState::new(db, blog, &config);
    let app = create_app_with_static(state, config.static_dir.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        %addr,
        static_dir = ?config.static_dir,
        "Trailhead server listening"
    );

    // ConnectInfo feeds the tracker's socket-address fallback when no
    // proxy headers are present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
