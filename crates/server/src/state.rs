// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use trailhead_core::BlogStore;
use trailhead_db::Database;

use crate::auth::AdminAuth;
use crate::config::Config;
use crate::fitness::FitnessService;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Analytics database handle.
    pub db: Database,
    /// JSON-file blog store.
    pub blog: BlogStore,
    /// Admin credential check and token keys.
    pub auth: AdminAuth,
    /// Cache-through fitness provider client.
    pub fitness: FitnessService,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(db: Database, blog: BlogStore, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            blog,
            auth: AdminAuth::new(
                &config.admin_username,
                &config.admin_password,
                &config.jwt_secret,
            ),
            fitness: FitnessService::from_config(&config.fitness),
        })
    }

    /// Seconds since the server started.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
