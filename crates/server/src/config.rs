// crates/server/src/config.rs
//! Environment-driven server configuration.
//!
//! Everything is collected once at startup so the rest of the server never
//! touches `std::env`. Missing provider credentials select mock mode rather
//! than failing startup.

use std::path::PathBuf;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct StravaCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct IntervalsCredentials {
    pub athlete_id: String,
    pub api_key: String,
}

/// Which fitness provider backs `/api/fitness/*`.
#[derive(Debug, Clone)]
pub enum FitnessProvider {
    Strava(StravaCredentials),
    Intervals(IntervalsCredentials),
    /// No credentials configured; serve static mock payloads.
    Mock,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Analytics database path. `None` uses the default data directory.
    pub db_path: Option<PathBuf>,
    /// Blog store path. `None` uses the default data directory.
    pub blog_path: Option<PathBuf>,
    /// Directory served under `/static/`. `None` runs API-only.
    pub static_dir: Option<PathBuf>,
    pub admin_username: String,
    pub admin_password: String,
    pub jwt_secret: String,
    pub fitness: FitnessProvider,
}

impl Config {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        let port = std::env::var("TRAILHEAD_PORT")
            .ok()
            .or_else(|| std::env::var("PORT").ok())
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let jwt_secret = std::env::var("TRAILHEAD_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("TRAILHEAD_JWT_SECRET not set, using insecure default");
            "trailhead-dev-secret".to_string()
        });

        Self {
            port,
            db_path: std::env::var("TRAILHEAD_DB").ok().map(PathBuf::from),
            blog_path: std::env::var("TRAILHEAD_BLOG").ok().map(PathBuf::from),
            static_dir: std::env::var("STATIC_DIR")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    let dist = PathBuf::from("static");
                    dist.is_dir().then_some(dist)
                }),
            admin_username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "password".to_string()),
            jwt_secret,
            fitness: resolve_fitness_provider(),
        }
    }
}

/// Pick the fitness provider from whichever credential set is present.
/// `FITNESS_PROVIDER=strava|intervals` forces the choice; with no complete
/// credential set the provider is mock.
fn resolve_fitness_provider() -> FitnessProvider {
    let strava = match (
        std::env::var("STRAVA_CLIENT_ID"),
        std::env::var("STRAVA_CLIENT_SECRET"),
        std::env::var("STRAVA_REFRESH_TOKEN"),
    ) {
        (Ok(client_id), Ok(client_secret), Ok(refresh_token)) => Some(StravaCredentials {
            client_id,
            client_secret,
            refresh_token,
        }),
        _ => None,
    };
    let intervals = match (
        std::env::var("INTERVALS_ATHLETE_ID"),
        std::env::var("INTERVALS_API_KEY"),
    ) {
        (Ok(athlete_id), Ok(api_key)) => Some(IntervalsCredentials { athlete_id, api_key }),
        _ => None,
    };

    let forced = std::env::var("FITNESS_PROVIDER").ok();
    match (forced.as_deref(), strava, intervals) {
        (Some("intervals"), _, Some(creds)) => FitnessProvider::Intervals(creds),
        (Some("strava"), Some(creds), _) => FitnessProvider::Strava(creds),
        (None, Some(creds), _) => FitnessProvider::Strava(creds),
        (None, None, Some(creds)) => FitnessProvider::Intervals(creds),
        _ => {
            tracing::warn!("No fitness provider credentials found, serving mock data");
            FitnessProvider::Mock
        }
    }
}
