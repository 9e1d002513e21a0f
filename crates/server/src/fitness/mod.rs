// crates/server/src/fitness/mod.rs
//! Fitness provider integration.
//!
//! One configured provider (Strava or Intervals.icu) backs the public
//! `/api/fitness/*` routes through a shared 12-hour cache. With no
//! credentials, or when a provider call fails with nothing cached, the
//! documented static mock payloads are served instead. A provider fault
//! never surfaces as an error response.

pub mod intervals;
pub mod strava;

pub use intervals::IntervalsClient;
pub use strava::StravaClient;

use serde::{Deserialize, Serialize};
use trailhead_core::{TtlCache, DEFAULT_TTL};

use crate::config::FitnessProvider;

/// Year-to-date riding totals, imperial units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YtdStats {
    /// Miles, one decimal.
    pub distance: f64,
    pub count: i64,
    /// Feet, whole.
    pub elevation: i64,
    /// Hours, one decimal.
    pub time: f64,
    /// Miles per hour, one decimal.
    pub avg_speed: f64,
}

/// A recent ride formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub name: String,
    pub distance: f64,
    pub elevation: i64,
    /// `"1h 45m"` style duration.
    pub time: String,
    /// `"January 05, 2025"` style date.
    pub date: String,
    pub avg_speed: f64,
}

enum ProviderClient {
    Strava(StravaClient),
    Intervals(IntervalsClient),
}

/// Cache-through facade over the configured provider.
pub struct FitnessService {
    cache: TtlCache,
    client: Option<ProviderClient>,
}

impl FitnessService {
    pub fn from_config(provider: &FitnessProvider) -> Self {
        if matches!(provider, FitnessProvider::Mock) {
            return Self::mock();
        }
        let cache = match trailhead_core::paths::fitness_cache_path() {
            Some(path) => TtlCache::with_file(path, DEFAULT_TTL),
            None => TtlCache::new(DEFAULT_TTL),
        };
        let client = match provider {
            FitnessProvider::Strava(creds) => Some(ProviderClient::Strava(StravaClient::new(
                creds.clone(),
                cache.clone(),
            ))),
            FitnessProvider::Intervals(creds) => Some(ProviderClient::Intervals(
                IntervalsClient::new(creds.clone()),
            )),
            FitnessProvider::Mock => None,
        };
        Self { cache, client }
    }

    /// A service with no provider, serving only mock payloads.
    pub fn mock() -> Self {
        Self {
            cache: TtlCache::new(DEFAULT_TTL),
            client: None,
        }
    }

    pub async fn ytd_stats(&self) -> YtdStats {
        let Some(client) = &self.client else {
            return mock_ytd_stats();
        };
        self.cache
            .get_or_fetch("ytd_stats", self.cache.ttl(), || async {
                match client {
                    ProviderClient::Strava(c) => c.fetch_ytd().await,
                    ProviderClient::Intervals(c) => c.fetch_ytd().await,
                }
            })
            .await
            .unwrap_or_else(mock_ytd_stats)
    }

    pub async fn recent_activities(&self) -> Vec<ActivitySummary> {
        let Some(client) = &self.client else {
            return mock_activities();
        };
        self.cache
            .get_or_fetch("recent_activities", self.cache.ttl(), || async {
                match client {
                    ProviderClient::Strava(c) => c.fetch_activities().await,
                    ProviderClient::Intervals(c) => c.fetch_activities().await,
                }
            })
            .await
            .unwrap_or_else(mock_activities)
    }
}

pub(crate) fn meters_to_miles(meters: f64) -> f64 {
    meters * 0.000621371
}

pub(crate) fn meters_to_feet(meters: f64) -> f64 {
    meters * 3.28084
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Average speed in mph, one decimal. Zero moving time yields zero.
pub(crate) fn avg_speed_mph(distance_meters: f64, moving_secs: i64) -> f64 {
    if moving_secs == 0 {
        return 0.0;
    }
    round1(meters_to_miles(distance_meters) / (moving_secs as f64 / 3600.0))
}

/// `"1h 45m"`, or just `"45m"` under an hour.
pub(crate) fn format_ride_time(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// `"January 05, 2025"` from an RFC 3339 start time; unparseable input is
/// passed through as-is.
pub(crate) fn format_activity_date(start: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(start)
        .map(|dt| dt.format("%B %d, %Y").to_string())
        .unwrap_or_else(|_| start.to_string())
}

fn mock_ytd_stats() -> YtdStats {
    YtdStats {
        distance: 2450.5,
        count: 127,
        elevation: 45_600,
        time: 156.2,
        avg_speed: 15.7,
    }
}

fn mock_activities() -> Vec<ActivitySummary> {
    vec![
        ActivitySummary {
            name: "Morning Training Ride".to_string(),
            distance: 25.3,
            elevation: 1200,
            time: "1h 45m".to_string(),
            date: "January 5, 2025".to_string(),
            avg_speed: 14.5,
        },
        ActivitySummary {
            name: "Weekend Century".to_string(),
            distance: 102.1,
            elevation: 3500,
            time: "5h 30m".to_string(),
            date: "January 3, 2025".to_string(),
            avg_speed: 18.6,
        },
        ActivitySummary {
            name: "Recovery Spin".to_string(),
            distance: 15.2,
            elevation: 400,
            time: "45m".to_string(),
            date: "January 1, 2025".to_string(),
            avg_speed: 20.3,
        },
    ]
}
