// crates/server/src/fitness/intervals.rs
//! Intervals.icu API client.
//!
//! Simpler than Strava: a static API key sent as Basic auth, one activities
//! endpoint windowed by date. Ride detection goes by the `sport` field,
//! which Intervals spells several ways.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::warn;

use super::{
    avg_speed_mph, format_activity_date, format_ride_time, meters_to_feet, meters_to_miles,
    round1, ActivitySummary, YtdStats,
};
use crate::config::IntervalsCredentials;

const DEFAULT_BASE_URL: &str = "https://intervals.icu/api/v1";

/// Sports counted as riding, lowercase.
const RIDE_SPORTS: &[&str] = &[
    "ride",
    "virtualride",
    "gravel ride",
    "mtb",
    "e-bike ride",
    "indoor cycling",
    "cycling",
];

#[derive(Debug, Deserialize)]
struct IcuActivity {
    #[serde(default)]
    sport: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    distance: Option<f64>,
    #[serde(default)]
    elev_gain: Option<f64>,
    #[serde(default)]
    moving_time: Option<i64>,
    #[serde(default)]
    elapsed_time: Option<i64>,
    #[serde(default)]
    start_date: Option<String>,
}

impl IcuActivity {
    fn is_ride(&self) -> bool {
        self.sport
            .as_deref()
            .map(|s| RIDE_SPORTS.contains(&s.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn moving_secs(&self) -> i64 {
        self.moving_time.or(self.elapsed_time).unwrap_or(0)
    }
}

pub struct IntervalsClient {
    http: reqwest::Client,
    base_url: String,
    creds: IntervalsCredentials,
}

impl IntervalsClient {
    pub fn new(creds: IntervalsCredentials) -> Self {
        Self::with_base_url(creds, DEFAULT_BASE_URL)
    }

    /// Point the client at an alternate endpoint (test servers).
    pub fn with_base_url(creds: IntervalsCredentials, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            creds,
        }
    }

    /// Ride totals for the current calendar year.
    pub async fn fetch_ytd(&self) -> Option<YtdStats> {
        let today = Utc::now().date_naive();
        let jan_first = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
        let activities = self.activities(jan_first, today, None).await?;
        if activities.is_empty() {
            return None;
        }

        let mut distance = 0.0;
        let mut elevation = 0.0;
        let mut moving = 0i64;
        let mut count = 0i64;
        for activity in activities.iter().filter(|a| a.is_ride()) {
            distance += activity.distance.unwrap_or(0.0);
            elevation += activity.elev_gain.unwrap_or(0.0);
            moving += activity.moving_secs();
            count += 1;
        }

        Some(YtdStats {
            distance: round1(meters_to_miles(distance)),
            count,
            elevation: meters_to_feet(elevation).round() as i64,
            time: round1(moving as f64 / 3600.0),
            avg_speed: avg_speed_mph(distance, moving),
        })
    }

    /// Up to five recent rides from the last two weeks.
    pub async fn fetch_activities(&self) -> Option<Vec<ActivitySummary>> {
        let today = Utc::now().date_naive();
        let start = today - Duration::days(14);
        let activities = self.activities(start, today, Some(50)).await?;

        Some(
            activities
                .into_iter()
                .filter(IcuActivity::is_ride)
                .take(5)
                .map(|a| {
                    let distance = a.distance.unwrap_or(0.0);
                    let moving = a.moving_secs();
                    ActivitySummary {
                        name: a
                            .name
                            .clone()
                            .unwrap_or_else(|| "Cycling Activity".to_string()),
                        distance: round1(meters_to_miles(distance)),
                        elevation: meters_to_feet(a.elev_gain.unwrap_or(0.0)).round() as i64,
                        time: format_ride_time(moving),
                        date: a
                            .start_date
                            .as_deref()
                            .map(format_activity_date)
                            .unwrap_or_default(),
                        avg_speed: avg_speed_mph(distance, moving),
                    }
                })
                .collect(),
        )
    }

    async fn activities(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        per_page: Option<u32>,
    ) -> Option<Vec<IcuActivity>> {
        let mut query = vec![("from", from.to_string()), ("to", to.to_string())];
        if let Some(per_page) = per_page {
            query.push(("page", "1".to_string()));
            query.push(("per_page", per_page.to_string()));
        }

        let response = self
            .http
            .get(format!(
                "{}/athlete/{}/activities",
                self.base_url, self.creds.athlete_id
            ))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", self.creds.api_key),
            )
            .query(&query)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Intervals.icu request failed");
            return None;
        }
        response.json().await.ok()
    }
}
