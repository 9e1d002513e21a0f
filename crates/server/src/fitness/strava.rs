// crates/server/src/fitness/strava.rs
//! Strava API client.
//!
//! Access tokens come from the refresh-token OAuth flow and are cached for
//! an hour alongside the provider data. A 401 from the API drops the cached
//! token and retries once with a fresh one.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use trailhead_core::TtlCache;

use super::{
    avg_speed_mph, format_activity_date, format_ride_time, meters_to_feet, meters_to_miles,
    round1, ActivitySummary, YtdStats,
};
use crate::config::StravaCredentials;

const DEFAULT_BASE_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Access tokens outlive our cache entry, not the other way around.
const TOKEN_TTL: Duration = Duration::from_secs(3600);
const TOKEN_CACHE_KEY: &str = "strava_access_token";

#[derive(Debug, Serialize, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Athlete {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct AthleteStats {
    #[serde(default)]
    ytd_ride_totals: RideTotals,
}

#[derive(Debug, Default, Deserialize)]
struct RideTotals {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    moving_time: i64,
    #[serde(default)]
    elevation_gain: f64,
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct Activity {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    moving_time: i64,
    #[serde(default)]
    total_elevation_gain: f64,
    start_date: String,
}

pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    creds: StravaCredentials,
    cache: TtlCache,
}

impl StravaClient {
    pub fn new(creds: StravaCredentials, cache: TtlCache) -> Self {
        Self::with_urls(creds, cache, DEFAULT_BASE_URL, DEFAULT_TOKEN_URL)
    }

    /// Point the client at alternate endpoints (test servers).
    pub fn with_urls(
        creds: StravaCredentials,
        cache: TtlCache,
        base_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token_url: token_url.into(),
            creds,
            cache,
        }
    }

    /// Year-to-date ride totals from the athlete stats endpoint.
    pub async fn fetch_ytd(&self) -> Option<YtdStats> {
        let athlete: Athlete = self.get_json("/athlete").await?;
        let stats: AthleteStats = self
            .get_json(&format!("/athletes/{}/stats", athlete.id))
            .await?;

        let totals = stats.ytd_ride_totals;
        Some(YtdStats {
            distance: round1(meters_to_miles(totals.distance)),
            count: totals.count,
            elevation: meters_to_feet(totals.elevation_gain).round() as i64,
            time: round1(totals.moving_time as f64 / 3600.0),
            avg_speed: avg_speed_mph(totals.distance, totals.moving_time),
        })
    }

    /// Up to three recent rides, formatted for display. Non-ride activity
    /// types are filtered out.
    pub async fn fetch_activities(&self) -> Option<Vec<ActivitySummary>> {
        let activities: Vec<Activity> = self.get_json("/athlete/activities?per_page=5").await?;

        let formatted: Vec<ActivitySummary> = activities
            .into_iter()
            .filter(|a| a.kind == "Ride" || a.kind == "VirtualRide")
            .take(3)
            .map(|a| ActivitySummary {
                name: a.name,
                distance: round1(meters_to_miles(a.distance)),
                elevation: meters_to_feet(a.total_elevation_gain).round() as i64,
                time: format_ride_time(a.moving_time),
                date: format_activity_date(&a.start_date),
                avg_speed: avg_speed_mph(a.distance, a.moving_time),
            })
            .collect();

        (!formatted.is_empty()).then_some(formatted)
    }

    /// Fetch an access token, going to the OAuth endpoint only when the
    /// cached one has aged out.
    async fn access_token(&self) -> Option<String> {
        if let Some(token) = self.cache.get::<TokenResponse>(TOKEN_CACHE_KEY, TOKEN_TTL) {
            return Some(token.access_token);
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.creds.client_id.as_str()),
                ("client_secret", self.creds.client_secret.as_str()),
                ("refresh_token", self.creds.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Strava token refresh failed");
            return None;
        }
        let token: TokenResponse = response.json().await.ok()?;
        self.cache.put(TOKEN_CACHE_KEY, &token);
        Some(token.access_token)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&token)
            .send()
            .await
            .ok()?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            // Stale token: drop it and retry once with a fresh one.
            self.cache.invalidate(TOKEN_CACHE_KEY);
            let token = self.access_token().await?;
            let retry = self
                .http
                .get(format!("{}{}", self.base_url, path))
                .bearer_auth(&token)
                .send()
                .await
                .ok()?;
            if !retry.status().is_success() {
                warn!(path, status = %retry.status(), "Strava request failed after token refresh");
                return None;
            }
            return retry.json().await.ok();
        }

        if !response.status().is_success() {
            warn!(path, status = %response.status(), "Strava request failed");
            return None;
        }
        response.json().await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailhead_core::DEFAULT_TTL;

    fn creds() -> StravaCredentials {
        StravaCredentials {
            client_id: "123".to_string(),
            client_secret: "shh".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    fn client_for(server: &mockito::ServerGuard) -> StravaClient {
        StravaClient::with_urls(
            creds(),
            TtlCache::new(DEFAULT_TTL),
            server.url(),
            format!("{}/oauth/token", server.url()),
        )
    }

    #[tokio::test]
    async fn test_fetch_ytd_converts_units() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth/token")
            .with_body(r#"{"access_token":"tok"}"#)
            .create_async()
            .await;
        let _athlete = server
            .mock("GET", "/athlete")
            .match_header("authorization", "Bearer tok")
            .with_body(r#"{"id":7}"#)
            .create_async()
            .await;
        let _stats = server
            .mock("GET", "/athletes/7/stats")
            .with_body(
                r#"{"ytd_ride_totals":{"distance":160934.4,"moving_time":36000,"elevation_gain":1000.0,"count":12}}"#,
            )
            .create_async()
            .await;

        let ytd = client_for(&server).fetch_ytd().await.unwrap();
        // 160934.4 m = 100.0 miles over 10 hours.
        assert_eq!(ytd.distance, 100.0);
        assert_eq!(ytd.time, 10.0);
        assert_eq!(ytd.avg_speed, 10.0);
        assert_eq!(ytd.elevation, 3281);
        assert_eq!(ytd.count, 12);
    }

    #[tokio::test]
    async fn test_token_fetched_once_within_ttl() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/oauth/token")
            .with_body(r#"{"access_token":"tok"}"#)
            .expect(1)
            .create_async()
            .await;
        let _athlete = server
            .mock("GET", "/athlete")
            .with_body(r#"{"id":7}"#)
            .expect(2)
            .create_async()
            .await;
        let _stats = server
            .mock("GET", "/athletes/7/stats")
            .with_body(r#"{"ytd_ride_totals":{}}"#)
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server);
        client.fetch_ytd().await.unwrap();
        client.fetch_ytd().await.unwrap();
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_stale_token_refreshed_and_retried() {
        let mut server = mockito::Server::new_async().await;
        // The cached token is rejected; the refreshed one works.
        let _rejected = server
            .mock("GET", "/athlete")
            .match_header("authorization", "Bearer stale")
            .with_status(401)
            .create_async()
            .await;
        let _accepted = server
            .mock("GET", "/athlete")
            .match_header("authorization", "Bearer fresh")
            .with_body(r#"{"id":7}"#)
            .create_async()
            .await;
        let _stats = server
            .mock("GET", "/athletes/7/stats")
            .with_body(r#"{"ytd_ride_totals":{"count":3}}"#)
            .create_async()
            .await;
        let _token = server
            .mock("POST", "/oauth/token")
            .with_body(r#"{"access_token":"fresh"}"#)
            .create_async()
            .await;

        let cache = TtlCache::new(DEFAULT_TTL);
        cache.put(
            TOKEN_CACHE_KEY,
            &TokenResponse {
                access_token: "stale".to_string(),
            },
        );
        let client = StravaClient::with_urls(
            creds(),
            cache,
            server.url(),
            format!("{}/oauth/token", server.url()),
        );

        let ytd = client.fetch_ytd().await.unwrap();
        assert_eq!(ytd.count, 3);
    }

    #[tokio::test]
    async fn test_activities_filtered_to_rides() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth/token")
            .with_body(r#"{"access_token":"tok"}"#)
            .create_async()
            .await;
        let _activities = server
            .mock("GET", "/athlete/activities")
            .match_query(mockito::Matcher::Any)
            .with_body(
                r#"[
                    {"name":"Long Run","type":"Run","distance":10000.0,"moving_time":3600,"total_elevation_gain":50.0,"start_date":"2025-01-06T08:00:00Z"},
                    {"name":"Commute","type":"Ride","distance":16093.4,"moving_time":3600,"total_elevation_gain":100.0,"start_date":"2025-01-05T08:00:00Z"}
                ]"#,
            )
            .create_async()
            .await;

        let rides = client_for(&server).fetch_activities().await.unwrap();
        assert_eq!(rides.len(), 1);
        assert_eq!(rides[0].name, "Commute");
        assert_eq!(rides[0].distance, 10.0);
        assert_eq!(rides[0].time, "1h 0m");
        assert_eq!(rides[0].date, "January 05, 2025");
    }

    #[tokio::test]
    async fn test_provider_failure_yields_none() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth/token")
            .with_status(500)
            .create_async()
            .await;

        assert!(client_for(&server).fetch_ytd().await.is_none());
    }
}
