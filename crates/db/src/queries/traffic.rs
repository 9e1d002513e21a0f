// crates/db/src/queries/traffic.rs
// Page-view log writes, visitor identity upserts, and the dashboard
// aggregation queries.

use crate::{Database, DbResult};
use chrono::{Duration, Local, NaiveDate, Utc};
use serde::Serialize;
use sqlx::Row;

/// How far back the recent-activity feed looks, in seconds.
const RECENT_ACTIVITY_WINDOW_SECS: i64 = 24 * 3600;
/// How far back the realtime snapshot looks, in seconds.
const REALTIME_WINDOW_SECS: i64 = 5 * 60;
/// Row cap shared by the recent-activity feed and the realtime snapshot.
const FEED_LIMIT: i64 = 50;

/// A page view about to be written. The timestamp is stamped by the caller
/// (the instrumentation hook) so the row reflects when the response was
/// finalized.
#[derive(Debug, Clone)]
pub struct NewPageView {
    pub ip_address: String,
    pub user_agent: String,
    pub path: String,
    pub method: String,
    pub referrer: Option<String>,
    /// Unix seconds, server clock.
    pub timestamp: i64,
    /// Milliseconds spent handling the request.
    pub response_time: f64,
    pub status_code: i64,
    pub session_id: String,
}

/// A stored page view, as returned by the recent-activity feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewRow {
    pub id: i64,
    pub ip_address: String,
    pub user_agent: String,
    pub path: String,
    pub method: String,
    pub referrer: Option<String>,
    pub timestamp: i64,
    pub response_time: f64,
    pub status_code: i64,
    pub country: Option<String>,
    pub city: Option<String>,
    pub session_id: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for PageViewRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
            path: row.try_get("path")?,
            method: row.try_get("method")?,
            referrer: row.try_get("referrer")?,
            timestamp: row.try_get("timestamp")?,
            response_time: row.try_get("response_time")?,
            status_code: row.try_get("status_code")?,
            country: row.try_get("country")?,
            city: row.try_get("city")?,
            session_id: row.try_get("session_id")?,
        })
    }
}

/// One row per (ip, user-agent hash) identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorRow {
    pub id: i64,
    pub ip_address: String,
    pub user_agent_hash: String,
    pub first_visit: i64,
    pub last_visit: i64,
    pub visit_count: i64,
}

/// Headline stats for a date window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSummary {
    pub total_views: i64,
    /// Distinct IPs in the window. Deliberately weaker than the
    /// (ip, ua-hash) identity used for unique_visitors.
    pub unique_visitors: i64,
    pub avg_response_time_ms: f64,
    /// Percentage of sessions with exactly one view, in [0, 100].
    pub bounce_rate_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageCount {
    pub path: String,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerCount {
    pub referrer: String,
    pub views: i64,
}

/// One day of the daily time series.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyTraffic {
    /// ISO-8601 calendar date (server-local).
    pub date: String,
    pub views: i64,
    pub unique_visitors: i64,
}

/// A single row of the realtime feed. The IP is truncated before it
/// leaves the query layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeView {
    pub path: String,
    pub timestamp: i64,
    pub ip_address: String,
    pub country: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeSnapshot {
    /// Distinct sessions seen in the last five minutes.
    pub active_users: i64,
    pub recent_views: Vec<RealtimeView>,
}

/// Inclusive server-local date range `[start, end]` as `YYYY-MM-DD` strings.
///
/// Matches SQLite's `date(timestamp, 'unixepoch', 'localtime')` output so the
/// two compare lexicographically.
#[derive(Debug, Clone, PartialEq)]
pub struct DateWindow {
    pub start: String,
    pub end: String,
}

impl DateWindow {
    /// Window closing today and reaching back `days` days.
    /// `days = 0` yields a window of just the current date.
    pub fn last_days(days: u32) -> Self {
        Self::ending_at(Local::now().date_naive(), days)
    }

    /// Window closing at `end`, reaching back `days` days. Spans that would
    /// underflow the calendar clamp to the earliest representable date.
    pub fn ending_at(end: NaiveDate, days: u32) -> Self {
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start: start.format("%Y-%m-%d").to_string(),
            end: end.format("%Y-%m-%d").to_string(),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Privacy minimization at the read boundary: first 8 characters plus an
/// ellipsis, never the full address.
fn truncate_ip(ip: &str) -> String {
    let prefix: String = ip.chars().take(8).collect();
    format!("{prefix}...")
}

impl Database {
    /// Append one page view. Rows are immutable once written.
    pub async fn insert_page_view(&self, view: &NewPageView) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO page_views
                (ip_address, user_agent, path, method, referrer, timestamp,
                 response_time, status_code, session_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&view.ip_address)
        .bind(&view.user_agent)
        .bind(&view.path)
        .bind(&view.method)
        .bind(&view.referrer)
        .bind(view.timestamp)
        .bind(view.response_time)
        .bind(view.status_code)
        .bind(&view.session_id)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Upsert the visitor aggregate for an identity.
    ///
    /// First observation inserts `visit_count = 1` with
    /// `first_visit = last_visit = now`; every later observation bumps
    /// `last_visit` and increments the counter. The unique index on the
    /// identity pair makes concurrent identical-identity requests settle
    /// as updates.
    pub async fn record_visit(&self, ip: &str, user_agent_hash: &str, now: i64) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO unique_visitors (ip_address, user_agent_hash, first_visit, last_visit, visit_count)
            VALUES (?1, ?2, ?3, ?3, 1)
            ON CONFLICT(ip_address, user_agent_hash) DO UPDATE SET
                last_visit = excluded.last_visit,
                visit_count = visit_count + 1
            "#,
        )
        .bind(ip)
        .bind(user_agent_hash)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Look up the aggregate row for an identity, if any.
    pub async fn get_visitor(
        &self,
        ip: &str,
        user_agent_hash: &str,
    ) -> DbResult<Option<VisitorRow>> {
        let row: Option<(i64, String, String, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT id, ip_address, user_agent_hash, first_visit, last_visit, visit_count
            FROM unique_visitors
            WHERE ip_address = ?1 AND user_agent_hash = ?2
            "#,
        )
        .bind(ip)
        .bind(user_agent_hash)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(
            |(id, ip_address, user_agent_hash, first_visit, last_visit, visit_count)| VisitorRow {
                id,
                ip_address,
                user_agent_hash,
                first_visit,
                last_visit,
                visit_count,
            },
        ))
    }

    /// Headline stats: totals, distinct IPs, mean response time, bounce rate.
    pub async fn traffic_summary(&self, window: &DateWindow) -> DbResult<TrafficSummary> {
        let (total_views, unique_visitors, avg_response_time): (i64, i64, f64) = sqlx::query_as(
            r#"
            SELECT
              COUNT(*),
              COUNT(DISTINCT ip_address),
              COALESCE(AVG(response_time), 0.0)
            FROM page_views
            WHERE date(timestamp, 'unixepoch', 'localtime') BETWEEN ?1 AND ?2
            "#,
        )
        .bind(&window.start)
        .bind(&window.end)
        .fetch_one(self.pool())
        .await?;

        // Bounce rate: |sessions with exactly one view| / |distinct sessions|.
        let (single_view_sessions,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM (
                SELECT session_id
                FROM page_views
                WHERE date(timestamp, 'unixepoch', 'localtime') BETWEEN ?1 AND ?2
                GROUP BY session_id
                HAVING COUNT(*) = 1
            )
            "#,
        )
        .bind(&window.start)
        .bind(&window.end)
        .fetch_one(self.pool())
        .await?;

        let (total_sessions,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT session_id)
            FROM page_views
            WHERE date(timestamp, 'unixepoch', 'localtime') BETWEEN ?1 AND ?2
            "#,
        )
        .bind(&window.start)
        .bind(&window.end)
        .fetch_one(self.pool())
        .await?;

        let bounce_rate = if total_sessions > 0 {
            single_view_sessions as f64 / total_sessions as f64 * 100.0
        } else {
            0.0
        };

        Ok(TrafficSummary {
            total_views,
            unique_visitors,
            avg_response_time_ms: round2(avg_response_time),
            bounce_rate_pct: round2(bounce_rate),
        })
    }

    /// Ten most-viewed paths in the window, most viewed first.
    pub async fn top_pages(&self, window: &DateWindow) -> DbResult<Vec<PageCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT path, COUNT(*) as views
            FROM page_views
            WHERE date(timestamp, 'unixepoch', 'localtime') BETWEEN ?1 AND ?2
            GROUP BY path
            ORDER BY views DESC
            LIMIT 10
            "#,
        )
        .bind(&window.start)
        .bind(&window.end)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(path, views)| PageCount { path, views })
            .collect())
    }

    /// Ten most common referrers in the window, empty referrers excluded.
    pub async fn top_referrers(&self, window: &DateWindow) -> DbResult<Vec<ReferrerCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT referrer, COUNT(*) as views
            FROM page_views
            WHERE date(timestamp, 'unixepoch', 'localtime') BETWEEN ?1 AND ?2
              AND referrer IS NOT NULL AND referrer != ''
            GROUP BY referrer
            ORDER BY views DESC
            LIMIT 10
            "#,
        )
        .bind(&window.start)
        .bind(&window.end)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(referrer, views)| ReferrerCount { referrer, views })
            .collect())
    }

    /// Views and distinct IPs per server-local calendar day, ascending.
    pub async fn daily_views(&self, window: &DateWindow) -> DbResult<Vec<DailyTraffic>> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                date(timestamp, 'unixepoch', 'localtime') as day,
                COUNT(*) as views,
                COUNT(DISTINCT ip_address) as unique_visitors
            FROM page_views
            WHERE date(timestamp, 'unixepoch', 'localtime') BETWEEN ?1 AND ?2
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(&window.start)
        .bind(&window.end)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(date, views, unique_visitors)| DailyTraffic {
                date,
                views,
                unique_visitors,
            })
            .collect())
    }

    /// The 50 most recent page views from the last 24 hours, newest first.
    pub async fn recent_activity(&self) -> DbResult<Vec<PageViewRow>> {
        let cutoff = Utc::now().timestamp() - RECENT_ACTIVITY_WINDOW_SECS;
        let rows: Vec<PageViewRow> = sqlx::query_as(
            r#"
            SELECT id, ip_address, user_agent, path, method, referrer, timestamp,
                   response_time, status_code, country, city, session_id
            FROM page_views
            WHERE timestamp >= ?1
            ORDER BY timestamp DESC
            LIMIT ?2
            "#,
        )
        .bind(cutoff)
        .bind(FEED_LIMIT)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Last five minutes of traffic plus a distinct-session "active users"
    /// count. IPs are truncated here; full addresses never leave this query.
    pub async fn realtime_snapshot(&self) -> DbResult<RealtimeSnapshot> {
        let cutoff = Utc::now().timestamp() - REALTIME_WINDOW_SECS;

        let rows: Vec<(String, i64, String, Option<String>, Option<String>)> = sqlx::query_as(
            r#"
            SELECT path, timestamp, ip_address, country, city
            FROM page_views
            WHERE timestamp >= ?1
            ORDER BY timestamp DESC
            LIMIT ?2
            "#,
        )
        .bind(cutoff)
        .bind(FEED_LIMIT)
        .fetch_all(self.pool())
        .await?;

        let (active_users,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT session_id) FROM page_views WHERE timestamp >= ?1",
        )
        .bind(cutoff)
        .fetch_one(self.pool())
        .await?;

        let recent_views = rows
            .into_iter()
            .map(|(path, timestamp, ip, country, city)| RealtimeView {
                path,
                timestamp,
                ip_address: truncate_ip(&ip),
                country,
                city,
            })
            .collect();

        Ok(RealtimeSnapshot {
            active_users,
            recent_views,
        })
    }
}
