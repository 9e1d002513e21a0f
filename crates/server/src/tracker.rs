// crates/server/src/tracker.rs
//! Request instrumentation middleware.
//!
//! Wraps every route: captures timing before the handler runs, then writes
//! one `page_views` row and upserts the visitor aggregate after the response
//! is produced. Static asset requests are skipped. A storage failure is
//! logged and never alters the response.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::error;
use trailhead_db::NewPageView;

use crate::state::AppState;

/// Session cookie name. Holds the opaque per-browser-session token.
pub const SESSION_COOKIE: &str = "trailhead_session";

pub async fn track_request(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let path = request.uri().path().to_string();
    let method = request.method().to_string();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());

    let ip = resolve_real_ip(request.headers(), remote);
    let user_agent = header_string(request.headers(), header::USER_AGENT).unwrap_or_default();
    let referrer = header_string(request.headers(), header::REFERER);
    let existing_session = session_from_cookies(request.headers());
    let session_id = existing_session
        .clone()
        .unwrap_or_else(|| new_session_id(&ip));

    let mut response = next.run(request).await;

    if is_tracked(&path) {
        let timestamp = Utc::now().timestamp();
        let view = NewPageView {
            ip_address: ip.clone(),
            user_agent: user_agent.clone(),
            path,
            method,
            referrer,
            timestamp,
            response_time: started.elapsed().as_secs_f64() * 1000.0,
            status_code: response.status().as_u16() as i64,
            session_id: session_id.clone(),
        };

        // Page view first, visitor aggregate second. Neither failure
        // reaches the client.
        if let Err(e) = state.db.insert_page_view(&view).await {
            error!(error = %e, path = %view.path, "Failed to record page view");
        }
        if let Err(e) = state
            .db
            .record_visit(&ip, &hash_user_agent(&user_agent), timestamp)
            .await
        {
            error!(error = %e, "Failed to update visitor aggregate");
        }
    }

    if existing_session.is_none() {
        // First request from this browser session: hand the token back so
        // later requests carry the same session id.
        let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

/// Resolve the client address behind a reverse proxy: first `X-Forwarded-For`
/// entry, then `X-Real-IP`, then the socket address. Headers are trusted
/// as-is; this server is expected to sit behind its own proxy.
pub fn resolve_real_ip(headers: &HeaderMap, remote: Option<IpAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    remote
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// SHA-256 hex digest of a user-agent string.
pub fn hash_user_agent(user_agent: &str) -> String {
    hex::encode(Sha256::digest(user_agent.as_bytes()))
}

/// Static assets are served, not analyzed.
fn is_tracked(path: &str) -> bool {
    !(path == "/static" || path.starts_with("/static/") || path == "/favicon.ico")
}

/// Read the session token from the `Cookie` header, if present.
fn session_from_cookies(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Opaque session token: digest of the client address and the current clock.
fn new_session_id(ip: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    hex::encode(Sha256::digest(format!("{ip}{nanos}").as_bytes()))
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
