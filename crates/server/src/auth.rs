// crates/server/src/auth.rs
//! Admin credential check and bearer-token guard.
//!
//! A single env-configured admin account; successful login issues an HS256
//! JWT that the admin routes require as `Authorization: Bearer <token>`.
//! Hardening (rate limits, multiple users, rotation) is out of scope for a
//! personal site.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Issued tokens expire after a day.
const TOKEN_LIFETIME_SECS: i64 = 24 * 3600;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Admin credentials plus the JWT keys derived from the configured secret.
pub struct AdminAuth {
    username: String,
    password: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AdminAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>, secret: &str) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Check a login attempt and issue a token on success.
    pub fn login(&self, username: &str, password: &str) -> ApiResult<String> {
        if username != self.username || password != self.password {
            return Err(ApiError::Unauthorized);
        }
        let claims = Claims {
            sub: username.to_string(),
            exp: chrono::Utc::now().timestamp() + TOKEN_LIFETIME_SECS,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
    }

    /// Validate a bearer token (signature and expiry).
    pub fn verify(&self, token: &str) -> bool {
        decode::<Claims>(token, &self.decoding, &Validation::default()).is_ok()
    }
}

/// Middleware guarding the admin routes: a valid bearer token or 401.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    if !state.auth.verify(token) {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AdminAuth {
        AdminAuth::new("admin", "hunter2", "test-secret")
    }

    #[test]
    fn test_login_issues_verifiable_token() {
        let auth = auth();
        let token = auth.login("admin", "hunter2").unwrap();
        assert!(auth.verify(&token));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let err = auth().login("admin", "wrong").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn test_wrong_username_rejected() {
        let err = auth().login("root", "hunter2").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let other = AdminAuth::new("admin", "hunter2", "different-secret");
        let token = other.login("admin", "hunter2").unwrap();
        assert!(!auth().verify(&token));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(!auth().verify("not.a.jwt"));
    }
}
