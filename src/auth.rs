// Admin authentication: password hashing, signed admin tokens, the privileged
// route extractor, and the login handlers.

use std::convert::Infallible;
use std::net::SocketAddr;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, FromRequestParts, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::AppState;
use crate::error::ApiError;
use crate::metrics;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("admin token lifetime of {0} hours is out of range")]
    TokenTtl(i64),
}

// ── Password hashing ─────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

// ── Tokens ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub iat: usize,
    pub exp: usize, // expiry (unix timestamp)
}

/// Holds the hashed admin password and the token signing keys.
pub struct AdminAuth {
    password_hash: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: TimeDelta,
    local_mode: bool,
}

impl AdminAuth {
    /// Hash `password` and set up signing keys. Without a `secret` a random
    /// key is generated, so tokens do not survive a restart.
    pub fn new(
        password: &str,
        secret: Option<&str>,
        token_ttl_hours: i64,
        local_mode: bool,
    ) -> Result<Self, AuthError> {
        let secret = match secret {
            Some(s) => s.as_bytes().to_vec(),
            None => {
                let mut bytes = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                bytes
            }
        };
        let token_ttl = TimeDelta::try_hours(token_ttl_hours)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or(AuthError::TokenTtl(token_ttl_hours))?;
        Ok(Self {
            password_hash: hash_password(password)?,
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            token_ttl,
            local_mode,
        })
    }

    pub fn local_mode(&self) -> bool {
        self.local_mode
    }

    pub fn check_password(&self, password: &str) -> Result<bool, AuthError> {
        verify_password(password, &self.password_hash)
    }

    /// Issue an admin token. Returns the token and its expiry.
    pub fn create_token(&self) -> Result<(String, DateTime<Utc>), AuthError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or(AuthError::TokenTtl(self.token_ttl.num_hours()))?;
        let claims = Claims {
            sub: ADMIN_ROLE.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok((token, expires_at))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

// ── Extractors ───────────────────────────────────────────────────────

/// A request carrying a valid admin bearer token.
/// In local mode every request qualifies.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Claims);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if state.auth.local_mode() {
            return Ok(AdminUser(Claims {
                sub: "local".to_string(),
                role: ADMIN_ROLE.to_string(),
                iat: 0,
                exp: 0,
            }));
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized("Admin token required"))?;

        let claims = state
            .auth
            .verify_token(bearer.token())
            .map_err(|_| ApiError::Unauthorized("Invalid or expired admin token"))?;

        if claims.role != ADMIN_ROLE {
            return Err(ApiError::Unauthorized("Invalid or expired admin token"));
        }
        Ok(AdminUser(claims))
    }
}

/// Client address used to key login rate limits. Falls back to "unknown"
/// when the server was not started with connect info.
#[derive(Debug, Clone)]
pub struct ClientAddr(pub String);

impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientAddr(addr))
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub password: Option<String>,
}

fn login_failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

/// `POST /api/auth/admin`
pub async fn admin_login(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    body: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Response {
    if let Err(throttled) = state.login_limiter.check_limit(&client) {
        metrics::ADMIN_LOGINS_TOTAL.with_label_values(&["throttled"]).inc();
        tracing::warn!(client = %client, "Admin login throttled");
        let retry_after = throttled.retry_after.as_secs().max(1).to_string();
        let mut response = login_failure(
            StatusCode::TOO_MANY_REQUESTS,
            &ApiError::TooManyRequests.to_string(),
        );
        if let Ok(value) = HeaderValue::from_str(&retry_after) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    let password = match body {
        Ok(Json(req)) => req.password.unwrap_or_default(),
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };

    match state.auth.check_password(&password) {
        Ok(true) => {}
        Ok(false) => {
            metrics::ADMIN_LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            tracing::warn!(client = %client, "Admin login rejected");
            return login_failure(StatusCode::UNAUTHORIZED, "Invalid password");
        }
        Err(e) => {
            tracing::error!("Password verify error: {e}");
            return login_failure(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    }

    let (token, expires_at) = match state.auth.create_token() {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Token creation error: {e}");
            return login_failure(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
        }
    };

    state.login_limiter.reset(&client);
    metrics::ADMIN_LOGINS_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!(client = %client, "Admin authenticated");

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Admin authenticated",
            "token": token,
            "expiresAt": expires_at.to_rfc3339(),
        })),
    )
        .into_response()
}

/// `GET /api/auth/admin`: lets a client check that its stored token is
/// still accepted.
pub async fn admin_status(AdminUser(claims): AdminUser) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Admin token valid",
        // Local-mode claims carry no expiry
        "expiresAt": DateTime::<Utc>::from_timestamp(claims.exp as i64, 0)
            .filter(|_| claims.exp > 0)
            .map(|t| t.to_rfc3339()),
    }))
}
