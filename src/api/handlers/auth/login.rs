//! Login: OTP verification and session establishment.
//!
//! Two parallel flows share the TOTP primitive: the administrative flow
//! verifies against the configured secret, the user flow against the seed
//! issued at registration. Every failure path returns the same `401`, so
//! a caller cannot probe which principals exist.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::session::{session_cookie, SessionResponse};
use crate::auth::{otp, token, AuthState, Claim};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    /// Administrative access id or a user's `dom_name`.
    pub name: String,
    /// Current one-time code for the principal's seed.
    pub otp: String,
}

/// Minimal fields needed to verify a user login.
struct LoginRecord {
    user_id: Uuid,
    dom_name: String,
    otp_seed: String,
    active: bool,
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; session cookie set.", body = SessionResponse),
        (status = 401, description = "Unknown principal or invalid code."),
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let name = payload.name.trim();
    let code = payload.otp.trim();
    let config = auth_state.config();

    let claim = if name == config.access_id() {
        if !otp::verify_now(config.admin_seed(), code, config.otp_window()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Claim::Admin {
            access_id: name.to_string(),
        }
    } else {
        let record = match lookup_login_record(&pool, name).await {
            Ok(Some(record)) => record,
            // Unknown principals fail exactly like bad codes.
            Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
            Err(err) => {
                error!("Failed to lookup login record: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        if !record.active || !otp::verify_now(&record.otp_seed, code, config.otp_window()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Claim::User {
            user_id: record.user_id,
            dom_name: record.dom_name,
        }
    };

    let session_token = match token::encrypt_claim(auth_state.key(), &claim) {
        Ok(session_token) => session_token,
        Err(err) => {
            error!("Failed to seal session claim: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    match session_cookie(config, &session_token) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    info!("Session established for {}", claim.subject());
    (
        StatusCode::OK,
        response_headers,
        Json(SessionResponse::from_claim(&claim)),
    )
        .into_response()
}

/// Look up login data by `dom_name`.
async fn lookup_login_record(
    pool: &PgPool,
    dom_name: &str,
) -> Result<Option<LoginRecord>, sqlx::Error> {
    let query = "SELECT id, dom_name, otp_seed, active FROM users WHERE dom_name = $1";
    let row = sqlx::query(query)
        .bind(dom_name)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| LoginRecord {
        user_id: row.get("id"),
        dom_name: row.get("dom_name"),
        otp_seed: row.get("otp_seed"),
        active: row.get("active"),
    }))
}
