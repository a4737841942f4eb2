//! Request guards: the single enforcement point in front of every
//! protected operation.
//!
//! Flow Overview: decrypt the session cookie into a claim, then evaluate
//! the authorization predicate for the requested operation. An Anonymous
//! session, a forged token, or an under-authorized claim short-circuits
//! with `401` before domain logic runs. Store failures during policy
//! evaluation surface as `500`, never as a silent deny or allow.

use axum::http::{HeaderMap, StatusCode};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::session::authenticate_session;
use crate::auth::{policy, AuthState, Claim};

/// Resolve the session into a claim, or return 401.
pub fn require_claim(headers: &HeaderMap, auth_state: &AuthState) -> Result<Claim, StatusCode> {
    authenticate_session(headers, auth_state).ok_or(StatusCode::UNAUTHORIZED)
}

/// Resolve the session and require the system-admin identity.
pub fn require_admin(headers: &HeaderMap, auth_state: &AuthState) -> Result<Claim, StatusCode> {
    let claim = require_claim(headers, auth_state)?;
    if policy::is_system_admin(&claim, auth_state.config()) {
        Ok(claim)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// Resolve the session and require group-admin rights on `group_id`.
pub async fn require_group_admin(
    headers: &HeaderMap,
    auth_state: &AuthState,
    pool: &PgPool,
    group_id: Uuid,
) -> Result<Claim, StatusCode> {
    let claim = require_claim(headers, auth_state)?;
    match policy::is_group_admin(pool, auth_state.config(), &claim, group_id).await {
        Ok(true) => Ok(claim),
        Ok(false) => Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            error!("Failed to evaluate group admin policy: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Resolve the session and require membership of `group_id`.
pub async fn require_group_member(
    headers: &HeaderMap,
    auth_state: &AuthState,
    pool: &PgPool,
    group_id: Uuid,
) -> Result<Claim, StatusCode> {
    let claim = require_claim(headers, auth_state)?;
    match policy::is_group_member(pool, auth_state.config(), &claim, group_id).await {
        Ok(true) => Ok(claim),
        Ok(false) => Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            error!("Failed to evaluate group member policy: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
