//! User management endpoints (system admin only).
//!
//! Flow Overview:
//! 1) Authenticate the request via session cookie and require the
//!    administrative claim.
//! 2) Perform reads or allow-listed updates for the requested user.
//!
//! The OTP seed is generated once at creation and is immutable; it is
//! returned only on create and on the explicit per-user read, which is
//! the administrative seed-handoff path.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::auth::principal::require_admin;
use crate::auth::{otp, AuthState};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub dom_name: String,
    pub full_name: String,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetail {
    pub dom_name: String,
    pub full_name: String,
    /// Base32 TOTP seed; hand this to the user out of band.
    pub seed: String,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub dom_name: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub active: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/v1/users",
    responses(
        (status = 200, description = "List users (admins only).", body = [UserSummary]),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "users"
)]
pub async fn list_users(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(status) = require_admin(&headers, &auth_state) {
        return status.into_response();
    }

    match fetch_user_summaries(&pool).await {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(err) => {
            error!("Failed to list users: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/users/{dom_name}",
    params(("dom_name" = String, Path, description = "External user name")),
    responses(
        (status = 200, description = "User detail including the OTP seed.", body = UserDetail),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "User not found."),
    ),
    tag = "users"
)]
pub async fn get_user(
    Path(dom_name): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(status) = require_admin(&headers, &auth_state) {
        return status.into_response();
    }

    match fetch_user_detail(&pool, &normalize_dom_name(&dom_name)).await {
        Ok(Some(detail)) => (StatusCode::OK, Json(detail)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch user detail: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created; response carries the generated seed.", body = UserDetail),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid session."),
        (status = 409, description = "User with this dom_name already exists.", body = String),
    ),
    tag = "users"
)]
pub async fn create_user(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if let Err(status) = require_admin(&headers, &auth_state) {
        return status.into_response();
    }

    let dom_name = normalize_dom_name(&payload.dom_name);
    if !valid_dom_name(&dom_name) {
        return (StatusCode::BAD_REQUEST, "Invalid dom_name.").into_response();
    }
    let full_name = payload.full_name.trim();
    if full_name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Full name is required.").into_response();
    }

    let seed = match otp::generate_seed() {
        Ok(seed) => seed,
        Err(err) => {
            error!("Failed to generate OTP seed: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match insert_user(&pool, &dom_name, full_name, &seed).await {
        Ok(detail) => (StatusCode::CREATED, Json(detail)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/users/{dom_name}",
    request_body = UpdateUserRequest,
    params(("dom_name" = String, Path, description = "External user name")),
    responses(
        (status = 200, description = "User updated.", body = UserSummary),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "User not found."),
    ),
    tag = "users"
)]
pub async fn patch_user(
    Path(dom_name): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    if let Err(status) = require_admin(&headers, &auth_state) {
        return status.into_response();
    }

    let full_name = normalize_optional(payload.full_name);
    if full_name.is_none() && payload.active.is_none() {
        return (StatusCode::BAD_REQUEST, "No updates provided.").into_response();
    }

    match update_user_record(
        &pool,
        &normalize_dom_name(&dom_name),
        full_name.as_deref(),
        payload.active,
    )
    .await
    {
        Ok(Some(summary)) => (StatusCode::OK, Json(summary)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update user: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug)]
enum UserError {
    Conflict(&'static str),
    Database(sqlx::Error),
}

impl IntoResponse for UserError {
    /// Maps storage-layer failures into stable HTTP responses.
    /// Database errors are logged server-side and surfaced as `500`
    /// without leaking details.
    fn into_response(self) -> Response {
        match self {
            Self::Conflict(message) => (StatusCode::CONFLICT, message).into_response(),
            Self::Database(err) => {
                error!("Database error: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

async fn fetch_user_summaries(pool: &PgPool) -> Result<Vec<UserSummary>, sqlx::Error> {
    let query = r#"
        SELECT
            dom_name,
            full_name,
            active,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM users
        ORDER BY created_at DESC
    "#;
    let rows = sqlx::query(query).fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| UserSummary {
            dom_name: row.get("dom_name"),
            full_name: row.get("full_name"),
            active: row.get("active"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn fetch_user_detail(
    pool: &PgPool,
    dom_name: &str,
) -> Result<Option<UserDetail>, sqlx::Error> {
    let query = r#"
        SELECT
            dom_name,
            full_name,
            otp_seed,
            active,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM users
        WHERE dom_name = $1
        LIMIT 1
    "#;
    let row = sqlx::query(query).bind(dom_name).fetch_optional(pool).await?;
    Ok(row.map(|row| UserDetail {
        dom_name: row.get("dom_name"),
        full_name: row.get("full_name"),
        seed: row.get("otp_seed"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    }))
}

/// Inserts a user with its freshly generated seed and returns the detail
/// dump, including the seed, for the administrative handoff.
async fn insert_user(
    pool: &PgPool,
    dom_name: &str,
    full_name: &str,
    seed: &str,
) -> Result<UserDetail, UserError> {
    let insert = sqlx::query(
        r#"
        INSERT INTO users (dom_name, full_name, otp_seed)
        VALUES ($1, $2, $3)
        RETURNING
            dom_name,
            full_name,
            otp_seed,
            active,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        "#,
    )
    .bind(dom_name)
    .bind(full_name)
    .bind(seed)
    .fetch_one(pool)
    .await;

    match insert {
        Ok(row) => Ok(UserDetail {
            dom_name: row.get("dom_name"),
            full_name: row.get("full_name"),
            seed: row.get("otp_seed"),
            active: row.get("active"),
            created_at: row.get("created_at"),
        }),
        Err(err) => {
            if is_unique_violation(&err) {
                Err(UserError::Conflict("User already exists."))
            } else {
                Err(UserError::Database(err))
            }
        }
    }
}

/// Field-level patch; the seed is never touched.
async fn update_user_record(
    pool: &PgPool,
    dom_name: &str,
    full_name: Option<&str>,
    active: Option<bool>,
) -> Result<Option<UserSummary>, sqlx::Error> {
    let query = r#"
        UPDATE users
        SET
            full_name = COALESCE($1, full_name),
            active = COALESCE($2, active)
        WHERE dom_name = $3
        RETURNING
            dom_name,
            full_name,
            active,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;
    let row = sqlx::query(query)
        .bind(full_name)
        .bind(active)
        .bind(dom_name)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| UserSummary {
        dom_name: row.get("dom_name"),
        full_name: row.get("full_name"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    }))
}

/// Normalize a `dom_name` for lookup/uniqueness checks.
fn normalize_dom_name(dom_name: &str) -> String {
    dom_name.trim().to_lowercase()
}

/// Basic format check on already-normalized input.
fn valid_dom_name(dom_name: &str) -> bool {
    Regex::new(r"^[a-z0-9][a-z0-9._-]{0,63}$").is_ok_and(|regex| regex.is_match(dom_name))
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
