//! Group membership handlers.
//!
//! Listing is open to system admins and members of the group; mutations
//! require group-admin rights. Membership identity is (group, user) and
//! duplicates are rejected at the store.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::super::auth::principal::{require_group_admin, require_group_member};
use super::storage::{delete_member, fetch_members, insert_member};
use super::types::{AddMemberRequest, MemberResponse};
use crate::auth::AuthState;

#[utoipa::path(
    get,
    path = "/v1/groups/{id}/members",
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 200, description = "Members with their group-admin flag.", body = [MemberResponse]),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "groups"
)]
pub async fn list_members(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(status) = require_group_member(&headers, &auth_state, &pool, id).await {
        return status.into_response();
    }

    match fetch_members(&pool, id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list group members: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/groups/{id}/members",
    request_body = AddMemberRequest,
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 201, description = "Membership created.", body = MemberResponse),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "User not found.", body = String),
        (status = 409, description = "User is already a member.", body = String),
    ),
    tag = "groups"
)]
pub async fn add_member(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<AddMemberRequest>,
) -> impl IntoResponse {
    if let Err(status) = require_group_admin(&headers, &auth_state, &pool, id).await {
        return status.into_response();
    }

    let dom_name = payload.dom_name.trim().to_lowercase();
    if dom_name.is_empty() {
        return (StatusCode::BAD_REQUEST, "dom_name is required.").into_response();
    }

    match insert_member(&pool, id, &dom_name, payload.admin).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/groups/{id}/members/{dom_name}",
    params(
        ("id" = Uuid, Path, description = "Group id"),
        ("dom_name" = String, Path, description = "External user name"),
    ),
    responses(
        (status = 204, description = "Membership removed (or was already absent)."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "User not found.", body = String),
    ),
    tag = "groups"
)]
pub async fn remove_member(
    Path((id, dom_name)): Path<(Uuid, String)>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(status) = require_group_admin(&headers, &auth_state, &pool, id).await {
        return status.into_response();
    }

    let dom_name = dom_name.trim().to_lowercase();
    match delete_member(&pool, id, &dom_name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
