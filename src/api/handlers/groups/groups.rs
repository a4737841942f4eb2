//! Group CRUD handlers.
//!
//! Listing and creation are system-admin operations; updates are open to
//! group admins of the targeted group. Authorization failures return
//! `401` without revealing whether the group exists.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::super::auth::principal::{require_admin, require_group_admin};
use super::storage::{fetch_groups, insert_group, update_group_record};
use super::types::{CreateGroupRequest, GroupResponse, UpdateGroupRequest};
use super::GROUP_NAME_MAX;
use crate::auth::AuthState;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListGroupsParams {
    /// Only show active groups.
    #[serde(default)]
    pub active: bool,
}

#[utoipa::path(
    get,
    path = "/v1/groups",
    params(ListGroupsParams),
    responses(
        (status = 200, description = "List groups (admins only).", body = [GroupResponse]),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "groups"
)]
pub async fn list_groups(
    Query(params): Query<ListGroupsParams>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Err(status) = require_admin(&headers, &auth_state) {
        return status.into_response();
    }

    match fetch_groups(&pool, params.active).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list groups: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created.", body = GroupResponse),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Owner not found.", body = String),
    ),
    tag = "groups"
)]
pub async fn create_group(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<CreateGroupRequest>,
) -> impl IntoResponse {
    if let Err(status) = require_admin(&headers, &auth_state) {
        return status.into_response();
    }

    let name = payload.name.trim();
    if name.is_empty() || name.len() > GROUP_NAME_MAX {
        return (StatusCode::BAD_REQUEST, "Invalid group name.").into_response();
    }
    let owner = payload.owner.trim().to_lowercase();
    if owner.is_empty() {
        return (StatusCode::BAD_REQUEST, "Owner is required.").into_response();
    }

    match insert_group(&pool, name, &owner).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/groups/{id}",
    request_body = UpdateGroupRequest,
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group updated.", body = GroupResponse),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Group not found."),
    ),
    tag = "groups"
)]
pub async fn patch_group(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<UpdateGroupRequest>,
) -> impl IntoResponse {
    if let Err(status) = require_group_admin(&headers, &auth_state, &pool, id).await {
        return status.into_response();
    }

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if payload.name.is_some() && name.is_none() {
        return (StatusCode::BAD_REQUEST, "Invalid group name.").into_response();
    }
    if name.is_none() && payload.active.is_none() {
        return (StatusCode::BAD_REQUEST, "No updates provided.").into_response();
    }

    match update_group_record(&pool, id, name, payload.active).await {
        Ok(Some(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update group: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
