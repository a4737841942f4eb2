//! Shared SQL storage helpers for group and membership entities.
//!
//! Mutations run inside a transaction so owner/user resolution and the
//! write commit or roll back together; no partial state survives a
//! failure.

use axum::{http::StatusCode, response::IntoResponse};
use sqlx::{PgPool, Row};
use tracing::error;
use uuid::Uuid;

use super::super::users::is_unique_violation;
use super::types::{GroupResponse, MemberResponse};

#[derive(Debug)]
pub(super) enum GroupError {
    NotFound(&'static str),
    Conflict(&'static str),
    Database(sqlx::Error),
}

impl IntoResponse for GroupError {
    /// Maps storage-layer failures into stable HTTP responses for
    /// handlers. Database errors are logged server-side and surfaced as
    /// `500` without leaking details.
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            Self::Conflict(message) => (StatusCode::CONFLICT, message).into_response(),
            Self::Database(err) => {
                error!("Database error: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Lists groups, optionally restricted to active ones.
pub(super) async fn fetch_groups(
    pool: &PgPool,
    active_only: bool,
) -> Result<Vec<GroupResponse>, sqlx::Error> {
    let query = r#"
        SELECT
            g.id::text AS id,
            g.name,
            g.active,
            u.dom_name AS owner,
            to_char(g.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM groups g
        JOIN users u ON u.id = g.owner_id
        WHERE ($1 = false OR g.active)
        ORDER BY g.created_at DESC
    "#;
    let rows = sqlx::query(query).bind(active_only).fetch_all(pool).await?;
    Ok(rows.into_iter().map(group_from_row).collect())
}

/// Inserts a group owned by the user named `owner`.
///
/// The owner is resolved inside the same transaction as the insert;
/// an unknown owner maps to `404` and nothing is written.
pub(super) async fn insert_group(
    pool: &PgPool,
    name: &str,
    owner: &str,
) -> Result<GroupResponse, GroupError> {
    let mut tx = pool.begin().await.map_err(GroupError::Database)?;

    let owner_row = sqlx::query("SELECT id FROM users WHERE dom_name = $1")
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await
        .map_err(GroupError::Database)?;
    let Some(owner_row) = owner_row else {
        return Err(GroupError::NotFound("Owner does not exist."));
    };
    let owner_id: Uuid = owner_row.get("id");

    let row = sqlx::query(
        r#"
        INSERT INTO groups (name, owner_id)
        VALUES ($1, $2)
        RETURNING
            id::text AS id,
            name,
            active,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        "#,
    )
    .bind(name)
    .bind(owner_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(GroupError::Database)?;

    tx.commit().await.map_err(GroupError::Database)?;

    Ok(GroupResponse {
        id: row.get("id"),
        name: row.get("name"),
        active: row.get("active"),
        owner: owner.to_string(),
        created_at: row.get("created_at"),
    })
}

/// Field-level patch of a group's `name`/`active`; the owner reference is
/// immutable. Returns `None` when the group does not exist.
pub(super) async fn update_group_record(
    pool: &PgPool,
    group_id: Uuid,
    name: Option<&str>,
    active: Option<bool>,
) -> Result<Option<GroupResponse>, sqlx::Error> {
    let query = r#"
        UPDATE groups g
        SET
            name = COALESCE($1, g.name),
            active = COALESCE($2, g.active)
        FROM users u
        WHERE g.id = $3 AND u.id = g.owner_id
        RETURNING
            g.id::text AS id,
            g.name,
            g.active,
            u.dom_name AS owner,
            to_char(g.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
    "#;
    let row = sqlx::query(query)
        .bind(name)
        .bind(active)
        .bind(group_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(group_from_row))
}

/// Lists the members of a group with their per-group admin flag.
pub(super) async fn fetch_members(
    pool: &PgPool,
    group_id: Uuid,
) -> Result<Vec<MemberResponse>, sqlx::Error> {
    let query = r"
        SELECT u.dom_name, u.full_name, m.admin
        FROM memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.group_id = $1
        ORDER BY u.dom_name
    ";
    let rows = sqlx::query(query).bind(group_id).fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| MemberResponse {
            dom_name: row.get("dom_name"),
            full_name: row.get("full_name"),
            admin: row.get("admin"),
        })
        .collect())
}

/// Inserts a membership for the user named `dom_name`.
///
/// An unknown user or group maps to `404`; a duplicate membership maps to
/// `409` and leaves the existing row untouched.
pub(super) async fn insert_member(
    pool: &PgPool,
    group_id: Uuid,
    dom_name: &str,
    admin: bool,
) -> Result<MemberResponse, GroupError> {
    let mut tx = pool.begin().await.map_err(GroupError::Database)?;

    let user_row = sqlx::query("SELECT id, full_name FROM users WHERE dom_name = $1")
        .bind(dom_name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(GroupError::Database)?;
    let Some(user_row) = user_row else {
        return Err(GroupError::NotFound("User does not exist."));
    };
    let user_id: Uuid = user_row.get("id");
    let full_name: String = user_row.get("full_name");

    let group_exists = sqlx::query("SELECT 1 FROM groups WHERE id = $1")
        .bind(group_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(GroupError::Database)?;
    if group_exists.is_none() {
        return Err(GroupError::NotFound("Group does not exist."));
    }

    let insert = sqlx::query(
        r"
        INSERT INTO memberships (group_id, user_id, admin)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(group_id)
    .bind(user_id)
    .bind(admin)
    .execute(&mut *tx)
    .await;

    if let Err(err) = insert {
        if is_unique_violation(&err) {
            let _ = tx.rollback().await;
            return Err(GroupError::Conflict("User is already a member."));
        }
        return Err(GroupError::Database(err));
    }

    tx.commit().await.map_err(GroupError::Database)?;

    Ok(MemberResponse {
        dom_name: dom_name.to_string(),
        full_name,
        admin,
    })
}

/// Deletes the membership of the user named `dom_name`, if any.
///
/// An unknown user maps to `404`; removing an absent membership is a
/// no-op, not an error. Both predicates are part of the delete filter.
pub(super) async fn delete_member(
    pool: &PgPool,
    group_id: Uuid,
    dom_name: &str,
) -> Result<(), GroupError> {
    let user_row = sqlx::query("SELECT id FROM users WHERE dom_name = $1")
        .bind(dom_name)
        .fetch_optional(pool)
        .await
        .map_err(GroupError::Database)?;
    let Some(user_row) = user_row else {
        return Err(GroupError::NotFound("User does not exist."));
    };
    let user_id: Uuid = user_row.get("id");

    sqlx::query("DELETE FROM memberships WHERE group_id = $1 AND user_id = $2")
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(GroupError::Database)?;

    Ok(())
}

fn group_from_row(row: sqlx::postgres::PgRow) -> GroupResponse {
    GroupResponse {
        id: row.get("id"),
        name: row.get("name"),
        active: row.get("active"),
        owner: row.get("owner"),
        created_at: row.get("created_at"),
    }
}
