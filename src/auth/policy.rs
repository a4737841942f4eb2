//! Authorization policy: system admin, group admin, group member.
//!
//! Decisions are evaluated fresh on every call; nothing here caches
//! session or membership state. System-admin claims short-circuit before
//! any store access, so administrative privilege is monotonic and never
//! depends on membership rows.

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::auth::{claim::Claim, state::AuthConfig};

/// True iff the claim is the configured administrative identity.
#[must_use]
pub fn is_system_admin(claim: &Claim, config: &AuthConfig) -> bool {
    matches!(claim, Claim::Admin { access_id } if access_id == config.access_id())
}

/// True iff the claim is a system admin or holds an admin membership on
/// `group_id`.
///
/// # Errors
/// Returns an error if the membership lookup fails; callers map this to a
/// store failure rather than a silent deny.
pub async fn is_group_admin(
    pool: &PgPool,
    config: &AuthConfig,
    claim: &Claim,
    group_id: Uuid,
) -> Result<bool, sqlx::Error> {
    if is_system_admin(claim, config) {
        return Ok(true);
    }
    let Claim::User { user_id, .. } = claim else {
        return Ok(false);
    };
    Ok(membership_admin_flag(pool, group_id, *user_id)
        .await?
        .unwrap_or(false))
}

/// True iff the claim is a system admin or holds any membership on
/// `group_id`.
///
/// # Errors
/// Returns an error if the membership lookup fails.
pub async fn is_group_member(
    pool: &PgPool,
    config: &AuthConfig,
    claim: &Claim,
    group_id: Uuid,
) -> Result<bool, sqlx::Error> {
    if is_system_admin(claim, config) {
        return Ok(true);
    }
    let Claim::User { user_id, .. } = claim else {
        return Ok(false);
    };
    Ok(membership_admin_flag(pool, group_id, *user_id)
        .await?
        .is_some())
}

/// Fetches the `admin` flag of the (group, user) membership, if any.
/// Both predicates are part of the SQL filter; a row for another group or
/// another user never matches.
async fn membership_admin_flag(
    pool: &PgPool,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<Option<bool>, sqlx::Error> {
    let row = sqlx::query("SELECT admin FROM memberships WHERE group_id = $1 AND user_id = $2")
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("admin")))
}
