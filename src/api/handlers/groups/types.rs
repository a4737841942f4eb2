//! Request/response DTOs for the groups API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub active: bool,
    /// `dom_name` of the owning user, set at creation and immutable.
    pub owner: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    /// `dom_name` of the owning user.
    pub owner: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberResponse {
    pub dom_name: String,
    pub full_name: String,
    /// Group-admin flag, scoped to this group only.
    pub admin: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    pub dom_name: String,
    #[serde(default)]
    pub admin: bool,
}
