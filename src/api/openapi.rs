//! OpenAPI document assembly and the `/openapi.json` route.

use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use super::handlers::{auth, groups, health, users};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login::login,
        auth::session::session,
        auth::session::logout,
        users::list_users,
        users::get_user,
        users::create_user,
        users::patch_user,
        groups::groups::list_groups,
        groups::groups::create_group,
        groups::groups::patch_group,
        groups::members::list_members,
        groups::members::add_member,
        groups::members::remove_member,
    ),
    components(schemas(
        health::Health,
        auth::login::LoginRequest,
        auth::session::SessionResponse,
        users::UserSummary,
        users::UserDetail,
        users::CreateUserRequest,
        users::UpdateUserRequest,
        groups::GroupResponse,
        groups::CreateGroupRequest,
        groups::UpdateGroupRequest,
        groups::MemberResponse,
        groups::AddMemberRequest,
    )),
    tags(
        (name = "auth", description = "Login, logout and session introspection"),
        (name = "users", description = "User management (admins only)"),
        (name = "groups", description = "Group and membership management"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
