//! End-to-end service flows against a real database.
//!
//! These tests need `ROSTER_TEST_DSN` pointing at a scratch PostgreSQL
//! database; they apply `sql/schema.sql` (idempotent) and drive the full
//! router. Without the variable they skip cleanly, so the default test
//! run stays self-contained.

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        Request, StatusCode,
    },
    Extension, Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use roster::api::router;
use roster::auth::{otp, token, AuthConfig, AuthState, Claim};

const ACCESS_ID: &str = "access";
const SECRET: &str = "JBSWY3DPEHPK3PXP";

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

// Applied once per test binary; the statements are idempotent but racing
// them across concurrent tests can trip Postgres catalog conflicts.
static SCHEMA: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();

/// Connects to the scratch database and applies the schema, or returns
/// `None` so the caller can skip the test cleanly.
async fn test_pool() -> Option<PgPool> {
    let Ok(dsn) = std::env::var("ROSTER_TEST_DSN") else {
        eprintln!("Skipping integration test: ROSTER_TEST_DSN not set");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&dsn)
        .await
        .expect("connect test pool");

    SCHEMA
        .get_or_init(|| async {
            for statement in split_sql_statements(SCHEMA_SQL) {
                sqlx::query(&statement)
                    .execute(&pool)
                    .await
                    .expect("apply schema statement");
            }
        })
        .await;

    Some(pool)
}

/// Splits the schema file into statements; assumes statements end with
/// `;` and do not nest semicolons.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn test_app(pool: PgPool) -> Router {
    let auth_state = Arc::new(AuthState::new(AuthConfig::new(
        ACCESS_ID.to_string(),
        SecretString::from(SECRET),
    )));
    router()
        .layer(Extension(auth_state))
        .layer(Extension(pool))
}

fn admin_bearer() -> String {
    let claim = Claim::Admin {
        access_id: ACCESS_ID.to_string(),
    };
    token::encrypt_claim(&token::derive_key(SECRET), &claim).expect("admin token")
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_secs()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let parsed = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, parsed, cookie)
}

fn request(method: &str, uri: &str, auth: Option<&str>, payload: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        if auth.contains('=') {
            builder = builder.header(COOKIE, auth);
        } else {
            builder = builder.header(AUTHORIZATION, format!("Bearer {auth}"));
        }
    }
    let body = match payload {
        Some(payload) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(payload.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

#[tokio::test]
async fn user_registration_seed_handoff_and_login() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = test_app(pool);
    let admin = admin_bearer();

    // Admin registers alice; the response carries the generated seed.
    let alice = format!("alice-{}", Uuid::new_v4().simple());
    let (status, body, _) = send(
        &app,
        request(
            "POST",
            "/v1/users",
            Some(&admin),
            Some(json!({ "dom_name": alice, "full_name": "Alice" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let seed = body["seed"].as_str().expect("seed").to_string();

    // The seed is also available on the explicit per-user read.
    let (status, body, _) = send(
        &app,
        request("GET", &format!("/v1/users/{alice}"), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seed"], seed.as_str());

    // Alice computes the current code from her seed and logs in.
    let code = otp::code_at(&seed, unix_now()).expect("code");
    let (status, body, cookie) = send(
        &app,
        request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "name": alice, "otp": code })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");
    assert_eq!(body["subject"], alice.as_str());
    let cookie = cookie.expect("session cookie");

    // Her session authenticates, but she is not a system admin.
    let (status, _, _) = send(&app, request("GET", "/v1/auth/session", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&app, request("GET", "/v1/users", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A wrong code is rejected.
    let (status, _, _) = send(
        &app,
        request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "name": alice, "otp": "000000" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Duplicate registration conflicts without touching the first row.
    let (status, _, _) = send(
        &app,
        request(
            "POST",
            "/v1/users",
            Some(&admin),
            Some(json!({ "dom_name": alice, "full_name": "Imposter" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn group_admin_grant_controls_updates() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = test_app(pool);
    let admin = admin_bearer();

    let alice = format!("alice-{}", Uuid::new_v4().simple());
    let (status, body, _) = send(
        &app,
        request(
            "POST",
            "/v1/users",
            Some(&admin),
            Some(json!({ "dom_name": alice, "full_name": "Alice" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let seed = body["seed"].as_str().expect("seed").to_string();

    let code = otp::code_at(&seed, unix_now()).expect("code");
    let (status, _, cookie) = send(
        &app,
        request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({ "name": alice, "otp": code })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let alice_session = cookie.expect("session cookie");

    // Admin creates a group owned by alice.
    let (status, body, _) = send(
        &app,
        request(
            "POST",
            "/v1/groups",
            Some(&admin),
            Some(json!({ "name": "g1", "owner": alice })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["owner"], alice.as_str());
    let group_id = body["id"].as_str().expect("group id").to_string();

    // Owning a group grants nothing by itself: alice is not yet a group
    // admin and cannot update it.
    let (status, _, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/v1/groups/{group_id}"),
            Some(&alice_session),
            Some(json!({ "name": "renamed" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Admin grants alice group-admin; her retry succeeds.
    let (status, _, _) = send(
        &app,
        request(
            "POST",
            &format!("/v1/groups/{group_id}/members"),
            Some(&admin),
            Some(json!({ "dom_name": alice, "admin": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/v1/groups/{group_id}"),
            Some(&alice_session),
            Some(json!({ "name": "renamed" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "renamed");

    // Members can list the roster; the admin flag is scoped per group.
    let (status, body, _) = send(
        &app,
        request(
            "GET",
            &format!("/v1/groups/{group_id}/members"),
            Some(&alice_session),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let members = body.as_array().expect("members");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["dom_name"], alice.as_str());
    assert_eq!(members[0]["admin"], true);
}

#[tokio::test]
async fn membership_duplicates_and_absent_removals() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = test_app(pool);
    let admin = admin_bearer();

    let alice = format!("alice-{}", Uuid::new_v4().simple());
    let bob = format!("bob-{}", Uuid::new_v4().simple());
    for (name, full) in [(&alice, "Alice"), (&bob, "Bob")] {
        let (status, _, _) = send(
            &app,
            request(
                "POST",
                "/v1/users",
                Some(&admin),
                Some(json!({ "dom_name": name, "full_name": full })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body, _) = send(
        &app,
        request(
            "POST",
            "/v1/groups",
            Some(&admin),
            Some(json!({ "name": "g2", "owner": alice })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = body["id"].as_str().expect("group id").to_string();
    let members_uri = format!("/v1/groups/{group_id}/members");

    // Creating a group owned by an unknown user fails with 404.
    let (status, _, _) = send(
        &app,
        request(
            "POST",
            "/v1/groups",
            Some(&admin),
            Some(json!({ "name": "g3", "owner": "nobody" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &app,
        request(
            "POST",
            &members_uri,
            Some(&admin),
            Some(json!({ "dom_name": alice, "admin": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Second identical insert conflicts and leaves the row intact.
    let (status, _, _) = send(
        &app,
        request(
            "POST",
            &members_uri,
            Some(&admin),
            Some(json!({ "dom_name": alice, "admin": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body, _) = send(&app, request("GET", &members_uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("members").len(), 1);

    // Unknown user on removal is 404; removing a user who is simply not
    // a member is a no-op.
    let (status, _, _) = send(
        &app,
        request(
            "DELETE",
            &format!("{members_uri}/nobody"),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &app,
        request(
            "DELETE",
            &format!("{members_uri}/{bob}"),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Removing alice actually deletes the membership.
    let (status, _, _) = send(
        &app,
        request(
            "DELETE",
            &format!("{members_uri}/{alice}"),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body, _) = send(&app, request("GET", &members_uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("members").len(), 0);
}

#[tokio::test]
async fn group_listing_respects_active_filter() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = test_app(pool);
    let admin = admin_bearer();

    let carol = format!("carol-{}", Uuid::new_v4().simple());
    let (status, _, _) = send(
        &app,
        request(
            "POST",
            "/v1/users",
            Some(&admin),
            Some(json!({ "dom_name": carol, "full_name": "Carol" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let group_name = format!("team-{}", Uuid::new_v4().simple());
    let (status, body, _) = send(
        &app,
        request(
            "POST",
            "/v1/groups",
            Some(&admin),
            Some(json!({ "name": group_name, "owner": carol })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = body["id"].as_str().expect("group id").to_string();

    // Soft-deactivate; the group drops out of the active listing but
    // stays in the full one.
    let (status, body, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/v1/groups/{group_id}"),
            Some(&admin),
            Some(json!({ "active": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let in_listing = |body: &Value, id: &str| {
        body.as_array()
            .map(|groups| groups.iter().any(|group| group["id"] == id))
            .unwrap_or(false)
    };

    let (status, body, _) = send(
        &app,
        request("GET", "/v1/groups?active=true", Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!in_listing(&body, &group_id));

    let (status, body, _) = send(&app, request("GET", "/v1/groups", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(in_listing(&body, &group_id));
}
