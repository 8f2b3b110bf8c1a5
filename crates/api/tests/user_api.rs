//! HTTP-level integration tests for user management endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get_auth, post_json, post_json_auth, put_json_auth};
use elms_core::roles::UserRole;
use sqlx::PgPool;

/// HR admins can create users; the response carries no password material.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_user(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_admin, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let body = serde_json::json!({
        "username": "newhire.manager",
        "email": "manager@corp.example",
        "password": "a-strong-password",
        "role": "LINE_MANAGER",
    });
    let response = post_json_auth(app, "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["username"], "newhire.manager");
    assert_eq!(json["role"], "LINE_MANAGER");
    assert_eq!(json["isActive"], true);
    assert!(json.get("passwordHash").is_none(), "hash must never leak");
    assert!(json.get("password_hash").is_none(), "hash must never leak");
}

/// A duplicate username is a 409 with an "already exists" message.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_user_duplicate_username_conflict(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_admin, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let body = serde_json::json!({
        "username": "taken",
        "email": "first@corp.example",
        "password": "a-strong-password",
        "role": "TECH_SUPPORT",
    });
    let response = post_json_auth(app.clone(), "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = serde_json::json!({
        "username": "taken",
        "email": "second@corp.example",
        "password": "a-strong-password",
        "role": "TECH_SUPPORT",
    });
    let response = post_json_auth(app, "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Username already exists"));
}

/// A duplicate email is also a 409.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_user_duplicate_email_conflict(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_admin, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let body = serde_json::json!({
        "username": "alpha",
        "email": "shared@corp.example",
        "password": "a-strong-password",
        "role": "LINE_MANAGER",
    });
    let response = post_json_auth(app.clone(), "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = serde_json::json!({
        "username": "bravo",
        "email": "shared@corp.example",
        "password": "a-strong-password",
        "role": "LINE_MANAGER",
    });
    let response = post_json_auth(app, "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// A too-short password is rejected with 400.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_user_weak_password(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_admin, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let body = serde_json::json!({
        "username": "weakling",
        "email": "weak@corp.example",
        "password": "short",
        "role": "TECH_SUPPORT",
    });
    let response = post_json_auth(app, "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Non-admin roles cannot manage users.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_user_management_requires_admin_role(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_user, token) =
        common::authed_user(app.clone(), &pool, "justamanager", UserRole::LineManager).await;

    let response = get_auth(app.clone(), "/api/v1/users", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = serde_json::json!({
        "username": "sneaky",
        "email": "sneaky@corp.example",
        "password": "a-strong-password",
        "role": "ADMINISTRATOR",
    });
    let response = post_json_auth(app, "/api/v1/users", body, &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Update changes role/active flags; unknown ids are 404.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_update_user(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_admin, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;
    let target = common::create_test_user(&pool, "target", UserRole::TechSupport).await;

    let body = serde_json::json!({ "role": "LINE_MANAGER", "isActive": false });
    let response =
        put_json_auth(app.clone(), &format!("/api/v1/users/{}", target.id), body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["role"], "LINE_MANAGER");
    assert_eq!(json["isActive"], false);

    let body = serde_json::json!({ "isActive": true });
    let response = put_json_auth(app, "/api/v1/users/999999", body, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Deactivation is a soft delete and blocks subsequent logins.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_deactivate_user(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_admin, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;
    let target = common::create_test_user(&pool, "shortlived", UserRole::TechSupport).await;

    let response = delete_auth(app.clone(), &format!("/api/v1/users/{}", target.id), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body =
        serde_json::json!({ "username": "shortlived", "password": common::TEST_PASSWORD });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Password change requires the current password and revokes sessions.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_change_password(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (admin, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let body = serde_json::json!({
        "currentPassword": "not-the-password",
        "newPassword": "brand-new-password",
    });
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/users/{}/change-password", admin.id),
        body,
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = serde_json::json!({
        "currentPassword": common::TEST_PASSWORD,
        "newPassword": "brand-new-password",
    });
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/users/{}/change-password", admin.id),
        body,
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Old password no longer works; the new one does.
    let body = serde_json::json!({ "username": "hradmin", "password": common::TEST_PASSWORD });
    let response = post_json(app.clone(), "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = serde_json::json!({ "username": "hradmin", "password": "brand-new-password" });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
}
