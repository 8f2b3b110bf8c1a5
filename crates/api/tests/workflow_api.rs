//! HTTP-level integration tests for workflow initiation and lifecycle.
//!
//! Covers the initiation happy path with automatic assignment, RBAC,
//! template checks, the custom-field submission contract, dependency-gated
//! assignment, and status transition validation.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, get_auth, post_json_auth, put_json_auth};
use elms_core::roles::UserRole;
use serde_json::{json, Value};
use sqlx::PgPool;

use elms_db::models::custom_field::CreateCustomField;
use elms_db::repositories::CustomFieldRepo;

async fn create_template(app: Router, token: &str, body: Value) -> Value {
    let response = post_json_auth(app, "/api/v1/templates", body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

fn initiation_body(template_id: i64) -> Value {
    json!({
        "templateId": template_id,
        "employeeName": "Jane Doe",
        "employeeEmail": "jane.doe@corp.example",
        "employeeRole": "Software Engineer",
        "customFieldValues": {},
    })
}

/// Initiation creates the instance, fans out tasks, assigns the first
/// wave, and moves the workflow to IN_PROGRESS.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_initiate_workflow(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (hr, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;
    common::create_test_user(&pool, "techie", UserRole::TechSupport).await;

    let template = create_template(
        app.clone(),
        &token,
        json!({
            "name": "Engineering Onboarding",
            "type": "ONBOARDING",
            "tasks": [
                { "taskName": "Collect documents", "assignedRole": "HR_ADMIN",
                  "sequenceOrder": 1, "isParallel": false, "dependencyTaskId": null },
                { "taskName": "Provision laptop", "assignedRole": "TECH_SUPPORT",
                  "sequenceOrder": 2, "isParallel": false, "dependencyTaskId": null },
            ],
        }),
    )
    .await;
    let template_id = template["id"].as_i64().unwrap();

    let response = post_json_auth(
        app.clone(),
        "/api/v1/workflows",
        initiation_body(template_id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let workflow_id = json["workflowInstanceId"].as_i64().unwrap();
    assert!(json["message"].as_str().unwrap().contains("2 tasks"));

    let response = get_auth(app, &format!("/api/v1/workflows/{workflow_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_json(response).await;
    assert_eq!(detail["employeeName"], "Jane Doe");
    assert_eq!(detail["workflowType"], "ONBOARDING");
    assert_eq!(detail["status"], "IN_PROGRESS");

    let tasks = detail["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    for task in tasks {
        assert_eq!(task["status"], "IN_PROGRESS");
        assert!(task["assignedUserId"].is_number(), "task must be assigned");
        assert!(task["dueDate"].is_string(), "assigned task gets a due date");
    }

    // Initial history row plus the first-assignment transition.
    let history = detail["stateHistory"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["newStatus"], "INITIATED");
    assert_eq!(history[1]["newStatus"], "IN_PROGRESS");

    // HR task routed to the HR admin.
    assert_eq!(tasks[0]["assignedUserId"], hr.id);
}

/// Only HR admins may initiate workflows; even administrators are refused.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_initiate_requires_hr_admin(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_hr, hr_token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;
    let (_admin, admin_token) =
        common::authed_user(app.clone(), &pool, "sysadmin", UserRole::Administrator).await;

    let template = create_template(
        app.clone(),
        &hr_token,
        json!({
            "name": "Minimal",
            "type": "OFFBOARDING",
            "tasks": [
                { "taskName": "Revoke access", "assignedRole": "TECH_SUPPORT",
                  "sequenceOrder": 1, "isParallel": false, "dependencyTaskId": null },
            ],
        }),
    )
    .await;
    let template_id = template["id"].as_i64().unwrap();

    let response = post_json_auth(
        app,
        "/api/v1/workflows",
        initiation_body(template_id),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Inactive templates cannot be instantiated; unknown ones are 404.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_initiate_template_checks(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_hr, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let template = create_template(
        app.clone(),
        &token,
        json!({
            "name": "Retired",
            "type": "ONBOARDING",
            "tasks": [
                { "taskName": "Only", "assignedRole": "HR_ADMIN",
                  "sequenceOrder": 1, "isParallel": false, "dependencyTaskId": null },
            ],
        }),
    )
    .await;
    let template_id = template["id"].as_i64().unwrap();

    let response = common::delete_auth(
        app.clone(),
        &format!("/api/v1/templates/{template_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/workflows",
        initiation_body(template_id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("inactive"));

    let response = post_json_auth(app, "/api/v1/workflows", initiation_body(999999), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Invalid employee details come back as a field-error map.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_initiate_field_validation(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_hr, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let body = json!({
        "templateId": 1,
        "employeeName": "",
        "employeeEmail": "not-an-email",
        "employeeRole": "Software Engineer",
        "customFieldValues": {},
    });
    let response = post_json_auth(app, "/api/v1/workflows", body, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    let field_errors = &json["fieldErrors"];
    assert_eq!(field_errors["employeeName"], "Employee name is required");
    assert_eq!(field_errors["employeeEmail"], "Employee email must be valid");
}

/// Values for fields hidden under the submitted values, and unknown keys,
/// never reach the stored instance.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_initiate_filters_hidden_custom_values(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_hr, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let template = create_template(
        app.clone(),
        &token,
        json!({
            "name": "With Fields",
            "type": "ONBOARDING",
            "tasks": [
                { "taskName": "Only", "assignedRole": "HR_ADMIN",
                  "sequenceOrder": 1, "isParallel": false, "dependencyTaskId": null },
            ],
        }),
    )
    .await;
    let template_id = template["id"].as_i64().unwrap();

    CustomFieldRepo::create(
        &pool,
        &CreateCustomField {
            template_id,
            name: "needsLaptop".into(),
            label: "Needs a laptop".into(),
            field_type: elms_core::custom_fields::FieldType::Boolean,
            required: false,
            default_value: None,
            select_options: None,
            conditional_rules: None,
            position: 0,
        },
    )
    .await
    .unwrap();
    CustomFieldRepo::create(
        &pool,
        &CreateCustomField {
            template_id,
            name: "laptopModel".into(),
            label: "Laptop model".into(),
            field_type: elms_core::custom_fields::FieldType::Text,
            required: false,
            default_value: None,
            select_options: None,
            conditional_rules: Some(json!([
                { "targetFieldName": "needsLaptop", "operator": "EQUALS", "value": true }
            ])),
            position: 1,
        },
    )
    .await
    .unwrap();

    let mut body = initiation_body(template_id);
    body["customFieldValues"] = json!({
        "needsLaptop": false,
        "laptopModel": "stale value",
        "rogueKey": "ignored",
    });
    let response = post_json_auth(app.clone(), "/api/v1/workflows", body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let workflow_id = body_json(response).await["workflowInstanceId"]
        .as_i64()
        .unwrap();

    let response = get_auth(app, &format!("/api/v1/workflows/{workflow_id}"), &token).await;
    let detail = body_json(response).await;
    let values = detail["customFieldValues"].as_object().unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values["needsLaptop"], json!(false));
}

/// A required, visible custom field left unfilled fails with a field error.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_initiate_requires_visible_required_fields(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_hr, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let template = create_template(
        app.clone(),
        &token,
        json!({
            "name": "Strict Fields",
            "type": "ONBOARDING",
            "tasks": [
                { "taskName": "Only", "assignedRole": "HR_ADMIN",
                  "sequenceOrder": 1, "isParallel": false, "dependencyTaskId": null },
            ],
        }),
    )
    .await;
    let template_id = template["id"].as_i64().unwrap();

    CustomFieldRepo::create(
        &pool,
        &CreateCustomField {
            template_id,
            name: "startDate".into(),
            label: "Start date".into(),
            field_type: elms_core::custom_fields::FieldType::Date,
            required: true,
            default_value: None,
            select_options: None,
            conditional_rules: None,
            position: 0,
        },
    )
    .await
    .unwrap();

    let response = post_json_auth(
        app,
        "/api/v1/workflows",
        initiation_body(template_id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["fieldErrors"]["customFieldValues.startDate"],
        "Start date is required"
    );
}

/// A dependent task is held back until its dependency completes, then
/// assigned automatically; when all tasks are done the workflow completes.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_dependency_gated_assignment_and_completion(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_hr, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;
    common::create_test_user(&pool, "techie", UserRole::TechSupport).await;

    // Create, then update to wire the dependency (ids exist only after create).
    let template = create_template(
        app.clone(),
        &token,
        json!({
            "name": "Gated",
            "type": "ONBOARDING",
            "tasks": [
                { "taskName": "Sign contract", "assignedRole": "HR_ADMIN",
                  "sequenceOrder": 1, "isParallel": false, "dependencyTaskId": null },
                { "taskName": "Create accounts", "assignedRole": "TECH_SUPPORT",
                  "sequenceOrder": 2, "isParallel": false, "dependencyTaskId": null },
            ],
        }),
    )
    .await;
    let template_id = template["id"].as_i64().unwrap();
    let first_id = template["tasks"][0]["id"].as_i64().unwrap();
    let second_id = template["tasks"][1]["id"].as_i64().unwrap();

    let update_body = json!({
        "name": "Gated",
        "type": "ONBOARDING",
        "isActive": true,
        "tasks": [
            { "id": first_id, "taskName": "Sign contract", "assignedRole": "HR_ADMIN",
              "sequenceOrder": 1, "isParallel": false, "dependencyTaskId": null },
            { "id": second_id, "taskName": "Create accounts", "assignedRole": "TECH_SUPPORT",
              "sequenceOrder": 2, "isParallel": false, "dependencyTaskId": first_id },
        ],
    });
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/templates/{template_id}"),
        update_body,
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/workflows",
        initiation_body(template_id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let workflow_id = json["workflowInstanceId"].as_i64().unwrap();
    assert!(
        json["message"].as_str().unwrap().contains("1 assigned"),
        "only the dependency-free task is assignable at initiation"
    );

    let response = get_auth(
        app.clone(),
        &format!("/api/v1/workflows/{workflow_id}"),
        &token,
    )
    .await;
    let detail = body_json(response).await;
    let tasks = detail["tasks"].as_array().unwrap();
    assert_eq!(tasks[0]["status"], "IN_PROGRESS");
    assert_eq!(tasks[1]["status"], "NOT_STARTED");
    assert!(tasks[1]["assignedUserId"].is_null());
    let first_task_id = tasks[0]["id"].as_i64().unwrap();

    // Completing the first task unlocks and assigns the second.
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/workflows/tasks/{first_task_id}/status"),
        json!({ "status": "COMPLETED" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(
        app.clone(),
        &format!("/api/v1/workflows/{workflow_id}"),
        &token,
    )
    .await;
    let detail = body_json(response).await;
    let tasks = detail["tasks"].as_array().unwrap();
    assert_eq!(tasks[1]["status"], "IN_PROGRESS");
    assert!(tasks[1]["assignedUserId"].is_number());
    let second_task_id = tasks[1]["id"].as_i64().unwrap();

    // Completing the last task completes the workflow.
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/workflows/tasks/{second_task_id}/status"),
        json!({ "status": "COMPLETED" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(app, &format!("/api/v1/workflows/{workflow_id}"), &token).await;
    let detail = body_json(response).await;
    assert_eq!(detail["status"], "COMPLETED");
    assert!(detail["completedAt"].is_string());
}

/// Illegal transitions are rejected for both workflows and tasks.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_status_transition_validation(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_hr, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let template = create_template(
        app.clone(),
        &token,
        json!({
            "name": "Transitions",
            "type": "ONBOARDING",
            "tasks": [
                { "taskName": "Only", "assignedRole": "HR_ADMIN",
                  "sequenceOrder": 1, "isParallel": false, "dependencyTaskId": null },
            ],
        }),
    )
    .await;
    let template_id = template["id"].as_i64().unwrap();

    let response = post_json_auth(
        app.clone(),
        "/api/v1/workflows",
        initiation_body(template_id),
        &token,
    )
    .await;
    let workflow_id = body_json(response).await["workflowInstanceId"]
        .as_i64()
        .unwrap();

    // The workflow is IN_PROGRESS after assignment; INITIATED is unreachable.
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/workflows/{workflow_id}/status"),
        json!({ "status": "INITIATED" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // BLOCKED is a legal stop, and the summary reflects the task counts.
    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/workflows/{workflow_id}/status"),
        json!({ "status": "BLOCKED", "notes": "Waiting on paperwork" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["status"], "BLOCKED");
    assert_eq!(summary["totalTasks"], 1);
    assert_eq!(summary["tasksInProgress"], 1);

    // Task side: IN_PROGRESS -> NOT_STARTED is illegal.
    let response = get_auth(
        app.clone(),
        &format!("/api/v1/workflows/{workflow_id}"),
        &token,
    )
    .await;
    let detail = body_json(response).await;
    let task_id = detail["tasks"][0]["id"].as_i64().unwrap();

    let response = put_json_auth(
        app,
        &format!("/api/v1/workflows/tasks/{task_id}/status"),
        json!({ "status": "NOT_STARTED" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// The list endpoint filters by status.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_workflows_status_filter(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_hr, token) = common::authed_user(app.clone(), &pool, "hradmin", UserRole::HrAdmin).await;

    let template = create_template(
        app.clone(),
        &token,
        json!({
            "name": "Listing",
            "type": "OFFBOARDING",
            "tasks": [
                { "taskName": "Only", "assignedRole": "LINE_MANAGER",
                  "sequenceOrder": 1, "isParallel": false, "dependencyTaskId": null },
            ],
        }),
    )
    .await;
    let template_id = template["id"].as_i64().unwrap();

    // No LINE_MANAGER user exists, so the task stays unassigned and the
    // workflow remains INITIATED.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/workflows",
        initiation_body(template_id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = get_auth(app.clone(), "/api/v1/workflows?status=INITIATED", &token).await;
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["workflowType"], "OFFBOARDING");

    let response = get_auth(app, "/api/v1/workflows?status=COMPLETED", &token).await;
    let json = body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}
