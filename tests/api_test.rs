mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use reviewer_service::api::{router, AppState};
use reviewer_service::engine::AssignmentEngine;

async fn setup_app() -> Router {
    let database = common::setup_test_db().await;
    router(
        AppState::new(AssignmentEngine::new(database)),
        Duration::from_secs(30),
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn add_backend_team(app: &Router) {
    let (status, _) = post(
        app,
        "/team/add",
        json!({
            "team_name": "backend",
            "members": [
                {"user_id": "author", "username": "Alice", "is_active": true},
                {"user_id": "u1", "username": "Bob", "is_active": true},
                {"user_id": "u2", "username": "Carol", "is_active": true},
                {"user_id": "u3", "username": "Dave", "is_active": true}
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_health() {
    let app = setup_app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_team_add_and_get() {
    let app = setup_app().await;
    add_backend_team(&app).await;

    let (status, body) = get(&app, "/team/get?team_name=backend").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team_name"], "backend");
    assert_eq!(body["members"].as_array().unwrap().len(), 4);
    assert_eq!(body["members"][0]["username"], "Alice");

    let (status, body) = post(
        &app,
        "/team/add",
        json!({"team_name": "backend", "members": [{"user_id": "x", "username": "X", "is_active": true}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "TEAM_EXISTS");

    let (status, body) = get(&app, "/team/get?team_name=missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = get(&app, "/team/get").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_pull_request_lifecycle() {
    let app = setup_app().await;
    add_backend_team(&app).await;

    let (status, body) = post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "pr-1", "pull_request_name": "Add search", "author_id": "author"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pr"]["status"], "OPEN");
    assert!(body["pr"].get("mergedAt").is_none());
    assert!(body["pr"]["createdAt"].is_string());
    let reviewers = body["pr"]["assigned_reviewers"].as_array().unwrap().clone();
    assert_eq!(reviewers.len(), 2);
    assert!(!reviewers.contains(&json!("author")));

    let (status, body) = post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "pr-1", "pull_request_name": "Again", "author_id": "author"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "PR_EXISTS");

    let old = reviewers[0].as_str().unwrap().to_string();
    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "pr-1", "old_user_id": old}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["replaced_by"], json!(old));
    assert_eq!(body["pr"]["assigned_reviewers"].as_array().unwrap().len(), 2);

    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "pr-1", "old_user_id": "author"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NOT_ASSIGNED");

    let (status, body) = post(&app, "/pullRequest/merge", json!({"pull_request_id": "pr-1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pr"]["status"], "MERGED");
    let merged_at = body["pr"]["mergedAt"].clone();
    assert!(merged_at.is_string());

    let (status, body) = post(&app, "/pullRequest/merge", json!({"pull_request_id": "pr-1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pr"]["mergedAt"], merged_at);

    let reviewer = body["pr"]["assigned_reviewers"][0].as_str().unwrap().to_string();
    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "pr-1", "old_user_id": reviewer}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "PR_MERGED");

    let (status, body) = get(&app, &format!("/users/getReview?user_id={}", reviewer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], json!(reviewer));
    assert_eq!(body["pull_requests"][0]["pull_request_id"], "pr-1");
}

#[tokio::test]
async fn test_no_candidate_maps_to_conflict() {
    let app = setup_app().await;
    post(
        &app,
        "/team/add",
        json!({
            "team_name": "pair",
            "members": [
                {"user_id": "a", "username": "A", "is_active": true},
                {"user_id": "b", "username": "B", "is_active": true}
            ]
        }),
    )
    .await;
    post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "pr-1", "pull_request_name": "Tiny", "author_id": "a"}),
    )
    .await;

    let (status, body) = post(
        &app,
        "/pullRequest/reassign",
        json!({"pull_request_id": "pr-1", "old_user_id": "b"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NO_CANDIDATE");
}

#[tokio::test]
async fn test_set_active_and_mass_deactivate() {
    let app = setup_app().await;
    add_backend_team(&app).await;

    let (status, body) = post(&app, "/users/setIsActive", json!({"user_id": "u3", "is_active": false})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["is_active"], false);
    assert_eq!(body["user"]["team_name"], "backend");

    let (status, body) = post(&app, "/users/setIsActive", json!({"user_id": "ghost", "is_active": false})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = post(
        &app,
        "/team/users/deactivate",
        json!({"team_name": "backend", "user_ids": ["u1", "u2"]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let active: Vec<&Value> = body["team"]["members"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["is_active"] == true)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["user_id"], "author");

    let (status, body) = post(
        &app,
        "/team/users/deactivate",
        json!({"team_name": "ghosts", "user_ids": ["u1"]}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_request_validation() {
    let app = setup_app().await;

    let (status, body) = post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "bad id", "pull_request_name": "x", "author_id": "a"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let (status, body) = post(
        &app,
        "/team/users/deactivate",
        json!({"team_name": "backend", "user_ids": []}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let too_many: Vec<String> = (0..201).map(|i| format!("u{}", i)).collect();
    let (status, body) = post(
        &app,
        "/team/users/deactivate",
        json!({"team_name": "backend", "user_ids": too_many}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let long_id = "x".repeat(256);
    let (status, _) = post(&app, "/pullRequest/merge", json!({"pull_request_id": long_id})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/pullRequest/merge")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let (status, body) = post(&app, "/pullRequest/merge", json!({"wrong": "field"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_statistics_endpoint() {
    let app = setup_app().await;
    add_backend_team(&app).await;
    post(
        &app,
        "/pullRequest/create",
        json!({"pull_request_id": "pr-1", "pull_request_name": "Stats", "author_id": "author"}),
    )
    .await;

    let (status, body) = get(&app, "/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_prs"], 1);
    assert_eq!(body["total_assignments"], 2);
    assert_eq!(body["active_users"], 4);
    assert_eq!(body["teams"], 1);
}
