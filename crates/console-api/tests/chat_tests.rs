//! `/api/chat` command execution against a mocked workspace.

mod common;

use axum::http::StatusCode;
use common::{TestApp, SCIM, UC};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn chat(app: &TestApp, message: &str) -> (StatusCode, serde_json::Value) {
    app.request("POST", "/api/chat", Some(json!({ "message": message })), None)
        .await
}

#[tokio::test]
async fn test_list_catalogs() {
    let app = TestApp::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{UC}/catalogs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "catalogs": [{ "name": "main" }, { "name": "dev" }]
        })))
        .mount(&app.server)
        .await;

    let (status, body) = chat(&app, "Show me catalogs").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "list_catalogs");
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Found 2 catalog(s): main, dev");
    assert_eq!(body["data"][1]["name"], "dev");
}

#[tokio::test]
async fn test_add_user_to_group_resolves_names() {
    let app = TestApp::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SCIM}/Users")))
        .and(query_param("filter", "userName eq \"ann@example.com\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalResults": 1,
            "Resources": [{ "id": "u42", "userName": "ann@example.com" }]
        })))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SCIM}/Groups")))
        .and(query_param("filter", "displayName eq \"data-eng\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalResults": 1,
            "Resources": [{ "id": "g7", "displayName": "data-eng" }]
        })))
        .mount(&app.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{SCIM}/Groups/g7")))
        .and(body_partial_json(json!({
            "Operations": [{ "op": "add", "path": "members", "value": [{ "value": "u42" }] }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = chat(&app, "add ann@example.com to group data-eng").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "add_user_to_group");
    assert_eq!(body["message"], "Added 'ann@example.com' to group 'data-eng'");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let app = TestApp::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SCIM}/Users")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalResults": 0,
            "Resources": []
        })))
        .mount(&app.server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&app.server)
        .await;

    let (status, body) = chat(&app, "remove user ghost@example.com").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User 'ghost@example.com' not found");
}

#[tokio::test]
async fn test_create_schema_with_spoken_dot() {
    let app = TestApp::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{UC}/schemas")))
        .and(body_partial_json(json!({ "name": "sales", "catalog_name": "main" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "sales",
            "catalog_name": "main"
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = chat(&app, "create schema main dot sales").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "create_schema");
    assert_eq!(body["message"], "Schema 'main.sales' created");
}

#[tokio::test]
async fn test_existing_catalog_reported_as_success() {
    let app = TestApp::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{UC}/catalogs")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "CATALOG_ALREADY_EXISTS",
            "message": "Catalog 'main' already exists"
        })))
        .mount(&app.server)
        .await;

    let (status, body) = chat(&app, "create catalog main").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Catalog 'main' already exists");
}

#[tokio::test]
async fn test_grant_through_chat() {
    let app = TestApp::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{UC}/permissions/table/main.sales.orders")))
        .and(body_partial_json(json!({
            "changes": [{ "principal": "analysts", "add": ["SELECT", "MODIFY"] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "privilege_assignments": [
                { "principal": "analysts", "privileges": ["SELECT", "MODIFY"] }
            ]
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = chat(&app, "grant select and modify on table main.sales.orders to analysts").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "grant");
    assert_eq!(body["data"]["privilegeAssignments"][0]["principal"], "analysts");
}

#[tokio::test]
async fn test_workspace_summary_uses_cache() {
    let app = TestApp::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{UC}/catalogs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "catalogs": [{ "name": "main" }]
        })))
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SCIM}/Users")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalResults": 5,
            "Resources": []
        })))
        .mount(&app.server)
        .await;

    let (status, body) = chat(&app, "workspace summary for the last day").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "workspace_summary");
    assert!(body["message"].as_str().unwrap().contains("1 catalogs"));
    assert_eq!(body["data"]["totalUsers"], 5);

    // Served from the same cache slot as the dashboard.
    let (status, stats) = app
        .request("GET", "/api/workspace/stats?timeFilter=day", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalUsers"], 5);
}

#[tokio::test]
async fn test_unknown_command_returns_help() {
    let app = TestApp::start().await;

    let (status, body) = chat(&app, "make me a sandwich").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "unknown");
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("Available commands"));
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let app = TestApp::start().await;

    let (status, body) = chat(&app, "   ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["missingFields"], json!(["message"]));
}
