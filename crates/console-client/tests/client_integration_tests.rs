//! Integration tests for the Databricks client using wiremock.
//!
//! These tests verify:
//! - Request paths, bodies and auth headers for each API family
//! - Pagination across SCIM, Unity Catalog and Jobs listings
//! - Vendor error classification (already-exists, not-found, rate limits)
//! - Statement polling and DBFS staging

use serde_json::json;
use std::time::Duration;
use unity_console_client::{
    ClientConfig, ClientError, CreateTableRequest, DatabricksClient, PermissionsChange,
    SecurableType, DBFS_BLOCK_SIZE,
};
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_client(server: &MockServer) -> DatabricksClient {
    let config = ClientConfig::builder(server.uri())
        .token("dapi_test_token")
        .warehouse_id("wh-123")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    DatabricksClient::new(config).unwrap()
}

fn retrying_client(server: &MockServer) -> DatabricksClient {
    let config = ClientConfig::builder(server.uri())
        .token("dapi_test_token")
        .timeout(Duration::from_secs(5))
        .max_retries(2)
        .retry_initial_delay(Duration::from_millis(10))
        .retry_max_delay(Duration::from_millis(50))
        .build()
        .unwrap();
    DatabricksClient::new(config).unwrap()
}

// ============================================================================
// SCIM
// ============================================================================

#[tokio::test]
async fn test_list_users_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/preview/scim/v2/Users"))
        .and(query_param("startIndex", "1"))
        .and(query_param("count", "50"))
        .and(header("authorization", "Bearer dapi_test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalResults": 1,
            "startIndex": 1,
            "itemsPerPage": 1,
            "Resources": [{"id": "u1", "userName": "ada@example.com", "active": true}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let users = test_client(&server).list_users(1, 50).await.unwrap();
    assert_eq!(users.total_results, 1);
    assert_eq!(users.resources[0].user_name, "ada@example.com");
}

#[tokio::test]
async fn test_count_users_reads_total_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/preview/scim/v2/Users"))
        .and(query_param("count", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalResults": 42,
            "Resources": [{"id": "u1", "userName": "ada@example.com"}]
        })))
        .mount(&server)
        .await;

    assert_eq!(test_client(&server).count_users().await.unwrap(), 42);
}

#[tokio::test]
async fn test_account_scope_uses_account_prefix() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/accounts/acc-1/scim/v2/Users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalResults": 0,
            "Resources": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder(server.uri())
        .token("account_token")
        .account_id("acc-1")
        .build()
        .unwrap();
    let client = DatabricksClient::new(config).unwrap();
    let users = client.list_users(1, 100).await.unwrap();
    assert!(users.resources.is_empty());
}

#[tokio::test]
async fn test_create_user_conflict_is_already_exists() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/preview/scim/v2/Users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:Error"],
            "detail": "User with username ada@example.com already exists.",
            "status": "409"
        })))
        .mount(&server)
        .await;

    let user = unity_console_client::ScimUser::new("ada@example.com", None);
    let err = test_client(&server).create_user(&user).await.unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(err.status(), Some(409));
    assert!(err.vendor_message().contains("already exists"));
}

#[tokio::test]
async fn test_patch_group_members_body() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/2.0/preview/scim/v2/Groups/g1"))
        .and(body_json(json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
            "Operations": [
                {"op": "remove", "path": "members[value eq \"u9\"]"}
            ]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server)
        .patch_group_members("g1", &[], &["u9".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_user_no_content() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/2.0/preview/scim/v2/Users/u1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server).delete_user("u1").await.unwrap();
}

// ============================================================================
// Unity Catalog
// ============================================================================

#[tokio::test]
async fn test_list_tables_follows_page_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.1/unity-catalog/tables"))
        .and(query_param("page_token", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [{"name": "t3", "catalog_name": "main", "schema_name": "sales"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/2.1/unity-catalog/tables"))
        .and(query_param("catalog_name", "main"))
        .and(query_param("schema_name", "sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [
                {"name": "t1", "catalog_name": "main", "schema_name": "sales"},
                {"name": "t2", "catalog_name": "main", "schema_name": "sales"}
            ],
            "next_page_token": "p2"
        })))
        .mount(&server)
        .await;

    let tables = test_client(&server)
        .list_tables("main", "sales")
        .await
        .unwrap();
    let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["t1", "t2", "t3"]);
}

#[tokio::test]
async fn test_create_table_already_exists_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.1/unity-catalog/tables"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "TABLE_ALREADY_EXISTS",
            "message": "Table 'orders' already exists"
        })))
        .mount(&server)
        .await;

    let request = CreateTableRequest {
        name: "orders".into(),
        catalog_name: "main".into(),
        schema_name: "sales".into(),
        table_type: "MANAGED".into(),
        data_source_format: "DELTA".into(),
        ..Default::default()
    };
    let err = test_client(&server).create_table(&request).await.unwrap_err();
    assert_eq!(err.error_code(), Some("TABLE_ALREADY_EXISTS"));
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_get_catalog_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.1/unity-catalog/catalogs/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error_code": "CATALOG_DOES_NOT_EXIST",
            "message": "Catalog 'missing' does not exist."
        })))
        .mount(&server)
        .await;

    let err = test_client(&server).get_catalog("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_update_permissions_patch() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/2.1/unity-catalog/permissions/catalog/main"))
        .and(body_json(json!({
            "changes": [{"principal": "analysts", "add": ["USE_CATALOG"]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "privilege_assignments": [{"principal": "analysts", "privileges": ["USE_CATALOG"]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_client(&server)
        .update_permissions(
            SecurableType::Catalog,
            "main",
            vec![PermissionsChange {
                principal: "analysts".into(),
                add: vec!["USE_CATALOG".into()],
                remove: vec![],
            }],
        )
        .await
        .unwrap();
    assert_eq!(result.privilege_assignments[0].privileges, vec!["USE_CATALOG"]);
}

// ============================================================================
// Jobs & Clusters
// ============================================================================

#[tokio::test]
async fn test_list_jobs_paginates_while_has_more() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/list"))
        .and(query_param("page_token", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [{"job_id": 2}],
            "has_more": false
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [{"job_id": 1}],
            "has_more": true,
            "next_page_token": "next"
        })))
        .mount(&server)
        .await;

    let jobs = test_client(&server).list_jobs().await.unwrap();
    assert_eq!(jobs.iter().map(|j| j.job_id).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn test_cluster_events_posts_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/clusters/events"))
        .and(body_partial_json(json!({"cluster_id": "c-1", "order": "DESC", "limit": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [{"cluster_id": "c-1", "timestamp": 1700000000000i64, "type": "STARTING",
                        "details": {"user": "ada@example.com"}}]
        })))
        .mount(&server)
        .await;

    let events = test_client(&server)
        .cluster_events("c-1", None, 10)
        .await
        .unwrap();
    assert_eq!(events[0].user().as_deref(), Some("ada@example.com"));
}

// ============================================================================
// SQL & DBFS
// ============================================================================

#[tokio::test]
async fn test_execute_statement_polls_until_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/sql/statements"))
        .and(body_partial_json(json!({"warehouse_id": "wh-123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s-1",
            "status": {"state": "PENDING"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/sql/statements/s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s-1",
            "status": {"state": "SUCCEEDED"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = test_client(&server)
        .execute_statement("SELECT 1")
        .await
        .unwrap();
    assert_eq!(response.status.state, "SUCCEEDED");
}

#[tokio::test]
async fn test_execute_statement_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/sql/statements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s-2",
            "status": {"state": "FAILED", "error": {
                "error_code": "BAD_REQUEST",
                "message": "[PATH_NOT_FOUND] Path does not exist"
            }}
        })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .execute_statement("COPY INTO x FROM 'dbfs:/nope'")
        .await
        .unwrap_err();
    match err {
        ClientError::Statement { state, message, .. } => {
            assert_eq!(state, "FAILED");
            assert!(message.contains("PATH_NOT_FOUND"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_execute_statement_requires_warehouse() {
    let server = MockServer::start().await;
    let config = ClientConfig::builder(server.uri())
        .token("t")
        .build()
        .unwrap();
    let err = DatabricksClient::new(config)
        .unwrap()
        .execute_statement("SELECT 1")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotConfigured(_)));
}

#[tokio::test]
async fn test_dbfs_upload_chunks_blocks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/dbfs/create"))
        .and(body_partial_json(json!({"path": "/tmp/upload.csv", "overwrite": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"handle": 7})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/dbfs/add-block"))
        .and(body_partial_json(json!({"handle": 7})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/2.0/dbfs/close"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let data = vec![b'a'; DBFS_BLOCK_SIZE + 10];
    test_client(&server)
        .dbfs_upload("/tmp/upload.csv", &data)
        .await
        .unwrap();
}

// ============================================================================
// Retries & Rate Limits
// ============================================================================

#[tokio::test]
async fn test_rate_limited_without_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/clusters/list"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server).list_clusters().await.unwrap_err();
    match err {
        ClientError::RateLimited { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_server_error_retried_when_enabled() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/clusters/list"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/clusters/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clusters": [{"cluster_id": "c-1", "data_security_mode": "USER_ISOLATION"}]
        })))
        .mount(&server)
        .await;

    let clusters = retrying_client(&server).list_clusters().await.unwrap();
    assert_eq!(clusters.len(), 1);
}

#[tokio::test]
async fn test_transport_timeout_is_classified() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2.1/unity-catalog/catalogs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"catalogs": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::builder(server.uri())
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let err = DatabricksClient::new(config)
        .unwrap()
        .list_catalogs()
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}
