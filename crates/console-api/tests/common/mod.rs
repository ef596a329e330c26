//! Shared harness for router tests: a wiremock Databricks workspace, a
//! manual clock and a mailer that records issued codes.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use unity_console_api::auth::{MailError, OtpMailer};
use unity_console_api::clock::ManualClock;
use unity_console_api::config::ServerConfig;
use unity_console_api::{build_router, AppState};
use wiremock::MockServer;

pub const SCIM: &str = "/api/2.0/preview/scim/v2";
pub const UC: &str = "/api/2.1/unity-catalog";

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn last_code(&self) -> Option<String> {
        self.sent.lock().last().map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl OtpMailer for RecordingMailer {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), MailError> {
        self.sent.lock().push((email.to_string(), code.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub server: MockServer,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
}

impl TestApp {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start against a fresh mock workspace, letting the caller tweak config.
    pub async fn start_with(tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let server = MockServer::start().await;
        let mut config = ServerConfig {
            databricks_host: Some(server.uri()),
            databricks_token: Some("dapi-test-token".to_string()),
            warehouse_id: Some("wh-1".to_string()),
            vendor_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        tweak(&mut config);

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
        ));
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::with_parts(config, clock.clone(), mailer.clone());

        Self {
            server,
            clock,
            mailer,
            state,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        auth_header: Option<&str>,
    ) -> (StatusCode, Value) {
        make_request(self.router(), method, path, body, auth_header).await
    }
}

/// Helper to make HTTP requests to the test app
pub async fn make_request(
    app: Router,
    method: &str,
    path: &str,
    body: Option<Value>,
    auth_header: Option<&str>,
) -> (StatusCode, Value) {
    let mut req_builder = Request::builder()
        .uri(path)
        .method(method)
        .header("Content-Type", "application/json");

    if let Some(auth) = auth_header {
        req_builder = req_builder.header(AUTHORIZATION, auth);
    }

    let body = match body {
        Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
        None => Body::empty(),
    };

    let request = req_builder.body(body).unwrap();
    send(app, request).await
}

/// Send a prepared request and decode the JSON body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = serde_json::from_slice(&body_bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).to_string()));

    (status, json)
}

pub const BOUNDARY: &str = "console-test-boundary";

/// Build a `multipart/form-data` request from text fields and one file.
pub fn multipart_request(path: &str, fields: &[(&str, &str)], file: (&str, &[u8])) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    let (file_name, data) = file;
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .uri(path)
        .method("POST")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
