//! Login flows end to end: one-time codes, personal access tokens and
//! the OAuth redirect round trip.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Duration;
use common::{TestApp, SCIM};
use serde_json::json;
use tower::ServiceExt;
use unity_console_api::config::OAuthConfig;
use wiremock::matchers::{body_string_contains, header as header_eq, method, path};
use wiremock::{Mock, ResponseTemplate};

fn wrong_code(code: &str) -> String {
    if code == "000000" {
        "111111".to_string()
    } else {
        "000000".to_string()
    }
}

async fn issue_code(app: &TestApp, email: &str) -> String {
    let (status, body) = app
        .request("POST", "/api/auth/otp/send", Some(json!({ "email": email })), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    app.mailer.last_code().expect("code should have been mailed")
}

/// GET without following redirects, returning status and `Location`.
async fn get_redirect(app: &TestApp, uri: &str) -> (StatusCode, Option<String>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    (response.status(), location)
}

fn query_value(url: &str, key: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

// ============================================================================
// One-time codes
// ============================================================================

#[tokio::test]
async fn test_otp_login_session_and_logout() {
    let app = TestApp::start().await;
    let code = issue_code(&app, " Alice@Example.com ").await;
    assert_eq!(code.len(), 6);

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/otp/verify",
            Some(json!({ "email": "alice@example.com", "code": wrong_code(&code) })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("4 attempts remaining"));

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/otp/verify",
            Some(json!({ "email": "alice@example.com", "code": code })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "alice@example.com");
    let token = body["token"].as_str().unwrap().to_string();
    let bearer = format!("Bearer {}", token);

    let (status, body) = app.request("GET", "/api/auth/session", None, Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["method"], "otp");

    let (status, body) = app.request("POST", "/api/auth/logout", None, Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionEnded"], true);

    let (status, _) = app.request("GET", "/api/auth/session", None, Some(&bearer)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_otp_code_is_single_use() {
    let app = TestApp::start().await;
    let code = issue_code(&app, "bob@example.com").await;
    let body = json!({ "email": "bob@example.com", "code": code });

    let (status, _) = app
        .request("POST", "/api/auth/otp/verify", Some(body.clone()), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request("POST", "/api/auth/otp/verify", Some(body), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_otp_locks_after_repeated_failures() {
    let app = TestApp::start().await;
    let code = issue_code(&app, "carol@example.com").await;
    let wrong = json!({ "email": "carol@example.com", "code": wrong_code(&code) });

    for _ in 0..4 {
        let (status, _) = app
            .request("POST", "/api/auth/otp/verify", Some(wrong.clone()), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _) = app
        .request("POST", "/api/auth/otp/verify", Some(wrong), None)
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // The record is gone, so even the right code no longer works.
    let (status, _) = app
        .request(
            "POST",
            "/api/auth/otp/verify",
            Some(json!({ "email": "carol@example.com", "code": code })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_otp_expires() {
    let app = TestApp::start().await;
    let code = issue_code(&app, "dave@example.com").await;
    app.clock.advance(Duration::minutes(11));

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/otp/verify",
            Some(json!({ "email": "dave@example.com", "code": code })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn test_otp_send_rejects_bad_email() {
    let app = TestApp::start().await;

    let (status, _) = app
        .request("POST", "/api/auth/otp/send", Some(json!({ "email": "nobody" })), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.mailer.last_code().is_none());
}

#[tokio::test]
async fn test_session_expires_after_a_day() {
    let app = TestApp::start().await;
    let code = issue_code(&app, "erin@example.com").await;
    let (_, body) = app
        .request(
            "POST",
            "/api/auth/otp/verify",
            Some(json!({ "email": "erin@example.com", "code": code })),
            None,
        )
        .await;
    let bearer = format!("Bearer {}", body["token"].as_str().unwrap());

    app.clock.advance(Duration::hours(25));
    let (status, _) = app.request("GET", "/api/auth/session", None, Some(&bearer)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Personal access tokens
// ============================================================================

#[tokio::test]
async fn test_token_login() {
    let app = TestApp::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SCIM}/Me")))
        .and(header_eq("authorization", "Bearer dapi-personal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "userName": "frank@example.com",
            "displayName": "Frank"
        })))
        .mount(&app.server)
        .await;

    let (status, body) = app
        .request("POST", "/api/auth/token", Some(json!({ "token": "dapi-personal" })), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "frank@example.com");
    assert_eq!(body["displayName"], "Frank");

    let bearer = format!("Bearer {}", body["token"].as_str().unwrap());
    let (status, body) = app.request("GET", "/api/auth/session", None, Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "token");
}

#[tokio::test]
async fn test_token_login_rejects_invalid_token() {
    let app = TestApp::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{SCIM}/Me")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error_code": "UNAUTHENTICATED",
            "message": "Invalid access token."
        })))
        .mount(&app.server)
        .await;

    let (status, body) = app
        .request("POST", "/api/auth/token", Some(json!({ "token": "dapi-bad" })), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid Databricks token");
}

// ============================================================================
// OAuth
// ============================================================================

fn with_oauth(config: &mut unity_console_api::config::ServerConfig) {
    config.oauth = Some(OAuthConfig {
        client_id: "console-app".to_string(),
        client_secret: None,
        redirect_uri: "http://localhost:8080/api/auth/callback".to_string(),
    });
}

#[tokio::test]
async fn test_oauth_round_trip() {
    let app = TestApp::start_with(with_oauth).await;
    Mock::given(method("POST"))
        .and(path("/oidc/v1/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "oauth-access",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SCIM}/Me")))
        .and(header_eq("authorization", "Bearer oauth-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u7",
            "userName": "grace@example.com"
        })))
        .mount(&app.server)
        .await;

    let (status, location) = get_redirect(&app, "/api/auth/login?redirect=/dashboard").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let location = location.unwrap();
    assert!(location.starts_with(&format!("{}/oidc/v1/authorize?", app.server.uri())));
    assert_eq!(query_value(&location, "client_id").as_deref(), Some("console-app"));
    let state = query_value(&location, "state").unwrap();

    let (status, location) = get_redirect(
        &app,
        &format!("/api/auth/callback?code=auth-code-1&state={}", state),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let location = location.unwrap();
    assert!(location.starts_with("/dashboard?session="));

    let token = location.trim_start_matches("/dashboard?session=");
    let (status, body) = app
        .request("GET", "/api/auth/session", None, Some(&format!("Bearer {}", token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "grace@example.com");
    assert_eq!(body["method"], "oauth");

    // States are single use.
    let (status, _) = app
        .request(
            "GET",
            &format!("/api/auth/callback?code=auth-code-1&state={}", state),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oauth_login_drops_external_redirect() {
    let app = TestApp::start_with(with_oauth).await;
    Mock::given(method("POST"))
        .and(path("/oidc/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "at" })))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SCIM}/Me")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u8",
            "userName": "heidi@example.com"
        })))
        .mount(&app.server)
        .await;

    let (_, location) =
        get_redirect(&app, "/api/auth/login?redirect=https://evil.example/steal").await;
    let state = query_value(&location.unwrap(), "state").unwrap();

    // Without a safe redirect target the session comes back as JSON.
    let (status, body) = app
        .request(
            "GET",
            &format!("/api/auth/callback?code=c&state={}", state),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], "heidi@example.com");
}

#[tokio::test]
async fn test_oauth_provider_error() {
    let app = TestApp::start_with(with_oauth).await;

    let (status, body) = app
        .request(
            "GET",
            "/api/auth/callback?error=access_denied&error_description=User%20cancelled",
            None,
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("User cancelled"));
}

#[tokio::test]
async fn test_oauth_not_configured() {
    let app = TestApp::start().await;

    let (status, _) = app.request("GET", "/api/auth/login", None, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
