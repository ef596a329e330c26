//! Login flows: e-mailed one-time codes, OAuth against the workspace OIDC
//! endpoints, and personal access tokens.
//!
//! All three end in an opaque bearer session token held in
//! [`SessionStores`](crate::sessions::SessionStores).

use crate::error::{ApiError, ApiResult};
use crate::routes::ApiJson;
use crate::sessions::{
    otp_code, random_token, LoginMethod, OAuthState, OtpRecord, OAUTH_STATE_TTL_MINUTES,
    OTP_MAX_ATTEMPTS, OTP_TTL_MINUTES, SESSION_TTL_HOURS,
};
use crate::AppState;
use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Duration;
use serde::Deserialize;
use serde_json::{json, Value};
use unity_console_client::{ClientConfig, DatabricksClient, ScimUser};
use unity_console_core::validation::{require_fields, validate_email};

#[derive(Debug, thiserror::Error)]
#[error("Failed to send verification email: {0}")]
pub struct MailError(pub String);

/// Delivers one-time codes.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), MailError>;
}

/// Mailer that writes codes to the log instead of sending them.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl OtpMailer for LogMailer {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), MailError> {
        tracing::info!(to = %email, from = %self.from, "Verification code issued");
        tracing::debug!(to = %email, code = %code, "Verification code");
        Ok(())
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Deserialize)]
pub struct OtpSendRequest {
    pub email: Option<String>,
}

pub async fn send_otp(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<OtpSendRequest>,
) -> ApiResult<Json<Value>> {
    require_fields(&[("email", body.email.as_deref())])?;
    let email = normalize_email(body.email.as_deref().unwrap_or_default());
    validate_email(&email)?;

    let code = otp_code();
    state.sessions.otps.insert(
        email.clone(),
        OtpRecord {
            code: code.clone(),
            attempts: 0,
        },
        Duration::minutes(OTP_TTL_MINUTES),
    );
    state
        .mailer
        .send_code(&email, &code)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Verification code sent to {}", email),
        "expiresIn": OTP_TTL_MINUTES * 60,
    })))
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

enum OtpCheck {
    Valid,
    Invalid { remaining: u32 },
    Locked,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<OtpVerifyRequest>,
) -> ApiResult<Json<Value>> {
    require_fields(&[
        ("email", body.email.as_deref()),
        ("code", body.code.as_deref()),
    ])?;
    let email = normalize_email(body.email.as_deref().unwrap_or_default());
    let code = body.code.as_deref().unwrap_or_default().trim().to_string();

    let check = state.sessions.otps.update(&email, |record| {
        if record.attempts >= OTP_MAX_ATTEMPTS {
            return OtpCheck::Locked;
        }
        if record.code == code {
            return OtpCheck::Valid;
        }
        record.attempts += 1;
        if record.attempts >= OTP_MAX_ATTEMPTS {
            OtpCheck::Locked
        } else {
            OtpCheck::Invalid {
                remaining: OTP_MAX_ATTEMPTS - record.attempts,
            }
        }
    });

    match check {
        None => Err(ApiError::Unauthorized(
            "Verification code expired or not found".to_string(),
        )),
        Some(OtpCheck::Locked) => {
            state.sessions.otps.remove(&email);
            tracing::warn!(email = %email, "Verification locked after repeated failures");
            Err(ApiError::RateLimited(
                "Too many failed attempts, request a new code".to_string(),
            ))
        }
        Some(OtpCheck::Invalid { remaining }) => Err(ApiError::Unauthorized(format!(
            "Invalid verification code ({} attempts remaining)",
            remaining
        ))),
        Some(OtpCheck::Valid) => {
            state.sessions.otps.remove(&email);
            let token = state
                .sessions
                .create_session(email.clone(), LoginMethod::Otp, None);
            tracing::info!(user = %email, "OTP login succeeded");
            Ok(Json(session_body(&token, &email, None)))
        }
    }
}

fn session_body(token: &str, user: &str, display_name: Option<&str>) -> Value {
    json!({
        "success": true,
        "token": token,
        "user": user,
        "displayName": display_name,
        "expiresIn": SESSION_TTL_HOURS * 3600,
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

/// Only same-origin paths are accepted as post-login targets.
fn safe_redirect(target: Option<String>) -> Option<String> {
    target.filter(|t| t.starts_with('/') && !t.starts_with("//"))
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> ApiResult<Redirect> {
    let (host, oauth) = match (&state.config.databricks_host, &state.config.oauth) {
        (Some(host), Some(oauth)) => (host, oauth),
        _ => {
            return Err(ApiError::NotConfigured(
                "DATABRICKS_HOST and DATABRICKS_OAUTH_CLIENT_ID are required for OAuth login"
                    .to_string(),
            ))
        }
    };

    let oauth_state = random_token();
    state.sessions.oauth_states.insert(
        oauth_state.clone(),
        OAuthState {
            redirect_to: safe_redirect(query.redirect),
        },
        Duration::minutes(OAUTH_STATE_TTL_MINUTES),
    );

    let url = format!(
        "{}/oidc/v1/authorize?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
        host.trim_end_matches('/'),
        urlencoding::encode(&oauth.client_id),
        urlencoding::encode(&oauth.redirect_uri),
        urlencoding::encode("all-apis offline_access"),
        urlencoding::encode(&oauth_state),
    );
    tracing::debug!("Redirecting to workspace OIDC authorize endpoint");
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Response> {
    if let Some(error) = query.error {
        return Err(ApiError::BadRequest(format!(
            "OAuth login failed: {}",
            query.error_description.unwrap_or(error)
        )));
    }
    require_fields(&[
        ("code", query.code.as_deref()),
        ("state", query.state.as_deref()),
    ])?;
    let code = query.code.unwrap_or_default();
    let oauth_state = state
        .sessions
        .oauth_states
        .take(query.state.as_deref().unwrap_or_default())
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired OAuth state".to_string()))?;

    let (host, oauth) = match (&state.config.databricks_host, &state.config.oauth) {
        (Some(host), Some(oauth)) => (host.trim_end_matches('/'), oauth),
        _ => {
            return Err(ApiError::NotConfigured(
                "OAuth login is not configured".to_string(),
            ))
        }
    };

    let form = format!(
        "grant_type=authorization_code&code={}&redirect_uri={}&client_id={}",
        urlencoding::encode(&code),
        urlencoding::encode(&oauth.redirect_uri),
        urlencoding::encode(&oauth.client_id),
    );
    let mut request = state
        .oauth_http
        .post(format!("{}/oidc/v1/token", host))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(form);
    if let Some(secret) = &oauth.client_secret {
        request = request.basic_auth(&oauth.client_id, Some(secret));
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Internal(format!("Token exchange failed: {}", e))
        }
    })?;
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "OAuth token exchange rejected");
        return Err(ApiError::Unauthorized(format!(
            "Token exchange rejected ({}): {}",
            status.as_u16(),
            text
        )));
    }
    let tokens: TokenResponse = response
        .json()
        .await
        .map_err(|e| ApiError::Internal(format!("Invalid token response: {}", e)))?;

    let user = identify(&state, &tokens.access_token).await?;
    let session = state.sessions.create_session(
        user.user_name.clone(),
        LoginMethod::Oauth,
        Some(tokens.access_token),
    );
    tracing::info!(user = %user.user_name, "OAuth login succeeded");

    match oauth_state.redirect_to {
        Some(target) => {
            let separator = if target.contains('?') { '&' } else { '?' };
            Ok(Redirect::to(&format!("{}{}session={}", target, separator, session)).into_response())
        }
        None => Ok(Json(session_body(
            &session,
            &user.user_name,
            user.display_name.as_deref(),
        ))
        .into_response()),
    }
}

/// Resolve the user behind an access token through SCIM `Me`.
async fn identify(state: &AppState, access_token: &str) -> ApiResult<ScimUser> {
    let host = state
        .config
        .databricks_host
        .clone()
        .ok_or_else(|| ApiError::NotConfigured("DATABRICKS_HOST".to_string()))?;
    let config = ClientConfig::builder(host)
        .token(access_token)
        .timeout(state.config.vendor_timeout)
        .build()?;
    let client = DatabricksClient::new(config)?;
    client.current_user().await.map_err(|e| match e.status() {
        Some(401) | Some(403) => ApiError::Unauthorized("Invalid Databricks token".to_string()),
        _ => ApiError::from(e),
    })
}

#[derive(Debug, Deserialize)]
pub struct TokenLoginRequest {
    pub token: Option<String>,
}

/// Log in with a personal access token.
pub async fn token_login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TokenLoginRequest>,
) -> ApiResult<Json<Value>> {
    require_fields(&[("token", body.token.as_deref())])?;
    let token = body.token.unwrap_or_default().trim().to_string();

    let user = identify(&state, &token).await?;
    let session = state
        .sessions
        .create_session(user.user_name.clone(), LoginMethod::Token, Some(token));
    tracing::info!(user = %user.user_name, "Token login succeeded");

    Ok(Json(session_body(
        &session,
        &user.user_name,
        user.display_name.as_deref(),
    )))
}

pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;
    let session = state
        .sessions
        .sessions
        .get(token)
        .ok_or_else(|| ApiError::Unauthorized("Session expired or not found".to_string()))?;

    Ok(Json(json!({
        "authenticated": true,
        "user": session.user,
        "method": session.method,
        "createdAt": session.created_at,
    })))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let removed = bearer_token(&headers)
        .map(|token| state.sessions.sessions.remove(token))
        .unwrap_or(false);
    Json(json!({ "success": true, "sessionEnded": removed }))
}
