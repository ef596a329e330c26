//! SCIM user routes.

use super::ApiJson;
use crate::error::ApiResult;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use unity_console_client::{ScimListResponse, ScimUser};
use unity_console_core::validation::{require_fields, validate_email};

const DEFAULT_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub start_index: Option<u64>,
    pub count: Option<u64>,
}

impl PageQuery {
    fn bounds(&self) -> (u64, u64) {
        (
            self.start_index.unwrap_or(1).max(1),
            self.count.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 1000),
        )
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<ScimListResponse<ScimUser>>> {
    let (start, count) = page.bounds();
    Ok(Json(state.client()?.list_users(start, count).await?))
}

/// Users of the whole account rather than one workspace.
pub async fn list_account_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<ScimListResponse<ScimUser>>> {
    let (start, count) = page.bounds();
    Ok(Json(state.account_client()?.list_users(start, count).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScimUser>> {
    Ok(Json(state.client()?.get_user(&id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user_name: Option<String>,
    pub display_name: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_fields(&[("userName", body.user_name.as_deref())])?;
    let user_name = body.user_name.unwrap_or_default().trim().to_string();
    validate_email(&user_name)?;

    let user = state
        .client()?
        .create_user(&ScimUser::new(user_name, body.display_name))
        .await?;
    tracing::info!(user = %user.user_name, "User created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "user": user }))))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.client()?.delete_user(&id).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(Json(json!({ "success": true })))
}
