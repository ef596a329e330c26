//! SCIM group routes.
//!
//! Membership changes go through a single SCIM PatchOp; removal uses the
//! `members[value eq "<id>"]` filter path. Every membership PATCH runs under
//! the configured group deadline and answers 504 when it elapses.

use super::{with_deadline, ApiJson};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use unity_console_client::{ScimGroup, ScimListResponse};
use unity_console_core::validation::require_fields;

pub async fn list_groups(
    State(state): State<AppState>,
) -> ApiResult<Json<ScimListResponse<ScimGroup>>> {
    Ok(Json(state.client()?.list_groups().await?))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScimGroup>> {
    Ok(Json(state.client()?.get_group(&id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub display_name: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

pub async fn create_group(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_fields(&[("displayName", body.display_name.as_deref())])?;
    let name = body.display_name.unwrap_or_default().trim().to_string();

    let group = state
        .client()?
        .create_group(&ScimGroup::new(name, &body.members))
        .await?;
    tracing::info!(group = %group.display_name, "Group created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "group": group }))))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.client()?.delete_group(&id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct PatchGroupRequest {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
}

/// Apply membership changes under the group deadline.
pub async fn patch_members(
    state: &AppState,
    group_id: &str,
    add: &[String],
    remove: &[String],
) -> ApiResult<()> {
    let client = state.client()?;
    with_deadline(
        state.config.group_patch_timeout,
        client.patch_group_members(group_id, add, remove),
    )
    .await
    .map_err(|e| {
        if matches!(e, ApiError::Timeout) {
            tracing::warn!(
                group_id = %group_id,
                timeout_secs = state.config.group_patch_timeout.as_secs_f64(),
                "Group PATCH cancelled"
            );
        }
        e
    })?;
    tracing::info!(
        group_id = %group_id,
        added = add.len(),
        removed = remove.len(),
        "Group membership updated"
    );
    Ok(())
}

pub async fn patch_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PatchGroupRequest>,
) -> ApiResult<Json<Value>> {
    if body.add.is_empty() && body.remove.is_empty() {
        return Err(ApiError::MissingFields(vec![
            "add".to_string(),
            "remove".to_string(),
        ]));
    }
    patch_members(&state, &id, &body.add, &body.remove).await?;
    Ok(Json(json!({
        "success": true,
        "added": body.add,
        "removed": body.remove,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Option<String>,
}

pub async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AddMemberRequest>,
) -> ApiResult<Json<Value>> {
    require_fields(&[("userId", body.user_id.as_deref())])?;
    let user_id = body.user_id.unwrap_or_default();
    patch_members(&state, &id, std::slice::from_ref(&user_id), &[]).await?;
    Ok(Json(json!({ "success": true, "groupId": id, "userId": user_id })))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    patch_members(&state, &id, &[], std::slice::from_ref(&user_id)).await?;
    Ok(Json(json!({ "success": true, "groupId": id, "userId": user_id })))
}
