//! Unity Catalog permission routes.

use super::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use unity_console_client::{PermissionsChange, PermissionsList, SecurableType};
use unity_console_core::validation::{normalize_privileges, require_fields};

fn securable(kind: &str) -> ApiResult<SecurableType> {
    kind.parse::<SecurableType>().map_err(ApiError::BadRequest)
}

pub async fn get_privileges(
    State(state): State<AppState>,
    Path((securable_type, full_name)): Path<(String, String)>,
) -> ApiResult<Json<PermissionsList>> {
    let kind = securable(&securable_type)?;
    Ok(Json(state.client()?.get_permissions(kind, &full_name).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegeChangeBody {
    pub securable_type: Option<String>,
    pub full_name: Option<String>,
    pub principal: Option<String>,
    #[serde(default)]
    pub privileges: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Grant,
    Revoke,
}

/// Validated grant or revoke, ready for the permissions API.
pub struct PrivilegeChange {
    pub securable: SecurableType,
    pub full_name: String,
    pub principal: String,
    pub privileges: Vec<String>,
}

impl PrivilegeChangeBody {
    pub fn validate(self) -> ApiResult<PrivilegeChange> {
        require_fields(&[
            ("securableType", self.securable_type.as_deref()),
            ("fullName", self.full_name.as_deref()),
            ("principal", self.principal.as_deref()),
        ])?;
        Ok(PrivilegeChange {
            securable: securable(self.securable_type.as_deref().unwrap_or_default())?,
            full_name: self.full_name.unwrap_or_default().trim().to_string(),
            principal: self.principal.unwrap_or_default().trim().to_string(),
            privileges: normalize_privileges(&self.privileges)?,
        })
    }
}

async fn apply(state: &AppState, change: PrivilegeChange, direction: Direction) -> ApiResult<Json<Value>> {
    let mut update = PermissionsChange {
        principal: change.principal.clone(),
        ..Default::default()
    };
    match direction {
        Direction::Grant => update.add = change.privileges.clone(),
        Direction::Revoke => update.remove = change.privileges.clone(),
    }

    let result = state
        .client()?
        .update_permissions(change.securable, &change.full_name, vec![update])
        .await?;
    tracing::info!(
        securable = %change.securable,
        full_name = %change.full_name,
        principal = %change.principal,
        privileges = ?change.privileges,
        direction = ?direction,
        "Permissions updated"
    );
    Ok(Json(json!({
        "success": true,
        "privilegeAssignments": result.privilege_assignments,
    })))
}

pub async fn grant(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PrivilegeChangeBody>,
) -> ApiResult<Json<Value>> {
    apply(&state, body.validate()?, Direction::Grant).await
}

pub async fn revoke(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PrivilegeChangeBody>,
) -> ApiResult<Json<Value>> {
    apply(&state, body.validate()?, Direction::Revoke).await
}

/// Grant through the same path as `POST /api/privileges/grant`.
pub async fn grant_change(state: &AppState, change: PrivilegeChange) -> ApiResult<Json<Value>> {
    apply(state, change, Direction::Grant).await
}

pub async fn revoke_change(state: &AppState, change: PrivilegeChange) -> ApiResult<Json<Value>> {
    apply(state, change, Direction::Revoke).await
}
