//! Schema routes.

use super::catalogs::ForceQuery;
use super::{split_full_name, ApiJson};
use crate::error::ApiResult;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use unity_console_client::CreateSchemaRequest;
use unity_console_core::validation::{require_fields, validate_object_name};

pub async fn list_schemas(
    State(state): State<AppState>,
    Path(catalog): Path<String>,
) -> ApiResult<Json<Value>> {
    let schemas = state.client()?.list_schemas(&catalog).await?;
    Ok(Json(json!({ "catalog": catalog, "schemas": schemas })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchemaBody {
    pub catalog_name: Option<String>,
    pub name: Option<String>,
    pub comment: Option<String>,
}

pub async fn create_schema(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateSchemaBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_fields(&[
        ("catalogName", body.catalog_name.as_deref()),
        ("name", body.name.as_deref()),
    ])?;
    let catalog = body.catalog_name.unwrap_or_default().trim().to_string();
    let name = body.name.unwrap_or_default().trim().to_string();
    validate_object_name(&catalog, "Catalog")?;
    validate_object_name(&name, "Schema")?;

    let request = CreateSchemaRequest {
        name: name.clone(),
        catalog_name: catalog.clone(),
        comment: body.comment,
    };
    match state.client()?.create_schema(&request).await {
        Ok(schema) => {
            tracing::info!(catalog = %catalog, schema = %name, "Schema created");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "success": true, "created": true, "schema": schema })),
            ))
        }
        Err(e) if e.is_already_exists() => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "created": false,
                "message": format!("Schema '{}.{}' already exists", catalog, name),
            })),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_schema(
    State(state): State<AppState>,
    Path(full_name): Path<String>,
    Query(query): Query<ForceQuery>,
) -> ApiResult<Json<Value>> {
    split_full_name(&full_name, 2)?;
    state.client()?.delete_schema(&full_name, query.force).await?;
    tracing::info!(schema = %full_name, "Schema deleted");
    Ok(Json(json!({ "success": true })))
}
