//! Table routes.

use super::{split_full_name, ApiJson};
use crate::error::{ApiError, ApiResult};
use crate::saga::ColumnSpec;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use unity_console_client::{ColumnInfo, CreateTableRequest, Table};
use unity_console_core::validation::{require_fields, validate_object_name, validate_s3_path};

pub async fn list_tables(
    State(state): State<AppState>,
    Path((catalog, schema)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let tables = state.client()?.list_tables(&catalog, &schema).await?;
    Ok(Json(json!({
        "catalog": catalog,
        "schema": schema,
        "count": tables.len(),
        "tables": tables,
    })))
}

pub async fn get_table(
    State(state): State<AppState>,
    Path(full_name): Path<String>,
) -> ApiResult<Json<Table>> {
    split_full_name(&full_name, 3)?;
    Ok(Json(state.client()?.get_table(&full_name).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableBody {
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    /// External data location; makes the table `EXTERNAL`
    pub source_path: Option<String>,
    pub data_source_format: Option<String>,
    pub comment: Option<String>,
}

pub async fn create_table(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateTableBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_fields(&[
        ("catalogName", body.catalog_name.as_deref()),
        ("schemaName", body.schema_name.as_deref()),
        ("name", body.name.as_deref()),
    ])?;
    let catalog = body.catalog_name.unwrap_or_default().trim().to_string();
    let schema = body.schema_name.unwrap_or_default().trim().to_string();
    let name = body.name.unwrap_or_default().trim().to_string();
    validate_object_name(&catalog, "Catalog")?;
    validate_object_name(&schema, "Schema")?;
    validate_object_name(&name, "Table")?;
    if body.columns.is_empty() {
        return Err(ApiError::MissingFields(vec!["columns".to_string()]));
    }

    let source_path = body
        .source_path
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if let Some(path) = &source_path {
        validate_s3_path(path)?;
    }
    let format = body
        .data_source_format
        .map(|f| f.trim().to_uppercase())
        .unwrap_or_else(|| "DELTA".to_string());

    let request = CreateTableRequest {
        name: name.clone(),
        catalog_name: catalog.clone(),
        schema_name: schema.clone(),
        table_type: if source_path.is_some() { "EXTERNAL" } else { "MANAGED" }.to_string(),
        data_source_format: format,
        columns: body
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| ColumnInfo::new(c.name.trim(), &c.sql_type, i as u32))
            .collect(),
        storage_location: source_path,
        comment: body.comment,
    };
    let table = state.client()?.create_table(&request).await?;
    tracing::info!(table = %table.qualified_name(), table_type = %request.table_type, "Table created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "table": table }))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTableBody {
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
    pub name: Option<String>,
}

/// 409 when the table already exists, otherwise `{ exists: false }`.
pub async fn check_table(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CheckTableBody>,
) -> ApiResult<Json<Value>> {
    require_fields(&[
        ("catalogName", body.catalog_name.as_deref()),
        ("schemaName", body.schema_name.as_deref()),
        ("name", body.name.as_deref()),
    ])?;
    let full_name = format!(
        "{}.{}.{}",
        body.catalog_name.unwrap_or_default().trim(),
        body.schema_name.unwrap_or_default().trim(),
        body.name.unwrap_or_default().trim()
    );

    match state.client()?.get_table(&full_name).await {
        Ok(table) => Err(ApiError::Detailed {
            status: StatusCode::CONFLICT,
            message: format!("Table {} already exists", full_name),
            details: json!({
                "exists": true,
                "table": full_name,
                "columns": table.columns,
            }),
        }),
        Err(e) if e.is_not_found() => Ok(Json(json!({ "exists": false, "table": full_name }))),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_table(
    State(state): State<AppState>,
    Path(full_name): Path<String>,
) -> ApiResult<Json<Value>> {
    split_full_name(&full_name, 3)?;
    state.client()?.delete_table(&full_name).await?;
    tracing::info!(table = %full_name, "Table deleted");
    Ok(Json(json!({ "success": true })))
}
