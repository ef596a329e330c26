//! File upload and S3 migration entry points for the import saga.

use super::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::saga::{self, ColumnSpec, FileFormat, ImportOutcome, ImportRequest, ImportSource};
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use unity_console_core::validation::{require_fields, validate_object_name, validate_s3_path};

/// Target table and load options shared by both import routes.
#[derive(Debug, Default)]
struct ImportTarget {
    catalog: Option<String>,
    schema: Option<String>,
    table: Option<String>,
    columns: Vec<ColumnSpec>,
    tags: BTreeMap<String, String>,
    format: Option<FileFormat>,
    header: Option<bool>,
    delimiter: Option<String>,
}

impl ImportTarget {
    fn into_request(self, source: ImportSource, fallback_format: FileFormat) -> ApiResult<ImportRequest> {
        require_fields(&[
            ("catalogName", self.catalog.as_deref()),
            ("schemaName", self.schema.as_deref()),
            ("tableName", self.table.as_deref()),
        ])?;
        if self.columns.is_empty() {
            return Err(ApiError::MissingFields(vec!["columns".to_string()]));
        }
        let catalog = self.catalog.unwrap_or_default().trim().to_string();
        let schema = self.schema.unwrap_or_default().trim().to_string();
        let table = self.table.unwrap_or_default().trim().to_string();
        validate_object_name(&catalog, "Catalog")?;
        validate_object_name(&schema, "Schema")?;
        validate_object_name(&table, "Table")?;
        for column in &self.columns {
            if column.name.trim().is_empty() || column.sql_type.trim().is_empty() {
                return Err(ApiError::BadRequest(
                    "Every column needs a name and a type".to_string(),
                ));
            }
        }

        Ok(ImportRequest {
            catalog,
            schema,
            table,
            columns: self.columns,
            tags: self.tags,
            format: self.format.unwrap_or(fallback_format),
            header: self.header.unwrap_or(true),
            delimiter: self.delimiter.filter(|d| !d.is_empty()),
            source,
        })
    }
}

fn parse_json_field<T: serde::de::DeserializeOwned>(field: &str, raw: &str) -> ApiResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON in '{}': {}", field, e)))
}

fn parse_format(raw: &str) -> ApiResult<FileFormat> {
    raw.parse::<FileFormat>().map_err(ApiError::BadRequest)
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn outcome_body(outcome: ImportOutcome) -> Json<Value> {
    Json(json!({
        "success": true,
        "table": outcome.table,
        "created": outcome.created,
        "source": outcome.source,
        "steps": outcome.steps,
    }))
}

/// `POST /api/upload`: multipart file plus target table description.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut target = ImportTarget::default();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload.csv").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            file = Some((file_name, data.to_vec()));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "catalogName" => target.catalog = Some(value),
            "schemaName" => target.schema = Some(value),
            "tableName" => target.table = Some(value),
            "columns" => target.columns = parse_json_field("columns", &value)?,
            "tags" if !value.trim().is_empty() => target.tags = parse_json_field("tags", &value)?,
            "fileFormat" if !value.trim().is_empty() => target.format = Some(parse_format(&value)?),
            "header" => target.header = Some(parse_flag(&value)),
            "delimiter" => target.delimiter = Some(value),
            _ => tracing::debug!(field = %name, "Ignoring multipart field"),
        }
    }

    let (file_name, data) = file.ok_or_else(|| ApiError::MissingFields(vec!["file".to_string()]))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    tracing::info!(file = %file_name, bytes = data.len(), "Received upload");

    let detected = FileFormat::from_path(&file_name);
    let request = target.into_request(ImportSource::Upload { file_name, data }, detected)?;
    let outcome = saga::run_import(state.client()?, &request).await?;
    Ok(outcome_body(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudMigrateBody {
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
    pub table_name: Option<String>,
    pub source_path: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub file_format: Option<String>,
    pub header: Option<bool>,
    pub delimiter: Option<String>,
}

/// `POST /api/cloud-migrate`: load an S3 object straight into a new table.
pub async fn cloud_migrate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CloudMigrateBody>,
) -> ApiResult<Json<Value>> {
    require_fields(&[
        ("catalogName", body.catalog_name.as_deref()),
        ("schemaName", body.schema_name.as_deref()),
        ("tableName", body.table_name.as_deref()),
        ("sourcePath", body.source_path.as_deref()),
    ])?;
    let path = body.source_path.unwrap_or_default().trim().to_string();
    validate_s3_path(&path)?;

    let format = match body.file_format.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_format(raw)?),
        _ => None,
    };
    let detected = FileFormat::from_path(&path);
    let target = ImportTarget {
        catalog: body.catalog_name,
        schema: body.schema_name,
        table: body.table_name,
        columns: body.columns,
        tags: body.tags,
        format,
        header: body.header,
        delimiter: body.delimiter,
    };
    let request = target.into_request(ImportSource::S3 { path }, detected)?;
    let outcome = saga::run_import(state.client()?, &request).await?;
    Ok(outcome_body(outcome))
}
