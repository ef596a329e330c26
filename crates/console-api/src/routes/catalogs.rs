//! Catalog routes and per-catalog statistics.

use super::ApiJson;
use crate::error::ApiResult;
use crate::stats::catalog_stats::{self, CatalogStat, PrivilegeStat};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use unity_console_client::{Catalog, CreateCatalogRequest};
use unity_console_core::validation::{require_fields, validate_object_name};

pub async fn list_catalogs(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let catalogs = state.client()?.list_catalogs().await?;
    Ok(Json(json!({ "catalogs": catalogs })))
}

pub async fn get_catalog(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Catalog>> {
    Ok(Json(state.client()?.get_catalog(&name).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogBody {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub storage_root: Option<String>,
}

/// Create a catalog; an existing one is reported with `created: false`.
pub async fn create_catalog(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateCatalogBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_fields(&[("name", body.name.as_deref())])?;
    let name = body.name.unwrap_or_default().trim().to_string();
    validate_object_name(&name, "Catalog")?;

    let request = CreateCatalogRequest {
        name: name.clone(),
        comment: body.comment,
        storage_root: body.storage_root,
    };
    match state.client()?.create_catalog(&request).await {
        Ok(catalog) => {
            tracing::info!(catalog = %name, "Catalog created");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "success": true, "created": true, "catalog": catalog })),
            ))
        }
        Err(e) if e.is_already_exists() => {
            tracing::info!(catalog = %name, "Catalog already exists");
            Ok((
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "created": false,
                    "message": format!("Catalog '{}' already exists", name),
                })),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ForceQuery {
    #[serde(default)]
    pub force: bool,
}

pub async fn delete_catalog(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ForceQuery>,
) -> ApiResult<Json<Value>> {
    state.client()?.delete_catalog(&name, query.force).await?;
    tracing::info!(catalog = %name, force = query.force, "Catalog deleted");
    Ok(Json(json!({ "success": true })))
}

pub async fn catalog_stats(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<CatalogStat>> {
    let client = state.client()?;
    Ok(Json(
        catalog_stats::catalog_stats(client, &state.limiter, &name).await?,
    ))
}

pub async fn privilege_stats(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PrivilegeStat>> {
    Ok(Json(
        catalog_stats::privilege_stats(state.client()?, &name).await?,
    ))
}
