//! `/api/*` route table and shared handler plumbing.

pub mod catalogs;
pub mod groups;
pub mod privileges;
pub mod schemas;
pub mod tables;
pub mod upload;
pub mod users;
pub mod workspace;

use crate::error::{ApiError, ApiResult};
use crate::{auth, chat, AppState};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequest, Request},
    routing::{delete, get, post},
    Json, Router,
};
use std::future::Future;
use std::time::Duration;
use unity_console_client::ClientError;

/// Multipart uploads may carry sizeable data files.
pub const UPLOAD_BODY_LIMIT: usize = 100 * 1024 * 1024;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Users
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/:id", get(users::get_user).delete(users::delete_user))
        .route("/api/account/users", get(users::list_account_users))
        // Groups
        .route("/api/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/api/groups/:id",
            get(groups::get_group)
                .patch(groups::patch_group)
                .delete(groups::delete_group),
        )
        .route("/api/groups/:id/members", post(groups::add_member))
        .route("/api/groups/:id/members/:user_id", delete(groups::remove_member))
        // Catalogs and schemas
        .route("/api/catalogs", get(catalogs::list_catalogs).post(catalogs::create_catalog))
        .route(
            "/api/catalogs/:name",
            get(catalogs::get_catalog).delete(catalogs::delete_catalog),
        )
        .route("/api/catalogs/:name/stats", get(catalogs::catalog_stats))
        .route(
            "/api/catalogs/:name/privileges/stats",
            get(catalogs::privilege_stats),
        )
        .route("/api/catalogs/:name/schemas", get(schemas::list_schemas))
        .route(
            "/api/catalogs/:name/schemas/:schema/tables",
            get(tables::list_tables),
        )
        .route("/api/schemas", post(schemas::create_schema))
        .route("/api/schemas/:full_name", delete(schemas::delete_schema))
        // Tables
        .route("/api/tables", post(tables::create_table))
        .route("/api/tables/check", post(tables::check_table))
        .route(
            "/api/tables/:full_name",
            get(tables::get_table).delete(tables::delete_table),
        )
        // Privileges
        .route(
            "/api/privileges/:securable_type/:full_name",
            get(privileges::get_privileges),
        )
        .route("/api/privileges/grant", post(privileges::grant))
        .route("/api/privileges/revoke", post(privileges::revoke))
        // Dashboard
        .route("/api/workspace/stats", get(workspace::workspace_stats))
        .route("/api/workspace/readiness", get(workspace::readiness))
        // Imports
        .route(
            "/api/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/cloud-migrate", post(upload::cloud_migrate))
        // Chat
        .route("/api/chat", post(chat::chat))
        // Auth
        .route("/api/auth/otp/send", post(auth::send_otp))
        .route("/api/auth/otp/verify", post(auth::verify_otp))
        .route("/api/auth/login", get(auth::login))
        .route("/api/auth/callback", get(auth::callback))
        .route("/api/auth/token", post(auth::token_login))
        .route("/api/auth/session", get(auth::session))
        .route("/api/auth/logout", post(auth::logout))
}

/// JSON body extractor whose rejections use the `{ "error": ... }` shape.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Run a vendor call under a cancellation deadline; elapsing maps to 504.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> ApiResult<T>
where
    F: Future<Output = Result<T, ClientError>>,
{
    Ok(tokio::time::timeout(limit, call).await??)
}

/// Split a dotted full name into exactly `levels` validated parts.
pub fn split_full_name(full_name: &str, levels: usize) -> ApiResult<Vec<String>> {
    unity_console_core::validation::validate_full_name(full_name, levels)?;
    Ok(full_name.split('.').map(str::to_string).collect())
}
