//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl turns
//! failures into `{ "error": "...", ...details }` bodies with the status the
//! front end expects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use unity_console_client::ClientError;
use unity_console_core::ConsoleError;

pub const TIMEOUT_MESSAGE: &str = "Request to Databricks timed out";

lazy_static! {
    static ref CONFLICTING_OBJECTS: Regex =
        Regex::new(r"(?i)conflicting (?:tables|volumes|tables/volumes|locations?):\s*([^\s,;]+)")
            .unwrap();
    static ref CLOUD_URL: Regex =
        Regex::new(r#"(?i)\b(?:s3a?|abfss|gs|dbfs)://[^\s'"`,)]+"#).unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Storage location overlaps an existing location: {}", .location.as_deref().unwrap_or("unknown"))]
    LocationOverlap {
        location: Option<String>,
        message: String,
    },

    #[error("Request to Databricks timed out")]
    Timeout,

    #[error("Databricks is not configured: {0}")]
    NotConfigured(String),

    /// Failure carrying a structured body (saga reports, schema conflicts).
    #[error("{message}")]
    Detailed {
        status: StatusCode,
        message: String,
        details: Value,
    },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::MissingFields(_)
            | ApiError::LocationOverlap { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Detailed { status, .. } => *status,
            ApiError::NotConfigured(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> Value {
        let mut body = json!({ "error": self.to_string() });
        match self {
            ApiError::MissingFields(fields) => {
                body["missingFields"] = json!(fields);
            }
            ApiError::LocationOverlap { location, message } => {
                body["location"] = json!(location);
                body["details"] = json!(message);
            }
            ApiError::Detailed { details, .. } => {
                if let (Some(target), Value::Object(extra)) = (body.as_object_mut(), details) {
                    for (key, value) in extra {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        if err.is_timeout() {
            return ApiError::Timeout;
        }

        let message = err.vendor_message();
        if err.error_code() == Some("LOCATION_OVERLAP") || message.contains("LOCATION_OVERLAP") {
            return ApiError::LocationOverlap {
                location: overlapping_location(&message),
                message,
            };
        }
        if err.is_already_exists() {
            return ApiError::Conflict(message);
        }

        match err {
            ClientError::NotConfigured(what) => ApiError::NotConfigured(what),
            ClientError::Config(msg) => ApiError::NotConfigured(msg),
            ClientError::RateLimited { .. } => {
                ApiError::RateLimited("Databricks rate limit exceeded".to_string())
            }
            ClientError::Api { status: 404, .. } => ApiError::NotFound(message),
            ClientError::Api { status: 401, .. } => ApiError::Unauthorized(message),
            ClientError::Api { status: 403, .. } => ApiError::Forbidden(message),
            _ => ApiError::Internal(message),
        }
    }
}

impl From<ConsoleError> for ApiError {
    fn from(err: ConsoleError) -> Self {
        match err {
            ConsoleError::ValidationError(msg) => ApiError::BadRequest(msg),
            ConsoleError::MissingFields(fields) => ApiError::MissingFields(fields),
            ConsoleError::SerializationError(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<tokio::time::error::Elapsed> for ApiError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ApiError::Timeout
    }
}

/// Pull the conflicting object or URL out of a `LOCATION_OVERLAP` message.
pub fn overlapping_location(message: &str) -> Option<String> {
    if let Some(caps) = CONFLICTING_OBJECTS.captures(message) {
        return caps
            .get(1)
            .map(|m| m.as_str().trim_end_matches('.').to_string());
    }
    CLOUD_URL
        .find(message)
        .map(|m| m.as_str().trim_end_matches('.').to_string())
}

pub type ApiResult<T> = Result<T, ApiError>;
