//! Error types for the Databricks client.

use std::time::Duration;

/// Errors that can occur when calling the Databricks APIs.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error raised inside the middleware stack
    #[error("HTTP request error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// Non-success response from the vendor API
    #[error("Databricks API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Vendor error code (e.g. `TABLE_ALREADY_EXISTS`)
        error_code: Option<String>,
        /// Vendor message
        message: String,
        /// Request ID for tracking
        request_id: Option<String>,
    },

    /// Rate limited (429)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Optional retry-after duration from server
        retry_after: Option<Duration>,
        /// Request ID for tracking
        request_id: Option<String>,
    },

    /// A SQL statement reached a terminal state other than SUCCEEDED
    #[error("Statement {state}: {message}")]
    Statement {
        state: String,
        error_code: Option<String>,
        message: String,
    },

    /// Client-side wait for a long-running operation elapsed
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A setting required by this operation is absent
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RateLimited { .. } => true,
            ClientError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientError::RateLimited { request_id, .. } => request_id.as_deref(),
            ClientError::Api { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Vendor error code, when the API reported one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ClientError::Api { error_code, .. } => error_code.as_deref(),
            ClientError::Statement { error_code, .. } => error_code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of a vendor response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::RateLimited { .. } => Some(429),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Vendor message without the wrapper prefix.
    pub fn vendor_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } | ClientError::Statement { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// True for `*_ALREADY_EXISTS` codes and SCIM 409 conflicts.
    pub fn is_already_exists(&self) -> bool {
        if let Some(code) = self.error_code() {
            if code.ends_with("ALREADY_EXISTS") {
                return true;
            }
        }
        match self {
            ClientError::Api {
                status, message, ..
            } => *status == 409 || message.contains("ALREADY_EXISTS"),
            ClientError::Statement { message, .. } => message.contains("ALREADY_EXISTS"),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.error_code(), Some(code) if code.ends_with("DOES_NOT_EXIST") || code == "NOT_FOUND")
            || self.status() == Some(404)
    }

    /// True when the call was cut short by a transport or client-side timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_timeout(),
            ClientError::HttpMiddleware(reqwest_middleware::Error::Reqwest(e)) => e.is_timeout(),
            ClientError::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
