//! Unity Console API
//!
//! HTTP backend for the Unity Catalog admin console: CRUD proxy routes over
//! the Databricks SCIM and Unity Catalog APIs, a cached workspace statistics
//! dashboard, table import sagas, a chat command interpreter and login flows.

pub mod auth;
pub mod chat;
pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod saga;
pub mod sessions;
pub mod stats;

use crate::auth::{LogMailer, OtpMailer};
use crate::clock::{SharedClock, SystemClock};
use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::sessions::SessionStores;
use crate::stats::{Aggregator, FanOutLimiter, SnapshotCache};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use unity_console_client::{ClientConfig, ClientError, DatabricksClient, SharedClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    client: Option<SharedClient>,
    account_client: Option<SharedClient>,
    aggregator: Option<Arc<Aggregator>>,
    pub limiter: FanOutLimiter,
    pub stats_cache: Arc<SnapshotCache>,
    pub sessions: Arc<SessionStores>,
    pub mailer: Arc<dyn OtpMailer>,
    pub clock: SharedClock,
    /// Plain client for OIDC token exchange
    pub oauth_http: reqwest::Client,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let mailer = Arc::new(LogMailer::new(config.email_from.clone()));
        Self::with_parts(config, Arc::new(SystemClock), mailer)
    }

    pub fn with_parts(config: ServerConfig, clock: SharedClock, mailer: Arc<dyn OtpMailer>) -> Self {
        let client = connect("workspace", config.workspace_client());
        let account_client = connect("account", config.account_client());
        let limiter = FanOutLimiter::new(config.max_in_flight);
        let aggregator = client
            .clone()
            .map(|c| Arc::new(Aggregator::new(c, limiter.clone(), clock.clone())));
        let oauth_http = reqwest::Client::builder()
            .timeout(config.vendor_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default OAuth HTTP client");
                reqwest::Client::new()
            });

        Self {
            client,
            account_client,
            aggregator,
            limiter,
            stats_cache: Arc::new(SnapshotCache::new(clock.clone())),
            sessions: Arc::new(SessionStores::new(clock.clone())),
            mailer,
            clock,
            oauth_http,
            config: Arc::new(config),
        }
    }

    /// Workspace client, or 500 when the workspace is not configured.
    pub fn client(&self) -> ApiResult<&SharedClient> {
        self.client.as_ref().ok_or_else(|| {
            ApiError::NotConfigured("DATABRICKS_HOST and DATABRICKS_TOKEN must be set".to_string())
        })
    }

    pub fn account_client(&self) -> ApiResult<&SharedClient> {
        self.account_client.as_ref().ok_or_else(|| {
            ApiError::NotConfigured(
                "DATABRICKS_ACCOUNT_ID and DATABRICKS_ACCOUNT_TOKEN must be set".to_string(),
            )
        })
    }

    pub fn aggregator(&self) -> ApiResult<&Aggregator> {
        self.aggregator.as_deref().ok_or_else(|| {
            ApiError::NotConfigured("DATABRICKS_HOST and DATABRICKS_TOKEN must be set".to_string())
        })
    }
}

fn connect(
    scope: &'static str,
    config: Option<Result<ClientConfig, ClientError>>,
) -> Option<SharedClient> {
    let config = match config? {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(scope = scope, error = %e, "Invalid Databricks client configuration");
            return None;
        }
    };
    match DatabricksClient::new(config) {
        Ok(client) => {
            tracing::info!(scope = scope, host = %client.base_url(), "Databricks client ready");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::error!(scope = scope, error = %e, "Failed to build Databricks client");
            None
        }
    }
}

/// Full application router with tracing, CORS and metrics layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::liveness_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(routes::api_routes())
        .layer(middleware::from_fn(metrics::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
