//! HTTP client for the Databricks workspace and account APIs.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::types::{
    ApiError, Catalog, Cluster, ClusterEvent, ClusterEventsRequest, ClusterEventsResponse,
    CreateCatalogRequest, CreateSchemaRequest, CreateTableRequest, DbfsHandle,
    ExecuteStatementRequest, ExternalLocation, Job, JobRun, ListCatalogsResponse,
    ListClustersResponse, ListExternalLocationsResponse, ListJobsResponse, ListRunsResponse,
    ListSchemasResponse, ListTablesResponse, PermissionsChange, PermissionsList, QueryHistoryResponse,
    QueryInfo, Schema, ScimGroup, ScimListResponse, ScimPatchRequest, ScimUser, SecurableType,
    StatementResponse, Table, UpdatePermissions,
};
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    policies::ExponentialBackoff, RetryTransientMiddleware, Retryable, RetryableStrategy,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

const UC_PREFIX: &str = "/api/2.1/unity-catalog";

/// Upper bound on pages followed by any paginated listing.
const MAX_PAGES: usize = 50;

/// Raw bytes per DBFS add-block call (the API caps encoded blocks at 1 MB).
pub const DBFS_BLOCK_SIZE: usize = 512 * 1024;

const STATEMENT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const STATEMENT_MAX_WAIT: Duration = Duration::from_secs(600);

/// Databricks REST/SCIM client with optional retries.
pub struct DatabricksClient {
    http: ClientWithMiddleware,
    config: ClientConfig,
}

impl DatabricksClient {
    /// Create a new config builder for the given host.
    pub fn builder(host: impl Into<String>) -> crate::config::ClientConfigBuilder {
        crate::config::ClientConfigBuilder::new(host)
    }

    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("unity-console")),
        );

        if let Some(ref token) = config.token {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ClientError::Config("Invalid token format".to_string()))?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
        }

        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(config.retry_initial_delay, config.retry_max_delay)
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                retry_policy,
                ConsoleRetryStrategy,
            ))
            .build();

        Ok(Self {
            http: client,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    // =========================================================================
    // SCIM Users
    // =========================================================================

    /// List one page of users (`start_index` is 1-based).
    pub async fn list_users(
        &self,
        start_index: u64,
        count: u64,
    ) -> Result<ScimListResponse<ScimUser>> {
        let path = format!(
            "{}/Users?startIndex={}&count={}",
            self.config.scim_prefix(),
            start_index.max(1),
            count
        );
        self.get(&path).await
    }

    /// Total number of users visible to the token.
    pub async fn count_users(&self) -> Result<u64> {
        let path = format!(
            "{}/Users?startIndex=1&count=1&attributes=id",
            self.config.scim_prefix()
        );
        let page: ScimListResponse<ScimUser> = self.get(&path).await?;
        Ok(page.total_results)
    }

    pub async fn get_user(&self, id: &str) -> Result<ScimUser> {
        let path = format!(
            "{}/Users/{}",
            self.config.scim_prefix(),
            urlencoding::encode(id)
        );
        self.get(&path).await
    }

    /// Look a user up by exact user name (email).
    pub async fn find_user_by_name(&self, user_name: &str) -> Result<Option<ScimUser>> {
        let filter = format!("userName eq \"{}\"", user_name);
        let path = format!(
            "{}/Users?filter={}",
            self.config.scim_prefix(),
            urlencoding::encode(&filter)
        );
        let page: ScimListResponse<ScimUser> = self.get(&path).await?;
        Ok(page.resources.into_iter().next())
    }

    pub async fn create_user(&self, user: &ScimUser) -> Result<ScimUser> {
        let path = format!("{}/Users", self.config.scim_prefix());
        self.request(Method::POST, &path, Some(user)).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let path = format!(
            "{}/Users/{}",
            self.config.scim_prefix(),
            urlencoding::encode(id)
        );
        self.request_no_content(Method::DELETE, &path, Option::<()>::None)
            .await
    }

    /// Identity behind the configured token (workspace scope only).
    pub async fn current_user(&self) -> Result<ScimUser> {
        self.get("/api/2.0/preview/scim/v2/Me").await
    }

    // =========================================================================
    // SCIM Groups
    // =========================================================================

    pub async fn list_groups(&self) -> Result<ScimListResponse<ScimGroup>> {
        let path = format!("{}/Groups", self.config.scim_prefix());
        self.get(&path).await
    }

    pub async fn get_group(&self, id: &str) -> Result<ScimGroup> {
        let path = format!(
            "{}/Groups/{}",
            self.config.scim_prefix(),
            urlencoding::encode(id)
        );
        self.get(&path).await
    }

    pub async fn find_group_by_name(&self, display_name: &str) -> Result<Option<ScimGroup>> {
        let filter = format!("displayName eq \"{}\"", display_name);
        let path = format!(
            "{}/Groups?filter={}",
            self.config.scim_prefix(),
            urlencoding::encode(&filter)
        );
        let page: ScimListResponse<ScimGroup> = self.get(&path).await?;
        Ok(page.resources.into_iter().next())
    }

    pub async fn create_group(&self, group: &ScimGroup) -> Result<ScimGroup> {
        let path = format!("{}/Groups", self.config.scim_prefix());
        self.request(Method::POST, &path, Some(group)).await
    }

    pub async fn delete_group(&self, id: &str) -> Result<()> {
        let path = format!(
            "{}/Groups/{}",
            self.config.scim_prefix(),
            urlencoding::encode(id)
        );
        self.request_no_content(Method::DELETE, &path, Option::<()>::None)
            .await
    }

    /// Add and remove group members in a single PatchOp.
    pub async fn patch_group_members(
        &self,
        id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        let path = format!(
            "{}/Groups/{}",
            self.config.scim_prefix(),
            urlencoding::encode(id)
        );
        let body = ScimPatchRequest::members(add, remove);
        self.request_no_content(Method::PATCH, &path, Some(&body))
            .await
    }

    // =========================================================================
    // Unity Catalog
    // =========================================================================

    pub async fn list_catalogs(&self) -> Result<Vec<Catalog>> {
        let mut catalogs = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut path = format!("{}/catalogs", UC_PREFIX);
            if let Some(token) = &page_token {
                path.push_str(&format!("?page_token={}", urlencoding::encode(token)));
            }
            let page: ListCatalogsResponse = self.get(&path).await?;
            catalogs.extend(page.catalogs);
            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                break;
            }
        }
        Ok(catalogs)
    }

    pub async fn get_catalog(&self, name: &str) -> Result<Catalog> {
        let path = format!("{}/catalogs/{}", UC_PREFIX, urlencoding::encode(name));
        self.get(&path).await
    }

    pub async fn create_catalog(&self, request: &CreateCatalogRequest) -> Result<Catalog> {
        let path = format!("{}/catalogs", UC_PREFIX);
        self.request(Method::POST, &path, Some(request)).await
    }

    pub async fn delete_catalog(&self, name: &str, force: bool) -> Result<()> {
        let path = format!(
            "{}/catalogs/{}?force={}",
            UC_PREFIX,
            urlencoding::encode(name),
            force
        );
        self.request_no_content(Method::DELETE, &path, Option::<()>::None)
            .await
    }

    pub async fn list_schemas(&self, catalog: &str) -> Result<Vec<Schema>> {
        let mut schemas = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut path = format!(
                "{}/schemas?catalog_name={}",
                UC_PREFIX,
                urlencoding::encode(catalog)
            );
            if let Some(token) = &page_token {
                path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
            }
            let page: ListSchemasResponse = self.get(&path).await?;
            schemas.extend(page.schemas);
            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                break;
            }
        }
        Ok(schemas)
    }

    pub async fn create_schema(&self, request: &CreateSchemaRequest) -> Result<Schema> {
        let path = format!("{}/schemas", UC_PREFIX);
        self.request(Method::POST, &path, Some(request)).await
    }

    pub async fn delete_schema(&self, full_name: &str, force: bool) -> Result<()> {
        let path = format!(
            "{}/schemas/{}?force={}",
            UC_PREFIX,
            urlencoding::encode(full_name),
            force
        );
        self.request_no_content(Method::DELETE, &path, Option::<()>::None)
            .await
    }

    /// List every table in a schema, following `next_page_token`.
    pub async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<Table>> {
        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut path = format!(
                "{}/tables?catalog_name={}&schema_name={}",
                UC_PREFIX,
                urlencoding::encode(catalog),
                urlencoding::encode(schema)
            );
            if let Some(token) = &page_token {
                path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
            }
            let page: ListTablesResponse = self.get(&path).await?;
            tables.extend(page.tables);
            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                break;
            }
        }
        Ok(tables)
    }

    pub async fn get_table(&self, full_name: &str) -> Result<Table> {
        let path = format!("{}/tables/{}", UC_PREFIX, urlencoding::encode(full_name));
        self.get(&path).await
    }

    pub async fn create_table(&self, request: &CreateTableRequest) -> Result<Table> {
        let path = format!("{}/tables", UC_PREFIX);
        self.request(Method::POST, &path, Some(request)).await
    }

    pub async fn delete_table(&self, full_name: &str) -> Result<()> {
        let path = format!("{}/tables/{}", UC_PREFIX, urlencoding::encode(full_name));
        self.request_no_content(Method::DELETE, &path, Option::<()>::None)
            .await
    }

    pub async fn get_permissions(
        &self,
        securable: SecurableType,
        full_name: &str,
    ) -> Result<PermissionsList> {
        let path = format!(
            "{}/permissions/{}/{}",
            UC_PREFIX,
            securable.as_str(),
            urlencoding::encode(full_name)
        );
        self.get(&path).await
    }

    pub async fn update_permissions(
        &self,
        securable: SecurableType,
        full_name: &str,
        changes: Vec<PermissionsChange>,
    ) -> Result<PermissionsList> {
        let path = format!(
            "{}/permissions/{}/{}",
            UC_PREFIX,
            securable.as_str(),
            urlencoding::encode(full_name)
        );
        let body = UpdatePermissions { changes };
        self.request(Method::PATCH, &path, Some(&body)).await
    }

    pub async fn list_external_locations(&self) -> Result<Vec<ExternalLocation>> {
        let response: ListExternalLocationsResponse = self
            .get(&format!("{}/external-locations", UC_PREFIX))
            .await?;
        Ok(response.external_locations)
    }

    // =========================================================================
    // Compute & Jobs
    // =========================================================================

    pub async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        let response: ListClustersResponse = self.get("/api/2.0/clusters/list").await?;
        Ok(response.clusters)
    }

    /// Most recent events for a cluster, newest first.
    pub async fn cluster_events(
        &self,
        cluster_id: &str,
        start_time_ms: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ClusterEvent>> {
        let body = ClusterEventsRequest {
            cluster_id: cluster_id.to_string(),
            start_time: start_time_ms,
            order: "DESC".to_string(),
            limit,
        };
        let response: ClusterEventsResponse = self
            .request(Method::POST, "/api/2.0/clusters/events", Some(&body))
            .await?;
        Ok(response.events)
    }

    /// List all jobs with their task definitions.
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut path = "/api/2.1/jobs/list?limit=100&expand_tasks=true".to_string();
            if let Some(token) = &page_token {
                path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
            }
            let page: ListJobsResponse = self.get(&path).await?;
            jobs.extend(page.jobs);
            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if !page.has_more || page_token.is_none() {
                break;
            }
        }
        Ok(jobs)
    }

    /// Job runs that started at or after `start_time_ms`.
    pub async fn list_job_runs(&self, start_time_ms: i64) -> Result<Vec<JobRun>> {
        let mut runs = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut path = format!(
                "/api/2.1/jobs/runs/list?start_time_from={}&limit=25",
                start_time_ms
            );
            if let Some(token) = &page_token {
                path.push_str(&format!("&page_token={}", urlencoding::encode(token)));
            }
            let page: ListRunsResponse = self.get(&path).await?;
            runs.extend(page.runs);
            page_token = page.next_page_token.filter(|t| !t.is_empty());
            if !page.has_more || page_token.is_none() {
                break;
            }
        }
        Ok(runs)
    }

    // =========================================================================
    // SQL
    // =========================================================================

    /// SQL warehouse query history since `start_time_ms`.
    pub async fn query_history(&self, start_time_ms: i64, max_results: u32) -> Result<Vec<QueryInfo>> {
        let path = format!(
            "/api/2.0/sql/history/queries?filter_by.query_start_time_range.start_time_ms={}&max_results={}",
            start_time_ms, max_results
        );
        let response: QueryHistoryResponse = self.get(&path).await?;
        Ok(response.res)
    }

    /// Run a statement on the configured warehouse and wait for a terminal state.
    pub async fn execute_statement(&self, statement: &str) -> Result<StatementResponse> {
        let warehouse_id = self
            .config
            .warehouse_id
            .clone()
            .ok_or_else(|| ClientError::NotConfigured("DATABRICKS_WAREHOUSE_ID".to_string()))?;

        let body = ExecuteStatementRequest {
            statement: statement.to_string(),
            warehouse_id,
            wait_timeout: "30s".to_string(),
            on_wait_timeout: "CONTINUE".to_string(),
        };
        let mut response: StatementResponse = self
            .request(Method::POST, "/api/2.0/sql/statements", Some(&body))
            .await?;

        let started = Instant::now();
        while !response.status.is_terminal() {
            if started.elapsed() > STATEMENT_MAX_WAIT {
                return Err(ClientError::Timeout(STATEMENT_MAX_WAIT));
            }
            tokio::time::sleep(STATEMENT_POLL_INTERVAL).await;
            let path = format!(
                "/api/2.0/sql/statements/{}",
                urlencoding::encode(&response.statement_id)
            );
            response = self.get(&path).await?;
        }

        if response.status.state != "SUCCEEDED" {
            let error = response.status.error.clone().unwrap_or_default();
            tracing::warn!(
                statement_id = %response.statement_id,
                state = %response.status.state,
                error_code = ?error.error_code,
                "Statement did not succeed"
            );
            return Err(ClientError::Statement {
                state: response.status.state,
                error_code: error.error_code,
                message: error
                    .message
                    .unwrap_or_else(|| "statement failed without a message".to_string()),
            });
        }

        Ok(response)
    }

    // =========================================================================
    // DBFS
    // =========================================================================

    /// Stream bytes to a DBFS path using create / add-block / close.
    pub async fn dbfs_upload(&self, path: &str, data: &[u8]) -> Result<()> {
        let handle: DbfsHandle = self
            .request(
                Method::POST,
                "/api/2.0/dbfs/create",
                Some(&json!({ "path": path, "overwrite": true })),
            )
            .await?;

        for block in data.chunks(DBFS_BLOCK_SIZE) {
            let encoded = base64::engine::general_purpose::STANDARD.encode(block);
            self.request_no_content(
                Method::POST,
                "/api/2.0/dbfs/add-block",
                Some(&json!({ "handle": handle.handle, "data": encoded })),
            )
            .await?;
        }

        self.request_no_content(
            Method::POST,
            "/api/2.0/dbfs/close",
            Some(&json!({ "handle": handle.handle })),
        )
        .await?;

        tracing::debug!(path = %path, bytes = data.len(), "Staged file on DBFS");
        Ok(())
    }

    pub async fn dbfs_delete(&self, path: &str) -> Result<()> {
        self.request_no_content(
            Method::POST,
            "/api/2.0/dbfs/delete",
            Some(&json!({ "path": path, "recursive": false })),
        )
        .await
    }

    // =========================================================================
    // Internal HTTP Methods
    // =========================================================================

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, Option::<()>::None).await
    }

    /// Perform a request and deserialize the JSON response.
    async fn request<T, B>(&self, method: Method, path: &str, body: Option<B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let bytes = self.send(method, path, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::InvalidResponse(format!(
                "Failed to parse response: {} (body: {})",
                e,
                String::from_utf8_lossy(&bytes)
            ))
        })
    }

    /// Perform a request whose response body is irrelevant (DELETE, PATCH, 204).
    async fn request_no_content<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<()> {
        self.send(method, path, body).await.map(|_| ())
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.config.base_url(), path);
        let start = Instant::now();

        tracing::debug!(method = %method, path = %path, "Sending request");

        let request = if let Some(ref b) = body {
            let json_body = serde_json::to_vec(b)?;
            self.http.request(method.clone(), &url).body(json_body)
        } else {
            self.http.request(method.clone(), &url)
        };

        let response = request.send().await?;
        let status = response.status();
        let duration = start.elapsed();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        tracing::debug!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            request_id = ?request_id,
            "Received response"
        );

        if status.is_success() {
            return Ok(response.bytes().await?.to_vec());
        }

        let retry_after = Self::parse_retry_after(response.headers());
        let error_body = response.bytes().await.ok();
        let api_error: Option<ApiError> = error_body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok());

        let message = api_error
            .as_ref()
            .and_then(ApiError::text)
            .unwrap_or_else(|| {
                error_body
                    .filter(|b| !b.is_empty())
                    .map(|b| String::from_utf8_lossy(&b).to_string())
                    .unwrap_or_else(|| status.to_string())
            });
        let error_code = api_error.and_then(|e| e.error_code);

        tracing::warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            request_id = ?request_id,
            error_code = ?error_code,
            error = %message,
            "Databricks request failed"
        );

        Err(Self::status_to_error(
            status,
            error_code,
            message,
            request_id,
            retry_after,
        ))
    }

    fn status_to_error(
        status: StatusCode,
        error_code: Option<String>,
        message: String,
        request_id: Option<String>,
        retry_after: Option<Duration>,
    ) -> ClientError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited {
                retry_after,
                request_id,
            },
            _ => ClientError::Api {
                status: status.as_u16(),
                error_code,
                message,
                request_id,
            },
        }
    }

    /// Parse the Retry-After header (seconds or HTTP-date).
    fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
        let header_value = headers.get("retry-after")?.to_str().ok()?;

        if let Ok(seconds) = header_value.parse::<u64>() {
            return Some(Duration::from_secs(seconds));
        }

        if let Ok(date) = httpdate::parse_http_date(header_value) {
            let now = std::time::SystemTime::now();
            return Some(date.duration_since(now).unwrap_or(Duration::ZERO));
        }

        None
    }
}

/// Retry strategy for vendor calls.
///
/// Transient network errors, 5xx and 429 are retried; other 4xx are fatal.
/// Write calls are only retried when `max_retries` is raised above its
/// default of zero.
struct ConsoleRetryStrategy;

impl RetryableStrategy for ConsoleRetryStrategy {
    fn handle(&self, res: &reqwest_middleware::Result<reqwest::Response>) -> Option<Retryable> {
        match res {
            Ok(response) => {
                let status = response.status();
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    Some(Retryable::Transient)
                } else if status.is_success() {
                    None
                } else {
                    Some(Retryable::Fatal)
                }
            }
            Err(error) => {
                if error.is_timeout() || error.is_connect() {
                    Some(Retryable::Transient)
                } else {
                    Some(Retryable::Fatal)
                }
            }
        }
    }
}

/// Arc-wrapped client for shared ownership.
pub type SharedClient = Arc<DatabricksClient>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ClientConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(DatabricksClient::new(config).is_err());
    }

    #[test]
    fn test_base_url_trims_slash() {
        let config = DatabricksClient::builder("https://dbc-1.cloud.databricks.com/")
            .token("dapi")
            .build()
            .unwrap();
        let client = DatabricksClient::new(config).unwrap();
        assert_eq!(client.base_url(), "https://dbc-1.cloud.databricks.com");
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("120"));
        assert_eq!(
            DatabricksClient::parse_retry_after(&headers),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_parse_retry_after_past_date() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(
            DatabricksClient::parse_retry_after(&headers),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_parse_retry_after_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(DatabricksClient::parse_retry_after(&headers), None);
        assert_eq!(DatabricksClient::parse_retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn test_status_to_error() {
        let err = DatabricksClient::status_to_error(
            StatusCode::BAD_REQUEST,
            Some("TABLE_ALREADY_EXISTS".into()),
            "Table 'orders' already exists".into(),
            None,
            None,
        );
        assert!(err.is_already_exists());
        assert_eq!(err.status(), Some(400));

        let err = DatabricksClient::status_to_error(
            StatusCode::TOO_MANY_REQUESTS,
            None,
            "slow down".into(),
            Some("req-1".into()),
            Some(Duration::from_secs(3)),
        );
        assert!(matches!(err, ClientError::RateLimited { .. }));
    }
}
