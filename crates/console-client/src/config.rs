//! Client configuration and builder pattern.

use crate::error::{ClientError, Result};
use std::fmt;
use std::time::Duration;

/// Default Databricks account console host.
pub const DEFAULT_ACCOUNTS_HOST: &str = "https://accounts.cloud.databricks.com";

/// Configuration for the Databricks client.
///
/// # Security
///
/// The `Debug` implementation masks the token to prevent accidental exposure
/// in logs. The token is shown as `"***REDACTED***"` in debug output.
#[derive(Clone)]
pub struct ClientConfig {
    /// Workspace or account console URL (e.g., "https://dbc-123.cloud.databricks.com")
    pub host: String,
    /// Bearer token (PAT or OAuth access token)
    pub token: Option<String>,
    /// Account ID; when set, SCIM calls use the account-level API
    pub account_id: Option<String>,
    /// SQL warehouse used for statement execution
    pub warehouse_id: Option<String>,
    /// Request timeout (default: 30 seconds)
    pub timeout: Duration,
    /// Maximum number of retries for transient failures (default: 0)
    pub max_retries: u32,
    /// Initial retry delay for exponential backoff (default: 100ms)
    pub retry_initial_delay: Duration,
    /// Maximum retry delay (default: 10 seconds)
    pub retry_max_delay: Duration,
    /// Whether to verify TLS certificates (default: true)
    pub tls_verify: bool,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080".to_string(),
            token: None,
            account_id: None,
            warehouse_id: None,
            timeout: Duration::from_secs(30),
            max_retries: 0,
            retry_initial_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_secs(10),
            tls_verify: true,
            user_agent: format!("unity-console/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "***REDACTED***"))
            .field("account_id", &self.account_id)
            .field("warehouse_id", &self.warehouse_id)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_initial_delay", &self.retry_initial_delay)
            .field("retry_max_delay", &self.retry_max_delay)
            .field("tls_verify", &self.tls_verify)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder(host: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(host)
    }

    /// Minimum allowed timeout value.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// Host without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    /// SCIM v2 path prefix for this scope.
    pub fn scim_prefix(&self) -> String {
        match &self.account_id {
            Some(account_id) => format!("/api/2.0/accounts/{}/scim/v2", account_id),
            None => "/api/2.0/preview/scim/v2".to_string(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ClientError::Config("host cannot be empty".to_string()));
        }

        url::Url::parse(&self.host)
            .map_err(|e| ClientError::Config(format!("Invalid host: {}", e)))?;

        if matches!(&self.token, Some(token) if token.trim().is_empty()) {
            return Err(ClientError::Config("token cannot be blank".to_string()));
        }

        if self.retry_initial_delay > self.retry_max_delay {
            return Err(ClientError::Config(format!(
                "retry_initial_delay ({:?}) must be <= retry_max_delay ({:?})",
                self.retry_initial_delay, self.retry_max_delay
            )));
        }

        if self.timeout < Self::MIN_TIMEOUT {
            return Err(ClientError::Config(format!(
                "timeout ({:?}) must be >= {:?}",
                self.timeout,
                Self::MIN_TIMEOUT
            )));
        }

        Ok(())
    }
}

/// Builder for client configuration.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with the given host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                host: host.into(),
                ..Default::default()
            },
        }
    }

    /// Set the bearer token for authentication.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Route SCIM calls through the account-level API.
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.config.account_id = Some(account_id.into());
        self
    }

    /// Set the SQL warehouse used for statement execution.
    pub fn warehouse_id(mut self, warehouse_id: impl Into<String>) -> Self {
        self.config.warehouse_id = Some(warehouse_id.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the initial retry delay for exponential backoff.
    pub fn retry_initial_delay(mut self, delay: Duration) -> Self {
        self.config.retry_initial_delay = delay;
        self
    }

    /// Set the maximum retry delay.
    pub fn retry_max_delay(mut self, delay: Duration) -> Self {
        self.config.retry_max_delay = delay;
        self
    }

    /// Set whether to verify TLS certificates.
    pub fn tls_verify(mut self, verify: bool) -> Self {
        self.config.tls_verify = verify;
        self
    }

    /// Set a custom User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.scim_prefix(), "/api/2.0/preview/scim/v2");
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder("https://dbc-1234.cloud.databricks.com/")
            .token("dapi_test")
            .warehouse_id("wh-1")
            .timeout(Duration::from_secs(20))
            .max_retries(2)
            .build()
            .unwrap();

        assert_eq!(config.base_url(), "https://dbc-1234.cloud.databricks.com");
        assert_eq!(config.token, Some("dapi_test".to_string()));
        assert_eq!(config.warehouse_id, Some("wh-1".to_string()));
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_account_scope_scim_prefix() {
        let config = ClientConfig::builder(DEFAULT_ACCOUNTS_HOST)
            .account_id("acc-42")
            .build()
            .unwrap();
        assert_eq!(config.scim_prefix(), "/api/2.0/accounts/acc-42/scim/v2");
    }

    #[test]
    fn test_invalid_host() {
        assert!(ClientConfig::builder("not a valid url").build().is_err());
        assert!(ClientConfig::builder("").build().is_err());
    }

    #[test]
    fn test_blank_token_rejected() {
        let result = ClientConfig::builder("https://example.cloud.databricks.com")
            .token("  ")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_token_masked_in_debug() {
        let config = ClientConfig::builder("https://example.cloud.databricks.com")
            .token("dapi_super_secret_token")
            .build()
            .unwrap();

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super_secret"));
        assert!(debug_output.contains("REDACTED"));
    }

    #[test]
    fn test_retry_delay_validation() {
        let result = ClientConfig::builder("https://example.cloud.databricks.com")
            .retry_initial_delay(Duration::from_secs(10))
            .retry_max_delay(Duration::from_secs(1))
            .build();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("retry_initial_delay"));
    }

    #[test]
    fn test_timeout_too_small() {
        let result = ClientConfig::builder("https://example.cloud.databricks.com")
            .timeout(Duration::from_millis(50))
            .build();
        assert!(result.unwrap_err().to_string().contains("timeout"));

        let result = ClientConfig::builder("https://example.cloud.databricks.com")
            .timeout(ClientConfig::MIN_TIMEOUT)
            .build();
        assert!(result.is_ok());
    }
}
