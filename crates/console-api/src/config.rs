//! Server configuration loaded from environment variables.
//!
//! Vendor settings are optional at startup: when `DATABRICKS_HOST` or
//! `DATABRICKS_TOKEN` is missing the server still boots and every vendor
//! backed route answers 500 until the settings are provided.

use std::fmt;
use std::time::Duration;
use unity_console_client::{ClientConfig, ClientError, DEFAULT_ACCOUNTS_HOST};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;
pub const DEFAULT_VENDOR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_GROUP_PATCH_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_SESSION_SWEEP_SECS: u64 = 60;
pub const DEFAULT_EMAIL_FROM: &str = "no-reply@unity-console.local";

/// OAuth application registered with the workspace.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "***REDACTED***"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    pub databricks_host: Option<String>,
    pub databricks_token: Option<String>,
    pub account_id: Option<String>,
    pub account_token: Option<String>,
    pub account_host: String,
    pub warehouse_id: Option<String>,
    pub oauth: Option<OAuthConfig>,
    pub email_from: String,
    pub port: u16,
    /// Concurrent vendor calls allowed during statistics fan-out
    pub max_in_flight: usize,
    pub vendor_timeout: Duration,
    pub group_patch_timeout: Duration,
    pub session_sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            databricks_host: None,
            databricks_token: None,
            account_id: None,
            account_token: None,
            account_host: DEFAULT_ACCOUNTS_HOST.to_string(),
            warehouse_id: None,
            oauth: None,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            port: DEFAULT_PORT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            vendor_timeout: Duration::from_secs(DEFAULT_VENDOR_TIMEOUT_SECS),
            group_patch_timeout: Duration::from_secs(DEFAULT_GROUP_PATCH_TIMEOUT_SECS),
            session_sweep_interval: Duration::from_secs(DEFAULT_SESSION_SWEEP_SECS),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***REDACTED***");
        f.debug_struct("ServerConfig")
            .field("databricks_host", &self.databricks_host)
            .field("databricks_token", &redact(&self.databricks_token))
            .field("account_id", &self.account_id)
            .field("account_token", &redact(&self.account_token))
            .field("account_host", &self.account_host)
            .field("warehouse_id", &self.warehouse_id)
            .field("oauth", &self.oauth)
            .field("email_from", &self.email_from)
            .field("port", &self.port)
            .field("max_in_flight", &self.max_in_flight)
            .field("vendor_timeout", &self.vendor_timeout)
            .field("group_patch_timeout", &self.group_patch_timeout)
            .field("session_sweep_interval", &self.session_sweep_interval)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, default: u64| {
            var(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(default))
        };

        let oauth = var("DATABRICKS_OAUTH_CLIENT_ID").map(|client_id| OAuthConfig {
            client_id,
            client_secret: var("DATABRICKS_OAUTH_CLIENT_SECRET"),
            redirect_uri: var("DATABRICKS_OAUTH_REDIRECT_URI")
                .unwrap_or_else(|| "http://localhost:5000/api/auth/callback".to_string()),
        });

        Self {
            databricks_host: var("DATABRICKS_HOST").map(normalize_host),
            databricks_token: var("DATABRICKS_TOKEN"),
            account_id: var("DATABRICKS_ACCOUNT_ID"),
            account_token: var("DATABRICKS_ACCOUNT_TOKEN"),
            account_host: var("DATABRICKS_ACCOUNT_HOST")
                .map(normalize_host)
                .unwrap_or_else(|| DEFAULT_ACCOUNTS_HOST.to_string()),
            warehouse_id: var("DATABRICKS_WAREHOUSE_ID"),
            oauth,
            email_from: var("CONSOLE_EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            port: var("CONSOLE_PORT")
                .or_else(|| var("PORT"))
                .and_then(|v| v.trim().parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            max_in_flight: var("CONSOLE_MAX_IN_FLIGHT")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_MAX_IN_FLIGHT),
            vendor_timeout: secs("CONSOLE_VENDOR_TIMEOUT_SECS", DEFAULT_VENDOR_TIMEOUT_SECS),
            group_patch_timeout: secs(
                "CONSOLE_GROUP_PATCH_TIMEOUT_SECS",
                DEFAULT_GROUP_PATCH_TIMEOUT_SECS,
            ),
            session_sweep_interval: secs("CONSOLE_SESSION_SWEEP_SECS", DEFAULT_SESSION_SWEEP_SECS),
        }
    }

    /// Workspace client settings, or `None` when host or token is unset.
    pub fn workspace_client(&self) -> Option<Result<ClientConfig, ClientError>> {
        let host = self.databricks_host.as_ref()?;
        let token = self.databricks_token.as_ref()?;
        let mut builder = ClientConfig::builder(host.clone())
            .token(token.clone())
            .timeout(self.vendor_timeout);
        if let Some(warehouse_id) = &self.warehouse_id {
            builder = builder.warehouse_id(warehouse_id.clone());
        }
        Some(builder.build())
    }

    /// Account-scope client settings, or `None` when the account is not configured.
    pub fn account_client(&self) -> Option<Result<ClientConfig, ClientError>> {
        let account_id = self.account_id.as_ref()?;
        let token = self.account_token.as_ref()?;
        Some(
            ClientConfig::builder(self.account_host.clone())
                .token(token.clone())
                .account_id(account_id.clone())
                .timeout(self.vendor_timeout)
                .build(),
        )
    }
}

/// Accept bare hostnames (`dbc-123.cloud.databricks.com`) as well as URLs.
fn normalize_host(host: String) -> String {
    let host = host.trim().trim_end_matches('/').to_string();
    if host.starts_with("http://") || host.starts_with("https://") {
        host
    } else {
        format!("https://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_in_flight, 16);
        assert_eq!(config.vendor_timeout, Duration::from_secs(30));
        assert_eq!(config.group_patch_timeout, Duration::from_secs(20));
        assert_eq!(config.account_host, DEFAULT_ACCOUNTS_HOST);
        assert!(config.workspace_client().is_none());
        assert!(config.account_client().is_none());
    }

    #[test]
    fn test_port_fallback_and_overrides() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("CONSOLE_MAX_IN_FLIGHT", "4"),
            ("CONSOLE_GROUP_PATCH_TIMEOUT_SECS", "2"),
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.group_patch_timeout, Duration::from_secs(2));

        let config = config_from(&[("CONSOLE_PORT", "9000"), ("PORT", "8081")]);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[("CONSOLE_MAX_IN_FLIGHT", "0"), ("PORT", "abc")]);
        assert_eq!(config.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_workspace_client_config() {
        let config = config_from(&[
            ("DATABRICKS_HOST", "dbc-1.cloud.databricks.com/"),
            ("DATABRICKS_TOKEN", "dapi123"),
            ("DATABRICKS_WAREHOUSE_ID", "wh-9"),
        ]);
        let client = config.workspace_client().unwrap().unwrap();
        assert_eq!(client.host, "https://dbc-1.cloud.databricks.com");
        assert_eq!(client.warehouse_id.as_deref(), Some("wh-9"));
    }

    #[test]
    fn test_account_client_config() {
        let config = config_from(&[
            ("DATABRICKS_ACCOUNT_ID", "acc-1"),
            ("DATABRICKS_ACCOUNT_TOKEN", "tok"),
        ]);
        let client = config.account_client().unwrap().unwrap();
        assert_eq!(client.scim_prefix(), "/api/2.0/accounts/acc-1/scim/v2");
    }

    #[test]
    fn test_secrets_redacted() {
        let config = config_from(&[
            ("DATABRICKS_TOKEN", "dapi_secret"),
            ("DATABRICKS_OAUTH_CLIENT_ID", "app"),
            ("DATABRICKS_OAUTH_CLIENT_SECRET", "oauth_secret"),
        ]);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("dapi_secret"));
        assert!(!debug.contains("oauth_secret"));
        assert!(debug.contains("REDACTED"));
    }
}
