//! Unity Console Databricks Client
//!
//! A Rust HTTP client for the Databricks workspace and account APIs used by
//! the Unity Catalog admin console: SCIM users and groups, Unity Catalog
//! securables and permissions, clusters, jobs, SQL history and statement
//! execution, and DBFS staging.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use unity_console_client::{ClientConfig, DatabricksClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DatabricksClient::new(
//!         ClientConfig::builder("https://dbc-1234.cloud.databricks.com")
//!             .token("dapi...")
//!             .timeout(Duration::from_secs(30))
//!             .build()?,
//!     )?;
//!
//!     for catalog in client.list_catalogs().await? {
//!         println!("{}", catalog.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, ClientError>`. Vendor failures surface as
//! `ClientError::Api` carrying the HTTP status and the vendor `error_code`;
//! helpers such as `is_already_exists()` and `is_timeout()` classify them.
//!
//! Retries are off by default (`max_retries = 0`); raise the limit to retry
//! transient failures with exponential backoff.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{DatabricksClient, SharedClient, DBFS_BLOCK_SIZE};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_ACCOUNTS_HOST};
pub use error::{ClientError, Result};
pub use types::{
    Catalog, Cluster, ClusterEvent, ColumnInfo, CreateCatalogRequest, CreateSchemaRequest,
    CreateTableRequest, ExternalLocation, Job, JobRun, PermissionsChange, PermissionsList,
    PrivilegeAssignment, QueryInfo, Schema, ScimGroup, ScimListResponse, ScimUser, ScimValue,
    SecurableType, StatementResponse, Table,
};
