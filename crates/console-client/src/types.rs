//! Request and response types for the Databricks APIs.
//!
//! These mirror the vendor wire format (snake_case for REST, camelCase for
//! SCIM). Unknown fields are ignored and most fields are optional because
//! the vendor omits empty values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// SCIM
// ============================================================================

pub const SCIM_USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const SCIM_GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const SCIM_PATCH_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Multi-valued SCIM attribute (emails, members, groups).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScimValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ScimValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<ScimValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<ScimValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entitlements: Vec<ScimValue>,
}

impl ScimUser {
    /// New user payload for SCIM create.
    pub fn new(user_name: impl Into<String>, display_name: Option<String>) -> Self {
        let user_name = user_name.into();
        Self {
            schemas: vec![SCIM_USER_SCHEMA.to_string()],
            emails: vec![ScimValue {
                value: user_name.clone(),
                primary: Some(true),
                kind: Some("work".to_string()),
                ..Default::default()
            }],
            user_name,
            display_name,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ScimValue>,
}

impl ScimGroup {
    pub fn new(display_name: impl Into<String>, member_ids: &[String]) -> Self {
        Self {
            schemas: vec![SCIM_GROUP_SCHEMA.to_string()],
            display_name: display_name.into(),
            members: member_ids.iter().map(ScimValue::new).collect(),
            ..Default::default()
        }
    }
}

/// Paged SCIM list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListResponse<T> {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub start_index: Option<u64>,
    #[serde(default)]
    pub items_per_page: Option<u64>,
    #[serde(rename = "Resources", default = "Vec::new")]
    pub resources: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScimPatchOperation {
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScimPatchRequest {
    #[serde(rename = "schemas")]
    pub schemas: Vec<String>,
    pub operations: Vec<ScimPatchOperation>,
}

impl ScimPatchRequest {
    /// Add the given members and remove others by filter.
    pub fn members(add: &[String], remove: &[String]) -> Self {
        let mut operations = Vec::new();
        if !add.is_empty() {
            let members: Vec<ScimValue> = add.iter().map(ScimValue::new).collect();
            operations.push(ScimPatchOperation {
                op: "add".to_string(),
                path: Some("members".to_string()),
                value: serde_json::to_value(members).ok(),
            });
        }
        for id in remove {
            operations.push(ScimPatchOperation {
                op: "remove".to_string(),
                path: Some(format!("members[value eq \"{}\"]", id)),
                value: None,
            });
        }
        Self {
            schemas: vec![SCIM_PATCH_SCHEMA.to_string()],
            operations,
        }
    }
}

// ============================================================================
// Unity Catalog
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metastore_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCatalogsResponse {
    #[serde(default)]
    pub catalogs: Vec<Catalog>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCatalogRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_root: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default)]
    pub catalog_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSchemasResponse {
    #[serde(default)]
    pub schemas: Vec<Schema>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSchemaRequest {
    pub name: String,
    pub catalog_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Type keyword, e.g. `STRING`, `LONG`, `DECIMAL`
    #[serde(default)]
    pub type_name: String,
    /// SQL type text, e.g. `string`, `bigint`, `decimal(10,2)`
    #[serde(default)]
    pub type_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_scale: Option<u32>,
    #[serde(default)]
    pub position: u32,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Precision and scale of a bare `decimal`.
const DEFAULT_DECIMAL: (u32, u32) = (10, 0);

/// Unity Catalog type keyword for a SQL type, parameters stripped.
pub fn type_keyword(sql_type: &str) -> String {
    let text = sql_type.trim().to_lowercase();
    let base = text
        .split(|c: char| c == '(' || c == '<')
        .next()
        .unwrap_or_default()
        .trim();
    let keyword = match base {
        "bigint" | "long" => "LONG",
        "int" | "integer" => "INT",
        "smallint" | "short" => "SHORT",
        "tinyint" | "byte" => "BYTE",
        "string" | "varchar" | "char" => "STRING",
        "bool" | "boolean" => "BOOLEAN",
        "float" | "real" => "FLOAT",
        "double" => "DOUBLE",
        "decimal" | "dec" | "numeric" => "DECIMAL",
        "date" => "DATE",
        "timestamp" | "timestamp_ltz" => "TIMESTAMP",
        "timestamp_ntz" => "TIMESTAMP_NTZ",
        "binary" => "BINARY",
        "array" => "ARRAY",
        "map" => "MAP",
        "struct" => "STRUCT",
        "interval" => "INTERVAL",
        "variant" => "VARIANT",
        other => return other.to_uppercase(),
    };
    keyword.to_string()
}

/// `(precision, scale)` of a decimal type text; `None` for other types.
fn decimal_params(sql_type: &str) -> Option<(u32, u32)> {
    if type_keyword(sql_type) != "DECIMAL" {
        return None;
    }
    let text: String = sql_type.chars().filter(|c| !c.is_whitespace()).collect();
    let inner = match (text.find('('), text.rfind(')')) {
        (Some(open), Some(close)) if close > open => &text[open + 1..close],
        _ => return Some(DEFAULT_DECIMAL),
    };
    let mut parts = inner.split(',');
    let precision = parts.next().and_then(|p| p.parse().ok())?;
    let scale = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    Some((precision, scale))
}

impl ColumnInfo {
    /// Column from a SQL type (`string`, `bigint`, `decimal(10,2)`, ...).
    pub fn new(name: impl Into<String>, sql_type: &str, position: u32) -> Self {
        let compact: String = sql_type
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let type_name = type_keyword(&compact);
        let params = decimal_params(&compact);
        let type_text = match params {
            Some((p, s)) => format!("decimal({},{})", p, s),
            None => compact,
        };
        Self {
            name: name.into(),
            type_name,
            type_text,
            type_precision: params.map(|(p, _)| p),
            type_scale: params.map(|(_, s)| s),
            position,
            nullable: true,
            comment: None,
        }
    }

    /// Keyword as the vendor reports it, derived from `type_text` when present.
    pub fn keyword(&self) -> String {
        if self.type_text.trim().is_empty() {
            self.type_name.trim().to_uppercase()
        } else {
            type_keyword(&self.type_text)
        }
    }

    /// Decimal precision and scale, from the explicit fields or the type text.
    pub fn decimal(&self) -> Option<(u32, u32)> {
        match (self.type_precision, self.type_scale) {
            (Some(p), Some(s)) if self.keyword() == "DECIMAL" => Some((p, s)),
            _ if self.type_text.trim().is_empty() => None,
            _ => decimal_params(&self.type_text),
        }
    }

    /// Type rendered for messages, e.g. `LONG` or `DECIMAL(10,2)`.
    pub fn display_type(&self) -> String {
        match self.decimal() {
            Some((p, s)) => format!("{}({},{})", self.keyword(), p, s),
            None => self.keyword(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub catalog_name: String,
    #[serde(default)]
    pub schema_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// `MANAGED`, `EXTERNAL`, `VIEW`, `MATERIALIZED_VIEW`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
    /// `DELTA`, `PARQUET`, `CSV`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Table {
    pub fn is_view(&self) -> bool {
        matches!(
            self.table_type.as_deref(),
            Some("VIEW") | Some("MATERIALIZED_VIEW")
        )
    }

    /// Dotted name, built from parts when the vendor omitted it.
    pub fn qualified_name(&self) -> String {
        self.full_name.clone().unwrap_or_else(|| {
            format!("{}.{}.{}", self.catalog_name, self.schema_name, self.name)
        })
    }

    /// Reported size in bytes from table statistics properties.
    pub fn size_bytes(&self) -> Option<u64> {
        ["spark.sql.statistics.totalSize", "totalSize"]
            .iter()
            .find_map(|key| self.properties.get(*key))
            .and_then(|v| v.trim().parse::<u64>().ok())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTablesResponse {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTableRequest {
    pub name: String,
    pub catalog_name: String,
    pub schema_name: String,
    pub table_type: String,
    pub data_source_format: String,
    pub columns: Vec<ColumnInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Securable kinds accepted by the permissions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurableType {
    Catalog,
    Schema,
    Table,
    Volume,
    Function,
    ExternalLocation,
    StorageCredential,
    Metastore,
}

impl SecurableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurableType::Catalog => "catalog",
            SecurableType::Schema => "schema",
            SecurableType::Table => "table",
            SecurableType::Volume => "volume",
            SecurableType::Function => "function",
            SecurableType::ExternalLocation => "external_location",
            SecurableType::StorageCredential => "storage_credential",
            SecurableType::Metastore => "metastore",
        }
    }
}

impl std::str::FromStr for SecurableType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "catalog" => Ok(SecurableType::Catalog),
            "schema" => Ok(SecurableType::Schema),
            "table" => Ok(SecurableType::Table),
            "volume" => Ok(SecurableType::Volume),
            "function" => Ok(SecurableType::Function),
            "external_location" => Ok(SecurableType::ExternalLocation),
            "storage_credential" => Ok(SecurableType::StorageCredential),
            "metastore" => Ok(SecurableType::Metastore),
            other => Err(format!("Unknown securable type '{}'", other)),
        }
    }
}

impl std::fmt::Display for SecurableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivilegeAssignment {
    pub principal: String,
    #[serde(default)]
    pub privileges: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionsList {
    #[serde(default)]
    pub privilege_assignments: Vec<PrivilegeAssignment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionsChange {
    pub principal: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePermissions {
    pub changes: Vec<PermissionsChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalLocation {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListExternalLocationsResponse {
    #[serde(default)]
    pub external_locations: Vec<ExternalLocation>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

// ============================================================================
// Clusters & Jobs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub data_security_mode: Option<String>,
    #[serde(default)]
    pub creator_user_name: Option<String>,
    #[serde(default)]
    pub spark_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListClustersResponse {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterEvent {
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl ClusterEvent {
    /// User attributed by the event details, when present.
    pub fn user(&self) -> Option<String> {
        self.details
            .get("user")
            .and_then(|u| u.as_str())
            .map(String::from)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterEventsRequest {
    pub cluster_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    pub order: String,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterEventsResponse {
    #[serde(default)]
    pub events: Vec<ClusterEvent>,
}

/// Cluster definition embedded in a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(default)]
    pub data_security_mode: Option<String>,
    #[serde(default)]
    pub spark_version: Option<String>,
    #[serde(default)]
    pub num_workers: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobTask {
    #[serde(default)]
    pub task_key: String,
    #[serde(default)]
    pub new_cluster: Option<ClusterSpec>,
    #[serde(default)]
    pub existing_cluster_id: Option<String>,
    #[serde(default)]
    pub job_cluster_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobCluster {
    #[serde(default)]
    pub job_cluster_key: String,
    #[serde(default)]
    pub new_cluster: Option<ClusterSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tasks: Vec<JobTask>,
    #[serde(default)]
    pub job_clusters: Vec<JobCluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: i64,
    #[serde(default)]
    pub creator_user_name: Option<String>,
    #[serde(default)]
    pub created_time: Option<i64>,
    #[serde(default)]
    pub settings: JobSettings,
}

impl Job {
    /// Every cluster spec the job declares, from tasks and shared job clusters.
    pub fn cluster_specs(&self) -> impl Iterator<Item = &ClusterSpec> {
        self.settings
            .tasks
            .iter()
            .filter_map(|t| t.new_cluster.as_ref())
            .chain(
                self.settings
                    .job_clusters
                    .iter()
                    .filter_map(|c| c.new_cluster.as_ref()),
            )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListJobsResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    pub life_cycle_state: Option<String>,
    #[serde(default)]
    pub result_state: Option<String>,
    #[serde(default)]
    pub state_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    pub run_id: i64,
    #[serde(default)]
    pub job_id: Option<i64>,
    #[serde(default)]
    pub run_name: Option<String>,
    #[serde(default)]
    pub creator_user_name: Option<String>,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub run_duration: Option<i64>,
    #[serde(default)]
    pub execution_duration: Option<i64>,
    #[serde(default)]
    pub state: RunState,
}

impl JobRun {
    /// Wall-clock duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.run_duration
            .or(self.execution_duration)
            .or_else(|| self.end_time.map(|end| end - self.start_time))
            .unwrap_or(0)
            .max(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRunsResponse {
    #[serde(default)]
    pub runs: Vec<JobRun>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

// ============================================================================
// SQL
// ============================================================================

/// One row of the SQL query history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryInfo {
    #[serde(default)]
    pub query_id: String,
    #[serde(default)]
    pub query_text: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    /// `QUEUED`, `RUNNING`, `FINISHED`, `FAILED`, `CANCELED`
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub query_start_time_ms: i64,
    #[serde(default)]
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryHistoryResponse {
    #[serde(default)]
    pub res: Vec<QueryInfo>,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteStatementRequest {
    pub statement: String,
    pub warehouse_id: String,
    pub wait_timeout: String,
    pub on_wait_timeout: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementStatus {
    /// `PENDING`, `RUNNING`, `SUCCEEDED`, `FAILED`, `CANCELED`, `CLOSED`
    pub state: String,
    #[serde(default)]
    pub error: Option<StatementError>,
}

impl StatementStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self.state.as_str(), "PENDING" | "RUNNING")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResponse {
    pub statement_id: String,
    pub status: StatementStatus,
}

// ============================================================================
// DBFS & errors
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DbfsHandle {
    pub handle: i64,
}

/// Vendor error body. SCIM errors use `detail`, REST errors `message`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default, rename = "scimType")]
    pub scim_type: Option<String>,
}

impl ApiError {
    pub fn text(&self) -> Option<String> {
        self.message.clone().or_else(|| self.detail.clone())
    }
}
