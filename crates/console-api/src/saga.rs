//! Table import saga shared by file upload and S3 migration.
//!
//! Steps run in order: `create_table`, `apply_tags`, `stage_file`,
//! `load_data`, `cleanup`. Tagging and cleanup are best effort. When a
//! critical step fails, registered compensations run in reverse (drop the
//! table if this import created it, delete the staged file) and the caller
//! receives the step report.

use crate::error::ApiError;
use crate::metrics;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use unity_console_client::{ClientError, ColumnInfo, CreateTableRequest, DatabricksClient};

/// DBFS directory for staged uploads.
pub const STAGING_ROOT: &str = "/tmp/unity-console";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Completed,
    Skipped,
    Failed,
    Compensated,
}

impl StepOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepOutcome::Completed => "completed",
            StepOutcome::Skipped => "skipped",
            StepOutcome::Failed => "failed",
            StepOutcome::Compensated => "compensated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub step: &'static str,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StepReport {
    steps: Vec<StepRecord>,
}

impl StepReport {
    fn record(&mut self, step: &'static str, outcome: StepOutcome, message: Option<String>) {
        metrics::record_saga_step(step, outcome.as_str());
        tracing::debug!(step = step, outcome = outcome.as_str(), "Import step");
        self.steps.push(StepRecord {
            step,
            outcome,
            message,
        });
    }

    fn mark(&mut self, step: &'static str, outcome: StepOutcome, message: Option<String>) {
        metrics::record_saga_step(step, outcome.as_str());
        if let Some(record) = self.steps.iter_mut().rev().find(|r| r.step == step) {
            record.outcome = outcome;
            if message.is_some() {
                record.message = message;
            }
        }
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn outcome_of(&self, step: &str) -> Option<StepOutcome> {
        self.steps.iter().rev().find(|r| r.step == step).map(|r| r.outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
    Json,
    Parquet,
}

impl FileFormat {
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_lowercase();
        if lower.ends_with(".json") || lower.ends_with(".jsonl") {
            FileFormat::Json
        } else if lower.ends_with(".parquet") {
            FileFormat::Parquet
        } else {
            FileFormat::Csv
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            FileFormat::Csv => "CSV",
            FileFormat::Json => "JSON",
            FileFormat::Parquet => "PARQUET",
        }
    }
}

impl std::str::FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            "parquet" => Ok(FileFormat::Parquet),
            other => Err(format!("Unsupported file format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
}

#[derive(Debug, Clone)]
pub enum ImportSource {
    Upload { file_name: String, data: Vec<u8> },
    S3 { path: String },
}

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnSpec>,
    pub tags: BTreeMap<String, String>,
    pub format: FileFormat,
    /// CSV header row present
    pub header: bool,
    pub delimiter: Option<String>,
    pub source: ImportSource,
}

impl ImportRequest {
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub table: String,
    pub created: bool,
    pub source: String,
    pub steps: StepReport,
}

#[derive(Debug, thiserror::Error)]
pub enum SagaError {
    #[error("Table {table} already exists with a different schema")]
    SchemaMismatch {
        table: String,
        existing: Vec<String>,
        requested: Vec<String>,
        steps: StepReport,
    },

    #[error("Import step '{step}' failed: {}", .source.vendor_message())]
    StepFailed {
        step: &'static str,
        #[source]
        source: ClientError,
        steps: StepReport,
    },
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        let message = err.to_string();
        match err {
            SagaError::SchemaMismatch {
                existing,
                requested,
                steps,
                ..
            } => ApiError::Detailed {
                status: StatusCode::CONFLICT,
                message,
                details: json!({
                    "existingColumns": existing,
                    "requestedColumns": requested,
                    "steps": steps,
                }),
            },
            SagaError::StepFailed { step, steps, .. } => ApiError::Detailed {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message,
                details: json!({ "failedStep": step, "steps": steps }),
            },
        }
    }
}

enum Compensation {
    DropTable(String),
    DeleteStagedFile(String),
}

/// Run an import to completion or compensate.
pub async fn run_import(
    client: &DatabricksClient,
    request: &ImportRequest,
) -> Result<ImportOutcome, SagaError> {
    let mut saga = Saga {
        client,
        report: StepReport::default(),
        compensations: Vec::new(),
    };
    let table = request.full_name();
    tracing::info!(table = %table, "Starting table import");

    let created = saga.create_table(request).await?;
    saga.apply_tags(request).await;
    let location = saga.stage_file(request).await?;
    saga.load_data(request, &location).await?;
    saga.cleanup().await;

    tracing::info!(table = %table, created = created, "Table import finished");
    Ok(ImportOutcome {
        table,
        created,
        source: location,
        steps: saga.report,
    })
}

struct Saga<'a> {
    client: &'a DatabricksClient,
    report: StepReport,
    compensations: Vec<(&'static str, Compensation)>,
}

impl Saga<'_> {
    async fn create_table(&mut self, request: &ImportRequest) -> Result<bool, SagaError> {
        const STEP: &str = "create_table";
        let full_name = request.full_name();
        let columns: Vec<ColumnInfo> = request
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| ColumnInfo::new(c.name.trim(), &c.sql_type, i as u32))
            .collect();
        let create = CreateTableRequest {
            name: request.table.clone(),
            catalog_name: request.catalog.clone(),
            schema_name: request.schema.clone(),
            table_type: "MANAGED".to_string(),
            data_source_format: "DELTA".to_string(),
            columns: columns.clone(),
            ..Default::default()
        };

        match self.client.create_table(&create).await {
            Ok(_) => {
                self.report.record(STEP, StepOutcome::Completed, None);
                self.compensations
                    .push((STEP, Compensation::DropTable(full_name)));
                Ok(true)
            }
            Err(e) if e.is_already_exists() => {
                let existing = match self.client.get_table(&full_name).await {
                    Ok(table) => table.columns,
                    Err(source) => return Err(self.fail(STEP, source).await),
                };
                if schemas_match(&existing, &columns) {
                    tracing::info!(table = %full_name, "Table exists with matching schema, loading into it");
                    self.report.record(
                        STEP,
                        StepOutcome::Skipped,
                        Some("Table already exists with a matching schema".to_string()),
                    );
                    Ok(false)
                } else {
                    self.report.record(
                        STEP,
                        StepOutcome::Failed,
                        Some("Existing table schema differs".to_string()),
                    );
                    Err(SagaError::SchemaMismatch {
                        table: full_name,
                        existing: describe_columns(&existing),
                        requested: describe_columns(&columns),
                        steps: std::mem::take(&mut self.report),
                    })
                }
            }
            Err(source) => Err(self.fail(STEP, source).await),
        }
    }

    async fn apply_tags(&mut self, request: &ImportRequest) {
        const STEP: &str = "apply_tags";
        if request.tags.is_empty() {
            self.report.record(STEP, StepOutcome::Skipped, None);
            return;
        }
        let sql = set_tags_sql(&request.full_name(), &request.tags);
        match self.client.execute_statement(&sql).await {
            Ok(_) => self.report.record(STEP, StepOutcome::Completed, None),
            Err(e) => {
                tracing::warn!(table = %request.full_name(), error = %e, "Tagging failed, continuing");
                self.report
                    .record(STEP, StepOutcome::Failed, Some(e.vendor_message()));
            }
        }
    }

    /// Returns the location `COPY INTO` reads from.
    async fn stage_file(&mut self, request: &ImportRequest) -> Result<String, SagaError> {
        const STEP: &str = "stage_file";
        match &request.source {
            ImportSource::S3 { path } => {
                self.report.record(
                    STEP,
                    StepOutcome::Skipped,
                    Some("Loading directly from the source path".to_string()),
                );
                Ok(path.clone())
            }
            ImportSource::Upload { file_name, data } => {
                let path = staging_path(file_name);
                match self.client.dbfs_upload(&path, data).await {
                    Ok(()) => {
                        self.report.record(STEP, StepOutcome::Completed, None);
                        self.compensations
                            .push((STEP, Compensation::DeleteStagedFile(path.clone())));
                        Ok(format!("dbfs:{}", path))
                    }
                    Err(source) => Err(self.fail(STEP, source).await),
                }
            }
        }
    }

    async fn load_data(&mut self, request: &ImportRequest, location: &str) -> Result<(), SagaError> {
        const STEP: &str = "load_data";
        let sql = copy_into_sql(request, location);
        match self.client.execute_statement(&sql).await {
            Ok(_) => {
                self.report.record(STEP, StepOutcome::Completed, None);
                Ok(())
            }
            Err(source) => Err(self.fail(STEP, source).await),
        }
    }

    async fn cleanup(&mut self) {
        const STEP: &str = "cleanup";
        let staged: Vec<String> = self
            .compensations
            .iter()
            .filter_map(|(_, c)| match c {
                Compensation::DeleteStagedFile(path) => Some(path.clone()),
                _ => None,
            })
            .collect();
        self.compensations.clear();

        if staged.is_empty() {
            self.report.record(STEP, StepOutcome::Skipped, None);
            return;
        }
        for path in staged {
            match self.client.dbfs_delete(&path).await {
                Ok(()) => self.report.record(STEP, StepOutcome::Completed, None),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Staged file cleanup failed");
                    self.report
                        .record(STEP, StepOutcome::Failed, Some(e.vendor_message()));
                }
            }
        }
    }

    /// Record a critical failure, compensate and build the error.
    async fn fail(&mut self, step: &'static str, source: ClientError) -> SagaError {
        tracing::error!(step = step, error = %source, "Import step failed, compensating");
        self.report
            .record(step, StepOutcome::Failed, Some(source.vendor_message()));

        while let Some((done_step, compensation)) = self.compensations.pop() {
            let result = match &compensation {
                Compensation::DropTable(table) => self.client.delete_table(table).await,
                Compensation::DeleteStagedFile(path) => self.client.dbfs_delete(path).await,
            };
            match result {
                Ok(()) => self.report.mark(done_step, StepOutcome::Compensated, None),
                Err(e) => {
                    tracing::warn!(step = done_step, error = %e, "Compensation failed");
                    self.report.mark(
                        done_step,
                        StepOutcome::Completed,
                        Some(format!("Compensation failed: {}", e.vendor_message())),
                    );
                }
            }
        }

        SagaError::StepFailed {
            step,
            source,
            steps: std::mem::take(&mut self.report),
        }
    }
}

/// Same column names and types, ignoring order and name case. Decimal
/// parameters and nested type text are compared when both sides report them.
pub fn schemas_match(existing: &[ColumnInfo], requested: &[ColumnInfo]) -> bool {
    let (existing, requested) = (by_name(existing), by_name(requested));
    existing.len() == requested.len()
        && existing
            .iter()
            .zip(&requested)
            .all(|((a_name, a), (b_name, b))| a_name == b_name && same_type(a, b))
}

fn by_name(columns: &[ColumnInfo]) -> Vec<(String, &ColumnInfo)> {
    let mut columns: Vec<(String, &ColumnInfo)> = columns
        .iter()
        .map(|c| (c.name.to_lowercase(), c))
        .collect();
    columns.sort_by(|a, b| a.0.cmp(&b.0));
    columns
}

fn same_type(a: &ColumnInfo, b: &ColumnInfo) -> bool {
    let keyword = a.keyword();
    if keyword != b.keyword() {
        return false;
    }
    if let (Some(x), Some(y)) = (a.decimal(), b.decimal()) {
        return x == y;
    }
    let nested = matches!(keyword.as_str(), "ARRAY" | "MAP" | "STRUCT");
    let compact = |c: &ColumnInfo| -> String {
        c.type_text
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    };
    if nested && !a.type_text.trim().is_empty() && !b.type_text.trim().is_empty() {
        return compact(a) == compact(b);
    }
    true
}

fn describe_columns(columns: &[ColumnInfo]) -> Vec<String> {
    columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.display_type()))
        .collect()
}

fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("`{}`", part.replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn set_tags_sql(table: &str, tags: &BTreeMap<String, String>) -> String {
    let pairs: Vec<String> = tags
        .iter()
        .map(|(k, v)| format!("{} = {}", quote_literal(k), quote_literal(v)))
        .collect();
    format!("ALTER TABLE {} SET TAGS ({})", quote_ident(table), pairs.join(", "))
}

pub fn copy_into_sql(request: &ImportRequest, location: &str) -> String {
    let mut sql = format!(
        "COPY INTO {} FROM {} FILEFORMAT = {}",
        quote_ident(&request.full_name()),
        quote_literal(location),
        request.format.keyword()
    );
    if request.format == FileFormat::Csv {
        let mut options = vec![
            format!("'header' = '{}'", request.header),
            "'inferSchema' = 'true'".to_string(),
        ];
        if let Some(delimiter) = &request.delimiter {
            options.push(format!("'delimiter' = {}", quote_literal(delimiter)));
        }
        sql.push_str(&format!(" FORMAT_OPTIONS ({})", options.join(", ")));
    }
    sql.push_str(" COPY_OPTIONS ('mergeSchema' = 'false')");
    sql
}

/// Unique DBFS path for one upload.
pub fn staging_path(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let safe = if safe.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        safe
    };
    format!("{}/{}/{}", STAGING_ROOT, uuid::Uuid::new_v4(), safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: ImportSource) -> ImportRequest {
        ImportRequest {
            catalog: "main".into(),
            schema: "sales".into(),
            table: "orders".into(),
            columns: vec![ColumnSpec {
                name: "id".into(),
                sql_type: "bigint".into(),
            }],
            tags: BTreeMap::new(),
            format: FileFormat::Csv,
            header: true,
            delimiter: Some(";".into()),
            source,
        }
    }

    #[test]
    fn test_copy_into_csv() {
        let req = request(ImportSource::S3 {
            path: "s3://bucket/orders.csv".into(),
        });
        assert_eq!(
            copy_into_sql(&req, "s3://bucket/orders.csv"),
            "COPY INTO `main`.`sales`.`orders` FROM 's3://bucket/orders.csv' FILEFORMAT = CSV \
             FORMAT_OPTIONS ('header' = 'true', 'inferSchema' = 'true', 'delimiter' = ';') \
             COPY_OPTIONS ('mergeSchema' = 'false')"
        );
    }

    #[test]
    fn test_copy_into_parquet_has_no_csv_options() {
        let mut req = request(ImportSource::S3 {
            path: "s3://b/x.parquet".into(),
        });
        req.format = FileFormat::Parquet;
        let sql = copy_into_sql(&req, "s3://b/x.parquet");
        assert!(sql.contains("FILEFORMAT = PARQUET"));
        assert!(!sql.contains("FORMAT_OPTIONS"));
    }

    #[test]
    fn test_set_tags_escapes_quotes() {
        let mut tags = BTreeMap::new();
        tags.insert("owner".to_string(), "o'brien".to_string());
        tags.insert("domain".to_string(), "sales".to_string());
        assert_eq!(
            set_tags_sql("main.sales.orders", &tags),
            "ALTER TABLE `main`.`sales`.`orders` SET TAGS ('domain' = 'sales', 'owner' = 'o''brien')"
        );
    }

    #[test]
    fn test_schemas_match_ignores_order_and_case() {
        let existing = vec![
            ColumnInfo::new("Name", "string", 1),
            ColumnInfo::new("id", "long", 0),
        ];
        let requested = vec![
            ColumnInfo::new("id", "bigint", 0),
            ColumnInfo::new("name", "STRING", 1),
        ];
        assert!(schemas_match(&existing, &requested));

        let different = vec![ColumnInfo::new("id", "string", 0)];
        assert!(!schemas_match(&existing, &different));
    }

    fn reported(name: &str, type_name: &str, type_text: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            type_name: type_name.to_string(),
            type_text: type_text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_schemas_match_parameterized_types() {
        let existing = vec![
            reported("id", "LONG", "bigint"),
            reported("price", "DECIMAL", "decimal(10,2)"),
            reported("flag", "BYTE", "tinyint"),
            reported("tags", "ARRAY", "array<string>"),
        ];
        let requested = vec![
            ColumnInfo::new("id", "bigint", 0),
            ColumnInfo::new("price", "decimal(10, 2)", 1),
            ColumnInfo::new("flag", "tinyint", 2),
            ColumnInfo::new("tags", "ARRAY<STRING>", 3),
        ];
        assert!(schemas_match(&existing, &requested));

        let mut wider = requested.clone();
        wider[1] = ColumnInfo::new("price", "decimal(12,2)", 1);
        assert!(!schemas_match(&existing, &wider));

        let mut nested = requested;
        nested[3] = ColumnInfo::new("tags", "array<int>", 3);
        assert!(!schemas_match(&existing, &nested));
    }

    #[test]
    fn test_schemas_match_keyword_only_report() {
        let existing = vec![reported("flag", "BYTE", ""), reported("price", "DECIMAL", "")];
        let requested = vec![
            ColumnInfo::new("flag", "tinyint", 0),
            ColumnInfo::new("price", "decimal(10,2)", 1),
        ];
        assert!(schemas_match(&existing, &requested));
    }

    #[test]
    fn test_staging_path_is_unique_and_sanitized() {
        let a = staging_path("my file (1).csv");
        let b = staging_path("my file (1).csv");
        assert_ne!(a, b);
        assert!(a.starts_with("/tmp/unity-console/"));
        assert!(a.ends_with("/my_file__1_.csv"));
        assert!(staging_path("..").ends_with("/upload"));
    }

    #[test]
    fn test_file_format_detection() {
        assert_eq!(FileFormat::from_path("s3://b/data.JSON"), FileFormat::Json);
        assert_eq!(FileFormat::from_path("x.parquet"), FileFormat::Parquet);
        assert_eq!(FileFormat::from_path("x.txt"), FileFormat::Csv);
        assert!("xml".parse::<FileFormat>().is_err());
    }

    #[test]
    fn test_report_mark_compensated() {
        let mut report = StepReport::default();
        report.record("create_table", StepOutcome::Completed, None);
        report.record("load_data", StepOutcome::Failed, Some("boom".into()));
        report.mark("create_table", StepOutcome::Compensated, None);
        assert_eq!(report.outcome_of("create_table"), Some(StepOutcome::Compensated));
        assert_eq!(report.outcome_of("load_data"), Some(StepOutcome::Failed));
    }
}
