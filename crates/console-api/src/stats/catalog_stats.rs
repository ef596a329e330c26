//! Request-scoped statistics for a single catalog.

use super::{privilege_bucket, storage_type, storage_units, FanOutLimiter, StorageType, OTHER_BUCKET, PRIVILEGE_BUCKETS};
use crate::metrics;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use unity_console_client::{
    DatabricksClient, PermissionsList, Result, SecurableType, Table,
};
use unity_console_core::snapshot::with_placeholder;
use unity_console_core::ChartPoint;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStat {
    pub catalog_name: String,
    pub schema_count: u64,
    pub table_count: u64,
    pub view_count: u64,
    pub managed_count: u64,
    pub external_count: u64,
    pub storage_units: u64,
    pub storage_by_type: Vec<ChartPoint>,
    pub tables_by_schema: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalGrants {
    pub principal: String,
    pub privileges: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegeStat {
    pub catalog_name: String,
    pub total_grants: u64,
    pub principal_count: u64,
    pub distribution: Vec<ChartPoint>,
    pub by_principal: Vec<PrincipalGrants>,
}

/// Schema and table counts for one catalog.
///
/// A failed schema listing fails the request; a failed table listing leaves
/// that schema with zero tables.
pub async fn catalog_stats(
    client: &DatabricksClient,
    limiter: &FanOutLimiter,
    catalog: &str,
) -> Result<CatalogStat> {
    let schemas = limiter.run(client.list_schemas(catalog)).await?;

    let listings = schemas.iter().map(|schema| async move {
        match limiter.run(client.list_tables(catalog, &schema.name)).await {
            Ok(tables) => (schema.name.clone(), tables),
            Err(e) => {
                tracing::warn!(
                    catalog = %catalog,
                    schema = %schema.name,
                    error = %e,
                    "Table listing failed, counting zero"
                );
                metrics::record_collector_failure("tables");
                (schema.name.clone(), Vec::new())
            }
        }
    });
    let per_schema = join_all(listings).await;

    Ok(summarize_catalog(catalog, &per_schema))
}

pub fn summarize_catalog(catalog: &str, per_schema: &[(String, Vec<Table>)]) -> CatalogStat {
    let mut stat = CatalogStat {
        catalog_name: catalog.to_string(),
        schema_count: per_schema.len() as u64,
        table_count: 0,
        view_count: 0,
        managed_count: 0,
        external_count: 0,
        storage_units: 0,
        storage_by_type: Vec::new(),
        tables_by_schema: Vec::new(),
    };
    let mut by_type: BTreeMap<StorageType, u64> = BTreeMap::new();

    for (schema, tables) in per_schema {
        let mut in_schema = 0u64;
        for table in tables {
            if table.is_view() {
                stat.view_count += 1;
                continue;
            }
            in_schema += 1;
            match table.table_type.as_deref() {
                Some("MANAGED") => stat.managed_count += 1,
                Some("EXTERNAL") => stat.external_count += 1,
                _ => {}
            }
            let units = storage_units(table);
            stat.storage_units += units;
            *by_type.entry(storage_type(table)).or_default() += units;
        }
        stat.table_count += in_schema;
        if in_schema > 0 {
            stat.tables_by_schema.push(ChartPoint::new(schema.clone(), in_schema));
        }
    }

    stat.tables_by_schema
        .sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    stat.tables_by_schema = with_placeholder(std::mem::take(&mut stat.tables_by_schema));
    stat.storage_by_type = with_placeholder(
        StorageType::ALL
            .iter()
            .filter_map(|kind| by_type.get(kind).map(|units| ChartPoint::new(kind.as_str(), *units)))
            .collect(),
    );
    stat
}

pub async fn privilege_stats(client: &DatabricksClient, catalog: &str) -> Result<PrivilegeStat> {
    let permissions = client
        .get_permissions(SecurableType::Catalog, catalog)
        .await?;
    Ok(summarize_privileges(catalog, &permissions))
}

pub fn summarize_privileges(catalog: &str, permissions: &PermissionsList) -> PrivilegeStat {
    let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut by_principal: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut total = 0u64;

    for assignment in &permissions.privilege_assignments {
        let granted = by_principal.entry(assignment.principal.clone()).or_default();
        for privilege in &assignment.privileges {
            *counts.entry(privilege_bucket(privilege)).or_default() += 1;
            granted.insert(privilege.to_uppercase());
            total += 1;
        }
    }

    let distribution = PRIVILEGE_BUCKETS
        .iter()
        .chain(std::iter::once(&OTHER_BUCKET))
        .filter_map(|bucket| counts.get(bucket).map(|n| ChartPoint::new(*bucket, *n)))
        .collect();

    PrivilegeStat {
        catalog_name: catalog.to_string(),
        total_grants: total,
        principal_count: by_principal.len() as u64,
        distribution: with_placeholder(distribution),
        by_principal: by_principal
            .into_iter()
            .map(|(principal, privileges)| PrincipalGrants {
                principal,
                privileges: privileges.into_iter().collect(),
            })
            .collect(),
    }
}
