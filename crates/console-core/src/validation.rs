//! Input validation for console requests
//!
//! Provides validation functions for:
//! - Required request fields (reported together, by name)
//! - Unity Catalog object names and three-level full names
//! - User names (emails) and cloud source paths
//! - Privilege names

use crate::{ConsoleError, Result};

/// Maximum length for catalog, schema and table names
pub const MAX_NAME_LEN: usize = 255;

/// Required scheme for cloud migration sources
pub const S3_PREFIX: &str = "s3://";

/// Check that every named field is present and non-blank.
///
/// All missing fields are reported in one error, in the order given.
pub fn require_fields(fields: &[(&str, Option<&str>)]) -> Result<()> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.map(|v| v.trim().is_empty()).unwrap_or(true))
        .map(|(name, _)| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConsoleError::MissingFields(missing))
    }
}

/// Validate a single catalog, schema or table name
///
/// Requirements:
/// - Not empty
/// - <= 255 characters
/// - Alphanumeric, underscore, hyphen only (no dots: dots separate levels)
pub fn validate_object_name(name: &str, kind: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ConsoleError::ValidationError(format!(
            "{} name cannot be empty",
            kind
        )));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ConsoleError::ValidationError(format!(
            "{} name too long: {} > {} characters",
            kind,
            name.len(),
            MAX_NAME_LEN
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConsoleError::ValidationError(format!(
            "{} name '{}' contains invalid characters (allowed: alphanumeric, _, -)",
            kind, name
        )));
    }

    Ok(())
}

/// Validate a dotted full name with the expected number of levels.
pub fn validate_full_name(full_name: &str, levels: usize) -> Result<()> {
    let parts: Vec<&str> = full_name.split('.').collect();
    if parts.len() != levels {
        return Err(ConsoleError::ValidationError(format!(
            "'{}' must have {} dot-separated parts",
            full_name, levels
        )));
    }
    for part in parts {
        validate_object_name(part, "Object")?;
    }
    Ok(())
}

/// Join name parts into a Unity Catalog full name.
pub fn full_name(parts: &[&str]) -> String {
    parts.join(".")
}

/// Validate a SCIM user name, which must be an email address.
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ConsoleError::ValidationError(format!(
            "'{}' is not a valid email address",
            email
        )))
    }
}

/// Validate a cloud migration source path.
pub fn validate_s3_path(path: &str) -> Result<()> {
    if !path.starts_with(S3_PREFIX) {
        return Err(ConsoleError::ValidationError(format!(
            "Source path must start with '{}'",
            S3_PREFIX
        )));
    }
    if path.len() <= S3_PREFIX.len() {
        return Err(ConsoleError::ValidationError(
            "Source path must include a bucket".to_string(),
        ));
    }
    Ok(())
}

/// Normalise and validate privilege names (e.g. "use catalog" -> "USE_CATALOG").
pub fn normalize_privileges(privileges: &[String]) -> Result<Vec<String>> {
    if privileges.is_empty() {
        return Err(ConsoleError::MissingFields(vec!["privileges".to_string()]));
    }

    privileges
        .iter()
        .map(|p| {
            let normalized = p.trim().to_uppercase().replace([' ', '-'], "_");
            if normalized.is_empty()
                || !normalized.chars().all(|c| c.is_ascii_uppercase() || c == '_')
            {
                Err(ConsoleError::ValidationError(format!(
                    "Invalid privilege '{}'",
                    p
                )))
            } else {
                Ok(normalized)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_fields_reports_all_missing() {
        let err = require_fields(&[
            ("catalogName", Some("main")),
            ("schemaName", None),
            ("name", Some("   ")),
        ])
        .unwrap_err();

        match err {
            ConsoleError::MissingFields(fields) => {
                assert_eq!(fields, vec!["schemaName", "name"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_require_fields_ok() {
        assert!(require_fields(&[("name", Some("sales"))]).is_ok());
    }

    #[test]
    fn test_object_names() {
        assert!(validate_object_name("sales_2024", "Catalog").is_ok());
        assert!(validate_object_name("raw-events", "Schema").is_ok());
        assert!(validate_object_name("", "Catalog").is_err());
        assert!(validate_object_name("has space", "Table").is_err());
        assert!(validate_object_name("a.b", "Table").is_err());
        assert!(validate_object_name(&"x".repeat(256), "Table").is_err());
    }

    #[test]
    fn test_full_names() {
        assert!(validate_full_name("main.default.orders", 3).is_ok());
        assert!(validate_full_name("main.default", 2).is_ok());
        assert!(validate_full_name("main.default", 3).is_err());
        assert!(validate_full_name("main..orders", 3).is_err());
        assert_eq!(full_name(&["main", "default", "orders"]), "main.default.orders");
    }

    #[test]
    fn test_emails() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada@example").is_err());
        assert!(validate_email("ada example.com").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_s3_paths() {
        assert!(validate_s3_path("s3://bucket/path/data.csv").is_ok());
        let err = validate_s3_path("gs://bucket/data.csv").unwrap_err();
        assert!(err.to_string().contains("s3://"));
        assert!(validate_s3_path("s3://").is_err());
    }

    #[test]
    fn test_normalize_privileges() {
        let privileges = normalize_privileges(&["select".into(), "use catalog".into()]).unwrap();
        assert_eq!(privileges, vec!["SELECT", "USE_CATALOG"]);
        assert!(normalize_privileges(&[]).is_err());
        assert!(normalize_privileges(&["drop; table".into()]).is_err());
    }
}
