//! Unity Console Core
//!
//! Shared types for the Unity Catalog admin console: the dashboard time
//! filter, the workspace snapshot contract consumed by the front end, and
//! request validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod snapshot;
pub mod validation;

pub use snapshot::{
    ChartPoint, CostEstimate, PrivilegeDistribution, QueryPerformance, ReadinessScores,
    RecentQuery, UsagePoint, WorkspaceSnapshot, NO_DATA,
};

/// Dashboard time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    /// Last 24 hours
    Day,
    /// Last 7 days
    #[default]
    Week,
    /// Last 30 days
    Month,
}

impl TimeFilter {
    /// All supported filters.
    pub const ALL: [TimeFilter; 3] = [TimeFilter::Day, TimeFilter::Week, TimeFilter::Month];

    /// Number of calendar days covered by the window.
    pub fn days(&self) -> u32 {
        match self {
            TimeFilter::Day => 1,
            TimeFilter::Week => 7,
            TimeFilter::Month => 30,
        }
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        Duration::from_secs(u64::from(self.days()) * 24 * 60 * 60)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
        }
    }
}

impl std::fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TimeFilter {
    type Err = ConsoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(TimeFilter::Day),
            "week" => Ok(TimeFilter::Week),
            "month" => Ok(TimeFilter::Month),
            _ => Err(ConsoleError::ValidationError(format!(
                "Unknown time filter '{}' (expected day, week or month)",
                s
            ))),
        }
    }
}

/// Errors raised by core validation and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_filter_days() {
        assert_eq!(TimeFilter::Day.days(), 1);
        assert_eq!(TimeFilter::Week.days(), 7);
        assert_eq!(TimeFilter::Month.days(), 30);
        assert_eq!(TimeFilter::Week.window(), Duration::from_secs(7 * 86_400));
    }

    #[test]
    fn test_time_filter_parse() {
        assert_eq!("day".parse::<TimeFilter>().unwrap(), TimeFilter::Day);
        assert_eq!("WEEK".parse::<TimeFilter>().unwrap(), TimeFilter::Week);
        assert_eq!(" month ".parse::<TimeFilter>().unwrap(), TimeFilter::Month);
        assert!("year".parse::<TimeFilter>().is_err());
    }

    #[test]
    fn test_time_filter_default_is_week() {
        assert_eq!(TimeFilter::default(), TimeFilter::Week);
    }

    #[test]
    fn test_time_filter_serde() {
        let json = serde_json::to_string(&TimeFilter::Month).unwrap();
        assert_eq!(json, "\"month\"");
        let parsed: TimeFilter = serde_json::from_str("\"day\"").unwrap();
        assert_eq!(parsed, TimeFilter::Day);
    }

    #[test]
    fn test_missing_fields_message() {
        let err = ConsoleError::MissingFields(vec!["catalog".into(), "schema".into()]);
        assert_eq!(
            err.to_string(),
            "Missing required field(s): catalog, schema"
        );
    }
}
