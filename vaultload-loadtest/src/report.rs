//! Tabular reshaping of merged results for dashboard consumers

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Float,
    Integer,
    Bool,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    pub friendly_name: String,
}

impl Column {
    fn new(name: &str, kind: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            friendly_name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub total: f64,
    pub mean: f64,
    pub p50th: f64,
    pub p95th: f64,
    pub p99th: f64,
    pub max: f64,
    pub requests: u64,
    pub rate: f64,
    pub duration: f64,
    pub success: bool,
    /// JSON-encoded status code histogram
    #[serde(rename = "statusCodes")]
    pub status_codes: String,
    pub errors: String,
}

/// Fixed schema: one row, columns in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub columns: Vec<Column>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn columns() -> Vec<Column> {
        [
            ("total", ColumnType::Float),
            ("mean", ColumnType::Float),
            ("p50th", ColumnType::Float),
            ("p95th", ColumnType::Float),
            ("p99th", ColumnType::Float),
            ("max", ColumnType::Float),
            ("requests", ColumnType::Integer),
            ("duration", ColumnType::Integer),
            ("rate", ColumnType::Float),
            ("success", ColumnType::Bool),
            ("statusCodes", ColumnType::String),
            ("errors", ColumnType::String),
        ]
        .into_iter()
        .map(|(name, kind)| Column::new(name, kind))
        .collect()
    }

    pub fn from_summary(summary: &AggregateSummary) -> Self {
        let status_codes =
            serde_json::to_string(&summary.status_codes).unwrap_or_else(|_| "{}".to_string());

        Self {
            columns: Self::columns(),
            rows: vec![ReportRow {
                total: summary.total,
                mean: summary.mean,
                p50th: summary.p50,
                p95th: summary.p95,
                p99th: summary.p99,
                max: summary.max,
                requests: summary.requests,
                rate: summary.rate,
                duration: summary.duration,
                success: summary.success,
                status_codes,
                errors: summary.errors.clone(),
            }],
        }
    }
}
