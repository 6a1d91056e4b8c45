//! REST API types for the conversion endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ConversionError;
use crate::models::{OutputRecord, RowWarning};
use crate::parser::SourceFormat;
use crate::transform::pipeline::Conversion;

/// Number of output records included in a preview.
pub const PREVIEW_ROWS: usize = 5;

/// Response to `POST /api/preview`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready" or "warning" (some rows had an unparseable Start Date)
    pub status: String,

    pub row_count: usize,

    /// Distinct CFL values with their row counts, ascending.
    pub groups: Vec<GroupSummary>,

    /// First output records in bank layout.
    pub preview: Vec<OutputRecord>,

    pub warnings: Vec<RowWarning>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFormat>,
}

/// One group entry in a preview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub value: String,
    pub rows: usize,
}

impl From<&Conversion> for PreviewResponse {
    fn from(conversion: &Conversion) -> Self {
        PreviewResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if conversion.warnings.is_empty() { "ready" } else { "warning" }.to_string(),
            row_count: conversion.output.len(),
            groups: conversion
                .group_counts()
                .into_iter()
                .map(|(value, rows)| GroupSummary { value, rows })
                .collect(),
            preview: conversion.preview(PREVIEW_ROWS).to_vec(),
            warnings: conversion.warnings.clone(),
            source: conversion.source.clone(),
        }
    }
}

/// Create an error response body.
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

/// Error body for a conversion failure, listing missing columns when relevant.
pub fn conversion_error_response(err: &ConversionError) -> Value {
    let mut body = error_response(&err.to_string());
    if let Some(missing) = err.missing_columns() {
        body["missingColumns"] = json!(missing);
    }
    body
}
