//! # Salary Transfer - payroll sheet to bank upload conversion
//!
//! Converts a payroll spreadsheet (`.xlsx`/`.xls`/`.ods` or delimited text)
//! into the fixed-layout bank transfer file, optionally split per CFL group.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Payroll     │────▶│   Parser    │────▶│  Transform  │────▶│   Export    │
//! │ (xlsx/csv)  │     │ (auto-fmt)  │     │ (rules+nar) │     │ (xlsx/zip)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salary_transfer::{convert_file, ConvertOptions};
//!
//! let conversion = convert_file("salary.xlsx", &ConvertOptions::default())?;
//! println!("Groups: {:?}", conversion.groups());
//! let artifact = conversion.export_grouped(&["HQ", "Plant-A"])?;
//! std::fs::write(artifact.file_name(), artifact.bytes())?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Input rows, output records, export artifacts
//! - [`parser`] - Workbook and CSV reading with auto-detection
//! - [`validation`] - Required column checks
//! - [`transform`] - Lookup, narration, mapping, grouping, pipeline
//! - [`export`] - Spreadsheet and zip writers
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// Output
pub mod export;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConversionError, ExportError, InputError, SchemaError, ServerError,
    TemplateError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    ExportArtifact, InputRow, InputTable, OutputRecord, OutputTable, RowWarning, OUTPUT_COLUMNS,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_file,
    ParseResult, SourceFormat,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{missing_columns, normalize_header, validate_columns, ColumnProfile};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    distinct_groups, month_label, next_selection, render_narration, LookupTable, MappingRules,
    MatchMode, MonthStyle, NarrationTemplate,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    convert, convert_and_export, convert_bytes, convert_file, Conversion, ConvertOptions,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{export_grouped, export_single, GROUPED_ARCHIVE_NAME, SINGLE_FILE_NAME};

// =============================================================================
// Re-exports - API
// =============================================================================

pub mod server {
    pub use crate::api::server::*;
}

pub mod pipeline {
    pub use crate::transform::pipeline::*;
}
