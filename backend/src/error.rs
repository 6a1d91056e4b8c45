//! Error types for the salary transfer conversion pipeline.
//!
//! - [`InputError`] - Reading and decoding the uploaded payroll sheet
//! - [`SchemaError`] - Required columns absent from the header
//! - [`TemplateError`] - Narration template problems
//! - [`ExportError`] - Spreadsheet / archive serialization
//! - [`ConfigError`] - Conversion options files
//! - [`ConversionError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP shell
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while reading the payroll sheet into an input table.
#[derive(Debug, Error)]
pub enum InputError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode text content.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Workbook could not be opened or read.
    #[error("Invalid workbook: {0}")]
    Workbook(String),

    /// Workbook has no worksheet to read.
    #[error("Workbook has no sheets")]
    NoSheets,

    /// Delimited text could not be parsed.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file.
    #[error("Input file is empty")]
    EmptyFile,

    /// No header row found.
    #[error("No header row found")]
    NoHeaders,
}

// =============================================================================
// Schema Errors
// =============================================================================

/// One or more required columns are absent from the input header.
///
/// Always aggregated: a single error lists every missing column.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Missing columns in salary sheet: {}", .missing.join(", "))]
pub struct SchemaError {
    /// Missing column names, in required-list order.
    pub missing: Vec<String>,
}

// =============================================================================
// Template Errors
// =============================================================================

/// Errors while compiling a narration template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// Placeholder name has no supplied value.
    #[error("Unknown placeholder '{{{name}}}' in {template} narration (available: {available})")]
    UnknownPlaceholder {
        template: String,
        name: String,
        available: String,
    },

    /// Placeholder carries a conversion or format directive (`{month!r}`, `{month:>9}`).
    #[error("Unsupported placeholder '{{{raw}}}' in {template} narration: format directives are not allowed")]
    FormatDirective { template: String, raw: String },

    /// `{}` with no name.
    #[error("Empty placeholder '{{}}' at position {position} in {template} narration")]
    EmptyPlaceholder { template: String, position: usize },

    /// A `{` without its `}` or a lone `}`.
    #[error("Unbalanced '{brace}' at position {position} in {template} narration")]
    UnbalancedBrace {
        template: String,
        brace: char,
        position: usize,
    },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing output records.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Spreadsheet writer failed.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// Zip archive writer failed.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Grouped export requested with an empty selection.
    #[error("No groups selected for export")]
    NoGroupsSelected,
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors loading conversion options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown required-column profile name.
    #[error("Unknown column profile '{0}' (expected 'full' or 'strict')")]
    UnknownProfile(String),
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Top-level conversion errors.
///
/// Returned by [`crate::transform::pipeline::convert`] and the export helpers.
/// Schema and template failures are user-visible and produce no artifact.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Input reading error.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Schema error.
    #[error("{0}")]
    Schema(#[from] SchemaError),

    /// Template error.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Config error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ConversionError {
    /// Whether the failure was caused by the uploaded data or user input.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::Input(_) | Self::Schema(_) | Self::Template(_) | Self::Config(_) => true,
            Self::Export(ExportError::NoGroupsSelected) => true,
            Self::Export(_) => false,
        }
    }

    /// Missing columns when this is a schema failure.
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            Self::Schema(err) => Some(&err.missing),
            _ => None,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Conversion error.
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;
