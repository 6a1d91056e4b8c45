//! Required-column checks for payroll sheets.
//!
//! The only validation performed on input is presence of the required
//! headers. Cell values are never inspected here.
//!
//! # Profiles
//!
//! Two required-column sets exist in the wild:
//!
//! - [`ColumnProfile::Full`] - the complete payroll export (35 columns)
//! - [`ColumnProfile::Strict`] - only the columns the mapper reads (10 columns)
//!
//! Callers can also pass an explicit list, so the set stays configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use salary_transfer::validation::{validate_columns, ColumnProfile};
//!
//! let headers = vec!["Employee".to_string(), "Net Pay".to_string()];
//! let err = validate_columns(&headers, &ColumnProfile::Strict.columns()).unwrap_err();
//! assert!(err.missing.contains(&"IFSC Code".to_string()));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ConfigError, SchemaError};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Every column of the full payroll export.
pub const FULL_REQUIRED_COLUMNS: [&str; 35] = [
    "Employee",
    "Employee Name",
    "Narration",
    "Bank Name",
    "IFSC Code",
    "Bank A/C No.",
    "Date of Joining",
    "Branch",
    "Region",
    "District",
    "CFL",
    "Block",
    "Department",
    "Designation",
    "Company",
    "Start Date",
    "End Date",
    "Leave Without Pay",
    "Absent Days",
    "Payment Days",
    "Basic",
    "Conveyance Allowance",
    "Dearness Allowance",
    "House Rent Allowance",
    "Leave Travel Allowance",
    "Medical Allowance",
    "Other Allowance",
    "Gross Pay",
    "ESI - Employee Contribution",
    "ESI - Employer Contribution",
    "PF (Employee's Contribution)",
    "PF (Employer's Contribution)",
    "Loan Repayment",
    "Total Deduction",
    "Net Pay",
];

/// Columns the row mapper actually reads.
pub const STRICT_REQUIRED_COLUMNS: [&str; 10] = [
    "Employee",
    "Employee Name",
    "Bank Name",
    "IFSC Code",
    "Bank A/C No.",
    "CFL",
    "Branch",
    "Start Date",
    "End Date",
    "Net Pay",
];

/// Named required-column preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnProfile {
    #[default]
    Full,
    Strict,
}

impl ColumnProfile {
    pub fn columns(&self) -> Vec<String> {
        let cols: &[&str] = match self {
            ColumnProfile::Full => &FULL_REQUIRED_COLUMNS,
            ColumnProfile::Strict => &STRICT_REQUIRED_COLUMNS,
        };
        cols.iter().map(|c| c.to_string()).collect()
    }
}

impl std::str::FromStr for ColumnProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "strict" => Ok(Self::Strict),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

/// Canonical form of a header name: trimmed, whitespace runs collapsed, lowercase.
pub fn normalize_header(name: &str) -> String {
    WHITESPACE.replace_all(name.trim(), " ").to_lowercase()
}

/// Required columns absent from `headers`, in `required` order.
///
/// Matching is case- and whitespace-insensitive.
pub fn missing_columns<S: AsRef<str>>(headers: &[String], required: &[S]) -> Vec<String> {
    let present: HashSet<String> = headers.iter().map(|h| normalize_header(h)).collect();

    required
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !present.contains(&normalize_header(c)))
        .map(String::from)
        .collect()
}

/// Check that every required column is present.
///
/// # Returns
/// * `Ok(())` if all present
/// * `Err(SchemaError)` listing every missing column at once
pub fn validate_columns<S: AsRef<str>>(headers: &[String], required: &[S]) -> Result<(), SchemaError> {
    let missing = missing_columns(headers, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError { missing })
    }
}
