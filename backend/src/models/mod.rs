//! Domain models for the salary transfer pipeline.
//!
//! - [`InputTable`] / [`InputRow`] - Parsed payroll sheet, every cell as text
//! - [`OutputRecord`] / [`OutputTable`] - Bank bulk-transfer rows in fixed layout
//! - [`ExportArtifact`] - Serialized spreadsheet or zip archive
//! - [`RowWarning`] - Non-fatal per-row issues

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::validation::normalize_header;

// =============================================================================
// Output Layout
// =============================================================================

/// Output columns in the exact order the bank's bulk-upload format expects.
pub const OUTPUT_COLUMNS: [&str; 49] = [
    "Client_Code",
    "Product_Code",
    "Payment_Type",
    "Payment_Ref_No.",
    "Payment_Date",
    "Instrument Date",
    "Dr_Ac_No",
    "Amount",
    "Bank_Code_Indicator",
    "Beneficiary_Code",
    "Beneficiary_Name",
    "Beneficiary_Bank",
    "Beneficiary_Branch / IFSC Code",
    "Beneficiary_Acc_No",
    "Location",
    "Print_Location",
    "Instrument_Number",
    "Ben_Add1",
    "Ben_Add2",
    "Ben_Add3",
    "Ben_Add4",
    "Beneficiary_Email",
    "Beneficiary_Mobile",
    "Debit_Narration",
    "Credit_Narration",
    "Payment Details 1",
    "Payment Details 2",
    "Payment Details 3",
    "Payment Details 4",
    "Enrichment_1",
    "Enrichment_2",
    "Enrichment_3",
    "Enrichment_4",
    "Enrichment_5",
    "Enrichment_6",
    "Enrichment_7",
    "Enrichment_8",
    "Enrichment_9",
    "Enrichment_10",
    "Enrichment_11",
    "Enrichment_12",
    "Enrichment_13",
    "Enrichment_14",
    "Enrichment_15",
    "Enrichment_16",
    "Enrichment_17",
    "Enrichment_18",
    "Enrichment_19",
    "Enrichment_20",
];

/// Output column names populated by the row mapper.
pub mod columns {
    pub const CLIENT_CODE: &str = "Client_Code";
    pub const PRODUCT_CODE: &str = "Product_Code";
    pub const PAYMENT_TYPE: &str = "Payment_Type";
    pub const DR_AC_NO: &str = "Dr_Ac_No";
    pub const AMOUNT: &str = "Amount";
    pub const BANK_CODE_INDICATOR: &str = "Bank_Code_Indicator";
    pub const BENEFICIARY_NAME: &str = "Beneficiary_Name";
    pub const BENEFICIARY_BANK: &str = "Beneficiary_Bank";
    pub const BENEFICIARY_IFSC: &str = "Beneficiary_Branch / IFSC Code";
    pub const BENEFICIARY_ACC_NO: &str = "Beneficiary_Acc_No";
    pub const DEBIT_NARRATION: &str = "Debit_Narration";
    pub const CREDIT_NARRATION: &str = "Credit_Narration";
}

// =============================================================================
// Input
// =============================================================================

/// One payroll row: column name to text value.
///
/// Keys are normalized header names, so lookups ignore case and
/// surrounding/internal whitespace differences. Empty cells are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRow {
    values: BTreeMap<String, String>,
    /// 1-based line in the source sheet (header included), when known.
    source_row: Option<usize>,
}

impl InputRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.insert(k.as_ref(), v);
        }
        row
    }

    pub fn with_source_row(mut self, row: usize) -> Self {
        self.source_row = Some(row);
        self
    }

    /// Sheet row this row was read from. Blank rows skipped by the parser
    /// still count.
    pub fn source_row(&self) -> Option<usize> {
        self.source_row
    }

    pub fn insert(&mut self, column: &str, value: impl Into<String>) {
        self.values.insert(normalize_header(column), value.into());
    }

    /// Value of a column, `None` when the cell is missing.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(&normalize_header(column)).map(String::as_str)
    }

    /// Value of a column, empty string when missing.
    pub fn text(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A parsed payroll sheet.
#[derive(Debug, Clone, Default)]
pub struct InputTable {
    /// Header names as they appear in the sheet (trimmed).
    pub headers: Vec<String>,
    /// Rows in sheet order.
    pub rows: Vec<InputRow>,
}

impl InputTable {
    pub fn new(headers: Vec<String>, rows: Vec<InputRow>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by the header names as read.
    pub fn to_json(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = self
                    .headers
                    .iter()
                    .map(|h| {
                        let value = row
                            .get(h)
                            .map(|v| serde_json::Value::String(v.to_string()))
                            .unwrap_or(serde_json::Value::Null);
                        (h.clone(), value)
                    })
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect()
    }
}

// =============================================================================
// Output
// =============================================================================

/// One bank transfer instruction in the fixed output layout.
///
/// Every column of [`OUTPUT_COLUMNS`] is always present; unpopulated ones
/// hold the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    values: Vec<String>,
}

impl Default for OutputRecord {
    fn default() -> Self {
        Self {
            values: vec![String::new(); OUTPUT_COLUMNS.len()],
        }
    }
}

impl OutputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(column: &str) -> Option<usize> {
        OUTPUT_COLUMNS.iter().position(|c| *c == column)
    }

    /// Set a column value. Returns `false` if the column is not part of the layout.
    pub fn set(&mut self, column: &str, value: impl Into<String>) -> bool {
        match Self::position(column) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        Self::position(column).map(|i| self.values[i].as_str())
    }

    /// Values in [`OUTPUT_COLUMNS`] order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// `(column, value)` pairs in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        OUTPUT_COLUMNS
            .iter()
            .copied()
            .zip(self.values.iter().map(String::as_str))
    }
}

impl Serialize for OutputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(OUTPUT_COLUMNS.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Output records, one per input row, in input order.
pub type OutputTable = Vec<OutputRecord>;

// =============================================================================
// Warnings
// =============================================================================

/// A non-fatal issue raised while mapping a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RowWarning {
    /// Start Date could not be parsed; month label fell back to "Unknown".
    #[serde(rename_all = "camelCase")]
    DateParse { row: usize, value: String },
}

impl std::fmt::Display for RowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowWarning::DateParse { row, value } => {
                write!(f, "Row {}: unparseable Start Date '{}', month set to Unknown", row, value)
            }
        }
    }
}

// =============================================================================
// Export Artifact
// =============================================================================

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const ZIP_MIME: &str = "application/zip";

/// An in-memory export ready to be downloaded or written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    /// A single spreadsheet.
    Spreadsheet {
        file_name: String,
        bytes: Vec<u8>,
        rows: usize,
    },
    /// A zip archive of spreadsheets.
    Archive {
        file_name: String,
        bytes: Vec<u8>,
        /// Entry file names, in archive order.
        entries: Vec<String>,
        /// Selected groups that had no rows.
        skipped_groups: Vec<String>,
    },
}

impl ExportArtifact {
    pub fn file_name(&self) -> &str {
        match self {
            Self::Spreadsheet { file_name, .. } | Self::Archive { file_name, .. } => file_name,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Spreadsheet { bytes, .. } | Self::Archive { bytes, .. } => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Spreadsheet { bytes, .. } | Self::Archive { bytes, .. } => bytes,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Spreadsheet { .. } => XLSX_MIME,
            Self::Archive { .. } => ZIP_MIME,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive { .. })
    }
}

// =============================================================================
// Tests
// =============================================================================
