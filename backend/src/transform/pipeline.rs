//! High-level pipeline API: payroll sheet → bank transfer records → artifact.
//!
//! # Example
//!
//! ```rust,ignore
//! use salary_transfer::pipeline::{convert_file, ConvertOptions};
//!
//! let conversion = convert_file("salary.xlsx", &ConvertOptions::default())?;
//! let artifact = conversion.export_single()?;
//! std::fs::write(artifact.file_name(), artifact.bytes())?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::grouper::{distinct_groups, group_counts};
use super::mapper::{MappingRules, RowMapper};
use super::narration::{
    NarrationKind, NarrationTemplate, DEFAULT_CREDIT_TEMPLATE, DEFAULT_DEBIT_TEMPLATE,
};
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{ConfigError, ConversionError, ConversionResult};
use crate::export::{self, GROUPED_ARCHIVE_NAME};
use crate::models::{ExportArtifact, InputTable, OutputRecord, OutputTable, RowWarning};
use crate::parser::{parse_bytes_auto, parse_file, SourceFormat};
use crate::validation::{validate_columns, ColumnProfile};

/// Options for one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Preset used when `required_columns` is not given.
    pub profile: ColumnProfile,

    /// Explicit required columns (overrides `profile`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_columns: Option<Vec<String>>,

    /// Debit narration template (`{month}`, `{cfl}`).
    pub debit_template: String,

    /// Credit narration template (`{month}`).
    pub credit_template: String,

    /// Mapping rules and lookup tables.
    pub rules: MappingRules,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            profile: ColumnProfile::Full,
            required_columns: None,
            debit_template: DEFAULT_DEBIT_TEMPLATE.to_string(),
            credit_template: DEFAULT_CREDIT_TEMPLATE.to_string(),
            rules: MappingRules::default(),
        }
    }
}

impl ConvertOptions {
    /// Parse options from a JSON string. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The effective required column list.
    pub fn required(&self) -> Vec<String> {
        self.required_columns
            .clone()
            .unwrap_or_else(|| self.profile.columns())
    }
}

/// A completed conversion: input kept for grouping, output ready to export.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub input: InputTable,
    pub output: OutputTable,
    pub warnings: Vec<RowWarning>,
    /// Column the grouped export partitions on.
    pub group_column: String,
    /// Where the input came from, when parsed by this pipeline.
    pub source: Option<SourceFormat>,
}

impl Conversion {
    /// Distinct group values, ascending.
    pub fn groups(&self) -> Vec<String> {
        distinct_groups(&self.input.rows, &self.group_column)
    }

    /// Row count per group, ascending by group.
    pub fn group_counts(&self) -> Vec<(String, usize)> {
        group_counts(&self.input.rows, &self.group_column)
    }

    /// First `n` output records.
    pub fn preview(&self, n: usize) -> &[OutputRecord] {
        &self.output[..n.min(self.output.len())]
    }

    /// All records in one spreadsheet.
    pub fn export_single(&self) -> ConversionResult<ExportArtifact> {
        Ok(export::export_single(&self.output)?)
    }

    /// One spreadsheet per selected group (zipped when more than one).
    pub fn export_grouped<S: AsRef<str>>(&self, selected: &[S]) -> ConversionResult<ExportArtifact> {
        Ok(export::export_grouped(
            &self.input,
            &self.output,
            &self.group_column,
            selected,
        )?)
    }
}

/// Convert an already-parsed table.
///
/// Steps: required-column check → narration compile → row mapping. Schema
/// and template failures abort before any row is mapped.
pub fn convert(input: InputTable, options: &ConvertOptions) -> ConversionResult<Conversion> {
    log_info(format!(
        "Checking {} columns against {} required...",
        input.headers.len(),
        options.required().len()
    ));
    validate_columns(&input.headers, &options.required())?;
    log_success("All required columns present");

    let debit = NarrationTemplate::for_kind(NarrationKind::Debit, &options.debit_template)?;
    let credit = NarrationTemplate::for_kind(NarrationKind::Credit, &options.credit_template)?;

    let mapper = RowMapper::new(options.rules.clone(), debit, credit);

    log_info(format!("Mapping {} rows...", input.len()));
    let result = mapper.map_rows(&input.rows);
    log_success(result.summary());

    if !result.warnings.is_empty() {
        log_warning(format!(
            "{} rows with unparseable Start Date (month set to Unknown)",
            result.warnings.len()
        ));
        for w in result.warnings.iter().take(5) {
            log_warning(format!("• {}", w));
        }
    }

    Ok(Conversion {
        input,
        output: result.records,
        warnings: result.warnings,
        group_column: options.rules.group_column.clone(),
        source: None,
    })
}

/// Parse uploaded bytes and convert.
pub fn convert_bytes(
    bytes: &[u8],
    file_name: Option<&str>,
    options: &ConvertOptions,
) -> ConversionResult<Conversion> {
    log_info(format!(
        "Reading {} ({} bytes)...",
        file_name.unwrap_or("upload"),
        bytes.len()
    ));
    let parsed = parse_bytes_auto(bytes, file_name)?;
    log_parsed(&parsed.source, &parsed.table);

    let mut conversion = convert(parsed.table, options)?;
    conversion.source = Some(parsed.source);
    Ok(conversion)
}

/// Parse a file from disk and convert.
pub fn convert_file<P: AsRef<Path>>(path: P, options: &ConvertOptions) -> ConversionResult<Conversion> {
    log_info(format!("Reading {}...", path.as_ref().display()));
    let parsed = parse_file(path)?;
    log_parsed(&parsed.source, &parsed.table);

    let mut conversion = convert(parsed.table, options)?;
    conversion.source = Some(parsed.source);
    Ok(conversion)
}

/// Convert and export in one call.
///
/// With `selected` empty the whole table goes into one spreadsheet;
/// otherwise the grouped export rules apply.
pub fn convert_and_export<S: AsRef<str>>(
    bytes: &[u8],
    file_name: Option<&str>,
    options: &ConvertOptions,
    selected: &[S],
) -> Result<(Conversion, ExportArtifact), ConversionError> {
    let conversion = convert_bytes(bytes, file_name, options)?;
    let artifact = if selected.is_empty() {
        conversion.export_single()?
    } else {
        conversion.export_grouped(selected)?
    };

    match &artifact {
        ExportArtifact::Spreadsheet { file_name, rows, .. } => {
            log_success(format!("Generated {} with {} records", file_name, rows));
        }
        ExportArtifact::Archive { entries, .. } => {
            log_success(format!(
                "Generated {} with {} files",
                GROUPED_ARCHIVE_NAME,
                entries.len()
            ));
        }
    }

    Ok((conversion, artifact))
}

fn log_parsed(source: &SourceFormat, table: &InputTable) {
    match source {
        SourceFormat::Workbook { sheet } => log_success(format!("Read sheet '{}'", sheet)),
        SourceFormat::Delimited { encoding, delimiter } => log_success(format!(
            "Detected encoding {} and separator '{}'",
            encoding,
            format_delimiter(*delimiter)
        )),
    }
    log_success(format!("Read {} rows, {} columns", table.len(), table.headers.len()));
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use crate::models::InputRow;
    use crate::validation::STRICT_REQUIRED_COLUMNS;

    fn strict_options() -> ConvertOptions {
        ConvertOptions {
            profile: ColumnProfile::Strict,
            ..Default::default()
        }
    }

    fn table(rows: &[(&str, &str, &str)]) -> InputTable {
        let headers = STRICT_REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect();
        let rows = rows
            .iter()
            .map(|(bank, cfl, start)| {
                InputRow::from_pairs([
                    ("Employee", "E1"),
                    ("Employee Name", "Asha"),
                    ("Bank Name", *bank),
                    ("IFSC Code", "HDFC0001"),
                    ("Bank A/C No.", "111"),
                    ("CFL", *cfl),
                    ("Branch", "Noida"),
                    ("Start Date", *start),
                    ("End Date", "2024-03-31"),
                    ("Net Pay", "1000"),
                ])
            })
            .collect();
        InputTable::new(headers, rows)
    }

    #[test]
    fn test_default_options() {
        let opts = ConvertOptions::default();
        assert_eq!(opts.profile, ColumnProfile::Full);
        assert_eq!(opts.required().len(), 35);
        assert_eq!(opts.debit_template, DEFAULT_DEBIT_TEMPLATE);
    }

    #[test]
    fn test_options_from_partial_json() {
        let opts = ConvertOptions::from_json(r#"{ "profile": "strict", "credit_template": "Pay {month}" }"#).unwrap();
        assert_eq!(opts.required().len(), 10);
        assert_eq!(opts.credit_template, "Pay {month}");
        assert_eq!(opts.rules, MappingRules::default());

        let explicit = ConvertOptions::from_json(r#"{ "required_columns": ["Net Pay"] }"#).unwrap();
        assert_eq!(explicit.required(), vec!["Net Pay"]);
    }

    #[test]
    fn test_convert_row_count_invariant() {
        let input = table(&[("HDFC", "HQ", "2024-03-15"), ("Kotak", "Plant-A", "N/A")]);
        let conversion = convert(input, &strict_options()).unwrap();

        assert_eq!(conversion.output.len(), 2);
        assert_eq!(conversion.warnings.len(), 1);
        assert_eq!(conversion.groups(), vec!["HQ", "Plant-A"]);
        assert_eq!(conversion.preview(5).len(), 2);
    }

    #[test]
    fn test_missing_column_aborts() {
        let mut input = table(&[("HDFC", "HQ", "2024-03-15")]);
        input.headers.retain(|h| h != "IFSC Code");

        let err = convert(input, &strict_options()).unwrap_err();
        assert_eq!(err.missing_columns(), Some(&["IFSC Code".to_string()][..]));
    }

    #[test]
    fn test_bad_template_aborts() {
        let input = table(&[("HDFC", "HQ", "2024-03-15")]);
        let opts = ConvertOptions {
            credit_template: "Paid {cfl}".into(),
            ..strict_options()
        };
        let err = convert(input, &opts).unwrap_err();
        assert!(matches!(err, ConversionError::Template(TemplateError::UnknownPlaceholder { .. })));
    }

    #[test]
    fn test_convert_bytes_csv() {
        let csv = format!(
            "{}\nE1,Asha,HDFC,H1,1,HQ,Noida,2024-03-15,2024-03-31,500\n",
            STRICT_REQUIRED_COLUMNS.join(",")
        );
        let conversion = convert_bytes(csv.as_bytes(), Some("salary.csv"), &strict_options()).unwrap();
        assert_eq!(conversion.output[0].get("Amount"), Some("500"));
        assert!(matches!(conversion.source, Some(SourceFormat::Delimited { .. })));
    }
}
