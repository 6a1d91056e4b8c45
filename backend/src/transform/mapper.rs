//! Row mapper: payroll row → bank transfer record.
//!
//! Fixed field mapping plus three rules:
//!
//! | Output              | Rule                                                  |
//! |---------------------|-------------------------------------------------------|
//! | `Payment_Type`      | bank name lookup (contains, ignore case), default NEFT |
//! | `Dr_Ac_No`          | branch lookup (exact), default main account            |
//! | `*_Narration`       | template with `{month}` from Start Date and `{cfl}`    |
//!
//! Amounts and identifiers are copied verbatim. Missing cells become empty
//! strings; no per-field validation happens here.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::lookup::{default_debit_account_table, default_payment_type_table, LookupTable};
use super::narration::{NarrationTemplate, NarrationValues};
use crate::models::{columns, InputRow, OutputRecord, RowWarning};
use crate::parser::excel_serial_to_datetime;

/// Source column names read by the mapper.
pub mod source {
    pub const EMPLOYEE_NAME: &str = "Employee Name";
    pub const BANK_NAME: &str = "Bank Name";
    pub const IFSC_CODE: &str = "IFSC Code";
    pub const ACCOUNT_NO: &str = "Bank A/C No.";
    pub const BRANCH: &str = "Branch";
    pub const START_DATE: &str = "Start Date";
    pub const NET_PAY: &str = "Net Pay";
    pub const CFL: &str = "CFL";
}

/// Month label used when Start Date cannot be parsed.
pub const UNKNOWN_MONTH: &str = "Unknown";

/// Month label format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonthStyle {
    /// `March-2024`
    #[default]
    Full,
    /// `Mar-2024`
    Abbreviated,
}

impl MonthStyle {
    fn format(&self) -> &'static str {
        match self {
            MonthStyle::Full => "%B-%Y",
            MonthStyle::Abbreviated => "%b-%Y",
        }
    }
}

/// Business rules for one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingRules {
    pub client_code: String,
    pub product_code: String,
    pub bank_code_indicator: String,
    /// Bank Name → Payment_Type.
    pub payment_type: LookupTable,
    /// Branch → Dr_Ac_No.
    pub debit_account: LookupTable,
    pub month_style: MonthStyle,
    /// Column used for `{cfl}` and for grouped export.
    pub group_column: String,
}

impl Default for MappingRules {
    fn default() -> Self {
        Self {
            client_code: "AWOKEIND".to_string(),
            product_code: "SALARY".to_string(),
            bank_code_indicator: "M".to_string(),
            payment_type: default_payment_type_table(),
            debit_account: default_debit_account_table(),
            month_style: MonthStyle::Full,
            group_column: source::CFL.to_string(),
        }
    }
}

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 14] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%d %b %Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// Spreadsheet serials accepted as dates: 1927-05-18 through 2173-10-14.
const SERIAL_RANGE: std::ops::RangeInclusive<f64> = 10_000.0..=100_000.0;

/// Parse a payroll date cell. `None` when no known shape matches.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        match value.len() {
            4 => return value.parse().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
            8 => return NaiveDate::parse_from_str(value, "%Y%m%d").ok(),
            _ => {}
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        })
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|n| SERIAL_RANGE.contains(n))
                .and_then(excel_serial_to_datetime)
                .map(|dt| dt.date())
        })
}

/// "Month-Year" label for a Start Date, or `None` if unparseable.
pub fn month_label(start_date: &str, style: MonthStyle) -> Option<String> {
    parse_date(start_date).map(|d| d.format(style.format()).to_string())
}

/// Output of mapping one row.
#[derive(Debug, Clone)]
pub struct MappedRow {
    pub record: OutputRecord,
    pub warning: Option<RowWarning>,
}

/// Output of mapping a whole table.
#[derive(Debug, Default)]
pub struct MapResult {
    pub records: Vec<OutputRecord>,
    pub warnings: Vec<RowWarning>,
}

impl MapResult {
    pub fn summary(&self) -> String {
        format!(
            "Mapped: {} records, {} warnings",
            self.records.len(),
            self.warnings.len()
        )
    }
}

/// Applies [`MappingRules`] and compiled narrations to input rows.
#[derive(Debug, Clone)]
pub struct RowMapper {
    rules: MappingRules,
    debit: NarrationTemplate,
    credit: NarrationTemplate,
}

impl RowMapper {
    pub fn new(rules: MappingRules, debit: NarrationTemplate, credit: NarrationTemplate) -> Self {
        Self { rules, debit, credit }
    }

    pub fn rules(&self) -> &MappingRules {
        &self.rules
    }

    /// Map one row. `index` is the 0-based data row index.
    pub fn map_row(&self, index: usize, row: &InputRow) -> MappedRow {
        let rules = &self.rules;
        let start_date = row.text(source::START_DATE);

        let (month, warning) = match month_label(start_date, rules.month_style) {
            Some(label) => (label, None),
            None => (
                UNKNOWN_MONTH.to_string(),
                Some(RowWarning::DateParse {
                    // fall back to position: +1 for 0-index, +1 for header
                    row: row.source_row().unwrap_or(index + 2),
                    value: start_date.to_string(),
                }),
            ),
        };

        let values = NarrationValues {
            month: &month,
            cfl: row.text(&rules.group_column),
        };

        let mut record = OutputRecord::new();
        record.set(columns::CLIENT_CODE, rules.client_code.as_str());
        record.set(columns::PRODUCT_CODE, rules.product_code.as_str());
        record.set(
            columns::PAYMENT_TYPE,
            rules.payment_type.resolve(row.text(source::BANK_NAME)),
        );
        record.set(
            columns::DR_AC_NO,
            rules.debit_account.resolve(row.text(source::BRANCH).trim()),
        );
        record.set(columns::AMOUNT, row.text(source::NET_PAY));
        record.set(columns::BANK_CODE_INDICATOR, rules.bank_code_indicator.as_str());
        record.set(columns::BENEFICIARY_NAME, row.text(source::EMPLOYEE_NAME));
        record.set(columns::BENEFICIARY_BANK, row.text(source::BANK_NAME));
        record.set(columns::BENEFICIARY_IFSC, row.text(source::IFSC_CODE));
        record.set(columns::BENEFICIARY_ACC_NO, row.text(source::ACCOUNT_NO));
        record.set(columns::DEBIT_NARRATION, self.debit.render(&values));
        record.set(columns::CREDIT_NARRATION, self.credit.render(&values));

        MappedRow { record, warning }
    }

    /// Map every row, preserving order. Never drops a row.
    pub fn map_rows(&self, rows: &[InputRow]) -> MapResult {
        let mut result = MapResult::default();
        for (i, row) in rows.iter().enumerate() {
            let mapped = self.map_row(i, row);
            result.records.push(mapped.record);
            if let Some(w) = mapped.warning {
                result.warnings.push(w);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::narration::{
        NarrationKind, DEFAULT_CREDIT_TEMPLATE, DEFAULT_DEBIT_TEMPLATE,
    };

    fn mapper(rules: MappingRules) -> RowMapper {
        RowMapper::new(
            rules,
            NarrationTemplate::for_kind(NarrationKind::Debit, DEFAULT_DEBIT_TEMPLATE).unwrap(),
            NarrationTemplate::for_kind(NarrationKind::Credit, DEFAULT_CREDIT_TEMPLATE).unwrap(),
        )
    }

    fn row(bank: &str, branch: &str, start: &str) -> InputRow {
        InputRow::from_pairs([
            ("Employee", "E001"),
            ("Employee Name", "Ravi Kumar"),
            ("Bank Name", bank),
            ("IFSC Code", "KKBK0005033"),
            ("Bank A/C No.", "0123456789"),
            ("Branch", branch),
            ("CFL", "HQ"),
            ("Start Date", start),
            ("Net Pay", "45000.50"),
        ])
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label("2024-03-15", MonthStyle::Full).as_deref(), Some("March-2024"));
        assert_eq!(month_label("2024-03-15", MonthStyle::Abbreviated).as_deref(), Some("Mar-2024"));
        assert_eq!(month_label("2024-03-15 00:00:00", MonthStyle::Full).as_deref(), Some("March-2024"));
        assert_eq!(month_label("N/A", MonthStyle::Full), None);
        assert_eq!(month_label("", MonthStyle::Full), None);
    }

    #[test]
    fn test_parse_date_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        for s in [
            "2024-03-15", "2024/03/15", "03/15/2024", "15/03/2024", "15-03-2024",
            "15-Mar-2024", "15 March 2024", "March 15, 2024", "20240315",
            "2024-03-15T10:30:00", "2024-03-15T10:30:00+05:30", "45366",
        ] {
            assert_eq!(parse_date(s), Some(expected), "{}", s);
        }
    }

    #[test]
    fn test_bare_numbers() {
        assert_eq!(parse_date("2024"), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(month_label("2024", MonthStyle::Full).as_deref(), Some("January-2024"));
        assert_eq!(parse_date("42"), None);
        assert_eq!(parse_date("9999"), NaiveDate::from_ymd_opt(9999, 1, 1));
        assert_eq!(parse_date("250000"), None);
    }

    #[test]
    fn test_payment_type_rule() {
        let m = mapper(MappingRules::default());
        let kotak = m.map_row(0, &row("kotak mahindra bank", "Noida", "2024-03-15"));
        let hdfc = m.map_row(1, &row("HDFC Bank", "Noida", "2024-03-15"));
        assert_eq!(kotak.record.get("Payment_Type"), Some("IFT"));
        assert_eq!(hdfc.record.get("Payment_Type"), Some("NEFT"));
    }

    #[test]
    fn test_debit_account_rule() {
        let m = mapper(MappingRules::default());
        let phase3 = m.map_row(0, &row("HDFC", "UP Phase 3", "2024-03-15"));
        let padded = m.map_row(0, &row("HDFC", " UP Phase 3 ", "2024-03-15"));
        let lower = m.map_row(0, &row("HDFC", "up phase 3", "2024-03-15"));
        assert_eq!(phase3.record.get("Dr_Ac_No"), Some("6550063533"));
        assert_eq!(padded.record.get("Dr_Ac_No"), Some("6550063533"));
        assert_eq!(lower.record.get("Dr_Ac_No"), Some("6550063526"));
    }

    #[test]
    fn test_field_mapping_and_constants() {
        let m = mapper(MappingRules::default());
        let r = m.map_row(0, &row("Kotak", "Noida", "2024-03-15")).record;

        assert_eq!(r.get("Client_Code"), Some("AWOKEIND"));
        assert_eq!(r.get("Product_Code"), Some("SALARY"));
        assert_eq!(r.get("Bank_Code_Indicator"), Some("M"));
        assert_eq!(r.get("Amount"), Some("45000.50"));
        assert_eq!(r.get("Beneficiary_Name"), Some("Ravi Kumar"));
        assert_eq!(r.get("Beneficiary_Bank"), Some("Kotak"));
        assert_eq!(r.get("Beneficiary_Branch / IFSC Code"), Some("KKBK0005033"));
        assert_eq!(r.get("Beneficiary_Acc_No"), Some("0123456789"));
        assert_eq!(r.get("Debit_Narration"), Some("Salary paid for the month of March-2024 HQ"));
        assert_eq!(r.get("Credit_Narration"), Some("Salary credited for the month of March-2024"));
        assert_eq!(r.get("Beneficiary_Code"), Some(""));
        assert_eq!(r.get("Enrichment_7"), Some(""));
        assert_eq!(r.values().iter().filter(|v| !v.is_empty()).count(), 12);
    }

    #[test]
    fn test_bad_date_does_not_fail_row() {
        let m = mapper(MappingRules::default());
        let mapped = m.map_row(3, &row("HDFC", "Noida", "N/A"));
        assert_eq!(
            mapped.record.get("Credit_Narration"),
            Some("Salary credited for the month of Unknown")
        );
        assert_eq!(
            mapped.warning,
            Some(RowWarning::DateParse { row: 5, value: "N/A".into() })
        );
    }

    #[test]
    fn test_warning_uses_sheet_row() {
        let m = mapper(MappingRules::default());
        let mapped = m.map_row(3, &row("HDFC", "Noida", "N/A").with_source_row(9));
        assert_eq!(
            mapped.warning,
            Some(RowWarning::DateParse { row: 9, value: "N/A".into() })
        );
    }

    #[test]
    fn test_missing_values_pass_through_empty() {
        let m = mapper(MappingRules::default());
        let r = m.map_row(0, &InputRow::new()).record;
        assert_eq!(r.get("Amount"), Some(""));
        assert_eq!(r.get("Payment_Type"), Some("NEFT"));
        assert_eq!(r.get("Debit_Narration"), Some("Salary paid for the month of Unknown "));
    }

    #[test]
    fn test_map_rows_keeps_count_and_order() {
        let m = mapper(MappingRules::default());
        let rows = vec![
            row("A", "x", "2024-01-01"),
            row("B", "x", "bad"),
            row("C", "x", "2024-02-01"),
        ];
        let result = m.map_rows(&rows);
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.records[2].get("Beneficiary_Bank"), Some("C"));
    }

    #[test]
    fn test_abbreviated_rules_from_json() {
        let rules: MappingRules = serde_json::from_str(r#"{ "month_style": "abbreviated" }"#).unwrap();
        assert_eq!(rules.client_code, "AWOKEIND");
        let m = mapper(rules);
        let r = m.map_row(0, &row("HDFC", "x", "2024-03-15")).record;
        assert_eq!(r.get("Debit_Narration"), Some("Salary paid for the month of Mar-2024 HQ"));
    }
}
