//! Payroll sheet reader with workbook and delimited-text support.
//!
//! Every cell becomes text, including amounts and dates, so nothing is lost
//! to numeric coercion. Workbooks go through `calamine`; CSV/TSV files get
//! encoding and delimiter auto-detection before the `csv` crate reads them.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

use crate::error::{InputError, InputResult};
use crate::models::{InputRow, InputTable};

/// How the input was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceFormat {
    /// Spreadsheet workbook; `sheet` is the worksheet that was read.
    Workbook { sheet: String },
    /// Delimited text with detected settings.
    Delimited { encoding: String, delimiter: char },
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub table: InputTable,
    pub source: SourceFormat,
}

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Whether bytes (or the file name) look like a spreadsheet workbook.
pub fn is_workbook(bytes: &[u8], file_name: Option<&str>) -> bool {
    let zip_magic = bytes.starts_with(b"PK\x03\x04");
    let ole_magic = bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]);
    let by_name = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    zip_magic || ole_magic || by_name
}

/// Parse a payroll file from disk.
pub fn parse_file<P: AsRef<Path>>(path: P) -> InputResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    parse_bytes_auto(&bytes, path.file_name().and_then(|n| n.to_str()))
}

/// Parse uploaded bytes, choosing workbook or delimited-text reading.
pub fn parse_bytes_auto(bytes: &[u8], file_name: Option<&str>) -> InputResult<ParseResult> {
    if bytes.is_empty() {
        return Err(InputError::EmptyFile);
    }

    if is_workbook(bytes, file_name) {
        parse_workbook(bytes)
    } else {
        let encoding = detect_encoding(bytes);
        let content = decode_content(bytes, &encoding)?;
        let delimiter = detect_delimiter(&content);
        let table = parse_delimited(&content, delimiter)?;
        Ok(ParseResult {
            table,
            source: SourceFormat::Delimited { encoding, delimiter },
        })
    }
}

// =============================================================================
// Workbooks
// =============================================================================

/// Read the first worksheet of a workbook.
///
/// The first non-empty row is the header; fully empty rows are skipped.
pub fn parse_workbook(bytes: &[u8]) -> InputResult<ParseResult> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| InputError::Workbook(e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(InputError::NoSheets)?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| InputError::Workbook(format!("sheet '{}': {}", sheet, e)))?;

    // 1-based sheet row of each range row
    let first_row = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);

    let mut rows = range
        .rows()
        .enumerate()
        .map(|(i, cells)| (first_row + i, cells.iter().map(cell_to_text).collect::<Vec<_>>()))
        .filter(|(_, cells)| cells.iter().any(Option::is_some));

    let (_, header_cells) = rows.next().ok_or(InputError::NoHeaders)?;
    let headers: Vec<String> = header_cells
        .into_iter()
        .map(|h| h.unwrap_or_default().trim().to_string())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(InputError::NoHeaders);
    }

    let records = rows
        .map(|(line, cells)| build_row(&headers, cells).with_source_row(line))
        .collect();

    Ok(ParseResult {
        table: InputTable::new(headers, records),
        source: SourceFormat::Workbook { sheet },
    })
}

/// Render a workbook cell as text. `None` for empty cells.
pub fn cell_to_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
            Some(ndt) if dt.is_datetime() => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            _ => format_float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

/// Convert a spreadsheet date serial (1900 date system) to a datetime.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = ((serial.fract()) * 86_400.0).round() as i64;
    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

fn build_row(headers: &[String], cells: Vec<Option<String>>) -> InputRow {
    let mut row = InputRow::new();
    for (header, cell) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        if let Some(value) = cell {
            row.insert(header, value);
        }
    }
    row
}

// =============================================================================
// Delimited text
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> InputResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    };

    if decoded.trim().is_empty() {
        return Err(InputError::Encoding(format!("no text content after decoding as {}", encoding)));
    }
    Ok(decoded)
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited text with an explicit delimiter.
///
/// Blank lines are skipped; short rows leave trailing columns missing.
pub fn parse_delimited(content: &str, delimiter: char) -> InputResult<InputTable> {
    if content.trim().is_empty() {
        return Err(InputError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    if headers.iter().all(String::is_empty) {
        return Err(InputError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let cells = (0..headers.len())
            .map(|i| record.get(i).filter(|v| !v.is_empty()).map(String::from))
            .collect();
        let row = build_row(&headers, cells);
        rows.push(match record.position() {
            Some(pos) => row.with_source_row(pos.line() as usize),
            None => row,
        });
    }

    Ok(InputTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_delimited("Employee;Net Pay\nE1;30000\nE2;25000", ';').unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].get("Employee"), Some("E1"));
        assert_eq!(table.rows[1].get("Net Pay"), Some("25000"));
    }

    #[test]
    fn test_quoted_values_with_delimiter() {
        let csv = "Employee Name,Bank Name\n\"Sharma, Ravi\",\"HDFC Bank\"";
        let table = parse_delimited(csv, ',').unwrap();

        assert_eq!(table.rows[0].get("Employee Name"), Some("Sharma, Ravi"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_delimited("a;b\n1;2\n;\n3;4\n", ';').unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_source_rows_count_skipped_lines() {
        let table = parse_delimited("a;b\n1;2\n;\n3;4\n", ';').unwrap();
        let lines: Vec<_> = table.rows.iter().map(InputRow::source_row).collect();
        assert_eq!(lines, vec![Some(2), Some(4)]);
    }

    #[test]
    fn test_workbook_source_rows() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "CFL").unwrap();
        sheet.write_string(1, 0, "HQ").unwrap();
        // row 3 left blank
        sheet.write_string(3, 0, "Plant-A").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let result = parse_workbook(&bytes).unwrap();
        assert_eq!(result.table.len(), 2);
        assert_eq!(result.table.rows[1].get("CFL"), Some("Plant-A"));
        assert_eq!(result.table.rows[1].source_row(), Some(4));
    }

    #[test]
    fn test_missing_values_are_absent() {
        let table = parse_delimited("a;b;c\n1;;3\n4", ';').unwrap();

        assert_eq!(table.rows[0].get("a"), Some("1"));
        assert_eq!(table.rows[0].get("b"), None);
        assert_eq!(table.rows[1].get("c"), None);
    }

    #[test]
    fn test_headers_trimmed() {
        let table = parse_delimited(" CFL , Net Pay \nHQ,1", ',').unwrap();
        assert_eq!(table.headers, vec!["CFL", "Net Pay"]);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_delimited("", ';'), Err(InputError::EmptyFile)));
        assert!(matches!(parse_bytes_auto(b"", None), Err(InputError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_auto_parse_csv() {
        let result = parse_bytes_auto(b"CFL;Net Pay\nHQ;100", Some("salary.csv")).unwrap();
        assert_eq!(
            result.source,
            SourceFormat::Delimited { encoding: "utf-8".into(), delimiter: ';' }
        );
        assert_eq!(result.table.headers, vec!["CFL", "Net Pay"]);
    }

    #[test]
    fn test_is_workbook() {
        assert!(is_workbook(b"PK\x03\x04rest", None));
        assert!(is_workbook(b"anything", Some("Salary.XLSX")));
        assert!(!is_workbook(b"a,b\n1,2", Some("salary.csv")));
    }

    #[test]
    fn test_latin1_decoding() {
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert!(decoded.contains("Soci"));
    }

    #[test]
    fn test_cell_to_text() {
        assert_eq!(cell_to_text(&Data::Empty), None);
        assert_eq!(cell_to_text(&Data::Float(45000.0)).as_deref(), Some("45000"));
        assert_eq!(cell_to_text(&Data::Float(1234.5)).as_deref(), Some("1234.5"));
        assert_eq!(cell_to_text(&Data::Int(12)).as_deref(), Some("12"));
        assert_eq!(cell_to_text(&Data::String(String::new())), None);
    }

    #[test]
    fn test_excel_serial_to_datetime() {
        // 45366 = 2024-03-15
        let dt = excel_serial_to_datetime(45366.0).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-03-15");
        let dt = excel_serial_to_datetime(45366.5).unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "12:00");
        assert!(excel_serial_to_datetime(-1.0).is_none());
    }
}
