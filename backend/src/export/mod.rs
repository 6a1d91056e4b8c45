//! Batch exporter: output records → `.xlsx` bytes, optionally zipped per group.
//!
//! - [`write_spreadsheet`] - header + one row per record, fixed column order
//! - [`export_single`] - whole table in one spreadsheet
//! - [`export_grouped`] - one spreadsheet per selected group; a zip when
//!   more than one group is selected, skipping groups with no rows

use rust_xlsxwriter::{Format, Workbook};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::api::logs::{log_info, log_warning};
use crate::error::{ExportError, ExportResult};
use crate::models::{ExportArtifact, InputTable, OutputRecord, OUTPUT_COLUMNS};
use crate::transform::grouper::partition;

pub const SINGLE_FILE_NAME: &str = "Salary_Bank_Transfer_File.xlsx";
pub const GROUPED_ARCHIVE_NAME: &str = "Salary_Bank_Transfer_Files.zip";
const GROUP_FILE_SUFFIX: &str = "_Bank_Transfer_File.xlsx";

/// Serialize records to an `.xlsx` workbook.
///
/// Every value is written as a string so account numbers and amounts keep
/// their exact text. Empty values stay blank cells.
pub fn write_spreadsheet<'a, I>(records: I) -> ExportResult<Vec<u8>>
where
    I: IntoIterator<Item = &'a OutputRecord>,
{
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();

    for (col, header) in OUTPUT_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (row_idx, record) in records.into_iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, value) in record.values().iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet.write_string(excel_row, col_idx as u16, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// File name for one group's spreadsheet.
pub fn group_file_name(group: &str) -> String {
    format!("{}{}", sanitize_file_stem(group), GROUP_FILE_SUFFIX)
}

/// Replace characters that are unsafe in file/archive entry names.
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "group".to_string()
    } else {
        cleaned
    }
}

/// Whole output table in one spreadsheet.
pub fn export_single(records: &[OutputRecord]) -> ExportResult<ExportArtifact> {
    let bytes = write_spreadsheet(records)?;
    Ok(ExportArtifact::Spreadsheet {
        file_name: SINGLE_FILE_NAME.to_string(),
        bytes,
        rows: records.len(),
    })
}

/// Export the selected groups.
///
/// Rows are assigned to groups by `group_column` on the *input* rows
/// (`input.rows` and `output` are parallel). Selected values are
/// deduplicated and ordered ascending.
///
/// - one selected group → a spreadsheet named after the group
/// - several → a zip with one spreadsheet per non-empty group
/// - none → [`ExportError::NoGroupsSelected`]
pub fn export_grouped<S: AsRef<str>>(
    input: &InputTable,
    output: &[OutputRecord],
    group_column: &str,
    selected: &[S],
) -> ExportResult<ExportArtifact> {
    let groups = partition(&input.rows, output, group_column, selected);

    match groups.as_slice() {
        [] => Err(ExportError::NoGroupsSelected),
        [group] => {
            if group.records.is_empty() {
                log_warning(format!("Group '{}' has no rows", group.value));
            }
            let bytes = write_spreadsheet(group.records.iter().copied())?;
            Ok(ExportArtifact::Spreadsheet {
                file_name: group_file_name(&group.value),
                bytes,
                rows: group.records.len(),
            })
        }
        _ => {
            let mut files = Vec::new();
            let mut skipped_groups = Vec::new();

            for group in &groups {
                if group.records.is_empty() {
                    log_info(format!("Skipping group '{}' (no rows)", group.value));
                    skipped_groups.push(group.value.clone());
                    continue;
                }
                let bytes = write_spreadsheet(group.records.iter().copied())?;
                files.push((group_file_name(&group.value), bytes));
            }

            let (bytes, entries) = write_archive(&files)?;

            Ok(ExportArtifact::Archive {
                file_name: GROUPED_ARCHIVE_NAME.to_string(),
                bytes,
                entries,
                skipped_groups,
            })
        }
    }
}

/// Bundle named files into a zip archive, in the given order.
///
/// Entry names that collide (two groups sanitizing to the same stem) get a
/// numeric suffix before the extension. Returns the archive bytes and the
/// entry names as written.
pub fn write_archive(files: &[(String, Vec<u8>)]) -> ExportResult<(Vec<u8>, Vec<String>)> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut used = std::collections::HashSet::new();
    let mut entries = Vec::with_capacity(files.len());

    for (name, bytes) in files {
        let mut entry = name.clone();
        let mut n = 2;
        while !used.insert(entry.clone()) {
            entry = numbered_name(name, n);
            n += 1;
        }
        zip.start_file(entry.as_str(), options)?;
        zip.write_all(bytes)?;
        entries.push(entry);
    }

    Ok((zip.finish()?.into_inner(), entries))
}

/// `name (n).ext`, keeping the extension last.
fn numbered_name(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", name, n),
    }
}
