//! End-to-end: generated payroll workbook → conversion → exported files read back.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::Workbook;
use salary_transfer::validation::STRICT_REQUIRED_COLUMNS;
use salary_transfer::{
    convert_and_export, convert_file, ColumnProfile, ConversionError, ConvertOptions,
    ExportArtifact, OUTPUT_COLUMNS,
};
use std::io::{Cursor, Read};
use std::path::Path;

/// (employee, name, bank, ifsc, account, cfl, branch, start date, net pay)
type Row<'a> = (&'a str, &'a str, &'a str, &'a str, f64, &'a str, &'a str, StartDate<'a>, f64);

enum StartDate<'a> {
    Text(&'a str),
    Serial(f64),
}

fn write_payroll(path: &Path, headers: &[&str], rows: &[Row]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in headers.iter().enumerate() {
        // padded headers must still match
        sheet.write_string(0, col as u16, format!(" {} ", header)).unwrap();
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let (employee, name, bank, ifsc, account, cfl, branch, ref start, net) = *row;
        for (col, header) in headers.iter().enumerate() {
            let c = col as u16;
            match *header {
                "Employee" => sheet.write_string(r, c, employee),
                "Employee Name" => sheet.write_string(r, c, name),
                "Bank Name" => sheet.write_string(r, c, bank),
                "IFSC Code" => sheet.write_string(r, c, ifsc),
                "Bank A/C No." => sheet.write_number(r, c, account),
                "CFL" => sheet.write_string(r, c, cfl),
                "Branch" => sheet.write_string(r, c, branch),
                "Start Date" => match start {
                    StartDate::Text(t) => sheet.write_string(r, c, *t),
                    StartDate::Serial(s) => sheet.write_number(r, c, *s),
                },
                "End Date" => sheet.write_string(r, c, "2024-03-31"),
                "Net Pay" => sheet.write_number(r, c, net),
                _ => continue,
            }
            .unwrap();
        }
    }

    workbook.save(path).unwrap();
}

fn payroll_rows() -> Vec<Row<'static>> {
    vec![
        ("E1", "Asha Rao", "HDFC Bank", "HDFC0000123", 50100123456.0, "HQ", "Noida", StartDate::Text("2024-03-15"), 52000.0),
        ("E2", "Vikram Singh", "Kotak Mahindra Bank", "KKBK0000456", 7712345678.0, "Plant-A", " UP Phase 3 ", StartDate::Serial(45366.0), 31000.5),
        ("E3", "Meera Das", "ICICI", "ICIC0000789", 1234567890.0, "HQ", "Pune", StartDate::Text("N/A"), 40000.0),
    ]
}

fn strict_options() -> ConvertOptions {
    ConvertOptions {
        profile: ColumnProfile::Strict,
        ..Default::default()
    }
}

fn read_sheet(bytes: &[u8]) -> Vec<Vec<String>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).unwrap();
    let name = workbook.sheet_names()[0].clone();
    let range = workbook.worksheet_range(&name).unwrap();
    range
        .rows()
        .map(|cells| {
            cells
                .iter()
                .map(|c| match c {
                    Data::String(s) => s.clone(),
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

fn column(sheet: &[Vec<String>], name: &str) -> Vec<String> {
    let idx = OUTPUT_COLUMNS.iter().position(|c| *c == name).unwrap();
    sheet[1..]
        .iter()
        .map(|row| row.get(idx).cloned().unwrap_or_default())
        .collect()
}

#[test]
fn workbook_round_trip_single_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("salary.xlsx");
    write_payroll(&input, &STRICT_REQUIRED_COLUMNS, &payroll_rows());

    let conversion = convert_file(&input, &strict_options()).unwrap();
    assert_eq!(conversion.output.len(), 3);
    assert_eq!(conversion.warnings.len(), 1);
    assert_eq!(conversion.groups(), vec!["HQ", "Plant-A"]);

    let artifact = conversion.export_single().unwrap();
    assert_eq!(artifact.file_name(), "Salary_Bank_Transfer_File.xlsx");

    let sheet = read_sheet(artifact.bytes());
    assert_eq!(sheet.len(), 4);
    assert_eq!(sheet[0], OUTPUT_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());

    assert_eq!(column(&sheet, "Client_Code"), vec!["AWOKEIND"; 3]);
    assert_eq!(column(&sheet, "Payment_Type"), vec!["NEFT", "IFT", "NEFT"]);
    assert_eq!(column(&sheet, "Dr_Ac_No"), vec!["6550063526", "6550063533", "6550063526"]);
    assert_eq!(column(&sheet, "Beneficiary_Acc_No"), vec!["50100123456", "7712345678", "1234567890"]);
    assert_eq!(column(&sheet, "Amount"), vec!["52000", "31000.5", "40000"]);
    assert_eq!(
        column(&sheet, "Debit_Narration"),
        vec![
            "Salary paid for the month of March-2024 HQ",
            "Salary paid for the month of March-2024 Plant-A",
            "Salary paid for the month of Unknown HQ",
        ]
    );
    assert_eq!(
        column(&sheet, "Credit_Narration")[0],
        "Salary credited for the month of March-2024"
    );
}

#[test]
fn grouped_export_archive_entries() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("salary.xlsx");
    write_payroll(&input, &STRICT_REQUIRED_COLUMNS, &payroll_rows());
    let bytes = std::fs::read(&input).unwrap();

    let (_, artifact) = convert_and_export(
        &bytes,
        Some("salary.xlsx"),
        &strict_options(),
        &["Plant-A", "HQ", "Finance"],
    )
    .unwrap();

    let ExportArtifact::Archive { entries, skipped_groups, bytes, file_name } = artifact else {
        panic!("expected an archive");
    };
    assert_eq!(file_name, "Salary_Bank_Transfer_Files.zip");
    assert_eq!(entries, vec!["HQ_Bank_Transfer_File.xlsx", "Plant-A_Bank_Transfer_File.xlsx"]);
    assert_eq!(skipped_groups, vec!["Finance"]);

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 2);

    let mut buf = Vec::new();
    archive
        .by_name("HQ_Bank_Transfer_File.xlsx")
        .unwrap()
        .read_to_end(&mut buf)
        .unwrap();
    let sheet = read_sheet(&buf);
    assert_eq!(column(&sheet, "Beneficiary_Name"), vec!["Asha Rao", "Meera Das"]);
}

#[test]
fn single_group_selection_is_spreadsheet() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("salary.xlsx");
    write_payroll(&input, &STRICT_REQUIRED_COLUMNS, &payroll_rows());

    let conversion = convert_file(&input, &strict_options()).unwrap();
    let artifact = conversion.export_grouped(&["Plant-A"]).unwrap();

    assert_eq!(artifact.file_name(), "Plant-A_Bank_Transfer_File.xlsx");
    let sheet = read_sheet(artifact.bytes());
    assert_eq!(column(&sheet, "Payment_Type"), vec!["IFT"]);
}

#[test]
fn missing_column_produces_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("salary.xlsx");
    let headers: Vec<&str> = STRICT_REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|h| *h != "IFSC Code")
        .collect();
    write_payroll(&input, &headers, &payroll_rows());

    let err = convert_file(&input, &strict_options()).unwrap_err();
    assert!(matches!(err, ConversionError::Schema(_)));
    assert_eq!(err.missing_columns(), Some(&["IFSC Code".to_string()][..]));
    assert!(err.is_user_error());
}

#[test]
fn csv_input_with_custom_templates() {
    let csv = format!(
        "{}\nE1,Asha,KOTAK,K1,99,HQ,UP Phase 3,15/03/2024,1000\n",
        STRICT_REQUIRED_COLUMNS.join(",")
    );
    let options = ConvertOptions {
        debit_template: "Pay {month} / {cfl} {{bulk}}".into(),
        ..strict_options()
    };

    let (conversion, artifact) =
        convert_and_export::<&str>(csv.as_bytes(), Some("salary.csv"), &options, &[]).unwrap();

    let record = &conversion.output[0];
    assert_eq!(record.get("Debit_Narration"), Some("Pay March-2024 / HQ {bulk}"));
    assert_eq!(record.get("Payment_Type"), Some("IFT"));
    assert_eq!(record.get("Dr_Ac_No"), Some("6550063533"));
    assert!(!artifact.is_archive());
}
