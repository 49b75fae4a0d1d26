//! Integration tests for xlsxstream

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;
use xlsxstream::{
    CellStyle, CellValue, ExcelError, ExcelWriter, HeaderOptions, RowOptions, SheetVisibility,
    Warning, Workbook, WorkbookConfig,
};
use zip::ZipArchive;

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut xml).unwrap();
    xml
}

fn part_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

#[test]
fn test_header_and_row_scenario() {
    let mut workbook = Workbook::new();
    workbook
        .write_sheet_header("Sheet1", [("a", "string"), ("b", "integer")], &HeaderOptions::default())
        .unwrap();
    workbook
        .write_sheet_row(
            "Sheet1",
            [CellValue::from("x"), CellValue::Int(5)],
            &RowOptions::default(),
        )
        .unwrap();

    let bytes = workbook.write_to_vec().unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");

    assert!(sheet.contains("<dimension ref=\"A1:B2\"/>"));
    assert!(sheet.contains("<c r=\"A1\" t=\"inlineStr\"><is><t>a</t></is></c>"));
    assert!(sheet.contains("<c r=\"B1\" t=\"inlineStr\"><is><t>b</t></is></c>"));
    assert!(sheet.contains("t=\"inlineStr\"><is><t>x</t></is></c>"));
    assert!(sheet.contains("><v>5</v></c>"));
    assert!(!sheet.contains("r=\"B2\" t=\"inlineStr\""));

    let names = part_names(&bytes);
    assert!(names.iter().any(|n| n == "xl/styles.xml"));
    assert!(!names.iter().any(|n| n == "xl/sharedStrings.xml"));
}

#[test]
fn test_file_and_memory_outputs_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.xlsx");

    let build = || {
        let mut workbook = Workbook::new();
        workbook
            .set_created(chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap())
            .unwrap();
        workbook.set_title("Report").unwrap();
        workbook
            .write_sheet(
                "Data",
                vec![vec!["1", "one"], vec!["2", "two"]],
                Some(&[("n", "integer"), ("label", "string")][..]),
            )
            .unwrap();
        workbook
    };

    build().write_to_file(&path).unwrap();
    let in_memory = build().write_to_vec().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), in_memory);
}

#[test]
fn test_failed_write_keeps_destination() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("existing.xlsx");
    std::fs::write(&path, b"previous content").unwrap();

    // No worksheets: packaging fails after the staging file is created
    let mut workbook = Workbook::new();
    workbook.set_title("never written").unwrap();

    assert!(workbook.write_to_file(&path).is_err());
    assert_eq!(std::fs::read(&path).unwrap(), b"previous content");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    assert!(!workbook.is_finalized());
}

#[test]
fn test_directory_destination_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.xlsx");
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("keep.txt"), b"inside").unwrap();

    let mut workbook = Workbook::new();
    workbook
        .write_sheet_row("Sheet1", ["data"], &RowOptions::default())
        .unwrap();

    assert!(workbook.write_to_file(&path).is_err());
    assert!(path.is_dir());
    assert_eq!(std::fs::read(path.join("keep.txt")).unwrap(), b"inside");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    assert!(!workbook.is_finalized());
}

#[cfg(unix)]
#[test]
fn test_read_only_destination_is_untouched() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("existing.xlsx");
    std::fs::write(&path, b"previous content").unwrap();

    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o444);
    std::fs::set_permissions(&path, permissions).unwrap();

    let mut workbook = Workbook::new();
    workbook
        .write_sheet_row("Sheet1", ["data"], &RowOptions::default())
        .unwrap();
    let result = workbook.write_to_file(&path);

    // Privileged users write through read-only bits, so only check the failure case
    if result.is_err() {
        assert_eq!(std::fs::read(&path).unwrap(), b"previous content");
        assert!(!workbook.is_finalized());
    }
}

#[test]
fn test_failed_spill_does_not_duplicate_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkbookConfig::new()
        .with_spill_threshold(128)
        .with_temp_dir(dir.path().join("missing"));

    let mut workbook = Workbook::with_config(config);
    workbook
        .write_sheet_row("S", ["short"], &RowOptions::default())
        .unwrap();
    let long_row = ["a fairly long cell value that pushes the buffer past its threshold"];
    assert!(workbook
        .write_sheet_row("S", long_row, &RowOptions::default())
        .is_err());
    assert!(workbook
        .write_sheet_row("S", long_row, &RowOptions::default())
        .is_err());
    assert_eq!(workbook.count_sheet_rows("S"), 1);

    let bytes = workbook.write_to_vec().unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert_eq!(sheet.matches("<row r=\"1\"").count(), 1);
    assert!(!sheet.contains("<row r=\"2\""));
    assert!(sheet.contains("<dimension ref=\"A1:A1\"/>"));
    assert!(!sheet.contains("fairly long"));
}

#[test]
fn test_count_sheet_rows() {
    let mut workbook = Workbook::new();
    workbook
        .write_sheet_header("Counted", [("a", "general")], &HeaderOptions::default())
        .unwrap();
    for i in 0..5 {
        workbook
            .write_sheet_row("Counted", [i], &RowOptions::default())
            .unwrap();
    }
    workbook
        .write_sheet_header(
            "Suppressed",
            [("a", "general")],
            &HeaderOptions::new().with_suppress_row(true),
        )
        .unwrap();
    for i in 0..5 {
        workbook
            .write_sheet_row("Suppressed", [i], &RowOptions::default())
            .unwrap();
    }

    assert_eq!(workbook.count_sheet_rows("Counted"), 6);
    assert_eq!(workbook.count_sheet_rows("Suppressed"), 5);
    assert_eq!(workbook.count_sheet_rows("Missing"), 0);
}

#[test]
fn test_invalid_datetime_falls_back_to_text() {
    let warnings = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&warnings);

    let mut workbook = Workbook::new();
    workbook.set_warning_handler(move |warning| sink.lock().unwrap().push(warning.clone()));
    workbook
        .write_sheet_header("Events", [("when", "datetime")], &HeaderOptions::default())
        .unwrap();
    workbook
        .write_sheet_row("Events", ["not a date"], &RowOptions::default())
        .unwrap();
    workbook
        .write_sheet_row("Events", ["2024-03-31 12:00:00"], &RowOptions::default())
        .unwrap();

    let bytes = workbook.write_to_vec().unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("t=\"inlineStr\"><is><t>not a date</t></is></c>"));
    assert!(sheet.contains("><v>45382.5</v></c>"));

    let warnings = warnings.lock().unwrap();
    assert_eq!(
        *warnings,
        vec![Warning::DateConversion {
            sheet: "Events".to_string(),
            row: 1,
            col: 0,
            value: "not a date".to_string(),
        }]
    );
}

#[test]
fn test_merged_cells() {
    let mut workbook = Workbook::new();
    workbook
        .write_sheet_row("Sheet1", ["Title"], &RowOptions::default())
        .unwrap();
    workbook.mark_merged("Sheet1", 0, 0, 0, 4).unwrap();

    let bytes = workbook.write_to_vec().unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("<mergeCells count=\"1\"><mergeCell ref=\"A1:E1\"/></mergeCells>"));
    assert!(sheet.find("</sheetData>").unwrap() < sheet.find("<mergeCells").unwrap());
}

#[test]
fn test_strict_merges_reject_inverted_range() {
    let mut workbook = Workbook::with_config(WorkbookConfig::new().with_strict_merges(true));
    let result = workbook.mark_merged("Sheet1", 3, 0, 1, 0);
    assert!(matches!(result, Err(ExcelError::InvalidRange { .. })));
}

#[test]
fn test_large_dataset_streaming() {
    let dir = tempfile::tempdir().unwrap();
    let threshold = 4 * 1024;
    let config = WorkbookConfig::new()
        .with_spill_threshold(threshold)
        .with_temp_dir(dir.path());

    let mut workbook = Workbook::with_config(config);
    workbook
        .write_sheet_header(
            "Big",
            [("id", "integer"), ("name", "string"), ("score", "0.00")],
            &HeaderOptions::default(),
        )
        .unwrap();

    let mut largest_row = 0usize;
    for i in 0..1000 {
        let name = format!("User{}", i);
        let row = [
            CellValue::Int(i),
            CellValue::String(name.clone()),
            CellValue::Float(i as f64 * 1.5),
        ];
        largest_row = largest_row.max(120 + name.len());
        workbook
            .write_sheet_row("Big", row, &RowOptions::default())
            .unwrap();

        let sheet = workbook.sheet("Big").unwrap();
        assert!(sheet.buffered_bytes() <= threshold + largest_row);
    }

    let sheet = workbook.sheet("Big").unwrap();
    assert!(sheet.spilled_bytes() > 0);
    assert_eq!(sheet.row_count(), 1001);

    let bytes = workbook.write_to_vec().unwrap();
    let xml = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(xml.contains("<dimension ref=\"A1:C1001\"/>"));
    assert!(xml.contains("<t>User999</t>"));
    assert_eq!(xml.matches("<row ").count(), 1001);
}

#[test]
fn test_document_metadata() {
    let mut workbook = Workbook::new();
    workbook.set_title("Inventory").unwrap();
    workbook.set_subject("Stock levels").unwrap();
    workbook.set_author("Warehouse team").unwrap();
    workbook.set_company("Acme & Co").unwrap();
    workbook.set_keywords(["stock", "weekly", "stock"]).unwrap();
    workbook.set_description("Weekly export").unwrap();
    workbook.add_sheet("Items").unwrap();

    let bytes = workbook.write_to_vec().unwrap();
    let core = read_part(&bytes, "docProps/core.xml");
    assert!(core.contains("<dc:title>Inventory</dc:title>"));
    assert!(core.contains("<dc:subject>Stock levels</dc:subject>"));
    assert!(core.contains("<dc:creator>Warehouse team</dc:creator>"));
    assert!(core.contains("<cp:keywords>stock, weekly</cp:keywords>"));
    assert!(core.contains("<dc:description>Weekly export</dc:description>"));

    let app = read_part(&bytes, "docProps/app.xml");
    assert!(app.contains("<Company>Acme &amp; Co</Company>"));
}

#[test]
fn test_freeze_panes_and_autofilter() {
    let mut workbook = Workbook::new();
    workbook
        .write_sheet_header(
            "Filtered",
            [("region", "string"), ("amount", "money"), ("closed", "date")],
            &HeaderOptions::new().with_auto_filter(true).with_freeze(1, 0),
        )
        .unwrap();
    workbook
        .write_sheet_row("Filtered", ["North", "10.5", "2024-01-02"], &RowOptions::default())
        .unwrap();
    workbook
        .write_sheet_row("Filtered", ["South", "7", "2024-01-03"], &RowOptions::default())
        .unwrap();

    let bytes = workbook.write_to_vec().unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(
        "<pane ySplit=\"1\" topLeftCell=\"A2\" activePane=\"bottomLeft\" state=\"frozen\"/>"
    ));
    assert!(sheet.contains("<autoFilter ref=\"A1:C3\"/>"));

    let workbook_xml = read_part(&bytes, "xl/workbook.xml");
    assert!(workbook_xml.contains("_xlnm._FilterDatabase"));
    assert!(workbook_xml.contains("&apos;Filtered&apos;!$A$1:$C$3"));
}

#[test]
fn test_mutation_after_write_is_rejected() {
    let mut workbook = Workbook::new();
    workbook
        .write_sheet_row("Sheet1", ["a"], &RowOptions::default())
        .unwrap();
    workbook.write_to_vec().unwrap();

    let result = workbook.write_sheet_row("Sheet1", ["b"], &RowOptions::default());
    assert!(matches!(result, Err(ExcelError::InvalidState(_))));
    assert!(matches!(
        workbook.set_title("late"),
        Err(ExcelError::InvalidState(_))
    ));
}

#[test]
fn test_hidden_sheet() {
    let mut workbook = Workbook::new();
    workbook
        .write_sheet_row("Visible", ["shown"], &RowOptions::default())
        .unwrap();
    workbook
        .write_sheet_row("Lookup", ["secret"], &RowOptions::default())
        .unwrap();
    workbook
        .set_sheet_visibility("Lookup", SheetVisibility::Hidden)
        .unwrap();

    let bytes = workbook.write_to_vec().unwrap();
    let workbook_xml = read_part(&bytes, "xl/workbook.xml");
    assert!(workbook_xml.contains("<sheet name=\"Visible\" sheetId=\"1\" r:id=\"rId1\"/>"));
    assert!(workbook_xml.contains("<sheet name=\"Lookup\" sheetId=\"2\" state=\"hidden\" r:id=\"rId2\"/>"));
}

#[test]
fn test_multi_sheet() {
    let temp = NamedTempFile::new().unwrap();

    let mut writer = ExcelWriter::new(temp.path()).unwrap();
    writer.write_header(["Sheet", "Value"]).unwrap();
    writer.write_row(["first", "1"]).unwrap();
    writer.add_sheet("Second").unwrap();
    writer.write_row(["second", "2"]).unwrap();
    writer.save().unwrap();

    let bytes = std::fs::read(temp.path()).unwrap();
    let names = part_names(&bytes);
    assert!(names.iter().any(|n| n == "xl/worksheets/sheet1.xml"));
    assert!(names.iter().any(|n| n == "xl/worksheets/sheet2.xml"));

    let second = read_part(&bytes, "xl/worksheets/sheet2.xml");
    assert!(second.contains("<t>second</t>"));
    assert!(second.contains("<dimension ref=\"A1:B1\"/>"));

    let content_types = read_part(&bytes, "[Content_Types].xml");
    assert!(content_types.contains("/xl/worksheets/sheet2.xml"));
}

#[test]
fn test_typed_cells() {
    let mut workbook = Workbook::new();
    workbook
        .write_sheet_row(
            "Sheet1",
            [
                CellValue::String("Alice".to_string()),
                CellValue::Int(30),
                CellValue::Float(1234.56),
                CellValue::Bool(true),
                CellValue::Formula("=SUM(B1:C1)".to_string()),
            ],
            &RowOptions::default(),
        )
        .unwrap();

    let bytes = workbook.write_to_vec().unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("<c r=\"A1\" t=\"inlineStr\"><is><t>Alice</t></is></c>"));
    assert!(sheet.contains("<c r=\"B1\"><v>30</v></c>"));
    assert!(sheet.contains("<c r=\"C1\"><v>1234.56</v></c>"));
    assert!(sheet.contains("<c r=\"D1\" t=\"b\"><v>1</v></c>"));
    assert!(sheet.contains("<f>SUM(B1:C1)</f>"));
}

#[test]
fn test_empty_cells() {
    let mut workbook = Workbook::new();
    workbook
        .write_sheet_row(
            "Sheet1",
            [CellValue::from("a"), CellValue::Empty, CellValue::from("c")],
            &RowOptions::default(),
        )
        .unwrap();
    workbook
        .write_sheet_row(
            "Sheet1",
            [CellValue::Empty, CellValue::Empty],
            &RowOptions::new()
                .with_style(CellStyle::new().bold())
                .with_hidden(true)
                .with_collapsed(true),
        )
        .unwrap();

    let bytes = workbook.write_to_vec().unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(!sheet.contains("r=\"B1\""));
    assert!(sheet.contains("r=\"C1\""));
    assert!(sheet.contains("<row r=\"2\" hidden=\"1\" collapsed=\"1\">"));
    assert!(sheet.contains("<c r=\"A2\" s=\"1\"/>"));
    assert!(sheet.contains("<c r=\"B2\" s=\"1\"/>"));
}

#[test]
fn test_column_width() {
    let mut workbook = Workbook::new();
    workbook
        .write_sheet_header(
            "Sheet1",
            [("wide", "string"), ("narrow", "string")],
            &HeaderOptions::new().with_widths([30.0, 8.5]),
        )
        .unwrap();

    let bytes = workbook.write_to_vec().unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("<col min=\"1\" max=\"1\" width=\"30\" customWidth=\"1\"/>"));
    assert!(sheet.contains("<col min=\"2\" max=\"2\" width=\"8.5\" customWidth=\"1\"/>"));
}

#[test]
fn test_duplicate_sheet_names_are_uniqued() {
    let mut workbook = Workbook::new();
    workbook.add_sheet("Data").unwrap();
    workbook.add_sheet("DATA").unwrap();
    workbook.add_sheet("Bad/Name?").unwrap();

    assert_eq!(workbook.sheet_names(), vec!["Data", "DATA (2)", "Bad Name"]);
}
