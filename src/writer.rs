//! Excel file writing with streaming support

use std::path::{Path, PathBuf};

use crate::config::WorkbookConfig;
use crate::error::Result;
use crate::fast_writer::Workbook;
use crate::style::CellStyle;
use crate::types::{CellValue, HeaderOptions, RowOptions, RowStyle, StyledCell};

const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Excel file writer bound to an output path
///
/// Writes rows to the current sheet one at a time; memory stays bounded by
/// the workbook's spill threshold. Nothing touches the output path until
/// [`save`](ExcelWriter::save).
pub struct ExcelWriter {
    workbook: Workbook,
    current_sheet: String,
    output_path: PathBuf,
    next_row_height: Option<f64>,
}

impl ExcelWriter {
    /// Create a new Excel writer
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xlsxstream::ExcelWriter;
    ///
    /// let mut writer = ExcelWriter::new("output.xlsx").unwrap();
    /// writer.write_row(&["Name", "Age"]).unwrap();
    /// writer.save().unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_parts(path.as_ref(), DEFAULT_SHEET_NAME, WorkbookConfig::default())
    }

    fn with_parts(path: &Path, sheet_name: &str, config: WorkbookConfig) -> Result<Self> {
        let mut workbook = Workbook::with_config(config);
        workbook.add_sheet(sheet_name)?;

        Ok(ExcelWriter {
            workbook,
            current_sheet: sheet_name.to_string(),
            output_path: path.to_path_buf(),
            next_row_height: None,
        })
    }

    fn row_options(&mut self) -> RowOptions {
        RowOptions {
            height: self.next_row_height.take(),
            ..RowOptions::default()
        }
    }

    /// Write a row of data
    ///
    /// Numeric-looking strings are stored as numbers, strings starting with
    /// `=` as formulas, everything else as text.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xlsxstream::ExcelWriter;
    ///
    /// let mut writer = ExcelWriter::new("output.xlsx").unwrap();
    /// writer.write_row(&["Alice", "30", "New York"]).unwrap();
    /// writer.write_row(&["Bob", "25", "San Francisco"]).unwrap();
    /// writer.save().unwrap();
    /// ```
    pub fn write_row<I, S>(&mut self, data: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let options = self.row_options();
        let values = data.into_iter().map(|value| CellValue::from(value.as_ref()));
        self.workbook
            .write_sheet_row(&self.current_sheet, values, &options)
    }

    /// Write multiple rows at once
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xlsxstream::ExcelWriter;
    ///
    /// let mut writer = ExcelWriter::new("output.xlsx").unwrap();
    ///
    /// let rows = vec![
    ///     vec!["Alice", "30", "NYC"],
    ///     vec!["Bob", "25", "SF"],
    ///     vec!["Carol", "35", "LA"],
    /// ];
    ///
    /// writer.write_rows_batch(&rows).unwrap();
    /// writer.save().unwrap();
    /// ```
    pub fn write_rows_batch<I, R, S>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Write a row with typed cell values
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xlsxstream::{CellValue, ExcelWriter};
    ///
    /// let mut writer = ExcelWriter::new("output.xlsx").unwrap();
    /// writer.write_row_typed(&[
    ///     CellValue::String("Alice".to_string()),
    ///     CellValue::Int(30),
    ///     CellValue::Float(1234.56),
    /// ]).unwrap();
    /// writer.save().unwrap();
    /// ```
    pub fn write_row_typed(&mut self, cells: &[CellValue]) -> Result<()> {
        let options = self.row_options();
        self.workbook
            .write_sheet_row(&self.current_sheet, cells.iter().cloned(), &options)
    }

    /// Write multiple typed rows at once
    pub fn write_rows_typed_batch(&mut self, rows: &[Vec<CellValue>]) -> Result<()> {
        for row_cells in rows {
            self.write_row_typed(row_cells)?;
        }
        Ok(())
    }

    /// Write a row where every cell carries its own style
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xlsxstream::{CellStyle, CellValue, ExcelWriter, StyledCell};
    ///
    /// let mut writer = ExcelWriter::new("output.xlsx").unwrap();
    /// writer.write_row_styled(&[
    ///     StyledCell::new(CellValue::from("Total"), CellStyle::new().bold()),
    ///     StyledCell::default_style(CellValue::Float(99.5)),
    /// ]).unwrap();
    /// writer.save().unwrap();
    /// ```
    pub fn write_row_styled(&mut self, cells: &[StyledCell]) -> Result<()> {
        let mut options = self.row_options();
        options.style = Some(RowStyle::PerCell(
            cells.iter().map(|cell| cell.style.clone()).collect(),
        ));
        let values = cells.iter().map(|cell| cell.value.clone());
        self.workbook
            .write_sheet_row(&self.current_sheet, values, &options)
    }

    /// Write header row with bold formatting
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xlsxstream::ExcelWriter;
    ///
    /// let mut writer = ExcelWriter::new("output.xlsx").unwrap();
    /// writer.write_header(&["ID", "Name", "Email"]).unwrap();
    /// writer.write_row(&["1", "Alice", "alice@example.com"]).unwrap();
    /// writer.save().unwrap();
    /// ```
    pub fn write_header<I, S>(&mut self, headers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let options = HeaderOptions::new().with_style(CellStyle::new().bold());
        let columns = headers.into_iter().map(|header| (header, "general"));
        self.workbook
            .write_sheet_header(&self.current_sheet, columns, &options)
    }

    /// Write header row with explicit column types and options
    ///
    /// `columns` pairs each label with a type token such as `"string"`,
    /// `"integer"`, `"date"` or a literal number format.
    pub fn write_header_typed<I, K, V>(&mut self, columns: I, options: &HeaderOptions) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.workbook
            .write_sheet_header(&self.current_sheet, columns, options)
    }

    /// Add a new sheet and switch to it
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xlsxstream::ExcelWriter;
    ///
    /// let mut writer = ExcelWriter::new("output.xlsx").unwrap();
    /// writer.write_row(&["Data on Sheet1"]).unwrap();
    ///
    /// writer.add_sheet("Sheet2").unwrap();
    /// writer.write_row(&["Data on Sheet2"]).unwrap();
    ///
    /// writer.save().unwrap();
    /// ```
    pub fn add_sheet(&mut self, name: &str) -> Result<()> {
        self.workbook.add_sheet(name)?;
        self.current_sheet = name.to_string();
        self.next_row_height = None;
        Ok(())
    }

    /// Set column width of the current sheet
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xlsxstream::ExcelWriter;
    ///
    /// let mut writer = ExcelWriter::new("output.xlsx").unwrap();
    /// writer.set_column_width(0, 20.0).unwrap(); // Column A width = 20
    /// writer.write_row(&["Wide Column"]).unwrap();
    /// writer.save().unwrap();
    /// ```
    pub fn set_column_width(&mut self, col: u32, width: f64) -> Result<()> {
        self.workbook
            .set_column_width(&self.current_sheet, col, width)
    }

    /// Set the height of the next row written, in points
    pub fn set_next_row_height(&mut self, height: f64) {
        self.next_row_height = Some(height);
    }

    /// Merge a range of the current sheet
    pub fn merge_cells(&mut self, start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Result<()> {
        self.workbook
            .mark_merged(&self.current_sheet, start_row, start_col, end_row, end_col)
    }

    /// Access the underlying workbook for metadata and advanced options
    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    /// Save the workbook to disk
    ///
    /// Must be called to finalize and write the Excel file.
    pub fn save(mut self) -> Result<()> {
        self.workbook.write_to_file(&self.output_path)
    }

    /// Get current row number (0-based)
    pub fn current_row(&self) -> u32 {
        self.workbook.count_sheet_rows(&self.current_sheet)
    }
}

/// Builder for creating configured Excel writers
pub struct ExcelWriterBuilder {
    path: PathBuf,
    default_sheet_name: Option<String>,
    config: WorkbookConfig,
}

impl ExcelWriterBuilder {
    /// Create a new builder
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ExcelWriterBuilder {
            path: path.as_ref().to_path_buf(),
            default_sheet_name: None,
            config: WorkbookConfig::default(),
        }
    }

    /// Set the default sheet name
    pub fn with_sheet_name(mut self, name: &str) -> Self {
        self.default_sheet_name = Some(name.to_string());
        self
    }

    /// Replace the whole workbook configuration
    pub fn with_config(mut self, config: WorkbookConfig) -> Self {
        self.config = config;
        self
    }

    /// Buffered row bytes per sheet before spilling to disk
    pub fn with_spill_threshold(mut self, bytes: usize) -> Self {
        self.config = self.config.with_spill_threshold(bytes);
        self
    }

    /// Deflate level (0-9)
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.config = self.config.with_compression_level(level);
        self
    }

    /// Directory for spill files
    pub fn with_temp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config = self.config.with_temp_dir(dir.as_ref());
        self
    }

    /// Build the writer
    pub fn build(self) -> Result<ExcelWriter> {
        let sheet_name = self
            .default_sheet_name
            .as_deref()
            .unwrap_or(DEFAULT_SHEET_NAME);
        ExcelWriter::with_parts(&self.path, sheet_name, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn sheet_xml(path: &Path) -> String {
        let file = std::fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut xml = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_writer_creation() {
        let temp = NamedTempFile::new().unwrap();
        let writer = ExcelWriter::new(temp.path());
        assert!(writer.is_ok());
    }

    #[test]
    fn test_builder() {
        let temp = NamedTempFile::new().unwrap();
        let writer = ExcelWriterBuilder::new(temp.path())
            .with_sheet_name("CustomSheet")
            .with_compression_level(1)
            .build()
            .unwrap();
        assert_eq!(writer.workbook.sheet_names(), vec!["CustomSheet"]);
        assert_eq!(writer.workbook.config().compression_level(), 1);
    }

    #[test]
    fn test_write_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facade.xlsx");

        let mut writer = ExcelWriter::new(&path).unwrap();
        writer.write_header(["Name", "Age"]).unwrap();
        writer.set_next_row_height(24.0);
        writer.write_row(["Alice", "30"]).unwrap();
        writer
            .write_row_styled(&[
                StyledCell::new(CellValue::from("Bob"), CellStyle::new().italic()),
                StyledCell::default_style(CellValue::Int(25)),
            ])
            .unwrap();
        assert_eq!(writer.current_row(), 3);
        writer.save().unwrap();

        let xml = sheet_xml(&path);
        assert!(xml.contains("<c r=\"A1\" s=\"1\" t=\"inlineStr\"><is><t>Name</t></is></c>"));
        assert!(xml.contains("<row r=\"2\" ht=\"24\" customHeight=\"1\">"));
        assert!(xml.contains("<c r=\"B2\"><v>30</v></c>"));
        assert!(xml.contains("<c r=\"A3\" s=\"2\" t=\"inlineStr\"><is><t>Bob</t></is></c>"));
        assert!(xml.contains("<c r=\"B3\"><v>25</v></c>"));
    }

    #[test]
    fn test_typed_header_and_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typed.xlsx");

        let mut writer = ExcelWriterBuilder::new(&path)
            .with_sheet_name("Orders")
            .build()
            .unwrap();
        writer.workbook_mut().set_author("Sales").unwrap();
        writer
            .write_header_typed(
                [("id", "integer"), ("amount", "money")],
                &HeaderOptions::new().with_auto_filter(true),
            )
            .unwrap();
        writer
            .write_rows_typed_batch(&[
                vec![CellValue::Int(1), CellValue::Float(9.5)],
                vec![CellValue::Int(2), CellValue::Float(12.0)],
            ])
            .unwrap();
        writer.merge_cells(3, 0, 3, 1).unwrap();
        assert_eq!(writer.current_row(), 3);
        writer.save().unwrap();

        let xml = sheet_xml(&path);
        assert!(xml.contains("<autoFilter ref=\"A1:B3\"/>"));
        assert!(xml.contains("<mergeCell ref=\"A4:B4\"/>"));
        assert!(xml.contains("<v>12</v>"));
    }
}
