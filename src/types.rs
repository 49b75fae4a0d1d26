//! Type definitions for Excel data

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::address::cell_ref;
use crate::format::{serial_from_date, serial_from_datetime};
use crate::style::CellStyle;

/// Styled cell value (combines value with formatting)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StyledCell {
    /// The cell value
    pub value: CellValue,
    /// The cell style
    pub style: CellStyle,
}

impl StyledCell {
    /// Create a new styled cell
    pub fn new(value: CellValue, style: CellStyle) -> Self {
        StyledCell { value, style }
    }

    /// Create a cell with default style
    pub fn default_style(value: CellValue) -> Self {
        StyledCell {
            value,
            style: CellStyle::default(),
        }
    }
}

impl From<CellValue> for StyledCell {
    fn from(value: CellValue) -> Self {
        StyledCell::default_style(value)
    }
}

/// Represents a single cell value in an Excel worksheet
///
/// How a value is written depends on the column format it lands in: a
/// `String` in a `date` column is converted to a serial, a `String` that
/// starts with `=` is written as a formula, and so on.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    /// Empty cell
    Empty,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// DateTime value (Excel serial date number)
    DateTime(f64),
    /// Error value such as `#N/A`
    Error(String),
    /// Formula value (e.g., "=SUM(A1:A10)"); the leading '=' is optional
    Formula(String),
}

impl CellValue {
    /// Convert cell value to string
    pub fn as_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::String(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(d) => d.to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::Formula(f) => f.clone(),
        }
    }

    /// Check if cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&String> for CellValue {
    fn from(s: &String) -> Self {
        CellValue::String(s.clone())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<u32> for CellValue {
    fn from(i: u32) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(date: NaiveDate) -> Self {
        match serial_from_date(date) {
            Some(serial) => CellValue::DateTime(serial),
            None => CellValue::String(date.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(datetime: NaiveDateTime) -> Self {
        match serial_from_datetime(datetime) {
            Some(serial) => CellValue::DateTime(serial),
            None => CellValue::String(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// Styles applied to the cells of one row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum RowStyle {
    /// Same style for every cell in the row
    Uniform(CellStyle),
    /// One style per column; missing entries use the default style, extras are ignored
    PerCell(Vec<CellStyle>),
}

impl RowStyle {
    /// Style for the cell at `col`, if any
    pub fn for_column(&self, col: usize) -> Option<&CellStyle> {
        match self {
            RowStyle::Uniform(style) => Some(style),
            RowStyle::PerCell(styles) => styles.get(col),
        }
    }
}

impl From<CellStyle> for RowStyle {
    fn from(style: CellStyle) -> Self {
        RowStyle::Uniform(style)
    }
}

impl From<Vec<CellStyle>> for RowStyle {
    fn from(styles: Vec<CellStyle>) -> Self {
        RowStyle::PerCell(styles)
    }
}

/// Options for a sheet header
///
/// Widths, autofilter and freeze panes only take effect on the first touch of
/// a sheet (before any row is written); column formats are always replaced.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeaderOptions {
    /// Column widths in character units; `None` keeps the default width
    pub widths: Vec<Option<f64>>,
    /// Add an autofilter starting at the header row
    pub auto_filter: bool,
    /// Number of rows frozen at the top
    pub freeze_rows: u32,
    /// Number of columns frozen at the left
    pub freeze_columns: u32,
    /// Register column formats without writing a header row
    pub suppress_row: bool,
    /// Style of the header cells
    pub style: Option<RowStyle>,
}

impl HeaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_widths<I: IntoIterator<Item = f64>>(mut self, widths: I) -> Self {
        self.widths = widths.into_iter().map(Some).collect();
        self
    }

    pub fn with_auto_filter(mut self, enabled: bool) -> Self {
        self.auto_filter = enabled;
        self
    }

    /// Freeze the top `rows` rows and left `columns` columns
    pub fn with_freeze(mut self, rows: u32, columns: u32) -> Self {
        self.freeze_rows = rows;
        self.freeze_columns = columns;
        self
    }

    pub fn with_suppress_row(mut self, suppress: bool) -> Self {
        self.suppress_row = suppress;
        self
    }

    pub fn with_style(mut self, style: impl Into<RowStyle>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// Options for a single data row
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RowOptions {
    /// Row height in points; non-positive values are ignored
    pub height: Option<f64>,
    pub hidden: bool,
    pub collapsed: bool,
    /// Wrap text in every cell of the row
    pub wrap_text: bool,
    pub style: Option<RowStyle>,
}

impl RowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn with_wrap_text(mut self, wrap: bool) -> Self {
        self.wrap_text = wrap;
        self
    }

    pub fn with_style(mut self, style: impl Into<RowStyle>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// Visibility of a sheet tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    /// Hidden and not listed in the unhide dialog
    VeryHidden,
}

impl SheetVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            SheetVisibility::Visible => "visible",
            SheetVisibility::Hidden => "hidden",
            SheetVisibility::VeryHidden => "veryHidden",
        }
    }

    pub fn is_visible(self) -> bool {
        self == SheetVisibility::Visible
    }
}

/// Non-fatal anomaly reported while building a workbook
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A value in a date/datetime column could not be converted; written as text
    DateConversion {
        sheet: String,
        row: u32,
        col: u32,
        value: String,
    },
    /// A merge range with start after end was normalized
    NormalizedMerge {
        sheet: String,
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    },
    /// A row height that is not a positive number was dropped
    InvalidRowHeight { sheet: String, row: u32, height: f64 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DateConversion {
                sheet,
                row,
                col,
                value,
            } => write!(
                f,
                "{sheet}!{}: {value:?} is not a date, written as text",
                cell_ref(*row, *col)
            ),
            Warning::NormalizedMerge {
                sheet,
                start_row,
                start_col,
                end_row,
                end_col,
            } => write!(
                f,
                "{sheet}: merge {}:{} normalized",
                cell_ref(*start_row, *start_col),
                cell_ref(*end_row, *end_col)
            ),
            Warning::InvalidRowHeight { sheet, row, height } => {
                write!(f, "{sheet}: row {} height {height} ignored", row + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(42i32), CellValue::Int(42));
        assert_eq!(CellValue::from("x"), CellValue::String("x".to_string()));
        assert_eq!(CellValue::from(None::<f64>), CellValue::Empty);
        assert_eq!(CellValue::from(Some(1.5)), CellValue::Float(1.5));
        assert_eq!(CellValue::Int(7).as_string(), "7");
    }

    #[test]
    fn test_chrono_conversions() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(CellValue::from(date), CellValue::DateTime(45306.0));

        let noon = date.and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(CellValue::from(noon), CellValue::DateTime(45306.5));
    }

    #[test]
    fn test_row_style_lookup() {
        let bold = CellStyle::new().bold();
        let uniform = RowStyle::from(bold.clone());
        assert_eq!(uniform.for_column(99), Some(&bold));

        let per_cell = RowStyle::from(vec![CellStyle::default(), bold.clone()]);
        assert_eq!(per_cell.for_column(1), Some(&bold));
        assert_eq!(per_cell.for_column(2), None);
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::DateConversion {
            sheet: "Sheet1".to_string(),
            row: 1,
            col: 2,
            value: "soon".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "Sheet1!C2: \"soon\" is not a date, written as text"
        );
        assert_eq!(SheetVisibility::VeryHidden.as_str(), "veryHidden");
    }
}
