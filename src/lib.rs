//! # xlsxstream
//!
//! Streaming writer for Office Open XML spreadsheets (`.xlsx`).
//!
//! Rows are converted to worksheet XML the moment they are written and kept
//! in a bounded buffer that spills to a temporary file, so memory use does
//! not grow with the number of rows. Column types declared in a header drive
//! how each value is stored: text, number, date or date-time. Styles are
//! interned workbook-wide and every distinct combination is written once.
//!
//! ## Quick start
//!
//! ```no_run
//! use xlsxstream::{HeaderOptions, RowOptions, Workbook};
//!
//! let mut workbook = Workbook::new();
//! workbook.set_title("Quarterly report")?;
//! workbook.write_sheet_header(
//!     "Sales",
//!     [("Region", "string"), ("Amount", "price"), ("Closed", "date")],
//!     &HeaderOptions::new().with_auto_filter(true).with_freeze(1, 0),
//! )?;
//! workbook.write_sheet_row("Sales", ["North", "1200.5", "2024-03-31"], &RowOptions::default())?;
//! workbook.write_to_file("report.xlsx")?;
//! # Ok::<(), xlsxstream::ExcelError>(())
//! ```
//!
//! For a simpler sequential API bound to a single output path see
//! [`ExcelWriter`].

pub mod address;
pub mod config;
pub mod error;
pub mod fast_writer;
pub mod format;
pub mod style;
pub mod types;
pub mod writer;

pub use config::WorkbookConfig;
pub use error::{ExcelError, Result};
pub use fast_writer::{DocumentProperties, SheetId, Workbook};
pub use format::{FormatKind, NumberFormat};
pub use style::{BorderLineStyle, BorderSides, CellStyle, Color, HorizontalAlign, VerticalAlign};
pub use types::{
    CellValue, HeaderOptions, RowOptions, RowStyle, SheetVisibility, StyledCell, Warning,
};
pub use writer::{ExcelWriter, ExcelWriterBuilder};
