//! Streaming XLSX writer
//!
//! Rows are serialized to worksheet XML as soon as they are written. The
//! package itself is only assembled when the workbook is written out.

mod package;
mod parts;
mod spill;
mod styles;
mod workbook;
mod worksheet;
mod xml_writer;

pub use styles::{StyleDescriptor, StyleId, StyleRegistry};
pub use workbook::{sanitize_sheet_name, DocumentProperties, SheetId, Workbook, MAX_SHEET_NAME_LEN};
pub use worksheet::{MergedRange, SheetStream};
pub use xml_writer::XmlWriter;
