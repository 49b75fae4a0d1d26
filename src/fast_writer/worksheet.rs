//! Per-sheet row stream
//!
//! A [`SheetStream`] turns rows into `<row>` XML as they arrive and keeps only
//! the bookkeeping needed for the sheet's header and footer elements. Row XML
//! lives in a [`SpillBuffer`] so memory stays bounded regardless of row count.

use std::collections::BTreeMap;
use std::io::Write;

use super::spill::SpillBuffer;
use super::styles::{StyleDescriptor, StyleId, StyleRegistry};
use super::xml_writer::{push_escaped, push_number, XmlWriter, XML_DECLARATION};
use crate::address::{cell_ref, push_cell_ref, range_ref};
use crate::config::WorkbookConfig;
use crate::error::{ExcelError, Result};
use crate::format::{excel_serial, resolve, FormatKind, NumberFormat};
use crate::style::CellStyle;
use crate::types::{CellValue, HeaderOptions, RowOptions, SheetVisibility, Warning};

/// Inclusive, zero-based cell range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

/// Streaming writer for one worksheet
///
/// Rows are appended in call order. Finalization renders the complete
/// `xl/worksheets/sheetN.xml` part and leaves the stream intact, so a
/// workbook can be serialized more than once.
#[derive(Debug)]
pub struct SheetStream {
    name: String,
    rows: SpillBuffer,
    row_count: u32,
    max_cols: u32,
    touched: bool,

    columns: Vec<NumberFormat>,
    default_style_cache: Vec<Option<StyleId>>,
    general: NumberFormat,

    column_widths: BTreeMap<u32, f64>,
    merges: Vec<MergedRange>,
    freeze_rows: u32,
    freeze_columns: u32,
    auto_filter_row: Option<u32>,
    visibility: SheetVisibility,
    right_to_left: bool,
    tab_selected: bool,
    strict_merges: bool,

    scratch: Vec<u8>,
    warnings: Vec<Warning>,
}

impl SheetStream {
    /// Create an empty sheet; `name` must already be a valid sheet name
    pub fn new(name: impl Into<String>, config: &WorkbookConfig) -> Self {
        SheetStream {
            name: name.into(),
            rows: SpillBuffer::new(
                config.spill_threshold(),
                config.temp_dir().map(|dir| dir.to_path_buf()),
            ),
            row_count: 0,
            max_cols: 0,
            touched: false,
            columns: Vec::new(),
            default_style_cache: Vec::new(),
            general: NumberFormat::general(),
            column_widths: BTreeMap::new(),
            merges: Vec::new(),
            freeze_rows: 0,
            freeze_columns: 0,
            auto_filter_row: None,
            visibility: SheetVisibility::Visible,
            right_to_left: false,
            tab_selected: false,
            strict_merges: config.strict_merges(),
            scratch: Vec::with_capacity(1024),
            warnings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows written so far, header row included
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Widest row written so far
    pub fn max_columns(&self) -> u32 {
        self.max_cols
    }

    pub fn merged_ranges(&self) -> &[MergedRange] {
        &self.merges
    }

    pub fn visibility(&self) -> SheetVisibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: SheetVisibility) {
        self.visibility = visibility;
    }

    pub(crate) fn set_right_to_left(&mut self, rtl: bool) {
        self.right_to_left = rtl;
    }

    pub(crate) fn set_tab_selected(&mut self, selected: bool) {
        self.tab_selected = selected;
    }

    /// Bytes of row XML currently held in memory
    pub fn buffered_bytes(&self) -> usize {
        self.rows.memory_len()
    }

    /// Bytes of row XML moved to the spill file
    pub fn spilled_bytes(&self) -> u64 {
        self.rows.spilled_len()
    }

    pub(crate) fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Set the width of one column in character units
    pub fn set_column_width(&mut self, col: u32, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.column_widths.insert(col, width);
        } else {
            log::debug!("{}: ignoring width {} for column {}", self.name, width, col);
        }
    }

    /// Autofilter range, from the header row to the last written cell
    pub fn auto_filter_range(&self) -> Option<MergedRange> {
        let start_row = self.auto_filter_row?;
        Some(MergedRange {
            start_row,
            start_col: 0,
            end_row: self.row_count.saturating_sub(1).max(start_row),
            end_col: self.max_cols.saturating_sub(1),
        })
    }

    /// Declare column formats and write the header row
    ///
    /// `columns` pairs each header label with a type token understood by
    /// [`resolve`](crate::format::resolve). Widths, autofilter and freeze
    /// panes are only applied while the sheet is untouched; column formats are
    /// always replaced.
    pub fn write_header<I, K, V>(
        &mut self,
        columns: I,
        options: &HeaderOptions,
        styles: &mut StyleRegistry,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let (labels, formats): (Vec<K>, Vec<NumberFormat>) = columns
            .into_iter()
            .map(|(label, token)| {
                let format = resolve(token.as_ref());
                (label, format)
            })
            .unzip();

        if options.suppress_row {
            self.apply_header(formats, labels.len(), options);
            return Ok(());
        }

        let row = self.row_count;
        let mut buf = std::mem::take(&mut self.scratch);
        buf.clear();
        push_row_start(&mut buf, row, None, false, false);

        for (col, label) in labels.iter().enumerate() {
            let style = options
                .style
                .as_ref()
                .and_then(|style| style.for_column(col))
                .cloned()
                .unwrap_or_default();
            let style_id = styles.intern(&StyleDescriptor::new(NumberFormat::general(), style));
            push_inline_string(&mut buf, row, col as u32, style_id, label.as_ref());
        }
        buf.extend_from_slice(b"</row>");

        let result = self.rows.push(&buf);
        self.scratch = buf;
        result?;

        self.apply_header(formats, labels.len(), options);
        self.row_count += 1;
        self.max_cols = self.max_cols.max(labels.len() as u32);
        Ok(())
    }

    fn apply_header(&mut self, formats: Vec<NumberFormat>, column_count: usize, options: &HeaderOptions) {
        self.columns = formats;
        self.default_style_cache.clear();

        if !self.touched {
            self.apply_layout(column_count, options);
        }
        self.touched = true;
    }

    fn apply_layout(&mut self, column_count: usize, options: &HeaderOptions) {
        for col in 0..column_count {
            let explicit = options.widths.get(col).copied().flatten();
            let hinted = options
                .style
                .as_ref()
                .and_then(|style| style.for_column(col))
                .and_then(|style| style.width);
            if let Some(width) = explicit.or(hinted) {
                self.set_column_width(col as u32, width);
            }
        }
        // Widths beyond the header still count
        for (col, width) in options.widths.iter().enumerate().skip(column_count) {
            if let Some(width) = width {
                self.set_column_width(col as u32, *width);
            }
        }

        if options.auto_filter {
            self.auto_filter_row = Some(self.row_count);
        }
        self.freeze_rows = options.freeze_rows;
        self.freeze_columns = options.freeze_columns;
    }

    /// Append one data row
    ///
    /// Values are coerced according to the format of the column they land in.
    pub fn write_row<I>(
        &mut self,
        values: I,
        options: &RowOptions,
        styles: &mut StyleRegistry,
    ) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<CellValue>,
    {
        let row = self.row_count;

        // Held back until the row is stored
        let mut warnings = Vec::new();

        let height = match options.height {
            Some(height) if height.is_finite() && height > 0.0 => Some(height),
            Some(height) => {
                log::warn!("{}: ignoring row height {} on row {}", self.name, height, row + 1);
                warnings.push(Warning::InvalidRowHeight {
                    sheet: self.name.clone(),
                    row,
                    height,
                });
                None
            }
            None => None,
        };

        let mut buf = std::mem::take(&mut self.scratch);
        buf.clear();
        push_row_start(&mut buf, row, height, options.hidden, options.collapsed);

        let mut cell_count = 0u32;
        for (col, value) in values.into_iter().enumerate() {
            let value = value.into();
            let kind = self.column_format(col).kind();
            let style_id = self.cell_style(col, options, styles);

            if let Some(original) = push_cell(&mut buf, row, col as u32, value, kind, style_id) {
                log::warn!(
                    "{}!{}: {:?} is not a valid date, writing as text",
                    self.name,
                    cell_ref(row, col as u32),
                    original
                );
                warnings.push(Warning::DateConversion {
                    sheet: self.name.clone(),
                    row,
                    col: col as u32,
                    value: original,
                });
            }
            cell_count += 1;
        }
        buf.extend_from_slice(b"</row>");

        let result = self.rows.push(&buf);
        self.scratch = buf;
        result?;

        self.warnings.append(&mut warnings);
        self.touched = true;
        self.row_count += 1;
        self.max_cols = self.max_cols.max(cell_count);
        Ok(())
    }

    fn column_format(&self, col: usize) -> &NumberFormat {
        self.columns.get(col).unwrap_or(&self.general)
    }

    fn cell_style(&mut self, col: usize, options: &RowOptions, styles: &mut StyleRegistry) -> StyleId {
        let style = options.style.as_ref().and_then(|style| style.for_column(col));

        if style.is_none() && !options.wrap_text {
            if let Some(Some(id)) = self.default_style_cache.get(col) {
                return *id;
            }
            let id = styles.intern(&StyleDescriptor::new(
                self.column_format(col).clone(),
                CellStyle::default(),
            ));
            if self.default_style_cache.len() <= col {
                self.default_style_cache.resize(col + 1, None);
            }
            self.default_style_cache[col] = Some(id);
            return id;
        }

        let mut style = style.cloned().unwrap_or_default();
        style.wrap_text |= options.wrap_text;
        styles.intern(&StyleDescriptor::new(self.column_format(col).clone(), style))
    }

    /// Record a merged range
    ///
    /// Ranges whose start lies after their end are normalized with a warning,
    /// or rejected when the workbook was configured with strict merges.
    /// Overlap with other ranges is not checked.
    pub fn mark_merged(
        &mut self,
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    ) -> Result<()> {
        if start_row > end_row || start_col > end_col {
            if self.strict_merges {
                return Err(ExcelError::InvalidRange {
                    start_row,
                    start_col,
                    end_row,
                    end_col,
                });
            }
            log::warn!(
                "{}: normalizing inverted merge range {}:{}",
                self.name,
                cell_ref(start_row, start_col),
                cell_ref(end_row, end_col)
            );
            self.warnings.push(Warning::NormalizedMerge {
                sheet: self.name.clone(),
                start_row,
                start_col,
                end_row,
                end_col,
            });
        }

        self.merges.push(MergedRange {
            start_row: start_row.min(end_row),
            start_col: start_col.min(end_col),
            end_row: start_row.max(end_row),
            end_col: start_col.max(end_col),
        });
        Ok(())
    }

    /// Render the complete worksheet part into `out`
    pub fn finalize_into<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let mut xml = XmlWriter::new(&mut *out);
        self.write_preamble(&mut xml)?;
        xml.flush()?;
        drop(xml);

        self.rows.copy_into(out)?;

        let mut xml = XmlWriter::new(&mut *out);
        self.write_trailer(&mut xml)?;
        xml.flush()?;
        Ok(())
    }

    /// Render the complete worksheet part into a new buffer
    pub fn finalize_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.rows.memory_len() + 1024);
        self.finalize_into(&mut out)?;
        Ok(out)
    }

    fn write_preamble<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.write_raw(XML_DECLARATION)?;
        xml.start_element("worksheet")?;
        xml.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        xml.attribute(
            "xmlns:r",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
        )?;
        xml.close_start_tag()?;

        xml.write_str("<sheetPr filterMode=\"false\"><pageSetUpPr fitToPage=\"false\"/></sheetPr>")?;

        xml.start_element("dimension")?;
        xml.attribute("ref", &self.dimension_ref())?;
        xml.close_empty()?;

        self.write_sheet_views(xml)?;

        xml.write_str("<sheetFormatPr defaultRowHeight=\"15\" outlineLevelRow=\"0\"/>")?;

        if !self.column_widths.is_empty() {
            xml.start_element("cols")?;
            xml.close_start_tag()?;
            for (col, width) in &self.column_widths {
                xml.start_element("col")?;
                xml.attribute_int("min", *col as i64 + 1)?;
                xml.attribute_int("max", *col as i64 + 1)?;
                xml.attribute_num("width", *width)?;
                xml.attribute("customWidth", "1")?;
                xml.close_empty()?;
            }
            xml.end_element("cols")?;
        }

        if self.rows.is_empty() {
            xml.write_str("<sheetData/>")
        } else {
            xml.write_str("<sheetData>")
        }
    }

    fn write_sheet_views<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.write_str("<sheetViews>")?;
        xml.start_element("sheetView")?;
        if self.right_to_left {
            xml.attribute("rightToLeft", "1")?;
        }
        if self.tab_selected {
            xml.attribute("tabSelected", "1")?;
        }
        xml.attribute("workbookViewId", "0")?;
        xml.close_start_tag()?;

        let rows = self.freeze_rows;
        let cols = self.freeze_columns;
        match (rows > 0, cols > 0) {
            (true, true) => {
                let corner = cell_ref(rows, cols);
                xml.start_element("pane")?;
                xml.attribute_int("xSplit", cols as i64)?;
                xml.attribute_int("ySplit", rows as i64)?;
                xml.attribute("topLeftCell", &corner)?;
                xml.attribute("activePane", "bottomRight")?;
                xml.attribute("state", "frozen")?;
                xml.close_empty()?;
                write_selection(xml, "topRight", &cell_ref(0, cols))?;
                write_selection(xml, "bottomLeft", &cell_ref(rows, 0))?;
                write_selection(xml, "bottomRight", &corner)?;
            }
            (true, false) => {
                let top_left = cell_ref(rows, 0);
                xml.start_element("pane")?;
                xml.attribute_int("ySplit", rows as i64)?;
                xml.attribute("topLeftCell", &top_left)?;
                xml.attribute("activePane", "bottomLeft")?;
                xml.attribute("state", "frozen")?;
                xml.close_empty()?;
                write_selection(xml, "bottomLeft", &top_left)?;
            }
            (false, true) => {
                let top_left = cell_ref(0, cols);
                xml.start_element("pane")?;
                xml.attribute_int("xSplit", cols as i64)?;
                xml.attribute("topLeftCell", &top_left)?;
                xml.attribute("activePane", "topRight")?;
                xml.attribute("state", "frozen")?;
                xml.close_empty()?;
                write_selection(xml, "topRight", &top_left)?;
            }
            (false, false) => {
                xml.write_str("<selection activeCell=\"A1\" sqref=\"A1\"/>")?;
            }
        }

        xml.end_element("sheetView")?;
        xml.write_str("</sheetViews>")
    }

    fn write_trailer<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        if !self.rows.is_empty() {
            xml.end_element("sheetData")?;
        }

        if let Some(range) = self.auto_filter_range() {
            xml.start_element("autoFilter")?;
            xml.attribute(
                "ref",
                &range_ref(range.start_row, range.start_col, range.end_row, range.end_col),
            )?;
            xml.close_empty()?;
        }

        if !self.merges.is_empty() {
            xml.start_element("mergeCells")?;
            xml.attribute_int("count", self.merges.len() as i64)?;
            xml.close_start_tag()?;
            for range in &self.merges {
                xml.start_element("mergeCell")?;
                xml.attribute(
                    "ref",
                    &range_ref(range.start_row, range.start_col, range.end_row, range.end_col),
                )?;
                xml.close_empty()?;
            }
            xml.end_element("mergeCells")?;
        }

        xml.write_str(
            "<pageMargins left=\"0.7\" right=\"0.7\" top=\"0.75\" bottom=\"0.75\" header=\"0.3\" footer=\"0.3\"/>",
        )?;
        xml.end_element("worksheet")
    }

    fn dimension_ref(&self) -> String {
        if self.row_count == 0 || self.max_cols == 0 {
            return "A1".to_string();
        }
        range_ref(0, 0, self.row_count - 1, self.max_cols - 1)
    }
}

fn write_selection<W: Write>(xml: &mut XmlWriter<W>, pane: &str, cell: &str) -> Result<()> {
    xml.start_element("selection")?;
    xml.attribute("pane", pane)?;
    xml.attribute("activeCell", cell)?;
    xml.attribute("sqref", cell)?;
    xml.close_empty()
}

fn push_row_start(out: &mut Vec<u8>, row: u32, height: Option<f64>, hidden: bool, collapsed: bool) {
    let mut num = itoa::Buffer::new();
    out.extend_from_slice(b"<row r=\"");
    out.extend_from_slice(num.format(row as u64 + 1).as_bytes());
    out.push(b'"');
    if let Some(height) = height {
        out.extend_from_slice(b" ht=\"");
        push_number(out, height);
        out.extend_from_slice(b"\" customHeight=\"1\"");
    }
    if hidden {
        out.extend_from_slice(b" hidden=\"1\"");
    }
    if collapsed {
        out.extend_from_slice(b" collapsed=\"1\"");
    }
    out.push(b'>');
}

fn push_cell_start(out: &mut Vec<u8>, row: u32, col: u32, style: StyleId) {
    out.extend_from_slice(b"<c r=\"");
    push_cell_ref(out, row, col);
    out.push(b'"');
    if style.get() > 0 {
        let mut num = itoa::Buffer::new();
        out.extend_from_slice(b" s=\"");
        out.extend_from_slice(num.format(style.get()).as_bytes());
        out.push(b'"');
    }
}

fn push_inline_string(out: &mut Vec<u8>, row: u32, col: u32, style: StyleId, text: &str) {
    push_cell_start(out, row, col, style);
    out.extend_from_slice(b" t=\"inlineStr\"><is><t");
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        out.extend_from_slice(b" xml:space=\"preserve\"");
    }
    out.push(b'>');
    push_escaped(out, text);
    out.extend_from_slice(b"</t></is></c>");
}

fn push_number_cell(out: &mut Vec<u8>, row: u32, col: u32, style: StyleId, value: f64) {
    if !value.is_finite() {
        push_typed_cell(out, row, col, style, "e", "#NUM!");
        return;
    }
    push_cell_start(out, row, col, style);
    out.extend_from_slice(b"><v>");
    push_number(out, value);
    out.extend_from_slice(b"</v></c>");
}

fn push_typed_cell(out: &mut Vec<u8>, row: u32, col: u32, style: StyleId, t: &str, value: &str) {
    push_cell_start(out, row, col, style);
    out.extend_from_slice(b" t=\"");
    out.extend_from_slice(t.as_bytes());
    out.extend_from_slice(b"\"><v>");
    push_escaped(out, value);
    out.extend_from_slice(b"</v></c>");
}

fn push_formula(out: &mut Vec<u8>, row: u32, col: u32, style: StyleId, formula: &str) {
    push_cell_start(out, row, col, style);
    out.extend_from_slice(b"><f>");
    push_escaped(out, formula.strip_prefix('=').unwrap_or(formula));
    out.extend_from_slice(b"</f></c>");
}

/// Append one cell, coercing `value` for a column of kind `kind`
///
/// Returns the original text when a date conversion failed and the value
/// was written as a string instead.
fn push_cell(
    out: &mut Vec<u8>,
    row: u32,
    col: u32,
    value: CellValue,
    kind: FormatKind,
    style: StyleId,
) -> Option<String> {
    match value {
        CellValue::Empty => {
            if style.get() > 0 {
                push_cell_start(out, row, col, style);
                out.extend_from_slice(b"/>");
            }
        }
        CellValue::Formula(formula) => push_formula(out, row, col, style, &formula),
        CellValue::String(text) if text.len() > 1 && text.starts_with('=') => {
            push_formula(out, row, col, style, &text)
        }
        CellValue::String(text) => match kind {
            FormatKind::Text => push_inline_string(out, row, col, style, &text),
            FormatKind::Auto => {
                if is_plain_number(&text) {
                    push_cell_start(out, row, col, style);
                    out.extend_from_slice(b"><v>");
                    out.extend_from_slice(text.as_bytes());
                    out.extend_from_slice(b"</v></c>");
                } else {
                    push_inline_string(out, row, col, style, &text);
                }
            }
            FormatKind::Numeric => match text.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => push_number_cell(out, row, col, style, number),
                _ => push_inline_string(out, row, col, style, &text),
            },
            FormatKind::Date | FormatKind::DateTime => match excel_serial(&text) {
                Some(serial) => {
                    let serial = if kind == FormatKind::Date {
                        serial.floor()
                    } else {
                        serial
                    };
                    push_number_cell(out, row, col, style, serial);
                }
                None => {
                    push_inline_string(out, row, col, style, &text);
                    return Some(text);
                }
            },
        },
        CellValue::Int(number) => {
            if kind == FormatKind::Text {
                let mut num = itoa::Buffer::new();
                push_inline_string(out, row, col, style, num.format(number));
            } else {
                let mut num = itoa::Buffer::new();
                push_cell_start(out, row, col, style);
                out.extend_from_slice(b"><v>");
                out.extend_from_slice(num.format(number).as_bytes());
                out.extend_from_slice(b"</v></c>");
            }
        }
        CellValue::Float(number) => {
            if kind == FormatKind::Text && number.is_finite() {
                push_inline_string(out, row, col, style, &number.to_string());
            } else {
                push_number_cell(out, row, col, style, number);
            }
        }
        CellValue::DateTime(serial) => {
            let serial = if kind == FormatKind::Date {
                serial.floor()
            } else {
                serial
            };
            push_number_cell(out, row, col, style, serial);
        }
        CellValue::Bool(flag) => {
            push_typed_cell(out, row, col, style, "b", if flag { "1" } else { "0" })
        }
        CellValue::Error(code) => push_typed_cell(out, row, col, style, "e", &code),
    }
    None
}

/// `-?(0|[1-9][0-9]*)(\.[0-9]+)?`, the strings General columns store as numbers
fn is_plain_number(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits, None),
    };

    let int_ok = match int_part.as_bytes() {
        [b'0'] => true,
        [first, rest @ ..] => {
            (b'1'..=b'9').contains(first) && rest.iter().all(u8::is_ascii_digit)
        }
        [] => false,
    };
    let frac_ok = match frac_part {
        Some(frac) => !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    };
    int_ok && frac_ok
}
