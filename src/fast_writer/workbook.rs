//! Workbook assembly: sheets, shared styles and document metadata

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};

use super::styles::StyleRegistry;
use super::worksheet::SheetStream;
use crate::config::WorkbookConfig;
use crate::error::{ExcelError, Result};
use crate::types::{CellValue, HeaderOptions, RowOptions, SheetVisibility, Warning};

/// Longest sheet name spreadsheet applications accept
pub const MAX_SHEET_NAME_LEN: usize = 31;

const INVALID_SHEET_NAME_CHARS: &[char] = &['\\', '/', '?', '*', ':', '[', ']'];

/// Position of a sheet in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(usize);

impl SheetId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Document properties written to `docProps/core.xml` and `docProps/app.xml`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub company: Option<String>,
    pub keywords: IndexSet<String>,
    pub description: Option<String>,
}

type WarningHandler = Box<dyn FnMut(&Warning) + Send>;

/// In-memory model of an `.xlsx` package under construction
///
/// Sheets are created on first reference and keep insertion order as tab
/// order. Rows go straight to each sheet's bounded buffer; only styles and
/// per-sheet bookkeeping stay in memory.
///
/// Once a package has been written the workbook is finalized: every mutating
/// call returns [`ExcelError::InvalidState`], while writing again produces the
/// same bytes.
///
/// # Examples
///
/// ```no_run
/// use xlsxstream::{HeaderOptions, RowOptions, Workbook};
///
/// let mut workbook = Workbook::new();
/// workbook.set_title("Quarterly report")?;
/// workbook.write_sheet_header(
///     "Sales",
///     [("Region", "string"), ("Revenue", "money"), ("Closed", "date")],
///     &HeaderOptions::new().with_auto_filter(true).with_freeze(1, 0),
/// )?;
/// workbook.write_sheet_row("Sales", ["North", "1250.5", "2024-03-31"], &RowOptions::default())?;
/// workbook.write_to_file("report.xlsx")?;
/// # Ok::<(), xlsxstream::ExcelError>(())
/// ```
pub struct Workbook {
    config: WorkbookConfig,
    sheets: IndexMap<String, SheetStream>,
    current_sheet: Option<usize>,
    styles: StyleRegistry,
    properties: DocumentProperties,
    tab_ratio: Option<u32>,
    right_to_left: bool,
    created: DateTime<Utc>,
    finalized: bool,
    warning_handler: Option<WarningHandler>,
}

impl fmt::Debug for Workbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workbook")
            .field("config", &self.config)
            .field("sheets", &self.sheets.keys().collect::<Vec<_>>())
            .field("styles", &self.styles.len())
            .field("properties", &self.properties)
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// Create an empty workbook with default settings
    pub fn new() -> Self {
        Self::with_config(WorkbookConfig::default())
    }

    pub fn with_config(config: WorkbookConfig) -> Self {
        Workbook {
            config,
            sheets: IndexMap::new(),
            current_sheet: None,
            styles: StyleRegistry::new(),
            properties: DocumentProperties::default(),
            tab_ratio: None,
            right_to_left: false,
            created: Utc::now(),
            finalized: false,
            warning_handler: None,
        }
    }

    pub fn config(&self) -> &WorkbookConfig {
        &self.config
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn properties(&self) -> &DocumentProperties {
        &self.properties
    }

    pub fn tab_ratio(&self) -> Option<u32> {
        self.tab_ratio
    }

    pub fn right_to_left(&self) -> bool {
        self.right_to_left
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Whether a package has been written
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.finalized = true;
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.finalized {
            return Err(ExcelError::InvalidState(
                "workbook has already been written".to_string(),
            ));
        }
        Ok(())
    }

    /// Receive a [`Warning`] for every lenient fallback, in addition to the log record
    pub fn set_warning_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&Warning) + Send + 'static,
    {
        self.warning_handler = Some(Box::new(handler));
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        self.properties.title = Some(title.into());
        Ok(())
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        self.properties.subject = Some(subject.into());
        Ok(())
    }

    pub fn set_author(&mut self, author: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        self.properties.author = Some(author.into());
        Ok(())
    }

    pub fn set_company(&mut self, company: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        self.properties.company = Some(company.into());
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        self.properties.description = Some(description.into());
        Ok(())
    }

    /// Add keywords; duplicates are dropped and first-seen order is kept
    pub fn set_keywords<I, S>(&mut self, keywords: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_mutable()?;
        self.properties
            .keywords
            .extend(keywords.into_iter().map(Into::into));
        Ok(())
    }

    /// Relative width of the sheet-tab bar, clamped to 0..=1000
    pub fn set_tab_ratio(&mut self, ratio: i64) -> Result<()> {
        self.ensure_mutable()?;
        self.tab_ratio = Some(ratio.clamp(0, 1000) as u32);
        Ok(())
    }

    pub fn set_right_to_left(&mut self, rtl: bool) -> Result<()> {
        self.ensure_mutable()?;
        self.right_to_left = rtl;
        Ok(())
    }

    /// Directory for spill files of sheets created from now on
    pub fn set_temp_dir(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        self.ensure_mutable()?;
        self.config.set_temp_dir(dir.into());
        Ok(())
    }

    /// Override the creation timestamp captured at construction
    pub fn set_created(&mut self, created: DateTime<Utc>) -> Result<()> {
        self.ensure_mutable()?;
        self.created = created;
        Ok(())
    }

    /// Create a sheet, or return the existing one registered under `name`
    ///
    /// A blank name refers to the most recently used sheet, or creates
    /// `Sheet1` when there is none yet.
    pub fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        self.ensure_mutable()?;
        Ok(SheetId(self.sheet_index(name)))
    }

    fn sheet_index(&mut self, name: &str) -> usize {
        let index = match (name.trim().is_empty(), self.current_sheet) {
            (true, Some(current)) => current,
            _ => match self.sheets.get_index_of(name) {
                Some(index) => index,
                None => self.insert_sheet(name),
            },
        };
        self.current_sheet = Some(index);
        index
    }

    fn insert_sheet(&mut self, name: &str) -> usize {
        let sheet_name = self.unique_sheet_name(name);
        if sheet_name != name {
            log::debug!("sheet {name:?} stored as {sheet_name:?}");
        }
        // Blank requests are registered under the generated name
        let key = if name.trim().is_empty() {
            sheet_name.clone()
        } else {
            name.to_string()
        };
        let mut sheet = SheetStream::new(sheet_name, &self.config);
        sheet.set_right_to_left(self.right_to_left);
        self.sheets.insert_full(key, sheet).0
    }

    fn unique_sheet_name(&self, requested: &str) -> String {
        let base = sanitize_sheet_name(requested, self.sheets.len() + 1);
        let taken = |candidate: &str| {
            let lower = candidate.to_lowercase();
            self.sheets
                .values()
                .any(|sheet| sheet.name().to_lowercase() == lower)
        };

        if !taken(&base) {
            return base;
        }
        let mut counter = 2;
        loop {
            let suffix = format!(" ({counter})");
            let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
            let candidate: String = base.chars().take(keep).collect::<String>() + &suffix;
            if !taken(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Final names of all sheets in tab order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.values().map(|sheet| sheet.name()).collect()
    }

    /// Look up a sheet by the name it was first referenced with
    pub fn sheet(&self, name: &str) -> Option<&SheetStream> {
        self.sheets.get(name)
    }

    pub(crate) fn sheets_mut(&mut self) -> impl Iterator<Item = &mut SheetStream> {
        self.sheets.values_mut()
    }

    pub(crate) fn sheets(&self) -> impl Iterator<Item = &SheetStream> {
        self.sheets.values()
    }

    /// Rows written to `name` so far (header included), 0 for unknown sheets
    pub fn count_sheet_rows(&self, name: &str) -> u32 {
        self.sheets.get(name).map_or(0, SheetStream::row_count)
    }

    /// Declare column formats of `sheet` and write its header row
    pub fn write_sheet_header<I, K, V>(
        &mut self,
        sheet: &str,
        columns: I,
        options: &HeaderOptions,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.ensure_mutable()?;
        let index = self.sheet_index(sheet);
        let result = self.sheets[index].write_header(columns, options, &mut self.styles);
        self.dispatch_warnings(index);
        result
    }

    /// Append one row to `sheet`
    pub fn write_sheet_row<I>(&mut self, sheet: &str, values: I, options: &RowOptions) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<CellValue>,
    {
        self.ensure_mutable()?;
        let index = self.sheet_index(sheet);
        let result = self.sheets[index].write_row(values, options, &mut self.styles);
        self.dispatch_warnings(index);
        result
    }

    /// Write an optional header followed by all `rows`
    pub fn write_sheet<R, I>(
        &mut self,
        sheet: &str,
        rows: R,
        header: Option<&[(&str, &str)]>,
    ) -> Result<()>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator,
        I::Item: Into<CellValue>,
    {
        self.ensure_mutable()?;
        if let Some(columns) = header {
            self.write_sheet_header(sheet, columns.iter().copied(), &HeaderOptions::default())?;
        }
        for row in rows {
            self.write_sheet_row(sheet, row, &RowOptions::default())?;
        }
        Ok(())
    }

    /// Merge the inclusive range `(start_row, start_col)..=(end_row, end_col)` of `sheet`
    pub fn mark_merged(
        &mut self,
        sheet: &str,
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    ) -> Result<()> {
        self.ensure_mutable()?;
        let index = self.sheet_index(sheet);
        let result = self.sheets[index].mark_merged(start_row, start_col, end_row, end_col);
        self.dispatch_warnings(index);
        result
    }

    pub fn set_column_width(&mut self, sheet: &str, col: u32, width: f64) -> Result<()> {
        self.ensure_mutable()?;
        let index = self.sheet_index(sheet);
        self.sheets[index].set_column_width(col, width);
        Ok(())
    }

    pub fn set_sheet_visibility(&mut self, sheet: &str, visibility: SheetVisibility) -> Result<()> {
        self.ensure_mutable()?;
        let index = self.sheet_index(sheet);
        self.sheets[index].set_visibility(visibility);
        Ok(())
    }

    fn dispatch_warnings(&mut self, index: usize) {
        let warnings = self.sheets[index].take_warnings();
        if let Some(handler) = self.warning_handler.as_mut() {
            for warning in &warnings {
                handler(warning);
            }
        }
    }

    /// Index of the tab shown when the file opens: the first visible sheet
    pub(crate) fn active_tab(&self) -> usize {
        self.sheets
            .values()
            .position(|sheet| sheet.visibility().is_visible())
            .unwrap_or(0)
    }

    /// Apply workbook-level view settings to every sheet before serialization
    pub(crate) fn prepare_sheet_views(&mut self) {
        let active = self.active_tab();
        let rtl = self.right_to_left;
        for (index, sheet) in self.sheets.values_mut().enumerate() {
            sheet.set_tab_selected(index == active);
            sheet.set_right_to_left(rtl);
        }
    }
}

/// Make `requested` acceptable as a sheet name
///
/// Forbidden characters become spaces, surrounding whitespace and single
/// quotes are removed and the result is cut to 31 characters. An empty
/// result becomes `Sheet{position}`.
pub fn sanitize_sheet_name(requested: &str, position: usize) -> String {
    let replaced: String = requested
        .chars()
        .map(|c| {
            if INVALID_SHEET_NAME_CHARS.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim().trim_matches('\'').trim();
    let truncated: String = trimmed.chars().take(MAX_SHEET_NAME_LEN).collect();
    let truncated = truncated.trim_end();

    if truncated.is_empty() {
        format!("Sheet{position}")
    } else {
        truncated.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Q1/Q2: [draft]", 1), "Q1 Q2   draft");
        assert_eq!(sanitize_sheet_name("'quoted'", 1), "quoted");
        assert_eq!(sanitize_sheet_name("  ", 3), "Sheet3");
        assert_eq!(sanitize_sheet_name("???", 2), "Sheet2");

        let long = "x".repeat(40);
        assert_eq!(sanitize_sheet_name(&long, 1).chars().count(), 31);
        let unicode = "é".repeat(40);
        assert_eq!(sanitize_sheet_name(&unicode, 1).chars().count(), 31);
    }

    #[test]
    fn test_sheet_names_are_unique() {
        let mut workbook = Workbook::new();
        let first = workbook.add_sheet("Data").unwrap();
        let second = workbook.add_sheet("data").unwrap();
        let third = workbook.add_sheet("Data:").unwrap();
        let again = workbook.add_sheet("Data").unwrap();

        assert_eq!(first, again);
        assert_eq!(second.index(), 1);
        assert_eq!(third.index(), 2);
        assert_eq!(workbook.sheet_names(), vec!["Data", "data (2)", "Data (3)"]);

        let long = "L".repeat(31);
        workbook.add_sheet(&long).unwrap();
        workbook.add_sheet(&format!("{long}!")).unwrap();
        assert_eq!(workbook.sheet_names()[4], format!("{} (2)", "L".repeat(27)));
    }

    #[test]
    fn test_count_sheet_rows() {
        let mut workbook = Workbook::new();
        workbook
            .write_sheet_header("S", [("a", "string")], &HeaderOptions::default())
            .unwrap();
        for i in 0..5 {
            workbook
                .write_sheet_row("S", [i], &RowOptions::default())
                .unwrap();
        }
        assert_eq!(workbook.count_sheet_rows("S"), 6);

        workbook
            .write_sheet_header(
                "T",
                [("a", "string")],
                &HeaderOptions::new().with_suppress_row(true),
            )
            .unwrap();
        workbook
            .write_sheet("T", vec![vec!["x"], vec!["y"]], None)
            .unwrap();
        assert_eq!(workbook.count_sheet_rows("T"), 2);
        assert_eq!(workbook.count_sheet_rows("missing"), 0);
    }

    #[test]
    fn test_metadata_setters() {
        let mut workbook = Workbook::new();
        workbook.set_tab_ratio(5000).unwrap();
        assert_eq!(workbook.tab_ratio(), Some(1000));
        workbook.set_tab_ratio(-4).unwrap();
        assert_eq!(workbook.tab_ratio(), Some(0));

        workbook.set_keywords(["a", "b"]).unwrap();
        workbook.set_keywords(["b", "c"]).unwrap();
        let keywords: Vec<&str> = workbook
            .properties()
            .keywords
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(keywords, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_finalized_workbook_rejects_mutation() {
        let mut workbook = Workbook::new();
        workbook.mark_finalized();

        assert!(matches!(
            workbook.set_title("late"),
            Err(ExcelError::InvalidState(_))
        ));
        assert!(matches!(
            workbook.write_sheet_row("S", ["x"], &RowOptions::default()),
            Err(ExcelError::InvalidState(_))
        ));
        assert!(workbook.sheet_names().is_empty());
    }

    #[test]
    fn test_warning_handler_receives_fallbacks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut workbook = Workbook::new();
        workbook.set_warning_handler(move |warning| sink.lock().unwrap().push(warning.clone()));
        workbook
            .write_sheet_header("S", [("when", "datetime")], &HeaderOptions::default())
            .unwrap();
        workbook
            .write_sheet_row("S", ["tomorrow"], &RowOptions::default())
            .unwrap();
        workbook.mark_merged("S", 2, 0, 0, 0).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(&seen[0], Warning::DateConversion { row: 1, col: 0, .. }));
        assert!(matches!(&seen[1], Warning::NormalizedMerge { .. }));
    }

    #[test]
    fn test_blank_sheet_name_uses_current_sheet() {
        let mut workbook = Workbook::new();
        workbook
            .write_sheet_row("", ["first"], &RowOptions::default())
            .unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Sheet1"]);

        workbook
            .write_sheet_row("Sheet1", ["second"], &RowOptions::default())
            .unwrap();
        workbook
            .write_sheet_header("Other", [("a", "string")], &HeaderOptions::default())
            .unwrap();
        workbook
            .write_sheet_row("", Vec::<CellValue>::new(), &RowOptions::default())
            .unwrap();
        workbook.add_sheet("  ").unwrap();

        assert_eq!(workbook.sheet_names(), vec!["Sheet1", "Other"]);
        assert_eq!(workbook.count_sheet_rows("Sheet1"), 2);
        assert_eq!(workbook.count_sheet_rows("Other"), 2);
    }

    #[test]
    fn test_active_tab_skips_hidden_sheets() {
        let mut workbook = Workbook::new();
        workbook.add_sheet("Hidden").unwrap();
        workbook.add_sheet("Shown").unwrap();
        workbook
            .set_sheet_visibility("Hidden", SheetVisibility::Hidden)
            .unwrap();
        assert_eq!(workbook.active_tab(), 1);
    }
}
