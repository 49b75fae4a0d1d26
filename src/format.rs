//! Number format translation
//!
//! Maps semantic column types (`"string"`, `"integer"`, `"datetime"`, ...) and
//! literal format patterns to OOXML number-format codes, and classifies each
//! code so cell values can be coerced at write time.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// First id available for custom number formats
pub const FIRST_CUSTOM_FORMAT_ID: u32 = 164;

const DOLLAR_FORMAT: &str = "[$$-1009]#,##0.00;[RED]-[$$-1009]#,##0.00";
const EURO_FORMAT: &str = "#,##0.00 [$€-407];[RED]-#,##0.00 [$€-407]";

/// Built-in codes every spreadsheet application knows by id
const BUILTIN_FORMATS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

/// How values written under a format are coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FormatKind {
    /// General format: numbers and numeric-looking strings become numbers
    Auto,
    /// Text format: everything is written as a string
    Text,
    /// Numeric format
    Numeric,
    /// Date only, the time-of-day fraction is dropped
    Date,
    /// Date and/or time of day
    DateTime,
}

/// A resolved number format
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumberFormat {
    code: String,
    builtin_id: Option<u32>,
    kind: FormatKind,
}

impl NumberFormat {
    /// The General format (built-in id 0)
    pub fn general() -> Self {
        NumberFormat {
            code: "General".to_string(),
            builtin_id: Some(0),
            kind: FormatKind::Auto,
        }
    }

    /// Build a format from a literal code
    pub fn from_code(code: &str) -> Self {
        let builtin_id = builtin_id(code);
        let kind = match builtin_id {
            Some(0) => FormatKind::Auto,
            _ => classify(code),
        };
        NumberFormat {
            code: code.to_string(),
            builtin_id,
            kind,
        }
    }

    /// The format code written to `styles.xml`
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Built-in id, `None` for custom codes
    pub fn builtin_id(&self) -> Option<u32> {
        self.builtin_id
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin_id.is_some()
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat::general()
    }
}

/// Resolve a semantic type token or a literal pattern to a number format
///
/// Known names (case-insensitive) win over pattern interpretation. Strings that
/// look like a format pattern are passed through verbatim without validation.
/// Anything else falls back to General.
///
/// # Examples
///
/// ```
/// use xlsxstream::format::{resolve, FormatKind};
///
/// let fmt = resolve("datetime");
/// assert_eq!(fmt.code(), "YYYY-MM-DD HH:MM:SS");
/// assert_eq!(fmt.kind(), FormatKind::DateTime);
///
/// let fmt = resolve("0.00%");
/// assert_eq!(fmt.builtin_id(), Some(10));
/// ```
pub fn resolve(token: &str) -> NumberFormat {
    let trimmed = token.trim();
    let named = match trimmed.to_ascii_lowercase().as_str() {
        "" | "general" => return NumberFormat::general(),
        "string" | "@" => "@",
        "integer" | "number" => "0",
        "date" => "YYYY-MM-DD",
        "datetime" => "YYYY-MM-DD HH:MM:SS",
        "time" => "HH:MM:SS",
        "money" | "dollar" => DOLLAR_FORMAT,
        "euro" => EURO_FORMAT,
        "price" => "#,##0.00",
        _ => {
            if looks_like_pattern(trimmed) {
                return NumberFormat::from_code(trimmed);
            }
            log::debug!("unrecognized column type {trimmed:?}, using General");
            return NumberFormat::general();
        }
    };
    NumberFormat::from_code(named)
}

fn builtin_id(code: &str) -> Option<u32> {
    BUILTIN_FORMATS
        .iter()
        .find(|(_, builtin)| *builtin == code)
        .map(|(id, _)| *id)
}

fn looks_like_pattern(token: &str) -> bool {
    token.chars().any(|c| {
        matches!(c, '0' | '#' | '%' | '.' | 'E' | '?' | '@')
            || matches!(c.to_ascii_uppercase(), 'Y' | 'M' | 'D' | 'H')
    })
}

/// Strip quoted literals, bracketed sections (colors, locales, elapsed units)
/// and backslash escapes, leaving only the significant format characters.
fn significant_chars(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for inner in chars.by_ref() {
                    if inner == '"' {
                        break;
                    }
                }
            }
            '[' => {
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                }
            }
            '\\' => {
                chars.next();
            }
            _ => out.push(c.to_ascii_uppercase()),
        }
    }
    out
}

fn classify(code: &str) -> FormatKind {
    if code.trim() == "@" {
        return FormatKind::Text;
    }

    let sig = significant_chars(code);

    // Collapse repeated letters so "HH:MM" and "h:mm" look alike
    let mut collapsed = String::with_capacity(sig.len());
    let mut prev = None;
    for c in sig.chars() {
        if Some(c) != prev || !c.is_ascii_alphabetic() {
            collapsed.push(c);
        }
        prev = Some(c);
    }
    let has_time = collapsed.contains("H:M") || collapsed.contains("M:S");
    if has_time {
        return FormatKind::DateTime;
    }
    if sig.contains(['Y', 'D', 'M', 'Q']) {
        return FormatKind::Date;
    }
    if sig.contains(['0', '#', '%', '?', 'E']) {
        return FormatKind::Numeric;
    }
    if sig.contains('@') {
        return FormatKind::Text;
    }
    FormatKind::Auto
}

/// Days between the 1900-system epoch and a date, honoring the phantom
/// 1900-02-29 that spreadsheet applications keep for compatibility.
fn date_serial(date: NaiveDate) -> Option<f64> {
    let leap_bug_start = NaiveDate::from_ymd_opt(1900, 3, 1)?;
    let epoch = if date >= leap_bug_start {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    };
    let days = (date - epoch).num_days();
    if days < 1 {
        return None;
    }
    Some(days as f64)
}

fn time_fraction(time: NaiveTime) -> f64 {
    let seconds = time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9;
    seconds / 86_400.0
}

/// Serial for a calendar date, `None` before 1900-01-01
pub fn serial_from_date(date: NaiveDate) -> Option<f64> {
    date_serial(date)
}

/// Serial for a date and time, `None` before 1900-01-01
pub fn serial_from_datetime(datetime: NaiveDateTime) -> Option<f64> {
    Some(date_serial(datetime.date())? + time_fraction(datetime.time()))
}

/// Convert an ISO-like date/time string to a spreadsheet serial
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` (or with a `T` separator and
/// optional fractional seconds) and a bare `HH:MM:SS`. Returns `None` when the
/// input does not parse or lies before the 1900 epoch.
///
/// # Examples
///
/// ```
/// use xlsxstream::format::excel_serial;
///
/// assert_eq!(excel_serial("2018-12-31"), Some(43465.0));
/// assert_eq!(excel_serial("12:00:00"), Some(0.5));
/// assert_eq!(excel_serial("not a date"), None);
/// ```
pub fn excel_serial(input: &str) -> Option<f64> {
    let input = input.trim();

    for pattern in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(input, pattern) {
            return serial_from_datetime(datetime);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return serial_from_date(date);
    }

    for pattern in ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(input, pattern) {
            return Some(time_fraction(time));
        }
    }

    None
}
