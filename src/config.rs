//! Workbook configuration

use std::path::{Path, PathBuf};

/// Default number of row bytes kept in memory per sheet before spilling to disk
pub const DEFAULT_SPILL_THRESHOLD: usize = 256 * 1024;

/// Default deflate level for package entries
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Settings threaded through a [`Workbook`](crate::Workbook) and its sheets
///
/// # Examples
///
/// ```
/// use xlsxstream::{Workbook, WorkbookConfig};
///
/// let config = WorkbookConfig::new()
///     .with_spill_threshold(64 * 1024)
///     .with_compression_level(1)
///     .with_strict_merges(true);
/// let workbook = Workbook::with_config(config);
/// assert_eq!(workbook.config().compression_level(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorkbookConfig {
    temp_dir: Option<PathBuf>,
    spill_threshold: usize,
    compression_level: u32,
    strict_merges: bool,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        WorkbookConfig {
            temp_dir: None,
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            strict_merges: false,
        }
    }
}

impl WorkbookConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory for spill files; the system temp directory when unset
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Buffered row bytes per sheet before the buffer is moved to disk
    ///
    /// A threshold of 0 spills after every row.
    pub fn with_spill_threshold(mut self, bytes: usize) -> Self {
        self.spill_threshold = bytes;
        self
    }

    /// Deflate level (0-9), clamped
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Reject merge ranges whose start lies after their end instead of normalizing them
    pub fn with_strict_merges(mut self, strict: bool) -> Self {
        self.strict_merges = strict;
        self
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    pub(crate) fn set_temp_dir(&mut self, dir: PathBuf) {
        self.temp_dir = Some(dir);
    }

    pub fn spill_threshold(&self) -> usize {
        self.spill_threshold
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    pub fn strict_merges(&self) -> bool {
        self.strict_merges
    }
}
