//! Error types for workbook composition and package output

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ExcelError>;

/// Errors raised while building or writing a workbook
#[derive(Debug, Error)]
pub enum ExcelError {
    /// Underlying I/O failure (temporary files, destination file, output stream)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP container could not be assembled
    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Staged package could not be moved onto the destination path
    #[error("failed to persist package: {0}")]
    PersistError(#[from] tempfile::PersistError),

    /// Generic write failure with context
    #[error("write error: {0}")]
    WriteError(String),

    /// Operation not allowed in the current workbook state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Malformed cell reference such as `"1A"` or `""`
    #[error("invalid cell address: {0}")]
    InvalidAddress(String),

    /// Range whose start lies after its end
    #[error("invalid range: rows {start_row}..={end_row}, columns {start_col}..={end_col}")]
    InvalidRange {
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExcelError::InvalidRange {
            start_row: 3,
            start_col: 0,
            end_row: 1,
            end_col: 2,
        };
        assert_eq!(
            err.to_string(),
            "invalid range: rows 3..=1, columns 0..=2"
        );

        let err: ExcelError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ExcelError::IoError(_)));
    }
}
