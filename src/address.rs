//! A1-style cell and range references
//!
//! Rows and columns are zero-based internally. Columns use bijective base-26
//! letters (0 -> A, 25 -> Z, 26 -> AA) and textual rows start at 1.

use crate::error::{ExcelError, Result};

/// Convert column index to Excel letters (0 -> A, 25 -> Z, 26 -> AA)
pub fn column_name(col: u32) -> String {
    let mut out = Vec::with_capacity(4);
    push_column_name(&mut out, col);
    String::from_utf8_lossy(&out).into_owned()
}

fn push_column_name(out: &mut Vec<u8>, col: u32) {
    let mut letters = [0u8; 8];
    let mut pos = letters.len();
    let mut n = col as u64 + 1;

    while n > 0 {
        n -= 1;
        pos -= 1;
        letters[pos] = b'A' + (n % 26) as u8;
        n /= 26;
    }

    out.extend_from_slice(&letters[pos..]);
}

/// Append the reference for `(row, col)` to `out` without intermediate allocation
pub(crate) fn push_cell_ref(out: &mut Vec<u8>, row: u32, col: u32) {
    push_column_name(out, col);
    let mut num = itoa::Buffer::new();
    out.extend_from_slice(num.format(row as u64 + 1).as_bytes());
}

/// Cell reference such as `"A1"`
pub fn cell_ref(row: u32, col: u32) -> String {
    let mut out = Vec::with_capacity(12);
    push_cell_ref(&mut out, row, col);
    String::from_utf8_lossy(&out).into_owned()
}

/// Range reference such as `"A1:B2"`
pub fn range_ref(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> String {
    format!(
        "{}:{}",
        cell_ref(start_row, start_col),
        cell_ref(end_row, end_col)
    )
}

/// Absolute range reference such as `"$A$1:$B$2"`, used by defined names
pub fn absolute_range_ref(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> String {
    format!(
        "${}${}:${}${}",
        column_name(start_col),
        start_row as u64 + 1,
        column_name(end_col),
        end_row as u64 + 1
    )
}

/// Parse `"B7"` (or `"$B$7"`) back to zero-based `(row, col)`
pub fn parse_cell_ref(reference: &str) -> Result<(u32, u32)> {
    let invalid = || ExcelError::InvalidAddress(reference.to_string());

    let bytes = reference.as_bytes();
    let mut idx = 0;
    if bytes.first() == Some(&b'$') {
        idx += 1;
    }

    let letters_start = idx;
    let mut col: u64 = 0;
    while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
        col = col * 26 + (bytes[idx].to_ascii_uppercase() - b'A') as u64 + 1;
        if col > u32::MAX as u64 {
            return Err(invalid());
        }
        idx += 1;
    }
    if idx == letters_start {
        return Err(invalid());
    }

    if bytes.get(idx) == Some(&b'$') {
        idx += 1;
    }

    let digits = &reference[idx..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let row: u64 = digits.parse().map_err(|_| invalid())?;
    if row == 0 || row > u32::MAX as u64 {
        return Err(invalid());
    }

    Ok(((row - 1) as u32, (col - 1) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
        assert_eq!(column_name(16383), "XFD");
    }

    #[test]
    fn test_cell_and_range_refs() {
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(99, 27), "AB100");
        assert_eq!(range_ref(0, 0, 0, 4), "A1:E1");
        assert_eq!(absolute_range_ref(0, 0, 1000, 2), "$A$1:$C$1001");
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1").unwrap(), (0, 0));
        assert_eq!(parse_cell_ref("$AB$100").unwrap(), (99, 27));
        assert_eq!(parse_cell_ref("xfd3").unwrap(), (2, 16383));

        for bad in ["", "A", "1", "A0", "1A", "A1B", "A-1"] {
            assert!(
                matches!(parse_cell_ref(bad), Err(ExcelError::InvalidAddress(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_round_trip_grid_edges() {
        for col in [0u32, 25, 26, 51, 52, 675, 676, 699] {
            for row in [0u32, 1, 9, 9999] {
                assert_eq!(parse_cell_ref(&cell_ref(row, col)).unwrap(), (row, col));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_cell_ref_round_trip(row in 0u32..10_000, col in 0u32..700) {
            let reference = cell_ref(row, col);
            prop_assert_eq!(parse_cell_ref(&reference).unwrap(), (row, col));
        }
    }
}
