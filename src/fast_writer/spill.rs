//! Bounded-memory row storage
//!
//! Row XML accumulates in memory until the buffer passes its threshold, then
//! moves to an anonymous temporary file. Reading back is chunked so the copy
//! into the package never holds more than one chunk.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::error::{ExcelError, Result};

const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Append-only byte store that spills to disk
#[derive(Debug)]
pub(crate) struct SpillBuffer {
    memory: Vec<u8>,
    file: Option<File>,
    spilled_bytes: u64,
    threshold: usize,
    temp_dir: Option<PathBuf>,
    broken: bool,
}

impl SpillBuffer {
    pub(crate) fn new(threshold: usize, temp_dir: Option<PathBuf>) -> Self {
        SpillBuffer {
            memory: Vec::with_capacity(threshold.min(64 * 1024)),
            file: None,
            spilled_bytes: 0,
            threshold,
            temp_dir,
            broken: false,
        }
    }

    /// Append a complete fragment; spills once the in-memory part exceeds the threshold
    ///
    /// On error nothing of `fragment` is kept, so the stored content is
    /// exactly the fragments that were accepted.
    pub(crate) fn push(&mut self, fragment: &[u8]) -> Result<()> {
        self.check_usable()?;
        let accepted = self.memory.len();
        self.memory.extend_from_slice(fragment);
        if self.memory.len() > self.threshold {
            if let Err(e) = self.spill() {
                self.memory.truncate(accepted);
                return Err(e);
            }
        }
        Ok(())
    }

    fn check_usable(&self) -> Result<()> {
        if self.broken {
            return Err(ExcelError::WriteError(
                "spill file is in an inconsistent state after a failed write".to_string(),
            ));
        }
        Ok(())
    }

    fn spill(&mut self) -> Result<()> {
        if self.file.is_none() {
            let file = match &self.temp_dir {
                Some(dir) => tempfile::tempfile_in(dir),
                None => tempfile::tempfile(),
            }
            .map_err(|e| ExcelError::WriteError(format!("failed to create spill file: {}", e)))?;
            log::debug!("spilling row data to a temporary file");
            self.file = Some(file);
        }

        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.write_all(&self.memory) {
                // Drop whatever part of the chunk reached the file
                let rolled_back = file
                    .set_len(self.spilled_bytes)
                    .and_then(|()| file.seek(SeekFrom::Start(self.spilled_bytes)));
                if rolled_back.is_err() {
                    self.broken = true;
                }
                return Err(ExcelError::WriteError(format!(
                    "failed to spill row data: {}",
                    e
                )));
            }
            self.spilled_bytes += self.memory.len() as u64;
            self.memory.clear();
        }
        Ok(())
    }

    /// Bytes currently held in memory
    pub(crate) fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Bytes moved to the spill file so far
    pub(crate) fn spilled_len(&self) -> u64 {
        self.spilled_bytes
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.memory.is_empty() && self.spilled_bytes == 0
    }

    /// Copy everything stored so far into `out`, spilled bytes first
    ///
    /// The buffer stays usable afterwards: later pushes append after the
    /// existing content and a second copy yields the same prefix.
    pub(crate) fn copy_into<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.check_usable()?;
        if let Some(file) = self.file.as_mut() {
            file.seek(SeekFrom::Start(0))?;
            {
                let mut reader =
                    BufReader::with_capacity(COPY_CHUNK_SIZE, (&mut *file).take(self.spilled_bytes));
                let mut buffer = vec![0u8; COPY_CHUNK_SIZE];
                loop {
                    let bytes_read = reader.read(&mut buffer)?;
                    if bytes_read == 0 {
                        break;
                    }
                    out.write_all(&buffer[..bytes_read])?;
                }
            }
            file.seek(SeekFrom::End(0))?;
        }

        out.write_all(&self.memory)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stays_in_memory_below_threshold() {
        let mut buffer = SpillBuffer::new(1024, None);
        buffer.push(b"<row r=\"1\"/>").unwrap();
        assert_eq!(buffer.spilled_len(), 0);
        assert_eq!(buffer.memory_len(), 12);
    }

    #[test]
    fn test_spills_and_copies_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = SpillBuffer::new(16, Some(dir.path().to_path_buf()));

        let mut expected = Vec::new();
        for i in 0..100 {
            let fragment = format!("<row r=\"{}\"/>", i + 1);
            buffer.push(fragment.as_bytes()).unwrap();
            expected.extend_from_slice(fragment.as_bytes());
            assert!(buffer.memory_len() <= 16);
        }
        assert!(buffer.spilled_len() > 0);

        let mut first = Vec::new();
        buffer.copy_into(&mut first).unwrap();
        assert_eq!(first, expected);

        // Copy is repeatable and appending continues after the existing data
        buffer.push(b"<row r=\"101\"/>").unwrap();
        expected.extend_from_slice(b"<row r=\"101\"/>");
        let mut second = Vec::new();
        buffer.copy_into(&mut second).unwrap();
        assert_eq!(second, expected);
    }

    #[test]
    fn test_missing_temp_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let mut buffer = SpillBuffer::new(0, Some(missing));

        let err = buffer.push(b"<row/>").unwrap_err();
        assert!(matches!(err, ExcelError::WriteError(_)));
    }

    #[test]
    fn test_failed_spill_discards_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let mut buffer = SpillBuffer::new(8, Some(missing));

        buffer.push(b"<row/>").unwrap();
        assert!(buffer.push(b"<row r=\"2\"/>").is_err());
        assert!(buffer.push(b"<row r=\"2\"/>").is_err());
        assert_eq!(buffer.memory_len(), 6);
        assert_eq!(buffer.spilled_len(), 0);

        let mut out = Vec::new();
        buffer.copy_into(&mut out).unwrap();
        assert_eq!(out, b"<row/>");
    }
}
