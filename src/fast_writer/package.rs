//! ZIP packaging of a [`Workbook`]
//!
//! Every output path runs through the same assembly routine, and entry
//! timestamps are fixed, so a file, a buffer and a stream written from the
//! same workbook state hold identical bytes.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use super::parts::{
    sheet_part_name, write_app_props, write_content_types, write_core_props, write_root_rels,
    write_workbook_rels, write_workbook_xml,
};
use super::workbook::Workbook;
use crate::error::{ExcelError, Result};

const STAGING_BUFFER_SIZE: usize = 64 * 1024;

/// Entry options for every part of the package
fn file_options(level: u32) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .last_modified_time(zip::DateTime::default())
        .large_file(true); // Enable ZIP64 for sheets > 4GB

    if level == 0 {
        options.compression_method(CompressionMethod::Stored)
    } else {
        options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(level as i64))
    }
}

/// Write all parts of `workbook` into a ZIP container on `sink`
///
/// A package needs at least one worksheet.
fn assemble<W: Write + Seek>(workbook: &mut Workbook, sink: W) -> Result<W> {
    let sheet_count = workbook.sheet_names().len();
    if sheet_count == 0 {
        return Err(ExcelError::InvalidState("no worksheets defined".to_string()));
    }

    workbook.prepare_sheet_views();
    let options = file_options(workbook.config().compression_level());
    let mut zip = ZipWriter::new(sink);

    zip.start_file("[Content_Types].xml", options)?;
    write_content_types(&mut zip, sheet_count)?;

    zip.start_file("_rels/.rels", options)?;
    write_root_rels(&mut zip)?;

    zip.start_file("docProps/core.xml", options)?;
    write_core_props(&mut zip, workbook.properties(), workbook.created())?;

    zip.start_file("docProps/app.xml", options)?;
    write_app_props(&mut zip, workbook.properties())?;

    zip.start_file("xl/workbook.xml", options)?;
    write_workbook_xml(&mut zip, workbook)?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    write_workbook_rels(&mut zip, sheet_count)?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(&workbook.styles().export_styles_part())?;

    for (i, sheet) in workbook.sheets_mut().enumerate() {
        zip.start_file(sheet_part_name(i + 1), options)?;
        sheet.finalize_into(&mut zip).map_err(|e| {
            ExcelError::WriteError(format!("failed to write sheet '{}': {}", sheet.name(), e))
        })?;
    }

    Ok(zip.finish()?)
}

impl Workbook {
    /// Serialize the package into memory
    pub fn write_to_vec(&mut self) -> Result<Vec<u8>> {
        let cursor = assemble(self, Cursor::new(Vec::new()))?;
        self.mark_finalized();
        Ok(cursor.into_inner())
    }

    /// Serialize the package to `path`
    ///
    /// The package is staged in a temporary file next to the destination and
    /// renamed over it only once complete. On failure the destination keeps
    /// its previous content and the error is logged and returned.
    pub fn write_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        match self.write_file_staged(path) {
            Ok(()) => {
                self.mark_finalized();
                log::debug!("wrote workbook to {}", path.display());
                Ok(())
            }
            Err(e) => {
                log::error!("failed to write workbook to {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    fn write_file_staged(&mut self, path: &Path) -> Result<()> {
        if path.exists() {
            OpenOptions::new().append(true).open(path).map_err(|e| {
                ExcelError::WriteError(format!(
                    "destination {} is not writable: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let staging = tempfile::Builder::new()
            .prefix(".xlsxstream-")
            .suffix(".tmp")
            .tempfile_in(parent)?;

        let writer = assemble(self, BufWriter::with_capacity(STAGING_BUFFER_SIZE, staging))?;
        let staging = writer.into_inner().map_err(|e| e.into_error())?;
        staging.as_file().sync_all()?;
        staging.persist(path)?;
        Ok(())
    }

    /// Serialize the package to an arbitrary byte sink
    ///
    /// ZIP assembly needs to seek, so the package is staged in an anonymous
    /// temporary file and then copied to `out`.
    pub fn write_to_writer<W: Write>(&mut self, mut out: W) -> Result<()> {
        let result = self.write_stream_staged(&mut out);
        match &result {
            Ok(()) => self.mark_finalized(),
            Err(e) => log::error!("failed to write workbook to stream: {}", e),
        }
        result
    }

    fn write_stream_staged<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let staging = match self.config().temp_dir() {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };

        let writer = assemble(self, BufWriter::with_capacity(STAGING_BUFFER_SIZE, staging))?;
        let mut staging: File = writer.into_inner().map_err(|e| e.into_error())?;
        staging.seek(SeekFrom::Start(0))?;

        let mut buffer = vec![0u8; STAGING_BUFFER_SIZE];
        loop {
            let bytes_read = staging.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            out.write_all(&buffer[..bytes_read])?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HeaderOptions, RowOptions};
    use zip::ZipArchive;

    fn sample() -> Workbook {
        let mut workbook = Workbook::new();
        workbook
            .write_sheet_header("Sheet1", [("a", "string"), ("b", "integer")], &HeaderOptions::default())
            .unwrap();
        workbook
            .write_sheet_row("Sheet1", ["x", "5"], &RowOptions::default())
            .unwrap();
        workbook
    }

    #[test]
    fn test_part_order() {
        let bytes = sample().write_to_vec().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let ordered: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            ordered,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "docProps/app.xml",
                "xl/workbook.xml",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/worksheets/sheet1.xml",
            ]
        );
    }

    #[test]
    fn test_outputs_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut workbook = sample();
        let in_memory = workbook.write_to_vec().unwrap();
        workbook.write_to_file(&path).unwrap();
        let mut streamed = Vec::new();
        workbook.write_to_writer(&mut streamed).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), in_memory);
        assert_eq!(streamed, in_memory);
    }

    #[test]
    fn test_stored_entries_at_level_zero() {
        let mut workbook = Workbook::with_config(crate::WorkbookConfig::new().with_compression_level(0));
        workbook.add_sheet("S").unwrap();
        let bytes = workbook.write_to_vec().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name("xl/worksheets/sheet1.xml").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Stored);
        let mut xml = String::new();
        entry.read_to_string(&mut xml).unwrap();
        assert!(xml.contains("<sheetData/>"));
    }

    #[test]
    fn test_workbook_without_sheets_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let mut workbook = Workbook::new();

        assert!(matches!(
            workbook.write_to_vec(),
            Err(ExcelError::InvalidState(_))
        ));

        assert!(workbook.write_to_file(&path).is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let mut streamed = Vec::new();
        assert!(workbook.write_to_writer(&mut streamed).is_err());
        assert!(streamed.is_empty());

        assert!(!workbook.is_finalized());
        workbook.add_sheet("Sheet1").unwrap();
        assert!(workbook.write_to_vec().is_ok());
    }

    #[test]
    fn test_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xlsx");

        let mut workbook = sample();
        assert!(workbook.write_to_file(&path).is_err());
        assert!(!path.exists());
        assert!(!workbook.is_finalized());
    }
}
