//! Archive packaging
//!
//! Bundles every encoded variant into one deflated zip, fully finalized in
//! memory before it is returned. Entry timestamps are pinned so identical
//! inputs yield identical archives.

use crate::{
    config::OutputFormat,
    error::{CompositeError, Result},
    types::ProcessedImage,
};
use std::io::{Cursor, Write};
use zip::{write::SimpleFileOptions, CompressionMethod, DateTime, ZipWriter};

/// Builds in-memory zip archives of exported variants
#[derive(Debug, Clone)]
pub struct ArchivePackager {
    compression_level: i64,
}

impl Default for ArchivePackager {
    fn default() -> Self {
        Self::new(9)
    }
}

impl ArchivePackager {
    #[must_use]
    pub fn new(compression_level: i64) -> Self {
        Self { compression_level }
    }

    /// Package JPEG then WebP for each result, named by their generated filenames
    ///
    /// # Errors
    ///
    /// Returns `Archive` if any entry cannot be written or the archive cannot be finalized
    pub fn package(&self, results: &[ProcessedImage]) -> Result<Vec<u8>> {
        let entries = results
            .iter()
            .flat_map(|r| OutputFormat::ALL.map(|format| r.encoded(format)));
        self.package_entries(entries)
    }

    /// Package arbitrary named entries in order
    pub fn package_entries<'a, I>(&self, entries: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level))
            .last_modified_time(DateTime::default());
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut count = 0usize;

        for (name, bytes) in entries {
            writer.start_file(name, options).map_err(|e| {
                CompositeError::archive(format!("Failed to start entry '{}': {}", name, e))
            })?;
            writer.write_all(bytes).map_err(|e| {
                CompositeError::archive(format!("Failed to write entry '{}': {}", name, e))
            })?;
            count += 1;
        }

        let cursor = writer
            .finish()
            .map_err(|e| CompositeError::archive(format!("Failed to finalize archive: {}", e)))?;
        let archive = cursor.into_inner();

        log::debug!("Packaged {} entries into {} byte archive", count, archive.len());
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Dimensions, VariantFilenames};
    use std::io::Read;
    use zip::ZipArchive;

    fn result(key: &str, width: u32, height: u32) -> ProcessedImage {
        ProcessedImage {
            size_key: key.to_string(),
            dimensions: Dimensions { width, height },
            jpeg: vec![0xFF, 0xD8, 1, 2, 3],
            webp: b"RIFF....WEBP".to_vec(),
            filenames: VariantFilenames {
                jpeg: format!("jewelry-5-{}x{}.jpg", width, height),
                webp: format!("jewelry-5-{}x{}.webp", width, height),
            },
            alt_text: "Gold elegant refined accessory".to_string(),
        }
    }

    #[test]
    fn test_archive_contains_every_variant_in_order() {
        let results = vec![result("1x1", 2048, 2048), result("4x5", 2000, 2500)];
        let bytes = ArchivePackager::default().package(&results).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 4);
        let names: Vec<_> = archive.file_names().map(str::to_string).collect();
        assert!(names.contains(&"jewelry-5-2048x2048.jpg".to_string()));
        assert_eq!(archive.by_index(0).unwrap().name(), "jewelry-5-2048x2048.jpg");
        assert_eq!(archive.by_index(1).unwrap().name(), "jewelry-5-2048x2048.webp");

        let mut content = Vec::new();
        archive
            .by_name("jewelry-5-2000x2500.webp")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"RIFF....WEBP");
    }

    #[test]
    fn test_entries_are_deflated() {
        let bytes = ArchivePackager::default()
            .package_entries([("a.bin", vec![7u8; 4096].as_slice())])
            .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let entry = archive.by_index(0).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        assert!(entry.compressed_size() < 4096);
    }

    #[test]
    fn test_duplicate_entry_names_fail() {
        let err = ArchivePackager::default()
            .package_entries([("same.jpg", &b"a"[..]), ("same.jpg", &b"b"[..])])
            .unwrap_err();
        assert!(matches!(err, CompositeError::Archive(_)));
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let bytes = ArchivePackager::default().package(&[]).unwrap();
        assert_eq!(ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 0);
    }
}
