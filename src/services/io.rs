//! File I/O service
//!
//! Keeps filesystem access out of the pipeline, which only ever sees byte
//! buffers.

use crate::{
    error::{CompositeError, Result},
    types::{Dimensions, ProcessResponse, VariantFilenames},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the manifest written next to the outputs
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Summary of one written variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub size_key: String,
    pub dimensions: Dimensions,
    pub filenames: VariantFilenames,
    pub alt_text: String,
}

/// Index of everything a run wrote to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputManifest {
    pub category: String,
    pub timestamp: i64,
    pub archive: String,
    pub results: Vec<ManifestEntry>,
}

impl OutputManifest {
    #[must_use]
    pub fn from_response(response: &ProcessResponse) -> Self {
        Self {
            category: response.category.to_string(),
            timestamp: response.timestamp,
            archive: response.archive_filename(),
            results: response
                .results
                .iter()
                .map(|r| ManifestEntry {
                    size_key: r.size_key.clone(),
                    dimensions: r.dimensions,
                    filenames: r.filenames.clone(),
                    alt_text: r.alt_text.clone(),
                })
                .collect(),
        }
    }
}

/// Service for reading inputs and writing run outputs
pub struct ImageIOService;

impl ImageIOService {
    /// Read an input image file into memory
    ///
    /// # Examples
    /// ```rust,no_run
    /// use storefront_compose::services::ImageIOService;
    ///
    /// let bytes = ImageIOService::read_bytes("mannequin.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            return Err(CompositeError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        let bytes = std::fs::read(path_ref)
            .map_err(|e| CompositeError::file_io_error("read image file", path_ref, &e))?;
        log::debug!("Read {} bytes from {}", bytes.len(), path_ref.display());
        Ok(bytes)
    }

    /// Whether the file extension is one the boundary accepts
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                matches!(
                    ext.to_ascii_lowercase().as_str(),
                    "png" | "jpg" | "jpeg" | "webp"
                )
            })
    }

    /// Write every variant, the archive and a manifest into `dir`
    ///
    /// Returns the written paths in write order.
    pub fn write_response<P: AsRef<Path>>(
        response: &ProcessResponse,
        dir: P,
    ) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| CompositeError::file_io_error("create output directory", dir, &e))?;

        let mut written = Vec::with_capacity(response.results.len() * 2 + 2);
        let mut write = |name: &str, bytes: &[u8]| -> Result<()> {
            let path = dir.join(name);
            std::fs::write(&path, bytes)
                .map_err(|e| CompositeError::file_io_error("write output file", &path, &e))?;
            written.push(path);
            Ok(())
        };

        for result in &response.results {
            write(&result.filenames.jpeg, &result.jpeg)?;
            write(&result.filenames.webp, &result.webp)?;
        }
        write(&response.archive_filename(), &response.archive)?;

        let manifest = serde_json::to_vec_pretty(&OutputManifest::from_response(response))
            .map_err(|e| CompositeError::archive(format!("Failed to serialize manifest: {}", e)))?;
        write(MANIFEST_FILENAME, &manifest)?;

        log::info!("Wrote {} files to {}", written.len(), dir.display());
        Ok(written)
    }
}
