//! Error types for compositing pipeline operations

use thiserror::Error;

/// Result type alias for compositing operations
pub type Result<T> = std::result::Result<T, CompositeError>;

/// Error taxonomy for a pipeline run
///
/// Every variant renders a single human-readable message. None of them carry
/// pixel data or internal buffer state.
#[derive(Error, Debug)]
pub enum CompositeError {
    /// Buffer cannot be decoded or has no readable dimensions
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Longest side is below the minimum accepted dimension
    #[error("Image is too small ({width}x{height}). Minimum longest side is {minimum}px.")]
    TooSmall {
        width: u32,
        height: u32,
        minimum: u32,
    },

    /// A stage between mask building and export failed on unexpected geometry or buffer state
    #[error("Composition failed: {0}")]
    Composition(String),

    /// The archive stream could not be finalized
    #[error("Archive packaging failed: {0}")]
    Archive(String),

    /// The AI-backed compositor returned nothing usable
    #[error("External compositor failed: {0}")]
    ExternalCompositor(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Codec errors surfaced by the image crate
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl CompositeError {
    /// Create a new invalid image error
    pub fn invalid_image<S: Into<String>>(msg: S) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Create a new composition error
    pub fn composition<S: Into<String>>(msg: S) -> Self {
        Self::Composition(msg.into())
    }

    /// Create a new archive error
    pub fn archive<S: Into<String>>(msg: S) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a new external compositor error
    pub fn external<S: Into<String>>(msg: S) -> Self {
        Self::ExternalCompositor(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create composition error with stage context
    pub fn composition_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Composition(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!(
                "Failed to {} '{}': {}",
                operation,
                path.as_ref().display(),
                error
            ),
        ))
    }

    /// Whether a caller may reasonably retry or fall back to the local pipeline
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalCompositor(_))
    }
}
