//! Utility modules shared by the pipeline stages
//!
//! Input validation and color-space normalization run once per input image
//! before any compositing work starts.

pub mod normalize;
pub mod validation;

// Re-export commonly used items for convenience
pub use normalize::Normalizer;
pub use validation::{ImageValidator, NumericValidator};
