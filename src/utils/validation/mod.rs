//! Validation utilities for input images and numeric conversions

pub mod input;
pub mod numeric;

pub use input::ImageValidator;
pub use numeric::NumericValidator;
