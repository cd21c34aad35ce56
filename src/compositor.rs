//! Layer composition
//!
//! Stacks the shadow and the resized product onto the isolated model with
//! standard alpha "over" blending. Layers that extend past the model canvas
//! are clipped.

use crate::{
    error::{CompositeError, Result},
    types::Placement,
};
use image::{
    imageops::{self, FilterType},
    Rgba, RgbaImage,
};

/// Resampling filter used for every resize in the pipeline
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Largest size with the source aspect ratio that fits inside the box
#[must_use]
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (f64::from(source.0.max(1)), f64::from(source.1.max(1)));
    let (bw, bh) = (f64::from(bounds.0), f64::from(bounds.1));
    let scale = (bw / sw).min(bh / sh);

    let width = ((sw * scale).round() as u32).clamp(1, bounds.0.max(1));
    let height = ((sh * scale).round() as u32).clamp(1, bounds.1.max(1));
    (width, height)
}

/// Offset that centers `inner` within `outer`, with half pixels rounded up
#[must_use]
pub fn centered_offset(outer: u32, inner: u32) -> u32 {
    (outer.saturating_sub(inner) + 1) / 2
}

/// Resize into a `width` x `height` box, preserving aspect ratio with transparent padding
///
/// Only the top `rows` rows of the box are rendered. Source rows below that
/// window are never resampled, so a box far taller than the canvas it lands
/// on costs no more than the window.
pub fn resize_contain_rows(
    image: &RgbaImage,
    width: u32,
    height: u32,
    rows: u32,
) -> Result<RgbaImage> {
    if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
        return Err(CompositeError::composition_stage_error(
            "product resize",
            "zero-size geometry",
            Some(&format!(
                "{}x{} into {}x{}",
                image.width(),
                image.height(),
                width,
                height
            )),
        ));
    }

    let rows = rows.clamp(1, height);
    let (fit_width, fit_height) = fit_within(image.dimensions(), (width, height));
    let x = centered_offset(width, fit_width);
    let y = centered_offset(height, fit_height);

    let mut canvas = RgbaImage::from_pixel(width, rows, Rgba([0, 0, 0, 0]));
    if y >= rows {
        return Ok(canvas);
    }

    let needed = (rows - y).min(fit_height);
    let resized = if needed == fit_height {
        imageops::resize(image, fit_width, fit_height, RESIZE_FILTER)
    } else {
        // Lanczos3 reads three source rows past the last one it lands on
        let source_height = image.height();
        let row_scale = f64::from(fit_height) / f64::from(source_height);
        let source_rows =
            ((f64::from(needed) / row_scale).ceil() as u32 + 3).clamp(1, source_height);
        let band = imageops::crop_imm(image, 0, 0, image.width(), source_rows).to_image();
        let band_height = ((f64::from(source_rows) * row_scale).round() as u32).max(needed);
        let band = imageops::resize(&band, fit_width, band_height, RESIZE_FILTER);
        imageops::crop_imm(&band, 0, 0, fit_width, needed).to_image()
    };

    imageops::replace(&mut canvas, &resized, i64::from(x), i64::from(y));
    Ok(canvas)
}

/// Stacks placed layers onto a model canvas
pub struct Compositor;

impl Compositor {
    /// Composite shadow then product onto the model
    ///
    /// `product` must already be sized to the placement width and hold at most
    /// the placement height; rows cut off below the canvas may be omitted. The
    /// model buffer is consumed and returned as the composite.
    pub fn compose(
        model: RgbaImage,
        product: &RgbaImage,
        shadow: Option<&RgbaImage>,
        placement: &Placement,
        shadow_offset: u32,
    ) -> Result<RgbaImage> {
        if product.width() != placement.width || product.height() > placement.height {
            return Err(CompositeError::composition_stage_error(
                "composition",
                "product layer does not match its placement",
                Some(&format!(
                    "layer {}x{}, placement {}x{}",
                    product.width(),
                    product.height(),
                    placement.width,
                    placement.height
                )),
            ));
        }

        let mut canvas = model;
        let left = i64::from(placement.left);
        let top = i64::from(placement.top);

        if let Some(shadow) = shadow {
            imageops::overlay(&mut canvas, shadow, left, top + i64::from(shadow_offset));
        }
        imageops::overlay(&mut canvas, product, left, top);

        Ok(canvas)
    }

    /// Flatten an image onto an opaque background of the same size
    #[must_use]
    pub fn flatten_onto(image: &RgbaImage, background: [u8; 3]) -> RgbaImage {
        let [r, g, b] = background;
        let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), Rgba([r, g, b, 255]));
        imageops::overlay(&mut canvas, image, 0, 0);
        canvas
    }
}
