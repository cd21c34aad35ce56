//! Synthetic studio photographs shared by the integration tests

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use storefront_compose::{MaskConfig, PipelineConfig, ShadowConfig};

/// Studio backdrop grey
pub const STUDIO: [u8; 4] = [235, 235, 235, 255];
/// Display bust / mannequin grey
pub const TORSO: [u8; 4] = [140, 140, 140, 255];
/// Gold product swatch
pub const GOLD: [u8; 4] = [210, 160, 60, 255];

/// Studio canvas with a centered torso block
pub fn studio_model(width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba(STUDIO));
    let (left, right) = (width / 4, width - width / 4);
    for y in height / 6..height {
        for x in left..right {
            canvas.put_pixel(x, y, Rgba(TORSO));
        }
    }
    canvas
}

/// Studio canvas with a gold disc filling most of the frame
pub fn gold_product(width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba(STUDIO));
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let radius = width.min(height) as f32 * 0.35;
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let (dx, dy) = (x as f32 - cx, y as f32 - cy);
        if dx * dx + dy * dy <= radius * radius {
            *pixel = Rgba(GOLD);
        }
    }
    canvas
}

pub fn encode(image: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let dynamic = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image.clone()).to_rgb8()),
        _ => DynamicImage::ImageRgba8(image.clone()),
    };
    let mut buffer = Vec::new();
    dynamic
        .write_to(&mut Cursor::new(&mut buffer), format)
        .expect("encoding a synthetic image succeeds");
    buffer
}

/// Encoded 900x1100 model photograph
pub fn model_png() -> Vec<u8> {
    encode(&studio_model(900, 1100), ImageFormat::Png)
}

/// Encoded 800x800 product photograph
pub fn product_png() -> Vec<u8> {
    encode(&gold_product(800, 800), ImageFormat::Png)
}

/// Default configuration with lighter blurs and archive compression
pub fn fast_config() -> PipelineConfig {
    PipelineConfig::builder()
        .mask(MaskConfig {
            blur_sigma: 3.0,
            edge_blur_sigma: 1.5,
            ..MaskConfig::default()
        })
        .shadow(ShadowConfig {
            blur_sigma: 6.0,
            ..ShadowConfig::default()
        })
        .archive_compression_level(1)
        .build()
        .expect("fast configuration is valid")
}
