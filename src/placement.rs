//! Product placement geometry
//!
//! Pure function of category, model size, product aspect ratio and scale.
//! Only `top` and `left` are floored at zero; width and height are not clamped
//! to the model canvas, so a wide product at a large scale can overflow the
//! canvas edge. The compositor clips whatever falls outside.

use crate::{
    error::Result,
    types::{Category, Placement, ScaleFactor},
    utils::NumericValidator,
};

/// Share of the model width taken by the product at scale 1.0
#[must_use]
pub fn base_scale(category: Category) -> f64 {
    match category {
        Category::Jewelry => 0.34,
        Category::Clothing => 0.62,
    }
}

/// Compute the product rectangle on the model canvas
///
/// # Errors
///
/// Returns `Composition` only when the geometry is not representable in pixels
pub fn calculate_placement(
    category: Category,
    model_dimensions: (u32, u32),
    product_dimensions: (u32, u32),
    scale: ScaleFactor,
) -> Result<Placement> {
    let (model_width, model_height) = model_dimensions;
    let model_width = f64::from(model_width);
    let model_height = f64::from(model_height);
    let ratio = f64::from(product_dimensions.0) / f64::from(product_dimensions.1.max(1));

    let width = NumericValidator::round_extent(
        model_width * base_scale(category) * f64::from(scale.value()),
    )?;
    let height = NumericValidator::round_extent(f64::from(width) / ratio.max(f64::MIN_POSITIVE))?;

    let top = match category {
        Category::Jewelry => model_height * 0.28 - f64::from(height) / 2.0,
        Category::Clothing => model_height * 0.24,
    };
    let left = model_width / 2.0 - f64::from(width) / 2.0;

    let placement = Placement {
        width,
        height,
        left: NumericValidator::round_non_negative(left)?,
        top: NumericValidator::round_non_negative(top)?,
    };

    tracing::debug!(
        category = %category,
        width = placement.width,
        height = placement.height,
        left = placement.left,
        top = placement.top,
        "Computed product placement"
    );
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(value: f32) -> ScaleFactor {
        ScaleFactor::new(value).unwrap()
    }

    #[test]
    fn test_jewelry_scenario() {
        let placement =
            calculate_placement(Category::Jewelry, (1600, 2000), (900, 700), scale(1.0)).unwrap();
        assert_eq!(placement.width, 544);
        assert_eq!(placement.height, 423);
        assert_eq!(placement.top, 349);
        assert_eq!(placement.left, 528);
    }

    #[test]
    fn test_clothing_is_wider_than_jewelry() {
        let jewelry =
            calculate_placement(Category::Jewelry, (1600, 2000), (900, 700), scale(1.0)).unwrap();
        let clothing =
            calculate_placement(Category::Clothing, (1600, 2000), (900, 700), scale(1.0)).unwrap();
        assert_eq!(clothing.width, 992);
        assert_eq!(clothing.top, 480);
        assert!(clothing.width > jewelry.width);
    }

    #[test]
    fn test_placement_is_horizontally_centered() {
        for category in [Category::Jewelry, Category::Clothing] {
            for value in [0.5, 0.8, 1.0, 1.2, 1.5] {
                for model in [(800, 1000), (1600, 2000), (2048, 2048), (1000, 800)] {
                    let p = calculate_placement(category, model, (640, 900), scale(value)).unwrap();
                    let expected =
                        (f64::from(model.0) / 2.0 - f64::from(p.width) / 2.0).round().max(0.0);
                    assert_eq!(f64::from(p.left), expected);
                    assert!(p.width >= 1 && p.height >= 1);
                }
            }
        }
    }

    #[test]
    fn test_degenerate_product_height() {
        let p = calculate_placement(Category::Jewelry, (1000, 1000), (900, 0), scale(1.0)).unwrap();
        assert!(p.width >= 1);
        assert!(p.height >= 1);
    }

    #[test]
    fn test_top_is_floored_for_tall_products() {
        // A very tall product centered on 28% of a short canvas would start above it
        let p = calculate_placement(Category::Jewelry, (1600, 900), (100, 2000), scale(1.0)).unwrap();
        assert_eq!(p.top, 0);
    }

    #[test]
    fn test_overflow_is_not_clamped() {
        // Narrow model, wide clothing product, maximum scale: the product exceeds the
        // canvas vertically but stays horizontally inside it, and left is floored at 0
        let p =
            calculate_placement(Category::Clothing, (800, 1000), (200, 1000), scale(1.5)).unwrap();
        assert_eq!(p.width, 744);
        assert!(p.top + p.height > 1000);
    }
}
