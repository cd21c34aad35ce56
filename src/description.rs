//! Alt-text generation from color names and category vocabulary

use crate::{color_analysis::ColorName, types::Category};

/// Build alt text such as "Gold and neutral elegant refined accessory showcased on a display bust"
#[must_use]
pub fn build_alt_text(colors: &[ColorName], category: Category) -> String {
    let palette = colors
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(" and ");

    let text = format!(
        "{} {} {} showcased on a {}",
        palette,
        category.descriptors().join(" "),
        category.subject(),
        category.surface()
    );
    capitalize(text.trim())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
