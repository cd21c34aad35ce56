//! Dominant color extraction and naming
//!
//! Statistics only consider pixels with non-zero alpha, so the transparent
//! surroundings of an isolated subject do not pull the palette toward the
//! studio background.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bins per channel of the dominant-color histogram
const HISTOGRAM_LEVELS: usize = 16;
const BIN_WIDTH: u32 = 256 / HISTOGRAM_LEVELS as u32;

/// Minimum lead the strongest channel needs over the runner-up to name a hue
pub const DOMINANCE_MARGIN: u8 = 12;

/// Descriptive color vocabulary used in alt text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Charcoal,
    White,
    Gold,
    Crimson,
    Emerald,
    Sapphire,
    Neutral,
}

impl ColorName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Charcoal => "charcoal",
            Self::White => "white",
            Self::Gold => "gold",
            Self::Crimson => "crimson",
            Self::Emerald => "emerald",
            Self::Sapphire => "sapphire",
            Self::Neutral => "neutral",
        }
    }

    /// Classify an RGB triple
    #[must_use]
    pub fn classify([r, g, b]: [u8; 3]) -> Self {
        let max = r.max(g).max(b);
        if max < 40 {
            return Self::Charcoal;
        }
        if r > 200 && g > 200 && b > 200 {
            return Self::White;
        }
        if r > 170 && g > 150 && b < 120 {
            return Self::Gold;
        }

        let mut sorted = [r, g, b];
        sorted.sort_unstable();
        if sorted[2] - sorted[1] < DOMINANCE_MARGIN {
            return Self::Neutral;
        }

        if max == r {
            Self::Crimson
        } else if max == g {
            Self::Emerald
        } else {
            Self::Sapphire
        }
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel statistics over the visible pixels of an image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStats {
    /// Center of the most populated histogram bin
    pub dominant: [u8; 3],
    /// Mean of each RGB channel
    pub channel_means: [f32; 3],
    /// Number of pixels that contributed
    pub samples: u64,
}

impl ColorStats {
    /// Compute statistics, returning `None` when no pixel is visible
    #[must_use]
    pub fn compute(image: &RgbaImage) -> Option<Self> {
        let mut histogram = vec![0u32; HISTOGRAM_LEVELS.pow(3)];
        let mut sums = [0u64; 3];
        let mut samples = 0u64;

        for pixel in image.pixels().filter(|p| p[3] > 0) {
            let bin = |c: u8| usize::from(c) / BIN_WIDTH as usize;
            let index = (bin(pixel[0]) * HISTOGRAM_LEVELS + bin(pixel[1])) * HISTOGRAM_LEVELS
                + bin(pixel[2]);
            histogram[index] += 1;
            for (sum, value) in sums.iter_mut().zip(pixel.0.iter()) {
                *sum += u64::from(*value);
            }
            samples += 1;
        }

        if samples == 0 {
            return None;
        }

        // First maximum wins so ties resolve deterministically
        let (index, _) = histogram
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, &count)| if count > best.1 { (i, count) } else { best });
        let center = |level: usize| (level as u32 * BIN_WIDTH + BIN_WIDTH / 2) as u8;
        let dominant = [
            center(index / (HISTOGRAM_LEVELS * HISTOGRAM_LEVELS)),
            center((index / HISTOGRAM_LEVELS) % HISTOGRAM_LEVELS),
            center(index % HISTOGRAM_LEVELS),
        ];

        let channel_means = sums.map(|sum| sum as f32 / samples as f32);
        Some(Self {
            dominant,
            channel_means,
            samples,
        })
    }

    /// Second-highest channel mean rendered as a grey triple
    #[must_use]
    pub fn secondary_tone(&self) -> [u8; 3] {
        let mut means = self.channel_means;
        means.sort_by(|a, b| b.total_cmp(a));
        let level = means[1].round().clamp(0.0, 255.0) as u8;
        [level; 3]
    }
}

/// Dominant color names of an image, duplicates removed in first-seen order
#[must_use]
pub fn dominant_colors(image: &RgbaImage) -> Vec<ColorName> {
    let Some(stats) = ColorStats::compute(image) else {
        tracing::debug!("No visible pixels for color analysis");
        return vec![ColorName::Neutral];
    };

    let mut names = Vec::with_capacity(2);
    for triple in [stats.dominant, stats.secondary_tone()] {
        let name = ColorName::classify(triple);
        if !names.contains(&name) {
            names.push(name);
        }
    }

    tracing::debug!(
        dominant = ?stats.dominant,
        samples = stats.samples,
        colors = ?names,
        "Analyzed dominant colors"
    );
    names
}
