//! Per-pixel transparency derivation.
//!
//! Each pixel is scored by its whiteness (the mean of R, G and B) and its
//! color spread (the largest pairwise channel difference). Neutral, bright
//! pixels fall into one of three tiers:
//!
//! 1. **Transparent**: `whiteness >= full_whiteness` and `spread < full_spread`, alpha 0.
//! 2. **Partial**: `whiteness >= partial_whiteness` and `spread < partial_spread`,
//!    alpha interpolated linearly from 255 down to 0 across the whiteness range.
//! 3. **Opaque**: everything else, alpha 255.
//!
//! The tiers are checked in that order, so a pixel matching both of the
//! first two is fully transparent.

use image::{Rgba, RgbaImage};

use crate::config::TransparencyConfig;
use crate::error::{Error, Result};

/// Fully opaque alpha.
const OPAQUE: u8 = u8::MAX;
/// Fully transparent alpha.
const TRANSPARENT: u8 = 0;

/// Classification of a single pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tier {
    /// Near-white and neutral: becomes fully transparent.
    Transparent,
    /// Light and neutral: `ratio` in `[0, 1]` is how far the pixel sits
    /// between the partial and full whiteness thresholds.
    Partial {
        /// Interpolation position, 0 at `partial_whiteness`, 1 at `full_whiteness`.
        ratio: f32,
    },
    /// Anything else. Alpha is left at fully opaque.
    Opaque,
}

impl Tier {
    /// Alpha value for this tier.
    #[must_use]
    pub fn alpha(self) -> u8 {
        match self {
            Self::Transparent => TRANSPARENT,
            Self::Partial { ratio } => round_alpha(f32::from(OPAQUE) * (1.0 - ratio)),
            Self::Opaque => OPAQUE,
        }
    }
}

/// Round half away from zero and clamp into the alpha range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_alpha(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Per-tier pixel counts for one image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransparencyStats {
    /// Pixels classified [`Tier::Transparent`].
    pub transparent: u64,
    /// Pixels classified [`Tier::Partial`].
    pub partial: u64,
    /// Pixels classified [`Tier::Opaque`].
    pub opaque: u64,
}

impl TransparencyStats {
    /// Total number of classified pixels.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.transparent + self.partial + self.opaque
    }

    fn record(&mut self, tier: Tier) {
        match tier {
            Tier::Transparent => self.transparent += 1,
            Tier::Partial { .. } => self.partial += 1,
            Tier::Opaque => self.opaque += 1,
        }
    }
}

/// Per-pixel alpha values, row-major, decoupled from the RGB channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaMap {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) values: Vec<u8>,
}

impl AlphaMap {
    /// Create a map of the given size with every value set to `fill`.
    #[must_use]
    pub fn filled(width: u32, height: u32, fill: u8) -> Self {
        Self {
            width,
            height,
            values: vec![fill; width as usize * height as usize],
        }
    }

    /// Wrap a raw row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPixelData`] if `values.len() != width * height`.
    pub fn from_raw(width: u32, height: u32, values: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(Error::InvalidPixelData(format!(
                "alpha buffer holds {} values, {width}x{height} needs {expected}",
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the map has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Alpha at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        assert!(
            x < self.width && y < self.height,
            "({x}, {y}) out of bounds for {}x{} alpha map",
            self.width,
            self.height
        );
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// The row-major values.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.values
    }

    /// Consume the map, returning its row-major values.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.values
    }
}

/// Whiteness score: the mean of the R, G and B channels, in `[0, 255]`.
#[must_use]
pub fn whiteness(pixel: Rgba<u8>) -> f32 {
    let [r, g, b, _] = pixel.0;
    (f32::from(r) + f32::from(g) + f32::from(b)) / 3.0
}

/// Color spread: the largest absolute difference between any two of R, G and B.
#[must_use]
pub fn color_spread(pixel: Rgba<u8>) -> u8 {
    let [r, g, b, _] = pixel.0;
    r.abs_diff(g).max(g.abs_diff(b)).max(r.abs_diff(b))
}

/// Classify a pixel into its transparency tier. The input alpha is ignored.
#[must_use]
pub fn classify(pixel: Rgba<u8>, config: &TransparencyConfig) -> Tier {
    let white = whiteness(pixel);
    let spread = f32::from(color_spread(pixel));

    if white >= config.full_whiteness && spread < config.full_spread {
        Tier::Transparent
    } else if white >= config.partial_whiteness && spread < config.partial_spread {
        // Pixels brighter than full_whiteness that failed the tighter spread
        // gate land here with ratio > 1.
        let range = config.full_whiteness - config.partial_whiteness;
        let ratio = ((white - config.partial_whiteness) / range).clamp(0.0, 1.0);
        Tier::Partial { ratio }
    } else {
        Tier::Opaque
    }
}

/// Derive the alpha value for a single pixel.
#[must_use]
pub fn derive_alpha(pixel: Rgba<u8>, config: &TransparencyConfig) -> u8 {
    classify(pixel, config).alpha()
}

/// Derive the alpha map for a whole image.
#[must_use]
pub fn derive_alpha_map(image: &RgbaImage, config: &TransparencyConfig) -> AlphaMap {
    derive_with_stats(image, config).0
}

/// Derive the alpha map and count how many pixels fell into each tier.
pub(crate) fn derive_with_stats(
    image: &RgbaImage,
    config: &TransparencyConfig,
) -> (AlphaMap, TransparencyStats) {
    let mut stats = TransparencyStats::default();
    let values = image
        .pixels()
        .map(|px| {
            let tier = classify(*px, config);
            stats.record(tier);
            tier.alpha()
        })
        .collect();

    let map = AlphaMap {
        width: image.width(),
        height: image.height(),
        values,
    };
    (map, stats)
}

/// Replace the alpha channel of `image` with `alpha`, position by position.
/// RGB channels are not touched.
///
/// # Errors
///
/// Returns [`Error::InvalidPixelData`] if the dimensions differ.
pub fn apply_alpha_map(image: &mut RgbaImage, alpha: &AlphaMap) -> Result<()> {
    if image.dimensions() != alpha.dimensions() {
        return Err(Error::InvalidPixelData(format!(
            "alpha map is {}x{}, image is {}x{}",
            alpha.width,
            alpha.height,
            image.width(),
            image.height()
        )));
    }

    for (px, &a) in image.pixels_mut().zip(&alpha.values) {
        px[3] = a;
    }
    Ok(())
}
