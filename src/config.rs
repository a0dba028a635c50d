//! Tuning parameters for transparency derivation and smoothing.

use crate::error::{Error, Result};

/// Whiteness at or above which a neutral pixel becomes fully transparent.
pub const DEFAULT_FULL_WHITENESS: f32 = 240.0;
/// Color spread below which a pixel counts as neutral for the transparent tier.
pub const DEFAULT_FULL_SPREAD: f32 = 10.0;
/// Whiteness at or above which a neutral pixel becomes partially transparent.
pub const DEFAULT_PARTIAL_WHITENESS: f32 = 220.0;
/// Color spread below which a pixel counts as neutral for the partial tier.
pub const DEFAULT_PARTIAL_SPREAD: f32 = 15.0;
/// Gaussian sigma applied to the alpha channel.
pub const DEFAULT_BLUR_RADIUS: f32 = 0.3;

/// Thresholds and blur radius used by [`TransparencyEngine`](crate::TransparencyEngine).
///
/// Whiteness values are on the `[0, 255]` scale of the channel average.
/// Spread values are compared against the largest pairwise channel difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransparencyConfig {
    /// Minimum whiteness for the fully transparent tier.
    pub full_whiteness: f32,
    /// Exclusive spread limit for the fully transparent tier.
    pub full_spread: f32,
    /// Minimum whiteness for the partially transparent tier.
    pub partial_whiteness: f32,
    /// Exclusive spread limit for the partially transparent tier.
    pub partial_spread: f32,
    /// Gaussian sigma for alpha smoothing. `0.0` disables smoothing.
    pub blur_radius: f32,
}

impl Default for TransparencyConfig {
    fn default() -> Self {
        Self {
            full_whiteness: DEFAULT_FULL_WHITENESS,
            full_spread: DEFAULT_FULL_SPREAD,
            partial_whiteness: DEFAULT_PARTIAL_WHITENESS,
            partial_spread: DEFAULT_PARTIAL_SPREAD,
            blur_radius: DEFAULT_BLUR_RADIUS,
        }
    }
}

impl TransparencyConfig {
    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if any value is negative or
    /// not finite, or if `partial_whiteness` is not strictly below
    /// `full_whiteness` (the interpolation range would be empty).
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("full_whiteness", self.full_whiteness),
            ("full_spread", self.full_spread),
            ("partial_whiteness", self.partial_whiteness),
            ("partial_spread", self.partial_spread),
            ("blur_radius", self.blur_radius),
        ];

        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::InvalidConfiguration(format!(
                    "{name} must be finite, got {value}"
                )));
            }
            if value < 0.0 {
                return Err(Error::InvalidConfiguration(format!(
                    "{name} must be >= 0, got {value}"
                )));
            }
        }

        if self.partial_whiteness >= self.full_whiteness {
            return Err(Error::InvalidConfiguration(format!(
                "partial_whiteness ({}) must be below full_whiteness ({})",
                self.partial_whiteness, self.full_whiteness
            )));
        }

        Ok(())
    }
}
