//! Gaussian smoothing of the alpha channel.
//!
//! The derived alpha map has hard steps where the transparent tier meets
//! opaque content. Blurring the alpha channel alone softens those steps
//! without touching colour.
//!
//! The blur approximates a Gaussian of standard deviation `radius` with three
//! chained "extended" box filters (integer box plus fractional end taps), the
//! scheme common imaging libraries use for `GaussianBlur(radius)`. Unlike a
//! Gaussian sampled at whole-pixel offsets, its variance is exactly
//! `radius^2` even for sub-pixel radii, so a radius of 0.3 visibly feathers a
//! one-pixel edge. The three passes are folded into one 1-D kernel and applied
//! with [`imageproc::filter::separable_filter_equal`], which extends edge
//! pixels so the output keeps the input's dimensions.

use image::{GrayImage, Luma};

use crate::alpha::AlphaMap;

/// Number of box passes approximating the Gaussian.
const BOX_PASSES: u32 = 3;

/// Radius of one extended box pass: `(integer part, fractional end weight)`.
///
/// Chosen so that `BOX_PASSES` passes have a combined variance of `sigma^2`
/// (Gwosdek et al., "Theoretical Foundations of Gaussian Convolution by
/// Extended Box Filtering").
fn box_radius(sigma: f32) -> (usize, f32) {
    #[allow(clippy::cast_precision_loss)]
    let sigma2 = sigma * sigma / BOX_PASSES as f32;
    let length = (12.0 * sigma2 + 1.0).sqrt();
    let l = ((length - 1.0) / 2.0).floor();
    let a = (2.0 * l + 1.0) * (l * (l + 1.0) - 3.0 * sigma2)
        / (6.0 * (sigma2 - (l + 1.0) * (l + 1.0)));

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = l as usize;
    (whole, a)
}

/// One extended box pass: `2l + 1` unit taps flanked by two taps of weight `a`.
fn box_kernel(sigma: f32) -> Vec<f32> {
    let (l, a) = box_radius(sigma);
    let mut kernel = vec![1.0f32; 2 * l + 3];
    kernel[0] = a;
    kernel[2 * l + 2] = a;

    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Full 1-D convolution of two kernels.
fn convolve(a: &[f32], b: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0f32; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Normalized, symmetric 1-D kernel with variance `sigma^2`.
fn smoothing_kernel(sigma: f32) -> Vec<f32> {
    let pass = box_kernel(sigma);
    (1..BOX_PASSES).fold(pass.clone(), |acc, _| convolve(&acc, &pass))
}

/// Blur an alpha map with a Gaussian-like kernel of standard deviation `radius`.
///
/// Non-positive radii, radii so small that `radius^2` is not a normal `f32`,
/// and empty maps return an unchanged copy. The kernel is non-negative and
/// normalized, so every output value stays in `[0, 255]` and a uniform map
/// comes back uniform.
#[must_use = "returns the smoothed alpha map"]
pub fn smooth_alpha(alpha: &AlphaMap, radius: f32) -> AlphaMap {
    if radius <= 0.0 || !(radius * radius).is_normal() || alpha.is_empty() {
        return alpha.clone();
    }

    let gray = GrayImage::from_fn(alpha.width(), alpha.height(), |x, y| {
        Luma([alpha.get(x, y)])
    });
    let blurred = imageproc::filter::separable_filter_equal(&gray, &smoothing_kernel(radius));

    AlphaMap {
        width: blurred.width(),
        height: blurred.height(),
        values: blurred.into_raw(),
    }
}
