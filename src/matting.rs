//! Difference matting: recover a true alpha channel from two renders.
//!
//! The same scene is rendered over a pure white and a pure black backdrop.
//! A fully opaque pixel looks identical in both renders; a fully transparent
//! pixel shows the backdrop itself, so its two observations differ maximally.
//! Per-pixel opacity falls out of the distance between the observations, and
//! the pre-composite color falls out of the compositing equation
//! `observed = color * alpha + backdrop * (1 - alpha)`.

use image::{RgbImage, RgbaImage};

use crate::error::{Error, Result};

/// Euclidean distance between a pure-white and pure-black observation,
/// `sqrt(3 * 255^2)`.
const BACKDROP_DISTANCE: f32 = 441.672_96;

/// Below this alpha the recovered color is meaningless; divide by 1.0
/// instead of alpha to keep the math finite.
const MIN_DIVISOR_ALPHA: f32 = 0.01;

/// Default per-corner mean threshold for [`background_is_black`].
pub const DEFAULT_BLACK_THRESHOLD: f32 = 20.0;

/// Extract a true alpha channel from white- and black-backdrop renders.
///
/// For each pixel, alpha is `1 - d / D` clamped to `[0, 1]`, where `d` is
/// the Euclidean RGB distance between the two observations and `D` is
/// [`BACKDROP_DISTANCE`]. The original color is recovered from the black
/// render as `observed / alpha` (the black backdrop contributes nothing to
/// the observation), clamped to `[0, 255]`.
///
/// Pure function of its two inputs; row-parallel when the `cli` feature is
/// enabled.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the inputs differ in dimensions and
/// [`Error::InvalidInput`] if either input is empty.
pub fn extract_alpha(on_white: &RgbImage, on_black: &RgbImage) -> Result<RgbaImage> {
    let (width, height) = on_white.dimensions();
    if (width, height) != on_black.dimensions() {
        return Err(Error::ShapeMismatch {
            white_width: width,
            white_height: height,
            black_width: on_black.width(),
            black_height: on_black.height(),
        });
    }
    if width == 0 || height == 0 {
        return Err(Error::InvalidInput("empty image".to_string()));
    }

    let white = on_white.as_raw();
    let black = on_black.as_raw();
    let row_rgb = width as usize * 3;
    let row_rgba = width as usize * 4;
    let mut out = vec![0u8; row_rgba * height as usize];

    #[cfg(feature = "cli")]
    {
        use rayon::prelude::*;
        out.par_chunks_exact_mut(row_rgba)
            .enumerate()
            .for_each(|(y, out_row)| {
                let offset = y * row_rgb;
                matte_row(
                    &white[offset..offset + row_rgb],
                    &black[offset..offset + row_rgb],
                    out_row,
                );
            });
    }

    #[cfg(not(feature = "cli"))]
    {
        for (y, out_row) in out.chunks_exact_mut(row_rgba).enumerate() {
            let offset = y * row_rgb;
            matte_row(
                &white[offset..offset + row_rgb],
                &black[offset..offset + row_rgb],
                out_row,
            );
        }
    }

    RgbaImage::from_raw(width, height, out)
        .ok_or_else(|| Error::InvalidInput("output buffer size mismatch".to_string()))
}

/// Matte one row of pixels: `white`/`black` are RGB rows, `out` is RGBA.
fn matte_row(white: &[u8], black: &[u8], out: &mut [u8]) {
    for ((wp, bp), op) in white
        .chunks_exact(3)
        .zip(black.chunks_exact(3))
        .zip(out.chunks_exact_mut(4))
    {
        let dr = f32::from(wp[0]) - f32::from(bp[0]);
        let dg = f32::from(wp[1]) - f32::from(bp[1]);
        let db = f32::from(wp[2]) - f32::from(bp[2]);
        let dist = (dr * dr + dg * dg + db * db).sqrt();

        let alpha = (1.0 - dist / BACKDROP_DISTANCE).clamp(0.0, 1.0);
        let divisor = if alpha > MIN_DIVISOR_ALPHA { alpha } else { 1.0 };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            for ch in 0..3 {
                op[ch] = (f32::from(bp[ch]) / divisor).clamp(0.0, 255.0) as u8;
            }
            op[3] = (alpha * 255.0) as u8;
        }
    }
}

/// Check whether an image has a clean black background.
///
/// Samples the four corner pixels; each corner's channel mean must be at or
/// below `threshold`. Corners are overwhelmingly likely to be background
/// rather than subject, so this stays cheap even for 4K renders.
#[must_use]
pub fn background_is_black(image: &RgbImage, threshold: f32) -> bool {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return false;
    }

    let corners = [
        (0, 0),
        (width - 1, 0),
        (0, height - 1),
        (width - 1, height - 1),
    ];
    corners.into_iter().all(|(x, y)| {
        let px = image.get_pixel(x, y);
        let mean = (f32::from(px[0]) + f32::from(px[1]) + f32::from(px[2])) / 3.0;
        mean <= threshold
    })
}
