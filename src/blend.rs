//! Decayed blending of the source frames that collapse into one output frame.

use image::RgbImage;
use std::borrow::{Borrow, Cow};

use crate::error::{EncodeError, EncodeResult};

/// Per-step weight falloff, `sqrt(0.5)`.
pub const DECAY: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Weights for a window of `n` frames, oldest first. The newest frame weighs most.
pub fn blend_weights(n: usize) -> Vec<f64> {
    (0..n).map(|pos| DECAY.powi((n - pos) as i32)).collect()
}

/// Weighted per-channel average of `frames` (oldest first).
///
/// A single frame is returned as-is without copying.
pub fn blend_frames<F: Borrow<RgbImage>>(frames: &[F]) -> EncodeResult<Cow<'_, RgbImage>> {
    let (first, rest) = frames.split_first().ok_or(EncodeError::NoFrames)?;
    let first = first.borrow();
    if rest.is_empty() {
        return Ok(Cow::Borrowed(first));
    }

    let (width, height) = first.dimensions();
    for (index, frame) in frames.iter().enumerate() {
        let (actual_width, actual_height) = frame.borrow().dimensions();
        if (actual_width, actual_height) != (width, height) {
            return Err(EncodeError::FrameSizeMismatch { index, width, height, actual_width, actual_height });
        }
    }

    let weights = blend_weights(frames.len());
    let total: f64 = weights.iter().sum();
    let mut acc = vec![0.0f64; first.as_raw().len()];
    for (frame, weight) in frames.iter().zip(&weights) {
        for (sum, &value) in acc.iter_mut().zip(frame.borrow().as_raw()) {
            *sum += weight * f64::from(value);
        }
    }

    let mut blended = RgbImage::new(width, height);
    for (dst, sum) in blended.iter_mut().zip(acc) {
        *dst = (sum / total).round_ties_even().clamp(0.0, 255.0) as u8;
    }
    Ok(Cow::Owned(blended))
}
