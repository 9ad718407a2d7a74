//! Frame stride selection against a byte budget.
//!
//! The estimate assumes the worst case for every cell: a full pen change
//! followed by a fully lit glyph.

use serde::Serialize;
use std::ops::Range;

use crate::error::{EncodeError, EncodeResult};
use crate::geometry::GeometrySettings;

/// Most expensive markup a single cell can produce.
pub const WORST_CELL: &str = "<s p=4095>\u{28FF}";
pub const CUE_FOOTER: &str = "</p>\n";
/// Output rate used when the source holds a single frame (one frame per five seconds).
pub const SINGLE_FRAME_RATE: f64 = 0.2;

/// Upper bound on the serialized size of one encoded frame.
pub fn worst_case_frame_bytes(total_frames: usize, fps: f64, rows: u32, cols: u32) -> usize {
    let last_start = (1000.0 * total_frames.saturating_sub(1) as f64 / fps).ceil() as u64;
    let duration = (1000.0 / fps).floor() as u64;
    let header = format!("<p t={last_start} d={duration} wp=0 ws=0>").len();
    let row = cols as usize * WORST_CELL.len() + 1;
    header + rows as usize * row + CUE_FOOTER.len()
}

/// Smallest stride keeping `total_frames × layers` worst-case frames within `budget_bytes`.
pub fn compute_stride(total_frames: usize, layers: usize, frame_bytes: usize, budget_bytes: u64) -> usize {
    let needed = total_frames as f64 * layers as f64 * frame_bytes as f64;
    ((needed / budget_bytes as f64).ceil() as usize).max(1)
}

/// How the source frames map onto output frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingPlan {
    pub total_frames: usize,
    pub stride: usize,
    pub source_fps: f64,
    pub output_fps: f64,
    pub frame_bytes: usize,
}

impl SamplingPlan {
    pub fn new(total_frames: usize, geometry: &GeometrySettings, layers: usize, fps: f64, budget_bytes: u64) -> EncodeResult<Self> {
        if total_frames == 0 {
            return Err(EncodeError::NoFrames);
        }
        if !fps.is_finite() || fps <= 0.0 {
            return Err(EncodeError::InvalidFrameRate(fps));
        }
        if budget_bytes == 0 {
            return Err(EncodeError::InvalidBudget);
        }

        let frame_bytes = worst_case_frame_bytes(total_frames, fps, geometry.rows, geometry.cols);
        let stride = compute_stride(total_frames, layers, frame_bytes, budget_bytes);
        let output_fps = if total_frames > 1 {
            fps / stride as f64
        } else {
            SINGLE_FRAME_RATE
        };
        log::info!(
            "sampling: {} frames, ~{} bytes/frame, stride {} -> {:.3} fps",
            total_frames,
            frame_bytes,
            stride,
            output_fps
        );
        Ok(Self { total_frames, stride, source_fps: fps, output_fps, frame_bytes })
    }

    /// Source frame ranges feeding each output frame.
    ///
    /// Only whole strides produce output; leftover frames at the end are
    /// dropped. A source shorter than one stride still yields one frame.
    /// Single-layer output samples the first frame of each stride, layered
    /// output blends all of them.
    pub fn windows(&self, layers: usize) -> Vec<Range<usize>> {
        let total = self.total_frames;
        let stride = self.stride;
        let count = (total / stride).max(1);
        (0..count)
            .map(|i| {
                let start = i * stride;
                if layers > 1 {
                    start..(start + stride).min(total)
                } else {
                    start..start + 1
                }
            })
            .collect()
    }

    /// Milliseconds one output frame lasts.
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.output_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DisplayMode, FontTier};

    fn grid(rows: u32, cols: u32) -> GeometrySettings {
        GeometrySettings {
            display_mode: DisplayMode::Standard,
            font_tier: FontTier::Default,
            char_aspect_ratio: 35.0 / 58.0,
            rows,
            cols,
        }
    }

    #[test]
    fn worst_cell_is_thirteen_bytes() {
        assert_eq!(WORST_CELL.len(), 13);
    }

    #[test]
    fn frame_estimate() {
        // header "<p t=3960 d=40 wp=0 ws=0>" (25) + 2 * (3 * 13 + 1) + 5
        assert_eq!(worst_case_frame_bytes(100, 25.0, 2, 3), 110);
    }

    #[test]
    fn stride_fits_budget() {
        assert_eq!(compute_stride(100, 1, 110, 11_000), 1);
        assert_eq!(compute_stride(100, 1, 110, 10_999), 2);
        assert_eq!(compute_stride(100, 1, 110, 1_000), 11);
        assert_eq!(compute_stride(100, 3, 110, 11_000), 3);
    }

    #[test]
    fn stride_never_below_one() {
        assert_eq!(compute_stride(1, 1, 10, u64::MAX), 1);
        assert_eq!(compute_stride(0, 1, 10, 100), 1);
    }

    #[test]
    fn bigger_budget_never_raises_stride() {
        let geometry = grid(40, 118);
        let mut previous = usize::MAX;
        for budget in (1..200).map(|i| i * 250_000u64) {
            let plan = SamplingPlan::new(3_000, &geometry, 2, 29.97, budget).unwrap();
            assert!(plan.stride >= 1);
            assert!(plan.stride <= previous, "budget {budget}");
            previous = plan.stride;
        }
    }

    #[test]
    fn single_frame_runs_at_one_per_five_seconds() {
        for budget in [1u64, 1_000, 1 << 30] {
            let plan = SamplingPlan::new(1, &grid(40, 118), 1, 30.0, budget).unwrap();
            assert_eq!(plan.output_fps, SINGLE_FRAME_RATE);
            assert!((plan.frame_duration_ms() - 5000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn output_rate_divides_source_rate() {
        let plan = SamplingPlan::new(100, &grid(2, 3), 1, 25.0, 1_000).unwrap();
        assert_eq!(plan.stride, 11);
        assert!((plan.output_fps - 25.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn windows_per_layer_count() {
        let plan = SamplingPlan { total_frames: 10, stride: 4, source_fps: 30.0, output_fps: 7.5, frame_bytes: 0 };
        assert_eq!(plan.windows(1), vec![0..1, 4..5]);
        assert_eq!(plan.windows(2), vec![0..4, 4..8]);
    }

    #[test]
    fn short_source_keeps_one_window() {
        let plan = SamplingPlan { total_frames: 3, stride: 4, source_fps: 30.0, output_fps: 7.5, frame_bytes: 0 };
        assert_eq!(plan.windows(1), vec![0..1]);
        assert_eq!(plan.windows(3), vec![0..3]);

        let exact = SamplingPlan { total_frames: 8, ..plan };
        assert_eq!(exact.windows(2), vec![0..4, 4..8]);
    }

    #[test]
    fn invalid_inputs_rejected() {
        let geometry = grid(4, 4);
        assert_eq!(SamplingPlan::new(0, &geometry, 1, 30.0, 10), Err(EncodeError::NoFrames));
        assert_eq!(SamplingPlan::new(5, &geometry, 1, 0.0, 10), Err(EncodeError::InvalidFrameRate(0.0)));
        assert_eq!(SamplingPlan::new(5, &geometry, 1, 30.0, 0), Err(EncodeError::InvalidBudget));
    }
}
