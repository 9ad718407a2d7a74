//! Ordered frame access for the encoder.

use image::RgbImage;
use std::borrow::Cow;

use crate::error::{EncodeError, EncodeResult};

/// An ordered, random-access sequence of decoded frames.
///
/// The encoder reads each frame once per run and keeps the downscaled grid
/// between layers, so file-backed sources can decode lazily.
pub trait FrameSource {
    fn frame_count(&self) -> usize;

    fn frame(&self, index: usize) -> EncodeResult<Cow<'_, RgbImage>>;

    /// Size of the first frame, used to decide the run's geometry.
    fn dimensions(&self) -> EncodeResult<(u32, u32)> {
        Ok(self.frame(0)?.dimensions())
    }
}

impl FrameSource for [RgbImage] {
    fn frame_count(&self) -> usize {
        self.len()
    }

    fn frame(&self, index: usize) -> EncodeResult<Cow<'_, RgbImage>> {
        self.get(index).map(Cow::Borrowed).ok_or_else(|| EncodeError::Decode {
            index,
            message: format!("index out of range for {} frames", self.len()),
        })
    }
}

impl FrameSource for Vec<RgbImage> {
    fn frame_count(&self) -> usize {
        self.as_slice().frame_count()
    }

    fn frame(&self, index: usize) -> EncodeResult<Cow<'_, RgbImage>> {
        self.as_slice().frame(index)
    }
}
