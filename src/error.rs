use thiserror::Error;

/// Fatal conditions that abort an encoding run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// The requested character grid needs more cells than the source has pixels.
    #[error("Image too small for specified rows: {cols}x{rows} cells requested from a {width}x{height} image")]
    ImageTooSmall {
        /// Columns requested.
        cols: u32,
        /// Rows requested.
        rows: u32,
        /// Width of the (oriented) source image.
        width: u32,
        /// Height of the (oriented) source image.
        height: u32,
    },

    /// The source aspect ratio matches no entry of the geometry table.
    #[error("Unsupported aspect ratio {width}:{height} ({ratio:.4})")]
    UnsupportedAspectRatio {
        /// Source width in pixels.
        width: u32,
        /// Source height in pixels.
        height: u32,
        /// width / height.
        ratio: f64,
    },

    /// Row count must be at least one.
    #[error("Row count must be at least 1")]
    InvalidRows,

    /// Layer count outside 1..=8.
    #[error("Layer count must be between 1 and 8, got {0}")]
    InvalidLayers(usize),

    /// Frame rate must be finite and positive.
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    /// Byte budget must be non-zero.
    #[error("Target size must be greater than zero")]
    InvalidBudget,

    /// Nothing to encode.
    #[error("No frames to encode")]
    NoFrames,

    /// A frame could not be read from its source.
    #[error("Failed to decode frame {index}: {message}")]
    Decode {
        /// Index of the frame in its source.
        index: usize,
        /// Underlying failure.
        message: String,
    },

    /// Frames inside one run must share dimensions.
    #[error("Frame {index} is {actual_width}x{actual_height}, expected {width}x{height}")]
    FrameSizeMismatch {
        /// Index of the offending frame.
        index: usize,
        /// Expected width.
        width: u32,
        /// Expected height.
        height: u32,
        /// Actual width.
        actual_width: u32,
        /// Actual height.
        actual_height: u32,
    },
}

/// Result alias for the encoding core.
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
