//! Display geometry: orientation, font tier and the character grid size.
//!
//! The source aspect ratio is matched against a small table of supported
//! reference ratios. Each entry carries the row thresholds above which the
//! output switches to portrait orientation and to the small font tier.

use serde::Serialize;

use crate::error::{EncodeError, EncodeResult};

/// How the braille grid is placed in the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Standard,
    Narrow,
    Wide,
    /// Frames are rotated a quarter turn counter-clockwise before encoding.
    Portrait,
}

impl DisplayMode {
    pub fn name(self) -> &'static str {
        match self {
            DisplayMode::Standard => "standard",
            DisplayMode::Narrow => "narrow",
            DisplayMode::Wide => "wide",
            DisplayMode::Portrait => "portrait",
        }
    }

    pub fn is_portrait(self) -> bool {
        self == DisplayMode::Portrait
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontTier {
    Default,
    Small,
}

impl FontTier {
    pub fn name(self) -> &'static str {
        match self {
            FontTier::Default => "default",
            FontTier::Small => "small",
        }
    }
}

/// One supported reference aspect ratio.
#[derive(Debug, Clone, Copy)]
pub struct AspectEntry {
    pub width: u32,
    pub height: u32,
    /// Mode used while the row count stays at or below `portrait_above_rows`.
    pub landscape: DisplayMode,
    pub portrait_above_rows: u32,
    pub small_font_above_rows: u32,
}

impl AspectEntry {
    pub fn ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Tested in order; the first entry whose ratio falls in the tolerance range wins.
pub const ASPECT_TABLE: &[AspectEntry] = &[
    AspectEntry { width: 1, height: 1, landscape: DisplayMode::Narrow, portrait_above_rows: 48, small_font_above_rows: 36 },
    AspectEntry { width: 4, height: 3, landscape: DisplayMode::Narrow, portrait_above_rows: 54, small_font_above_rows: 40 },
    AspectEntry { width: 16, height: 9, landscape: DisplayMode::Standard, portrait_above_rows: 72, small_font_above_rows: 54 },
    AspectEntry { width: 64, height: 27, landscape: DisplayMode::Wide, portrait_above_rows: 90, small_font_above_rows: 66 },
    AspectEntry { width: 12, height: 5, landscape: DisplayMode::Wide, portrait_above_rows: 90, small_font_above_rows: 66 },
];

/// Width / height of one character cell as rendered by the player.
pub fn char_aspect_ratio(mode: DisplayMode, tier: FontTier) -> f64 {
    match (mode, tier) {
        (DisplayMode::Wide, FontTier::Default) => 35.0 / 60.0,
        (DisplayMode::Wide, FontTier::Small) => 35.0 / 58.0,
        (_, FontTier::Default) => 35.0 / 58.0,
        (_, FontTier::Small) => 35.0 / 56.0,
    }
}

/// Range of ratios a `width`×`height` image may have once each side is
/// allowed half a pixel of rounding error.
pub fn tolerance_range(width: u32, height: u32) -> (f64, f64) {
    let (w, h) = (f64::from(width), f64::from(height));
    ((w - 0.5) / (h + 0.5), (w + 0.5) / (h - 0.5))
}

pub fn match_aspect(width: u32, height: u32) -> Option<&'static AspectEntry> {
    let (lo, hi) = tolerance_range(width, height);
    ASPECT_TABLE.iter().find(|entry| {
        let ratio = entry.ratio();
        lo <= ratio && ratio <= hi
    })
}

/// Geometry decided once per run from the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeometrySettings {
    pub display_mode: DisplayMode,
    pub font_tier: FontTier,
    pub char_aspect_ratio: f64,
    pub rows: u32,
    pub cols: u32,
}

impl GeometrySettings {
    /// Classifies a `width`×`height` source for `rows` requested rows.
    pub fn classify(width: u32, height: u32, rows: u32) -> EncodeResult<Self> {
        if rows == 0 {
            return Err(EncodeError::InvalidRows);
        }
        let entry = match_aspect(width, height).ok_or(EncodeError::UnsupportedAspectRatio {
            width,
            height,
            ratio: f64::from(width) / f64::from(height),
        })?;

        let display_mode = if rows > entry.portrait_above_rows {
            DisplayMode::Portrait
        } else {
            entry.landscape
        };
        let font_tier = if rows > entry.small_font_above_rows {
            FontTier::Small
        } else {
            FontTier::Default
        };
        let car = char_aspect_ratio(display_mode, font_tier);
        let source_ratio = f64::from(width) / f64::from(height);

        let (rows, cols) = if display_mode.is_portrait() {
            let cols = (f64::from(rows) / car).round_ties_even() as u32;
            let rows = (f64::from(cols) * car * source_ratio).round_ties_even() as u32;
            (rows, cols)
        } else {
            let cols = (f64::from(rows) / car * source_ratio).round_ties_even() as u32;
            (rows, cols)
        };
        if rows == 0 || cols == 0 {
            return Err(EncodeError::InvalidRows);
        }

        let settings = Self { display_mode, font_tier, char_aspect_ratio: car, rows, cols };
        let (oriented_w, oriented_h) = settings.oriented_size(width, height);
        if cols > oriented_w || rows > oriented_h {
            return Err(EncodeError::ImageTooSmall { cols, rows, width: oriented_w, height: oriented_h });
        }

        log::info!(
            "geometry: {}x{} -> {} mode, {} font, {}x{} cells",
            width,
            height,
            display_mode.name(),
            font_tier.name(),
            cols,
            rows
        );
        Ok(settings)
    }

    /// Source size after the orientation applied by this geometry.
    pub fn oriented_size(&self, width: u32, height: u32) -> (u32, u32) {
        if self.display_mode.is_portrait() {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Pixel size frames are resampled to: one pixel per dot.
    pub fn dot_grid_size(&self) -> (u32, u32) {
        (2 * self.cols, 4 * self.rows)
    }
}
