//! # braillecue - Braille Art Subtitle Generator Library
//!
//! `braillecue` turns video frames into colored braille art and packs it into
//! timed subtitle cues (SRV3), so a clip can play back inside a subtitle track.
//!
//! ## Features
//!
//! - Optimal lit/dark split of every 2×4 braille cell
//! - 12-bit color palette shared across the whole run
//! - Adaptive frame skipping to stay within an output size budget
//! - Optional brightness layers with motion-blurred frame groups
//! - Progress reporting for integration with UI applications
//!
//! ## Example
//!
//! ```no_run
//! use braillecue::{ConversionOptions, SubtitleConverter, VideoOptions};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = SubtitleConverter::new();
//! let options = ConversionOptions::default().with_rows(40);
//! let summary = converter.convert_video(
//!     Path::new("input.mp4"),
//!     Path::new("output"),
//!     &VideoOptions::default(),
//!     &options,
//!     false,
//! )?;
//! println!("{} cues written to {}", summary.cue_count, summary.output_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Encoding in memory
//!
//! The encoder itself works on any [`FrameSource`] and never touches the
//! filesystem:
//!
//! ```
//! use braillecue::{encode_frames, ConversionOptions};
//! use image::{Rgb, RgbImage};
//!
//! let frames = vec![RgbImage::from_pixel(160, 90, Rgb([255, 255, 255]))];
//! let run = encode_frames(&frames, 30.0, &ConversionOptions::default().with_rows(8)).unwrap();
//! assert_eq!(run.cues.len(), 1);
//! assert_eq!(run.plan.output_fps, 0.2);
//! ```

pub mod blend;
pub mod cue;
pub mod decode;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod palette;
pub mod partition;
pub mod sampler;
pub mod source;
pub mod srt;
pub mod srv3;

pub use cue::{Cue, CueAggregator};
pub use error::{EncodeError, EncodeResult};
pub use geometry::{DisplayMode, FontTier, GeometrySettings};
pub use palette::{ColorId, Palette};
pub use sampler::SamplingPlan;
pub use source::FrameSource;

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::blend::blend_frames;
use crate::decode::FrameSequence;
use crate::encoder::{encode_frame, prepare_grid};
use crate::partition::MAX_LAYERS;
use crate::srt::MetaCue;

/// Bytes per mebibyte, the unit of size presets.
pub const MIB: u64 = 1024 * 1024;

/// Frame rate assumed for image directories when none is given.
pub const DEFAULT_IMAGE_FPS: f64 = 30.0;

/// Represents the current phase of a conversion operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Probing the input and extracting frames with ffmpeg
    DecodingFrames,
    /// Encoding sampled frames into braille cues
    EncodingFrames,
    /// Conversion completed successfully
    Complete,
}

/// Progress information for conversion operations
///
/// This struct provides detailed progress information that can be used
/// to display progress in UI applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase of the conversion
    pub phase: ProgressPhase,
    /// Number of items completed in the current phase
    pub completed: usize,
    /// Total number of items in the current phase (0 if unknown/indeterminate)
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    /// Human-readable message describing current status
    pub message: String,
}

impl Progress {
    /// Create a new progress update for decoding frames
    pub fn decoding_frames() -> Self {
        Self {
            phase: ProgressPhase::DecodingFrames,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: "Extracting frames from video...".to_string(),
        }
    }

    /// Create a new progress update for frame encoding.
    ///
    /// `total` counts output frames times layers.
    pub fn encoding_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            phase: ProgressPhase::EncodingFrames,
            completed,
            total,
            percentage,
            message: format!("Encoding frame {} of {}", completed, total),
        }
    }

    /// Create a completion progress update
    pub fn complete(total_cues: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_cues,
            total: total_cues,
            percentage: 100.0,
            message: format!("Conversion complete: {} cues", total_cues),
        }
    }
}

/// Configuration preset defining quality settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Preset {
    pub rows: u32,
    #[serde(default = "default_layers")]
    pub layers: usize,
    pub target_size_mib: f64,
}

fn default_layers() -> usize {
    1
}

fn default_max_output_mib() -> f64 {
    64.0
}

/// Application configuration with named presets
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub presets: HashMap<String, Preset>,
    pub default_preset: String,
    /// Hard ceiling on the document body, regardless of preset.
    #[serde(default = "default_max_output_mib")]
    pub max_output_mib: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let presets = [
            ("default", Preset { rows: 40, layers: 1, target_size_mib: 12.6 }),
            ("small", Preset { rows: 24, layers: 1, target_size_mib: 6.0 }),
            ("large", Preset { rows: 60, layers: 3, target_size_mib: 24.0 }),
        ]
        .into_iter()
        .map(|(name, preset)| (name.to_string(), preset))
        .collect();
        Self {
            presets,
            default_preset: "default".to_string(),
            max_output_mib: default_max_output_mib(),
        }
    }
}

impl AppConfig {
    /// Loads a JSON or TOML config, chosen by file extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: AppConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&text).with_context(|| format!("parsing config toml {}", path.display()))?,
            _ => serde_json::from_str(&text).with_context(|| format!("parsing config json {}", path.display()))?,
        };
        config.validate().with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Checks that every preset can drive an encoding run.
    pub fn validate(&self) -> Result<()> {
        if !self.presets.contains_key(&self.default_preset) {
            bail!("default preset '{}' is not defined", self.default_preset);
        }
        for (name, preset) in &self.presets {
            if preset.rows == 0 {
                bail!("preset '{}' has zero rows", name);
            }
            if preset.layers == 0 || preset.layers > MAX_LAYERS {
                bail!("preset '{}' has {} layers, expected 1 to {}", name, preset.layers, MAX_LAYERS);
            }
            if preset.target_size_mib.is_nan() || preset.target_size_mib <= 0.0 {
                bail!("preset '{}' needs a positive target size", name);
            }
        }
        if self.max_output_mib.is_nan() || self.max_output_mib <= 0.0 {
            bail!("max_output_mib must be positive");
        }
        Ok(())
    }
}

/// Converts a size in MiB to bytes.
pub fn mib_to_bytes(mib: f64) -> u64 {
    (mib * MIB as f64).round() as u64
}

/// Options for braille encoding
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    /// Character rows of the output grid
    pub rows: u32,
    /// Brightness layers per output frame (1 to 8)
    pub layers: usize,
    /// Worst-case size the sampler plans for, in bytes
    pub target_size_bytes: u64,
    /// Milliseconds added to every cue start
    pub sub_ms_offset: i64,
    /// Encoding stops once the cues would exceed this many bytes
    pub max_output_bytes: u64,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            rows: 40,
            layers: 1,
            target_size_bytes: mib_to_bytes(12.6),
            sub_ms_offset: 0,
            max_output_bytes: mib_to_bytes(default_max_output_mib()),
        }
    }
}

impl ConversionOptions {
    /// Create options with a specific row count
    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    /// Create options with a specific layer count
    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    /// Set the target size in MiB
    pub fn with_target_size(mut self, mib: f64) -> Self {
        self.target_size_bytes = mib_to_bytes(mib);
        self
    }

    /// Shift every cue by `offset` milliseconds
    pub fn with_sub_ms_offset(mut self, offset: i64) -> Self {
        self.sub_ms_offset = offset;
        self
    }

    /// Set the hard output ceiling in bytes
    pub fn with_max_output_bytes(mut self, bytes: u64) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Create options from a preset
    pub fn from_preset(preset: &Preset, max_output_mib: f64) -> Self {
        Self {
            rows: preset.rows,
            layers: preset.layers,
            target_size_bytes: mib_to_bytes(preset.target_size_mib),
            sub_ms_offset: 0,
            max_output_bytes: mib_to_bytes(max_output_mib),
        }
    }
}

/// Options for video input
#[derive(Debug, Clone, Default)]
pub struct VideoOptions {
    /// Milliseconds to skip at the start of the video
    pub start_ms: u64,
    /// Overrides the probed (or assumed) source frame rate
    pub fps: Option<f64>,
    /// Regular subtitles to re-time into the caption window
    pub subtitles: Option<PathBuf>,
}

/// Everything one encoding run produced.
#[derive(Debug, Clone)]
pub struct EncodedRun {
    /// Cues of all layers, brightest layer first, each layer in time order.
    pub cues: Vec<Cue>,
    pub palette: Palette,
    pub geometry: GeometrySettings,
    pub plan: SamplingPlan,
    pub layers: usize,
    /// Set when the output ceiling cut the run short.
    pub truncated: bool,
}

impl EncodedRun {
    /// Serialized size of all cues, line breaks included.
    pub fn output_bytes(&self) -> usize {
        self.cues.iter().map(Cue::serialized_len).sum()
    }
}

fn fetch_frame<'a, S: FrameSource + ?Sized>(source: &'a S, index: usize, expected: (u32, u32)) -> EncodeResult<Cow<'a, RgbImage>> {
    let frame = source.frame(index)?;
    let (actual_width, actual_height) = frame.dimensions();
    if (actual_width, actual_height) != expected {
        return Err(EncodeError::FrameSizeMismatch {
            index,
            width: expected.0,
            height: expected.1,
            actual_width,
            actual_height,
        });
    }
    Ok(frame)
}

/// Decodes, blends and resizes the source frames of one output frame.
fn prepare_window<S: FrameSource + ?Sized>(
    source: &S,
    window: &Range<usize>,
    size: (u32, u32),
    geometry: &GeometrySettings,
) -> EncodeResult<RgbImage> {
    let frames = window
        .clone()
        .map(|i| fetch_frame(source, i, size))
        .collect::<EncodeResult<Vec<_>>>()?;
    let blended = blend_frames(&frames)?;
    Ok(prepare_grid(&blended, geometry).into_owned())
}

/// Encodes `source` played at `fps` into braille cues.
pub fn encode_frames<S: FrameSource + ?Sized>(source: &S, fps: f64, options: &ConversionOptions) -> EncodeResult<EncodedRun> {
    encode_frames_with_progress(source, fps, options, |_| {})
}

/// Encodes `source` into braille cues, reporting every encoded frame.
///
/// Geometry is decided from the first frame and the stride from the
/// worst-case size of the run. Layers are encoded brightest first; within a
/// layer, repeated frames extend the previous cue. When a new cue would push
/// the output past `max_output_bytes`, encoding stops and the partial run is
/// returned with `truncated` set.
pub fn encode_frames_with_progress<S, F>(source: &S, fps: f64, options: &ConversionOptions, progress_callback: F) -> EncodeResult<EncodedRun>
where
    S: FrameSource + ?Sized,
    F: Fn(Progress),
{
    if options.rows == 0 {
        return Err(EncodeError::InvalidRows);
    }
    if options.layers == 0 || options.layers > MAX_LAYERS {
        return Err(EncodeError::InvalidLayers(options.layers));
    }
    let total = source.frame_count();
    if total == 0 {
        return Err(EncodeError::NoFrames);
    }

    let (width, height) = source.dimensions()?;
    let geometry = GeometrySettings::classify(width, height, options.rows)?;
    let plan = SamplingPlan::new(total, &geometry, options.layers, fps, options.target_size_bytes)?;
    let windows = plan.windows(options.layers);
    let duration = plan.frame_duration_ms();
    let steps = windows.len() * options.layers;

    let mut palette = Palette::new();
    let mut cues: Vec<Cue> = Vec::new();
    let mut output_bytes: u64 = 0;
    let mut truncated = false;
    let mut completed = 0;
    progress_callback(Progress::encoding_frames(0, steps));

    // Prepared grids are reused by every later layer.
    let mut grids: Vec<Option<RgbImage>> = vec![None; windows.len()];

    'layers: for layer in (0..options.layers).rev() {
        let mut aggregator = CueAggregator::new();
        for (idx, window) in windows.iter().enumerate() {
            let grid = match grids[idx].take() {
                Some(grid) => grid,
                None => prepare_window(source, window, (width, height), &geometry)?,
            };
            let encoded = encode_frame(&mut palette, &grid, options.layers, layer);
            if layer > 0 {
                grids[idx] = Some(grid);
            }

            let cue = Cue {
                start: 1000.0 * idx as f64 / plan.output_fps + options.sub_ms_offset as f64,
                duration,
                palette_slot: encoded.first_slot.unwrap_or(0),
                text: encoded.text,
                layer,
            };

            if aggregator.would_merge(&cue) {
                let before = aggregator.last().map_or(0, Cue::serialized_len);
                aggregator.push(cue);
                let after = aggregator.last().map_or(0, Cue::serialized_len);
                output_bytes += after.saturating_sub(before) as u64;
            } else {
                let len = cue.serialized_len() as u64;
                if output_bytes + len > options.max_output_bytes {
                    log::warn!(
                        "output ceiling of {} bytes reached at layer {} frame {}; stopping early",
                        options.max_output_bytes,
                        layer,
                        idx
                    );
                    truncated = true;
                    cues.extend(aggregator.into_cues());
                    break 'layers;
                }
                output_bytes += len;
                aggregator.push(cue);
            }

            completed += 1;
            progress_callback(Progress::encoding_frames(completed, steps));
        }
        log::debug!("layer {}: {} cues", layer, aggregator.len());
        cues.extend(aggregator.into_cues());
    }

    log::info!(
        "encoded {} cues ({} bytes) with {} palette colors",
        cues.len(),
        output_bytes,
        palette.len()
    );

    Ok(EncodedRun {
        cues,
        palette,
        geometry,
        plan,
        layers: options.layers,
        truncated,
    })
}

/// Outcome of a conversion written to disk
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub output_path: PathBuf,
    pub geometry: GeometrySettings,
    pub plan: SamplingPlan,
    pub layers: usize,
    pub palette_size: usize,
    pub cue_count: usize,
    pub meta_cue_count: usize,
    pub output_bytes: usize,
    pub truncated: bool,
}

/// Main converter struct for braille subtitle generation
pub struct SubtitleConverter {
    config: AppConfig,
}

impl SubtitleConverter {
    /// Create a new converter with default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Create a converter with custom configuration
    pub fn with_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load configuration from a JSON or TOML file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: AppConfig::from_file(path)?,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a preset by name
    pub fn get_preset(&self, name: &str) -> Option<&Preset> {
        self.config.presets.get(name)
    }

    /// Get conversion options from a preset name
    pub fn options_from_preset(&self, preset_name: &str) -> Result<ConversionOptions> {
        let preset = self
            .get_preset(preset_name)
            .ok_or_else(|| anyhow!("Preset '{}' not found", preset_name))?;
        Ok(ConversionOptions::from_preset(preset, self.config.max_output_mib))
    }

    /// Convert a video into an SRV3 document inside `output_dir`
    ///
    /// # Arguments
    ///
    /// * `input` - Path to input video file
    /// * `output_dir` - Directory receiving the document
    /// * `video_opts` - Start offset, frame rate override and subtitles
    /// * `conv_opts` - Braille encoding options
    /// * `keep_images` - Whether to keep the extracted PNG frames
    pub fn convert_video(
        &self,
        input: &Path,
        output_dir: &Path,
        video_opts: &VideoOptions,
        conv_opts: &ConversionOptions,
        keep_images: bool,
    ) -> Result<ConversionSummary> {
        self.convert_video_with_detailed_progress(input, output_dir, video_opts, conv_opts, keep_images, |_| {})
    }

    /// Convert a video with detailed progress reporting
    ///
    /// # Example
    ///
    /// ```no_run
    /// use braillecue::{ConversionOptions, ProgressPhase, SubtitleConverter, VideoOptions};
    /// use std::path::Path;
    ///
    /// let converter = SubtitleConverter::new();
    /// converter.convert_video_with_detailed_progress(
    ///     Path::new("video.mp4"),
    ///     Path::new("output"),
    ///     &VideoOptions::default(),
    ///     &ConversionOptions::default(),
    ///     false,
    ///     |progress| match progress.phase {
    ///         ProgressPhase::DecodingFrames => println!("Extracting frames..."),
    ///         ProgressPhase::EncodingFrames => {
    ///             println!("Encoding: {}/{} ({:.1}%)", progress.completed, progress.total, progress.percentage)
    ///         }
    ///         ProgressPhase::Complete => println!("Done!"),
    ///     },
    /// ).unwrap();
    /// ```
    pub fn convert_video_with_detailed_progress<F>(
        &self,
        input: &Path,
        output_dir: &Path,
        video_opts: &VideoOptions,
        conv_opts: &ConversionOptions,
        keep_images: bool,
        progress_callback: F,
    ) -> Result<ConversionSummary>
    where
        F: Fn(Progress),
    {
        let stem = file_stem(input);
        let work_dir = output_dir.join(format!("{}_frames", stem));

        progress_callback(Progress::decoding_frames());
        let decoded = decode::decode_video(input, &work_dir, video_opts.start_ms)?;
        let fps = video_opts.fps.unwrap_or(decoded.fps);

        let summary = write_run(&decoded.frames, fps, output_dir, &stem, video_opts, conv_opts, &progress_callback);

        if !keep_images {
            decoded.frames.remove_files()?;
            // Leave the directory alone if anything else ended up in it.
            let _ = fs::remove_dir(&work_dir);
        }
        summary
    }

    /// Convert a directory of frame images (or a single image)
    ///
    /// Images are taken in file name order and played at `video_opts.fps`,
    /// or [`DEFAULT_IMAGE_FPS`] when unset.
    pub fn convert_images<F>(
        &self,
        input: &Path,
        output_dir: &Path,
        video_opts: &VideoOptions,
        conv_opts: &ConversionOptions,
        progress_callback: F,
    ) -> Result<ConversionSummary>
    where
        F: Fn(Progress),
    {
        let frames = if input.is_dir() {
            FrameSequence::from_dir(input)?
        } else if decode::is_frame_image(input) {
            FrameSequence::from_paths(vec![input.to_path_buf()])
        } else {
            bail!("{} is neither an image nor a directory of images", input.display());
        };
        let fps = video_opts.fps.unwrap_or(DEFAULT_IMAGE_FPS);
        write_run(&frames, fps, output_dir, &file_stem(input), video_opts, conv_opts, &progress_callback)
    }
}

impl Default for SubtitleConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("braillecue_output")
        .to_string()
}

fn write_run<S, F>(
    frames: &S,
    fps: f64,
    output_dir: &Path,
    stem: &str,
    video_opts: &VideoOptions,
    conv_opts: &ConversionOptions,
    progress_callback: &F,
) -> Result<ConversionSummary>
where
    S: FrameSource + ?Sized,
    F: Fn(Progress),
{
    let run = encode_frames_with_progress(frames, fps, conv_opts, progress_callback)?;

    let meta: Vec<MetaCue> = match &video_opts.subtitles {
        Some(path) => {
            let items = srt::read_srt(path)?;
            srt::meta_cues(&items, run.plan.output_fps, conv_opts.sub_ms_offset as f64)
        }
        None => Vec::new(),
    };

    let output_path = srv3::write_document(output_dir, stem, &run.cues, &run.palette, &run.geometry, &meta)?;
    progress_callback(Progress::complete(run.cues.len()));

    Ok(ConversionSummary {
        output_path,
        geometry: run.geometry,
        plan: run.plan,
        layers: run.layers,
        palette_size: run.palette.len(),
        cue_count: run.cues.len(),
        meta_cue_count: meta.len(),
        output_bytes: run.output_bytes(),
        truncated: run.truncated,
    })
}
