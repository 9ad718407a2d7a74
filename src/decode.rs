//! Media decoding through `ffmpeg`/`ffprobe` and image directories.
//!
//! Frames are extracted to a PNG sequence and decoded lazily, one at a time,
//! as the encoder asks for them.

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command as ProcCommand, Stdio};
use walkdir::WalkDir;

use crate::error::{EncodeError, EncodeResult};
use crate::source::FrameSource;

/// Image extensions picked up from frame directories.
pub const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Whether `path` looks like a single frame image.
pub fn is_frame_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sorted image files of a directory, decoded on demand.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    paths: Vec<PathBuf>,
}

impl FrameSequence {
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Collects the frame images directly inside `dir`, in file name order.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_frame_image(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            bail!("no frame images found in {}", dir.display());
        }
        log::debug!("found {} frames in {}", paths.len(), dir.display());
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Deletes every frame file of the sequence.
    pub fn remove_files(&self) -> Result<()> {
        for path in &self.paths {
            fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}

impl FrameSource for FrameSequence {
    fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn frame(&self, index: usize) -> EncodeResult<Cow<'_, RgbImage>> {
        let path = self.paths.get(index).ok_or_else(|| EncodeError::Decode {
            index,
            message: format!("index out of range for {} frames", self.paths.len()),
        })?;
        let img = image::open(path).map_err(|e| EncodeError::Decode {
            index,
            message: format!("{}: {}", path.display(), e),
        })?;
        Ok(Cow::Owned(img.to_rgb8()))
    }
}

/// Frames extracted from a video together with its native rate.
#[derive(Debug, Clone)]
pub struct DecodedVideo {
    pub frames: FrameSequence,
    pub fps: f64,
}

/// Parses an ffprobe rate such as `30000/1001` or `25`.
pub fn parse_frame_rate(text: &str) -> Option<f64> {
    let text = text.trim();
    let rate = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => text.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Native frame rate of the first video stream.
pub fn probe_fps(input: &Path) -> Result<f64> {
    let input_str = input
        .to_str()
        .ok_or_else(|| anyhow!("video path is not valid UTF-8: {}", input.display()))?;

    let output = ProcCommand::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=r_frame_rate",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            input_str,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context("running ffprobe")?;

    if !output.status.success() {
        bail!("ffprobe failed on {}", input.display());
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let fps = text
        .lines()
        .find_map(parse_frame_rate)
        .ok_or_else(|| anyhow!("no video stream found in {}", input.display()))?;
    log::info!("probed {} at {:.3} fps", input.display(), fps);
    Ok(fps)
}

/// Extracts every frame from `start_ms` onward as `frame_NNNNN.png` in `out_dir`.
pub fn extract_video_frames(input: &Path, out_dir: &Path, start_ms: u64) -> Result<()> {
    let input_str = input
        .to_str()
        .ok_or_else(|| anyhow!("video path is not valid UTF-8: {}", input.display()))?;
    let out_pattern = out_dir.join("frame_%05d.png");
    let out_str = out_pattern
        .to_str()
        .ok_or_else(|| anyhow!("output path is not valid UTF-8: {}", out_dir.display()))?;

    let mut ffmpeg_args: Vec<String> = vec!["-loglevel".into(), "error".into()];
    if start_ms > 0 {
        ffmpeg_args.push("-ss".into());
        ffmpeg_args.push(format!("{:.3}", start_ms as f64 / 1000.0));
    }
    ffmpeg_args.push("-i".into());
    ffmpeg_args.push(input_str.to_string());
    ffmpeg_args.push(out_str.to_string());

    log::debug!("ffmpeg {}", ffmpeg_args.join(" "));
    let status = ProcCommand::new("ffmpeg")
        .args(&ffmpeg_args)
        .status()
        .context("running ffmpeg")?;

    if !status.success() {
        bail!("ffmpeg failed to extract frames from {}", input.display());
    }
    Ok(())
}

/// Probes and extracts `input` into `work_dir`.
pub fn decode_video(input: &Path, work_dir: &Path, start_ms: u64) -> Result<DecodedVideo> {
    fs::create_dir_all(work_dir).with_context(|| format!("creating {}", work_dir.display()))?;
    let fps = probe_fps(input)?;
    extract_video_frames(input, work_dir, start_ms)?;
    let frames = FrameSequence::from_dir(work_dir)?;
    log::info!("extracted {} frames from {}", frames.len(), input.display());
    Ok(DecodedVideo { frames, fps })
}
