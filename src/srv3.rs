//! SRV3 (YouTube timed text, format 3) document shell.
//!
//! The head declares one pen per palette slot plus two windows: id 0 holds
//! the braille frames, id 1 the re-timed regular subtitles.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cue::Cue;
use crate::geometry::{DisplayMode, FontTier, GeometrySettings};
use crate::palette::Palette;
use crate::srt::MetaCue;

pub const FILE_EXTENSION: &str = "srv3";

/// Edge type 3: uniform outline, which fills the gaps between dots.
const EDGE_TYPE: u8 = 3;
/// Font style 3: monospaced sans-serif.
const FONT_STYLE: u8 = 3;

/// Font size percentage for a tier.
pub fn font_size(tier: FontTier) -> u32 {
    match tier {
        FontTier::Default => 100,
        FontTier::Small => 75,
    }
}

/// Window position and style attributes for the braille window.
fn frame_window(mode: DisplayMode) -> (&'static str, &'static str) {
    match mode {
        DisplayMode::Portrait => (r#"ap="4" ah="50" av="50""#, r#"ju="2" pd="3" sd="1""#),
        DisplayMode::Narrow | DisplayMode::Standard | DisplayMode::Wide => {
            (r#"ap="4" ah="50" av="50""#, r#"ju="2" pd="0" sd="0""#)
        }
    }
}

/// `<stem>.srv3` for standard output, `<stem>.<mode>.srv3` otherwise.
pub fn output_file_name(stem: &str, geometry: &GeometrySettings) -> String {
    match geometry.display_mode {
        DisplayMode::Standard => format!("{stem}.{FILE_EXTENSION}"),
        mode => format!("{stem}.{}.{FILE_EXTENSION}", mode.name()),
    }
}

fn render_head(out: &mut String, palette: &Palette, geometry: &GeometrySettings) {
    let size = font_size(geometry.font_tier);
    out.push_str("<head>\n");
    for (color, slot) in palette.entries() {
        let hex = color.hex();
        out.push_str(&format!(
            "<pen id=\"{slot}\" fc=\"{hex}\" fo=\"254\" bo=\"0\" et=\"{EDGE_TYPE}\" ec=\"{hex}\" fs=\"{FONT_STYLE}\" sz=\"{size}\"/>\n"
        ));
    }
    let (position, style) = frame_window(geometry.display_mode);
    out.push_str(&format!("<wp id=\"0\" {position}/>\n"));
    out.push_str("<wp id=\"1\" ap=\"7\" ah=\"50\" av=\"100\"/>\n");
    out.push_str(&format!("<ws id=\"0\" {style}/>\n"));
    out.push_str("<ws id=\"1\" ju=\"2\" pd=\"0\" sd=\"0\"/>\n");
    out.push_str("</head>\n");
}

/// Renders the complete document.
pub fn render_document(cues: &[Cue], palette: &Palette, geometry: &GeometrySettings, meta: &[MetaCue]) -> String {
    let body_len: usize = cues.iter().map(Cue::serialized_len).sum();
    let mut out = String::with_capacity(body_len + palette.len() * 96 + 512);
    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<timedtext format=\"3\">\n");
    render_head(&mut out, palette, geometry);
    out.push_str("<body>\n");
    for cue in cues {
        out.push_str(&format!("{cue}\n"));
    }
    for piece in meta {
        out.push_str(&format!("{piece}\n"));
    }
    out.push_str("</body>\n</timedtext>\n");
    out
}

/// Writes the document into `out_dir`, returning its path.
pub fn write_document(
    out_dir: &Path,
    stem: &str,
    cues: &[Cue],
    palette: &Palette,
    geometry: &GeometrySettings,
    meta: &[MetaCue],
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let path = out_dir.join(output_file_name(stem, geometry));
    let document = render_document(cues, palette, geometry, meta);
    fs::write(&path, &document).with_context(|| format!("writing {}", path.display()))?;
    log::info!("wrote {} ({} bytes, {} cues)", path.display(), document.len(), cues.len());
    Ok(path)
}
