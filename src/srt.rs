//! Regular subtitles re-timed onto the braille frame grid.
//!
//! Items from an SRT file are cut at every output frame boundary so that
//! they interleave with the braille cues instead of being hidden behind them.

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;

/// One parsed SRT entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SrtItem {
    pub start_ms: f64,
    pub end_ms: f64,
    pub text: String,
}

/// A caption piece rendered in the caption window.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaCue {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

impl fmt::Display for MetaCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<p t={} d={} wp=1 ws=1>{}</p>",
            self.start.ceil() as i64,
            self.duration.floor() as i64,
            escape_xml(&self.text)
        )
    }
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Parses `HH:MM:SS,mmm` (a `.` separator is accepted too) into milliseconds.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let s = s.trim();
    let (clock, millis) = s.split_once([',', '.']).unwrap_or((s, "0"));
    let mut parts = clock.split(':');
    let h: u64 = parts.next()?.trim().parse().ok()?;
    let m: u64 = parts.next()?.trim().parse().ok()?;
    let sec: u64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let ms: u64 = millis.trim().parse().ok()?;
    Some(((h * 60 + m) * 60 + sec) as f64 * 1000.0 + ms as f64)
}

pub fn parse_srt(content: &str) -> Result<Vec<SrtItem>> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut items = Vec::new();
    for (block_idx, block) in content.split("\n\n").enumerate() {
        let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            continue;
        }
        let timing_idx = lines
            .iter()
            .position(|l| l.contains("-->"))
            .ok_or_else(|| anyhow!("subtitle block {} has no timing line", block_idx + 1))?;
        let (from, to) = lines[timing_idx]
            .split_once("-->")
            .ok_or_else(|| anyhow!("malformed timing in block {}", block_idx + 1))?;
        // Position hints such as "X1:..." may trail the end time.
        let to = to.split_whitespace().next().unwrap_or_default();
        let start_ms = parse_timestamp(from).ok_or_else(|| anyhow!("bad start time '{}' in block {}", from.trim(), block_idx + 1))?;
        let end_ms = parse_timestamp(to).ok_or_else(|| anyhow!("bad end time '{}' in block {}", to, block_idx + 1))?;
        items.push(SrtItem {
            start_ms,
            end_ms,
            text: lines[timing_idx + 1..].join("\n"),
        });
    }
    Ok(items)
}

pub fn read_srt(path: &Path) -> Result<Vec<SrtItem>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading subtitles {}", path.display()))?;
    parse_srt(&content).with_context(|| format!("parsing subtitles {}", path.display()))
}

/// Cuts `item` at each output frame boundary.
pub fn split_item(item: &SrtItem, fps: f64, offset_ms: f64) -> Vec<MetaCue> {
    let frame = 1000.0 / fps;
    let mut pieces = Vec::new();
    let mut start = item.start_ms;
    let mut boundary = frame * ((start - offset_ms) / frame + 1.0).floor() + offset_ms;
    while boundary < item.end_ms {
        pieces.push(MetaCue { start, duration: boundary - start, text: item.text.clone() });
        start = boundary;
        boundary += frame;
    }
    if start < item.end_ms {
        pieces.push(MetaCue { start, duration: item.end_ms - start, text: item.text.clone() });
    }
    pieces
}

pub fn meta_cues(items: &[SrtItem], fps: f64, offset_ms: f64) -> Vec<MetaCue> {
    items.iter().flat_map(|item| split_item(item, fps, offset_ms)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\r\n00:00:00,150 --> 00:00:00,420\r\nHello\r\n\r\n2\r\n00:01:02,003 --> 00:01:03,000 X1:10\r\nTwo\r\nlines\r\n";

    #[test]
    fn timestamps() {
        assert_eq!(parse_timestamp("00:00:01,500"), Some(1500.0));
        assert_eq!(parse_timestamp("01:02:03.004"), Some(3_723_004.0));
        assert_eq!(parse_timestamp("garbage"), None);
        assert_eq!(parse_timestamp("00:00:01:00,000"), None);
    }

    #[test]
    fn parses_blocks() {
        let items = parse_srt(SAMPLE).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], SrtItem { start_ms: 150.0, end_ms: 420.0, text: "Hello".into() });
        assert_eq!(items[1].start_ms, 62_003.0);
        assert_eq!(items[1].end_ms, 63_000.0);
        assert_eq!(items[1].text, "Two\nlines");
    }

    #[test]
    fn missing_timing_is_an_error() {
        assert!(parse_srt("1\nno timing here\n").is_err());
    }

    #[test]
    fn splits_on_frame_boundaries() {
        let item = SrtItem { start_ms: 150.0, end_ms: 420.0, text: "Hi".into() };
        let pieces = split_item(&item, 10.0, 0.0);
        let spans: Vec<(f64, f64)> = pieces.iter().map(|p| (p.start, p.duration)).collect();
        assert_eq!(spans, vec![(150.0, 50.0), (200.0, 100.0), (300.0, 100.0), (400.0, 20.0)]);
        assert_eq!(pieces[0].to_string(), "<p t=150 d=50 wp=1 ws=1>Hi</p>");
    }

    #[test]
    fn offset_shifts_boundaries() {
        let item = SrtItem { start_ms: 0.0, end_ms: 250.0, text: "x".into() };
        let pieces = split_item(&item, 10.0, 30.0);
        let starts: Vec<f64> = pieces.iter().map(|p| p.start).collect();
        assert_eq!(starts, vec![0.0, 30.0, 130.0, 230.0]);
    }

    #[test]
    fn text_is_escaped() {
        let cue = MetaCue { start: 0.0, duration: 10.0, text: "a < b & c".into() };
        assert_eq!(cue.to_string(), "<p t=0 d=10 wp=1 ws=1>a &lt; b &amp; c</p>");
    }
}
