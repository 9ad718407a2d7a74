//! Timed cues and temporal deduplication.

use serde::Serialize;
use std::fmt;

/// One timed block of rendered braille text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    /// Start in milliseconds (fractional until serialized).
    pub start: f64,
    /// Duration in milliseconds (fractional until serialized).
    pub duration: f64,
    /// Pen of the cue's opening color run.
    pub palette_slot: usize,
    pub text: String,
    /// Brightness layer, 0 being the darkest.
    pub layer: usize,
}

impl Cue {
    /// Start rounded up to whole milliseconds.
    pub fn start_ms(&self) -> i64 {
        self.start.ceil() as i64
    }

    /// Duration rounded down to whole milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.duration.floor() as i64
    }

    /// Bytes this cue occupies in the document body, line break included.
    pub fn serialized_len(&self) -> usize {
        self.to_string().len() + 1
    }

    fn continues(&self, palette_slot: usize, text: &str) -> bool {
        self.palette_slot == palette_slot && self.text == text
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<p t={} d={} wp=0 ws=0 p={}>{}</p>",
            self.start_ms(),
            self.duration_ms(),
            self.palette_slot,
            self.text
        )
    }
}

/// Collects one layer's cues, folding repeats into the previous cue.
#[derive(Debug, Default)]
pub struct CueAggregator {
    cues: Vec<Cue>,
}

impl CueAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether pushing `cue` would only extend the previous one.
    pub fn would_merge(&self, cue: &Cue) -> bool {
        self.cues
            .last()
            .is_some_and(|last| last.continues(cue.palette_slot, &cue.text))
    }

    /// Appends `cue`, or adds its duration to the previous cue if both render
    /// the same. Returns `true` when a new cue was created.
    pub fn push(&mut self, cue: Cue) -> bool {
        if let Some(last) = self.cues.last_mut() {
            if last.continues(cue.palette_slot, &cue.text) {
                last.duration += cue.duration;
                return false;
            }
        }
        self.cues.push(cue);
        true
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn last(&self) -> Option<&Cue> {
        self.cues.last()
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn into_cues(self) -> Vec<Cue> {
        self.cues
    }
}

/// Aggregates an ordered run of cues in one pass.
pub fn aggregate<I: IntoIterator<Item = Cue>>(cues: I) -> Vec<Cue> {
    let mut aggregator = CueAggregator::new();
    for cue in cues {
        aggregator.push(cue);
    }
    aggregator.into_cues()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(start: f64, slot: usize, text: &str) -> Cue {
        Cue { start, duration: 41.7, palette_slot: slot, text: text.to_string(), layer: 0 }
    }

    #[test]
    fn renders_paragraph() {
        let c = Cue { start: 83.4, duration: 41.7, palette_slot: 3, text: "⣿<s p=1>⣀".into(), layer: 0 };
        assert_eq!(c.to_string(), "<p t=84 d=41 wp=0 ws=0 p=3>⣿<s p=1>⣀</p>");
        assert_eq!(c.serialized_len(), c.to_string().len() + 1);
    }

    #[test]
    fn three_identical_frames_become_one_cue() {
        let cues = aggregate(vec![cue(0.0, 0, "⣿"), cue(41.7, 0, "⣿"), cue(83.4, 0, "⣿")]);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start, 0.0);
        assert!((cues[0].duration - 3.0 * 41.7).abs() < 1e-9);
        assert_eq!(cues[0].duration_ms(), 125);
    }

    #[test]
    fn slot_change_breaks_run() {
        let cues = aggregate(vec![cue(0.0, 0, "⣿"), cue(41.7, 1, "⣿"), cue(83.4, 1, "⣿")]);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].palette_slot, 1);
        assert!((cues[1].duration - 83.4).abs() < 1e-9);
    }

    #[test]
    fn no_adjacent_duplicates_survive() {
        let texts = ["a", "a", "b", "b", "b", "a", "c", "c", "a"];
        let cues = aggregate(texts.iter().enumerate().map(|(i, t)| cue(i as f64 * 41.7, 0, t)));
        let rendered: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rendered, vec!["a", "b", "a", "c", "a"]);
        assert!(cues.windows(2).all(|w| !(w[0].palette_slot == w[1].palette_slot && w[0].text == w[1].text)));
    }

    #[test]
    fn would_merge_matches_push() {
        let mut aggregator = CueAggregator::new();
        let first = cue(0.0, 2, "⠁");
        assert!(!aggregator.would_merge(&first));
        assert!(aggregator.push(first));
        let repeat = cue(41.7, 2, "⠁");
        assert!(aggregator.would_merge(&repeat));
        assert!(!aggregator.push(repeat));
        assert_eq!(aggregator.len(), 1);
    }
}
