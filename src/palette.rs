//! 12-bit color quantization and the run-wide palette.

use serde::Serialize;
use std::collections::HashMap;

use crate::partition::{DotMask, DOTS};

/// Color quantized to 4 bits per channel, packed as `0xRGB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ColorId(u16);

impl ColorId {
    /// Sentinel for cells without lit dots.
    pub const BLACK: ColorId = ColorId(0);
    pub const WHITE: ColorId = ColorId(0xFFF);

    /// Packs already-quantized 4-bit channels.
    pub fn from_nibbles(r: u8, g: u8, b: u8) -> Self {
        Self(256 * u16::from(r & 0xF) + 16 * u16::from(g & 0xF) + u16::from(b & 0xF))
    }

    /// Quantizes a (possibly fractional) mean color.
    pub fn from_rgb(rgb: [f64; 3]) -> Self {
        let [r, g, b] = rgb.map(quantize_channel);
        Self::from_nibbles(r, g, b)
    }

    pub fn value(self) -> u16 {
        self.0
    }

    pub fn nibbles(self) -> (u8, u8, u8) {
        (((self.0 >> 8) & 0xF) as u8, ((self.0 >> 4) & 0xF) as u8, (self.0 & 0xF) as u8)
    }

    /// Three-digit hex form used by pen definitions, e.g. `#F80`.
    pub fn hex(self) -> String {
        format!("#{:03X}", self.0)
    }
}

impl From<u16> for ColorId {
    fn from(value: u16) -> Self {
        Self(value & 0xFFF)
    }
}

fn quantize_channel(channel: f64) -> u8 {
    (channel.clamp(0.0, 255.0) / 255.0 * 15.0).round_ties_even() as u8
}

/// Mean color of the lit dots quantized to a [`ColorId`].
///
/// An empty mask yields [`ColorId::BLACK`].
pub fn quantize_lit(colors: &[[u8; 3]; DOTS], lit: DotMask) -> ColorId {
    if lit.is_empty() {
        return ColorId::BLACK;
    }
    let mut sum = [0.0f64; 3];
    for dot in lit.iter() {
        for (acc, c) in sum.iter_mut().zip(colors[dot]) {
            *acc += f64::from(c);
        }
    }
    let n = f64::from(lit.count());
    ColorId::from_rgb(sum.map(|s| s / n))
}

/// First-seen ordered mapping from color to slot, shared by a whole run.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    slots: HashMap<ColorId, usize>,
    order: Vec<ColorId>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `color`, assigning the next free one on first sight.
    pub fn slot_for(&mut self, color: ColorId) -> usize {
        if let Some(&slot) = self.slots.get(&color) {
            return slot;
        }
        let slot = self.order.len();
        self.slots.insert(color, slot);
        self.order.push(color);
        slot
    }

    pub fn get(&self, color: ColorId) -> Option<usize> {
        self.slots.get(&color).copied()
    }

    pub fn color(&self, slot: usize) -> Option<ColorId> {
        self.order.get(slot).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(color, slot)` pairs in assignment order.
    pub fn entries(&self) -> impl Iterator<Item = (ColorId, usize)> + '_ {
        self.order.iter().enumerate().map(|(slot, &color)| (color, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_scaling() {
        assert_eq!(ColorId::from_rgb([255.0, 255.0, 255.0]), ColorId::WHITE);
        assert_eq!(ColorId::from_rgb([0.0, 0.0, 0.0]), ColorId::BLACK);
        assert_eq!(ColorId::from_rgb([255.0, 0.0, 0.0]).value(), 0xF00);
        // 136 / 17 = 8 exactly
        assert_eq!(ColorId::from_rgb([136.0, 17.0, 0.0]).value(), 0x810);
    }

    #[test]
    fn halfway_rounds_to_even() {
        // 8.5 / 17 = 0.5 -> 0, 25.5 / 17 = 1.5 -> 2
        assert_eq!(ColorId::from_rgb([8.5, 25.5, 0.0]).nibbles(), (0, 2, 0));
    }

    #[test]
    fn hex_is_three_digits() {
        assert_eq!(ColorId::WHITE.hex(), "#FFF");
        assert_eq!(ColorId::BLACK.hex(), "#000");
        assert_eq!(ColorId::from_nibbles(0, 10, 3).hex(), "#0A3");
    }

    #[test]
    fn empty_mask_is_black() {
        let colors = [[200, 10, 10]; DOTS];
        assert_eq!(quantize_lit(&colors, DotMask::EMPTY), ColorId::BLACK);
    }

    #[test]
    fn mean_uses_only_lit_dots() {
        let mut colors = [[0, 0, 0]; DOTS];
        colors[1] = [255, 0, 0];
        colors[6] = [255, 0, 0];
        let id = quantize_lit(&colors, DotMask::from_indices(&[1, 6]));
        assert_eq!(id.value(), 0xF00);
        let mixed = quantize_lit(&colors, DotMask::from_indices(&[0, 1]));
        // mean red 127.5 -> 7.5 -> 8
        assert_eq!(mixed.nibbles(), (8, 0, 0));
    }

    #[test]
    fn slots_follow_first_sight() {
        let mut palette = Palette::new();
        let ids: Vec<ColorId> = [0x123, 0xFFF, 0x123, 0x000, 0xFFF, 0xABC]
            .into_iter()
            .map(ColorId::from)
            .collect();
        let slots: Vec<usize> = ids.iter().map(|&id| palette.slot_for(id)).collect();
        assert_eq!(slots, vec![0, 1, 0, 2, 1, 3]);
        assert_eq!(palette.len(), 4);
        let entries: Vec<(u16, usize)> = palette.entries().map(|(c, s)| (c.value(), s)).collect();
        assert_eq!(entries, vec![(0x123, 0), (0xFFF, 1), (0x000, 2), (0xABC, 3)]);
        assert_eq!(palette.color(2), Some(ColorId::BLACK));
        assert_eq!(palette.get(ColorId::from(0x777)), None);
    }
}
