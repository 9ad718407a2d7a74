//! Cell encoding and frame serialization.
//!
//! A prepared frame holds exactly one pixel per dot (`2·cols × 4·rows`).
//! Glyph and color of every cell are computed in parallel per row; palette
//! slots are then committed sequentially in row-major order so slot numbers
//! never depend on scheduling.

use image::imageops::{self, FilterType};
use image::RgbImage;
use rayon::prelude::*;
use std::borrow::Cow;

use crate::geometry::GeometrySettings;
use crate::palette::{quantize_lit, ColorId, Palette};
use crate::partition::{luma, partition_layers, DotMask, DOTS};

/// Braille pattern blank (U+2800).
pub const BRAILLE_BASE: u32 = 0x2800;

/// Marker returning to the pen the cue opened with.
pub const RESET_MARKER: &str = "<s>";

/// Braille bit for each dot index (row-major within the 2×4 cell).
///
/// ```text
///  dot 0 1     bit 0 3
///  dot 2 3  →  bit 1 4
///  dot 4 5     bit 2 5
///  dot 6 7     bit 6 7
/// ```
const DOT_WEIGHTS: [u32; DOTS] = [1 << 0, 1 << 3, 1 << 1, 1 << 4, 1 << 2, 1 << 5, 1 << 6, 1 << 7];

/// Braille character showing the dots of `lit`.
pub fn glyph(lit: DotMask) -> char {
    let bits = lit.iter().fold(0, |acc, dot| acc | DOT_WEIGHTS[dot]);
    char::from_u32(BRAILLE_BASE + bits).unwrap_or(' ')
}

/// Colors of the eight dots of cell (`col`, `row`), row-major.
pub fn cell_colors(grid: &RgbImage, col: u32, row: u32) -> [[u8; 3]; DOTS] {
    std::array::from_fn(|dot| {
        let x = 2 * col + (dot % 2) as u32;
        let y = 4 * row + (dot / 2) as u32;
        grid.get_pixel(x, y).0
    })
}

/// Color and glyph of one cell for brightness `layer` out of `layers`.
pub fn encode_cell(colors: &[[u8; 3]; DOTS], layers: usize, layer: usize) -> (ColorId, char) {
    let lumas = colors.map(luma);
    let lit = partition_layers(&lumas, layers)
        .get(layer)
        .copied()
        .unwrap_or(DotMask::EMPTY);
    (quantize_lit(colors, lit), glyph(lit))
}

/// Orients and resamples a frame to one pixel per dot.
pub fn prepare_grid<'a>(frame: &'a RgbImage, geometry: &GeometrySettings) -> Cow<'a, RgbImage> {
    let oriented: Cow<'a, RgbImage> = if geometry.display_mode.is_portrait() {
        Cow::Owned(imageops::rotate270(frame))
    } else {
        Cow::Borrowed(frame)
    };
    let (target_w, target_h) = geometry.dot_grid_size();
    if oriented.dimensions() == (target_w, target_h) {
        return oriented;
    }
    Cow::Owned(imageops::resize(&*oriented, target_w, target_h, FilterType::Lanczos3))
}

/// Serialized braille rendering of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Slot of the first cell; the cue's own pen.
    pub first_slot: Option<usize>,
    pub text: String,
}

/// Encodes a prepared grid, assigning palette slots on first sight.
pub fn encode_frame(palette: &mut Palette, grid: &RgbImage, layers: usize, layer: usize) -> EncodedFrame {
    let cols = grid.width() / 2;
    let rows = grid.height() / 4;

    let cells: Vec<Vec<(ColorId, char)>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            (0..cols)
                .map(|col| encode_cell(&cell_colors(grid, col, row), layers, layer))
                .collect()
        })
        .collect();

    let mut text = String::with_capacity((rows * (cols * 3 + 1)) as usize);
    let mut prev_color: Option<ColorId> = None;
    let mut first_slot: Option<usize> = None;
    for (row_idx, row) in cells.iter().enumerate() {
        if row_idx > 0 {
            text.push('\n');
        }
        for &(color, ch) in row {
            if prev_color != Some(color) {
                let slot = palette.slot_for(color);
                match first_slot {
                    None => first_slot = Some(slot),
                    Some(first) if first == slot => text.push_str(RESET_MARKER),
                    Some(_) => text.push_str(&format!("<s p={}>", slot)),
                }
                prev_color = Some(color);
            }
            text.push(ch);
        }
    }

    EncodedFrame { first_slot, text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DisplayMode, FontTier};
    use image::Rgb;

    /// Grid of solid-colored cells, `cells[row][col]`.
    fn solid_cells(cells: &[&[[u8; 3]]]) -> RgbImage {
        let rows = cells.len() as u32;
        let cols = cells[0].len() as u32;
        RgbImage::from_fn(2 * cols, 4 * rows, |x, y| Rgb(cells[(y / 4) as usize][(x / 2) as usize]))
    }

    const RED: [u8; 3] = [255, 0, 0];
    const BLUE: [u8; 3] = [0, 0, 255];
    const WHITE: [u8; 3] = [255, 255, 255];

    #[test]
    fn glyph_bit_layout() {
        assert_eq!(glyph(DotMask::EMPTY), '\u{2800}');
        assert_eq!(glyph(DotMask::FULL), '\u{28FF}');
        assert_eq!(glyph(DotMask::from_indices(&[0])), '\u{2801}');
        assert_eq!(glyph(DotMask::from_indices(&[1])), '\u{2808}');
        assert_eq!(glyph(DotMask::from_indices(&[2])), '\u{2802}');
        assert_eq!(glyph(DotMask::from_indices(&[6, 7])), '\u{28C0}');
        // left column only: dots 1, 2, 3, 7
        assert_eq!(glyph(DotMask::from_indices(&[0, 2, 4, 6])), '\u{2847}');
    }

    #[test]
    fn white_cell_fills_the_glyph() {
        let grid = solid_cells(&[&[WHITE]]);
        let mut palette = Palette::new();
        let encoded = encode_frame(&mut palette, &grid, 1, 0);
        assert_eq!(encoded.text, "\u{28FF}");
        assert_eq!(encoded.first_slot, Some(0));
        assert_eq!(palette.get(ColorId::WHITE), Some(0));
        assert_eq!(ColorId::WHITE.value(), 4095);
    }

    #[test]
    fn cell_colors_follow_dot_order() {
        let grid = RgbImage::from_fn(2, 4, |x, y| Rgb([x as u8, y as u8, 0]));
        let colors = cell_colors(&grid, 0, 0);
        assert_eq!(colors[0], [0, 0, 0]);
        assert_eq!(colors[1], [1, 0, 0]);
        assert_eq!(colors[2], [0, 1, 0]);
        assert_eq!(colors[7], [1, 3, 0]);
    }

    #[test]
    fn half_lit_cell() {
        let mut colors = [[0, 0, 0]; DOTS];
        for dot in 4..DOTS {
            colors[dot] = [255, 255, 255];
        }
        let (color, ch) = encode_cell(&colors, 1, 0);
        assert_eq!(color, ColorId::WHITE);
        // dots 4..8 -> bits 2, 5, 6, 7
        assert_eq!(ch, '\u{28E4}');
    }

    #[test]
    fn markup_returns_to_opening_pen() {
        let grid = solid_cells(&[&[RED, BLUE, RED, RED], &[RED, RED, BLUE, BLUE]]);
        let mut palette = Palette::new();
        let encoded = encode_frame(&mut palette, &grid, 1, 0);
        assert_eq!(encoded.first_slot, Some(0));
        assert_eq!(encoded.text, "⣿<s p=1>⣿<s>⣿⣿\n⣿⣿<s p=1>⣿⣿");
        assert!(!encoded.text.ends_with('\n'));
    }

    #[test]
    fn opening_pen_follows_palette_history() {
        let mut palette = Palette::new();
        palette.slot_for(ColorId::from(0xF00));
        let grid = solid_cells(&[&[BLUE, RED, BLUE]]);
        let encoded = encode_frame(&mut palette, &grid, 1, 0);
        assert_eq!(encoded.first_slot, Some(1));
        assert_eq!(encoded.text, "⣿<s p=0>⣿<s>⣿");
    }

    #[test]
    fn same_frame_twice_is_identical() {
        let grid = RgbImage::from_fn(12, 8, |x, y| Rgb([(x * 20) as u8, (y * 30) as u8, ((x + y) * 9) as u8]));
        let mut palette = Palette::new();
        let first = encode_frame(&mut palette, &grid, 1, 0);
        let size = palette.len();
        let second = encode_frame(&mut palette, &grid, 1, 0);
        assert_eq!(first, second);
        assert_eq!(palette.len(), size);
    }

    #[test]
    fn slot_order_is_row_major() {
        let green = [0, 255, 0];
        let grid = solid_cells(&[&[RED, BLUE], &[green, RED]]);
        let mut palette = Palette::new();
        encode_frame(&mut palette, &grid, 1, 0);
        let order: Vec<u16> = palette.entries().map(|(c, _)| c.value()).collect();
        assert_eq!(order, vec![0xF00, 0x00F, 0x0F0]);
    }

    #[test]
    fn layers_split_the_cell() {
        let mut colors = [[0, 0, 0]; DOTS];
        for (dot, c) in colors.iter_mut().enumerate() {
            let v = (dot * 36) as u8;
            *c = [v, v, v];
        }
        let (_, dark) = encode_cell(&colors, 2, 0);
        let (_, bright) = encode_cell(&colors, 2, 1);
        let dark_bits = dark as u32 - BRAILLE_BASE;
        let bright_bits = bright as u32 - BRAILLE_BASE;
        assert_eq!(dark_bits & bright_bits, 0);
        assert_ne!(bright_bits, 0);
    }

    #[test]
    fn prepare_resamples_to_dot_grid() {
        let geometry = GeometrySettings {
            display_mode: DisplayMode::Standard,
            font_tier: FontTier::Default,
            char_aspect_ratio: 35.0 / 58.0,
            rows: 3,
            cols: 5,
        };
        let frame = RgbImage::from_pixel(64, 36, Rgb(RED));
        let grid = prepare_grid(&frame, &geometry);
        assert_eq!(grid.dimensions(), (10, 12));

        let exact = RgbImage::from_pixel(10, 12, Rgb(RED));
        assert!(matches!(prepare_grid(&exact, &geometry), Cow::Borrowed(_)));
    }

    #[test]
    fn portrait_rotates_counter_clockwise() {
        let geometry = GeometrySettings {
            display_mode: DisplayMode::Portrait,
            font_tier: FontTier::Default,
            char_aspect_ratio: 35.0 / 58.0,
            rows: 1,
            cols: 2,
        };
        // 4 wide, 4 tall source; top-right pixel marked.
        let mut frame = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        frame.put_pixel(3, 0, Rgb(WHITE));
        let grid = prepare_grid(&frame, &geometry);
        assert_eq!(grid.dimensions(), (4, 4));
        // After a counter-clockwise quarter turn the top-right corner is top-left.
        assert_eq!(grid.get_pixel(0, 0).0, WHITE);
    }
}
