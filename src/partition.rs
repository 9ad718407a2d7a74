//! Brightness partitioning of a 2×4 dot cell.
//!
//! Each cell carries eight dots. The partitioner ranks them by luma and picks
//! how many of the darkest ones stay dark, minimizing the luma thrown away
//! plus the spread of the dots that remain lit around their median.

/// Dots per cell (2 columns × 4 rows).
pub const DOTS: usize = 8;

/// Upper bound on brightness layers: one dot per band.
pub const MAX_LAYERS: usize = DOTS;

const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Set of lit dots, bit `i` standing for dot `i` (row-major, `i = 2 * row + col`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct DotMask(pub u8);

impl DotMask {
    pub const EMPTY: DotMask = DotMask(0);
    pub const FULL: DotMask = DotMask(0xFF);

    pub fn from_indices(indices: &[usize]) -> Self {
        Self(indices.iter().fold(0u8, |acc, &i| acc | (1 << i)))
    }

    #[inline]
    pub fn contains(self, dot: usize) -> bool {
        dot < DOTS && self.0 & (1 << dot) != 0
    }

    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_disjoint(self, other: DotMask) -> bool {
        self.0 & other.0 == 0
    }

    pub fn union(self, other: DotMask) -> DotMask {
        DotMask(self.0 | other.0)
    }

    /// Lit dot indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..DOTS).filter(move |&i| self.contains(i))
    }
}

/// ITU-R BT.601 luma of one RGB sample.
#[inline]
pub fn luma(rgb: [u8; 3]) -> f64 {
    LUMA_WEIGHTS
        .iter()
        .zip(rgb)
        .map(|(w, c)| w * f64::from(c))
        .sum()
}

/// Dot indices ordered by ascending luma. Equal values keep index order.
pub fn rank_dots(lumas: &[f64; DOTS]) -> [usize; DOTS] {
    let mut order: [usize; DOTS] = std::array::from_fn(|i| i);
    order.sort_by(|&a, &b| lumas[a].total_cmp(&lumas[b]));
    order
}

fn median_deviation(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let mid = n / 2;
    let median = if n % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    };
    sorted.iter().map(|v| (v - median).abs()).sum()
}

/// Number of dark dots `k` for luma values sorted ascending.
///
/// Cost of a split is the summed luma of the `k` darkest values plus the
/// absolute deviation of the rest from their median. The smallest `k`
/// reaching the minimum wins. At least one value is always left lit.
pub fn best_split(sorted: &[f64]) -> usize {
    let mut best_k = 0;
    let mut best_cost = f64::INFINITY;
    let mut dark_sum = 0.0;
    for (k, &value) in sorted.iter().enumerate() {
        let cost = dark_sum + median_deviation(&sorted[k..]);
        if cost < best_cost {
            best_cost = cost;
            best_k = k;
        }
        dark_sum += value;
    }
    best_k
}

/// Lit dots for a single-layer cell.
pub fn lit_dots(lumas: &[f64; DOTS]) -> DotMask {
    partition_layers(lumas, 1)[0]
}

/// Rank range `[lo, hi)` covered by `layer` out of `layers` bands.
pub fn layer_bounds(layers: usize, layer: usize) -> (usize, usize) {
    let step = DOTS as f64 / layers as f64;
    let lo = (step * layer as f64).round_ties_even() as usize;
    let hi = (step * (layer + 1) as f64).round_ties_even() as usize;
    (lo.min(DOTS), hi.min(DOTS))
}

/// Lit dots per brightness layer, index 0 being the darkest band.
///
/// Bands are solved brightest first. Whatever a brighter band leaves dark is
/// handed down and appended to the next darker band's candidates, so a dot
/// is lit by at most one layer.
pub fn partition_layers(lumas: &[f64; DOTS], layers: usize) -> Vec<DotMask> {
    let order = rank_dots(lumas);
    let mut masks = vec![DotMask::EMPTY; layers];
    (0..layers).rev().fold(0usize, |handed_down, layer| {
        let (lo, hi) = layer_bounds(layers, layer);
        let window = &order[lo..(hi + handed_down).min(DOTS)];

        let mut sorted = [0.0; DOTS];
        for (slot, &dot) in sorted.iter_mut().zip(window) {
            *slot = lumas[dot];
        }
        let k = best_split(&sorted[..window.len()]);
        masks[layer] = DotMask::from_indices(&window[k..]);
        k
    });
    masks
}
