use std::cmp::Ordering;

use godisk_api::DiskSegment;
use serde::{Deserialize, Serialize};

/// Tile budget of the whole-disk usage map.
pub const DISK_TILE_BUDGET: usize = 100;
/// Tile budget of the extended-partition usage map.
pub const EXTENDED_TILE_BUDGET: usize = 60;
pub const FREE_TILE_KIND: &str = "FREE";
pub const FREE_TILE_LABEL: &str = "libre";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One cell of a usage map.
pub struct Tile {
    pub kind: String,
    pub label: String,
    /// Hover text: `label • kind • pct%  [start..end]`.
    pub tip: String,
}

impl Tile {
    fn free() -> Self {
        Self {
            kind: FREE_TILE_KIND.to_string(),
            label: FREE_TILE_LABEL.to_string(),
            tip: FREE_TILE_LABEL.to_string(),
        }
    }

    fn for_segment(segment: &DiskSegment) -> Self {
        let label = if segment.label.trim().is_empty() {
            segment.kind.clone()
        } else {
            segment.label.clone()
        };
        let tip = format!(
            "{label} • {} • {:.2}%  [{}..{}]",
            segment.kind, segment.percent, segment.start, segment.end
        );
        Self {
            kind: segment.kind.clone(),
            label,
            tip,
        }
    }
}

fn by_error_descending(errors: &[f64]) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    |left, right| {
        errors[*right]
            .partial_cmp(&errors[*left])
            .unwrap_or(Ordering::Equal)
    }
}

/// Splits `budget` tiles across `percents` by largest-remainder apportionment.
///
/// Percents are normalized by their positive sum; non-positive entries get no
/// tiles. After rounding, surplus tiles go to the entries with the largest
/// rounding error and excess tiles come off the most negative error, ties in
/// list order, so the counts of positive entries always sum to `budget`.
pub fn apportion_tiles(percents: &[f64], budget: usize) -> Vec<usize> {
    let mut counts = vec![0_usize; percents.len()];
    let positive = percents
        .iter()
        .enumerate()
        .filter(|(_, percent)| percent.is_finite() && **percent > 0.0)
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    let total = positive.iter().map(|index| percents[*index]).sum::<f64>();
    if positive.is_empty() || budget == 0 || total <= 0.0 {
        return counts;
    }

    let mut errors = vec![0.0_f64; percents.len()];
    for index in &positive {
        let ideal = percents[*index] / total * budget as f64;
        let rounded = ideal.round();
        counts[*index] = rounded as usize;
        errors[*index] = ideal - rounded;
    }

    let mut grow_order = positive.clone();
    grow_order.sort_by(by_error_descending(&errors));
    let mut shrink_order = positive;
    shrink_order.sort_by(|left, right| {
        errors[*left]
            .partial_cmp(&errors[*right])
            .unwrap_or(Ordering::Equal)
    });

    let mut assigned = counts.iter().sum::<usize>();
    let mut cursor = 0_usize;
    while assigned < budget {
        counts[grow_order[cursor % grow_order.len()]] += 1;
        assigned += 1;
        cursor += 1;
    }
    cursor = 0;
    while assigned > budget {
        if shrink_order.iter().all(|index| counts[*index] == 0) {
            break;
        }
        let index = shrink_order[cursor % shrink_order.len()];
        if counts[index] > 0 {
            counts[index] -= 1;
            assigned -= 1;
        }
        cursor += 1;
    }
    counts
}

/// Renders `segments` as exactly `budget` tiles, padding with free tiles.
pub fn tile_segments(segments: &[DiskSegment], budget: usize) -> Vec<Tile> {
    let visible = segments
        .iter()
        .filter(|segment| segment.percent > 0.0)
        .collect::<Vec<_>>();
    let percents = visible
        .iter()
        .map(|segment| segment.percent)
        .collect::<Vec<_>>();
    let counts = apportion_tiles(&percents, budget);

    let mut tiles = Vec::with_capacity(budget);
    for (segment, count) in visible.iter().zip(counts) {
        let tile = Tile::for_segment(segment);
        tiles.extend(std::iter::repeat(tile).take(count));
    }
    tiles.truncate(budget);
    while tiles.len() < budget {
        tiles.push(Tile::free());
    }
    tiles
}

#[cfg(test)]
mod tests {
    use godisk_api::DiskSegment;

    use super::{apportion_tiles, tile_segments, DISK_TILE_BUDGET, FREE_TILE_KIND};

    fn segment(kind: &str, label: &str, percent: f64) -> DiskSegment {
        DiskSegment {
            kind: kind.to_string(),
            label: label.to_string(),
            start: 0,
            size: 0,
            end: 10,
            percent,
        }
    }

    #[test]
    fn unit_apportion_exact_split() {
        assert_eq!(apportion_tiles(&[50.0, 30.0, 20.0], 10), vec![5, 3, 2]);
    }

    #[test]
    fn unit_apportion_gives_surplus_to_largest_rounding_error() {
        assert_eq!(apportion_tiles(&[33.3, 33.3, 33.4], 10), vec![3, 3, 4]);
    }

    #[test]
    fn functional_apportion_removes_excess_in_list_order() {
        let counts = apportion_tiles(&[25.0, 25.0, 25.0, 25.0], 2);
        assert_eq!(counts.iter().sum::<usize>(), 2);
        assert_eq!(counts, vec![0, 0, 1, 1]);
    }

    #[test]
    fn regression_apportion_ignores_non_positive_and_empty_inputs() {
        assert_eq!(apportion_tiles(&[0.0, -5.0, 10.0], 4), vec![0, 0, 4]);
        assert_eq!(apportion_tiles(&[0.0, 0.0], 4), vec![0, 0]);
        assert!(apportion_tiles(&[], 4).is_empty());
    }

    #[test]
    fn functional_apportion_normalizes_by_positive_sum() {
        let counts = apportion_tiles(&[10.0, 10.0], 60);
        assert_eq!(counts, vec![30, 30]);
    }

    #[test]
    fn functional_tile_segments_always_fill_budget() {
        let tiles = tile_segments(
            &[
                segment("MBR", "", 1.0),
                segment("P", "Part1", 40.0),
                segment("FREE", "", 59.0),
            ],
            DISK_TILE_BUDGET,
        );
        assert_eq!(tiles.len(), DISK_TILE_BUDGET);
        assert_eq!(tiles.iter().filter(|tile| tile.kind == "P").count(), 40);
        assert_eq!(tiles[0].label, "MBR");
        assert_eq!(tiles[0].tip, "MBR • MBR • 1.00%  [0..10]");
    }

    #[test]
    fn regression_tile_segments_pads_empty_disk_with_free_tiles() {
        let tiles = tile_segments(&[segment("P", "Part1", 0.0)], 60);
        assert_eq!(tiles.len(), 60);
        assert!(tiles.iter().all(|tile| tile.kind == FREE_TILE_KIND));
    }
}
