use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{LedgerError, LedgerResult};
use crate::model::score::{ScoreEntry, ScoreTable};
use crate::store::TemporalView;

// ---------------------------------------------------------------------------
// Window tiling
// ---------------------------------------------------------------------------

/// Consecutive half-open windows `[s, s + width)` covering `[start, end)`.
/// The last tile is cut short at `end`.
pub fn tile_windows(start: i64, end: i64, width: i64) -> LedgerResult<Vec<(i64, i64)>> {
    if width <= 0 {
        return Err(LedgerError::InvalidParameter(format!(
            "tile width must be positive, got {width}"
        )));
    }
    if start > end {
        return Err(LedgerError::InvalidWindow { start, end });
    }
    let mut tiles = Vec::new();
    let mut lo = start;
    while lo < end {
        let hi = lo.saturating_add(width).min(end);
        tiles.push((lo, hi));
        lo = hi;
    }
    Ok(tiles)
}

// ---------------------------------------------------------------------------
// Activity profile: per-tile volume and peak detection
// ---------------------------------------------------------------------------

/// Activity within one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileActivity {
    pub start: i64,
    pub end: i64,
    pub edge_count: usize,
    /// Distinct addresses sending or receiving in the tile.
    pub active_addresses: usize,
    pub total_value: f64,
    /// Mean edge count over this tile and the preceding ones, once enough
    /// tiles exist to fill the rolling window.
    pub rolling_mean: Option<f64>,
    /// Edge count above the profile threshold.
    pub peak: bool,
}

/// Tiled activity of a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityProfile {
    pub width: i64,
    pub tiles: Vec<TileActivity>,
    pub mean: f64,
    /// Sample standard deviation of the per-tile edge counts.
    pub std_dev: f64,
    /// `mean + 2 * std_dev`; `None` with fewer than two tiles.
    pub threshold: Option<f64>,
}

impl ActivityProfile {
    pub fn peaks(&self) -> impl Iterator<Item = &TileActivity> {
        self.tiles.iter().filter(|t| t.peak)
    }
}

/// Most tiles a single profile will allocate.
pub const MAX_TILES: usize = 1_000_000;

fn saturate(x: i128) -> i64 {
    x.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Bucket the view's edges into tiles of `width` seconds aligned to
/// multiples of `width`, then flag tiles whose edge count exceeds
/// `mean + 2 * sample_std`.
///
/// Every tile between the first and the last active one is reported, empty
/// ones included, so the rolling mean runs over contiguous time. A span
/// that needs more than [`MAX_TILES`] tiles is rejected with
/// [`LedgerError::InvalidParameter`].
#[allow(clippy::cast_precision_loss)]
pub fn activity_profile<V: TemporalView + ?Sized>(
    view: &V,
    width: i64,
    rolling: usize,
) -> LedgerResult<ActivityProfile> {
    if width <= 0 {
        return Err(LedgerError::InvalidParameter(format!(
            "tile width must be positive, got {width}"
        )));
    }
    if rolling == 0 {
        return Err(LedgerError::InvalidParameter(
            "rolling window must cover at least one tile".to_string(),
        ));
    }

    let (Some(first), Some(last)) = (view.earliest_time(), view.latest_time()) else {
        return Ok(ActivityProfile {
            width,
            tiles: Vec::new(),
            mean: 0.0,
            std_dev: 0.0,
            threshold: None,
        });
    };

    // i128 so that spans near the ends of i64 cannot overflow
    let w = i128::from(width);
    let origin = i128::from(first).div_euclid(w) * w;
    let span = (i128::from(last) - origin) / w + 1;
    let tile_count = usize::try_from(span)
        .ok()
        .filter(|&count| count <= MAX_TILES)
        .ok_or_else(|| {
            LedgerError::InvalidParameter(format!(
                "{span} tiles of width {width} exceed the limit of {MAX_TILES}; use a wider tile"
            ))
        })?;
    let mut counts = vec![0usize; tile_count];
    let mut values = vec![0.0f64; tile_count];
    let mut active: Vec<HashSet<usize>> = vec![HashSet::new(); tile_count];

    for edge in view.edges() {
        let slot = ((i128::from(edge.timestamp) - origin) / w) as usize;
        counts[slot] += 1;
        values[slot] += edge.value;
        active[slot].insert(edge.source);
        active[slot].insert(edge.target);
    }

    let n = tile_count as f64;
    let mean = counts.iter().sum::<usize>() as f64 / n;
    let std_dev = if tile_count > 1 {
        let ss: f64 = counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    let threshold = (tile_count > 1).then(|| mean + 2.0 * std_dev);

    let tiles = (0..tile_count)
        .map(|i| {
            let start = origin + i as i128 * w;
            let rolling_mean = (i + 1 >= rolling).then(|| {
                counts[i + 1 - rolling..=i].iter().sum::<usize>() as f64 / rolling as f64
            });
            TileActivity {
                start: saturate(start),
                end: saturate(start + w),
                edge_count: counts[i],
                active_addresses: active[i].len(),
                total_value: values[i],
                rolling_mean,
                peak: threshold.is_some_and(|th| counts[i] as f64 > th),
            }
        })
        .collect();

    Ok(ActivityProfile {
        width,
        tiles,
        mean,
        std_dev,
        threshold,
    })
}

// ---------------------------------------------------------------------------
// Value volume per address
// ---------------------------------------------------------------------------

/// Total value sent plus received by each address active in the view.
pub fn address_volume<V: TemporalView + ?Sized>(view: &V) -> ScoreTable {
    let graph = view.graph();
    let mut volume: HashMap<usize, f64> = HashMap::new();
    for edge in view.edges() {
        *volume.entry(edge.source).or_default() += edge.value;
        *volume.entry(edge.target).or_default() += edge.value;
    }
    ScoreTable::new(
        volume
            .into_iter()
            .map(|(node, v)| (graph.address(node).to_string(), v)),
    )
}

/// The highest-volume addresses that together account for `share` of the
/// table's total: the shortest ranked prefix whose running sum reaches
/// `share * total`.
pub fn volume_concentration(table: &ScoreTable, share: f64) -> LedgerResult<Vec<ScoreEntry>> {
    if !(share > 0.0 && share <= 1.0) {
        return Err(LedgerError::InvalidParameter(format!(
            "share must be within (0, 1], got {share}"
        )));
    }
    let total = table.total();
    if total <= 0.0 {
        return Ok(Vec::new());
    }
    let target = share * total;
    let mut running = 0.0;
    let mut out = Vec::new();
    for entry in table.ranked() {
        running += entry.score;
        out.push(entry);
        if running >= target {
            break;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::edge::EdgeRecord;
    use crate::store::{InvalidRecordPolicy, TemporalGraph};

    const DAY: i64 = 86_400;

    fn graph(edges: &[(&str, &str, i64, f64)]) -> TemporalGraph {
        let records: Vec<EdgeRecord> = edges
            .iter()
            .map(|(s, d, t, v)| EdgeRecord::new(*s, *d, *t, *v))
            .collect();
        TemporalGraph::from_records(&records, InvalidRecordPolicy::Fail)
            .unwrap()
            .0
    }

    #[test]
    fn test_tiles_cover_range() {
        assert_eq!(
            tile_windows(0, 25, 10).unwrap(),
            vec![(0, 10), (10, 20), (20, 25)]
        );
        assert!(tile_windows(5, 5, 10).unwrap().is_empty());
        assert!(tile_windows(0, 10, 0).is_err());
        assert!(matches!(
            tile_windows(10, 0, 5),
            Err(LedgerError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_daily_profile_flags_spike() {
        let mut edges = Vec::new();
        // one transfer on each of nine quiet days, then a burst of 30
        for day in 0..9 {
            edges.push(("a", "b", day * DAY + 60, 1.0));
        }
        for i in 0..30 {
            edges.push(("c", "d", 9 * DAY + i, 2.0));
        }
        let g = graph(&edges);
        let profile = activity_profile(&g, DAY, 7).unwrap();

        assert_eq!(profile.tiles.len(), 10);
        assert_eq!(profile.tiles[9].edge_count, 30);
        assert_eq!(profile.tiles[9].active_addresses, 2);
        assert_eq!(profile.tiles[9].total_value, 60.0);
        assert_eq!(profile.tiles[5].rolling_mean, None);
        assert_eq!(profile.tiles[6].rolling_mean, Some(1.0));

        let peaks: Vec<i64> = profile.peaks().map(|t| t.start).collect();
        assert_eq!(peaks, vec![9 * DAY]);
    }

    #[test]
    fn test_profile_includes_empty_gap_tiles() {
        let g = graph(&[("a", "b", 0, 1.0), ("a", "b", 3 * DAY, 1.0)]);
        let profile = activity_profile(&g, DAY, 1).unwrap();
        let counts: Vec<usize> = profile.tiles.iter().map(|t| t.edge_count).collect();
        assert_eq!(counts, vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_profile_rejects_span_with_too_many_tiles() {
        // one timestamp in microseconds among seconds
        let g = graph(&[
            ("a", "b", 1_700_000_000, 1.0),
            ("b", "c", 1_700_000_000_000_000, 1.0),
        ]);
        assert!(matches!(
            activity_profile(&g, DAY, 7),
            Err(LedgerError::InvalidParameter(_))
        ));

        let g = graph(&[("a", "b", -10, 1.0), ("b", "c", i64::MAX, 1.0)]);
        assert!(matches!(
            activity_profile(&g, DAY, 7),
            Err(LedgerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_profile_at_the_ends_of_time() {
        let g = graph(&[("a", "b", i64::MIN, 1.0), ("b", "c", i64::MAX, 1.0)]);
        let profile = activity_profile(&g, i64::MAX, 1).unwrap();
        let counts: Vec<usize> = profile.tiles.iter().map(|t| t.edge_count).collect();
        assert_eq!(counts, vec![1, 0, 0, 1]);
        assert_eq!(profile.tiles[0].start, i64::MIN);
        assert_eq!(profile.tiles[3].end, i64::MAX);
    }

    #[test]
    fn test_empty_view_profile() {
        let g = graph(&[("a", "b", 100, 1.0)]);
        let w = g.window(0, 50).unwrap();
        let profile = activity_profile(&w, DAY, 7).unwrap();
        assert!(profile.tiles.is_empty());
        assert!(profile.threshold.is_none());
    }

    #[test]
    fn test_volume_counts_both_sides() {
        let g = graph(&[("a", "b", 0, 5.0), ("b", "c", 1, 2.0), ("a", "a", 2, 1.0)]);
        let table = address_volume(&g);
        assert_eq!(table.get("a"), Some(7.0));
        assert_eq!(table.get("b"), Some(7.0));
        assert_eq!(table.get("c"), Some(2.0));
    }

    #[test]
    fn test_concentration_prefix() {
        let table = ScoreTable::new(vec![
            ("whale".to_string(), 90.0),
            ("mid".to_string(), 9.0),
            ("small".to_string(), 1.0),
        ]);
        let top = volume_concentration(&table, 0.5).unwrap();
        assert_eq!(top.len(), 1);
        let top = volume_concentration(&table, 0.95).unwrap();
        assert_eq!(top.iter().map(|e| e.node.as_str()).collect::<Vec<_>>(), vec!["whale", "mid"]);
        assert!(volume_concentration(&table, 0.0).is_err());
    }
}
