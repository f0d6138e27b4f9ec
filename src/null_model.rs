//! Timestamp-permutation null model.
//!
//! The generator keeps every `(source, destination, value)` triple and
//! redistributes the multiset of timestamps over them with a seeded uniform
//! shuffle. Topology and value distribution survive exactly; temporal
//! correlation does not. Running the motif census on both edge sets gives a
//! baseline for how many occurrences topology alone explains.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::model::edge::{EdgeRecord, TimeValue};
use crate::model::motif::MotifHistogram;
use crate::motif::MotifCensus;
use crate::store::{InvalidRecordPolicy, TemporalGraph};

/// Field names that address the record timestamp.
const TIME_FIELD_NAMES: [&str; 2] = ["timestamp", "timeStamp"];

/// Return a copy of `records` with the `time_field` values shuffled across
/// records.
///
/// Fails with [`LedgerError::ShapeMismatch`] when `time_field` does not name
/// the timestamp column, or when any record lacks a timestamp. Values are
/// moved verbatim; they are not parsed, so an unparseable timestamp travels
/// to another record and is rejected there at ingest.
pub fn permute_timestamps(
    records: &[EdgeRecord],
    time_field: &str,
    seed: u64,
) -> LedgerResult<Vec<EdgeRecord>> {
    if !TIME_FIELD_NAMES.contains(&time_field) {
        return Err(LedgerError::ShapeMismatch {
            field: time_field.to_string(),
            record_index: None,
            reason: format!(
                "edge records have no such field; expected one of {TIME_FIELD_NAMES:?}"
            ),
        });
    }

    let mut times: Vec<TimeValue> = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record.timestamp.clone().ok_or_else(|| LedgerError::ShapeMismatch {
                field: time_field.to_string(),
                record_index: Some(index),
                reason: "value is absent".to_string(),
            })
        })
        .collect::<LedgerResult<_>>()?;

    let mut rng = StdRng::seed_from_u64(seed);
    times.shuffle(&mut rng);
    info!(seed, records = records.len(), field = time_field, "timestamps permuted");

    Ok(records
        .iter()
        .zip(times)
        .map(|(record, timestamp)| EdgeRecord {
            timestamp: Some(timestamp),
            ..record.clone()
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Real vs. null comparison
// ---------------------------------------------------------------------------

/// Census of the real and permuted graphs for one delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullModelComparison {
    pub delta: i64,
    pub real: MotifHistogram,
    pub null: MotifHistogram,
}

impl NullModelComparison {
    /// `real - null` per class.
    pub fn excess(&self) -> Vec<i64> {
        self.real
            .counts()
            .iter()
            .zip(self.null.counts())
            .map(|(&r, &n)| r as i64 - n as i64)
            .collect()
    }

    /// `real / max(null, 1)` per class.
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> Vec<f64> {
        self.real
            .counts()
            .iter()
            .zip(self.null.counts())
            .map(|(&r, &n)| r as f64 / n.max(1) as f64)
            .collect()
    }
}

/// Builds the permuted baseline and runs both censuses.
#[derive(Debug, Clone)]
pub struct NullModel {
    census: MotifCensus,
    policy: InvalidRecordPolicy,
    time_field: String,
    window: Option<(i64, i64)>,
}

impl Default for NullModel {
    fn default() -> Self {
        Self::new(MotifCensus::default(), InvalidRecordPolicy::default())
    }
}

impl NullModel {
    pub fn new(census: MotifCensus, policy: InvalidRecordPolicy) -> Self {
        Self {
            census,
            policy,
            time_field: TIME_FIELD_NAMES[0].to_string(),
            window: None,
        }
    }

    /// Permute `field` instead of `timestamp`.
    pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
        self.time_field = field.into();
        self
    }

    /// Keep only records with `start <= timestamp < end` before permuting,
    /// so the baseline shuffles time within the window. Records whose
    /// timestamp does not parse are kept and left to the ingest policy.
    pub fn with_window(mut self, start: i64, end: i64) -> LedgerResult<Self> {
        if start > end {
            return Err(LedgerError::InvalidWindow { start, end });
        }
        self.window = Some((start, end));
        Ok(self)
    }

    fn select(&self, records: &[EdgeRecord]) -> Vec<EdgeRecord> {
        let Some((start, end)) = self.window else {
            return records.to_vec();
        };
        records
            .iter()
            .filter(|record| {
                record
                    .timestamp
                    .as_ref()
                    .and_then(TimeValue::to_seconds)
                    .map_or(true, |t| start <= t && t < end)
            })
            .cloned()
            .collect()
    }

    /// The permuted record set this model compares against.
    pub fn permuted(&self, records: &[EdgeRecord], seed: u64) -> LedgerResult<Vec<EdgeRecord>> {
        permute_timestamps(&self.select(records), &self.time_field, seed)
    }

    /// Ingest `records` twice, once as given and once with permuted
    /// timestamps, and compare their motif histograms for every delta.
    pub fn compare(
        &self,
        records: &[EdgeRecord],
        deltas: &[i64],
        seed: u64,
    ) -> LedgerResult<Vec<NullModelComparison>> {
        let records = self.select(records);
        let permuted = permute_timestamps(&records, &self.time_field, seed)?;
        let (real_graph, _) = TemporalGraph::from_records(&records, self.policy)?;
        let (null_graph, _) = TemporalGraph::from_records(&permuted, self.policy)?;

        let (real, null) = rayon::join(
            || self.census.count_multi(&real_graph, deltas),
            || self.census.count_multi(&null_graph, deltas),
        );
        let (real, null) = (real?, null?);

        Ok(real
            .rows
            .into_iter()
            .zip(null.rows)
            .map(|(real, null)| NullModelComparison {
                delta: real.delta(),
                real,
                null,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::motif::{MotifClass, MOTIF_CLASS_COUNT};

    fn records() -> Vec<EdgeRecord> {
        vec![
            EdgeRecord::new("A", "B", 0, 1.0),
            EdgeRecord::new("B", "C", 10, 2.0),
            EdgeRecord::new("C", "A", 15, 3.0),
            EdgeRecord::new("A", "C", 400, 4.0),
            EdgeRecord::new("C", "B", 9000, 5.0),
        ]
    }

    fn sorted_times(records: &[EdgeRecord]) -> Vec<i64> {
        let mut t: Vec<i64> = records
            .iter()
            .map(|r| r.timestamp.as_ref().and_then(TimeValue::to_seconds).unwrap())
            .collect();
        t.sort_unstable();
        t
    }

    #[test]
    fn test_preserves_both_multisets() {
        let original = records();
        let permuted = permute_timestamps(&original, "timestamp", 3).unwrap();
        assert_eq!(sorted_times(&original), sorted_times(&permuted));

        let triples = |rs: &[EdgeRecord]| -> Vec<(String, String, String)> {
            rs.iter()
                .map(|r| {
                    (
                        r.source.clone(),
                        r.destination.clone(),
                        format!("{:?}", r.value),
                    )
                })
                .collect()
        };
        assert_eq!(triples(&original), triples(&permuted));
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = permute_timestamps(&records(), "timestamp", 11).unwrap();
        let b = permute_timestamps(&records(), "timeStamp", 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_field_is_shape_mismatch() {
        let err = permute_timestamps(&records(), "block_time", 1).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ShapeMismatch { record_index: None, .. }
        ));
    }

    #[test]
    fn test_missing_timestamp_is_shape_mismatch() {
        let mut rs = records();
        rs[2].timestamp = None;
        let err = permute_timestamps(&rs, "timestamp", 1).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ShapeMismatch { record_index: Some(2), .. }
        ));
    }

    #[test]
    fn test_input_left_untouched() {
        let original = records();
        let copy = original.clone();
        let _ = permute_timestamps(&original, "timestamp", 5).unwrap();
        assert_eq!(original, copy);
    }

    #[test]
    fn test_compare_rows_per_delta() {
        let rows = NullModel::default()
            .compare(&records(), &[20, 86_400], 42)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].delta, 20);
        assert_eq!(rows[0].real.get(MotifClass::CYCLE), 1);
        // topology is kept, so the widest delta sees the same total
        assert_eq!(rows[1].real.total(), rows[1].null.total());
        assert_eq!(rows[0].excess().len(), MOTIF_CLASS_COUNT);
        let cycle = MotifClass::CYCLE.index();
        assert_eq!(
            rows[0].ratio()[cycle],
            rows[0].real.get(MotifClass::CYCLE) as f64
                / rows[0].null.get(MotifClass::CYCLE).max(1) as f64
        );
    }

    #[test]
    fn test_compare_uses_configured_time_field() {
        let model = NullModel::default().with_time_field("block_time");
        assert!(matches!(
            model.compare(&records(), &[20], 42),
            Err(LedgerError::ShapeMismatch { record_index: None, .. })
        ));

        let rows = NullModel::default()
            .with_time_field("timeStamp")
            .compare(&records(), &[20], 42)
            .unwrap();
        assert_eq!(rows, NullModel::default().compare(&records(), &[20], 42).unwrap());
    }

    #[test]
    fn test_window_restricts_both_sides() {
        let model = NullModel::default().with_window(0, 100).unwrap();
        let permuted = model.permuted(&records(), 9).unwrap();
        assert_eq!(sorted_times(&permuted), vec![0, 10, 15]);

        let rows = model.compare(&records(), &[86_400], 9).unwrap();
        // only the A -> B -> C -> A cycle is left, whatever the shuffle
        assert_eq!(rows[0].real.total(), 1);
        assert_eq!(rows[0].null.total(), 1);

        assert!(matches!(
            NullModel::default().with_window(5, 1),
            Err(LedgerError::InvalidWindow { start: 5, end: 1 })
        ));
    }
}
