use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::model::edge::EdgeRecord;
use crate::model::node::NodeRecord;
use crate::store::{IngestReport, InvalidRecordPolicy, RejectedRecord};

// ---------------------------------------------------------------------------
// Record loading: JSON arrays or JSON Lines
// ---------------------------------------------------------------------------

/// Records decoded from one input, with the input position of each.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecords<T> {
    pub records: Vec<T>,
    /// Zero-based input position of `records[i]`.
    pub positions: Vec<usize>,
    /// Entries that did not decode, skipped under [`InvalidRecordPolicy::Skip`].
    pub rejected: Vec<RejectedRecord>,
}

impl<T> ParsedRecords<T> {
    /// Restate an ingest report over `records` in input positions and fold
    /// in the decode failures, ordered by position.
    pub fn merge_report(&self, mut report: IngestReport) -> IngestReport {
        for rejected in &mut report.rejected {
            if let Some(&position) = self.positions.get(rejected.index) {
                rejected.index = position;
            }
        }
        report.rejected.extend(self.rejected.iter().cloned());
        report.rejected.sort_by_key(|r| r.index);
        report
    }
}

/// Parse records from either a JSON array or one JSON object per line.
///
/// Blank lines are ignored and do not count as positions. An entry that is
/// not a valid record is handled per `policy`: skipped and reported with
/// field `json`, or returned as [`LedgerError::InvalidRecord`] carrying its
/// position. A JSON array that is not syntactically valid fails as a whole.
pub fn parse_records<T: DeserializeOwned>(
    text: &str,
    policy: InvalidRecordPolicy,
) -> LedgerResult<ParsedRecords<T>> {
    let trimmed = text.trim_start();
    let entries: Vec<Result<T, serde_json::Error>> = if trimmed.starts_with('[') {
        let values: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
        values.into_iter().map(serde_json::from_value).collect()
    } else {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect()
    };

    let mut parsed = ParsedRecords {
        records: Vec::with_capacity(entries.len()),
        positions: Vec::with_capacity(entries.len()),
        rejected: Vec::new(),
    };
    for (index, entry) in entries.into_iter().enumerate() {
        match entry {
            Ok(record) => {
                parsed.records.push(record);
                parsed.positions.push(index);
            }
            Err(err) => {
                if policy == InvalidRecordPolicy::Fail {
                    return Err(LedgerError::InvalidRecord {
                        index,
                        field: "json",
                        reason: err.to_string(),
                    });
                }
                warn!(index, error = %err, "skipping undecodable record");
                parsed.rejected.push(RejectedRecord {
                    index,
                    field: "json".to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(parsed)
}

pub fn read_edge_records(
    path: &Path,
    policy: InvalidRecordPolicy,
) -> LedgerResult<ParsedRecords<EdgeRecord>> {
    let text = std::fs::read_to_string(path)?;
    let parsed: ParsedRecords<EdgeRecord> = parse_records(&text, policy)?;
    debug!(
        path = %path.display(),
        records = parsed.records.len(),
        rejected = parsed.rejected.len(),
        "edge records loaded"
    );
    Ok(parsed)
}

pub fn read_node_records(
    path: &Path,
    policy: InvalidRecordPolicy,
) -> LedgerResult<ParsedRecords<NodeRecord>> {
    let text = std::fs::read_to_string(path)?;
    let parsed: ParsedRecords<NodeRecord> = parse_records(&text, policy)?;
    debug!(
        path = %path.display(),
        records = parsed.records.len(),
        rejected = parsed.rejected.len(),
        "node records loaded"
    );
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Synthetic ledger for demos
// ---------------------------------------------------------------------------

/// A reproducible token-transfer ledger.
///
/// A handful of hub addresses take part in most transfers and activity
/// comes in bursts, so the result has both skewed centrality and
/// temporally clustered motifs. Timestamps start at `start` and span
/// roughly `days` days.
pub fn synthetic_ledger(
    seed: u64,
    addresses: usize,
    transfers: usize,
    start: i64,
    days: i64,
) -> Vec<EdgeRecord> {
    let addresses = addresses.max(2);
    let hubs = (addresses / 10).max(1);
    let span = days.max(1) * 86_400;
    let mut rng = StdRng::seed_from_u64(seed);

    let pick = |rng: &mut StdRng| -> usize {
        if rng.gen_bool(0.6) {
            rng.gen_range(0..hubs)
        } else {
            rng.gen_range(0..addresses)
        }
    };

    let mut records = Vec::with_capacity(transfers);
    let mut clock = start;
    for _ in 0..transfers {
        let source = pick(&mut rng);
        let mut target = pick(&mut rng);
        if target == source {
            target = (target + 1) % addresses;
        }
        // mostly short gaps, occasionally a long quiet spell
        let gap = if rng.gen_bool(0.9) {
            rng.gen_range(0..600)
        } else {
            rng.gen_range(0..(span / transfers.max(1) as i64).max(1) * 10)
        };
        clock += gap;
        let value = (rng.gen_range(1.0f64..1_000.0) * 100.0).round() / 100.0;
        records.push(EdgeRecord::new(
            format!("0x{source:040x}"),
            format!("0x{target:040x}"),
            clock,
            value,
        ));
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::edge::TimeValue;
    use crate::store::TemporalGraph;

    #[test]
    fn test_parse_json_array_with_ledger_spellings() {
        let text = r#"[
            {"from_address": "0xa", "to_address": "0xb", "timeStamp": "1700000000", "value": "12.5"},
            {"source": "0xb", "destination": "0xc", "timestamp": 1700000060, "value": 3}
        ]"#;
        let records: Vec<EdgeRecord> = parse_records(text, InvalidRecordPolicy::Fail)
            .unwrap()
            .records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, "0xa");
        assert_eq!(records[0].validate(0).unwrap(), (1_700_000_000, 12.5));
        assert_eq!(records[1].timestamp, Some(TimeValue::Seconds(1_700_000_060)));
    }

    #[test]
    fn test_parse_json_lines() {
        let text = "{\"source\":\"a\",\"destination\":\"b\",\"timestamp\":1,\"value\":1}\n\n\
                    {\"source\":\"b\",\"destination\":\"a\",\"timestamp\":2,\"value\":2}\n";
        let parsed: ParsedRecords<EdgeRecord> =
            parse_records(text, InvalidRecordPolicy::Fail).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.positions, vec![0, 1]);
    }

    #[test]
    fn test_bad_line_reports_index() {
        let text = "{\"source\":\"a\",\"destination\":\"b\",\"timestamp\":1,\"value\":1}\n\
                    not json\n";
        let err = parse_records::<EdgeRecord>(text, InvalidRecordPolicy::Fail).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRecord { index: 1, field: "json", .. }));
    }

    #[test]
    fn test_bad_lines_skipped_under_skip_policy() {
        let text = "{\"source\":\"a\",\"destination\":\"b\",\"timestamp\":1,\"value\":1}\n\
                    not json\n\
                    {\"source\":\"b\",\"destination\":\"\",\"timestamp\":2,\"value\":1}\n\
                    {\"source\":\"b\"\n\
                    {\"source\":\"b\",\"destination\":\"c\",\"timestamp\":3,\"value\":1}\n";
        let parsed: ParsedRecords<EdgeRecord> =
            parse_records(text, InvalidRecordPolicy::Skip).unwrap();
        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.positions, vec![0, 2, 4]);
        let failed: Vec<usize> = parsed.rejected.iter().map(|r| r.index).collect();
        assert_eq!(failed, vec![1, 3]);

        // graph-level rejects are restated in input positions
        let (_, report) =
            TemporalGraph::from_records(&parsed.records, InvalidRecordPolicy::Skip).unwrap();
        assert_eq!(report.rejected[0].index, 1);
        let report = parsed.merge_report(report);
        assert_eq!(report.accepted, 2);
        let rejected: Vec<(usize, &str)> = report
            .rejected
            .iter()
            .map(|r| (r.index, r.field.as_str()))
            .collect();
        assert_eq!(rejected, vec![(1, "json"), (2, "destination"), (3, "json")]);
    }

    #[test]
    fn test_array_entries_decoded_one_by_one() {
        let text = r#"[
            {"source": "a", "destination": "b", "timestamp": 1, "value": 1},
            {"source": ["not", "an", "address"]},
            42
        ]"#;
        let parsed: ParsedRecords<EdgeRecord> =
            parse_records(text, InvalidRecordPolicy::Skip).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.rejected.len(), 2);
        assert!(parse_records::<EdgeRecord>("[{", InvalidRecordPolicy::Skip).is_err());
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.jsonl");
        let line = "{\"from\":\"a\",\"to\":\"b\",\"timestamp\":5,\"value\":1.5}\n";
        std::fs::write(&path, line).unwrap();
        let parsed = read_edge_records(&path, InvalidRecordPolicy::Fail).unwrap();
        assert_eq!(parsed.records, vec![EdgeRecord::new("a", "b", 5, 1.5)]);
    }

    #[test]
    fn test_synthetic_ledger_is_reproducible_and_valid() {
        let a = synthetic_ledger(9, 30, 200, 1_700_000_000, 7);
        let b = synthetic_ledger(9, 30, 200, 1_700_000_000, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 200);
        for (i, r) in a.iter().enumerate() {
            assert!(r.validate(i).is_ok());
            assert_ne!(r.source, r.destination);
        }
    }
}
