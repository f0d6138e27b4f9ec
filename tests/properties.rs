//! Property-based tests for the temporal graph engine.
//!
//! Invariants checked on arbitrary small ledgers:
//! - Store counts match the accepted records
//! - Windows over the full range see every edge once
//! - The motif census agrees with a brute-force triple scan
//! - Timestamp permutation preserves both multisets
//! - PageRank mass is 1

use proptest::prelude::*;
use std::collections::HashSet;

use ledgergraph::centrality::{CentralityEngine, PageRankConfig};
use ledgergraph::model::edge::{Edge, EdgeRecord, TimeValue};
use ledgergraph::model::motif::MotifHistogram;
use ledgergraph::motif::{classify, MotifCensus};
use ledgergraph::null_model::permute_timestamps;
use ledgergraph::store::{InvalidRecordPolicy, TemporalGraph, TemporalView};

/// Up to `max_edges` transfers among at most `max_nodes` addresses within
/// `[0, max_time)`.
fn arb_ledger(
    max_nodes: u8,
    max_edges: usize,
    max_time: i64,
) -> impl Strategy<Value = Vec<EdgeRecord>> {
    prop::collection::vec(
        (0..max_nodes, 0..max_nodes, 0..max_time, 0.0f64..100.0),
        0..max_edges,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(s, d, t, v)| EdgeRecord::new(format!("n{s}"), format!("n{d}"), t, v))
            .collect()
    })
}

fn build(records: &[EdgeRecord]) -> TemporalGraph {
    TemporalGraph::from_records(records, InvalidRecordPolicy::Fail)
        .unwrap()
        .0
}

fn brute_force(graph: &TemporalGraph, delta: i64) -> MotifHistogram {
    let edges: Vec<&Edge> = graph.edges().collect();
    let mut hist = MotifHistogram::new(delta);
    for a in 0..edges.len() {
        for b in a + 1..edges.len() {
            for c in b + 1..edges.len() {
                if edges[c].timestamp - edges[a].timestamp > delta {
                    continue;
                }
                if let Some(class) = classify(graph, [edges[a], edges[b], edges[c]]) {
                    hist.increment(class);
                }
            }
        }
    }
    hist
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn counts_match_records(records in arb_ledger(12, 60, 1_000)) {
        let graph = build(&records);
        let endpoints: HashSet<&str> = records
            .iter()
            .flat_map(|r| [r.source.as_str(), r.destination.as_str()])
            .collect();
        prop_assert_eq!(graph.edge_count(), records.len());
        prop_assert_eq!(graph.node_count(), endpoints.len());
    }

    #[test]
    fn full_window_sees_every_edge_once(records in arb_ledger(8, 40, 500)) {
        let graph = build(&records);
        if let (Some(lo), Some(hi)) = (graph.earliest_time(), graph.latest_time()) {
            let window = graph.window(lo, hi + 1).unwrap();
            let ids: Vec<usize> = window.edges().map(|e| e.id).collect();
            let unique: HashSet<usize> = ids.iter().copied().collect();
            prop_assert_eq!(ids.len(), graph.edge_count());
            prop_assert_eq!(unique.len(), graph.edge_count());
        }
    }

    #[test]
    fn split_windows_partition_edges(records in arb_ledger(8, 40, 500), cut in 0i64..500) {
        let graph = build(&records);
        let left = graph.window(i64::MIN, cut).unwrap();
        let right = graph.window(cut, i64::MAX).unwrap();
        prop_assert_eq!(left.edge_count() + right.edge_count(), graph.edge_count());
    }

    #[test]
    fn census_matches_brute_force(records in arb_ledger(5, 18, 40), delta in 0i64..30) {
        let graph = build(&records);
        let census = MotifCensus::new();
        let fast = census.count(&graph, delta).unwrap();
        prop_assert_eq!(&fast, &brute_force(&graph, delta));
        prop_assert_eq!(fast, census.count(&graph, delta).unwrap());
    }

    #[test]
    fn permutation_preserves_multisets(
        records in arb_ledger(10, 50, 10_000),
        seed in any::<u64>()
    ) {
        let permuted = permute_timestamps(&records, "timestamp", seed).unwrap();

        let times = |rs: &[EdgeRecord]| {
            let mut t: Vec<i64> = rs
                .iter()
                .map(|r| r.timestamp.as_ref().and_then(TimeValue::to_seconds).unwrap())
                .collect();
            t.sort_unstable();
            t
        };
        prop_assert_eq!(times(&records), times(&permuted));

        for (before, after) in records.iter().zip(&permuted) {
            prop_assert_eq!(&before.source, &after.source);
            prop_assert_eq!(&before.destination, &after.destination);
            prop_assert_eq!(&before.value, &after.value);
        }
        prop_assert_eq!(&permuted, &permute_timestamps(&records, "timestamp", seed).unwrap());
    }

    #[test]
    fn pagerank_mass_is_one(records in arb_ledger(15, 60, 100)) {
        let graph = build(&records);
        prop_assume!(graph.node_count() > 0);
        let result = CentralityEngine::new(&graph)
            .pagerank(&PageRankConfig::default())
            .unwrap();
        let total = result.scores.total();
        prop_assert!((total - 1.0).abs() < 1e-9, "total {}", total);
    }
}
