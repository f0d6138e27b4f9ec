use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::model::edge::{Direction, Edge, EdgeIndex, EdgeRecord};
use crate::model::node::{Node, NodeIndex, NodeRecord};
use crate::store::view::{TemporalView, WindowView};

// ---------------------------------------------------------------------------
// Ingest policy and report
// ---------------------------------------------------------------------------

/// What to do with a record that fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRecordPolicy {
    /// Log, count and continue with the next record.
    #[default]
    Skip,
    /// Abort the ingest call at the first invalid record.
    Fail,
}

/// A record that was skipped during ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub index: usize,
    pub field: String,
    pub reason: String,
}

/// Outcome of one ingest pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedRecord>,
}

impl IngestReport {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

// ---------------------------------------------------------------------------
// TimedEdge: the entry type of every time index
// ---------------------------------------------------------------------------

/// An edge reference keyed by its timestamp. Index lists are sorted by
/// `(timestamp, edge)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimedEdge {
    pub timestamp: i64,
    pub edge: EdgeIndex,
}

/// Append `item`; returns whether the list is still in `(timestamp, edge)`
/// order. `item.edge` is always the newest index, so an equal timestamp
/// keeps the order.
fn push_entry(list: &mut Vec<TimedEdge>, item: TimedEdge) -> bool {
    let in_order = list.last().map_or(true, |last| last.timestamp <= item.timestamp);
    list.push(item);
    in_order
}

/// Entries with `lo <= timestamp <= hi`.
fn closed_range(list: &[TimedEdge], lo: i64, hi: i64) -> &[TimedEdge] {
    if lo > hi {
        return &[];
    }
    let start = list.partition_point(|e| e.timestamp < lo);
    let end = list.partition_point(|e| e.timestamp <= hi);
    &list[start..end.max(start)]
}

// ---------------------------------------------------------------------------
// GraphSummary: sanity statistics for reporting
// ---------------------------------------------------------------------------

/// Size and time span of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub earliest_time: Option<i64>,
    pub latest_time: Option<i64>,
    pub frozen: bool,
}

impl GraphSummary {
    pub fn earliest_utc(&self) -> Option<DateTime<Utc>> {
        self.earliest_time.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    pub fn latest_utc(&self) -> Option<DateTime<Utc>> {
        self.latest_time.and_then(|t| DateTime::from_timestamp(t, 0))
    }
}

impl std::fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} nodes, {} edges", self.node_count, self.edge_count)?;
        if let (Some(lo), Some(hi)) = (self.earliest_utc(), self.latest_utc()) {
            write!(f, ", {} .. {}", lo.to_rfc3339(), hi.to_rfc3339())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TemporalGraph: append-only store, frozen before analysis
// ---------------------------------------------------------------------------

/// Temporal multigraph of transfers between addresses.
///
/// Edges are appended during construction; [`TemporalGraph::freeze`] ends
/// the write phase and any later mutation fails with
/// [`LedgerError::FrozenStore`]. Inserts append to the time indices; once
/// an edge arrives out of time order the indices stay unsorted until
/// `freeze` sorts them, and time-ordered reads fail with
/// [`LedgerError::Unindexed`] in the meantime.
#[derive(Debug, Default)]
pub struct TemporalGraph {
    nodes: Vec<Node>,
    by_address: HashMap<String, NodeIndex>,
    edges: Vec<Edge>,
    timeline: Vec<TimedEdge>,
    outgoing: Vec<Vec<TimedEdge>>,
    incoming: Vec<Vec<TimedEdge>>,
    incident: Vec<Vec<TimedEdge>>,
    span: Option<(i64, i64)>,
    unsorted: bool,
    frozen: bool,
}

impl TemporalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from raw edge records in one pass and freeze it.
    pub fn from_records(
        records: &[EdgeRecord],
        policy: InvalidRecordPolicy,
    ) -> LedgerResult<(Self, IngestReport)> {
        let mut graph = Self::new();
        let report = graph.ingest_edges(records, policy)?;
        graph.freeze();
        Ok((graph, report))
    }

    // -- write phase --------------------------------------------------------

    fn ensure_writable(&self, operation: &'static str) -> LedgerResult<()> {
        if self.frozen {
            return Err(LedgerError::FrozenStore { operation });
        }
        Ok(())
    }

    fn intern(&mut self, address: &str) -> NodeIndex {
        if let Some(&ix) = self.by_address.get(address) {
            return ix;
        }
        let ix = self.nodes.len();
        self.nodes.push(Node::new(ix, address));
        self.by_address.insert(address.to_string(), ix);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.incident.push(Vec::new());
        ix
    }

    fn insert_edge(&mut self, source: &str, target: &str, timestamp: i64, value: f64) -> EdgeIndex {
        let src = self.intern(source);
        let dst = self.intern(target);
        let id = self.edges.len();
        self.edges.push(Edge {
            id,
            source: src,
            target: dst,
            timestamp,
            value,
        });

        let entry = TimedEdge { timestamp, edge: id };
        let mut in_order = push_entry(&mut self.timeline, entry);
        in_order &= push_entry(&mut self.outgoing[src], entry);
        in_order &= push_entry(&mut self.incoming[dst], entry);
        in_order &= push_entry(&mut self.incident[src], entry);
        if dst != src {
            in_order &= push_entry(&mut self.incident[dst], entry);
        }
        self.unsorted |= !in_order;
        self.span = Some(match self.span {
            Some((lo, hi)) => (lo.min(timestamp), hi.max(timestamp)),
            None => (timestamp, timestamp),
        });

        self.nodes[src].observe(timestamp);
        self.nodes[dst].observe(timestamp);
        id
    }

    /// Insert one transfer. Unseen endpoints are created; their first-seen
    /// time is lowered to `timestamp` when earlier.
    pub fn add_edge(
        &mut self,
        source: &str,
        destination: &str,
        timestamp: i64,
        value: f64,
    ) -> LedgerResult<EdgeIndex> {
        self.ensure_writable("add_edge")?;
        let record = EdgeRecord::new(source, destination, timestamp, value);
        let (timestamp, value) = record.validate(self.edges.len())?;
        Ok(self.insert_edge(source, destination, timestamp, value))
    }

    /// Validate and insert a sequence of raw records. Under
    /// [`InvalidRecordPolicy::Skip`] bad records are reported and skipped;
    /// under [`InvalidRecordPolicy::Fail`] the first one aborts the call
    /// (records before it stay inserted).
    pub fn ingest_edges(
        &mut self,
        records: &[EdgeRecord],
        policy: InvalidRecordPolicy,
    ) -> LedgerResult<IngestReport> {
        self.ensure_writable("ingest_edges")?;
        let mut report = IngestReport::default();

        for (index, record) in records.iter().enumerate() {
            match record.validate(index) {
                Ok((timestamp, value)) => {
                    self.insert_edge(&record.source, &record.destination, timestamp, value);
                    report.accepted += 1;
                }
                Err(err) => {
                    if policy == InvalidRecordPolicy::Fail {
                        return Err(err);
                    }
                    warn!(index, error = %err, "skipping invalid edge record");
                    report.rejected.push(rejection(err, index));
                }
            }
        }

        info!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            nodes = self.nodes.len(),
            "edge records ingested"
        );
        Ok(report)
    }

    /// Insert or update a node's metadata. Edges are not touched.
    pub fn add_node(
        &mut self,
        address: &str,
        timestamp: Option<i64>,
        attributes: BTreeMap<String, String>,
    ) -> LedgerResult<NodeIndex> {
        self.ensure_writable("add_node")?;
        if address.trim().is_empty() {
            return Err(LedgerError::InvalidParameter(
                "node address must not be empty".to_string(),
            ));
        }
        let ix = self.intern(address);
        let node = &mut self.nodes[ix];
        if let Some(t) = timestamp {
            node.observe(t);
        }
        node.attributes.extend(attributes);
        Ok(ix)
    }

    /// Apply a sequence of node records under the given policy.
    pub fn ingest_nodes(
        &mut self,
        records: &[NodeRecord],
        policy: InvalidRecordPolicy,
    ) -> LedgerResult<IngestReport> {
        self.ensure_writable("ingest_nodes")?;
        let mut report = IngestReport::default();

        for (index, record) in records.iter().enumerate() {
            match validate_node(record, index) {
                Ok(timestamp) => {
                    let ix = self.add_node(&record.id, timestamp, record.attributes.clone())?;
                    if let Some(label) = &record.label {
                        self.nodes[ix].label = Some(label.clone());
                    }
                    report.accepted += 1;
                }
                Err(err) => {
                    if policy == InvalidRecordPolicy::Fail {
                        return Err(err);
                    }
                    warn!(index, error = %err, "skipping invalid node record");
                    report.rejected.push(rejection(err, index));
                }
            }
        }
        debug!(accepted = report.accepted, "node records applied");
        Ok(report)
    }

    /// End the write phase and sort any index that received edges out of
    /// time order. Idempotent.
    pub fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        self.frozen = true;
        if self.unsorted {
            let started = Instant::now();
            self.timeline.par_sort_unstable();
            self.outgoing
                .par_iter_mut()
                .chain(self.incoming.par_iter_mut())
                .chain(self.incident.par_iter_mut())
                .for_each(|list| list.sort_unstable());
            self.unsorted = false;
            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "time indices sorted"
            );
        }
        self.edges.shrink_to_fit();
        self.timeline.shrink_to_fit();
        info!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            earliest = ?self.earliest_time(),
            latest = ?self.latest_time(),
            "temporal graph frozen"
        );
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether the time indices are sorted. Always true once frozen, and
    /// before that as long as edges arrived in time order.
    pub fn is_indexed(&self) -> bool {
        !self.unsorted
    }

    /// Fail with [`LedgerError::Unindexed`] unless the time indices are sorted.
    pub fn ensure_indexed(&self, operation: &'static str) -> LedgerResult<()> {
        if self.unsorted {
            return Err(LedgerError::Unindexed { operation });
        }
        Ok(())
    }

    // -- read phase ---------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn earliest_time(&self) -> Option<i64> {
        self.span.map(|(lo, _)| lo)
    }

    pub fn latest_time(&self) -> Option<i64> {
        self.span.map(|(_, hi)| hi)
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            earliest_time: self.earliest_time(),
            latest_time: self.latest_time(),
            frozen: self.frozen,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    pub fn index_of(&self, address: &str) -> Option<NodeIndex> {
        self.by_address.get(address).copied()
    }

    pub fn node_by_address(&self, address: &str) -> Option<&Node> {
        self.index_of(address).map(|ix| &self.nodes[ix])
    }

    /// Address of a node index.
    pub fn address(&self, index: NodeIndex) -> &str {
        &self.nodes[index].address
    }

    /// Edges in insertion order.
    pub fn edge_list(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, index: EdgeIndex) -> &Edge {
        &self.edges[index]
    }

    /// Read-only view of the edges with `start <= timestamp < end`.
    pub fn window(&self, start: i64, end: i64) -> LedgerResult<WindowView<'_>> {
        if start > end {
            return Err(LedgerError::InvalidWindow { start, end });
        }
        self.ensure_indexed("window")?;
        Ok(WindowView::new(self, start, end))
    }

    pub(crate) fn timeline_closed(&self, lo: i64, hi: i64) -> &[TimedEdge] {
        closed_range(&self.timeline, lo, hi)
    }

    pub(crate) fn incident_closed(
        &self,
        node: NodeIndex,
        direction: Direction,
        lo: i64,
        hi: i64,
    ) -> &[TimedEdge] {
        let list = match direction {
            Direction::Outgoing => &self.outgoing[node],
            Direction::Incoming => &self.incoming[node],
            Direction::Both => &self.incident[node],
        };
        closed_range(list, lo, hi)
    }

    /// Number of distinct out- and in-neighbours of `node` over all time,
    /// self-loops excluded.
    pub fn static_degree(&self, node: NodeIndex) -> (usize, usize) {
        let mut outs: Vec<NodeIndex> = self.outgoing[node]
            .iter()
            .map(|t| self.edges[t.edge].target)
            .filter(|&n| n != node)
            .collect();
        outs.sort_unstable();
        outs.dedup();
        let mut ins: Vec<NodeIndex> = self.incoming[node]
            .iter()
            .map(|t| self.edges[t.edge].source)
            .filter(|&n| n != node)
            .collect();
        ins.sort_unstable();
        ins.dedup();
        (ins.len(), outs.len())
    }
}

impl TemporalView for TemporalGraph {
    fn graph(&self) -> &TemporalGraph {
        self
    }

    fn bounds(&self) -> Option<(i64, i64)> {
        None
    }

    fn timeline(&self) -> &[TimedEdge] {
        &self.timeline
    }

    fn earliest_time(&self) -> Option<i64> {
        TemporalGraph::earliest_time(self)
    }

    fn latest_time(&self) -> Option<i64> {
        TemporalGraph::latest_time(self)
    }
}

fn validate_node(record: &NodeRecord, index: usize) -> LedgerResult<Option<i64>> {
    if record.id.trim().is_empty() {
        return Err(LedgerError::InvalidRecord {
            index,
            field: "id",
            reason: "is empty".to_string(),
        });
    }
    match &record.timestamp {
        None => Ok(None),
        Some(t) => t.to_seconds().map(Some).ok_or(LedgerError::InvalidRecord {
            index,
            field: "timestamp",
            reason: format!("cannot parse {t}"),
        }),
    }
}

fn rejection(err: LedgerError, index: usize) -> RejectedRecord {
    match err {
        LedgerError::InvalidRecord { field, reason, .. } => RejectedRecord {
            index,
            field: field.to_string(),
            reason,
        },
        other => RejectedRecord {
            index,
            field: String::new(),
            reason: other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::edge::{AmountValue, TimeValue};

    fn records() -> Vec<EdgeRecord> {
        vec![
            EdgeRecord::new("a", "b", 30, 1.0),
            EdgeRecord::new("b", "c", 10, 2.0),
            EdgeRecord::new("c", "a", 20, 3.0),
            EdgeRecord::new("a", "b", 10, 4.0),
        ]
    }

    #[test]
    fn test_counts_and_time_span() {
        let (g, report) =
            TemporalGraph::from_records(&records(), InvalidRecordPolicy::Fail).unwrap();
        assert_eq!(report.accepted, 4);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.earliest_time(), Some(10));
        assert_eq!(g.latest_time(), Some(30));
        assert!(g.is_frozen());
    }

    #[test]
    fn test_timeline_sorted_with_insertion_tie_break() {
        let (g, _) = TemporalGraph::from_records(&records(), InvalidRecordPolicy::Fail).unwrap();
        let order: Vec<EdgeIndex> = g.timeline().iter().map(|t| t.edge).collect();
        // edges 1 and 3 share t=10; insertion order decides
        assert_eq!(order, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_out_of_order_inserts_sorted_at_freeze() {
        let mut g = TemporalGraph::new();
        g.add_edge("a", "b", 10, 1.0).unwrap();
        g.add_edge("b", "c", 20, 1.0).unwrap();
        assert!(g.is_indexed());
        g.add_edge("c", "a", 5, 1.0).unwrap();
        g.add_edge("a", "c", 5, 1.0).unwrap();

        assert!(!g.is_indexed());
        assert_eq!(g.earliest_time(), Some(5));
        assert_eq!(g.latest_time(), Some(20));
        assert!(matches!(
            g.window(0, 100),
            Err(LedgerError::Unindexed { operation: "window" })
        ));

        g.freeze();
        assert!(g.is_indexed());
        let order: Vec<EdgeIndex> = g.timeline().iter().map(|t| t.edge).collect();
        assert_eq!(order, vec![2, 3, 0, 1]);
        let a = g.index_of("a").unwrap();
        let around_a: Vec<EdgeIndex> = g
            .incident_closed(a, Direction::Both, 0, 100)
            .iter()
            .map(|t| t.edge)
            .collect();
        assert_eq!(around_a, vec![2, 3, 0]);
        assert_eq!(g.window(0, 10).unwrap().edge_count(), 2);
    }

    #[test]
    fn test_reversed_input_builds_sorted_indices() {
        let records: Vec<EdgeRecord> = (0..2_000)
            .rev()
            .map(|t| EdgeRecord::new(format!("n{}", t % 7), format!("n{}", t % 11), t, 1.0))
            .collect();
        let (g, _) = TemporalGraph::from_records(&records, InvalidRecordPolicy::Fail).unwrap();
        let times: Vec<i64> = g.timeline().iter().map(|t| t.timestamp).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        for node in 0..g.node_count() {
            let list = g.incident_closed(node, Direction::Both, i64::MIN, i64::MAX);
            assert!(list.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_first_seen_is_earliest_incident_edge() {
        let (g, _) = TemporalGraph::from_records(&records(), InvalidRecordPolicy::Fail).unwrap();
        assert_eq!(g.node_by_address("a").unwrap().first_seen, Some(10));
        assert_eq!(g.node_by_address("c").unwrap().first_seen, Some(10));
    }

    #[test]
    fn test_frozen_store_rejects_mutation() {
        let (mut g, _) =
            TemporalGraph::from_records(&records(), InvalidRecordPolicy::Fail).unwrap();
        assert!(matches!(
            g.add_edge("x", "y", 1, 1.0),
            Err(LedgerError::FrozenStore { operation: "add_edge" })
        ));
        assert!(matches!(
            g.add_node("x", None, BTreeMap::new()),
            Err(LedgerError::FrozenStore { .. })
        ));
        assert!(matches!(
            g.ingest_edges(&records(), InvalidRecordPolicy::Skip),
            Err(LedgerError::FrozenStore { .. })
        ));
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_skip_policy_counts_invalid_records() {
        let mut recs = records();
        let mut missing_time = EdgeRecord::new("d", "e", 0, 1.0);
        missing_time.timestamp = None;
        let mut bad_value = EdgeRecord::new("d", "e", 0, 1.0);
        bad_value.value = Some(AmountValue::Text("n/a".into()));
        recs.insert(1, missing_time);
        recs.push(bad_value);

        let (g, report) = TemporalGraph::from_records(&recs, InvalidRecordPolicy::Skip).unwrap();
        assert_eq!(report.accepted, 4);
        assert_eq!(report.rejected_count(), 2);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].field, "timestamp");
        assert_eq!(report.rejected[1].index, 5);
        assert_eq!(report.rejected[1].field, "value");
        assert_eq!(g.edge_count(), 4);
        assert!(g.node_by_address("d").is_none());
    }

    #[test]
    fn test_fail_policy_reports_offending_record() {
        let mut recs = records();
        recs[2].timestamp = Some(TimeValue::Text("soon".into()));
        let mut g = TemporalGraph::new();
        match g.ingest_edges(&recs, InvalidRecordPolicy::Fail) {
            Err(LedgerError::InvalidRecord { index, field, .. }) => {
                assert_eq!(index, 2);
                assert_eq!(field, "timestamp");
            }
            other => panic!("expected InvalidRecord, got {:?}", other),
        }
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_add_node_updates_metadata_only() {
        let mut g = TemporalGraph::new();
        g.add_edge("a", "b", 100, 1.0).unwrap();
        let mut attrs = BTreeMap::new();
        attrs.insert("kind".to_string(), "exchange".to_string());
        g.add_node("a", Some(40), attrs).unwrap();
        g.add_node("z", None, BTreeMap::new()).unwrap();

        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node_count(), 3);
        let a = g.node_by_address("a").unwrap();
        assert_eq!(a.first_seen, Some(40));
        assert_eq!(a.attributes.get("kind").map(String::as_str), Some("exchange"));
        assert_eq!(g.node_by_address("z").unwrap().first_seen, None);
    }

    #[test]
    fn test_ingest_nodes_sets_labels() {
        let mut g = TemporalGraph::new();
        let recs = vec![
            NodeRecord::new("a").with_label("wallet").with_timestamp(3),
            NodeRecord::new(""),
        ];
        let report = g.ingest_nodes(&recs, InvalidRecordPolicy::Skip).unwrap();
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected[0].field, "id");
        assert_eq!(g.node_by_address("a").unwrap().label.as_deref(), Some("wallet"));
    }

    #[test]
    fn test_self_loop_stored_once_in_incident_index() {
        let mut g = TemporalGraph::new();
        g.add_edge("a", "a", 5, 1.0).unwrap();
        g.freeze();
        let a = g.index_of("a").unwrap();
        assert_eq!(g.incident_closed(a, Direction::Both, 0, 10).len(), 1);
        assert_eq!(g.incident_closed(a, Direction::Outgoing, 0, 10).len(), 1);
        assert_eq!(g.incident_closed(a, Direction::Incoming, 0, 10).len(), 1);
        assert_eq!(g.static_degree(a), (0, 0));
    }

    #[test]
    fn test_summary_display() {
        let (g, _) = TemporalGraph::from_records(
            &[EdgeRecord::new("a", "b", 0, 1.0), EdgeRecord::new("b", "a", 86_400, 1.0)],
            InvalidRecordPolicy::Fail,
        )
        .unwrap();
        let s = g.summary();
        assert_eq!(s.node_count, 2);
        assert_eq!(
            s.to_string(),
            "2 nodes, 2 edges, 1970-01-01T00:00:00+00:00 .. 1970-01-02T00:00:00+00:00"
        );
    }
}
