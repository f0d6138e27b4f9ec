use std::collections::HashSet;

use crate::error::{LedgerError, LedgerResult};
use crate::model::edge::{Direction, Edge};
use crate::model::node::NodeIndex;
use crate::store::graph::{TemporalGraph, TimedEdge};

// ---------------------------------------------------------------------------
// TemporalView: read-only interface shared by the graph and its windows
// ---------------------------------------------------------------------------

/// Read-only access to a time-bounded slice of a [`TemporalGraph`].
///
/// Bounds are closed `[lo, hi]` internally; `None` means unbounded. Every
/// query is clamped to the view's bounds, so an engine that runs over a
/// view never sees an edge outside it.
pub trait TemporalView: Sync {
    /// The underlying store.
    fn graph(&self) -> &TemporalGraph;

    /// Closed time bounds of this view, `None` for the whole graph.
    fn bounds(&self) -> Option<(i64, i64)>;

    /// Edges of this view in chronological order.
    fn timeline(&self) -> &[TimedEdge];

    /// Incident edges of `node` with `lo <= timestamp <= hi`, clamped to
    /// the view, in chronological order.
    fn incident(&self, node: NodeIndex, direction: Direction, lo: i64, hi: i64) -> &[TimedEdge] {
        let (lo, hi) = match self.bounds() {
            Some((vlo, vhi)) => (lo.max(vlo), hi.min(vhi)),
            None => (lo, hi),
        };
        self.graph().incident_closed(node, direction, lo, hi)
    }

    fn edge_count(&self) -> usize {
        self.timeline().len()
    }

    fn earliest_time(&self) -> Option<i64> {
        self.timeline().first().map(|t| t.timestamp)
    }

    fn latest_time(&self) -> Option<i64> {
        self.timeline().last().map(|t| t.timestamp)
    }

    /// Edges of this view in chronological order.
    fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        let graph = self.graph();
        self.timeline().iter().map(move |t| graph.edge(t.edge))
    }

    /// Number of distinct addresses that are an endpoint of an edge in view.
    fn active_node_count(&self) -> usize {
        let mut seen = HashSet::new();
        for edge in self.edges() {
            seen.insert(edge.source);
            seen.insert(edge.target);
        }
        seen.len()
    }

    /// Edges incident to `address` with `start <= timestamp < end`,
    /// ascending by timestamp then insertion order.
    fn neighbors_in_window(
        &self,
        address: &str,
        start: i64,
        end: i64,
        direction: Direction,
    ) -> LedgerResult<Vec<&Edge>> {
        if start > end {
            return Err(LedgerError::InvalidWindow { start, end });
        }
        self.graph().ensure_indexed("neighbors_in_window")?;
        let node = self
            .graph()
            .index_of(address)
            .ok_or_else(|| LedgerError::UnknownNode(address.to_string()))?;
        if start == end {
            return Ok(Vec::new());
        }
        let graph = self.graph();
        Ok(self
            .incident(node, direction, start, end - 1)
            .iter()
            .map(|t| graph.edge(t.edge))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// WindowView: the graph restricted to a half-open time range
// ---------------------------------------------------------------------------

/// A borrowed view of the edges with `start <= timestamp < end`.
#[derive(Debug, Clone, Copy)]
pub struct WindowView<'a> {
    graph: &'a TemporalGraph,
    start: i64,
    end: i64,
    timeline: &'a [TimedEdge],
}

impl<'a> WindowView<'a> {
    pub(crate) fn new(graph: &'a TemporalGraph, start: i64, end: i64) -> Self {
        let timeline = if start < end {
            graph.timeline_closed(start, end - 1)
        } else {
            &[]
        };
        Self {
            graph,
            start,
            end,
            timeline,
        }
    }

    /// Inclusive start of the window.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Exclusive end of the window.
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Narrow this window further. The result never extends past `self`.
    pub fn window(&self, start: i64, end: i64) -> LedgerResult<WindowView<'a>> {
        if start > end {
            return Err(LedgerError::InvalidWindow { start, end });
        }
        Ok(WindowView::new(
            self.graph,
            start.max(self.start),
            end.min(self.end),
        ))
    }
}

impl TemporalView for WindowView<'_> {
    fn graph(&self) -> &TemporalGraph {
        self.graph
    }

    fn bounds(&self) -> Option<(i64, i64)> {
        if self.start < self.end {
            Some((self.start, self.end - 1))
        } else {
            // lo > hi: every clamp comes out empty
            Some((1, 0))
        }
    }

    fn timeline(&self) -> &[TimedEdge] {
        self.timeline
    }
}
