//! Three-edge temporal motif census.
//!
//! For a delta `d`, an occurrence is a set of three distinct edges
//! `e1 < e2 < e3` (ordered by timestamp, then insertion) with no self-loop,
//! at most three distinct endpoints and `t(e3) - t(e1) <= d`. Each
//! occurrence is found exactly once by expanding outward from its first
//! edge through the per-node time indices, so no global deduplication set
//! is needed and the result does not depend on traversal order.

pub mod classify;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::cancel::CancellationFlag;
use crate::error::{LedgerError, LedgerResult};
use crate::model::edge::{Direction, Edge, EdgeIndex};
use crate::model::motif::{MotifClass, MotifHistogram, MotifTable, MOTIF_CLASS_COUNT};
use crate::store::{TemporalView, TimedEdge};

pub use classify::classify;
use classify::NodeTrio;

/// One motif instance, for inspection on small graphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotifOccurrence {
    pub class: MotifClass,
    /// Edge indices in chronological order.
    pub edges: [EdgeIndex; 3],
}

// ---------------------------------------------------------------------------
// MotifCensus: the counting engine
// ---------------------------------------------------------------------------

/// Counts temporal motifs over any [`TemporalView`].
#[derive(Debug, Clone, Default)]
pub struct MotifCensus {
    cancel: Option<CancellationFlag>,
}

impl MotifCensus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll `flag` between first edges and stop with
    /// [`LedgerError::Cancelled`] once it is set.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn check_cancelled(&self) -> LedgerResult<()> {
        match &self.cancel {
            Some(flag) => flag.check(),
            None => Ok(()),
        }
    }

    /// Histogram of all occurrences within `delta` seconds.
    /// An empty view yields an all-zero histogram.
    pub fn count<V: TemporalView>(&self, view: &V, delta: i64) -> LedgerResult<MotifHistogram> {
        validate_delta(delta)?;
        view.graph().ensure_indexed("motif census")?;
        let started = Instant::now();

        let counts = view
            .timeline()
            .par_iter()
            .try_fold(
                || [0u64; MOTIF_CLASS_COUNT],
                |mut acc, first| {
                    self.check_cancelled()?;
                    expand_from(view, delta, *first, &mut |class, _| acc[class.index()] += 1);
                    Ok::<_, LedgerError>(acc)
                },
            )
            .try_reduce(
                || [0u64; MOTIF_CLASS_COUNT],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b) {
                        *x += y;
                    }
                    Ok(a)
                },
            )?;

        let histogram = MotifHistogram::from_counts(delta, counts);
        debug!(
            delta,
            edges = view.edge_count(),
            occurrences = histogram.total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "motif census complete"
        );
        Ok(histogram)
    }

    /// One histogram per delta, in the order given. Deltas run in parallel.
    pub fn count_multi<V: TemporalView>(
        &self,
        view: &V,
        deltas: &[i64],
    ) -> LedgerResult<MotifTable> {
        let rows = deltas
            .par_iter()
            .map(|&delta| self.count(view, delta))
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(MotifTable { rows })
    }

    /// Every occurrence within `delta`, sorted by edge indices.
    pub fn occurrences<V: TemporalView>(
        &self,
        view: &V,
        delta: i64,
    ) -> LedgerResult<Vec<MotifOccurrence>> {
        validate_delta(delta)?;
        view.graph().ensure_indexed("motif occurrences")?;
        let mut found = Vec::new();
        for first in view.timeline() {
            self.check_cancelled()?;
            expand_from(view, delta, *first, &mut |class, edges| {
                found.push(MotifOccurrence {
                    class,
                    edges: edges.map(|e| e.id),
                });
            });
        }
        found.sort_by_key(|o| o.edges);
        Ok(found)
    }
}

fn validate_delta(delta: i64) -> LedgerResult<()> {
    if delta < 0 {
        return Err(LedgerError::InvalidParameter(format!(
            "motif delta must be non-negative, got {delta}"
        )));
    }
    Ok(())
}

/// Report every occurrence whose chronologically first edge is `first`.
///
/// The second edge must share an endpoint with `first`; the third must keep
/// the node set at three or fewer. An edge reachable from two endpoints is
/// only taken from the endpoint listed first, so each occurrence is emitted
/// once.
fn expand_from<'g, V, F>(view: &'g V, delta: i64, first: TimedEdge, sink: &mut F)
where
    V: TemporalView + ?Sized,
    F: FnMut(MotifClass, [&'g Edge; 3]),
{
    let graph = view.graph();
    let e1 = graph.edge(first.edge);
    if e1.is_self_loop() {
        return;
    }
    let horizon = e1.timestamp.saturating_add(delta);
    let key1 = e1.order_key();
    let (u, v) = (e1.source, e1.target);

    for x in [u, v] {
        for t2 in view.incident(x, Direction::Both, e1.timestamp, horizon) {
            let e2 = graph.edge(t2.edge);
            if e2.order_key() <= key1 || e2.is_self_loop() {
                continue;
            }
            if x == v && e2.touches(u) {
                continue;
            }

            let mut trio = NodeTrio::new();
            trio.insert(u);
            trio.insert(v);
            trio.insert(e2.source);
            trio.insert(e2.target);
            let key2 = e2.order_key();

            for (pos, &y) in trio.as_slice().iter().enumerate() {
                for t3 in view.incident(y, Direction::Both, e2.timestamp, horizon) {
                    let e3 = graph.edge(t3.edge);
                    if e3.order_key() <= key2 || e3.is_self_loop() {
                        continue;
                    }
                    let Some(other) = e3.other(y) else {
                        continue;
                    };
                    if trio.as_slice()[..pos].contains(&other) {
                        continue;
                    }
                    if trio.len() == 3 && !trio.contains(other) {
                        continue;
                    }
                    if let Some(class) = classify(graph, [e1, e2, e3]) {
                        sink(class, [e1, e2, e3]);
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
