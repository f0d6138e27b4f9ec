use std::collections::HashMap;

use crate::model::node::NodeIndex;
use crate::store::TemporalView;

// ---------------------------------------------------------------------------
// StaticProjection: the time-collapsed directed graph
// ---------------------------------------------------------------------------

/// A directed simple graph derived from a temporal view with timestamps
/// ignored.
///
/// Nodes are renumbered densely in address order. Parallel transfers
/// between the same ordered pair collapse into a single arc and self-loops
/// are dropped. For an unbounded view every stored node is present, even
/// one without edges; for a window only the addresses active in it are.
#[derive(Debug, Clone, Default)]
pub struct StaticProjection {
    addresses: Vec<String>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl StaticProjection {
    pub fn from_view<V: TemporalView + ?Sized>(view: &V) -> Self {
        let graph = view.graph();

        let mut members: Vec<NodeIndex> = if view.bounds().is_none() {
            (0..graph.node_count()).collect()
        } else {
            let mut active: Vec<NodeIndex> = view
                .edges()
                .flat_map(|e| [e.source, e.target])
                .collect();
            active.sort_unstable();
            active.dedup();
            active
        };
        members.sort_by(|a, b| graph.address(*a).cmp(graph.address(*b)));

        let dense: HashMap<NodeIndex, usize> = members
            .iter()
            .enumerate()
            .map(|(pos, &node)| (node, pos))
            .collect();

        let n = members.len();
        let mut outgoing = vec![Vec::new(); n];
        let mut incoming = vec![Vec::new(); n];
        for edge in view.edges() {
            if edge.is_self_loop() {
                continue;
            }
            // both endpoints are members by construction
            let (Some(&s), Some(&t)) = (dense.get(&edge.source), dense.get(&edge.target)) else {
                continue;
            };
            outgoing[s].push(t);
            incoming[t].push(s);
        }
        for list in outgoing.iter_mut().chain(incoming.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            addresses: members
                .into_iter()
                .map(|node| graph.address(node).to_string())
                .collect(),
            outgoing,
            incoming,
        }
    }

    pub fn node_count(&self) -> usize {
        self.addresses.len()
    }

    /// Number of distinct directed arcs.
    pub fn arc_count(&self) -> usize {
        self.outgoing.iter().map(Vec::len).sum()
    }

    pub fn address(&self, node: usize) -> &str {
        &self.addresses[node]
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Distinct successors, ascending.
    pub fn successors(&self, node: usize) -> &[usize] {
        &self.outgoing[node]
    }

    /// Distinct predecessors, ascending.
    pub fn predecessors(&self, node: usize) -> &[usize] {
        &self.incoming[node]
    }

    /// Pair dense scores back up with their addresses.
    pub(crate) fn label(&self, scores: Vec<f64>) -> Vec<(String, f64)> {
        self.addresses.iter().cloned().zip(scores).collect()
    }
}
