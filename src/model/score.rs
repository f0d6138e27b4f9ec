use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// ScoreTable: node -> score with a deterministic ranking
// ---------------------------------------------------------------------------

/// One ranked row of a score table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub node: String,
    pub score: f64,
}

/// Scores keyed by node address. Rankings are descending by score with ties
/// broken by address ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    entries: Vec<ScoreEntry>,
}

fn rank_order(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.node.cmp(&b.node))
}

impl ScoreTable {
    pub fn new(scores: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            entries: scores
                .into_iter()
                .map(|(node, score)| ScoreEntry { node, score })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score of a single node, if present.
    pub fn get(&self, node: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.node == node).map(|e| e.score)
    }

    /// Sum of all scores.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.score).sum()
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        self.entries
            .iter()
            .map(|e| (e.node.clone(), e.score))
            .collect()
    }

    /// Full table, sorted.
    pub fn ranked(&self) -> Vec<ScoreEntry> {
        let mut out = self.entries.clone();
        out.sort_by(rank_order);
        out
    }

    /// The `n` highest-ranked rows. Only the selected prefix is sorted.
    pub fn top_n(&self, n: usize) -> Vec<ScoreEntry> {
        if n == 0 {
            return Vec::new();
        }
        if n >= self.entries.len() {
            return self.ranked();
        }
        let mut refs: Vec<&ScoreEntry> = self.entries.iter().collect();
        refs.select_nth_unstable_by(n - 1, |a, b| rank_order(a, b));
        refs.truncate(n);
        refs.sort_by(|a, b| rank_order(a, b));
        refs.into_iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// CentralityResult: scores plus best-effort warnings
// ---------------------------------------------------------------------------

/// The centrality measure that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentralityAlgorithm {
    Degree,
    PageRank,
    Betweenness,
}

impl std::fmt::Display for CentralityAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CentralityAlgorithm::Degree => "degree",
            CentralityAlgorithm::PageRank => "pagerank",
            CentralityAlgorithm::Betweenness => "betweenness",
        };
        f.write_str(name)
    }
}

/// Non-fatal conditions attached to a result that is still usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CentralityWarning {
    /// The iteration budget ran out before the change between iterations
    /// dropped below the requested tolerance.
    ConvergenceNotReached {
        iterations: usize,
        last_change: f64,
        tolerance: f64,
    },
    /// Betweenness was estimated from a sample of source nodes.
    Approximate { sampled_sources: usize, total_nodes: usize },
}

/// Output of one centrality computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityResult {
    pub algorithm: CentralityAlgorithm,
    pub scores: ScoreTable,
    /// Iterations actually run (PageRank) or sources expanded (betweenness).
    pub iterations: usize,
    pub warnings: Vec<CentralityWarning>,
}

impl CentralityResult {
    pub fn converged(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| matches!(w, CentralityWarning::ConvergenceNotReached { .. }))
    }

    pub fn top_n(&self, n: usize) -> Vec<ScoreEntry> {
        self.scores.top_n(n)
    }
}
