//! Degree, PageRank and betweenness over a time-collapsed projection.
//!
//! Each measure is a named operation on [`CentralityEngine`]; results are
//! [`CentralityResult`]s whose tables rank descending by score with ties
//! broken by address.

pub mod betweenness;
pub mod degree;
pub mod pagerank;
pub mod projection;

use std::time::Instant;

use tracing::{debug, warn};

use crate::cancel::CancellationFlag;
use crate::error::LedgerResult;
use crate::model::score::{CentralityAlgorithm, CentralityResult, CentralityWarning, ScoreTable};
use crate::store::TemporalView;

pub use betweenness::BetweennessConfig;
pub use pagerank::PageRankConfig;
pub use projection::StaticProjection;

// ---------------------------------------------------------------------------
// CentralityEngine
// ---------------------------------------------------------------------------

/// Runs centrality measures over one [`StaticProjection`].
///
/// The projection is built once and shared by every measure.
#[derive(Debug, Clone)]
pub struct CentralityEngine {
    projection: StaticProjection,
    cancel: Option<CancellationFlag>,
}

impl CentralityEngine {
    /// Project `view` and prepare to score it.
    pub fn new<V: TemporalView + ?Sized>(view: &V) -> Self {
        Self::from_projection(StaticProjection::from_view(view))
    }

    pub fn from_projection(projection: StaticProjection) -> Self {
        Self {
            projection,
            cancel: None,
        }
    }

    /// Poll `flag` between PageRank iterations and betweenness sources.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn projection(&self) -> &StaticProjection {
        &self.projection
    }

    fn table(&self, scores: Vec<f64>) -> ScoreTable {
        ScoreTable::new(self.projection.label(scores))
    }

    /// Distinct neighbours in either direction over `n - 1`.
    pub fn degree(&self) -> CentralityResult {
        let scores = degree::degree_scores(&self.projection);
        CentralityResult {
            algorithm: CentralityAlgorithm::Degree,
            scores: self.table(scores),
            iterations: 0,
            warnings: Vec::new(),
        }
    }

    /// PageRank by power iteration. Running out of iterations before the
    /// tolerance is met is reported as a warning, not an error.
    pub fn pagerank(&self, config: &PageRankConfig) -> LedgerResult<CentralityResult> {
        let started = Instant::now();
        let run = pagerank::pagerank_scores(&self.projection, config, self.cancel.as_ref())?;

        let mut warnings = Vec::new();
        if let (false, Some(tolerance)) = (run.converged, config.tolerance) {
            warn!(
                iterations = run.iterations,
                last_change = run.last_change,
                tolerance,
                "pagerank did not converge within the iteration budget"
            );
            warnings.push(CentralityWarning::ConvergenceNotReached {
                iterations: run.iterations,
                last_change: run.last_change,
                tolerance,
            });
        }
        debug!(
            nodes = self.projection.node_count(),
            iterations = run.iterations,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pagerank complete"
        );

        Ok(CentralityResult {
            algorithm: CentralityAlgorithm::PageRank,
            scores: self.table(run.scores),
            iterations: run.iterations,
            warnings,
        })
    }

    /// Brandes betweenness, exact unless `config.sample_size` asks for a
    /// sampled estimate.
    pub fn betweenness(&self, config: &BetweennessConfig) -> LedgerResult<CentralityResult> {
        let started = Instant::now();
        let run = betweenness::betweenness_scores(&self.projection, config, self.cancel.as_ref())?;

        let mut warnings = Vec::new();
        if run.sampled {
            warnings.push(CentralityWarning::Approximate {
                sampled_sources: run.sources,
                total_nodes: self.projection.node_count(),
            });
        }
        debug!(
            nodes = self.projection.node_count(),
            sources = run.sources,
            sampled = run.sampled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "betweenness complete"
        );

        Ok(CentralityResult {
            algorithm: CentralityAlgorithm::Betweenness,
            scores: self.table(run.scores),
            iterations: run.sources,
            warnings,
        })
    }
}
