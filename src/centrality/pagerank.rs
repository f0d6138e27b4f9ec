//! PageRank by power iteration over the static projection.
//!
//! Each iteration reads the previous rank vector and writes a fresh one, so
//! the per-node update can run in parallel without read/write races. Rank
//! held by dangling nodes is spread uniformly over all nodes, which keeps
//! the total mass at 1.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::projection::StaticProjection;
use crate::cancel::CancellationFlag;
use crate::error::{LedgerError, LedgerResult};

/// PageRank configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Maximum number of iterations.
    pub iterations: usize,
    /// Probability of following an arc rather than teleporting.
    pub damping: f64,
    /// Stop early once the largest per-node change drops below this.
    /// `None` always runs the full iteration count.
    pub tolerance: Option<f64>,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            iterations: 20,
            damping: 0.85,
            tolerance: None,
        }
    }
}

impl PageRankConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(LedgerError::InvalidParameter(format!(
                "pagerank damping must be within (0, 1), got {}",
                self.damping
            )));
        }
        if let Some(tol) = self.tolerance {
            if !tol.is_finite() || tol < 0.0 {
                return Err(LedgerError::InvalidParameter(format!(
                    "pagerank tolerance must be a non-negative number, got {tol}"
                )));
            }
        }
        Ok(())
    }
}

pub(crate) struct PageRankRun {
    pub scores: Vec<f64>,
    pub iterations: usize,
    /// Largest per-node change in the last iteration run.
    pub last_change: f64,
    pub converged: bool,
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn pagerank_scores(
    projection: &StaticProjection,
    config: &PageRankConfig,
    cancel: Option<&CancellationFlag>,
) -> LedgerResult<PageRankRun> {
    config.validate()?;
    let n = projection.node_count();
    if n == 0 {
        return Ok(PageRankRun {
            scores: Vec::new(),
            iterations: 0,
            last_change: 0.0,
            converged: true,
        });
    }

    let nf = n as f64;
    let d = config.damping;
    let out_degree: Vec<f64> = (0..n)
        .map(|v| projection.successors(v).len() as f64)
        .collect();

    let mut rank = vec![1.0 / nf; n];
    let mut next = vec![0.0; n];
    let mut last_change = 0.0;
    let mut converged = config.tolerance.is_none();
    let mut iterations = 0;

    for _ in 0..config.iterations {
        if let Some(flag) = cancel {
            flag.check()?;
        }
        let dangling: f64 = (0..n)
            .filter(|&v| out_degree[v] == 0.0)
            .map(|v| rank[v])
            .sum();
        let base = (1.0 - d) / nf + d * dangling / nf;

        let prev = &rank;
        (0..n)
            .into_par_iter()
            .map(|v| {
                let inflow: f64 = projection
                    .predecessors(v)
                    .iter()
                    .map(|&u| prev[u] / out_degree[u])
                    .sum();
                base + d * inflow
            })
            .collect_into_vec(&mut next);

        last_change = rank
            .iter()
            .zip(&next)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        std::mem::swap(&mut rank, &mut next);
        iterations += 1;

        if let Some(tol) = config.tolerance {
            if last_change < tol {
                converged = true;
                break;
            }
        }
    }

    Ok(PageRankRun {
        scores: rank,
        iterations,
        last_change,
        converged,
    })
}
