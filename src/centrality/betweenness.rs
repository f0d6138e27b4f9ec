//! Betweenness centrality with Brandes' accumulation.
//!
//! ```text
//! C_B(v) = Σ_{s≠v≠t} σ_st(v) / σ_st
//! ```
//!
//! One BFS per source over the directed projection records shortest-path
//! counts `σ` and predecessor lists; a backward pass in reverse BFS order
//! accumulates the dependencies
//!
//! ```text
//! δ_s(v) = Σ_{w: v∈P_s(w)} (σ_sv/σ_sw) × (1 + δ_s(w))
//! ```
//!
//! Sources are independent. They are processed in fixed-size chunks in
//! parallel and the partial vectors are summed in chunk order, so the
//! result is bit-identical between runs.
//!
//! With `sample_size = Some(k)` only `k` seeded-random sources are
//! expanded and the sum is scaled by `n / k`. The result then carries a
//! [`CentralityWarning::Approximate`](crate::model::CentralityWarning).

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::projection::StaticProjection;
use crate::cancel::CancellationFlag;
use crate::error::{LedgerError, LedgerResult};

const SOURCES_PER_TASK: usize = 64;

/// Configuration for betweenness centrality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BetweennessConfig {
    /// Number of sampled source nodes; `None` expands every node.
    pub sample_size: Option<usize>,
    /// Seed for source sampling.
    pub seed: u64,
    /// Divide by `(n-1)(n-2)`.
    pub normalized: bool,
}

impl Default for BetweennessConfig {
    fn default() -> Self {
        Self {
            sample_size: None,
            seed: 42,
            normalized: true,
        }
    }
}

impl BetweennessConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.sample_size == Some(0) {
            return Err(LedgerError::InvalidParameter(
                "betweenness sample_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) struct BetweennessRun {
    pub scores: Vec<f64>,
    pub sources: usize,
    pub sampled: bool,
}

/// Source nodes to expand: all of them, or a sorted seeded sample.
fn pick_sources(n: usize, config: &BetweennessConfig) -> (Vec<usize>, bool) {
    match config.sample_size {
        Some(k) if k < n => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let mut picked = rand::seq::index::sample(&mut rng, n, k).into_vec();
            picked.sort_unstable();
            (picked, true)
        }
        _ => ((0..n).collect(), false),
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn betweenness_scores(
    projection: &StaticProjection,
    config: &BetweennessConfig,
    cancel: Option<&CancellationFlag>,
) -> LedgerResult<BetweennessRun> {
    config.validate()?;
    let n = projection.node_count();
    if n < 3 {
        // no node can lie strictly between two others
        return Ok(BetweennessRun {
            scores: vec![0.0; n],
            sources: n,
            sampled: false,
        });
    }

    let (sources, sampled) = pick_sources(n, config);

    let partials = sources
        .par_chunks(SOURCES_PER_TASK)
        .map(|chunk| -> LedgerResult<Vec<f64>> {
            let mut acc = vec![0.0_f64; n];
            for &s in chunk {
                if let Some(flag) = cancel {
                    flag.check()?;
                }
                accumulate_source(projection, s, &mut acc);
            }
            Ok(acc)
        })
        .collect::<LedgerResult<Vec<_>>>()?;

    let mut scores = vec![0.0_f64; n];
    for partial in partials {
        for (total, part) in scores.iter_mut().zip(partial) {
            *total += part;
        }
    }

    let mut scale = 1.0;
    if sampled {
        scale *= n as f64 / sources.len() as f64;
    }
    if config.normalized {
        scale /= ((n - 1) * (n - 2)) as f64;
    }
    for b in &mut scores {
        *b *= scale;
    }

    Ok(BetweennessRun {
        scores,
        sources: sources.len(),
        sampled,
    })
}

/// Add the dependencies of every node on source `s` to `acc`.
fn accumulate_source(projection: &StaticProjection, s: usize, acc: &mut [f64]) {
    let n = projection.node_count();
    let mut sigma = vec![0.0_f64; n];
    let mut dist = vec![usize::MAX; n];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);
    let mut queue = VecDeque::new();

    sigma[s] = 1.0;
    dist[s] = 0;
    queue.push_back(s);

    while let Some(v) = queue.pop_front() {
        order.push(v);
        for &w in projection.successors(v) {
            if dist[w] == usize::MAX {
                dist[w] = dist[v] + 1;
                queue.push_back(w);
            }
            if dist[w] == dist[v] + 1 {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0_f64; n];
    for &w in order.iter().rev() {
        for &v in &predecessors[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != s {
            acc[w] += delta[w];
        }
    }
}
