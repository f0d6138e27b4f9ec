//! Degree centrality over the static projection.
//!
//! ```text
//! C_D(v) = |N_in(v) ∪ N_out(v)| / (n - 1)
//! ```
//!
//! A neighbour counts once however many transfers, in either direction,
//! connect it to `v`, so scores stay in `[0, 1]`. A node with no incident
//! edges scores exactly 0.

use super::projection::StaticProjection;

#[allow(clippy::cast_precision_loss)]
pub(crate) fn degree_scores(projection: &StaticProjection) -> Vec<f64> {
    let n = projection.node_count();
    if n < 2 {
        return vec![0.0; n];
    }
    let norm = (n - 1) as f64;
    (0..n)
        .map(|v| {
            let total = union_len(projection.successors(v), projection.predecessors(v));
            total as f64 / norm
        })
        .collect()
}

/// Size of the union of two ascending, duplicate-free lists.
fn union_len(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    a.len() + b.len() - shared
}
