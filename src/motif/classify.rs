use crate::model::edge::Edge;
use crate::model::motif::{MotifClass, Orientation, StarShape};
use crate::model::node::NodeIndex;
use crate::store::TemporalGraph;

// ---------------------------------------------------------------------------
// Classification of a chronologically ordered edge triple
// ---------------------------------------------------------------------------

/// Up to three distinct nodes, in first-seen order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeTrio {
    nodes: [NodeIndex; 3],
    len: usize,
}

impl NodeTrio {
    pub(crate) fn new() -> Self {
        Self {
            nodes: [0; 3],
            len: 0,
        }
    }

    /// Add `node` if absent. Returns false when a fourth node would be needed.
    pub(crate) fn insert(&mut self, node: NodeIndex) -> bool {
        if self.contains(node) {
            return true;
        }
        if self.len == 3 {
            return false;
        }
        self.nodes[self.len] = node;
        self.len += 1;
        true
    }

    pub(crate) fn contains(&self, node: NodeIndex) -> bool {
        self.as_slice().contains(&node)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn as_slice(&self) -> &[NodeIndex] {
        &self.nodes[..self.len]
    }
}

fn orientation(edge: &Edge, reference: NodeIndex) -> Orientation {
    if edge.source == reference {
        Orientation::Outgoing
    } else {
        Orientation::Incoming
    }
}

fn unordered(edge: &Edge) -> (NodeIndex, NodeIndex) {
    (edge.source.min(edge.target), edge.source.max(edge.target))
}

/// Map three edges, already in `(timestamp, insertion)` order, to their
/// motif class. Returns `None` for triples that are not a motif: a
/// self-loop, or more than three nodes.
pub fn classify(graph: &TemporalGraph, edges: [&Edge; 3]) -> Option<MotifClass> {
    if edges.iter().any(|e| e.is_self_loop()) {
        return None;
    }
    let mut trio = NodeTrio::new();
    for e in edges {
        if !(trio.insert(e.source) && trio.insert(e.target)) {
            return None;
        }
    }

    match trio.len() {
        2 => {
            let (a, b) = (trio.as_slice()[0], trio.as_slice()[1]);
            let reference = if graph.address(a) <= graph.address(b) { a } else { b };
            Some(MotifClass::two_node(edges.map(|e| orientation(e, reference))))
        }
        3 => {
            let pairs = edges.map(unordered);
            let repeats_a_pair =
                pairs[0] == pairs[1] || pairs[0] == pairs[2] || pairs[1] == pairs[2];
            if !repeats_a_pair {
                Some(classify_triangle(edges))
            } else {
                classify_star(edges)
            }
        }
        _ => None,
    }
}

fn classify_star(edges: [&Edge; 3]) -> Option<MotifClass> {
    // the centre is the only node shared by all three edges
    let center = [edges[0].source, edges[0].target]
        .into_iter()
        .find(|&n| edges[1].touches(n) && edges[2].touches(n))?;
    let leaves = [
        edges[0].other(center)?,
        edges[1].other(center)?,
        edges[2].other(center)?,
    ];
    let shape = if leaves[0] == leaves[1] {
        StarShape::Pre
    } else if leaves[0] == leaves[2] {
        StarShape::Mid
    } else {
        StarShape::Post
    };
    Some(MotifClass::star(shape, edges.map(|e| orientation(e, center))))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    I,
    J,
    K,
}

fn classify_triangle(edges: [&Edge; 3]) -> MotifClass {
    let (i, j) = (edges[0].source, edges[0].target);
    let role = |n: NodeIndex| {
        if n == i {
            Role::I
        } else if n == j {
            Role::J
        } else {
            Role::K
        }
    };
    let second = (role(edges[1].source), role(edges[1].target));
    let third = (role(edges[2].source), role(edges[2].target));

    let number = match (second, third) {
        ((Role::K, Role::J), (Role::I, Role::K)) => 1,
        ((Role::K, Role::I), (Role::J, Role::K)) => 2,
        ((Role::J, Role::K), (Role::I, Role::K)) => 3,
        ((Role::I, Role::K), (Role::J, Role::K)) => 4,
        ((Role::K, Role::J), (Role::K, Role::I)) => 5,
        ((Role::K, Role::I), (Role::K, Role::J)) => 6,
        ((Role::J, Role::K), (Role::K, Role::I)) => 7,
        ((Role::I, Role::K), (Role::K, Role::J)) => 8,
        // three distinct pairs with i -> j first leave exactly the eight cases above
        _ => unreachable!("triangle edges {second:?} / {third:?} do not close i, j, k"),
    };
    MotifClass::triangle(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::motif::{MotifKind, Orientation::Incoming as I, Orientation::Outgoing as O};

    /// Build a graph holding the given (src, dst) edges at t = 0, 1, 2 and
    /// classify them in that order.
    fn classify_named(edges: [(&str, &str); 3]) -> Option<MotifClass> {
        let mut g = TemporalGraph::new();
        for (t, (s, d)) in edges.iter().enumerate() {
            g.add_edge(s, d, t as i64, 1.0).unwrap();
        }
        g.freeze();
        let e = g.edge_list();
        classify(&g, [&e[0], &e[1], &e[2]])
    }

    #[test]
    fn test_all_eight_triangles() {
        let cases = [
            ([("i", "j"), ("k", "j"), ("i", "k")], 1),
            ([("i", "j"), ("k", "i"), ("j", "k")], 2),
            ([("i", "j"), ("j", "k"), ("i", "k")], 3),
            ([("i", "j"), ("i", "k"), ("j", "k")], 4),
            ([("i", "j"), ("k", "j"), ("k", "i")], 5),
            ([("i", "j"), ("k", "i"), ("k", "j")], 6),
            ([("i", "j"), ("j", "k"), ("k", "i")], 7),
            ([("i", "j"), ("i", "k"), ("k", "j")], 8),
        ];
        for (edges, number) in cases {
            assert_eq!(classify_named(edges), Some(MotifClass::triangle(number)), "{edges:?}");
        }
    }

    #[test]
    fn test_cycle_is_triangle_seven() {
        let class = classify_named([("a", "b"), ("b", "c"), ("c", "a")]).unwrap();
        assert_eq!(class, MotifClass::CYCLE);
        assert_eq!(class.kind(), MotifKind::Triangle { number: 7 });
    }

    #[test]
    fn test_star_shapes_and_orientations() {
        // c -> j, c -> j, k -> c
        assert_eq!(
            classify_named([("c", "j"), ("c", "j"), ("k", "c")]),
            Some(MotifClass::star(StarShape::Pre, [O, O, I]))
        );
        // j -> c, c -> k, c -> j
        assert_eq!(
            classify_named([("j", "c"), ("c", "k"), ("c", "j")]),
            Some(MotifClass::star(StarShape::Mid, [I, O, O]))
        );
        // j -> c, k -> c, c -> k
        assert_eq!(
            classify_named([("j", "c"), ("k", "c"), ("c", "k")]),
            Some(MotifClass::star(StarShape::Post, [I, I, O]))
        );
    }

    #[test]
    fn test_two_node_reference_is_smaller_address() {
        assert_eq!(
            classify_named([("b", "a"), ("a", "b"), ("b", "a")]),
            Some(MotifClass::two_node([I, O, I]))
        );
        assert_eq!(
            classify_named([("a", "b"), ("a", "b"), ("b", "a")]),
            Some(MotifClass::two_node([O, O, I]))
        );
    }

    #[test]
    fn test_non_motifs() {
        assert_eq!(classify_named([("a", "b"), ("c", "d"), ("a", "c")]), None);
        assert_eq!(classify_named([("a", "a"), ("a", "b"), ("b", "c")]), None);
    }

    #[test]
    fn test_node_trio_caps_at_three() {
        let mut trio = NodeTrio::new();
        assert!(trio.insert(4) && trio.insert(4) && trio.insert(2) && trio.insert(9));
        assert!(!trio.insert(1));
        assert_eq!(trio.as_slice(), &[4, 2, 9]);
    }
}
