use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Number of three-edge temporal motif classes tracked by the census.
pub const MOTIF_CLASS_COUNT: usize = 40;

const STAR_BLOCK: usize = 8;
const TWO_NODE_OFFSET: usize = 24;
const TRIANGLE_OFFSET: usize = 32;

// ---------------------------------------------------------------------------
// Orientation / StarShape / MotifKind: the parts a class is made of
// ---------------------------------------------------------------------------

/// Direction of an edge relative to a reference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Incoming,
    Outgoing,
}

impl Orientation {
    pub fn bit(self) -> usize {
        match self {
            Orientation::Incoming => 0,
            Orientation::Outgoing => 1,
        }
    }

    fn from_bit(bit: usize) -> Self {
        if bit & 1 == 1 {
            Orientation::Outgoing
        } else {
            Orientation::Incoming
        }
    }

    pub fn letter(self) -> char {
        match self {
            Orientation::Incoming => 'I',
            Orientation::Outgoing => 'O',
        }
    }
}

/// Which leaf the star's three edges visit, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StarShape {
    /// `c-j, c-j, c-k`
    Pre,
    /// `c-j, c-k, c-j`
    Mid,
    /// `c-j, c-k, c-k`
    Post,
}

impl StarShape {
    fn block(self) -> usize {
        match self {
            StarShape::Pre => 0,
            StarShape::Mid => 1,
            StarShape::Post => 2,
        }
    }

    fn name(self) -> &'static str {
        match self {
            StarShape::Pre => "pre",
            StarShape::Mid => "mid",
            StarShape::Post => "post",
        }
    }
}

/// Decoded view of a motif class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotifKind {
    /// Three edges sharing a centre node, touching two distinct leaves.
    /// Orientations are relative to the centre.
    Star {
        shape: StarShape,
        orientations: [Orientation; 3],
    },
    /// Three edges between the same two nodes. Orientations are relative to
    /// the endpoint whose address sorts first.
    TwoNode { orientations: [Orientation; 3] },
    /// Three edges on three distinct node pairs, numbered 1..=8.
    Triangle { number: u8 },
}

// ---------------------------------------------------------------------------
// MotifClass: one of the 40 histogram slots
// ---------------------------------------------------------------------------

/// A three-edge, up-to-three-node temporal motif class.
///
/// Slot layout: 0..24 stars (8 pre, 8 mid, 8 post), 24..32 two-node
/// motifs, 32..40 triangles. Within star and two-node blocks the slot is
/// `4*o1 + 2*o2 + o3` with `I = 0`, `O = 1`.
///
/// Triangles, with `i -> j` the first edge:
///
/// | # | second | third |
/// |---|--------|-------|
/// | 1 | k -> j | i -> k |
/// | 2 | k -> i | j -> k |
/// | 3 | j -> k | i -> k |
/// | 4 | i -> k | j -> k |
/// | 5 | k -> j | k -> i |
/// | 6 | k -> i | k -> j |
/// | 7 | j -> k | k -> i |
/// | 8 | i -> k | k -> j |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MotifClass(u8);

impl MotifClass {
    /// The directed 3-cycle `i -> j -> k -> i`.
    pub const CYCLE: MotifClass = MotifClass((TRIANGLE_OFFSET + 6) as u8);

    pub fn star(shape: StarShape, orientations: [Orientation; 3]) -> Self {
        Self((shape.block() * STAR_BLOCK + pattern(orientations)) as u8)
    }

    pub fn two_node(orientations: [Orientation; 3]) -> Self {
        Self((TWO_NODE_OFFSET + pattern(orientations)) as u8)
    }

    /// Triangle class by its 1-based number.
    pub fn triangle(number: u8) -> Self {
        debug_assert!((1..=8).contains(&number));
        Self(TRIANGLE_OFFSET as u8 + number - 1)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        (index < MOTIF_CLASS_COUNT).then_some(Self(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = MotifClass> {
        (0..MOTIF_CLASS_COUNT as u8).map(MotifClass)
    }

    pub fn kind(self) -> MotifKind {
        let i = self.index();
        if i < TWO_NODE_OFFSET {
            let shape = match i / STAR_BLOCK {
                0 => StarShape::Pre,
                1 => StarShape::Mid,
                _ => StarShape::Post,
            };
            MotifKind::Star {
                shape,
                orientations: unpattern(i % STAR_BLOCK),
            }
        } else if i < TRIANGLE_OFFSET {
            MotifKind::TwoNode {
                orientations: unpattern(i - TWO_NODE_OFFSET),
            }
        } else {
            MotifKind::Triangle {
                number: (i - TRIANGLE_OFFSET + 1) as u8,
            }
        }
    }

    /// Stable column label, e.g. `star-pre-IIO`, `pair-OOO`, `triangle-7`.
    pub fn label(self) -> String {
        match self.kind() {
            MotifKind::Star {
                shape,
                orientations,
            } => format!("star-{}-{}", shape.name(), letters(orientations)),
            MotifKind::TwoNode { orientations } => format!("pair-{}", letters(orientations)),
            MotifKind::Triangle { number } => format!("triangle-{number}"),
        }
    }
}

impl std::fmt::Display for MotifClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

fn pattern(o: [Orientation; 3]) -> usize {
    4 * o[0].bit() + 2 * o[1].bit() + o[2].bit()
}

fn unpattern(p: usize) -> [Orientation; 3] {
    [
        Orientation::from_bit(p >> 2),
        Orientation::from_bit(p >> 1),
        Orientation::from_bit(p),
    ]
}

fn letters(o: [Orientation; 3]) -> String {
    o.iter().map(|d| d.letter()).collect()
}

// ---------------------------------------------------------------------------
// MotifHistogram: 40 counts for one delta
// ---------------------------------------------------------------------------

/// Motif counts for a single delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHistogram")]
pub struct MotifHistogram {
    delta: i64,
    counts: Vec<u64>,
}

#[derive(Deserialize)]
struct RawHistogram {
    delta: i64,
    counts: Vec<u64>,
}

impl TryFrom<RawHistogram> for MotifHistogram {
    type Error = LedgerError;

    fn try_from(raw: RawHistogram) -> LedgerResult<Self> {
        if raw.counts.len() != MOTIF_CLASS_COUNT {
            return Err(LedgerError::InvalidParameter(format!(
                "motif histogram needs {} counts, got {}",
                MOTIF_CLASS_COUNT,
                raw.counts.len()
            )));
        }
        Ok(Self {
            delta: raw.delta,
            counts: raw.counts,
        })
    }
}

impl MotifHistogram {
    /// An all-zero histogram.
    pub fn new(delta: i64) -> Self {
        Self {
            delta,
            counts: vec![0; MOTIF_CLASS_COUNT],
        }
    }

    pub fn from_counts(delta: i64, counts: [u64; MOTIF_CLASS_COUNT]) -> Self {
        Self {
            delta,
            counts: counts.to_vec(),
        }
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn get(&self, class: MotifClass) -> u64 {
        self.counts[class.index()]
    }

    pub fn increment(&mut self, class: MotifClass) {
        self.counts[class.index()] += 1;
    }

    /// Total number of motif occurrences across all classes.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Add another histogram's counts into this one. Deltas must match.
    pub fn merge(&mut self, other: &MotifHistogram) -> LedgerResult<()> {
        if self.delta != other.delta {
            return Err(LedgerError::InvalidParameter(format!(
                "cannot merge histograms for delta {} and {}",
                self.delta, other.delta
            )));
        }
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        Ok(())
    }

    /// `(class, count)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (MotifClass, u64)> + '_ {
        MotifClass::all().zip(self.counts.iter().copied())
    }

    pub fn star_counts(&self) -> &[u64] {
        &self.counts[..TWO_NODE_OFFSET]
    }

    pub fn two_node_counts(&self) -> &[u64] {
        &self.counts[TWO_NODE_OFFSET..TRIANGLE_OFFSET]
    }

    pub fn triangle_counts(&self) -> &[u64] {
        &self.counts[TRIANGLE_OFFSET..]
    }

    /// Two-node counts with complementary orientation patterns folded
    /// together: `[III+OOO, IIO+OOI, IOI+OIO, IOO+OII]`.
    pub fn two_node_symmetrized(&self) -> [u64; 4] {
        let pair = self.two_node_counts();
        let mut folded = [0u64; 4];
        for (p, slot) in folded.iter_mut().enumerate() {
            *slot = pair[p] + pair[7 - p];
        }
        folded
    }
}

// ---------------------------------------------------------------------------
// MotifTable: rows = delta, columns = motif class
// ---------------------------------------------------------------------------

/// Per-delta motif histograms in the order the deltas were requested.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MotifTable {
    pub rows: Vec<MotifHistogram>,
}

impl MotifTable {
    pub fn deltas(&self) -> Vec<i64> {
        self.rows.iter().map(|h| h.delta()).collect()
    }

    pub fn get(&self, delta: i64) -> Option<&MotifHistogram> {
        self.rows.iter().find(|h| h.delta() == delta)
    }

    /// Column headers matching [`MotifTable::to_rows`].
    pub fn column_labels() -> Vec<String> {
        MotifClass::all().map(|c| c.label()).collect()
    }

    /// Plain count matrix, one row per delta.
    pub fn to_rows(&self) -> Vec<Vec<u64>> {
        self.rows.iter().map(|h| h.counts().to_vec()).collect()
    }
}
