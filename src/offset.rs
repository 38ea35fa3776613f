//! Offsets and the chromosome-indexed lists that hold them.
//!
//! An [`Offset`] records that at some position a variation of some signed length
//! occurs. Ingested lists are in reference (VCF `POS`) coordinates with signed
//! values. Synchronized lists are in the allele's own coordinates and every value
//! is the (positive) number of meta-genome bases the allele lacks right after that
//! position.

use serde::{Deserialize, Serialize};

/// The integer type for genomic positions.
pub type Position = u64;

/// The signed integer type for variant lengths.
pub type Length = i64;

/// A `(position, value)` pair. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    position: Position,
    value: Length,
}

impl Offset {
    pub fn new(position: Position, value: Length) -> Self {
        Self { position, value }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn value(&self) -> Length {
        self.value
    }

    /// The number of bases this offset spans, regardless of its sign.
    pub fn length(&self) -> Position {
        self.value.unsigned_abs()
    }
}

/// Per-chromosome, position-sorted offset lists for one allele.
///
/// Lists are indexed by chromosome index (the order of the chromosome list in the
/// [`SyncContext`](crate::context::SyncContext)), never by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlleleOffsetList {
    chromosomes: Vec<Vec<Offset>>,
}

impl AlleleOffsetList {
    /// Create empty lists for `n_chromosomes` chromosomes.
    pub fn new(n_chromosomes: usize) -> Self {
        Self {
            chromosomes: vec![Vec::new(); n_chromosomes],
        }
    }

    /// Return the number of chromosomes.
    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    /// Return if there are no chromosomes.
    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// Append an offset. Ordering is restored by [`AlleleOffsetList::sort_and_merge`].
    ///
    /// # Panics
    /// If `chromosome` is out of range.
    pub fn push(&mut self, chromosome: usize, offset: Offset) {
        self.chromosomes[chromosome].push(offset);
    }

    /// The offsets of a chromosome, or an empty slice for an unknown index.
    pub fn get(&self, chromosome: usize) -> &[Offset] {
        self.chromosomes
            .get(chromosome)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace a chromosome's list wholesale.
    pub fn replace(&mut self, chromosome: usize, offsets: Vec<Offset>) {
        self.chromosomes[chromosome] = offsets;
    }

    /// Drop every offset, keeping the chromosome slots.
    pub fn clear(&mut self) {
        for offsets in self.chromosomes.iter_mut() {
            offsets.clear();
        }
    }

    /// Iterate over `(chromosome index, offsets)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Offset])> {
        self.chromosomes
            .iter()
            .enumerate()
            .map(|(i, offsets)| (i, offsets.as_slice()))
    }

    /// Stable sort every chromosome by position, then collapse entries sharing a
    /// position into the widest one (largest absolute value, first one wins a tie).
    ///
    /// For the reference list this is the "maximum insertion" rule.
    pub fn sort_and_merge(&mut self) {
        for offsets in self.chromosomes.iter_mut() {
            offsets.sort_by_key(|offset| offset.position);
            offsets.dedup_by(|next, kept| {
                if next.position != kept.position {
                    return false;
                }
                if next.length() > kept.length() {
                    *kept = *next;
                }
                true
            });
        }
    }

    /// Return whether a chromosome's list is strictly increasing by position.
    pub fn is_sorted(&self, chromosome: usize) -> bool {
        is_strictly_sorted(self.get(chromosome))
    }
}

pub(crate) fn is_strictly_sorted(offsets: &[Offset]) -> bool {
    offsets
        .windows(2)
        .all(|pair| pair[0].position < pair[1].position)
}

/// Translate a position through a synchronized list into meta-genome coordinates.
///
/// Every offset strictly before `position` contributes its value.
pub fn to_meta(offsets: &[Offset], position: Position) -> Position {
    let shift: Position = offsets
        .iter()
        .take_while(|offset| offset.position < position)
        .map(Offset::length)
        .sum();
    position + shift
}

/// Translate a meta-genome position back through a synchronized list.
///
/// Returns `None` when the meta position falls in a gap, i.e. on bases this
/// allele does not carry.
pub fn from_meta(offsets: &[Offset], meta: Position) -> Option<Position> {
    let mut shift: Position = 0;
    for offset in offsets {
        let gap_start = offset.position + shift + 1;
        if meta < gap_start {
            break;
        }
        if meta < gap_start + offset.length() {
            return None;
        }
        shift += offset.length();
    }
    Some(meta - shift)
}
