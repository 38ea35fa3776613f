//! Position synchronization: merging each allele's offsets against the reference.
//!
//! Both inputs of [`synchronize_allele`] are in reference coordinates. The reference
//! list holds, per position, the widest insertion any genome made there; the
//! allele list holds the allele's own insertions (positive) and deletions
//! (negative). The output is in the allele's own coordinates: an offset
//! `(p, n)` says that right after the allele's base `p` the meta-genome holds
//! `n` bases the allele does not carry, either bases another genome inserted
//! or reference bases the allele deleted.
//!
//! Insertions are left-aligned: when an allele inserts fewer bases than the
//! widest insertion at a position, its own bases come first and the shortfall
//! follows them.

use log::{debug, info};
use std::cmp::Ordering;

use crate::genome::MultiGenome;
use crate::offset::{is_strictly_sorted, Length, Offset, Position};
use crate::variant::AlleleType;

/// Running state of a single merge.
#[derive(Debug, Default)]
struct Merge {
    /// Last reference position resolved; the end of the deleted span after a deletion.
    last_ref_position: Position,
    /// The allele position of the last resolved base, own inserted bases included.
    last_native_position: Position,
    output: Vec<Offset>,
}

impl Merge {
    /// The allele position holding reference base `position`, or the deletion
    /// anchor if that base was deleted.
    fn native_position(&self, position: Position) -> Position {
        if position <= self.last_ref_position {
            self.last_native_position
        } else {
            self.last_native_position + (position - self.last_ref_position)
        }
    }

    fn emit(&mut self, position: Position, value: Position) {
        if value == 0 {
            return;
        }
        let value = value as Length;
        match self.output.last_mut() {
            Some(last) if last.position() == position => {
                *last = Offset::new(position, last.value() + value);
            }
            _ => self.output.push(Offset::new(position, value)),
        }
    }

    fn resolve(&mut self, position: Position, native_position: Position) {
        self.last_ref_position = self.last_ref_position.max(position);
        self.last_native_position = native_position;
    }

    /// Only reference bases not already removed by an earlier deletion widen the gap.
    fn delete(&mut self, anchor: Position, position: Position, gap: Position, deleted: Position) {
        let end = position + deleted;
        let fresh = end.saturating_sub(self.last_ref_position.max(position));
        self.emit(anchor, gap + fresh);
        self.last_ref_position = self.last_ref_position.max(end);
        self.last_native_position = anchor;
    }

    /// Both lists have an event at the same position.
    fn shared(&mut self, reference: Offset, allele: Offset) {
        let position = allele.position();
        let anchor = self.native_position(position);
        match allele.value().cmp(&0) {
            Ordering::Greater => {
                let own = allele.length();
                let widest = reference.length();
                if widest < own {
                    debug!(
                        "insertion of {} at {} wider than the reference ({})",
                        own, position, widest
                    );
                }
                // another genome inserted more here, the gap follows our own bases
                self.emit(anchor + own, widest.saturating_sub(own));
                self.resolve(position, anchor + own);
            }
            Ordering::Less => {
                self.delete(anchor, position, reference.length(), allele.length());
            }
            Ordering::Equal => self.reference_only(reference),
        }
    }

    /// The allele has an event the reference list does not.
    fn private(&mut self, allele: Offset) {
        let position = allele.position();
        let anchor = self.native_position(position);
        match allele.value().cmp(&0) {
            Ordering::Less => self.delete(anchor, position, 0, allele.length()),
            Ordering::Greater => {
                debug!(
                    "insertion of {} at {} missing from the reference",
                    allele.length(),
                    position
                );
                self.resolve(position, anchor + allele.length());
            }
            Ordering::Equal => {}
        }
    }

    /// Another genome inserted at a position where this allele has nothing.
    fn reference_only(&mut self, reference: Offset) {
        let position = reference.position();
        let anchor = self.native_position(position);
        self.emit(anchor, reference.length());
        self.resolve(position, anchor);
    }
}

/// Merge one allele's sorted offsets against the reference's sorted offsets, for
/// one chromosome.
///
/// # Panics
/// If either list is not strictly increasing by position.
pub fn synchronize_allele(reference: &[Offset], allele: &[Offset]) -> Vec<Offset> {
    assert!(
        is_strictly_sorted(reference),
        "reference offsets must be sorted before synchronization"
    );
    assert!(
        is_strictly_sorted(allele),
        "allele offsets must be sorted before synchronization"
    );

    let mut merge = Merge::default();
    let mut reference = reference.iter().copied().peekable();
    let mut allele = allele.iter().copied().peekable();

    loop {
        match (reference.peek().copied(), allele.peek().copied()) {
            (None, None) => break,
            (Some(r), Some(a)) => match a.position().cmp(&r.position()) {
                Ordering::Equal => {
                    reference.next();
                    allele.next();
                    merge.shared(r, a);
                }
                Ordering::Less => {
                    allele.next();
                    merge.private(a);
                }
                Ordering::Greater => {
                    reference.next();
                    merge.reference_only(r);
                }
            },
            (None, Some(a)) => {
                allele.next();
                merge.private(a);
            }
            (Some(r), None) => {
                reference.next();
                merge.reference_only(r);
            }
        }
    }
    merge.output
}

/// Drives [`synchronize_allele`] over every genome, allele, and chromosome of a
/// [`MultiGenome`].
#[derive(Debug, Default)]
pub struct PositionSynchronizer;

impl PositionSynchronizer {
    pub fn new() -> Self {
        Self
    }

    /// Recompute every synchronized list from the ingested lists.
    ///
    /// The ingested lists must be sorted (see [`MultiGenome::sort_offsets`]).
    /// Running this again on unchanged ingested lists gives identical output.
    pub fn synchronize(&self, multi: &mut MultiGenome) {
        let MultiGenome {
            reference, genomes, ..
        } = multi;

        for genome in genomes.iter_mut() {
            for allele_type in AlleleType::BOTH {
                let allele = genome.allele_mut(allele_type);
                for chromosome in 0..allele.ingested.len() {
                    let offsets = synchronize_allele(
                        reference.ingested.get(chromosome),
                        allele.ingested.get(chromosome),
                    );
                    allele.synchronized.replace(chromosome, offsets);
                }
            }
            debug!("synchronized genome {}", genome.name);
        }

        for chromosome in 0..reference.ingested.len() {
            let offsets = synchronize_allele(reference.ingested.get(chromosome), &[]);
            reference.synchronized.replace(chromosome, offsets);
        }
        info!("synchronized {} genomes", genomes.len());
    }

    /// Recompute the synchronized lists of a single chromosome.
    pub fn synchronize_chromosome(&self, multi: &mut MultiGenome, chromosome: usize) {
        let MultiGenome {
            reference, genomes, ..
        } = multi;
        let reference_offsets = reference.ingested.get(chromosome);
        for genome in genomes.iter_mut() {
            for allele_type in AlleleType::BOTH {
                let allele = genome.allele_mut(allele_type);
                let offsets =
                    synchronize_allele(reference_offsets, allele.ingested.get(chromosome));
                allele.synchronized.replace(chromosome, offsets);
            }
        }
        let offsets = synchronize_allele(reference_offsets, &[]);
        reference.synchronized.replace(chromosome, offsets);
    }
}
