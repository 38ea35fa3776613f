//! Synchronizing the coordinates of many genomes into one meta-genome.
//!
//! Each genome's variants are reported in VCF files against a common reference.
//! Insertions and deletions make every genome allele's own coordinates drift away
//! from the reference and from each other. This crate computes, per chromosome and
//! per allele, offset tables mapping each allele's positions into a single shared
//! *meta-genome* coordinate space that holds the reference plus room for the widest
//! insertion any genome made at each position.
//!
//! The work happens in two passes over a [`MultiGenome`]:
//!
//!  1. [`VariantIngestor`] queries each [`VariantSource`] of a [`SyncContext`] and
//!     records the raw insertion and deletion offsets of every genome allele, plus
//!     the reference list of widest insertions.
//!  2. [`PositionSynchronizer`] merges every allele list against the reference list.
//!
//! ```no_run
//! use metagenome::prelude::*;
//! let seqlens = read_seqlens("hg38_seqlens.tsv")
//!                   .expect("could not read seqlens");
//! let mut context = SyncContext::new(seqlens);
//! context.add_source(Box::new(VcfTable::from_path("trio.vcf.gz")
//!                   .expect("cannot read VCF")));
//!
//! let mut multi = MultiGenome::new(&context);
//! let report = VariantIngestor::new(&mut context).ingest(&mut multi);
//! assert!(report.failures.is_empty());
//! PositionSynchronizer::new().synchronize(&mut multi);
//!
//! let chr1 = context.chromosome_index("chr1").unwrap();
//! let meta = multi
//!     .genome_to_meta("NA12878", AlleleType::Paternal, chr1, 11975064)
//!     .unwrap();
//! ```
//!
//! SNPs do not shift coordinates; the [`SnpSynchronizer`] keeps them loaded for the
//! displayed chromosome and genome alleles only.

pub mod codec;
pub mod context;
pub mod error;
pub mod file;
pub mod genome;
pub mod ingest;
pub mod offset;
pub mod snp;
pub mod sync;
pub mod table;
pub mod variant;

pub use context::{read_seqlens, SyncContext, VariantRow, VariantSource};
pub use error::{IngestError, SyncError};
pub use genome::{Genome, MultiGenome, ReferenceGenome};
pub use ingest::{IngestReport, VariantIngestor};
pub use offset::{AlleleOffsetList, Length, Offset, Position};
pub use snp::{SnpSelection, SnpSynchronizer};
pub use sync::PositionSynchronizer;
pub use table::VcfTable;
pub use variant::{AlleleType, VariantKind, VariantType};

pub mod prelude {
    pub use crate::context::{read_seqlens, SyncContext, VariantRow, VariantSource};
    pub use crate::error::{IngestError, SyncError};
    pub use crate::genome::MultiGenome;
    pub use crate::ingest::VariantIngestor;
    pub use crate::offset::{Offset, Position};
    pub use crate::snp::{SnpSelection, SnpSynchronizer};
    pub use crate::sync::PositionSynchronizer;
    pub use crate::table::VcfTable;
    pub use crate::variant::AlleleType;
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use indexmap::indexmap;

    fn row(position: Position, reference: &str, alt: &str, g1: &str, g2: &str) -> VariantRow {
        VariantRow {
            position,
            reference: reference.to_string(),
            alt: alt.to_string(),
            qual: Some(40.0),
            info: ".".to_string(),
            genotypes: indexmap! {
                "G1".to_string() => g1.to_string(),
                "G2".to_string() => g2.to_string(),
            },
        }
    }

    fn run(table: VcfTable) -> (SyncContext, MultiGenome) {
        let mut context = SyncContext::new(indexmap! { "chr1".to_string() => 1000 });
        context.add_source(Box::new(table));
        let mut multi = MultiGenome::new(&context);
        VariantIngestor::new(&mut context).ingest(&mut multi);
        PositionSynchronizer::new().synchronize(&mut multi);
        (context, multi)
    }

    #[test]
    fn test_two_genomes_one_insertion() {
        let mut table = VcfTable::new("calls.vcf", &["G1", "G2"]);
        table.push("chr1", row(100, "A", "ACGTA", "1|1", "0|0"));
        let (_, multi) = run(table);

        assert_eq!(multi.reference.synchronized.get(0), &[Offset::new(100, 4)]);
        let g1 = multi.genome("G1").unwrap();
        assert!(g1.paternal.synchronized.get(0).is_empty());
        let g2 = multi.genome("G2").unwrap();
        assert_eq!(g2.paternal.synchronized.get(0), &[Offset::new(100, 4)]);
        assert_eq!(g2.maternal.synchronized.get(0), &[Offset::new(100, 4)]);

        // G1's base after the insertion and G2's base 101 are the same locus
        let g1_meta = multi.genome_to_meta("G1", AlleleType::Paternal, 0, 105).unwrap();
        let g2_meta = multi.genome_to_meta("G2", AlleleType::Paternal, 0, 101).unwrap();
        assert_eq!(g1_meta, g2_meta);
        assert_eq!(multi.reference_to_meta(0, 101), g1_meta);
    }

    #[test]
    fn test_insertion_widening_and_deletion_shift() {
        let mut table = VcfTable::new("calls.vcf", &["G1", "G2"]);
        table.push("chr1", row(100, "A", "AGGGGG", "1|0", "0|0"));
        table.push("chr1", row(100, "A", "AGGG", "0|0", "1|0"));
        table.push("chr1", row(500, "CTTTT", "C", "0|0", "0|1"));
        let (_, multi) = run(table);

        assert_eq!(multi.reference.synchronized.get(0), &[Offset::new(100, 5)]);
        let g2 = multi.genome("G2").unwrap();
        assert_eq!(g2.paternal.synchronized.get(0), &[Offset::new(103, 2)]);
        assert_eq!(
            g2.maternal.synchronized.get(0),
            &[Offset::new(100, 5), Offset::new(500, 4)]
        );
        // past the deletion the maternal allele runs 4 + 5 bases behind the meta-genome
        assert_eq!(
            multi.genome_to_meta("G2", AlleleType::Maternal, 0, 501).unwrap(),
            510
        );
    }

    #[test]
    fn test_synchronization_is_idempotent() {
        let mut table = VcfTable::new("calls.vcf", &["G1", "G2"]);
        table.push("chr1", row(10, "A", "AT", "1|0", "1|1"));
        table.push("chr1", row(20, "AGG", "A", "0|1", "1|0"));
        table.push("chr1", row(30, "T", "TCC,TC", "1|2", "2|0"));
        let (_, mut multi) = run(table);

        let first = multi.clone();
        PositionSynchronizer::new().synchronize(&mut multi);
        assert_eq!(first, multi);
        for genome in multi.genomes.iter() {
            for allele in AlleleType::BOTH {
                assert!(genome.allele(allele).synchronized.is_sorted(0));
            }
        }
    }
}
