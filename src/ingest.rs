//! The variant ingestion pass.
//!
//! For every chromosome and every source, rows are queried, each genotype call is
//! classified per allele, and offsets are appended to the genome allele lists and,
//! for insertions, to the reference list. A source's contribution to a chromosome
//! is buffered and only committed once all of its rows went through, so a failing
//! source leaves no partial state behind.

use log::{debug, info, warn};

use crate::context::{SyncContext, VariantRow, VariantSource, FIXED_COLUMNS};
use crate::error::IngestError;
use crate::genome::MultiGenome;
use crate::offset::{Offset, Position};
use crate::variant::{
    classify, AlleleType, ClassifyError, Genotype, Variant, VariantKind, VariantType,
};

/// What an ingestion pass did.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub rows: usize,
    pub offsets: usize,
    /// Genotype calls skipped because they were malformed.
    pub skipped: usize,
    /// Source and chromosome contributions that were dropped.
    pub failures: Vec<IngestError>,
}

impl IngestReport {
    fn absorb(&mut self, other: IngestReport) {
        self.rows += other.rows;
        self.offsets += other.offsets;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }
}

/// Buffered output of one source on one chromosome.
#[derive(Debug, Default)]
struct Contribution {
    allele_offsets: Vec<(usize, AlleleType, Offset)>,
    reference_offsets: Vec<Offset>,
    variants: Vec<(usize, AlleleType, Variant)>,
    variant_types: Vec<(String, VariantType)>,
    rows: usize,
    skipped: usize,
}

/// A genome a source serves, with its sample column name.
struct Served {
    genome: usize,
    name: String,
    raw_name: String,
}

pub struct VariantIngestor<'a> {
    context: &'a mut SyncContext,
}

impl<'a> VariantIngestor<'a> {
    pub fn new(context: &'a mut SyncContext) -> Self {
        Self { context }
    }

    /// Ingest every chromosome from every source, then sort the ingested lists.
    ///
    /// Previously ingested state is discarded first.
    pub fn ingest(&mut self, multi: &mut MultiGenome) -> IngestReport {
        multi.clear();
        let mut report = IngestReport::default();
        for chromosome in 0..self.context.chromosomes.len() {
            report.absorb(self.ingest_chromosome(multi, chromosome));
        }
        multi.sort_offsets();
        info!(
            "ingested {} rows into {} offsets ({} calls skipped, {} failed contributions)",
            report.rows,
            report.offsets,
            report.skipped,
            report.failures.len()
        );
        report
    }

    /// Ingest one chromosome from every source. The ingested lists are left unsorted.
    pub fn ingest_chromosome(&mut self, multi: &mut MultiGenome, chromosome: usize) -> IngestReport {
        let mut report = IngestReport::default();
        let Some((name, &length)) = self.context.chromosomes.get_index(chromosome) else {
            return report;
        };
        let name = name.clone();

        for index in 0..self.context.sources.len() {
            let Some(source) = self.context.sources.get(index) else {
                continue;
            };
            let served = served_genomes(source, multi);
            if served.is_empty() {
                continue;
            }
            match contribute(source, &served, &name, chromosome, length) {
                Ok(contribution) => {
                    report.rows += contribution.rows;
                    report.skipped += contribution.skipped;
                    report.offsets += contribution.allele_offsets.len();
                    for (genome, variant_type) in contribution.variant_types.iter() {
                        self.context
                            .sources
                            .add_variant_type(index, genome, *variant_type);
                    }
                    commit(multi, chromosome, contribution);
                }
                Err(e) => {
                    warn!("dropping contribution of source {}: {}", index, e);
                    report.failures.push(e);
                }
            }
        }
        report
    }
}

fn served_genomes(source: &dyn VariantSource, multi: &MultiGenome) -> Vec<Served> {
    multi
        .genomes
        .iter()
        .enumerate()
        .filter_map(|(genome, g)| {
            source.raw_name(&g.name).map(|raw_name| Served {
                genome,
                name: g.name.clone(),
                raw_name,
            })
        })
        .collect()
}

fn contribute(
    source: &dyn VariantSource,
    served: &[Served],
    chromosome_name: &str,
    chromosome: usize,
    length: Position,
) -> Result<Contribution, IngestError> {
    let mut columns: Vec<&str> = FIXED_COLUMNS.to_vec();
    columns.extend(served.iter().map(|s| s.raw_name.as_str()));

    let rows = source
        .query(chromosome_name, 1, length + 1, &columns)
        .map_err(|e| IngestError::Query {
            source_name: source.name().to_string(),
            chromosome: chromosome_name.to_string(),
            error: Box::new(e),
        })?;

    let mut contribution = Contribution::default();
    for row in rows.iter() {
        contribution.rows += 1;
        for genome in served {
            add_calls(&mut contribution, row, genome, chromosome_name)?;
        }
    }
    debug!(
        "source {} on {}: {} rows, {} offsets",
        source.name(),
        chromosome_name,
        contribution.rows,
        contribution.allele_offsets.len()
    );
    Ok(contribution)
}

fn add_calls(
    contribution: &mut Contribution,
    row: &VariantRow,
    genome: &Served,
    chromosome_name: &str,
) -> Result<(), IngestError> {
    let Some(field) = row.genotype(&genome.raw_name) else {
        return Ok(());
    };
    let Some(genotype) = Genotype::parse(field) else {
        let e = IngestError::MalformedGenotype {
            genome: genome.name.clone(),
            chromosome: chromosome_name.to_string(),
            position: row.position,
            genotype: field.to_string(),
        };
        warn!("skipping call: {}", e);
        contribution.skipped += 1;
        return Ok(());
    };

    for allele in AlleleType::BOTH {
        let kind = match classify(&row.reference, &row.alt, &row.info, genotype.call(allele)) {
            Ok(kind) => kind,
            Err(ClassifyError::SvLen) => {
                return Err(IngestError::SvLen {
                    genome: genome.name.clone(),
                    chromosome: chromosome_name.to_string(),
                    position: row.position,
                    info: row.info.clone(),
                })
            }
            Err(ClassifyError::AltIndex(index)) => {
                let e = IngestError::AltIndex {
                    genome: genome.name.clone(),
                    chromosome: chromosome_name.to_string(),
                    position: row.position,
                    alt: row.alt.clone(),
                    index,
                };
                warn!("skipping call: {}", e);
                contribution.skipped += 1;
                continue;
            }
        };

        let (variant_type, length) = match kind {
            VariantKind::NoCall | VariantKind::Reference => continue,
            VariantKind::Snp => {
                contribution
                    .variant_types
                    .push((genome.name.clone(), VariantType::Snp));
                continue;
            }
            VariantKind::Insertion(length) => {
                contribution
                    .reference_offsets
                    .push(Offset::new(row.position, length));
                (VariantType::Insertion, length)
            }
            VariantKind::Deletion(length) => (VariantType::Deletion, length),
        };

        contribution.allele_offsets.push((
            genome.genome,
            allele,
            Offset::new(row.position, length),
        ));
        contribution.variants.push((
            genome.genome,
            allele,
            Variant {
                variant_type,
                start: row.position,
                length,
                score: row.qual,
            },
        ));
        contribution
            .variant_types
            .push((genome.name.clone(), variant_type));
    }
    Ok(())
}

fn commit(multi: &mut MultiGenome, chromosome: usize, contribution: Contribution) {
    for offset in contribution.reference_offsets {
        multi.reference.ingested.push(chromosome, offset);
    }
    for (genome, allele, offset) in contribution.allele_offsets {
        multi.genomes[genome]
            .allele_mut(allele)
            .ingested
            .push(chromosome, offset);
    }
    for (genome, allele, variant) in contribution.variants {
        multi.genomes[genome].allele_mut(allele).variants[chromosome].push(variant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::table::VcfTable;
    use indexmap::indexmap;

    /// A source whose queries fail on one chromosome.
    struct Unreadable {
        table: VcfTable,
        broken: &'static str,
    }

    impl VariantSource for Unreadable {
        fn name(&self) -> &str {
            self.table.name()
        }

        fn genome_names(&self) -> Vec<String> {
            self.table.genome_names()
        }

        fn raw_name(&self, genome: &str) -> Option<String> {
            self.table.raw_name(genome)
        }

        fn query(
            &self,
            chromosome: &str,
            start: Position,
            stop: Position,
            columns: &[&str],
        ) -> Result<Vec<VariantRow>, SyncError> {
            if chromosome == self.broken {
                return Err(SyncError::ParseError("truncated block".to_string()));
            }
            self.table.query(chromosome, start, stop, columns)
        }
    }

    fn row(position: Position, reference: &str, alt: &str, info: &str, gts: &[(&str, &str)]) -> VariantRow {
        VariantRow {
            position,
            reference: reference.to_string(),
            alt: alt.to_string(),
            qual: Some(50.0),
            info: info.to_string(),
            genotypes: gts
                .iter()
                .map(|(name, gt)| (name.to_string(), gt.to_string()))
                .collect(),
        }
    }

    fn context(tables: Vec<VcfTable>) -> SyncContext {
        let mut context = SyncContext::new(indexmap! {
            "chr1".to_string() => 10_000,
            "chr2".to_string() => 5_000,
        });
        for table in tables {
            context.add_source(Box::new(table));
        }
        context
    }

    #[test]
    fn test_ingest_offsets_and_reference() {
        let mut table = VcfTable::new("calls.vcf", &["G1", "G2"]);
        table.push("chr1", row(100, "A", "AGGGG", ".", &[("G1", "1|0"), ("G2", "0|0")]));
        table.push("chr1", row(100, "A", "AGG", ".", &[("G1", "0|0"), ("G2", "1/1")]));
        table.push("chr1", row(300, "ACGT", "A", ".", &[("G1", "0|1"), ("G2", "0|0")]));
        table.push("chr1", row(400, "C", "T", ".", &[("G1", "1|1"), ("G2", ".|.")]));

        let mut context = context(vec![table]);
        let mut multi = MultiGenome::new(&context);
        let report = VariantIngestor::new(&mut context).ingest(&mut multi);

        assert_eq!(report.rows, 4);
        assert_eq!(report.offsets, 4);
        assert!(report.failures.is_empty());

        // widest insertion wins at 100
        assert_eq!(multi.reference.ingested.get(0), &[Offset::new(100, 4)]);

        let g1 = multi.genome("G1").unwrap();
        assert_eq!(g1.paternal.ingested.get(0), &[Offset::new(100, 4)]);
        assert_eq!(g1.maternal.ingested.get(0), &[Offset::new(300, -3)]);
        assert_eq!(g1.maternal.variants[0][0].variant_type, VariantType::Deletion);
        assert_eq!(g1.maternal.variants[0][0].score, Some(50.0));

        let g2 = multi.genome("G2").unwrap();
        assert_eq!(g2.paternal.ingested.get(0), &[Offset::new(100, 2)]);
        assert_eq!(g2.maternal.ingested.get(0), &[Offset::new(100, 2)]);

        let types = context.sources.variant_types(0, "G1").unwrap();
        assert!(types.contains(&VariantType::Snp));
        assert!(types.contains(&VariantType::Deletion));
    }

    #[test]
    fn test_malformed_genotype_is_skipped() {
        let mut table = VcfTable::new("calls.vcf", &["G1"]);
        table.push("chr1", row(100, "A", "AT", ".", &[("G1", "1")]));
        table.push("chr1", row(200, "A", "AT", ".", &[("G1", "1|1")]));

        let mut context = context(vec![table]);
        let mut multi = MultiGenome::new(&context);
        let report = VariantIngestor::new(&mut context).ingest(&mut multi);

        assert_eq!(report.skipped, 1);
        assert!(report.failures.is_empty());
        let g1 = multi.genome("G1").unwrap();
        assert_eq!(g1.paternal.ingested.get(0), &[Offset::new(200, 1)]);
    }

    #[test]
    fn test_out_of_range_alt_is_skipped() {
        let mut table = VcfTable::new("calls.vcf", &["G1"]);
        table.push("chr1", row(100, "A", "AGG", ".", &[("G1", "1|0")]));
        table.push("chr1", row(200, "A", "AT", ".", &[("G1", "2|0")]));

        let mut context = context(vec![table]);
        let mut multi = MultiGenome::new(&context);
        let report = VariantIngestor::new(&mut context).ingest(&mut multi);

        assert!(report.failures.is_empty());
        assert_eq!(report.skipped, 1);
        let g1 = multi.genome("G1").unwrap();
        assert_eq!(g1.paternal.ingested.get(0), &[Offset::new(100, 2)]);
        assert_eq!(multi.reference.ingested.get(0), &[Offset::new(100, 2)]);
    }

    #[test]
    fn test_failing_query_drops_only_that_contribution() {
        let mut broken = VcfTable::new("broken.vcf", &["G1"]);
        broken.push("chr1", row(100, "A", "AGG", ".", &[("G1", "1|1")]));
        broken.push("chr2", row(40, "ACG", "A", ".", &[("G1", "1|0")]));
        let mut good = VcfTable::new("good.vcf", &["G2"]);
        good.push("chr1", row(700, "G", "GA", ".", &[("G2", "1|1")]));

        let mut context = SyncContext::new(indexmap! {
            "chr1".to_string() => 10_000,
            "chr2".to_string() => 5_000,
        });
        context.add_source(Box::new(Unreadable {
            table: broken,
            broken: "chr1",
        }));
        context.add_source(Box::new(good));

        let mut multi = MultiGenome::new(&context);
        let report = VariantIngestor::new(&mut context).ingest(&mut multi);

        assert_eq!(report.failures.len(), 1);
        match &report.failures[0] {
            IngestError::Query {
                source_name,
                chromosome,
                error,
            } => {
                assert_eq!(source_name, "broken.vcf");
                assert_eq!(chromosome, "chr1");
                assert!(matches!(**error, SyncError::ParseError(_)));
            }
            other => panic!("unexpected failure: {}", other),
        }

        assert_eq!(multi.reference.ingested.get(0), &[Offset::new(700, 1)]);
        let g1 = multi.genome("G1").unwrap();
        assert!(g1.paternal.ingested.get(0).is_empty());
        assert_eq!(g1.paternal.ingested.get(1), &[Offset::new(40, -2)]);
        let g2 = multi.genome("G2").unwrap();
        assert_eq!(g2.maternal.ingested.get(0), &[Offset::new(700, 1)]);
    }

    #[test]
    fn test_svlen_error_drops_only_that_contribution() {
        let mut bad = VcfTable::new("bad.vcf", &["G1"]);
        bad.push("chr1", row(100, "N", "<INS>", "SVTYPE=INS;SVLEN=20", &[("G1", "1|0")]));
        bad.push("chr1", row(500, "N", "<INS>", "SVTYPE=INS", &[("G1", "1|0")]));
        bad.push("chr2", row(50, "N", "<DEL>", "SVLEN=-10", &[("G1", "0|1")]));
        let mut good = VcfTable::new("good.vcf", &["G2"]);
        good.push("chr1", row(700, "G", "GA", ".", &[("G2", "1|1")]));

        let mut context = context(vec![bad, good]);
        let mut multi = MultiGenome::new(&context);
        let report = VariantIngestor::new(&mut context).ingest(&mut multi);

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            IngestError::SvLen { position: 500, .. }
        ));

        // nothing from bad.vcf on chr1 survives, chr2 and good.vcf do
        assert_eq!(multi.reference.ingested.get(0), &[Offset::new(700, 1)]);
        let g1 = multi.genome("G1").unwrap();
        assert!(g1.paternal.ingested.get(0).is_empty());
        assert_eq!(g1.maternal.ingested.get(1), &[Offset::new(50, -10)]);
    }

    #[test]
    fn test_reingest_is_stable() {
        let mut table = VcfTable::new("calls.vcf", &["G1"]);
        table.push("chr1", row(100, "A", "AGG", ".", &[("G1", "1|0")]));
        let mut context = context(vec![table]);
        let mut multi = MultiGenome::new(&context);

        VariantIngestor::new(&mut context).ingest(&mut multi);
        let first = multi.clone();
        VariantIngestor::new(&mut context).ingest(&mut multi);
        assert_eq!(first, multi);
    }
}
