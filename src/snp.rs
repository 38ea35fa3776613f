//! Incremental SNP bookkeeping for the displayed chromosome.
//!
//! SNPs never shift coordinates, so they stay out of the offset merge. Instead,
//! the [`SnpSynchronizer`] keeps the SNP lists of the genome alleles selected for
//! display filled for one chromosome at a time, querying sources only for the
//! `(genome, allele)` pairs that were not displayed before.

use indexmap::map::IndexMap;
use log::debug;

use crate::context::{SyncContext, FIXED_COLUMNS};
use crate::error::SyncError;
use crate::genome::MultiGenome;
use crate::variant::{is_symbolic, resolve_alt, AlleleCall, AlleleType, Genotype, SnpVariant};

/// Genome names mapped to the alleles selected for display.
pub type SnpSelection = IndexMap<String, Vec<AlleleType>>;

/// The `(genome, allele)` pairs touched by an update.
#[derive(Debug, Default, PartialEq)]
pub struct SnpUpdate {
    pub added: Vec<(String, AlleleType)>,
    pub removed: Vec<(String, AlleleType)>,
}

#[derive(Debug, Default)]
pub struct SnpSynchronizer {
    displayed: SnpSelection,
    chromosome: Option<usize>,
}

impl SnpSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The chromosome SNPs are currently held for.
    pub fn chromosome(&self) -> Option<usize> {
        self.chromosome
    }

    /// The pairs whose SNPs are currently held.
    pub fn displayed(&self) -> &SnpSelection {
        &self.displayed
    }

    /// Bring the SNP lists in line with `requested` on `chromosome`.
    ///
    /// Changing chromosome drops every held list of the old one and fills the
    /// new one for all requested pairs; otherwise only the difference between the
    /// held and the requested pairs is removed or added.
    pub fn update(
        &mut self,
        context: &SyncContext,
        multi: &mut MultiGenome,
        chromosome: usize,
        requested: &SnpSelection,
    ) -> Result<SnpUpdate, SyncError> {
        let mut update = SnpUpdate::default();

        if self.chromosome != Some(chromosome) {
            if let Some(old) = self.chromosome {
                for (genome, alleles) in std::mem::take(&mut self.displayed) {
                    for allele in alleles {
                        delete(multi, &genome, allele, old)?;
                        update.removed.push((genome.clone(), allele));
                    }
                }
            }
            self.chromosome = Some(chromosome);
        } else {
            let mut kept = SnpSelection::new();
            for (genome, alleles) in std::mem::take(&mut self.displayed) {
                for allele in alleles {
                    if is_selected(requested, &genome, allele) {
                        kept.entry(genome.clone()).or_default().push(allele);
                    } else {
                        delete(multi, &genome, allele, chromosome)?;
                        update.removed.push((genome.clone(), allele));
                    }
                }
            }
            self.displayed = kept;
        }

        for (genome, alleles) in requested {
            for &allele in alleles {
                if is_selected(&self.displayed, genome, allele) {
                    continue;
                }
                add(context, multi, genome, allele, chromosome)?;
                self.displayed.entry(genome.clone()).or_default().push(allele);
                update.added.push((genome.clone(), allele));
            }
        }

        debug!(
            "SNP update on chromosome {}: {} added, {} removed",
            chromosome,
            update.added.len(),
            update.removed.len()
        );
        Ok(update)
    }
}

fn is_selected(selection: &SnpSelection, genome: &str, allele: AlleleType) -> bool {
    selection
        .get(genome)
        .map_or(false, |alleles| alleles.contains(&allele))
}

fn delete(
    multi: &mut MultiGenome,
    genome: &str,
    allele: AlleleType,
    chromosome: usize,
) -> Result<(), SyncError> {
    let snps = &mut multi.genome_mut(genome)?.allele_mut(allele).snps;
    if let Some(list) = snps.get_mut(chromosome) {
        list.clear();
    }
    Ok(())
}

fn add(
    context: &SyncContext,
    multi: &mut MultiGenome,
    genome: &str,
    allele: AlleleType,
    chromosome: usize,
) -> Result<(), SyncError> {
    let (name, &length) = context
        .chromosomes
        .get_index(chromosome)
        .ok_or(SyncError::NoChrom(chromosome.to_string()))?;

    let mut snps = Vec::new();
    for source in context.sources.serving(genome) {
        let Some(raw_name) = source.raw_name(genome) else {
            continue;
        };
        let mut columns: Vec<&str> = FIXED_COLUMNS.to_vec();
        columns.push(&raw_name);

        for row in source.query(name, 1, length + 1, &columns)? {
            let Some(genotype) = row.genotype(&raw_name).and_then(Genotype::parse) else {
                continue;
            };
            let AlleleCall::Alternative(index) = genotype.call(allele) else {
                continue;
            };
            let Some(alt) = resolve_alt(&row.alt, index) else {
                continue;
            };
            if is_symbolic(alt) {
                continue;
            }
            let (mut reference, mut alternative) = (row.reference.chars(), alt.chars());
            if let (Some(r), None, Some(a), None) = (
                reference.next(),
                reference.next(),
                alternative.next(),
                alternative.next(),
            ) {
                snps.push(SnpVariant {
                    position: row.position,
                    reference: r,
                    alternative: a,
                    score: row.qual,
                });
            }
        }
    }
    snps.sort_by_key(|snp| snp.position);

    let lists = &mut multi.genome_mut(genome)?.allele_mut(allele).snps;
    if let Some(list) = lists.get_mut(chromosome) {
        *list = snps;
    }
    Ok(())
}
