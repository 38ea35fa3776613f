//! The explicit synchronization context: chromosomes, genomes, and variant sources.

use indexmap::map::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::SyncError;
use crate::offset::Position;
use crate::variant::VariantType;

/// The columns a variant row always carries, besides genotype columns.
pub const FIXED_COLUMNS: [&str; 5] = ["POS", "REF", "ALT", "QUAL", "INFO"];

/// One row returned by a [`VariantSource`] query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariantRow {
    pub position: Position,
    pub reference: String,
    /// Comma-separated alternates.
    pub alt: String,
    pub qual: Option<f32>,
    pub info: String,
    /// Genotype strings (`a/b` or `a|b`) keyed by raw sample name.
    pub genotypes: IndexMap<String, String>,
}

impl VariantRow {
    pub fn genotype(&self, raw_name: &str) -> Option<&str> {
        self.genotypes.get(raw_name).map(String::as_str)
    }
}

/// A queryable source of variant rows, e.g. one VCF file.
pub trait VariantSource {
    /// A name used in diagnostics.
    fn name(&self) -> &str;

    /// The full names of the genomes this source can serve.
    fn genome_names(&self) -> Vec<String>;

    /// The raw sample column name of a genome, if this source serves it.
    fn raw_name(&self, genome: &str) -> Option<String>;

    /// Return the rows on `chromosome` with `start <= POS < stop`.
    ///
    /// `columns` names the fixed columns plus the raw sample columns wanted; sources
    /// may return more genotype columns than asked for.
    fn query(
        &self,
        chromosome: &str,
        start: Position,
        stop: Position,
        columns: &[&str],
    ) -> Result<Vec<VariantRow>, SyncError>;
}

/// The set of variant sources of a project, plus the variant types each has
/// been seen to provide per genome.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Box<dyn VariantSource>>,
    variant_types: Vec<IndexMap<String, BTreeSet<VariantType>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source: Box<dyn VariantSource>) {
        self.sources.push(source);
        self.variant_types.push(IndexMap::new());
    }

    /// Return the number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Return if there are no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn VariantSource> {
        self.sources.get(index).map(|source| source.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn VariantSource> {
        self.sources.iter().map(|source| source.as_ref())
    }

    /// Sources that can serve `genome`.
    pub fn serving<'a>(&'a self, genome: &'a str) -> impl Iterator<Item = &'a dyn VariantSource> {
        self.iter()
            .filter(move |source| source.raw_name(genome).is_some())
    }

    /// Record that `genome` carries variants of `variant_type` in source `index`.
    pub fn add_variant_type(&mut self, index: usize, genome: &str, variant_type: VariantType) {
        if let Some(types) = self.variant_types.get_mut(index) {
            types
                .entry(genome.to_string())
                .or_default()
                .insert(variant_type);
        }
    }

    /// The variant types recorded for `genome` in source `index`.
    pub fn variant_types(&self, index: usize, genome: &str) -> Option<&BTreeSet<VariantType>> {
        self.variant_types.get(index)?.get(genome)
    }
}

/// Everything the ingestion and synchronization passes consult.
#[derive(Default)]
pub struct SyncContext {
    /// Chromosome names and lengths; the order defines chromosome indices.
    pub chromosomes: IndexMap<String, Position>,
    pub genome_names: Vec<String>,
    pub sources: SourceRegistry,
}

impl SyncContext {
    pub fn new(chromosomes: IndexMap<String, Position>) -> Self {
        Self {
            chromosomes,
            genome_names: Vec::new(),
            sources: SourceRegistry::new(),
        }
    }

    /// Register a source and every genome it serves that is not yet known.
    pub fn add_source(&mut self, source: Box<dyn VariantSource>) {
        for name in source.genome_names() {
            if !self.genome_names.contains(&name) {
                self.genome_names.push(name);
            }
        }
        self.sources.add(source);
    }

    /// The index of a chromosome.
    pub fn chromosome_index(&self, name: &str) -> Result<usize, SyncError> {
        self.chromosomes
            .get_index_of(name)
            .ok_or(SyncError::NoChrom(name.to_string()))
    }

    /// The name of the chromosome at `index`.
    pub fn chromosome_name(&self, index: usize) -> Option<&str> {
        self.chromosomes
            .get_index(index)
            .map(|(name, _)| name.as_str())
    }
}

/// Read a tab-delimited *genome file* of sequence (i.e. chromosome) names and their lengths.
pub fn read_seqlens(filepath: &str) -> Result<IndexMap<String, Position>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(filepath)?;

    let mut seqlens = IndexMap::new();

    #[derive(Debug, Serialize, Deserialize, Default)]
    struct SeqLenEntry {
        chrom: String,
        length: Position,
    }

    for result in rdr.deserialize() {
        let record: SeqLenEntry = result?;
        seqlens.insert(record.chrom, record.length);
    }

    Ok(seqlens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_seqlens_keeps_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seqlens.tsv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# name\tlength\nchr2\t500\nchr1\t1000").unwrap();
        drop(file);

        let seqlens = read_seqlens(path.to_str().unwrap()).unwrap();
        let context = SyncContext::new(seqlens);
        assert_eq!(context.chromosome_index("chr2").unwrap(), 0);
        assert_eq!(context.chromosome_index("chr1").unwrap(), 1);
        assert_eq!(context.chromosome_name(1), Some("chr1"));
        assert!(matches!(
            context.chromosome_index("chrX"),
            Err(SyncError::NoChrom(_))
        ));
    }

    #[test]
    fn test_registry_variant_types() {
        let mut registry = SourceRegistry::new();
        registry.variant_types.push(IndexMap::new());
        registry.add_variant_type(0, "NA12878", VariantType::Snp);
        registry.add_variant_type(0, "NA12878", VariantType::Insertion);
        registry.add_variant_type(0, "NA12878", VariantType::Snp);
        registry.add_variant_type(3, "NA12878", VariantType::Snp);

        let types = registry.variant_types(0, "NA12878").unwrap();
        assert_eq!(types.len(), 2);
        assert!(registry.variant_types(0, "HG002").is_none());
    }
}
