//! Genomes, the reference genome, and the multi-genome aggregate.

use serde::{Deserialize, Serialize};

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::offset::{from_meta, to_meta, AlleleOffsetList, Offset, Position};
use crate::variant::{AlleleType, SnpVariant, Variant};

/// One allele of one genome.
///
/// `ingested` holds the raw offsets in reference coordinates and is never touched
/// by synchronization, which writes `synchronized` wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenomeAllele {
    pub ingested: AlleleOffsetList,
    pub synchronized: AlleleOffsetList,
    /// Insertions and deletions per chromosome, for display.
    pub variants: Vec<Vec<Variant>>,
    /// SNPs per chromosome, for display; only filled for displayed chromosomes.
    pub snps: Vec<Vec<SnpVariant>>,
}

impl GenomeAllele {
    pub fn new(n_chromosomes: usize) -> Self {
        Self {
            ingested: AlleleOffsetList::new(n_chromosomes),
            synchronized: AlleleOffsetList::new(n_chromosomes),
            variants: vec![Vec::new(); n_chromosomes],
            snps: vec![Vec::new(); n_chromosomes],
        }
    }

    /// Forget everything ingested, keeping the chromosome slots.
    pub fn clear(&mut self) {
        self.ingested.clear();
        self.synchronized.clear();
        self.variants.iter_mut().for_each(Vec::clear);
        self.snps.iter_mut().for_each(Vec::clear);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub name: String,
    pub paternal: GenomeAllele,
    pub maternal: GenomeAllele,
}

impl Genome {
    pub fn new(name: &str, n_chromosomes: usize) -> Self {
        Self {
            name: name.to_string(),
            paternal: GenomeAllele::new(n_chromosomes),
            maternal: GenomeAllele::new(n_chromosomes),
        }
    }

    pub fn allele(&self, allele: AlleleType) -> &GenomeAllele {
        match allele {
            AlleleType::Paternal => &self.paternal,
            AlleleType::Maternal => &self.maternal,
        }
    }

    pub fn allele_mut(&mut self, allele: AlleleType) -> &mut GenomeAllele {
        match allele {
            AlleleType::Paternal => &mut self.paternal,
            AlleleType::Maternal => &mut self.maternal,
        }
    }
}

/// The union of every insertion contributed by any genome: one offset per
/// insertion position, holding the widest insertion seen there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGenome {
    pub ingested: AlleleOffsetList,
    pub synchronized: AlleleOffsetList,
}

impl ReferenceGenome {
    pub fn new(n_chromosomes: usize) -> Self {
        Self {
            ingested: AlleleOffsetList::new(n_chromosomes),
            synchronized: AlleleOffsetList::new(n_chromosomes),
        }
    }
}

/// The reference genome and every genome of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiGenome {
    pub reference: ReferenceGenome,
    pub genomes: Vec<Genome>,
    chromosomes: Vec<String>,
}

impl MultiGenome {
    /// Create an empty aggregate sized from the context's chromosome and genome lists.
    pub fn new(context: &SyncContext) -> Self {
        let n_chromosomes = context.chromosomes.len();
        Self {
            reference: ReferenceGenome::new(n_chromosomes),
            genomes: context
                .genome_names
                .iter()
                .map(|name| Genome::new(name, n_chromosomes))
                .collect(),
            chromosomes: context.chromosomes.keys().cloned().collect(),
        }
    }

    /// Return the number of chromosomes every list is sized for.
    pub fn n_chromosomes(&self) -> usize {
        self.chromosomes.len()
    }

    /// The chromosome names, in index order.
    pub fn chromosomes(&self) -> &[String] {
        &self.chromosomes
    }

    pub fn chromosome_index(&self, name: &str) -> Result<usize, SyncError> {
        self.chromosomes
            .iter()
            .position(|chrom| chrom == name)
            .ok_or(SyncError::NoChrom(name.to_string()))
    }

    pub fn genome_index(&self, name: &str) -> Result<usize, SyncError> {
        self.genomes
            .iter()
            .position(|genome| genome.name == name)
            .ok_or(SyncError::NoGenome(name.to_string()))
    }

    pub fn genome(&self, name: &str) -> Result<&Genome, SyncError> {
        let index = self.genome_index(name)?;
        Ok(&self.genomes[index])
    }

    pub fn genome_mut(&mut self, name: &str) -> Result<&mut Genome, SyncError> {
        let index = self.genome_index(name)?;
        Ok(&mut self.genomes[index])
    }

    /// Forget all ingested and synchronized state.
    pub fn clear(&mut self) {
        self.reference = ReferenceGenome::new(self.n_chromosomes());
        for genome in self.genomes.iter_mut() {
            genome.paternal.clear();
            genome.maternal.clear();
        }
    }

    /// Sort every ingested list, collapsing duplicate positions.
    pub fn sort_offsets(&mut self) {
        self.reference.ingested.sort_and_merge();
        for genome in self.genomes.iter_mut() {
            genome.paternal.ingested.sort_and_merge();
            genome.maternal.ingested.sort_and_merge();
        }
    }

    /// The synchronized offsets of a genome allele on a chromosome.
    pub fn offsets(
        &self,
        genome: &str,
        allele: AlleleType,
        chromosome: usize,
    ) -> Result<&[Offset], SyncError> {
        Ok(self
            .genome(genome)?
            .allele(allele)
            .synchronized
            .get(chromosome))
    }

    /// Translate a genome allele's own position into meta-genome coordinates.
    pub fn genome_to_meta(
        &self,
        genome: &str,
        allele: AlleleType,
        chromosome: usize,
        position: Position,
    ) -> Result<Position, SyncError> {
        Ok(to_meta(self.offsets(genome, allele, chromosome)?, position))
    }

    /// Translate a meta-genome position into a genome allele's own position.
    ///
    /// Returns `Ok(None)` when the meta position lies on bases the allele lacks.
    pub fn meta_to_genome(
        &self,
        genome: &str,
        allele: AlleleType,
        chromosome: usize,
        meta: Position,
    ) -> Result<Option<Position>, SyncError> {
        Ok(from_meta(self.offsets(genome, allele, chromosome)?, meta))
    }

    /// Translate a reference position into meta-genome coordinates.
    pub fn reference_to_meta(&self, chromosome: usize, position: Position) -> Position {
        to_meta(self.reference.synchronized.get(chromosome), position)
    }

    /// Translate a meta-genome position into a reference position, if it is not
    /// on inserted bases.
    pub fn meta_to_reference(&self, chromosome: usize, meta: Position) -> Option<Position> {
        from_meta(self.reference.synchronized.get(chromosome), meta)
    }
}
