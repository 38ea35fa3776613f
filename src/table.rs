//! An in-memory [`VariantSource`] over the body of a VCF file.
//!
//! Only the tabular layout is read: `##` meta lines are skipped, the `#CHROM`
//! header supplies the sample names, and each body line becomes a [`VariantRow`]
//! whose genotype columns hold the `GT` subfield of each sample.

use csv::ReaderBuilder;
use indexmap::map::IndexMap;
use std::io::BufRead;

use crate::context::{VariantRow, VariantSource};
use crate::error::SyncError;
use crate::file::InputFile;
use crate::offset::Position;

/// Index of the first sample column of a VCF body line.
const FIRST_SAMPLE_COLUMN: usize = 9;

#[derive(Debug, Clone, Default)]
pub struct VcfTable {
    name: String,
    samples: Vec<String>,
    rows: IndexMap<String, Vec<VariantRow>>,
}

impl VcfTable {
    /// Create an empty table serving the given samples.
    pub fn new(name: &str, samples: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            samples: samples.iter().map(|s| s.to_string()).collect(),
            rows: IndexMap::new(),
        }
    }

    /// Add a row. Rows of a chromosome are kept sorted by position.
    pub fn push(&mut self, chromosome: &str, row: VariantRow) {
        let rows = self.rows.entry(chromosome.to_string()).or_default();
        let index = rows.partition_point(|r| r.position <= row.position);
        rows.insert(index, row);
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Return the number of rows over all chromosomes.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    /// Return if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a VCF file, which may be gzip-compressed.
    pub fn from_path(filepath: &str) -> Result<Self, SyncError> {
        let input_file = InputFile::new(filepath);
        let mut buf_reader = input_file.reader()?;

        // consume meta lines up to and including the #CHROM header
        let mut samples = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if buf_reader.read_line(&mut line)? == 0 {
                return Err(SyncError::ParseError(format!(
                    "no #CHROM header in {}",
                    filepath
                )));
            }
            if line.starts_with("##") {
                continue;
            }
            if line.starts_with("#CHROM") {
                samples = line
                    .trim_end()
                    .split('\t')
                    .skip(FIRST_SAMPLE_COLUMN)
                    .map(str::to_string)
                    .collect();
                break;
            }
        }

        let mut table = VcfTable {
            name: filepath.to_string(),
            samples,
            rows: IndexMap::new(),
        };

        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(buf_reader);

        for result in rdr.records() {
            let record = result?;
            let chrom = record.get(0).ok_or(SyncError::MissingField)?.to_string();
            let pos_str = record.get(1).ok_or(SyncError::MissingField)?;
            let position: Position = pos_str.parse().map_err(|_| {
                SyncError::ParseError(format!("Failed to parse POS from string: {}", pos_str))
            })?;
            let qual = match record.get(5).ok_or(SyncError::MissingField)? {
                "." => None,
                qual_str => Some(qual_str.parse().map_err(|_| {
                    SyncError::ParseError(format!("Failed to parse QUAL from string: {}", qual_str))
                })?),
            };

            let gt_index = record
                .get(8)
                .and_then(|format| format.split(':').position(|key| key == "GT"));
            let genotypes = table
                .samples
                .iter()
                .zip(record.iter().skip(FIRST_SAMPLE_COLUMN))
                .filter_map(|(sample, field)| {
                    let gt = field.split(':').nth(gt_index?)?;
                    Some((sample.clone(), gt.to_string()))
                })
                .collect();

            let row = VariantRow {
                position,
                reference: record.get(3).ok_or(SyncError::MissingField)?.to_string(),
                alt: record.get(4).ok_or(SyncError::MissingField)?.to_string(),
                qual,
                info: record.get(7).ok_or(SyncError::MissingField)?.to_string(),
                genotypes,
            };
            table.push(&chrom, row);
        }
        Ok(table)
    }
}

impl VariantSource for VcfTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn genome_names(&self) -> Vec<String> {
        self.samples.clone()
    }

    fn raw_name(&self, genome: &str) -> Option<String> {
        self.samples.iter().find(|s| *s == genome).cloned()
    }

    fn query(
        &self,
        chromosome: &str,
        start: Position,
        stop: Position,
        columns: &[&str],
    ) -> Result<Vec<VariantRow>, SyncError> {
        let Some(rows) = self.rows.get(chromosome) else {
            return Ok(Vec::new());
        };
        let first = rows.partition_point(|row| row.position < start);
        let rows = rows[first..]
            .iter()
            .take_while(|row| row.position < stop)
            .map(|row| {
                let mut row = row.clone();
                row.genotypes
                    .retain(|sample, _| columns.contains(&sample.as_str()));
                row
            })
            .collect();
        Ok(rows)
    }
}
