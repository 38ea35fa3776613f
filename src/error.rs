use std::io;
use thiserror::Error;

use crate::file::FileError;
use crate::offset::Position;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
    #[error("File reading error: {0}")]
    FileError(#[from] FileError),
    #[error("VCF table parsing error: {0}")]
    TableParsingError(#[from] csv::Error),
    #[error("Missing field")]
    MissingField,
    #[error("Failed to parse a column of a VCF table: {0}")]
    ParseError(String),
    #[error("Chromosome key '{0}' does not exist")]
    NoChrom(String),
    #[error("Genome '{0}' does not exist")]
    NoGenome(String),
    #[error("Unknown allele '{0}' (expected 'paternal' or 'maternal')")]
    NoAllele(String),
    #[error("Unsupported format version {0}")]
    UnknownVersion(u8),
    #[error("Empty input, no format version tag")]
    MissingVersion,
    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),
    #[error(transparent)]
    IngestError(#[from] IngestError),
}

/// Failures of the variant ingestion pass.
///
/// Each carries enough context to locate the offending VCF row.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("malformed genotype '{genotype}' for {genome} at {chromosome}:{position}")]
    MalformedGenotype {
        genome: String,
        chromosome: String,
        position: Position,
        genotype: String,
    },
    #[error("missing or unparseable SVLEN in INFO '{info}' for {genome} at {chromosome}:{position}")]
    SvLen {
        genome: String,
        chromosome: String,
        position: Position,
        info: String,
    },
    #[error("alternate index {index} out of range for ALT '{alt}' for {genome} at {chromosome}:{position}")]
    AltIndex {
        genome: String,
        chromosome: String,
        position: Position,
        alt: String,
        index: usize,
    },
    #[error("query of source '{source_name}' failed on {chromosome}: {error}")]
    Query {
        source_name: String,
        chromosome: String,
        error: Box<SyncError>,
    },
}
