//! Versioned persistence of a [`MultiGenome`].
//!
//! The encoding is a single format-version byte followed by a `bincode` payload.
//! Decoding fails on any version it does not know.

use std::io::{Read, Write};

use crate::error::SyncError;
use crate::file::{InputFile, OutputFile};
use crate::genome::MultiGenome;

/// The format version written by [`encode`].
pub const FORMAT_VERSION: u8 = 0;

/// Encode with the current format version.
pub fn encode(multi: &MultiGenome) -> Result<Vec<u8>, SyncError> {
    encode_v0(multi)
}

pub fn encode_v0(multi: &MultiGenome) -> Result<Vec<u8>, SyncError> {
    let mut bytes = vec![0u8];
    bincode::serialize_into(&mut bytes, multi)?;
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<MultiGenome, SyncError> {
    let (&version, payload) = bytes.split_first().ok_or(SyncError::MissingVersion)?;
    match version {
        0 => Ok(bincode::deserialize(payload)?),
        other => Err(SyncError::UnknownVersion(other)),
    }
}

/// Write an encoded [`MultiGenome`] to a file, gzip-compressed if the path ends in `.gz`.
pub fn save(multi: &MultiGenome, filepath: &str) -> Result<(), SyncError> {
    let mut writer = OutputFile::new(filepath, None).writer()?;
    writer.write_all(&encode(multi)?)?;
    writer.flush()?;
    Ok(())
}

/// Read a [`MultiGenome`] written by [`save`].
pub fn load(filepath: &str) -> Result<MultiGenome, SyncError> {
    let mut bytes = Vec::new();
    InputFile::new(filepath).reader()?.read_to_end(&mut bytes)?;
    decode(&bytes)
}
