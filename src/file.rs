//! Plaintext and gzip-compressed file input and output.
//!
//! VCF tables and saved multi-genome state may be gzip-compressed on disk;
//! [`InputFile`] sniffs the gzip magic bytes on read, while [`OutputFile`]
//! compresses whenever the path ends in `.gz`.
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
    #[error("Cannot open '{0}': {1}")]
    OpenError(String, io::Error),
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Check for the gzip magic bytes. Files shorter than two bytes are plaintext.
fn is_gzipped_file(file_path: &str) -> io::Result<bool> {
    let mut file = File::open(file_path)?;
    let mut buffer = [0; 2];
    let n = file.read(&mut buffer)?;
    Ok(n == 2 && buffer == GZIP_MAGIC)
}

/// Represents an input file.
///
/// Plaintext and gzip-compressed input are read through the same interface, so
/// callers such as the VCF reader never need to know how a file was stored.
pub struct InputFile {
    pub filepath: String,
}

impl InputFile {
    /// Constructs a new `InputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - A string slice that holds the path to the file. Compression is
    /// detected from the file's first bytes when it is opened, not from its extension.
    pub fn new(filepath: &str) -> Self {
        Self {
            filepath: filepath.to_string(),
        }
    }

    /// Opens the file and returns a buffered reader.
    ///
    /// If the file starts with the gzip magic bytes, the reader decompresses it.
    ///
    /// # Returns
    ///
    /// A result containing a `BufReader<Box<dyn Read>>` on success, or a `FileError`
    /// naming the path if the file cannot be opened.
    pub fn reader(&self) -> Result<BufReader<Box<dyn Read>>, FileError> {
        let file = File::open(&self.filepath)
            .map_err(|e| FileError::OpenError(self.filepath.clone(), e))?;
        let reader: Box<dyn Read> = if is_gzipped_file(&self.filepath)? {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(BufReader::new(reader))
    }
}

/// Represents an output file.
///
/// Output is gzip-compressed when the path ends in `.gz`, and plaintext otherwise.
pub struct OutputFile {
    pub filepath: String,
    /// Lines written first, each prefixed with `#`.
    pub header: Option<Vec<String>>,
}

impl OutputFile {
    /// Constructs a new `OutputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - A string slice that holds the path to the file. A `.gz` extension
    /// turns on compression.
    /// * `header` - Optional lines written before anything else, each prefixed with `#`.
    pub fn new(filepath: &str, header: Option<Vec<String>>) -> Self {
        Self {
            filepath: filepath.to_string(),
            header,
        }
    }

    /// Creates the file and returns a buffered writer.
    ///
    /// # Returns
    ///
    /// A result containing a `Box<dyn Write>` with the header lines already written,
    /// or a `FileError` naming the path if the file cannot be created.
    pub fn writer(&self) -> Result<Box<dyn Write>, FileError> {
        let file = File::create(&self.filepath)
            .map_err(|e| FileError::OpenError(self.filepath.clone(), e))?;
        let mut writer: Box<dyn Write> = if self.filepath.ends_with(".gz") {
            Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
        } else {
            Box::new(BufWriter::new(file))
        };
        if let Some(entries) = &self.header {
            for entry in entries {
                writeln!(writer, "#{}", entry)?;
            }
        }
        Ok(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use tempfile::tempdir;

    fn round_trip(name: &str) -> (bool, Vec<String>) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        let path = path.to_str().unwrap();

        let output = OutputFile::new(path, Some(vec!["genome\tposition".to_string()]));
        {
            let mut writer = output.writer().unwrap();
            writeln!(writer, "G1\t100").unwrap();
            writer.flush().unwrap();
        }

        let gzipped = is_gzipped_file(path).unwrap();
        let lines = InputFile::new(path)
            .reader()
            .unwrap()
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        (gzipped, lines)
    }

    #[test]
    fn test_plain_and_gzip() {
        let expected = vec!["#genome\tposition".to_string(), "G1\t100".to_string()];
        assert_eq!(round_trip("offsets.tsv"), (false, expected.clone()));
        assert_eq!(round_trip("offsets.tsv.gz"), (true, expected));
    }

    #[test]
    fn test_gzip_detected_by_content() {
        let dir = tempdir().unwrap();
        let gz_path = dir.path().join("calls.vcf.gz");
        let gz_path = gz_path.to_str().unwrap();
        {
            let mut writer = OutputFile::new(gz_path, None).writer().unwrap();
            writeln!(writer, "chr1\t100").unwrap();
            writer.flush().unwrap();
        }

        // a gzip file without the extension is still decompressed
        let renamed = dir.path().join("calls.vcf");
        std::fs::rename(gz_path, &renamed).unwrap();
        let renamed = renamed.to_str().unwrap();
        assert!(is_gzipped_file(renamed).unwrap());
        let lines = InputFile::new(renamed)
            .reader()
            .unwrap()
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(lines, vec!["chr1\t100".to_string()]);
    }

    #[test]
    fn test_missing_file() {
        let result = InputFile::new("tests/data/does_not_exist.vcf").reader();
        assert!(matches!(result, Err(FileError::OpenError(_, _))));
    }
}
