//! Reference sequence providers.
//!
//! Context resolution needs random access to short windows of the reference
//! genome. [`FastaReference`] serves them from an indexed FASTA file (a
//! `.fai` next to the FASTA, as written by `samtools faidx`);
//! [`InMemoryReference`] holds sequences in memory for small genomes and
//! tests. Coordinates are zero-based and half-open throughout.

use bio::io::fasta::IndexedReader;
use log::debug;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by a reference provider.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("failed to open reference {path}: {message}")]
    Open { path: String, message: String },

    #[error("unknown chromosome '{0}'")]
    UnknownChromosome(String),

    #[error("range {start}-{end} is outside {chrom} (length {length})")]
    OutOfBounds {
        chrom: String,
        start: u64,
        end: u64,
        length: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Random access to reference bases.
pub trait ReferenceProvider {
    /// Fetch the bases of `chrom` in `[start, end)`.
    fn fetch(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, ReferenceError>;

    /// Length of a chromosome, if the provider knows it.
    fn chrom_length(&self, chrom: &str) -> Option<u64>;
}

impl<P: ReferenceProvider + ?Sized> ReferenceProvider for Box<P> {
    fn fetch(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, ReferenceError> {
        (**self).fetch(chrom, start, end)
    }

    fn chrom_length(&self, chrom: &str) -> Option<u64> {
        (**self).chrom_length(chrom)
    }
}

/// Check a half-open range against a chromosome length.
fn check_bounds(
    chrom: &str,
    start: u64,
    end: u64,
    length: Option<u64>,
) -> Result<(), ReferenceError> {
    let length = length.ok_or_else(|| ReferenceError::UnknownChromosome(chrom.to_string()))?;
    if start > end || end > length {
        return Err(ReferenceError::OutOfBounds {
            chrom: chrom.to_string(),
            start,
            end,
            length,
        });
    }
    Ok(())
}

/// Find the FAI index path for a FASTA file.
fn fai_path(fasta: &Path) -> PathBuf {
    let mut name = fasta.as_os_str().to_owned();
    name.push(".fai");
    PathBuf::from(name)
}

/// An indexed FASTA file.
///
/// The file handle is held for the lifetime of the value and released on
/// drop.
pub struct FastaReference {
    reader: IndexedReader<File>,
    lengths: FxHashMap<String, u64>,
}

impl FastaReference {
    /// Open a FASTA file and its `.fai` index.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let index = fai_path(path);
        if !index.exists() {
            return Err(ReferenceError::Open {
                path: path.display().to_string(),
                message: format!(
                    "index {} not found (create it with `samtools faidx`)",
                    index.display()
                ),
            });
        }

        let reader = IndexedReader::from_file(&path).map_err(|e| ReferenceError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let lengths: FxHashMap<String, u64> = reader
            .index
            .sequences()
            .into_iter()
            .map(|seq| (seq.name, seq.len))
            .collect();

        debug!(
            "Opened reference {} ({} sequences)",
            path.display(),
            lengths.len()
        );
        Ok(Self { reader, lengths })
    }

    /// Number of sequences in the index.
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

impl ReferenceProvider for FastaReference {
    fn fetch(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, ReferenceError> {
        check_bounds(chrom, start, end, self.chrom_length(chrom))?;

        self.reader.fetch(chrom, start, end)?;
        let mut sequence = Vec::with_capacity((end - start) as usize);
        self.reader.read(&mut sequence)?;
        Ok(sequence)
    }

    fn chrom_length(&self, chrom: &str) -> Option<u64> {
        self.lengths.get(chrom).copied()
    }
}

/// Reference sequences held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReference {
    sequences: FxHashMap<String, Vec<u8>>,
}

impl InMemoryReference {
    /// Create an empty reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sequence, builder style.
    pub fn with_sequence(mut self, chrom: impl Into<String>, bases: impl AsRef<[u8]>) -> Self {
        self.insert(chrom, bases);
        self
    }

    /// Insert or replace a sequence.
    pub fn insert(&mut self, chrom: impl Into<String>, bases: impl AsRef<[u8]>) {
        self.sequences
            .insert(chrom.into(), bases.as_ref().to_vec());
    }
}

impl ReferenceProvider for InMemoryReference {
    fn fetch(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<u8>, ReferenceError> {
        check_bounds(chrom, start, end, self.chrom_length(chrom))?;
        let sequence = &self.sequences[chrom];
        Ok(sequence[start as usize..end as usize].to_vec())
    }

    fn chrom_length(&self, chrom: &str) -> Option<u64> {
        self.sequences.get(chrom).map(|s| s.len() as u64)
    }
}
