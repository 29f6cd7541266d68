//! Runtime configuration for the conversion pipeline.
//!
//! The configuration is an ordinary value handed to each command; nothing
//! here is global.

use thiserror::Error;

/// Longest run the detector will ever emit.
pub const MAX_RUN_LENGTH: usize = 3;

/// Default number of calls fetched per lookahead refill.
pub const DEFAULT_CHUNK_SIZE: usize = 9;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk size must be at least {MAX_RUN_LENGTH}, got {0}")]
    ChunkTooSmall(usize),
}

/// What to do with a record that cannot be parsed.
///
/// The choice holds for a whole run; fatal and skipping behaviour are never
/// mixed within one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Stop processing the file at the first malformed record.
    #[default]
    Fail,
    /// Log the record, count it, and continue with the next one.
    Skip,
}

/// Pipeline configuration shared by all commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Write a header row before the first output record.
    pub emit_header: bool,
    /// Calls fetched per lookahead refill. Output does not depend on it.
    pub chunk_size: usize,
    /// Malformed record handling.
    pub on_malformed: MalformedPolicy,
    /// Treat a strand change between neighbouring positions as a gap.
    pub split_on_strand_change: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self {
            emit_header: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            on_malformed: MalformedPolicy::Fail,
            split_on_strand_change: false,
        }
    }

    /// Enable or disable the output header row.
    pub fn with_header(mut self, emit_header: bool) -> Self {
        self.emit_header = emit_header;
        self
    }

    /// Set the lookahead refill size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the malformed record policy.
    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    /// Break runs where the strand changes.
    pub fn with_strand_split(mut self, split: bool) -> Self {
        self.split_on_strand_change = split;
        self
    }

    /// Check the configuration before any input is opened.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size < MAX_RUN_LENGTH {
            return Err(ConfigError::ChunkTooSmall(self.chunk_size));
        }
        Ok(())
    }
}
