//! Fatal error taxonomy for the conversion pipeline.
//!
//! Per-call problems found while resolving sequence context live in
//! [`crate::context::ContextError`]; they exclude one call and never reach
//! this type.

use crate::config::ConfigError;
use crate::reference::ReferenceError;
use std::io;
use thiserror::Error;

/// Errors that stop a file (or, for ordering violations, a chromosome stream).
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed record at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Missing or unrecognised header at line {line}: {message}")]
    MissingHeader { line: usize, message: String },

    #[error(
        "Input not sorted: position {position} on {chrom} comes after {previous} (chromosome stream aborted)"
    )]
    OrderingViolation {
        chrom: String,
        position: u64,
        previous: u64,
    },

    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid file pattern: {0}")]
    Pattern(String),

    #[error("{aborted} chromosome stream(s) aborted in {input}")]
    Incomplete { input: String, aborted: usize },

    #[error("{failed} of {total} input file(s) failed")]
    BatchFailed { failed: usize, total: usize },
}

impl PipelineError {
    /// True for errors that only end the current chromosome stream.
    pub fn is_ordering_violation(&self) -> bool {
        matches!(self, PipelineError::OrderingViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
