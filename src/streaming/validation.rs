//! Ordering validation for call streams.
//!
//! Run merging is only meaningful on sorted input. The validator checks,
//! record by record, that:
//! 1. All records for a chromosome are contiguous (no interleaving)
//! 2. Within a chromosome, positions are non-decreasing
//!
//! Any consistent chromosome order is accepted.

use crate::error::PipelineError;
use rustc_hash::FxHashMap;

/// Inline ordering validator for use within streaming loops.
#[derive(Debug, Default)]
pub struct OrderingValidator {
    prev_chrom: Option<String>,
    prev_position: u64,
    /// Last accepted position of every chromosome already left behind.
    finished: FxHashMap<String, u64>,
    record_count: usize,
}

impl OrderingValidator {
    /// Create a new ordering validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that the given call keeps the stream ordered.
    ///
    /// On error the validator state is left unchanged, so the offending call
    /// can simply be dropped.
    #[inline]
    pub fn validate(&mut self, chrom: &str, position: u64) -> Result<(), PipelineError> {
        self.record_count += 1;

        if self.prev_chrom.as_deref() == Some(chrom) {
            if position < self.prev_position {
                return Err(PipelineError::OrderingViolation {
                    chrom: chrom.to_string(),
                    position,
                    previous: self.prev_position,
                });
            }
        } else {
            // Switching chromosomes - check we haven't left this one before
            if let Some(&previous) = self.finished.get(chrom) {
                return Err(PipelineError::OrderingViolation {
                    chrom: chrom.to_string(),
                    position,
                    previous,
                });
            }
            if let Some(pc) = self.prev_chrom.take() {
                self.finished.insert(pc, self.prev_position);
            }
            self.prev_chrom = Some(chrom.to_string());
        }

        self.prev_position = position;
        Ok(())
    }

    /// Get the number of records validated.
    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_stream_passes() {
        let mut validator = OrderingValidator::new();
        for (chrom, pos) in [("chr1", 5), ("chr1", 5), ("chr1", 9), ("chr2", 1), ("chr10", 3)] {
            validator.validate(chrom, pos).unwrap();
        }
        assert_eq!(validator.record_count(), 5);
    }

    #[test]
    fn test_position_regression_detected() {
        let mut validator = OrderingValidator::new();
        validator.validate("chr1", 100).unwrap();
        let err = validator.validate("chr1", 99).unwrap_err();

        match err {
            PipelineError::OrderingViolation {
                chrom,
                position,
                previous,
            } => {
                assert_eq!(chrom, "chr1");
                assert_eq!(position, 99);
                assert_eq!(previous, 100);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // State is untouched, so the stream can still continue past 100
        validator.validate("chr1", 101).unwrap();
    }

    #[test]
    fn test_interleaved_chromosome_detected() {
        let mut validator = OrderingValidator::new();
        validator.validate("chr1", 10).unwrap();
        validator.validate("chr2", 10).unwrap();
        assert!(validator.validate("chr1", 20).is_err());
    }
}
