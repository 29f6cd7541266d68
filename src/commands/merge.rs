//! Streaming run merge: methylKit calls to merged BED intervals.
//!
//! Merges up to three consecutive positions into one interval without
//! loading the file into memory.
//!
//! # Algorithm
//!
//! For each contiguous chromosome block:
//! 1. Pull calls through the ordering validator
//! 2. Partition them into runs with [`RunDetector`]
//! 3. Fold each run into a [`MergedInterval`] and write it
//!
//! An ordering violation ends the current chromosome: intervals already
//! written stay, the rest of the block is discarded and the next chromosome
//! is processed normally.
//!
//! # Memory Complexity
//!
//! O(chunk size) - only the lookahead buffer is held.
//!
//! # Requirements
//!
//! Positions MUST ascend within each chromosome block.

use crate::call::{CallReader, InputSchema};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::interval::{MergedInterval, MERGED_HEADER};
use crate::runs::RunDetector;
use crate::streaming::{BedWriter, CallStream};
use log::{debug, error};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Streaming merge command configuration.
#[derive(Debug, Clone, Default)]
pub struct MergeCommand {
    pub config: PipelineConfig,
}

impl MergeCommand {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Merge a call file.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input_path: P, output: &mut W) -> Result<MergeStats> {
        let file = File::open(input_path.as_ref())?;
        self.run_reader(file, output)
    }

    /// Merge calls from stdin.
    pub fn run_stdin<W: Write>(&self, output: &mut W) -> Result<MergeStats> {
        let stdin = io::stdin();
        self.run_reader(stdin.lock(), output)
    }

    /// Core streaming merge.
    pub fn run_reader<R: Read, W: Write>(&self, input: R, output: &mut W) -> Result<MergeStats> {
        self.config.validate()?;
        let mut reader = CallReader::new(input, self.config.on_malformed)?;
        let mut writer = BedWriter::new(output);
        let mut stats = MergeStats::default();

        if self.config.emit_header {
            writer.write_header(&MERGED_HEADER)?;
        }

        if *reader.schema() == InputSchema::Merged {
            // Already merged: copy rows through untouched
            while let Some(line) = reader.read_line()? {
                writer.write_line(line)?;
                stats.passthrough_rows += 1;
            }
            writer.flush()?;
            return Ok(stats);
        }

        let mut stream = CallStream::new(reader);
        while let Some(chrom) = stream.next_chromosome()? {
            stats.chromosomes += 1;
            debug!("Merging runs on {}", chrom);

            let detector = RunDetector::new(stream.block(), self.config.chunk_size)
                .with_strand_split(self.config.split_on_strand_change);
            for result in detector {
                match result {
                    Ok(run) => {
                        stats.calls_read += run.len();
                        writer.write_merged(&MergedInterval::from_run(&run))?;
                        stats.intervals_written += 1;
                    }
                    Err(e) if e.is_ordering_violation() => {
                        error!("{}", e);
                        stats.chromosomes_aborted += 1;
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        stats.records_skipped = stream.skipped_records();
        stats.records_discarded = stream.discarded_records();
        writer.flush()?;
        Ok(stats)
    }
}

/// Statistics from a merge run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    /// Calls folded into intervals
    pub calls_read: usize,
    /// Merged intervals written
    pub intervals_written: usize,
    /// Chromosome blocks seen
    pub chromosomes: usize,
    /// Chromosome blocks ended by an ordering violation
    pub chromosomes_aborted: usize,
    /// Malformed rows skipped
    pub records_skipped: usize,
    /// Calls dropped from aborted chromosomes
    pub records_discarded: usize,
    /// Rows copied from already-merged input
    pub passthrough_rows: usize,
}

impl MergeStats {
    /// Calls per written interval.
    pub fn compression_ratio(&self) -> f64 {
        if self.intervals_written == 0 {
            0.0
        } else {
            self.calls_read as f64 / self.intervals_written as f64
        }
    }
}

impl std::fmt::Display for MergeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.passthrough_rows > 0 {
            return write!(f, "Passed through {} merged rows", self.passthrough_rows);
        }
        write!(
            f,
            "Calls: {}, Intervals: {}, Compression: {:.2}x, Chromosomes: {} ({} aborted), Skipped: {}, Discarded: {}",
            self.calls_read,
            self.intervals_written,
            self.compression_ratio(),
            self.chromosomes,
            self.chromosomes_aborted,
            self.records_skipped,
            self.records_discarded
        )
    }
}
