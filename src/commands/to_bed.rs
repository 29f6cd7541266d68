//! Per-call BED4 conversion.
//!
//! Writes one `chr start end strand` row per call, with `end = base + 1`.
//! No merging, no ordering requirement.

use crate::call::CallReader;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::streaming::BedWriter;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Column names of a BED4 row.
pub const BED4_HEADER: [&str; 4] = ["chr", "start", "end", "strand"];

#[derive(Debug, Clone, Default)]
pub struct ToBedCommand {
    pub config: PipelineConfig,
}

impl ToBedCommand {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run<P: AsRef<Path>, W: Write>(&self, input_path: P, output: &mut W) -> Result<ToBedStats> {
        let file = File::open(input_path.as_ref())?;
        self.run_reader(file, output)
    }

    pub fn run_stdin<W: Write>(&self, output: &mut W) -> Result<ToBedStats> {
        let stdin = io::stdin();
        self.run_reader(stdin.lock(), output)
    }

    pub fn run_reader<R: Read, W: Write>(&self, input: R, output: &mut W) -> Result<ToBedStats> {
        let mut reader = CallReader::new(input, self.config.on_malformed)?;
        let mut writer = BedWriter::new(output);
        let mut stats = ToBedStats::default();

        if self.config.emit_header {
            writer.write_header(&BED4_HEADER)?;
        }

        while let Some(call) = reader.read_call()? {
            writer.write_bed4_line(&call.chrom, call.position, call.position + 1, call.strand)?;
            stats.records_written += 1;
        }

        stats.records_skipped = reader.skipped_records();
        writer.flush()?;
        Ok(stats)
    }
}

/// Statistics from a BED4 conversion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ToBedStats {
    pub records_written: usize,
    pub records_skipped: usize,
}

impl std::fmt::Display for ToBedStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Written: {}, Skipped: {}",
            self.records_written, self.records_skipped
        )
    }
}
