//! Per-cytosine methylation calls and the streaming methylKit reader.
//!
//! Input files are tab-delimited with one header row. Columns are found by
//! name, so the common methylKit layout (`chrBase chr base strand coverage
//! freqC freqT`) and the reduced layout (`chr base strand coverage freqC`)
//! both read without configuration.

use crate::config::MalformedPolicy;
use crate::error::{PipelineError, Result};
use crate::streaming::buffers::{DEFAULT_INPUT_BUFFER, DEFAULT_LINE_BUFFER};
use crate::streaming::parsing::{parse_percent, parse_u64_fast, should_skip_line, split_fields};
use log::warn;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Largest accepted 1-based position. Leaves room for interval ends and
/// signed context windows.
pub const MAX_POSITION: u64 = i64::MAX as u64 - 3;

/// Strand of a methylation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Parse a methylKit strand code (`F`/`R`) or a BED symbol (`+`/`-`).
    pub fn from_code(code: &[u8]) -> Option<Self> {
        match code {
            b"F" | b"+" => Some(Strand::Forward),
            b"R" | b"-" => Some(Strand::Reverse),
            _ => None,
        }
    }

    /// BED strand symbol.
    #[inline]
    pub fn symbol(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One methylation call at a 1-based genomic position.
#[derive(Debug, Clone, PartialEq)]
pub struct MethylationCall {
    pub chrom: String,
    pub position: u64,
    pub strand: Strand,
    pub coverage: u64,
    /// Percentage of reads showing methylation (`freqC`).
    pub percent_methylated: f64,
    /// `freqT`, when the input carries it.
    pub percent_unmethylated: Option<f64>,
}

impl MethylationCall {
    pub fn new(
        chrom: impl Into<String>,
        position: u64,
        strand: Strand,
        coverage: u64,
        percent_methylated: f64,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            position,
            strand,
            coverage,
            percent_methylated,
            percent_unmethylated: None,
        }
    }

    /// `freqT`, derived as `100 - freqC` when the input had no such column.
    #[inline]
    pub fn freq_t(&self) -> f64 {
        self.percent_unmethylated
            .unwrap_or(100.0 - self.percent_methylated)
    }
}

/// Column indices of a call file, resolved from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallColumns {
    pub chrom: usize,
    pub base: usize,
    pub strand: usize,
    pub coverage: usize,
    pub freq_c: usize,
    pub freq_t: Option<usize>,
    /// Minimum number of fields a data row must have.
    pub width: usize,
}

impl CallColumns {
    const REQUIRED: [&'static str; 5] = ["chr", "base", "strand", "coverage", "freqC"];

    /// `chr base strand coverage freqC freqT`
    pub fn default_layout() -> Self {
        Self {
            chrom: 0,
            base: 1,
            strand: 2,
            coverage: 3,
            freq_c: 4,
            freq_t: Some(5),
            width: 5,
        }
    }

    fn from_header(names: &[&str]) -> std::result::Result<Self, String> {
        let find = |name: &str| names.iter().position(|n| *n == name);
        let missing: Vec<&str> = Self::REQUIRED
            .iter()
            .copied()
            .filter(|name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing column(s): {}", missing.join(", ")));
        }

        let chrom = find("chr").unwrap_or_default();
        let base = find("base").unwrap_or_default();
        let strand = find("strand").unwrap_or_default();
        let coverage = find("coverage").unwrap_or_default();
        let freq_c = find("freqC").unwrap_or_default();
        let width = 1 + [chrom, base, strand, coverage, freq_c]
            .into_iter()
            .max()
            .unwrap_or_default();

        Ok(Self {
            chrom,
            base,
            strand,
            coverage,
            freq_c,
            freq_t: find("freqT"),
            width,
        })
    }
}

/// Layout of an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSchema {
    /// Per-position methylKit calls.
    Calls(CallColumns),
    /// Rows already produced by the merge command.
    Merged,
}

impl InputSchema {
    fn detect(names: &[&str]) -> std::result::Result<Self, String> {
        let has = |name: &str| names.contains(&name);
        if has("start") && has("end") && has("coverage1") {
            Ok(InputSchema::Merged)
        } else if has("base") {
            CallColumns::from_header(names).map(InputSchema::Calls)
        } else {
            Err(format!(
                "expected a methylKit header ({}), found '{}'",
                CallColumns::REQUIRED.join(", "),
                names.join("\t")
            ))
        }
    }
}

/// A streaming reader over a methylKit call file.
///
/// The header is consumed on construction. Malformed data rows are either
/// fatal or skipped, according to the [`MalformedPolicy`] given here.
pub struct CallReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: Vec<u8>,
    header: Vec<u8>,
    schema: InputSchema,
    policy: MalformedPolicy,
    skipped: usize,
}

impl CallReader<File> {
    /// Open a call file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P, policy: MalformedPolicy) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file, policy)
    }
}

impl<R: Read> CallReader<R> {
    /// Create a reader and consume the header row.
    pub fn new(reader: R, policy: MalformedPolicy) -> Result<Self> {
        Self::with_capacity(reader, DEFAULT_INPUT_BUFFER, policy)
    }

    /// Create a reader with custom buffer capacity.
    pub fn with_capacity(reader: R, capacity: usize, policy: MalformedPolicy) -> Result<Self> {
        let mut this = Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
            buffer: Vec::with_capacity(DEFAULT_LINE_BUFFER),
            header: Vec::new(),
            schema: InputSchema::Calls(CallColumns::default_layout()),
            policy,
            skipped: 0,
        };
        this.read_header()?;
        Ok(this)
    }

    fn read_header(&mut self) -> Result<()> {
        if !self.next_data_line()? {
            // Empty input: nothing to read, nothing to reject.
            return Ok(());
        }

        let mut fields = Vec::new();
        split_fields(&self.buffer, &mut fields);
        let names: Vec<&str> = fields
            .iter()
            .map(|f| std::str::from_utf8(f).unwrap_or("").trim())
            .collect();

        self.schema = InputSchema::detect(&names).map_err(|message| {
            PipelineError::MissingHeader {
                line: self.line_number,
                message,
            }
        })?;
        self.header = crate::streaming::parsing::trim_line_end(&self.buffer).to_vec();
        Ok(())
    }

    /// Advance to the next line carrying a record. Returns false at EOF.
    fn next_data_line(&mut self) -> Result<bool> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_until(b'\n', &mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(false);
            }
            self.line_number += 1;
            if !should_skip_line(&self.buffer) {
                return Ok(true);
            }
        }
    }

    /// The input layout found in the header.
    pub fn schema(&self) -> &InputSchema {
        &self.schema
    }

    /// The header row as read, without its line terminator.
    pub fn header_line(&self) -> &[u8] {
        &self.header
    }

    /// Line number of the most recently read line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Number of malformed rows skipped so far.
    pub fn skipped_records(&self) -> usize {
        self.skipped
    }

    /// Raw bytes of the most recently read row, without its terminator.
    pub fn last_line(&self) -> &[u8] {
        crate::streaming::parsing::trim_line_end(&self.buffer)
    }

    /// Read the next data row verbatim.
    pub fn read_line(&mut self) -> Result<Option<&[u8]>> {
        if self.next_data_line()? {
            Ok(Some(self.last_line()))
        } else {
            Ok(None)
        }
    }

    /// Read the next call.
    pub fn read_call(&mut self) -> Result<Option<MethylationCall>> {
        let columns = match &self.schema {
            InputSchema::Calls(columns) => columns.clone(),
            InputSchema::Merged => {
                return Err(PipelineError::MissingHeader {
                    line: 1,
                    message: "input holds merged intervals, not per-position calls".to_string(),
                })
            }
        };

        while self.next_data_line()? {
            match self.parse_call(&columns) {
                Ok(call) => return Ok(Some(call)),
                Err(PipelineError::Malformed { line, message })
                    if self.policy == MalformedPolicy::Skip =>
                {
                    warn!("Skipping malformed record at line {}: {}", line, message);
                    self.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Parse the current line into a call.
    fn parse_call(&self, columns: &CallColumns) -> Result<MethylationCall> {
        let mut fields: Vec<&[u8]> = Vec::with_capacity(8);
        split_fields(&self.buffer, &mut fields);

        if fields.len() < columns.width {
            return Err(self.malformed(format!(
                "Expected at least {} fields, got {}",
                columns.width,
                fields.len()
            )));
        }

        let chrom = std::str::from_utf8(fields[columns.chrom])
            .ok()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| self.malformed("Empty or non-UTF-8 chromosome".to_string()))?;

        let position = parse_u64_fast(fields[columns.base])
            .ok_or_else(|| self.invalid("base", fields[columns.base]))?;
        if position == 0 {
            return Err(self.malformed("Position must be 1-based, got 0".to_string()));
        }
        if position > MAX_POSITION {
            return Err(self.malformed(format!(
                "Position {} exceeds the maximum of {}",
                position, MAX_POSITION
            )));
        }

        let strand = Strand::from_code(fields[columns.strand])
            .ok_or_else(|| self.invalid("strand", fields[columns.strand]))?;
        let coverage = parse_u64_fast(fields[columns.coverage])
            .ok_or_else(|| self.invalid("coverage", fields[columns.coverage]))?;
        let percent_methylated = parse_percent(fields[columns.freq_c])
            .ok_or_else(|| self.invalid("freqC", fields[columns.freq_c]))?;

        let percent_unmethylated = match columns.freq_t.and_then(|i| fields.get(i)) {
            Some(raw) => Some(parse_percent(raw).ok_or_else(|| self.invalid("freqT", raw))?),
            None => None,
        };

        Ok(MethylationCall {
            chrom: chrom.to_string(),
            position,
            strand,
            coverage,
            percent_methylated,
            percent_unmethylated,
        })
    }

    fn malformed(&self, message: String) -> PipelineError {
        PipelineError::Malformed {
            line: self.line_number,
            message,
        }
    }

    fn invalid(&self, field: &str, raw: &[u8]) -> PipelineError {
        self.malformed(format!(
            "Invalid {} value: '{}'",
            field,
            String::from_utf8_lossy(raw)
        ))
    }

    /// Get an iterator over all calls.
    pub fn calls(self) -> CallIter<R> {
        CallIter { reader: self }
    }
}

/// Iterator over calls.
pub struct CallIter<R: Read> {
    reader: CallReader<R>,
}

impl<R: Read> Iterator for CallIter<R> {
    type Item = Result<MethylationCall>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_call().transpose()
    }
}

/// Parse calls from a string (useful for testing).
pub fn parse_calls(content: &str) -> Result<Vec<MethylationCall>> {
    CallReader::new(content.as_bytes(), MalformedPolicy::Fail)?
        .calls()
        .collect()
}
