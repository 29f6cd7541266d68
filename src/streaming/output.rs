//! Efficient output formatting for streaming operations.
//!
//! Uses itoa for integer formatting and ryu for float formatting
//! to avoid allocation in the hot path.

use crate::call::Strand;
use crate::context::ContextRecord;
use crate::error::PipelineError;
use crate::interval::MergedInterval;
use crate::streaming::buffers::DEFAULT_OUTPUT_BUFFER;
use std::fmt;
use std::io::{BufWriter, Write};

/// Whether a percentage prints as an integer (`0`, `100`).
#[inline(always)]
fn is_integral(value: f64) -> bool {
    value.fract() == 0.0 && value.abs() < 1e15
}

/// Format a percentage the way [`BedWriter`] does.
///
/// Integral values print without a fractional part, everything else in
/// shortest round-trip form.
pub fn fmt_percent<W: fmt::Write>(out: &mut W, value: f64) -> fmt::Result {
    if is_integral(value) {
        out.write_str(itoa::Buffer::new().format(value as i64))
    } else {
        out.write_str(ryu::Buffer::new().format(value))
    }
}

/// High-performance delimited output writer.
///
/// Uses large buffering and zero-allocation formatting with itoa/ryu
/// for optimal throughput.
pub struct BedWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
}

impl<W: Write> BedWriter<W> {
    /// Create a new BedWriter with the default buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    /// Create a new BedWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
        }
    }

    /// Write a tab-joined header row.
    pub fn write_header(&mut self, columns: &[&str]) -> Result<(), PipelineError> {
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.write_tab()?;
            }
            self.writer.write_all(column.as_bytes())?;
        }
        self.write_newline()
    }

    /// Write `chrom start end strand` without a line terminator.
    #[inline]
    pub fn write_bed4(
        &mut self,
        chrom: &str,
        start: u64,
        end: u64,
        strand: Strand,
    ) -> Result<(), PipelineError> {
        self.writer.write_all(chrom.as_bytes())?;
        self.write_tab()?;
        self.write_int(start)?;
        self.write_tab()?;
        self.write_int(end)?;
        self.write_tab()?;
        self.writer.write_all(&[strand.symbol() as u8])?;
        Ok(())
    }

    /// Write a BED4 record followed by newline.
    #[inline]
    pub fn write_bed4_line(
        &mut self,
        chrom: &str,
        start: u64,
        end: u64,
        strand: Strand,
    ) -> Result<(), PipelineError> {
        self.write_bed4(chrom, start, end, strand)?;
        self.write_newline()
    }

    /// Write one merged interval row.
    #[inline]
    pub fn write_merged(&mut self, interval: &MergedInterval) -> Result<(), PipelineError> {
        self.write_bed4(
            &interval.chrom,
            interval.start,
            interval.end,
            interval.strand,
        )?;
        for slot in &interval.slots {
            self.write_tab()?;
            self.write_int(slot.coverage)?;
            self.write_tab()?;
            self.write_percent(slot.percent_methylated)?;
        }
        self.write_newline()
    }

    /// Write one CpA context row.
    #[inline]
    pub fn write_context(&mut self, record: &ContextRecord) -> Result<(), PipelineError> {
        self.write_bed4(&record.chrom, record.start, record.end, record.strand)?;
        self.write_tab()?;
        self.write_int(record.coverage)?;
        self.write_tab()?;
        self.write_percent(record.freq_c)?;
        self.write_tab()?;
        self.write_percent(record.freq_t)?;
        self.write_tab()?;
        self.writer.write_all(record.context.as_bytes())?;
        self.write_newline()
    }

    /// Write a full line as-is with newline.
    #[inline]
    pub fn write_line(&mut self, line: &[u8]) -> Result<(), PipelineError> {
        self.writer.write_all(line)?;
        self.write_newline()
    }

    /// Write a tab character.
    #[inline]
    pub fn write_tab(&mut self) -> Result<(), PipelineError> {
        self.writer.write_all(b"\t")?;
        Ok(())
    }

    /// Write a newline character.
    #[inline]
    pub fn write_newline(&mut self) -> Result<(), PipelineError> {
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write an integer using itoa.
    #[inline]
    pub fn write_int<I: itoa::Integer>(&mut self, n: I) -> Result<(), PipelineError> {
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(())
    }

    /// Write a percentage: itoa when integral, ryu otherwise.
    #[inline]
    pub fn write_percent(&mut self, value: f64) -> Result<(), PipelineError> {
        if is_integral(value) {
            self.write_int(value as i64)
        } else {
            self.writer.write_all(self.ryu_buf.format(value).as_bytes())?;
            Ok(())
        }
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<(), PipelineError> {
        self.writer.flush()?;
        Ok(())
    }
}
