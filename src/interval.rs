//! Merged BED-like intervals built from runs.

use crate::call::Strand;
use crate::config::MAX_RUN_LENGTH;
use crate::runs::Run;
use crate::streaming::output::fmt_percent;
use std::fmt;

/// Column names of a merged interval row.
pub const MERGED_HEADER: [&str; 10] = [
    "chr",
    "start",
    "end",
    "strand",
    "coverage1",
    "freqC1",
    "coverage2",
    "freqC2",
    "coverage3",
    "freqC3",
];

/// Coverage and methylation of one position inside a merged interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MethylationSlot {
    pub coverage: u64,
    pub percent_methylated: f64,
}

/// One output row of the run-merging path.
///
/// `start` is the first call's 1-based position and `end` is one past the
/// last call's position. Slot `k` is filled iff the run had at least `k + 1`
/// calls; the rest stay zero so every row has the same width.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedInterval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    pub slots: [MethylationSlot; MAX_RUN_LENGTH],
}

impl MergedInterval {
    /// Fold a run into one interval. The strand is taken from the first call.
    pub fn from_run(run: &Run) -> Self {
        let first = run.first();
        let mut slots = [MethylationSlot::default(); MAX_RUN_LENGTH];
        for (slot, call) in slots.iter_mut().zip(run.calls()) {
            *slot = MethylationSlot {
                coverage: call.coverage,
                percent_methylated: call.percent_methylated,
            };
        }

        Self {
            chrom: first.chrom.clone(),
            start: first.position,
            end: run.last().position + 1,
            strand: first.strand,
            slots,
        }
    }

    /// Number of positions covered.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl From<&Run> for MergedInterval {
    fn from(run: &Run) -> Self {
        Self::from_run(run)
    }
}

impl fmt::Display for MergedInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.chrom, self.start, self.end, self.strand
        )?;
        for slot in &self.slots {
            write!(f, "\t{}\t", slot.coverage)?;
            fmt_percent(f, slot.percent_methylated)?;
        }
        Ok(())
    }
}
