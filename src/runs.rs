//! Consecutive-position run detection.
//!
//! # Algorithm
//!
//! Calls are pulled into a small lookahead buffer in fixed-size chunks. While
//! the buffer holds at least three calls, the first three positions decide
//! the next run:
//! 1. `p0 + 1 != p1`: `p0` alone
//! 2. `p0 + 1 == p1` and `p1 + 1 == p2`: `p0, p1, p2`
//! 3. otherwise: `p0, p1`
//!
//! At end of input the same adjacency test is applied to the one or two
//! calls left over, so a trailing short run is always emitted.
//!
//! Runs are greedy and left to right: `10, 11, 12, 13` becomes `[10, 11, 12]`
//! then `[13]`. Consumed calls are never looked at again.
//!
//! # Memory Complexity
//!
//! O(chunk size): the buffer never holds more than `chunk_size + 2` calls.

use crate::call::MethylationCall;
use crate::config::{DEFAULT_CHUNK_SIZE, MAX_RUN_LENGTH};
use crate::error::{PipelineError, Result};
use std::collections::VecDeque;

/// One to three positionally consecutive calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    calls: Vec<MethylationCall>,
}

impl Run {
    /// Build a run from calls that are on one chromosome and consecutive.
    ///
    /// Returns None for an empty, oversized or non-consecutive group.
    pub fn try_from_calls(calls: Vec<MethylationCall>) -> Option<Self> {
        if calls.is_empty() || calls.len() > MAX_RUN_LENGTH {
            return None;
        }
        let consecutive = calls
            .windows(2)
            .all(|w| w[0].chrom == w[1].chrom && w[0].position + 1 == w[1].position);
        consecutive.then_some(Self { calls })
    }

    /// Number of calls in the run (1 to 3).
    #[inline]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Always false; a run holds at least one call.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    #[inline]
    pub fn calls(&self) -> &[MethylationCall] {
        &self.calls
    }

    /// The call the run starts at.
    #[inline]
    pub fn first(&self) -> &MethylationCall {
        &self.calls[0]
    }

    /// The call the run ends at.
    #[inline]
    pub fn last(&self) -> &MethylationCall {
        &self.calls[self.calls.len() - 1]
    }

    pub fn into_calls(self) -> Vec<MethylationCall> {
        self.calls
    }
}

/// Partitions an ordered, single-chromosome call sequence into runs.
///
/// Every input call lands in exactly one run, in input order. An error from
/// the source ends the sequence: runs formed from calls read before it are
/// emitted first, then the error.
pub struct RunDetector<I> {
    source: I,
    buffer: VecDeque<MethylationCall>,
    chunk_size: usize,
    split_on_strand_change: bool,
    exhausted: bool,
    pending_error: Option<PipelineError>,
}

impl<I> RunDetector<I>
where
    I: Iterator<Item = Result<MethylationCall>>,
{
    /// Create a detector that refills its buffer `chunk_size` calls at a time.
    ///
    /// Chunk sizes below the maximum run length are raised to it.
    pub fn new(source: I, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(MAX_RUN_LENGTH);
        Self {
            source,
            buffer: VecDeque::with_capacity(chunk_size + MAX_RUN_LENGTH),
            chunk_size,
            split_on_strand_change: false,
            exhausted: false,
            pending_error: None,
        }
    }

    /// Treat a strand change between neighbouring positions as a gap.
    pub fn with_strand_split(mut self, split: bool) -> Self {
        self.split_on_strand_change = split;
        self
    }

    /// Top the buffer up once fewer than a full run's worth of calls remain.
    fn refill(&mut self) {
        if self.exhausted || self.buffer.len() >= MAX_RUN_LENGTH {
            return;
        }
        for _ in 0..self.chunk_size {
            match self.source.next() {
                Some(Ok(call)) => self.buffer.push_back(call),
                Some(Err(e)) => {
                    self.pending_error = Some(e);
                    self.exhausted = true;
                    return;
                }
                None => {
                    self.exhausted = true;
                    return;
                }
            }
        }
    }

    #[inline]
    fn adjacent(&self, a: &MethylationCall, b: &MethylationCall) -> bool {
        a.position + 1 == b.position
            && (!self.split_on_strand_change || a.strand == b.strand)
            && a.chrom == b.chrom
    }

    /// Consume the longest run starting at the front of the buffer.
    fn take_run(&mut self) -> Option<Run> {
        let available = self.buffer.len().min(MAX_RUN_LENGTH);
        if available == 0 {
            return None;
        }

        let mut len = 1;
        while len < available && self.adjacent(&self.buffer[len - 1], &self.buffer[len]) {
            len += 1;
        }

        let calls: Vec<MethylationCall> = self.buffer.drain(..len).collect();
        Some(Run { calls })
    }
}

impl<I> Iterator for RunDetector<I>
where
    I: Iterator<Item = Result<MethylationCall>>,
{
    type Item = Result<Run>;

    fn next(&mut self) -> Option<Self::Item> {
        self.refill();
        if let Some(run) = self.take_run() {
            return Some(Ok(run));
        }
        self.pending_error.take().map(Err)
    }
}

/// Detect runs in an in-memory slice of calls (useful for testing).
pub fn detect_runs(calls: &[MethylationCall]) -> Result<Vec<Run>> {
    RunDetector::new(calls.iter().cloned().map(Ok), DEFAULT_CHUNK_SIZE).collect()
}
