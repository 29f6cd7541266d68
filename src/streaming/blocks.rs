//! Chromosome-at-a-time cursor over a call file.
//!
//! [`CallStream`] owns the reader and hands out one [`ChromosomeCalls`]
//! iterator per contiguous chromosome block. Each block is validated for
//! ordering as it is consumed; a block abandoned part-way (for example after
//! an ordering violation) is discarded when the next block is requested.

use crate::call::{CallReader, MethylationCall};
use crate::error::Result;
use crate::streaming::validation::OrderingValidator;
use std::io::Read;

/// Owned cursor over the calls of one input file.
pub struct CallStream<R: Read> {
    reader: CallReader<R>,
    /// First call of the next block, read ahead while closing the current one.
    pending: Option<MethylationCall>,
    current: Option<String>,
    validator: OrderingValidator,
    discarded: usize,
}

impl<R: Read> CallStream<R> {
    pub fn new(reader: CallReader<R>) -> Self {
        Self {
            reader,
            pending: None,
            current: None,
            validator: OrderingValidator::new(),
            discarded: 0,
        }
    }

    fn pull(&mut self) -> Result<Option<MethylationCall>> {
        match self.pending.take() {
            Some(call) => Ok(Some(call)),
            None => self.reader.read_call(),
        }
    }

    /// Move to the next chromosome block and return its name.
    ///
    /// Calls left unread in the current block are discarded.
    pub fn next_chromosome(&mut self) -> Result<Option<String>> {
        while let Some(call) = self.pull()? {
            if self.current.as_deref() == Some(call.chrom.as_str()) {
                self.discarded += 1;
                continue;
            }
            let chrom = call.chrom.clone();
            self.current = Some(chrom.clone());
            self.pending = Some(call);
            return Ok(Some(chrom));
        }
        self.current = None;
        Ok(None)
    }

    /// Iterate over the calls of the current block.
    pub fn block(&mut self) -> ChromosomeCalls<'_, R> {
        ChromosomeCalls { stream: self }
    }

    /// Calls dropped because their chromosome stream was abandoned.
    pub fn discarded_records(&self) -> usize {
        self.discarded
    }

    /// Malformed rows skipped by the reader.
    pub fn skipped_records(&self) -> usize {
        self.reader.skipped_records()
    }
}

/// Calls of one chromosome, in file order, checked for ordering.
pub struct ChromosomeCalls<'a, R: Read> {
    stream: &'a mut CallStream<R>,
}

impl<R: Read> Iterator for ChromosomeCalls<'_, R> {
    type Item = Result<MethylationCall>;

    fn next(&mut self) -> Option<Self::Item> {
        let call = match self.stream.pull() {
            Ok(Some(call)) => call,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };

        if self.stream.current.as_deref() != Some(call.chrom.as_str()) {
            // First call of the following block; leave it for next_chromosome
            self.stream.pending = Some(call);
            return None;
        }

        if let Err(e) = self.stream.validator.validate(&call.chrom, call.position) {
            self.stream.discarded += 1;
            return Some(Err(e));
        }
        Some(Ok(call))
    }
}
