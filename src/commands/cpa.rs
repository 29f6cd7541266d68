//! CpA context extraction.
//!
//! Resolves the trinucleotide context of every call against a reference and
//! writes the calls whose context starts with `CA`. Calls are handled one at
//! a time; a call whose context cannot be resolved is logged and excluded
//! without affecting its neighbours.

use crate::call::CallReader;
use crate::config::PipelineConfig;
use crate::context::{accepts, ContextRecord, ContextResolver, Trinucleotide, CONTEXT_HEADER};
use crate::error::Result;
use crate::reference::ReferenceProvider;
use crate::streaming::{BedWriter, CallStream};
use log::{debug, error, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// CpA context command.
pub struct CpaCommand<P> {
    pub config: PipelineConfig,
    resolver: ContextResolver<P>,
    /// Only these chromosomes are processed when set.
    chromosomes: Option<FxHashSet<String>>,
}

impl<P: ReferenceProvider> CpaCommand<P> {
    pub fn new(config: PipelineConfig, reference: P) -> Self {
        Self {
            config,
            resolver: ContextResolver::new(reference),
            chromosomes: None,
        }
    }

    /// Restrict processing to the given chromosomes.
    pub fn with_chromosomes<I, S>(mut self, chromosomes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chromosomes = Some(chromosomes.into_iter().map(Into::into).collect());
        self
    }

    fn wants(&self, chrom: &str) -> bool {
        self.chromosomes
            .as_ref()
            .is_none_or(|allowed| allowed.contains(chrom))
    }

    /// Extract CpA calls from a call file.
    pub fn run<Q: AsRef<Path>, W: Write>(&mut self, input_path: Q, output: &mut W) -> Result<CpaStats> {
        let file = File::open(input_path.as_ref())?;
        self.run_reader(file, output)
    }

    /// Extract CpA calls from stdin.
    pub fn run_stdin<W: Write>(&mut self, output: &mut W) -> Result<CpaStats> {
        let stdin = io::stdin();
        self.run_reader(stdin.lock(), output)
    }

    /// Core streaming extraction.
    pub fn run_reader<R: Read, W: Write>(&mut self, input: R, output: &mut W) -> Result<CpaStats> {
        self.config.validate()?;
        let reader = CallReader::new(input, self.config.on_malformed)?;
        let mut stream = CallStream::new(reader);
        let mut writer = BedWriter::new(output);
        let mut stats = CpaStats::default();

        if self.config.emit_header {
            writer.write_header(&CONTEXT_HEADER)?;
        }

        while let Some(chrom) = stream.next_chromosome()? {
            if !self.wants(&chrom) {
                let mut skipped = 0;
                for result in stream.block() {
                    match result {
                        Ok(_) => skipped += 1,
                        Err(e) if e.is_ordering_violation() => {
                            error!("{}", e);
                            stats.chromosomes_aborted += 1;
                            break;
                        }
                        Err(e) => return Err(e),
                    }
                }
                debug!("Skipping {} ({} calls)", chrom, skipped);
                stats.calls_outside_chromosomes += skipped;
                continue;
            }
            stats.chromosomes += 1;
            debug!("Resolving contexts on {}", chrom);

            for result in stream.block() {
                let call = match result {
                    Ok(call) => call,
                    Err(e) if e.is_ordering_violation() => {
                        error!("{}", e);
                        stats.chromosomes_aborted += 1;
                        break;
                    }
                    Err(e) => return Err(e),
                };
                stats.calls_read += 1;

                let context = match self.resolver.resolve(&call) {
                    Ok(context) => context,
                    Err(e) => {
                        warn!("Excluding call: {}", e);
                        stats.calls_unresolved += 1;
                        continue;
                    }
                };
                *stats.contexts.entry(context.to_ascii_uppercase()).or_insert(0) += 1;

                if accepts(&context) {
                    writer.write_context(&ContextRecord::new(&call, context))?;
                    stats.calls_written += 1;
                }
            }
        }

        stats.records_skipped = stream.skipped_records();
        stats.records_discarded = stream.discarded_records();
        writer.flush()?;

        if log::log_enabled!(log::Level::Debug) {
            let mut contexts: Vec<_> = stats.contexts.iter().collect();
            contexts.sort();
            for (context, count) in contexts {
                debug!("Context {}: {}", context, count);
            }
        }
        Ok(stats)
    }

    /// Release the command, handing back the reference.
    pub fn into_reference(self) -> P {
        self.resolver.into_inner()
    }
}

/// Statistics from a CpA extraction.
#[derive(Debug, Default, Clone)]
pub struct CpaStats {
    /// Calls considered for context resolution
    pub calls_read: usize,
    /// CpA calls written
    pub calls_written: usize,
    /// Calls excluded because their context could not be resolved
    pub calls_unresolved: usize,
    /// Calls on chromosomes outside the allow-list
    pub calls_outside_chromosomes: usize,
    pub chromosomes: usize,
    pub chromosomes_aborted: usize,
    pub records_skipped: usize,
    pub records_discarded: usize,
    /// Resolved contexts, upper-cased, with their counts
    pub contexts: FxHashMap<Trinucleotide, usize>,
}

impl std::fmt::Display for CpaStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Calls: {}, CpA: {}, Unresolved: {}, Outside chromosomes: {}, Chromosomes: {} ({} aborted), Skipped: {}, Discarded: {}",
            self.calls_read,
            self.calls_written,
            self.calls_unresolved,
            self.calls_outside_chromosomes,
            self.chromosomes,
            self.chromosomes_aborted,
            self.records_skipped,
            self.records_discarded
        )
    }
}
