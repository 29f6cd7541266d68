// Clippy allows for the whole crate
#![allow(clippy::type_complexity)]

//! methbed: methylKit calls to BED intervals
//!
//! This library turns per-cytosine methylation calls into interval records
//! for downstream interval tools.
//!
//! # Features
//!
//! - **Run merging**: Up to three consecutive positions folded into one row
//! - **CpA extraction**: Strand-aware trinucleotide context from an indexed FASTA
//! - **Streaming I/O**: Memory use independent of input size
//!
//! # Example
//!
//! ```rust,no_run
//! use methbed::commands::MergeCommand;
//! use methbed::config::PipelineConfig;
//!
//! let cmd = MergeCommand::new(PipelineConfig::new().with_header(true));
//! let mut out = std::io::stdout();
//! let stats = cmd.run("sample.txt", &mut out).unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod batch;
pub mod call;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod interval;
pub mod reference;
pub mod runs;
pub mod streaming;

// Re-export commonly used types
pub use call::{parse_calls, CallReader, MethylationCall, Strand};
pub use context::{ContextResolver, Trinucleotide};
pub use error::{PipelineError, Result};
pub use interval::MergedInterval;
pub use runs::{detect_runs, Run, RunDetector};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::call::{parse_calls, CallReader, MethylationCall, Strand};
    pub use crate::commands::{CpaCommand, MergeCommand, SplitChromCommand, ToBedCommand};
    pub use crate::config::{MalformedPolicy, PipelineConfig};
    pub use crate::context::{ContextResolver, Trinucleotide};
    pub use crate::error::{PipelineError, Result};
    pub use crate::interval::MergedInterval;
    pub use crate::reference::{FastaReference, InMemoryReference, ReferenceProvider};
    pub use crate::runs::{detect_runs, Run, RunDetector};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_workflow() {
        use crate::call::parse_calls;
        use crate::interval::MergedInterval;
        use crate::runs::detect_runs;

        let content = "chr\tbase\tstrand\tcoverage\tfreqC\n\
            chr1\t100\tF\t5\t10\n\
            chr1\t101\tF\t6\t20\n\
            chr1\t300\tR\t7\t30\n";
        let calls = parse_calls(content).unwrap();

        let merged: Vec<MergedInterval> = detect_runs(&calls).unwrap().iter().map(MergedInterval::from).collect();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].start, 100);
        assert_eq!(merged[0].end, 102);
        assert_eq!(merged[1].strand, crate::call::Strand::Reverse);
    }

    #[test]
    fn test_context_workflow() {
        use crate::call::parse_calls;
        use crate::context::ContextResolver;
        use crate::reference::InMemoryReference;

        let content = "chr\tbase\tstrand\tcoverage\tfreqC\nchr1\t2\tF\t5\t10\nchr1\t4\tR\t5\t10\n";
        let calls = parse_calls(content).unwrap();
        let mut resolver = ContextResolver::new(InMemoryReference::new().with_sequence("chr1", "ACATGA"));

        let contexts: Vec<String> = calls
            .iter()
            .map(|c| resolver.resolve(c).unwrap().to_string())
            .collect();
        // [1,4) "CAT" forward; [1,4) "CAT" reversed and complemented
        assert_eq!(contexts, vec!["CAT", "ATG"]);
    }
}
