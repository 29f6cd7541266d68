//! Command implementations for methbed.

pub mod cpa;
pub mod merge;
pub mod split_chrom;
pub mod to_bed;

pub use cpa::{CpaCommand, CpaStats};
pub use merge::{MergeCommand, MergeStats};
pub use split_chrom::{SplitChromCommand, SplitChromStats};
pub use to_bed::{ToBedCommand, ToBedStats, BED4_HEADER};
