//! Shared streaming utilities for the conversion commands.
//!
//! This module provides the pieces every command is built from:
//! - Zero-allocation field parsing
//! - Ordering validation
//! - Chromosome-at-a-time block cursor
//! - Efficient output formatting
//!
//! All commands hold O(1) calls in memory per chromosome, independent of
//! input size.

pub mod blocks;
pub mod buffers;
pub mod output;
pub mod parsing;
pub mod validation;

pub use blocks::{CallStream, ChromosomeCalls};
pub use output::{fmt_percent, BedWriter};
pub use parsing::{parse_percent, parse_u64_fast, should_skip_line, split_fields};
pub use validation::OrderingValidator;
