//! Buffer size constants for streaming operations.
//!
//! methylKit call files routinely exceed 20 GB; every stage reads and writes
//! through fixed-size buffers so memory stays flat regardless of file size.

/// Default output buffer size (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Default input buffer size (256 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Default line buffer capacity (1 KB).
/// Sufficient for any methylKit row.
pub const DEFAULT_LINE_BUFFER: usize = 1024;
