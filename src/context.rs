//! Strand-aware trinucleotide context resolution and CpA selection.
//!
//! A call's context is the three reference bases starting at its cytosine,
//! read 5' to 3' on the call's own strand:
//!
//! - Forward call at 1-based `p`: bases `[p-1, p+2)`, used verbatim.
//! - Reverse call at 1-based `p`: bases `[p-3, p)`, reversed and complemented
//!   so the cytosine (the last forward base) comes first.

use crate::call::{MethylationCall, Strand};
use crate::reference::ReferenceProvider;
use std::fmt;
use thiserror::Error;

/// Column names of a CpA context row.
pub const CONTEXT_HEADER: [&str; 8] = [
    "chr",
    "start",
    "end",
    "strand",
    "coverage",
    "freqC",
    "freqT",
    "nucleotide",
];

/// Per-call context failures. The call is excluded; processing continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("cannot fetch {chrom}:{start}-{end} for {strand} strand call: {reason}")]
    SequenceRange {
        chrom: String,
        start: i64,
        end: i64,
        strand: Strand,
        reason: String,
    },

    #[error("base '{base}' near {chrom}:{position} ({strand} strand) has no complement")]
    UnmappableBase {
        chrom: String,
        position: u64,
        strand: Strand,
        base: char,
    },
}

/// Three bases oriented 5' to 3' on the call's strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Trinucleotide([u8; 3]);

impl Trinucleotide {
    pub fn new(bases: [u8; 3]) -> Self {
        Self(bases)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Upper-cased copy, for tallying contexts regardless of soft-masking.
    pub fn to_ascii_uppercase(self) -> Self {
        Self(self.0.map(|b| b.to_ascii_uppercase()))
    }

    /// True if the context starts with `CA`, ignoring case.
    #[inline]
    pub fn is_cpa(&self) -> bool {
        self.0[0].eq_ignore_ascii_case(&b'C') && self.0[1].eq_ignore_ascii_case(&b'A')
    }
}

impl fmt::Display for Trinucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

/// Watson-Crick complement of one base, preserving case.
///
/// Returns None for anything outside `ACGTacgt`.
#[inline]
pub fn complement(base: u8) -> Option<u8> {
    match base {
        b'A' => Some(b'T'),
        b'T' => Some(b'A'),
        b'C' => Some(b'G'),
        b'G' => Some(b'C'),
        b'a' => Some(b't'),
        b't' => Some(b'a'),
        b'c' => Some(b'g'),
        b'g' => Some(b'c'),
        _ => None,
    }
}

/// Reverse complement of a three-base window.
///
/// On failure returns the first base (in reversed order) without a
/// complement.
pub fn reverse_complement(window: [u8; 3]) -> Result<[u8; 3], u8> {
    let mut out = [0u8; 3];
    for (slot, &base) in out.iter_mut().zip(window.iter().rev()) {
        *slot = complement(base).ok_or(base)?;
    }
    Ok(out)
}

/// Zero-based half-open reference window holding a call's context.
///
/// Returns the signed bounds; a negative start means the window runs off the
/// beginning of the chromosome.
#[inline]
pub fn context_window(strand: Strand, position: u64) -> (i64, i64) {
    let p = position as i64;
    match strand {
        Strand::Forward => (p - 1, p + 2),
        Strand::Reverse => (p - 3, p),
    }
}

/// CpA selection on a resolved context.
#[inline]
pub fn accepts(context: &Trinucleotide) -> bool {
    context.is_cpa()
}

/// Resolves contexts against a reference provider.
pub struct ContextResolver<P> {
    provider: P,
}

impl<P: ReferenceProvider> ContextResolver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Resolve the context of one call.
    pub fn resolve(&mut self, call: &MethylationCall) -> Result<Trinucleotide, ContextError> {
        let (start, end) = context_window(call.strand, call.position);
        let range_error = |reason: String| ContextError::SequenceRange {
            chrom: call.chrom.clone(),
            start,
            end,
            strand: call.strand,
            reason,
        };

        if start < 0 {
            return Err(range_error("window starts before the chromosome".to_string()));
        }

        let fetched = self
            .provider
            .fetch(&call.chrom, start as u64, end as u64)
            .map_err(|e| range_error(e.to_string()))?;
        let window: [u8; 3] = fetched
            .as_slice()
            .try_into()
            .map_err(|_| range_error(format!("expected 3 bases, got {}", fetched.len())))?;

        match call.strand {
            Strand::Forward => Ok(Trinucleotide(window)),
            Strand::Reverse => reverse_complement(window)
                .map(Trinucleotide)
                .map_err(|base| ContextError::UnmappableBase {
                    chrom: call.chrom.clone(),
                    position: call.position,
                    strand: call.strand,
                    base: base as char,
                }),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Release the resolver, handing back the provider.
    pub fn into_inner(self) -> P {
        self.provider
    }
}

/// One output row of the context-classification path.
///
/// `start`/`end` use the same numbering as merged intervals (1-based start,
/// exclusive end): the context window shifted by one.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRecord {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    pub coverage: u64,
    pub freq_c: f64,
    pub freq_t: f64,
    pub context: Trinucleotide,
}

impl ContextRecord {
    /// Build the row for a call whose context has been resolved.
    pub fn new(call: &MethylationCall, context: Trinucleotide) -> Self {
        let (start, end) = context_window(call.strand, call.position);
        Self {
            chrom: call.chrom.clone(),
            start: (start + 1) as u64,
            end: (end + 1) as u64,
            strand: call.strand,
            coverage: call.coverage,
            freq_c: call.percent_methylated,
            freq_t: call.freq_t(),
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::InMemoryReference;

    fn call(pos: u64, strand: Strand) -> MethylationCall {
        MethylationCall::new("chr1", pos, strand, 10, 50.0)
    }

    /// Reference with `bases` starting at zero-based offset `at`.
    fn reference_with(at: usize, bases: &str) -> InMemoryReference {
        let mut seq = "N".repeat(at);
        seq.push_str(bases);
        seq.push_str(&"N".repeat(10));
        InMemoryReference::new().with_sequence("chr1", seq)
    }

    #[test]
    fn test_forward_context_verbatim() {
        let mut resolver = ContextResolver::new(reference_with(49, "CAT"));
        let ctx = resolver.resolve(&call(50, Strand::Forward)).unwrap();

        assert_eq!(ctx.as_bytes(), b"CAT");
        assert!(accepts(&ctx));
    }

    #[test]
    fn test_reverse_context_reverse_complemented() {
        let mut resolver = ContextResolver::new(reference_with(47, "TGA"));
        let ctx = resolver.resolve(&call(50, Strand::Reverse)).unwrap();

        // TGA -> reversed AGT -> complemented TCA
        assert_eq!(ctx.to_string(), "TCA");
        assert!(!accepts(&ctx));
    }

    #[test]
    fn test_reverse_cpa_accepted() {
        // Forward strand ...TGG... is CCA read backwards on the reverse strand
        let mut resolver = ContextResolver::new(reference_with(47, "TGG"));
        let ctx = resolver.resolve(&call(50, Strand::Reverse)).unwrap();

        assert_eq!(ctx.as_bytes(), b"CCA");
        assert!(!accepts(&ctx));

        let mut resolver = ContextResolver::new(reference_with(47, "TTG"));
        let ctx = resolver.resolve(&call(50, Strand::Reverse)).unwrap();
        assert_eq!(ctx.as_bytes(), b"CAA");
        assert!(accepts(&ctx));
    }

    #[test]
    fn test_complement_preserves_case() {
        assert_eq!(reverse_complement(*b"tgG"), Ok(*b"Cca"));
        assert_eq!(complement(b'g'), Some(b'c'));
        assert_eq!(complement(b'G'), Some(b'C'));
        assert_eq!(complement(b'N'), None);
    }

    #[test]
    fn test_lowercase_cpa_accepted() {
        assert!(Trinucleotide::new(*b"caT").is_cpa());
        assert!(Trinucleotide::new(*b"cAg").is_cpa());
        assert!(!Trinucleotide::new(*b"ACA").is_cpa());
        assert_eq!(
            Trinucleotide::new(*b"caT").to_ascii_uppercase(),
            Trinucleotide::new(*b"CAT")
        );
    }

    #[test]
    fn test_unmappable_base() {
        let mut resolver = ContextResolver::new(reference_with(47, "TNG"));
        let err = resolver.resolve(&call(50, Strand::Reverse)).unwrap_err();

        assert_eq!(
            err,
            ContextError::UnmappableBase {
                chrom: "chr1".to_string(),
                position: 50,
                strand: Strand::Reverse,
                base: 'N',
            }
        );
    }

    #[test]
    fn test_forward_ambiguous_base_is_verbatim() {
        let mut resolver = ContextResolver::new(reference_with(9, "CNN"));
        let ctx = resolver.resolve(&call(10, Strand::Forward)).unwrap();
        assert_eq!(ctx.as_bytes(), b"CNN");
    }

    #[test]
    fn test_range_errors() {
        let mut resolver = ContextResolver::new(InMemoryReference::new().with_sequence("chr1", "CAGT"));

        // Reverse window [-1, 2) runs off the start
        assert!(matches!(
            resolver.resolve(&call(2, Strand::Reverse)),
            Err(ContextError::SequenceRange { start: -1, end: 2, .. })
        ));
        // Forward window [3, 6) runs off the end
        assert!(matches!(
            resolver.resolve(&call(4, Strand::Forward)),
            Err(ContextError::SequenceRange { start: 3, end: 6, .. })
        ));
        // Unknown chromosome
        let other = MethylationCall::new("chrUn", 2, Strand::Forward, 1, 0.0);
        assert!(matches!(
            resolver.resolve(&other),
            Err(ContextError::SequenceRange { .. })
        ));
        // In range at both ends
        assert_eq!(resolver.resolve(&call(1, Strand::Forward)).unwrap().as_bytes(), b"CAG");
        assert_eq!(resolver.resolve(&call(3, Strand::Reverse)).unwrap().as_bytes(), b"CTG");
    }

    #[test]
    fn test_context_record_coordinates() {
        let fwd = ContextRecord::new(&call(50, Strand::Forward), Trinucleotide::new(*b"CAT"));
        assert_eq!((fwd.start, fwd.end), (50, 53));
        assert_eq!(fwd.freq_t, 50.0);

        let rev = ContextRecord::new(&call(50, Strand::Reverse), Trinucleotide::new(*b"CAA"));
        assert_eq!((rev.start, rev.end), (48, 51));
    }
}
