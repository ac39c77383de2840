//! Annox Core Library
//!
//! Genome annotation model for Annox: the feature graph, the alignment
//! string codec, DNA extraction and EST masking.

pub mod types;
pub mod symbols;
pub mod graph;
pub mod align;
pub mod dna;
pub mod mask;
pub mod style;

// Re-export commonly used types and functions
pub use types::{Coord, FeatureMode, Level, SequenceKind, Span, Strand};
pub use symbols::{Symbol, SymbolTable};
pub use graph::{Feature, Graph, GraphError, GraphResult, MergeOutcome, NodeId, WalkControl};
pub use align::{
    canonicalize, is_perfect, string_to_blocks, AlignBlock, AlignError, AlignFormat, AlignFrame,
    AlignResult, BoundaryType, Canonical,
};
pub use dna::{transcript_dna, DnaError, DnaResult, TranscriptDna};
pub use mask::{mask_featuresets, mask_set_with_set, MaskError, MaskReport, MaskResult};
pub use style::{Style, StyleProvider, StyleRegistry};

/// Version information for the Annox core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
