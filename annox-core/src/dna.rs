//! DNA extraction
//!
//! Pulls sequence for features out of their block's DNA, applies variation
//! edits with running length deltas, and assembles spliced or CDS transcript
//! sequence. Coordinates are 1-based reference positions throughout; a
//! block's sequence starts at the block's first reference base.

use crate::graph::{Feature, Graph, GraphError, NodeId};
use crate::types::{Coord, Level, Span, Strand};
use bio::alphabets::dna;
use thiserror::Error;

/// Errors that can occur while extracting DNA
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DnaError {
    #[error("Node is not inside a block")]
    NoBlock,

    #[error("Block has no DNA")]
    NoSequence,

    #[error("{span} does not overlap block {block}")]
    OutOfBlock { span: Span, block: Span },

    #[error("Bases {offset}..{end} requested from a sequence of {len}")]
    SequenceTooShort { offset: i64, end: i64, len: usize },

    #[error("Invalid variation string {0:?}")]
    InvalidVariation(String),

    #[error("Variation {edit:?} at {span} covers {actual} bases, expected {expected}")]
    VariationLengthMismatch {
        edit: String,
        span: Span,
        expected: i64,
        actual: i64,
    },

    #[error("Feature is not a transcript")]
    NotATranscript,

    #[error("Transcript has no CDS")]
    NoCds,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type DnaResult<T> = Result<T, DnaError>;

/// Reverse complement, case preserving and IUPAC aware.
pub fn revcomp(seq: &str) -> String {
    String::from_utf8_lossy(&dna::revcomp(seq.as_bytes())).into_owned()
}

/// Upper-cases the nucleotide letters in `seq[range]`.
fn upcase_range(seq: &mut String, start: usize, len: usize) {
    let end = (start + len).min(seq.len());
    if start >= end {
        return;
    }
    let upper: String = seq[start..end]
        .chars()
        .map(|c| match c {
            'a' | 'c' | 'g' | 't' => c.to_ascii_uppercase(),
            _ => c,
        })
        .collect();
    seq.replace_range(start..end, &upper);
}

fn slice(seq: &str, offset: i64, len: i64) -> DnaResult<&str> {
    let end = offset + len;
    if offset < 0 || len < 0 || end as usize > seq.len() {
        return Err(DnaError::SequenceTooShort {
            offset,
            end,
            len: seq.len(),
        });
    }
    Ok(&seq[offset as usize..end as usize])
}

fn block_sequence(graph: &Graph, block: NodeId) -> DnaResult<(Span, &str)> {
    let data = graph.block(block)?;
    match &data.sequence {
        Some(seq) if data.has_dna() => Ok((data.span, seq.sequence.as_str())),
        _ => Err(DnaError::NoSequence),
    }
}

fn containing_block(graph: &Graph, node: NodeId) -> DnaResult<NodeId> {
    graph.ancestor_at(node, Level::Block).ok_or(DnaError::NoBlock)
}

pub fn block_has_dna(graph: &Graph, block: NodeId) -> bool {
    graph.block(block).map(|b| b.has_dna()).unwrap_or(false)
}

/// DNA for `span` from the block containing `node`.
///
/// The span is clamped to the block first; a span with no overlap, or a
/// block sequence too short for the clamped span, is an error.
pub fn dna_in_block(graph: &Graph, node: NodeId, span: Span, reverse: bool) -> DnaResult<String> {
    let block = containing_block(graph, node)?;
    let (block_span, seq) = block_sequence(graph, block)?;
    let wanted = span.clamp_to(&block_span).ok_or(DnaError::OutOfBlock {
        span,
        block: block_span,
    })?;
    let dna = slice(seq, wanted.x1 - block_span.x1, wanted.len())?;
    Ok(if reverse { revcomp(dna) } else { dna.to_string() })
}

/// A feature's own DNA, reverse complemented for reverse-strand features.
pub fn feature_dna(graph: &Graph, feature: NodeId) -> DnaResult<String> {
    let data = graph.feature(feature)?;
    dna_in_block(graph, feature, data.span(), data.strand == Strand::Reverse)
}

/// A parsed `old>new` variation string. An absent side is an insertion or
/// deletion; `-` reads as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationEdit {
    pub old: Option<String>,
    pub new: Option<String>,
}

impl VariationEdit {
    pub fn parse(text: &str) -> DnaResult<Self> {
        let (old, new) = text
            .trim()
            .split_once('>')
            .ok_or_else(|| DnaError::InvalidVariation(text.to_string()))?;
        let side = |s: &str| -> DnaResult<Option<String>> {
            let s = s.trim();
            if s.is_empty() || s == "-" {
                return Ok(None);
            }
            if !s.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(DnaError::InvalidVariation(text.to_string()));
            }
            Ok(Some(s.to_string()))
        };
        Ok(Self {
            old: side(old)?,
            new: side(new)?,
        })
    }

    pub fn old_len(&self) -> i64 {
        self.old.as_ref().map(|s| s.len() as i64).unwrap_or(0)
    }

    pub fn new_len(&self) -> i64 {
        self.new.as_ref().map(|s| s.len() as i64).unwrap_or(0)
    }

    /// Length change the edit makes.
    pub fn delta(&self) -> i64 {
        self.new_len() - self.old_len()
    }
}

fn edit_of(variation: &Feature) -> DnaResult<VariationEdit> {
    let text = variation
        .variation_str()
        .ok_or_else(|| DnaError::InvalidVariation(String::new()))?;
    VariationEdit::parse(text)
}

/// Applies one variation to `seq`, whose first base is reference position
/// `seq_start`. `total_diff` is the length change made by earlier
/// variations. Returns this variation's length change.
///
/// Insertions span the two bases either side of the insertion point;
/// deletions and substitutions must span exactly the bases they replace.
pub fn apply_variation(
    seq: &mut String,
    seq_start: Coord,
    variation: &Feature,
    total_diff: i64,
) -> DnaResult<i64> {
    let edit = edit_of(variation)?;
    let start = variation.x1 - seq_start + total_diff;
    let end = variation.x2 - seq_start + total_diff;
    let covered = end - start + 1;
    let mismatch = |expected: i64| DnaError::VariationLengthMismatch {
        edit: variation.variation_str().unwrap_or_default().to_string(),
        span: variation.span(),
        expected,
        actual: covered,
    };

    match (&edit.old, &edit.new) {
        (None, Some(new)) => {
            if covered != 2 {
                return Err(mismatch(2));
            }
            slice(seq, start, 2)?;
            seq.insert_str((start + 1) as usize, new);
        }
        (Some(_), None) => {
            if covered != edit.old_len() {
                return Err(mismatch(edit.old_len()));
            }
            slice(seq, start, covered)?;
            seq.replace_range(start as usize..(start + covered) as usize, "");
        }
        (Some(_), Some(new)) => {
            if covered != edit.old_len() {
                return Err(mismatch(edit.old_len()));
            }
            slice(seq, start, covered)?;
            seq.replace_range(start as usize..(start + covered) as usize, new);
        }
        (None, None) => {
            log::warn!("variation at {} has neither old nor new sequence", variation.span());
            return Ok(0);
        }
    }
    Ok(edit.delta())
}

/// Result of applying a list of variations.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VariationOutcome {
    /// Span and length change of every variation that was applied
    pub applied: Vec<(Span, i64)>,
    pub skipped: Vec<DnaError>,
}

impl VariationOutcome {
    pub fn total_diff(&self) -> i64 {
        self.applied.iter().map(|(_, diff)| diff).sum()
    }

    /// Summed change of applied variations lying wholly inside `span`.
    pub fn diff_within(&self, span: Span) -> i64 {
        self.applied
            .iter()
            .filter(|(v, _)| span.covers(v))
            .map(|(_, diff)| diff)
            .sum()
    }

    /// Summed change of applied variations that start before `pos`
    /// and do not reach past it.
    pub fn diff_before(&self, pos: Coord) -> i64 {
        self.applied
            .iter()
            .filter(|(v, _)| v.x1 < pos && v.x2 <= pos)
            .map(|(_, diff)| diff)
            .sum()
    }
}

/// Applies `variations`, in coordinate order, to `seq` covering `seq_span`.
/// Variations touching neither end of the span are ignored; ones that
/// fail are logged and reported in the outcome.
pub fn apply_variations(seq: &mut String, seq_span: Span, variations: &[Feature]) -> VariationOutcome {
    let mut outcome = VariationOutcome::default();
    let mut total_diff = 0;
    for variation in variations {
        if !seq_span.contains(variation.x1) && !seq_span.contains(variation.x2) {
            continue;
        }
        match apply_variation(seq, seq_span.x1, variation, total_diff) {
            Ok(diff) => {
                total_diff += diff;
                outcome.applied.push((variation.span(), diff));
            }
            Err(err) => {
                log::warn!("skipping variation at {}: {}", variation.span(), err);
                outcome.skipped.push(err);
            }
        }
    }
    outcome
}

/// Summed length change of the variations lying wholly inside `span`.
pub fn variation_diff(span: Span, variations: &[Feature]) -> i64 {
    variations
        .iter()
        .filter(|v| span.covers(&v.span()))
        .filter_map(|v| edit_of(v).ok())
        .map(|edit| edit.delta())
        .sum()
}

/// Transcript sequence plus anything that had to be left out.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TranscriptDna {
    pub sequence: String,
    pub skipped: Vec<DnaError>,
}

/// DNA for a transcript with its variations applied.
///
/// Unspliced output covers the whole transcript with exons upper-cased.
/// Spliced output concatenates the exons, clamped to the CDS when
/// `cds_only` is set. Reverse-strand transcripts come back reverse
/// complemented.
pub fn transcript_dna(
    graph: &Graph,
    transcript: NodeId,
    spliced: bool,
    cds_only: bool,
) -> DnaResult<TranscriptDna> {
    let feature = graph.feature(transcript)?;
    let data = feature.transcript().ok_or(DnaError::NotATranscript)?;
    if cds_only && data.cds.is_none() {
        return Err(DnaError::NoCds);
    }

    let block = containing_block(graph, transcript)?;
    let (block_span, raw) = block_sequence(graph, block)?;
    let bounds = feature.span().clamp_to(&block_span).ok_or(DnaError::OutOfBlock {
        span: feature.span(),
        block: block_span,
    })?;

    let mut seq = raw.to_string();
    let applied = apply_variations(&mut seq, block_span, &data.variations);
    let mut skipped = applied.skipped.clone();
    let locate = |span: Span| {
        let offset = span.x1 - block_span.x1 + applied.diff_before(span.x1);
        let len = span.len() + applied.diff_within(span);
        (offset, len)
    };

    let mut exons = data.exons.clone();
    exons.sort_by_key(|exon| exon.x1);

    let mut out = if spliced && !exons.is_empty() {
        let mut wanted = bounds;
        if cds_only {
            let cds = data.cds.ok_or(DnaError::NoCds)?;
            wanted = wanted.clamp_to(&cds).ok_or(DnaError::OutOfBlock {
                span: cds,
                block: block_span,
            })?;
        }
        let mut out = String::new();
        for exon in &exons {
            let Some(part) = exon.clamp_to(&wanted) else {
                continue;
            };
            let (offset, len) = locate(part);
            match slice(&seq, offset, len) {
                Ok(bases) => out.push_str(bases),
                Err(err) => {
                    log::warn!("exon {} skipped: {}", part, err);
                    skipped.push(err);
                }
            }
        }
        out
    } else {
        let (offset, len) = locate(bounds);
        let mut out = slice(&seq, offset, len)?.to_string();
        if exons.is_empty() {
            out.make_ascii_uppercase();
        }
        for exon in &exons {
            if let Some(part) = exon.clamp_to(&bounds) {
                let (exon_offset, exon_len) = locate(part);
                if exon_offset >= offset {
                    upcase_range(&mut out, (exon_offset - offset) as usize, exon_len.max(0) as usize);
                }
            }
        }
        out
    };

    if feature.strand == Strand::Reverse {
        out = revcomp(&out);
    }
    Ok(TranscriptDna {
        sequence: out,
        skipped,
    })
}
