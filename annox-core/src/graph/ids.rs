//! Unique-id strings for graph nodes.
//!
//! Two nodes with the same unique id are the same object as far as lookup and
//! merging go, so the formats here are stable.

use crate::types::{Coord, FeatureMode, Span, Strand};

/// Canonical form of a featureset or style name.
pub fn canonical_name(name: &str) -> String {
    name.to_ascii_lowercase()
}

pub fn featureset_id(name: &str) -> String {
    canonical_name(name)
}

/// `name_'strand'_start.end`, with `_qstart.qend` appended for alignments.
/// Only the name part is lower-cased.
pub fn feature_unique_name(
    mode: FeatureMode,
    name: &str,
    strand: Strand,
    start: Coord,
    end: Coord,
    query: Option<Span>,
) -> String {
    let mut out = format!(
        "{}_'{}'_{}.{}",
        name.to_ascii_lowercase(),
        char::from(strand),
        start,
        end
    );
    if mode == FeatureMode::Alignment {
        let query = query.unwrap_or_default();
        out.push_str(&format!("_{}.{}", query.x1, query.x2));
    }
    out
}

fn block_strand(strand: Strand) -> char {
    if strand == Strand::Forward {
        '+'
    } else {
        '-'
    }
}

/// `refstart.refend.+_nonstart.nonend.-`
pub fn block_unique_name(
    reference: Span,
    ref_strand: Strand,
    non_reference: Span,
    non_strand: Strand,
) -> String {
    format!(
        "{}.{}.{}_{}.{}.{}",
        reference.x1,
        reference.x2,
        block_strand(ref_strand),
        non_reference.x1,
        non_reference.x2,
        block_strand(non_strand)
    )
}

/// Parsed form of a block id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockKey {
    pub reference: Span,
    pub ref_strand: Strand,
    pub non_reference: Span,
    pub non_strand: Strand,
}

/// Inverse of [`block_unique_name`].
pub fn decode_block_id(id: &str) -> Option<BlockKey> {
    let (left, right) = id.split_once('_')?;
    let (reference, ref_strand) = decode_half(left)?;
    let (non_reference, non_strand) = decode_half(right)?;
    Some(BlockKey {
        reference,
        ref_strand,
        non_reference,
        non_strand,
    })
}

fn decode_half(half: &str) -> Option<(Span, Strand)> {
    let mut parts = half.splitn(3, '.');
    let start: Coord = parts.next()?.parse().ok()?;
    let end: Coord = parts.next()?.parse().ok()?;
    let strand = match parts.next()? {
        "+" => Strand::Forward,
        "-" => Strand::Reverse,
        _ => return None,
    };
    Some((Span { x1: start, x2: end }, strand))
}
