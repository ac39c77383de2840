//! Projection of canonical operators onto sequence coordinates.

use super::{AlignError, AlignFormat, AlignOp, AlignResult, Canonical, Operator};
use crate::types::{Coord, Span, Strand};
use serde::{Deserialize, Serialize};

/// What sits on either side of a match block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoundaryType {
    /// Start or end of the whole alignment
    #[default]
    Edge,
    Intron,
    Deletion,
    /// Butts directly onto another match or an insertion
    Match,
}

/// One ungapped match between reference (`t`) and match (`q`) coordinates.
///
/// Reference coordinates are always ascending. Query coordinates descend
/// when the match sequence is on the reverse strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignBlock {
    pub t1: Coord,
    pub t2: Coord,
    pub q1: Coord,
    pub q2: Coord,
    pub t_strand: Strand,
    pub q_strand: Strand,
    pub start_boundary: BoundaryType,
    pub end_boundary: BoundaryType,
}

impl AlignBlock {
    pub fn target(&self) -> Span {
        Span::new(self.t1, self.t2)
    }

    /// Query span with ascending ends regardless of strand.
    pub fn query(&self) -> Span {
        Span::new(self.q1, self.q2)
    }
}

/// Where an alignment sits on its two sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignFrame {
    pub ref_strand: Strand,
    pub ref_span: Span,
    pub match_strand: Strand,
    pub match_span: Span,
}

impl AlignFrame {
    pub fn new(ref_strand: Strand, ref_span: Span, match_strand: Strand, match_span: Span) -> Self {
        Self {
            ref_strand,
            ref_span,
            match_strand,
            match_span,
        }
    }
}

struct Cursor {
    pos: Coord,
    reverse: bool,
}

impl Cursor {
    fn new(strand: Strand, span: Span) -> Self {
        let reverse = strand.is_reverse();
        Self {
            pos: if reverse { span.x2 } else { span.x1 },
            reverse,
        }
    }

    fn advance(&mut self, len: u32) {
        if self.reverse {
            self.pos -= Coord::from(len);
        } else {
            self.pos += Coord::from(len);
        }
    }

    /// Consumes `len` bases and returns the `(first, last)` positions walked.
    fn take(&mut self, len: u32) -> (Coord, Coord) {
        let first = self.pos;
        self.advance(len);
        let last = if self.reverse { self.pos + 1 } else { self.pos - 1 };
        (first, last)
    }
}

/// Projects a canonical operator list onto the sequences described by `frame`.
///
/// Only match operators produce blocks; every other operator moves one or
/// both cursors and decides the boundary type of the blocks around it.
pub fn project(canon: &Canonical, frame: &AlignFrame) -> AlignResult<Vec<AlignBlock>> {
    let mut reference = Cursor::new(frame.ref_strand, frame.ref_span);
    let mut query = Cursor::new(frame.match_strand, frame.match_span);
    let mut boundary = BoundaryType::Edge;
    let mut blocks: Vec<AlignBlock> = Vec::new();
    let mut prev_was_match = false;

    for op in &canon.ops {
        match op.op {
            Operator::Intron => {
                reference.advance(op.reference_len());
                boundary = BoundaryType::Intron;
            }
            Operator::Deletion => {
                reference.advance(op.reference_len());
                boundary = BoundaryType::Deletion;
            }
            Operator::Gap => {
                reference.advance(op.reference_len());
                query.advance(op.query_len());
                boundary = BoundaryType::Deletion;
            }
            Operator::Insertion => {
                query.advance(op.query_len());
                boundary = BoundaryType::Match;
            }
            Operator::Match => {
                let (r_first, r_last) = reference.take(op.reference_len());
                let (q1, q2) = query.take(op.query_len());
                let (t1, t2) = if r_first <= r_last {
                    (r_first, r_last)
                } else {
                    (r_last, r_first)
                };
                if prev_was_match {
                    if let Some(prev) = blocks.last_mut() {
                        prev.end_boundary = BoundaryType::Match;
                    }
                }
                blocks.push(AlignBlock {
                    t1,
                    t2,
                    q1,
                    q2,
                    t_strand: frame.ref_strand,
                    q_strand: frame.match_strand,
                    start_boundary: boundary,
                    end_boundary: BoundaryType::Edge,
                });
                boundary = BoundaryType::Match;
                prev_was_match = true;
                continue;
            }
            other => {
                return Err(AlignError::UnsupportedOperator {
                    format: canon.source,
                    op: other,
                })
            }
        }
        if prev_was_match {
            if let Some(prev) = blocks.last_mut() {
                prev.end_boundary = boundary;
            }
        }
        prev_was_match = false;
    }

    if blocks.is_empty() {
        return Err(AlignError::NoBlocks);
    }
    Ok(blocks)
}

/// Parses `input` and projects it in one step.
pub fn string_to_blocks(
    input: &str,
    format: AlignFormat,
    frame: &AlignFrame,
) -> AlignResult<Vec<AlignBlock>> {
    let canon = Canonical::parse(input, format)?;
    let blocks = project(&canon, frame)?;
    log::debug!(
        "{} string projected to {} blocks on {}",
        format,
        blocks.len(),
        frame.ref_span
    );
    Ok(blocks)
}

/// Orders blocks by reference start.
pub fn sort_blocks(blocks: &mut [AlignBlock]) {
    blocks.sort_by_key(|block| (block.t1, block.t2));
}

/// True when no two consecutive blocks leave more than `align_error`
/// query bases unaccounted for. Blocks are expected sorted by reference.
pub fn is_perfect(blocks: &[AlignBlock], align_error: u32) -> bool {
    blocks.windows(2).all(|pair| {
        let prev = pair[0].query();
        let next = pair[1].query();
        let missing = if next.x1 > prev.x2 {
            next.x1 - prev.x2 - 1
        } else {
            prev.x1 - next.x2 - 1
        };
        missing <= Coord::from(align_error)
    })
}

/// Rebuilds an operator list from blocks sorted by reference coordinate.
///
/// Reference-only gaps become deletions, or introns when the block says so;
/// query-only gaps become insertions.
pub fn blocks_to_canonical(blocks: &[AlignBlock]) -> AlignResult<Canonical> {
    let first = blocks.first().ok_or(AlignError::NoBlocks)?;
    let mut ops = vec![AlignOp::new(Operator::Match, span_len(first.target())?)];

    for pair in blocks.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let ref_gap = next.t1 - prev.t2 - 1;
        let (pq, nq) = (prev.query(), next.query());
        let query_gap = if nq.x1 > pq.x2 {
            nq.x1 - pq.x2 - 1
        } else {
            pq.x1 - nq.x2 - 1
        };
        if query_gap > 0 {
            ops.push(AlignOp::new(Operator::Insertion, gap_len(query_gap)?));
        }
        if ref_gap > 0 {
            let op = if next.start_boundary == BoundaryType::Intron {
                Operator::Intron
            } else {
                Operator::Deletion
            };
            ops.push(AlignOp::new(op, gap_len(ref_gap)?));
        }
        ops.push(AlignOp::new(Operator::Match, span_len(next.target())?));
    }

    let source = if ops.iter().any(|op| op.op == Operator::Intron) {
        AlignFormat::BamCigar
    } else {
        AlignFormat::ExonerateCigar
    };
    Ok(Canonical { source, ops })
}

fn span_len(span: Span) -> AlignResult<u32> {
    gap_len(span.len())
}

fn gap_len(len: Coord) -> AlignResult<u32> {
    u32::try_from(len).map_err(|_| AlignError::InvalidLength(len.to_string()))
}
