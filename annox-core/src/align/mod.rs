//! Alignment string codec
//!
//! Parses the gap/alignment string dialects found in annotation sources
//! (exonerate CIGAR, Ensembl CIGAR, BAM CIGAR, exonerate VULGAR and GFF3 `Gap`)
//! into one canonical operator list, renders that list back out in any
//! dialect, and projects it onto reference/match coordinates as match blocks.

pub mod blocks;

pub use blocks::{
    blocks_to_canonical, is_perfect, project, sort_blocks, string_to_blocks, AlignBlock,
    AlignFrame, BoundaryType,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while decoding or encoding alignment strings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlignError {
    #[error("Empty alignment string")]
    Empty,

    #[error("Unexpected {found:?} at position {position} in {format} string")]
    UnexpectedToken {
        format: AlignFormat,
        position: usize,
        found: String,
    },

    #[error("Operator '{op}' at position {position} has no length")]
    MissingLength { op: char, position: usize },

    #[error("Invalid length {0:?}")]
    InvalidLength(String),

    #[error("Operator {op:?} cannot be used with {format}")]
    UnsupportedOperator { format: AlignFormat, op: Operator },

    #[error("Hard clipping is not supported")]
    HardClip,

    #[error("Alignment string contains no match operators")]
    NoBlocks,

    #[error("Unknown alignment format: {0}")]
    UnknownFormat(String),

    #[error("Alignment string must start and end with a match, found {found:?} at operator {index}")]
    UnanchoredEnd { index: usize, found: Operator },
}

pub type AlignResult<T> = Result<T, AlignError>;

/// Alignment string dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignFormat {
    /// `M 10 D 2 M 5`
    ExonerateCigar,
    /// `10M2D5M`, the count may be omitted when it is 1
    EnsemblCigar,
    /// `10M2N5M` with the SAM operator set
    BamCigar,
    /// `M 10 10 G 0 2 M 5 5`
    ExonerateVulgar,
    /// `M10 D2 M5`
    Gff3Gap,
}

impl AlignFormat {
    pub const ALL: [AlignFormat; 5] = [
        AlignFormat::ExonerateCigar,
        AlignFormat::EnsemblCigar,
        AlignFormat::BamCigar,
        AlignFormat::ExonerateVulgar,
        AlignFormat::Gff3Gap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AlignFormat::ExonerateCigar => "exonerate-cigar",
            AlignFormat::EnsemblCigar => "ensembl-cigar",
            AlignFormat::BamCigar => "bam-cigar",
            AlignFormat::ExonerateVulgar => "exonerate-vulgar",
            AlignFormat::Gff3Gap => "gff3-gap",
        }
    }

    /// Operators a dialect may carry, in canonical form.
    fn allows(self, op: Operator) -> bool {
        use Operator::*;
        match self {
            AlignFormat::ExonerateCigar | AlignFormat::EnsemblCigar => {
                matches!(op, Match | Insertion | Deletion)
            }
            AlignFormat::BamCigar => matches!(op, Match | Insertion | Deletion | Intron),
            AlignFormat::Gff3Gap => {
                matches!(op, Match | Insertion | Deletion | FrameShift | ReverseFrameShift)
            }
            AlignFormat::ExonerateVulgar => !matches!(op, Deletion | Insertion | ReverseFrameShift),
        }
    }
}

impl fmt::Display for AlignFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlignFormat {
    type Err = AlignError;

    fn from_str(s: &str) -> AlignResult<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        AlignFormat::ALL
            .into_iter()
            .find(|format| format.name() == wanted)
            .ok_or_else(|| AlignError::UnknownFormat(s.to_string()))
    }
}

/// Canonical alignment operators.
///
/// The dialects reuse letters with different meanings (VULGAR `I` is an
/// intron, CIGAR `I` an insertion), so parsing maps letters onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Match,
    /// Bases present in the match sequence only
    Insertion,
    /// Bases present in the reference only
    Deletion,
    Intron,
    /// VULGAR gap consuming both sequences
    Gap,
    Codon,
    NonEquivalenced,
    Splice5,
    Splice3,
    SplitCodon,
    FrameShift,
    ReverseFrameShift,
}

/// One operator with its length. `ref_length` is only carried by VULGAR,
/// which gives query and target lengths separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignOp {
    pub op: Operator,
    pub length: u32,
    pub ref_length: Option<u32>,
}

impl AlignOp {
    pub fn new(op: Operator, length: u32) -> Self {
        Self {
            op,
            length,
            ref_length: None,
        }
    }

    pub fn with_ref_length(op: Operator, length: u32, ref_length: u32) -> Self {
        Self {
            op,
            length,
            ref_length: Some(ref_length),
        }
    }

    /// Bases consumed on the match (query) sequence.
    pub fn query_len(&self) -> u32 {
        match self.op {
            Operator::Deletion | Operator::Intron if self.ref_length.is_none() => 0,
            _ => self.length,
        }
    }

    /// Bases consumed on the reference sequence.
    pub fn reference_len(&self) -> u32 {
        match (self.op, self.ref_length) {
            (_, Some(len)) => len,
            (Operator::Insertion, None) => 0,
            (_, None) => self.length,
        }
    }
}

/// A dialect-independent operator list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canonical {
    pub source: AlignFormat,
    pub ops: Vec<AlignOp>,
}

impl Canonical {
    /// Parses `input` in the given dialect.
    pub fn parse(input: &str, format: AlignFormat) -> AlignResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AlignError::Empty);
        }
        let ops = match format {
            AlignFormat::ExonerateCigar => parse_exonerate_cigar(trimmed)?,
            AlignFormat::EnsemblCigar => parse_compact_cigar(trimmed, format)?,
            AlignFormat::BamCigar => parse_compact_cigar(trimmed, format)?,
            AlignFormat::ExonerateVulgar => parse_vulgar(trimmed)?,
            AlignFormat::Gff3Gap => parse_gff3_gap(trimmed)?,
        };
        check_anchored(&ops)?;
        log::trace!("{} {:?} -> {} operators", format, input, ops.len());
        Ok(Self {
            source: format,
            ops,
        })
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Renders the operator list in `format`.
    pub fn to_format(&self, format: AlignFormat) -> AlignResult<String> {
        let ops = self.ops_for(format)?;
        let mut out = String::new();
        for (i, op) in ops.iter().enumerate() {
            let letter = op_letter(format, op.op)
                .ok_or(AlignError::UnsupportedOperator { format, op: op.op })?;
            match format {
                AlignFormat::ExonerateCigar => {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&format!("{} {}", letter, op.length));
                }
                AlignFormat::EnsemblCigar | AlignFormat::BamCigar => {
                    out.push_str(&format!("{}{}", op.length, letter));
                }
                AlignFormat::Gff3Gap => {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&format!("{}{}", letter, op.length));
                }
                AlignFormat::ExonerateVulgar => {
                    if i > 0 {
                        out.push(' ');
                    }
                    let (query, target) = vulgar_lengths(op);
                    out.push_str(&format!("{} {} {}", letter, query, target));
                }
            }
        }
        Ok(out)
    }

    /// Rewrites operators that only exist in another dialect family.
    fn ops_for(&self, format: AlignFormat) -> AlignResult<Vec<AlignOp>> {
        let mut ops = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let converted = match (format, op.op) {
                (AlignFormat::ExonerateVulgar, Operator::Deletion) => {
                    AlignOp::with_ref_length(Operator::Gap, 0, op.length)
                }
                (AlignFormat::ExonerateVulgar, Operator::Insertion) => {
                    AlignOp::with_ref_length(Operator::Gap, op.length, 0)
                }
                (AlignFormat::ExonerateVulgar, _) => match op.ref_length {
                    Some(_) => *op,
                    None => {
                        let (query, target) = vulgar_lengths(op);
                        AlignOp::with_ref_length(op.op, query, target)
                    }
                },
                (_, Operator::Gap) => match (op.length, op.reference_len()) {
                    (q, 0) => AlignOp::new(Operator::Insertion, q),
                    (0, t) => AlignOp::new(Operator::Deletion, t),
                    _ => {
                        return Err(AlignError::UnsupportedOperator {
                            format,
                            op: op.op,
                        })
                    }
                },
                (_, Operator::Intron) if op.ref_length.is_some() => {
                    AlignOp::new(Operator::Intron, op.reference_len())
                }
                (_, Operator::Match) => match op.ref_length {
                    Some(t) if t != op.length => {
                        return Err(AlignError::UnsupportedOperator {
                            format,
                            op: op.op,
                        })
                    }
                    _ => AlignOp::new(Operator::Match, op.length),
                },
                _ => *op,
            };
            if !format.allows(converted.op) {
                return Err(AlignError::UnsupportedOperator {
                    format,
                    op: converted.op,
                });
            }
            ops.push(converted);
        }
        Ok(ops)
    }
}

/// The first and last operators must both be matches.
fn check_anchored(ops: &[AlignOp]) -> AlignResult<()> {
    let Some(first) = ops.first() else {
        return Err(AlignError::Empty);
    };
    if first.op != Operator::Match {
        return Err(AlignError::UnanchoredEnd {
            index: 0,
            found: first.op,
        });
    }
    match ops.last() {
        Some(last) if last.op != Operator::Match => Err(AlignError::UnanchoredEnd {
            index: ops.len() - 1,
            found: last.op,
        }),
        _ => Ok(()),
    }
}

/// Parses `input` in `format`; shorthand for [`Canonical::parse`].
pub fn canonicalize(input: &str, format: AlignFormat) -> AlignResult<Canonical> {
    Canonical::parse(input, format)
}

fn op_letter(format: AlignFormat, op: Operator) -> Option<char> {
    use Operator::*;
    let letter = match (format, op) {
        (_, Match) => 'M',
        (AlignFormat::ExonerateVulgar, Intron) => 'I',
        (AlignFormat::ExonerateVulgar, Gap) => 'G',
        (AlignFormat::ExonerateVulgar, Codon) => 'C',
        (AlignFormat::ExonerateVulgar, NonEquivalenced) => 'N',
        (AlignFormat::ExonerateVulgar, Splice5) => '5',
        (AlignFormat::ExonerateVulgar, Splice3) => '3',
        (AlignFormat::ExonerateVulgar, SplitCodon) => 'S',
        (AlignFormat::ExonerateVulgar, FrameShift) => 'F',
        (AlignFormat::ExonerateVulgar, _) => return None,
        (_, Insertion) => 'I',
        (_, Deletion) => 'D',
        (AlignFormat::BamCigar, Intron) => 'N',
        (AlignFormat::Gff3Gap, FrameShift) => 'F',
        (AlignFormat::Gff3Gap, ReverseFrameShift) => 'R',
        _ => return None,
    };
    Some(letter)
}

fn vulgar_lengths(op: &AlignOp) -> (u32, u32) {
    match op.ref_length {
        Some(target) => (op.length, target),
        None => match op.op {
            Operator::Intron | Operator::Splice5 | Operator::Splice3 => (0, op.length),
            _ => (op.length, op.length),
        },
    }
}

/// Whitespace separated tokens with their byte offsets.
fn tokens(input: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in input.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, &input[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &input[s..]));
    }
    out
}

fn parse_length(text: &str) -> AlignResult<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AlignError::InvalidLength(text.to_string()));
    }
    text.parse()
        .map_err(|_| AlignError::InvalidLength(text.to_string()))
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn unexpected(format: AlignFormat, position: usize, found: &str) -> AlignError {
    AlignError::UnexpectedToken {
        format,
        position,
        found: found.to_string(),
    }
}

/// `OP LEN` pairs, operators M I D.
fn parse_exonerate_cigar(input: &str) -> AlignResult<Vec<AlignOp>> {
    let format = AlignFormat::ExonerateCigar;
    let toks = tokens(input);
    let mut ops = Vec::with_capacity(toks.len() / 2);
    let mut iter = toks.into_iter();
    while let Some((pos, tok)) = iter.next() {
        let op = match single_char(tok) {
            Some('M') => Operator::Match,
            Some('I') => Operator::Insertion,
            Some('D') => Operator::Deletion,
            _ => return Err(unexpected(format, pos, tok)),
        };
        let (_, len_tok) = iter.next().ok_or(AlignError::MissingLength {
            op: tok.chars().next().unwrap_or('?'),
            position: pos,
        })?;
        ops.push(AlignOp::new(op, parse_length(len_tok)?));
    }
    Ok(ops)
}

/// `[LEN]OP` runs without separators; Ensembl and BAM differ in operator set.
fn parse_compact_cigar(input: &str, format: AlignFormat) -> AlignResult<Vec<AlignOp>> {
    let mut ops = Vec::new();
    let mut digits_start: Option<usize> = None;
    for (pos, c) in input.char_indices() {
        if c.is_ascii_digit() {
            digits_start.get_or_insert(pos);
            continue;
        }
        let length = match digits_start.take() {
            Some(start) => parse_length(&input[start..pos])?,
            None => 1,
        };
        let op = match (format, c) {
            (_, 'M') => Some(Operator::Match),
            (_, 'I') => Some(Operator::Insertion),
            (_, 'D') => Some(Operator::Deletion),
            (AlignFormat::BamCigar, 'N') => Some(Operator::Intron),
            (AlignFormat::BamCigar, 'X') | (AlignFormat::BamCigar, '=') => Some(Operator::Match),
            (AlignFormat::BamCigar, 'S') | (AlignFormat::BamCigar, 'P') => None,
            (AlignFormat::BamCigar, 'H') => return Err(AlignError::HardClip),
            _ => return Err(unexpected(format, pos, &c.to_string())),
        };
        if let Some(op) = op {
            ops.push(AlignOp::new(op, length));
        }
    }
    if let Some(start) = digits_start {
        return Err(unexpected(format, start, &input[start..]));
    }
    Ok(ops)
}

/// `OPLEN` tokens separated by spaces, operators M I D F R.
fn parse_gff3_gap(input: &str) -> AlignResult<Vec<AlignOp>> {
    let format = AlignFormat::Gff3Gap;
    let mut ops = Vec::new();
    for (pos, tok) in tokens(input) {
        let mut chars = tok.chars();
        let letter = chars.next().unwrap_or(' ');
        let op = match letter {
            'M' => Operator::Match,
            'I' => Operator::Insertion,
            'D' => Operator::Deletion,
            'F' => Operator::FrameShift,
            'R' => Operator::ReverseFrameShift,
            _ => return Err(unexpected(format, pos, tok)),
        };
        let rest = chars.as_str();
        if rest.is_empty() {
            return Err(AlignError::MissingLength {
                op: letter,
                position: pos,
            });
        }
        ops.push(AlignOp::new(op, parse_length(rest)?));
    }
    Ok(ops)
}

/// `OP QLEN TLEN` triples.
fn parse_vulgar(input: &str) -> AlignResult<Vec<AlignOp>> {
    let format = AlignFormat::ExonerateVulgar;
    let toks = tokens(input);
    let mut ops = Vec::with_capacity(toks.len() / 3);
    let mut iter = toks.into_iter();
    while let Some((pos, tok)) = iter.next() {
        let op = match single_char(tok) {
            Some('M') => Operator::Match,
            Some('C') => Operator::Codon,
            Some('G') => Operator::Gap,
            Some('N') => Operator::NonEquivalenced,
            Some('5') => Operator::Splice5,
            Some('3') => Operator::Splice3,
            Some('I') => Operator::Intron,
            Some('S') => Operator::SplitCodon,
            Some('F') => Operator::FrameShift,
            _ => return Err(unexpected(format, pos, tok)),
        };
        let missing = || AlignError::MissingLength {
            op: tok.chars().next().unwrap_or('?'),
            position: pos,
        };
        let (_, query) = iter.next().ok_or_else(missing)?;
        let (_, target) = iter.next().ok_or_else(missing)?;
        ops.push(AlignOp::with_ref_length(
            op,
            parse_length(query)?,
            parse_length(target)?,
        ));
    }
    Ok(ops)
}
