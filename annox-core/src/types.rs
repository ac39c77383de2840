use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based, inclusive sequence coordinate.
pub type Coord = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strand {
    #[default]
    None,
    Forward,
    Reverse,
}

impl Strand {
    pub fn is_reverse(self) -> bool {
        matches!(self, Strand::Reverse)
    }
}

impl From<bool> for Strand {
    fn from(forward: bool) -> Self {
        if forward {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }
}

impl From<char> for Strand {
    fn from(c: char) -> Self {
        match c {
            '+' => Strand::Forward,
            '-' => Strand::Reverse,
            _ => Strand::None,
        }
    }
}

impl From<Strand> for char {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::None => '.',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}

/// Closed interval `[x1, x2]` on a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub x1: Coord,
    pub x2: Coord,
}

impl Span {
    /// Builds a span, swapping the ends if they arrive reversed.
    pub fn new(a: Coord, b: Coord) -> Self {
        if a <= b {
            Self { x1: a, x2: b }
        } else {
            Self { x1: b, x2: a }
        }
    }

    pub fn len(&self) -> Coord {
        self.x2 - self.x1 + 1
    }

    pub fn is_empty(&self) -> bool {
        self.x2 < self.x1
    }

    pub fn contains(&self, pos: Coord) -> bool {
        pos >= self.x1 && pos <= self.x2
    }

    pub fn covers(&self, other: &Span) -> bool {
        other.x1 >= self.x1 && other.x2 <= self.x2
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.x1 <= other.x2 && other.x1 <= self.x2
    }

    /// The part of `self` inside `bounds`, if any.
    pub fn clamp_to(&self, bounds: &Span) -> Option<Span> {
        if !self.overlaps(bounds) {
            return None;
        }
        Some(Span {
            x1: self.x1.max(bounds.x1),
            x2: self.x2.min(bounds.x2),
        })
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x1, self.x2)
    }
}

/// Depth of a node in the feature graph, root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Context,
    Alignment,
    Block,
    FeatureSet,
    Feature,
}

impl Level {
    /// The level a child of this level must have.
    pub fn child(self) -> Option<Level> {
        match self {
            Level::Context => Some(Level::Alignment),
            Level::Alignment => Some(Level::Block),
            Level::Block => Some(Level::FeatureSet),
            Level::FeatureSet => Some(Level::Feature),
            Level::Feature => None,
        }
    }

    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Context => None,
            Level::Alignment => Some(Level::Context),
            Level::Block => Some(Level::Alignment),
            Level::FeatureSet => Some(Level::Block),
            Level::Feature => Some(Level::FeatureSet),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Context => "context",
            Level::Alignment => "alignment",
            Level::Block => "block",
            Level::FeatureSet => "featureset",
            Level::Feature => "feature",
        };
        f.write_str(name)
    }
}

/// Kind of payload a feature carries; also the mode a style declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureMode {
    #[default]
    Basic,
    Transcript,
    Alignment,
    Sequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    #[default]
    Dna,
    Peptide,
}
