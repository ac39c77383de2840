//! Leaf feature data.

use super::{GraphError, GraphResult, NodeId};
use crate::align::{is_perfect, sort_blocks, AlignBlock};
use crate::types::{Coord, FeatureMode, SequenceKind, Span, Strand};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicData {
    /// Sequence edit in `old>new` form when the feature is a variation
    pub variation_str: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptData {
    pub exons: Vec<Span>,
    pub introns: Vec<Span>,
    pub cds: Option<Span>,
    pub start_not_found: bool,
    pub end_not_found: bool,
    /// Variation features applied when extracting transcript DNA
    pub variations: Vec<Feature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HomolType {
    #[default]
    Nucleotide,
    Protein,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomolData {
    pub homol_type: HomolType,
    /// Match sequence coordinates (`y1 <= y2` once stored on a feature)
    pub y1: Coord,
    pub y2: Coord,
    /// Full length of the match sequence, if known
    pub length: Option<Coord>,
    pub strand: Strand,
    pub target_phase: u8,
    pub percent_id: Option<f32>,
    pub clone_id: Option<String>,
    pub align: Option<Vec<AlignBlock>>,
    pub perfect: bool,
    pub masked: bool,
    pub sequence: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceData {
    pub kind: SequenceKind,
    pub sequence: String,
}

/// Mode-specific payload of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeaturePayload {
    Basic(BasicData),
    Transcript(TranscriptData),
    Alignment(HomolData),
    Sequence(SequenceData),
}

impl FeaturePayload {
    pub fn empty(mode: FeatureMode) -> Self {
        match mode {
            FeatureMode::Basic => FeaturePayload::Basic(BasicData::default()),
            FeatureMode::Transcript => FeaturePayload::Transcript(TranscriptData::default()),
            FeatureMode::Alignment => FeaturePayload::Alignment(HomolData::default()),
            FeatureMode::Sequence => FeaturePayload::Sequence(SequenceData::default()),
        }
    }

    pub fn mode(&self) -> FeatureMode {
        match self {
            FeaturePayload::Basic(_) => FeatureMode::Basic,
            FeaturePayload::Transcript(_) => FeatureMode::Transcript,
            FeaturePayload::Alignment(_) => FeatureMode::Alignment,
            FeaturePayload::Sequence(_) => FeatureMode::Sequence,
        }
    }
}

impl Default for FeaturePayload {
    fn default() -> Self {
        FeaturePayload::Basic(BasicData::default())
    }
}

/// A single annotated feature on the reference sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub x1: Coord,
    pub x2: Coord,
    pub strand: Strand,
    pub score: Option<f32>,
    pub source: Option<String>,
    pub ontology: Option<String>,
    /// Featureset whose style applies to this feature; set on attach
    #[serde(skip)]
    pub(crate) style_slot: Option<NodeId>,
    pub(crate) payload: FeaturePayload,
}

impl Feature {
    pub fn new(mode: FeatureMode, x1: Coord, x2: Coord, strand: Strand) -> Self {
        let span = Span::new(x1, x2);
        Self {
            x1: span.x1,
            x2: span.x2,
            strand,
            payload: FeaturePayload::empty(mode),
            ..Default::default()
        }
    }

    /// A basic feature describing a sequence edit at `[x1, x2]`.
    pub fn variation(x1: Coord, x2: Coord, edit: &str) -> Self {
        let mut feature = Self::new(FeatureMode::Basic, x1, x2, Strand::None);
        feature.payload = FeaturePayload::Basic(BasicData {
            variation_str: Some(edit.to_string()),
            ..Default::default()
        });
        feature
    }

    pub fn mode(&self) -> FeatureMode {
        self.payload.mode()
    }

    pub fn span(&self) -> Span {
        Span {
            x1: self.x1,
            x2: self.x2,
        }
    }

    pub fn set_span(&mut self, x1: Coord, x2: Coord) {
        let span = Span::new(x1, x2);
        self.x1 = span.x1;
        self.x2 = span.x2;
    }

    pub fn payload(&self) -> &FeaturePayload {
        &self.payload
    }

    /// Replaces the payload, and so possibly the mode.
    pub fn set_payload(&mut self, payload: FeaturePayload) {
        self.payload = payload;
    }

    /// Featureset whose style this feature is drawn with.
    pub fn style_slot(&self) -> Option<NodeId> {
        self.style_slot
    }

    pub fn basic(&self) -> Option<&BasicData> {
        match &self.payload {
            FeaturePayload::Basic(data) => Some(data),
            _ => None,
        }
    }

    pub fn basic_mut(&mut self) -> GraphResult<&mut BasicData> {
        let found = self.mode();
        match &mut self.payload {
            FeaturePayload::Basic(data) => Ok(data),
            _ => Err(wrong_mode(FeatureMode::Basic, found)),
        }
    }

    pub fn transcript(&self) -> Option<&TranscriptData> {
        match &self.payload {
            FeaturePayload::Transcript(data) => Some(data),
            _ => None,
        }
    }

    pub fn transcript_mut(&mut self) -> GraphResult<&mut TranscriptData> {
        let found = self.mode();
        match &mut self.payload {
            FeaturePayload::Transcript(data) => Ok(data),
            _ => Err(wrong_mode(FeatureMode::Transcript, found)),
        }
    }

    pub fn homol(&self) -> Option<&HomolData> {
        match &self.payload {
            FeaturePayload::Alignment(data) => Some(data),
            _ => None,
        }
    }

    pub fn homol_mut(&mut self) -> GraphResult<&mut HomolData> {
        let found = self.mode();
        match &mut self.payload {
            FeaturePayload::Alignment(data) => Ok(data),
            _ => Err(wrong_mode(FeatureMode::Alignment, found)),
        }
    }

    pub fn sequence(&self) -> Option<&SequenceData> {
        match &self.payload {
            FeaturePayload::Sequence(data) => Some(data),
            _ => None,
        }
    }

    pub fn variation_str(&self) -> Option<&str> {
        self.basic().and_then(|data| data.variation_str.as_deref())
    }

    fn extend_to(&mut self, span: &Span) {
        if self.x1 == 0 && self.x2 == 0 {
            self.x1 = span.x1;
            self.x2 = span.x2;
        } else {
            self.x1 = self.x1.min(span.x1);
            self.x2 = self.x2.max(span.x2);
        }
    }

    /// Appends an exon, widening the feature to cover it.
    pub fn add_exon(&mut self, exon: Span) -> GraphResult<()> {
        self.transcript_mut()?.exons.push(exon);
        self.extend_to(&exon);
        Ok(())
    }

    pub fn add_intron(&mut self, intron: Span) -> GraphResult<()> {
        self.transcript_mut()?.introns.push(intron);
        self.extend_to(&intron);
        Ok(())
    }

    /// Sorts exons and rebuilds the intron list from the gaps between them.
    pub fn recreate_introns(&mut self) -> GraphResult<()> {
        let data = self.transcript_mut()?;
        data.exons.sort_by_key(|exon| exon.x1);
        data.introns = data
            .exons
            .windows(2)
            .filter(|pair| pair[1].x1 > pair[0].x2 + 1)
            .map(|pair| Span::new(pair[0].x2 + 1, pair[1].x1 - 1))
            .collect();
        Ok(())
    }

    pub fn set_cds(&mut self, cds: Span) -> GraphResult<()> {
        let (x1, x2) = (self.x1, self.x2);
        let data = self.transcript_mut()?;
        if cds.x1 < x1 || cds.x2 > x2 {
            return Err(GraphError::OutOfRange {
                span: cds,
                bounds: Span { x1, x2 },
            });
        }
        data.cds = Some(cds);
        Ok(())
    }

    /// Attaches a variation to a transcript. Variations are kept in
    /// coordinate order, which transcript extraction relies on.
    pub fn add_variation(&mut self, variation: Feature) -> GraphResult<()> {
        if variation.variation_str().is_none() {
            return Err(GraphError::NotAVariation(variation.span()));
        }
        let data = self.transcript_mut()?;
        let at = data
            .variations
            .partition_point(|existing| existing.x1 <= variation.x1);
        data.variations.insert(at, variation);
        Ok(())
    }

    /// Stores alignment data: query coordinates are put in ascending order,
    /// blocks sorted by reference and the perfect flag computed.
    pub fn add_alignment_data(&mut self, mut homol: HomolData, align_error: u32) -> GraphResult<()> {
        if self.mode() != FeatureMode::Alignment {
            return Err(wrong_mode(FeatureMode::Alignment, self.mode()));
        }
        if homol.y1 > homol.y2 {
            std::mem::swap(&mut homol.y1, &mut homol.y2);
        }
        if let Some(blocks) = homol.align.as_mut() {
            sort_blocks(blocks);
            homol.perfect = is_perfect(blocks, align_error);
        }
        self.payload = FeaturePayload::Alignment(homol);
        Ok(())
    }

    /// True when reference and match lengths differ, scaling protein
    /// matches to bases.
    pub fn is_gapped(&self) -> bool {
        match self.homol() {
            Some(homol) => {
                let ref_length = self.x2 - self.x1 + 1;
                let mut match_length = homol.y2 - homol.y1 + 1;
                if homol.homol_type != HomolType::Nucleotide {
                    match_length *= 3;
                }
                ref_length != match_length
            }
            None => false,
        }
    }

    pub fn is_masked(&self) -> bool {
        self.homol().map(|homol| homol.masked).unwrap_or(false)
    }

    /// Sets the masked flag on alignment features; false for other modes.
    pub fn set_masked(&mut self, masked: bool) -> bool {
        match &mut self.payload {
            FeaturePayload::Alignment(homol) => {
                homol.masked = masked;
                true
            }
            _ => false,
        }
    }
}

fn wrong_mode(expected: FeatureMode, found: FeatureMode) -> GraphError {
    GraphError::WrongMode { expected, found }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::BoundaryType;

    fn block(t1: Coord, t2: Coord, q1: Coord, q2: Coord) -> AlignBlock {
        AlignBlock {
            t1,
            t2,
            q1,
            q2,
            t_strand: Strand::Forward,
            q_strand: Strand::Forward,
            start_boundary: BoundaryType::Edge,
            end_boundary: BoundaryType::Edge,
        }
    }

    #[test]
    fn test_transcript_builds_up() {
        let mut tr = Feature::new(FeatureMode::Transcript, 0, 0, Strand::Forward);
        tr.add_exon(Span::new(300, 400)).unwrap();
        tr.add_exon(Span::new(100, 200)).unwrap();
        assert_eq!(tr.span(), Span::new(100, 400));
        tr.recreate_introns().unwrap();
        let data = tr.transcript().unwrap();
        assert_eq!(data.exons[0].x1, 100);
        assert_eq!(data.introns, vec![Span::new(201, 299)]);
        assert!(tr.set_cds(Span::new(150, 350)).is_ok());
        assert!(tr.set_cds(Span::new(50, 350)).is_err());
    }

    #[test]
    fn test_variations_stay_ordered() {
        let mut tr = Feature::new(FeatureMode::Transcript, 1, 100, Strand::Forward);
        tr.add_variation(Feature::variation(50, 50, "A>G")).unwrap();
        tr.add_variation(Feature::variation(10, 11, "AC>A")).unwrap();
        let xs: Vec<_> = tr.transcript().unwrap().variations.iter().map(|v| v.x1).collect();
        assert_eq!(xs, vec![10, 50]);

        let plain = Feature::new(FeatureMode::Basic, 1, 2, Strand::None);
        assert!(tr.add_variation(plain).is_err());
    }

    #[test]
    fn test_alignment_data_normalises() {
        let mut f = Feature::new(FeatureMode::Alignment, 100, 116, Strand::Forward);
        let homol = HomolData {
            y1: 15,
            y2: 1,
            align: Some(vec![block(112, 116, 11, 15), block(100, 109, 1, 10)]),
            ..Default::default()
        };
        f.add_alignment_data(homol, 0).unwrap();
        let homol = f.homol().unwrap();
        assert_eq!((homol.y1, homol.y2), (1, 15));
        assert_eq!(homol.align.as_ref().unwrap()[0].t1, 100);
        assert!(homol.perfect);
        assert!(f.is_gapped());
    }

    #[test]
    fn test_mode_mismatch() {
        let mut f = Feature::new(FeatureMode::Basic, 1, 10, Strand::Forward);
        assert!(matches!(
            f.add_exon(Span::new(1, 5)),
            Err(GraphError::WrongMode {
                expected: FeatureMode::Transcript,
                ..
            })
        ));
        assert!(!f.set_masked(true));
        assert!(!f.is_masked());
    }
}
