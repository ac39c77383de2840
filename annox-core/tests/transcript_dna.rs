use annox_core::dna::{apply_variation, feature_dna, VariationEdit};
use annox_core::graph::{BlockSequence, Feature, Graph, NodeId};
use annox_core::{transcript_dna, DnaError, FeatureMode, Level, SequenceKind, Span, Strand};

const REFERENCE: &str = "atgaaacccgggtttaaacccgggtttaaacccgggtag";

fn transcript_set(dna: &str) -> (Graph, NodeId) {
    let mut graph = Graph::new();
    let ctx = graph.create(Level::Context, None, "chr7", "chr7", None).expect("context");
    let align = graph.create(Level::Alignment, Some(ctx), "chr7", "chr7", None).expect("align");
    let block = graph
        .create(Level::Block, Some(align), "chr7", "1.39.+_1.39.+", None)
        .expect("block");
    {
        let data = graph.block_mut(block).expect("block data");
        data.span = Span::new(1, dna.len() as i64);
        data.strand = Strand::Forward;
        data.sequence = Some(BlockSequence {
            kind: SequenceKind::Dna,
            sequence: dna.to_string(),
        });
    }
    let set = graph
        .create(Level::FeatureSet, Some(block), "Genes", "genes", None)
        .expect("featureset");
    assert!(graph.has_dna(ctx));
    (graph, set)
}

fn two_exon_transcript(strand: Strand) -> Feature {
    let mut t = Feature::new(FeatureMode::Transcript, 0, 0, strand);
    t.add_exon(Span::new(1, 9)).expect("exon 1");
    t.add_exon(Span::new(19, 27)).expect("exon 2");
    t.recreate_introns().expect("introns");
    t
}

#[test]
fn spliced_transcript_joins_exons() {
    let (mut graph, set) = transcript_set(REFERENCE);
    let t = graph
        .create_feature(Some(set), "T1", "t1", two_exon_transcript(Strand::Forward))
        .expect("transcript");
    let intron = graph.feature(t).expect("feature").transcript().expect("data").introns.clone();
    assert_eq!(intron, vec![Span::new(10, 18)]);

    let dna = transcript_dna(&graph, t, true, false).expect("spliced");
    assert_eq!(dna.sequence, "atgaaaccccccgggttt");
    assert!(dna.skipped.is_empty());

    let unspliced = transcript_dna(&graph, t, false, false).expect("unspliced");
    assert_eq!(unspliced.sequence, "ATGAAACCCgggtttaaaCCCGGGTTT");
}

#[test]
fn substitution_shifts_the_next_exon() {
    let (mut graph, set) = transcript_set(REFERENCE);
    let mut feature = two_exon_transcript(Strand::Forward);
    // "aa" at 4-5 becomes "a": exon 1 loses a base
    feature.add_variation(Feature::variation(4, 5, "AA>A")).expect("variation");
    let t = graph.create_feature(Some(set), "T1", "t1", feature).expect("transcript");

    let dna = transcript_dna(&graph, t, true, false).expect("spliced");
    assert_eq!(dna.sequence, "atgAaccccccgggttt");
    assert_eq!(dna.sequence.len(), 17);
}

#[test]
fn insertion_shifts_the_next_exon() {
    let (mut graph, set) = transcript_set(REFERENCE);
    let mut feature = two_exon_transcript(Strand::Forward);
    feature.add_variation(Feature::variation(3, 4, ">AT")).expect("variation");
    let t = graph.create_feature(Some(set), "T1", "t1", feature).expect("transcript");

    let dna = transcript_dna(&graph, t, true, false).expect("spliced");
    assert_eq!(dna.sequence, "atgATaaaccccccgggttt");
}

#[test]
fn mismatched_variation_is_reported_not_applied() {
    let (mut graph, set) = transcript_set(REFERENCE);
    let mut feature = two_exon_transcript(Strand::Forward);
    feature.add_variation(Feature::variation(4, 6, "AA>A")).expect("variation");
    let t = graph.create_feature(Some(set), "T1", "t1", feature).expect("transcript");

    let dna = transcript_dna(&graph, t, true, false).expect("spliced");
    assert_eq!(dna.sequence, "atgaaaccccccgggttt");
    assert!(matches!(
        dna.skipped.as_slice(),
        [DnaError::VariationLengthMismatch { expected: 2, actual: 3, .. }]
    ));
}

#[test]
fn reverse_cds_is_reverse_complemented() {
    let (mut graph, set) = transcript_set(REFERENCE);
    let mut feature = two_exon_transcript(Strand::Reverse);
    feature.set_cds(Span::new(4, 24)).expect("cds");
    let t = graph.create_feature(Some(set), "T1", "t1", feature).expect("transcript");

    // forward CDS bases are "aaaccc" + "cccggg"
    let dna = transcript_dna(&graph, t, true, true).expect("cds");
    assert_eq!(dna.sequence, "cccggggggttt");
}

#[test]
fn feature_dna_and_edits() {
    let (mut graph, set) = transcript_set(REFERENCE);
    let f = graph
        .create_feature(Some(set), "r", "r", Feature::new(FeatureMode::Basic, 1, 3, Strand::Reverse))
        .expect("feature");
    assert_eq!(feature_dna(&graph, f).expect("dna"), "cat");

    let mut seq = "atgaaa".to_string();
    let delta = apply_variation(&mut seq, 1, &Feature::variation(2, 3, "TG>T"), 0).expect("edit");
    assert_eq!((seq.as_str(), delta), ("aTaaa", -1));
    assert_eq!(VariationEdit::parse(">AT").expect("insertion").delta(), 2);
}
