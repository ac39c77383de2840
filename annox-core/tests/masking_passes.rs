use annox_core::graph::{Feature, Graph, NodeId};
use annox_core::mask::sorted_chains;
use annox_core::{
    mask_featuresets, FeatureMode, Level, MaskError, Strand, Style, StyleRegistry, Symbol,
};

struct Fixture {
    graph: Graph,
    live: NodeId,
}

fn styles() -> StyleRegistry {
    StyleRegistry::from_styles(vec![
        Style::new("vertebrate_mRNA", FeatureMode::Alignment),
        Style::new("EST_Human", FeatureMode::Alignment).with_masked_by(["vertebrate_mRNA", "self"]),
        Style::new("EST_Mouse", FeatureMode::Alignment).with_masked_by(["self"]),
        Style::new("EST_Old", FeatureMode::Alignment).with_masked_by(["vertebrate_mRNA"]),
    ])
}

/// Adds one alignment chain (`name`) of blocks to a featureset.
fn chain(graph: &mut Graph, set: NodeId, name: &str, blocks: &[(i64, i64)]) {
    for &(x1, x2) in blocks {
        let feature = Feature::new(FeatureMode::Alignment, x1, x2, Strand::Forward);
        let unique = format!("{}_+_{}.{}", name.to_ascii_lowercase(), x1, x2);
        graph.create_feature(Some(set), name, &unique, feature).expect("feature");
    }
}

fn context(graph: &mut Graph, name: &str) -> (NodeId, NodeId) {
    let ctx = graph.create(Level::Context, None, name, "chr1", None).expect("context");
    let align = graph.create(Level::Alignment, Some(ctx), "chr1", "chr1", None).expect("align");
    let block = graph
        .create(Level::Block, Some(align), "chr1", "1.100000.+_1.100000.+", None)
        .expect("block");
    (ctx, block)
}

fn featureset(graph: &mut Graph, block: NodeId, name: &str) -> NodeId {
    let id = name.to_ascii_lowercase();
    graph.create(Level::FeatureSet, Some(block), name, &id, None).expect("featureset")
}

fn masked(graph: &Graph, root: NodeId, set: &str, name: &str) -> bool {
    let set = graph.find_descendant_named(root, set, Level::FeatureSet).expect("featureset");
    let chains = sorted_chains(graph, set).expect("sorted");
    chains
        .iter()
        .find(|c| graph.resolve(c.name) == name)
        .map(|c| {
            c.features
                .iter()
                .all(|f| graph.feature(*f).expect("feature").is_masked())
                && c.masked
        })
        .expect("chain")
}

fn live_context() -> Fixture {
    let mut graph = Graph::new();
    let (live, block) = context(&mut graph, "live");
    let old = featureset(&mut graph, block, "EST_Old");
    chain(&mut graph, old, "OLD1", &[(1010, 1020), (1030, 1040)]);
    chain(&mut graph, old, "OLD2", &[(5000, 5100)]);
    Fixture { graph, live }
}

fn incoming(graph: &mut Graph) -> NodeId {
    let (ctx, block) = context(graph, "incoming");
    let mrna = featureset(graph, block, "vertebrate_mRNA");
    chain(graph, mrna, "M1", &[(1005, 1025), (1028, 1045)]);

    let human = featureset(graph, block, "EST_Human");
    // inside M1 with alternate splicing
    chain(graph, human, "H1", &[(1010, 1020), (1030, 1040)]);
    // two copies of the same alignment, only one may survive
    chain(graph, human, "H2", &[(2000, 2050), (2100, 2150)]);
    chain(graph, human, "H3", &[(2000, 2050), (2100, 2150)]);
    // nothing covers it
    chain(graph, human, "H4", &[(3000, 3050)]);

    let mouse = featureset(graph, block, "EST_Mouse");
    chain(graph, mouse, "S1", &[(4000, 4100)]);
    chain(graph, mouse, "S2", &[(4010, 4090)]);
    ctx
}

fn merge_and_mask(fixture: &mut Fixture) -> annox_core::MaskReport {
    let source = incoming(&mut fixture.graph);
    let outcome = fixture.graph.merge(fixture.live, source).expect("merge");
    let new: Vec<Symbol> = outcome.featuresets.clone();
    assert_eq!(new.len(), 3);
    mask_featuresets(&mut fixture.graph, fixture.live, &new, &styles()).expect("mask")
}

#[test]
fn new_featuresets_are_masked_by_all() {
    let mut fixture = live_context();
    let report = merge_and_mask(&mut fixture);
    let (graph, live) = (&fixture.graph, fixture.live);

    assert!(masked(graph, live, "est_human", "H1"));
    let copies = [masked(graph, live, "est_human", "H2"), masked(graph, live, "est_human", "H3")];
    assert_eq!(copies.iter().filter(|m| **m).count(), 1);
    assert!(!masked(graph, live, "est_human", "H4"));

    assert!(masked(graph, live, "est_mouse", "S2"));
    assert!(!masked(graph, live, "est_mouse", "S1"));
    assert!(!masked(graph, live, "vertebrate_mrna", "M1"));

    // H1, one of H2/H3, S2 and OLD1
    assert_eq!(report.masked_chains, 4);
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
}

#[test]
fn old_featuresets_are_masked_by_new_maskers() {
    let mut fixture = live_context();
    let report = merge_and_mask(&mut fixture);
    let (graph, live) = (&fixture.graph, fixture.live);

    assert_eq!(report.redisplay, vec!["est_old".to_string()]);
    assert!(masked(graph, live, "est_old", "OLD1"));
    assert!(!masked(graph, live, "est_old", "OLD2"));
}

#[test]
fn lookup_misses_are_reported() {
    let mut graph = Graph::new();
    let (ctx, block) = context(&mut graph, "live");
    let est = featureset(&mut graph, block, "EST_Human");
    chain(&mut graph, est, "H1", &[(10, 20)]);
    let unknown = featureset(&mut graph, block, "Unstyled");
    chain(&mut graph, unknown, "U1", &[(10, 20)]);

    let new = vec![graph.intern("est_human"), graph.intern("unstyled")];
    let report = mask_featuresets(&mut graph, ctx, &new, &styles()).expect("mask");

    assert_eq!(report.masked_chains, 0);
    assert!(report.skipped.contains(&MaskError::MissingStyle("unstyled".to_string())));
    assert!(report.skipped.contains(&MaskError::MissingMasker {
        featureset: "est_human".to_string(),
        masker: "vertebrate_mrna".to_string(),
    }));
}
