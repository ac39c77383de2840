use annox_core::graph::{Feature, Graph, NodeId};
use annox_core::mask::{sort_featureset, sorted_chains};
use annox_core::{FeatureMode, Level, Strand};
use proptest::prelude::*;

fn featureset(graph: &mut Graph) -> NodeId {
    let ctx = graph.create(Level::Context, None, "chr1", "chr1", None).expect("context");
    let align = graph.create(Level::Alignment, Some(ctx), "chr1", "chr1", None).expect("align");
    let block = graph.create(Level::Block, Some(align), "b", "b", None).expect("block");
    graph.create(Level::FeatureSet, Some(block), "EST", "est", None).expect("featureset")
}

/// Every child points back at its parent and its parent's map holds it
/// under its own unique id.
fn assert_linked(graph: &Graph, root: NodeId) {
    for id in graph.descendants(root) {
        let node = graph.get(id).expect("live node");
        for child in node.children() {
            let child_node = graph.get(child).expect("live child");
            assert_eq!(child_node.parent(), Some(id));
            assert_eq!(graph.find_child(id, child_node.unique_id()), Some(child));
        }
    }
}

proptest! {
    #[test]
    fn add_child_inserts_each_unique_id_once(ids in prop::collection::vec(0u8..20, 1..60)) {
        let mut graph = Graph::new();
        let set = featureset(&mut graph);
        let mut seen = std::collections::HashSet::new();

        for id in &ids {
            let name = format!("f{id}");
            let feature = Feature::new(FeatureMode::Basic, 1, 10, Strand::Forward);
            let node = graph.create_feature(None, &name, &name, feature).expect("feature");
            let added = graph.add_child(set, node).expect("add child");
            prop_assert_eq!(added, seen.insert(*id));
            if !added {
                graph.destroy(node, true).expect("drop loose feature");
            }
        }

        prop_assert_eq!(graph.get(set).expect("set").child_count(), seen.len());
        assert_linked(&graph, set);
    }

    #[test]
    fn remove_and_destroy_leave_no_dangling_children(
        count in 1usize..30,
        doomed in prop::collection::vec(any::<prop::sample::Index>(), 0..30),
    ) {
        let mut graph = Graph::new();
        let set = featureset(&mut graph);
        let mut live: Vec<NodeId> = (0..count)
            .map(|i| {
                let name = format!("f{i}");
                let feature = Feature::new(FeatureMode::Basic, 1, 10, Strand::Forward);
                graph.create_feature(Some(set), &name, &name, feature).expect("feature")
            })
            .collect();

        for (step, index) in doomed.iter().enumerate() {
            if live.is_empty() {
                break;
            }
            let victim = live.remove(index.index(live.len()));
            if step % 2 == 0 {
                prop_assert!(graph.remove(set, victim).expect("remove"));
                prop_assert_eq!(graph.parent(victim), None);
                graph.destroy(victim, true).expect("destroy detached");
            } else {
                graph.destroy(victim, true).expect("destroy attached");
            }
            prop_assert!(!graph.contains(victim));
        }

        let children = graph.children(set);
        prop_assert_eq!(children.len(), live.len());
        for id in &live {
            prop_assert!(children.contains(id));
        }
        assert_linked(&graph, set);
    }

    #[test]
    fn chain_sort_is_idempotent(rows in prop::collection::vec((0u8..6, 1i64..500, 1i64..80), 0..40)) {
        let mut graph = Graph::new();
        let set = featureset(&mut graph);
        for (i, (name, start, len)) in rows.iter().enumerate() {
            let original = format!("est{name}");
            let unique = format!("{original}_{i}");
            let feature = Feature::new(FeatureMode::Alignment, *start, start + len, Strand::Forward);
            graph.create_feature(Some(set), &original, &unique, feature).expect("feature");
        }

        let first_count = sort_featureset(&mut graph, set).expect("sort");
        let first = sorted_chains(&graph, set).expect("cached").to_vec();
        let second_count = sort_featureset(&mut graph, set).expect("re-sort");
        prop_assert_eq!(first_count, second_count);
        prop_assert_eq!(sorted_chains(&graph, set).expect("cached"), &first[..]);

        for pair in first.windows(2) {
            prop_assert!(
                pair[0].span.x1 < pair[1].span.x1
                    || (pair[0].span.x1 == pair[1].span.x1 && pair[0].span.x2 >= pair[1].span.x2)
            );
        }
    }
}

#[test]
fn destroying_a_subtree_frees_every_node() {
    let mut graph = Graph::new();
    let set = featureset(&mut graph);
    for i in 0..5 {
        let name = format!("f{i}");
        let feature = Feature::new(FeatureMode::Basic, 1, 10, Strand::Forward);
        graph.create_feature(Some(set), &name, &name, feature).expect("feature");
    }
    let block = graph.parent(set).expect("block");
    let align = graph.parent(block).expect("align");
    let before = graph.len();
    graph.destroy(block, true).expect("destroy block");
    assert_eq!(graph.len(), before - 7);
    assert!(!graph.contains(set));
    assert!(graph.children(align).is_empty());
}
