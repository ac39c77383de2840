//! Merging a freshly loaded context into a live one.

use super::{Graph, GraphError, GraphResult, NodeId};
use crate::symbols::Symbol;
use crate::types::Level;

/// What a merge added to the target context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Unique ids of featuresets that gained features, first-seen order
    pub featuresets: Vec<Symbol>,
    /// The target featureset nodes behind `featuresets`, one per block
    pub featureset_nodes: Vec<NodeId>,
    pub features_added: usize,
    /// Source features dropped because the target already had them
    pub duplicates: usize,
}

impl MergeOutcome {
    fn record_featureset(&mut self, graph: &Graph, set: NodeId) {
        if !self.featureset_nodes.contains(&set) {
            self.featureset_nodes.push(set);
        }
        if let Some(node) = graph.node(set) {
            if !self.featuresets.contains(&node.unique_id()) {
                self.featuresets.push(node.unique_id());
            }
        }
    }
}

impl Graph {
    /// Moves everything in `source` that `target` lacks into `target`,
    /// matching nodes by unique id level by level. The emptied source
    /// context is destroyed along with any duplicates.
    pub fn merge(&mut self, target: NodeId, source: NodeId) -> GraphResult<MergeOutcome> {
        self.context(target)?;
        self.context(source)?;
        if target == source {
            return Err(GraphError::NotAChild {
                parent: target,
                child: source,
            });
        }

        let mut outcome = MergeOutcome::default();
        self.merge_children(target, target, source, &mut outcome)?;

        {
            let ctx = self.context_mut(target)?;
            for set in &outcome.featuresets {
                if !ctx.feature_set_names.contains(set) {
                    ctx.feature_set_names.push(*set);
                }
            }
        }
        log::debug!(
            "merge added {} features to {} featuresets, {} duplicates",
            outcome.features_added,
            outcome.featuresets.len(),
            outcome.duplicates
        );

        let doomed = std::mem::take(&mut self.context_mut(target)?.elements_to_destroy);
        for id in doomed {
            if self.contains(id) {
                self.destroy(id, true)?;
            }
        }
        self.destroy(source, true)?;
        self.context_mut(target)?.clear_scratch();
        Ok(outcome)
    }

    fn merge_children(
        &mut self,
        context: NodeId,
        target_parent: NodeId,
        source_parent: NodeId,
        outcome: &mut MergeOutcome,
    ) -> GraphResult<()> {
        for child in self.children(source_parent) {
            let (key, level) = {
                let node = self.get(child)?;
                (node.unique_id(), node.level())
            };
            match self.find_child(target_parent, key) {
                None => {
                    self.remove(source_parent, child)?;
                    self.add_child(target_parent, child)?;
                    self.record_added(target_parent, child, level, outcome);
                }
                Some(_) if level == Level::Feature => {
                    self.remove(source_parent, child)?;
                    self.context_mut(context)?.elements_to_destroy.push(child);
                    outcome.duplicates += 1;
                }
                Some(existing) => {
                    self.merge_children(context, existing, child, outcome)?;
                }
            }
        }
        Ok(())
    }

    fn record_added(&self, parent: NodeId, child: NodeId, level: Level, outcome: &mut MergeOutcome) {
        if level == Level::Feature {
            outcome.features_added += 1;
            outcome.record_featureset(self, parent);
            return;
        }
        for id in self.descendants(child) {
            match self.node(id).map(|n| n.level()) {
                Some(Level::FeatureSet) if self.get(id).map(|n| n.has_children()).unwrap_or(false) => {
                    outcome.record_featureset(self, id);
                }
                Some(Level::Feature) => outcome.features_added += 1,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with(graph: &mut Graph, name: &str, features: &[&str]) -> NodeId {
        let ctx = graph.create(Level::Context, None, name, "chr1", None).unwrap();
        let align = graph.create(Level::Alignment, Some(ctx), "chr1", "chr1", None).unwrap();
        let block = graph.create(Level::Block, Some(align), "b", "b", None).unwrap();
        let set = graph.create(Level::FeatureSet, Some(block), "EST", "est", None).unwrap();
        for f in features {
            graph.create(Level::Feature, Some(set), f, f, None).unwrap();
        }
        ctx
    }

    #[test]
    fn test_merge_moves_new_features() {
        let mut graph = Graph::new();
        let live = context_with(&mut graph, "live", &["a", "b"]);
        let incoming = context_with(&mut graph, "incoming", &["b", "c"]);
        let outcome = graph.merge(live, incoming).unwrap();

        assert_eq!(outcome.features_added, 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.featuresets, vec![graph.symbols().get("est").unwrap()]);
        assert!(!graph.contains(incoming));

        let set = graph.find_descendant_named(live, "est", Level::FeatureSet).unwrap();
        assert_eq!(graph.get(set).unwrap().child_count(), 3);
        let ctx = graph.context(live).unwrap();
        assert!(ctx.src_featureset_names.is_empty());
        assert!(ctx.elements_to_destroy.is_empty());
        // live: 4 structural + 3 features
        assert_eq!(graph.len(), 7);
    }

    #[test]
    fn test_merge_adopts_whole_new_featureset() {
        let mut graph = Graph::new();
        let live = context_with(&mut graph, "live", &["a"]);
        let incoming = graph.create(Level::Context, None, "in", "chr1", None).unwrap();
        let align = graph.create(Level::Alignment, Some(incoming), "chr1", "chr1", None).unwrap();
        let block = graph.create(Level::Block, Some(align), "b", "b", None).unwrap();
        let set = graph.create(Level::FeatureSet, Some(block), "mRNA", "mrna", None).unwrap();
        graph.create(Level::Feature, Some(set), "m1", "m1", None).unwrap();

        let outcome = graph.merge(live, incoming).unwrap();
        assert_eq!(outcome.featureset_nodes, vec![set]);
        assert_eq!(outcome.features_added, 1);
        assert!(graph
            .find_descendant_named(live, "mrna", Level::FeatureSet)
            .is_some());
    }
}
