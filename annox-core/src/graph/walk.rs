//! Depth-first traversal of the feature graph.

use super::{Graph, Node, NodeId};
use crate::symbols::Symbol;
use crate::types::Level;

/// What a visitor wants the walk to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    /// Do not descend below the node just visited
    SkipSubtree,
    /// End the walk
    Stop,
}

/// Pre-order iterator over a subtree, children in insertion order.
pub struct Descendants<'a> {
    graph: &'a Graph,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            if let Some(node) = self.graph.node(id) {
                self.stack.extend(node.children().rev());
                return Some(id);
            }
        }
        None
    }
}

impl Graph {
    /// Every node of the subtree rooted at `root`, root first.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            graph: self,
            stack: vec![root],
        }
    }

    /// Visits `root` and its descendants down to `max_level`, pre-order.
    /// Returns true if the visitor stopped the walk.
    pub fn walk<F>(&self, root: NodeId, max_level: Level, mut visit: F) -> bool
    where
        F: FnMut(NodeId, &Node) -> WalkControl,
    {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = match self.node(id) {
                Some(node) => node,
                None => continue,
            };
            match visit(id, node) {
                WalkControl::Stop => return true,
                WalkControl::SkipSubtree => {}
                WalkControl::Continue => {
                    if node.level() < max_level {
                        stack.extend(node.children().rev());
                    }
                }
            }
        }
        false
    }

    /// First node at `level` under `root` whose unique id matches.
    pub fn find_descendant(&self, root: NodeId, unique_id: Symbol, level: Level) -> Option<NodeId> {
        let mut found = None;
        self.walk(root, level, |id, node| {
            if node.level() == level && node.unique_id() == unique_id {
                found = Some(id);
                WalkControl::Stop
            } else {
                WalkControl::Continue
            }
        });
        found
    }

    /// [`Graph::find_descendant`] by name, without interning.
    pub fn find_descendant_named(&self, root: NodeId, unique_id: &str, level: Level) -> Option<NodeId> {
        let sym = self.symbols().get(unique_id)?;
        self.find_descendant(root, sym, level)
    }

    /// All nodes at `level` under `root`, in pre-order.
    pub fn nodes_at(&self, root: NodeId, level: Level) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(root, level, |id, node| {
            if node.level() == level {
                out.push(id);
                WalkControl::SkipSubtree
            } else {
                WalkControl::Continue
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blocks() -> (Graph, NodeId) {
        let mut graph = Graph::new();
        let ctx = graph.create(Level::Context, None, "c", "c", None).unwrap();
        let align = graph.create(Level::Alignment, Some(ctx), "a", "a", None).unwrap();
        for block in ["b1", "b2"] {
            let b = graph.create(Level::Block, Some(align), block, block, None).unwrap();
            let set = graph.create(Level::FeatureSet, Some(b), "est", "est", None).unwrap();
            graph
                .create(Level::Feature, Some(set), "x", &format!("x_{block}"), None)
                .unwrap();
        }
        (graph, ctx)
    }

    #[test]
    fn test_preorder_follows_insertion_order() {
        let (graph, ctx) = two_blocks();
        let names: Vec<&str> = graph.descendants(ctx).map(|id| graph.unique_name(id)).collect();
        assert_eq!(names, vec!["c", "a", "b1", "est", "x_b1", "b2", "est", "x_b2"]);
    }

    #[test]
    fn test_find_stops_at_first_match() {
        let (graph, ctx) = two_blocks();
        let set = graph.find_descendant_named(ctx, "est", Level::FeatureSet).unwrap();
        assert_eq!(graph.unique_name(graph.parent(set).unwrap()), "b1");
        assert!(graph.find_descendant_named(ctx, "x_b2", Level::FeatureSet).is_none());
        assert!(graph.find_descendant_named(ctx, "x_b2", Level::Feature).is_some());
        assert!(graph.find_descendant_named(ctx, "nope", Level::Feature).is_none());
    }

    #[test]
    fn test_walk_respects_controls() {
        let (graph, ctx) = two_blocks();
        let mut seen = 0;
        let stopped = graph.walk(ctx, Level::Feature, |_, node| {
            seen += 1;
            match node.level() {
                Level::Block => WalkControl::SkipSubtree,
                _ => WalkControl::Continue,
            }
        });
        assert!(!stopped);
        assert_eq!(seen, 4);
        assert_eq!(graph.nodes_at(ctx, Level::FeatureSet).len(), 2);
    }
}
