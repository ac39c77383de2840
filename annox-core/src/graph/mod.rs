//! Feature graph
//!
//! A five-level containment tree, Context → Alignment → Block → FeatureSet →
//! Feature, held in a generational arena. Nodes refer to their parent by
//! [`NodeId`] and keep their children in an insertion-ordered map keyed by
//! unique id, so there are no owning cycles and a destroyed node's id can
//! never resolve to its slot's next occupant.

pub mod feature;
pub mod ids;
pub mod merge;
pub mod walk;

pub use feature::{BasicData, Feature, FeaturePayload, HomolData, HomolType, SequenceData, TranscriptData};
pub use merge::MergeOutcome;
pub use walk::{Descendants, WalkControl};

use crate::mask::Chain;
use crate::style::Style;
use crate::symbols::{Symbol, SymbolTable};
use crate::types::{FeatureMode, Level, SequenceKind, Span, Strand};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Structural misuse of the graph
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("Node {0} no longer exists")]
    StaleNode(NodeId),

    #[error("A {child} cannot be a child of a {parent}")]
    LevelMismatch { parent: Level, child: Level },

    #[error("Node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("Features cannot have children")]
    LeafHasChildren,

    #[error("Expected a {expected} node, found a {found}")]
    WrongLevel { expected: Level, found: Level },

    #[error("Expected a {expected:?} feature, found {found:?}")]
    WrongMode {
        expected: FeatureMode,
        found: FeatureMode,
    },

    #[error("Parent already holds a child with id {0:?}")]
    DuplicateChild(String),

    #[error("{span} lies outside {bounds}")]
    OutOfRange { span: Span, bounds: Span },

    #[error("Feature at {0} carries no variation string")]
    NotAVariation(Span),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Handle to a node; stale once the node is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextData {
    pub sequence_name: Option<Symbol>,
    pub parent_span: Span,
    pub(crate) master_align: Option<NodeId>,
    /// Every featureset name the context knows about
    pub feature_set_names: Vec<Symbol>,
    /// Featuresets requested for the current merge cycle
    pub req_featureset_names: Vec<Symbol>,
    /// Featuresets that received data in the current merge cycle
    pub src_featureset_names: Vec<Symbol>,
    /// Nodes displaced by the current merge cycle, destroyed when it ends
    pub elements_to_destroy: Vec<NodeId>,
}

impl ContextData {
    pub fn master_align(&self) -> Option<NodeId> {
        self.master_align
    }

    fn clear_scratch(&mut self) {
        self.req_featureset_names.clear();
        self.src_featureset_names.clear();
        self.elements_to_destroy.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlignmentData {
    pub sequence_span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct BlockSequence {
    pub kind: SequenceKind,
    pub sequence: String,
}

#[derive(Debug, Clone, Default)]
pub struct BlockData {
    /// Reference coordinates covered by the block
    pub span: Span,
    pub strand: Strand,
    /// Where the block sits on the parent (non-reference) sequence
    pub parent_span: Span,
    pub parent_strand: Strand,
    pub sequence: Option<BlockSequence>,
}

impl BlockData {
    pub fn has_dna(&self) -> bool {
        matches!(&self.sequence, Some(seq) if seq.kind == SequenceKind::Dna && !seq.sequence.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureSetData {
    pub style: Option<Arc<Style>>,
    pub description: Option<String>,
    /// Regions already loaded into this featureset
    pub loaded: Vec<Span>,
    /// Chains built by the masking engine; dropped whenever membership changes
    pub(crate) masker_sorted: Option<Vec<Chain>>,
}

impl FeatureSetData {
    pub fn has_sorted_chains(&self) -> bool {
        self.masker_sorted.is_some()
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Context(ContextData),
    Alignment(AlignmentData),
    Block(BlockData),
    FeatureSet(FeatureSetData),
    Feature(Feature),
}

impl NodeData {
    fn empty(level: Level) -> Self {
        match level {
            Level::Context => NodeData::Context(ContextData::default()),
            Level::Alignment => NodeData::Alignment(AlignmentData::default()),
            Level::Block => NodeData::Block(BlockData::default()),
            Level::FeatureSet => NodeData::FeatureSet(FeatureSetData::default()),
            Level::Feature => NodeData::Feature(Feature::default()),
        }
    }

    pub fn level(&self) -> Level {
        match self {
            NodeData::Context(_) => Level::Context,
            NodeData::Alignment(_) => Level::Alignment,
            NodeData::Block(_) => Level::Block,
            NodeData::FeatureSet(_) => Level::FeatureSet,
            NodeData::Feature(_) => Level::Feature,
        }
    }

    /// Level-specific copy rules: scratch state and caches are not copied.
    fn copied(&self) -> Self {
        match self {
            NodeData::Context(ctx) => {
                let mut ctx = ctx.clone();
                ctx.master_align = None;
                ctx.clear_scratch();
                NodeData::Context(ctx)
            }
            NodeData::Alignment(data) => NodeData::Alignment(data.clone()),
            NodeData::Block(block) => NodeData::Block(BlockData {
                sequence: None,
                ..block.clone()
            }),
            NodeData::FeatureSet(set) => NodeData::FeatureSet(FeatureSetData {
                masker_sorted: None,
                ..set.clone()
            }),
            NodeData::Feature(feature) => {
                let mut feature = feature.clone();
                feature.style_slot = None;
                NodeData::Feature(feature)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    original_id: Symbol,
    unique_id: Symbol,
    parent: Option<NodeId>,
    children: IndexMap<Symbol, NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn level(&self) -> Level {
        self.data.level()
    }

    pub fn original_id(&self) -> Symbol {
        self.original_id
    }

    pub fn unique_id(&self) -> Symbol {
        self.unique_id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn as_feature(&self) -> Option<&Feature> {
        match &self.data {
            NodeData::Feature(feature) => Some(feature),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena holding any number of context trees plus detached nodes.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    symbols: SymbolTable,
    live: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.symbols.resolve(sym)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn get(&self, id: NodeId) -> GraphResult<&Node> {
        self.node(id).ok_or(GraphError::StaleNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        self.node_mut(id).ok_or(GraphError::StaleNode(id))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Creates a node at `level` with empty level data.
    ///
    /// A context ignores `parent`. For other levels a given parent adopts the
    /// node straight away, and any `children` are adopted by the new node.
    pub fn create(
        &mut self,
        level: Level,
        parent: Option<NodeId>,
        original_id: &str,
        unique_id: &str,
        children: Option<Vec<NodeId>>,
    ) -> GraphResult<NodeId> {
        let children = children.unwrap_or_default();
        self.check_adoptable(level, &children)?;
        let original_id = self.symbols.intern(original_id);
        let unique_id = self.symbols.intern(unique_id);
        let id = self.alloc(Node {
            original_id,
            unique_id,
            parent: None,
            children: IndexMap::new(),
            data: NodeData::empty(level),
        });

        let attached = match parent {
            Some(parent) if level != Level::Context => self.add_child(parent, id).and_then(|added| {
                if added {
                    Ok(())
                } else {
                    Err(GraphError::DuplicateChild(self.resolve(unique_id).to_string()))
                }
            }),
            _ => Ok(()),
        };
        if let Err(err) = attached {
            self.release(id);
            return Err(err);
        }

        for child in children {
            self.add_child(id, child)?;
        }
        Ok(id)
    }

    /// Fails unless every node in `children` could be adopted by a new
    /// node at `level`, so `create` never leaves a half-built node behind.
    fn check_adoptable(&self, level: Level, children: &[NodeId]) -> GraphResult<()> {
        if children.is_empty() {
            return Ok(());
        }
        let Some(child_level) = level.child() else {
            return Err(GraphError::LeafHasChildren);
        };
        for &child in children {
            let node = self.get(child)?;
            if node.level() != child_level {
                return Err(GraphError::LevelMismatch {
                    parent: level,
                    child: node.level(),
                });
            }
            if node.parent.is_some() {
                return Err(GraphError::AlreadyAttached(child));
            }
        }
        Ok(())
    }

    /// Creates a feature node, deriving nothing: ids are taken as given.
    pub fn create_feature(
        &mut self,
        parent: Option<NodeId>,
        original_id: &str,
        unique_id: &str,
        feature: Feature,
    ) -> GraphResult<NodeId> {
        let id = self.create(Level::Feature, None, original_id, unique_id, None)?;
        if let Some(NodeData::Feature(slot)) = self.node_mut(id).map(|node| &mut node.data) {
            *slot = feature;
        }
        if let Some(parent) = parent {
            match self.add_child(parent, id) {
                Ok(true) => {}
                Ok(false) => {
                    self.release(id);
                    return Err(GraphError::DuplicateChild(unique_id.to_string()));
                }
                Err(err) => {
                    self.release(id);
                    return Err(err);
                }
            }
        }
        Ok(id)
    }

    /// Attaches `child` under `parent`. Returns `Ok(false)` when the parent
    /// already has a child with the same unique id.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> GraphResult<bool> {
        let (child_level, child_key, child_parent) = {
            let node = self.get(child)?;
            (node.level(), node.unique_id, node.parent)
        };
        let parent_node = self.get(parent)?;
        let parent_level = parent_node.level();
        if parent_level.child() != Some(child_level) {
            return Err(GraphError::LevelMismatch {
                parent: parent_level,
                child: child_level,
            });
        }
        if parent_node.children.contains_key(&child_key) {
            return Ok(false);
        }
        if child_parent.is_some() {
            return Err(GraphError::AlreadyAttached(child));
        }

        let parent_node = self.get_mut(parent)?;
        parent_node.children.insert(child_key, child);
        if let NodeData::FeatureSet(set) = &mut parent_node.data {
            set.masker_sorted = None;
        }

        let child_node = self.get_mut(child)?;
        child_node.parent = Some(parent);
        if let NodeData::Feature(feature) = &mut child_node.data {
            feature.style_slot = Some(parent);
        }
        Ok(true)
    }

    /// Child of `parent` with the given unique id.
    pub fn find_child(&self, parent: NodeId, unique_id: Symbol) -> Option<NodeId> {
        self.node(parent)?.children.get(&unique_id).copied()
    }

    /// [`Graph::find_child`] by name, without interning.
    pub fn find_child_named(&self, parent: NodeId, unique_id: &str) -> Option<NodeId> {
        let sym = self.symbols.get(unique_id)?;
        self.find_child(parent, sym)
    }

    /// Detaches `child` from `parent` without destroying it. The caller owns
    /// the returned subtree.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> GraphResult<bool> {
        let key = self.get(child)?.unique_id;
        let parent_node = self.get_mut(parent)?;
        if parent_node.children.get(&key) != Some(&child) {
            return Ok(false);
        }
        parent_node.children.shift_remove(&key);
        match &mut parent_node.data {
            NodeData::Context(ctx) if ctx.master_align == Some(child) => ctx.master_align = None,
            NodeData::FeatureSet(set) => set.masker_sorted = None,
            _ => {}
        }

        let child_node = self.get_mut(child)?;
        child_node.parent = None;
        if let NodeData::Feature(feature) = &mut child_node.data {
            feature.style_slot = None;
        }
        Ok(true)
    }

    /// Detaches `node` from whatever parent it has.
    pub fn detach(&mut self, node: NodeId) -> GraphResult<()> {
        if let Some(parent) = self.get(node)?.parent {
            self.remove(parent, node)?;
        }
        Ok(())
    }

    /// Copies a single node: same ids and level data, no parent, no
    /// children. Scratch lists, cached chains and block sequence are not
    /// carried over; feature payloads are deep-copied.
    pub fn copy(&mut self, node: NodeId) -> GraphResult<NodeId> {
        let source = self.get(node)?;
        let copy = Node {
            original_id: source.original_id,
            unique_id: source.unique_id,
            parent: None,
            children: IndexMap::new(),
            data: source.data.copied(),
        };
        Ok(self.alloc(copy))
    }

    /// Copies `node` and its whole subtree.
    pub fn copy_tree(&mut self, node: NodeId) -> GraphResult<NodeId> {
        let root = self.copy(node)?;
        let children: Vec<NodeId> = self.get(node)?.children().collect();
        for child in children {
            let child_copy = self.copy_tree(child)?;
            self.add_child(root, child_copy)?;
        }
        Ok(root)
    }

    /// Destroys `node` after detaching it from its parent.
    ///
    /// With `free_children` the whole subtree goes; otherwise the children
    /// are left alive as detached roots for the caller to reuse.
    pub fn destroy(&mut self, node: NodeId, free_children: bool) -> GraphResult<()> {
        self.detach(node)?;
        let released = self.release(node).ok_or(GraphError::StaleNode(node))?;

        if let NodeData::Context(ctx) = &released.data {
            for pending in &ctx.elements_to_destroy {
                if self.contains(*pending) {
                    self.destroy(*pending, true)?;
                }
            }
        }

        let mut stack: Vec<NodeId> = released.children.values().copied().collect();
        if !free_children {
            for child in stack {
                if let Some(child_node) = self.node_mut(child) {
                    child_node.parent = None;
                    if let NodeData::Feature(feature) = &mut child_node.data {
                        feature.style_slot = None;
                    }
                }
            }
            return Ok(());
        }
        while let Some(id) = stack.pop() {
            if let Some(gone) = self.release(id) {
                stack.extend(gone.children.values().copied());
            }
        }
        Ok(())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    /// Nearest node at `level` on the path from `node` to the root,
    /// including `node` itself.
    pub fn ancestor_at(&self, node: NodeId, level: Level) -> Option<NodeId> {
        let mut current = node;
        loop {
            let n = self.node(current)?;
            if n.level() == level {
                return Some(current);
            }
            if n.level() < level {
                return None;
            }
            current = n.parent?;
        }
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| n.children().collect())
            .unwrap_or_default()
    }

    pub fn unique_name(&self, node: NodeId) -> &str {
        self.node(node)
            .map(|n| self.resolve(n.unique_id))
            .unwrap_or("")
    }

    pub fn original_name(&self, node: NodeId) -> &str {
        self.node(node)
            .map(|n| self.resolve(n.original_id))
            .unwrap_or("")
    }

    fn wrong_level(&self, id: NodeId, expected: Level) -> GraphError {
        match self.node(id) {
            Some(node) => GraphError::WrongLevel {
                expected,
                found: node.level(),
            },
            None => GraphError::StaleNode(id),
        }
    }

    pub fn context(&self, id: NodeId) -> GraphResult<&ContextData> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Context(ctx)) => Ok(ctx),
            _ => Err(self.wrong_level(id, Level::Context)),
        }
    }

    pub fn context_mut(&mut self, id: NodeId) -> GraphResult<&mut ContextData> {
        let err = self.wrong_level(id, Level::Context);
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Context(ctx)) => Ok(ctx),
            _ => Err(err),
        }
    }

    pub fn alignment(&self, id: NodeId) -> GraphResult<&AlignmentData> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Alignment(data)) => Ok(data),
            _ => Err(self.wrong_level(id, Level::Alignment)),
        }
    }

    pub fn block(&self, id: NodeId) -> GraphResult<&BlockData> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Block(block)) => Ok(block),
            _ => Err(self.wrong_level(id, Level::Block)),
        }
    }

    pub fn block_mut(&mut self, id: NodeId) -> GraphResult<&mut BlockData> {
        let err = self.wrong_level(id, Level::Block);
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Block(block)) => Ok(block),
            _ => Err(err),
        }
    }

    pub fn featureset(&self, id: NodeId) -> GraphResult<&FeatureSetData> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::FeatureSet(set)) => Ok(set),
            _ => Err(self.wrong_level(id, Level::FeatureSet)),
        }
    }

    pub fn featureset_mut(&mut self, id: NodeId) -> GraphResult<&mut FeatureSetData> {
        let err = self.wrong_level(id, Level::FeatureSet);
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(NodeData::FeatureSet(set)) => Ok(set),
            _ => Err(err),
        }
    }

    pub fn feature(&self, id: NodeId) -> GraphResult<&Feature> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Feature(feature)) => Ok(feature),
            _ => Err(self.wrong_level(id, Level::Feature)),
        }
    }

    /// Mutable feature access. Drops the containing featureset's cached
    /// chains since coordinates may change.
    pub fn feature_mut(&mut self, id: NodeId) -> GraphResult<&mut Feature> {
        let err = self.wrong_level(id, Level::Feature);
        if let Some(parent) = self.parent(id) {
            if let Ok(set) = self.featureset_mut(parent) {
                set.masker_sorted = None;
            }
        }
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Feature(feature)) => Ok(feature),
            _ => Err(err),
        }
    }

    /// Flags an alignment feature as masked or not. Flag changes leave
    /// membership alone, so the featureset's chain cache survives.
    pub fn set_feature_masked(&mut self, id: NodeId, masked: bool) -> GraphResult<bool> {
        let err = self.wrong_level(id, Level::Feature);
        match self.node_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Feature(feature)) => Ok(feature.set_masked(masked)),
            _ => Err(err),
        }
    }

    /// Style a feature is drawn with, via its featureset.
    pub fn style_of(&self, feature: NodeId) -> Option<&Arc<Style>> {
        let slot = self.feature(feature).ok()?.style_slot?;
        self.featureset(slot).ok()?.style.as_ref()
    }

    /// Marks `align` as the reference alignment of `context`.
    pub fn set_master_align(&mut self, context: NodeId, align: NodeId) -> GraphResult<()> {
        if self.parent(align) != Some(context) {
            return Err(GraphError::NotAChild {
                parent: context,
                child: align,
            });
        }
        self.context_mut(context)?.master_align = Some(align);
        Ok(())
    }

    /// True when any block under `root` carries DNA.
    pub fn has_dna(&self, root: NodeId) -> bool {
        self.descendants(root)
            .any(|id| matches!(self.block(id), Ok(block) if block.has_dna()))
    }
}
