//! Display styles, as far as the core needs them.
//!
//! Styles live outside the graph; the masking engine reaches them through
//! [`StyleProvider`], keyed by canonical featureset id.

use crate::graph::ids::canonical_name;
use crate::graph::{Graph, NodeId};
use crate::types::{FeatureMode, Level};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Mask-list entry meaning "the featureset this style is attached to".
pub const SELF_MASKER: &str = "self";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,

    #[serde(default)]
    pub mode: FeatureMode,

    /// Featuresets whose data may mask features drawn with this style
    #[serde(default)]
    pub masked_by: Vec<String>,

    /// Query bases allowed to go missing between blocks of a perfect alignment
    #[serde(default)]
    pub align_error: u32,

    #[serde(default)]
    pub description: Option<String>,
}

impl Style {
    pub fn new(name: &str, mode: FeatureMode) -> Self {
        Self {
            name: name.to_string(),
            mode,
            masked_by: Vec::new(),
            align_error: 0,
            description: None,
        }
    }

    pub fn with_masked_by<I, S>(mut self, maskers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.masked_by = maskers.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> String {
        canonical_name(&self.name)
    }

    pub fn is_masked(&self) -> bool {
        !self.masked_by.is_empty()
    }

    pub fn masks_self(&self) -> bool {
        self.masked_by.iter().any(|m| m.eq_ignore_ascii_case(SELF_MASKER))
    }

    /// True when the mask list names nothing but `self`.
    pub fn masks_only_self(&self) -> bool {
        self.is_masked() && self.masked_by.iter().all(|m| m.eq_ignore_ascii_case(SELF_MASKER))
    }

    /// Mask list as canonical featureset ids, `self` replaced by `own_id`.
    pub fn masker_ids(&self, own_id: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.masked_by.len());
        for masker in &self.masked_by {
            let id = if masker.eq_ignore_ascii_case(SELF_MASKER) {
                own_id.to_string()
            } else {
                canonical_name(masker)
            };
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}

/// Source of styles for featuresets.
pub trait StyleProvider {
    fn style(&self, featureset_id: &str) -> Option<Arc<Style>>;
}

#[derive(Debug, Clone, Default)]
pub struct StyleRegistry {
    styles: HashMap<String, Arc<Style>>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_styles<I: IntoIterator<Item = Style>>(styles: I) -> Self {
        let mut registry = Self::new();
        for style in styles {
            registry.insert(style);
        }
        registry
    }

    /// Adds or replaces the style for its canonical id.
    pub fn insert(&mut self, style: Style) -> Option<Arc<Style>> {
        self.styles.insert(style.id(), Arc::new(style))
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Style>> {
        self.styles.values()
    }

    /// Mask-list entries that name no known style.
    pub fn unknown_maskers(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for style in self.styles.values() {
            for masker in style.masker_ids(&style.id()) {
                if !self.styles.contains_key(&masker) {
                    out.push((style.name.clone(), masker));
                }
            }
        }
        out.sort();
        out
    }

    /// Points every featureset under `root` at its style, where one exists.
    /// Returns how many featuresets were bound.
    pub fn bind(&self, graph: &mut Graph, root: NodeId) -> usize {
        let mut bound = 0;
        for set in graph.nodes_at(root, Level::FeatureSet) {
            let style = self.style(graph.unique_name(set));
            if let (Some(style), Ok(data)) = (style, graph.featureset_mut(set)) {
                data.style = Some(style);
                bound += 1;
            }
        }
        bound
    }
}

impl StyleProvider for StyleRegistry {
    fn style(&self, featureset_id: &str) -> Option<Arc<Style>> {
        self.styles.get(&canonical_name(featureset_id)).cloned()
    }
}
