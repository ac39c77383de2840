//! Masking engine
//!
//! Flags alignment features whose footprint is wholly covered by another
//! featureset's features, typically ESTs covered by mRNAs. Features are
//! compared as chains: all features of a featureset sharing one original
//! name, i.e. the blocks of one gapped alignment.

use crate::graph::{Graph, GraphError, NodeId};
use crate::style::StyleProvider;
use crate::symbols::Symbol;
use crate::types::{FeatureMode, Level, Span};
use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during masking
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MaskError {
    #[error("No style for featureset {0}")]
    MissingStyle(String),

    #[error("Masker featureset {masker} for {featureset} not found in block")]
    MissingMasker { featureset: String, masker: String },

    #[error("Node {0} is not a featureset")]
    NotAFeatureSet(NodeId),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type MaskResult<T> = Result<T, MaskError>;

/// Same-name features of one featureset in start order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    /// Original id shared by every feature in the chain
    pub name: Symbol,
    pub features: Vec<NodeId>,
    pub spans: Vec<Span>,
    /// Envelope of the whole chain
    pub span: Span,
    pub masked: bool,
}

impl Chain {
    /// True when this chain's envelope and blocks cover `other`.
    pub fn covers(&self, other: &Chain, exact: bool) -> bool {
        self.span.covers(&other.span) && chain_covers(&other.spans, &self.spans, exact)
    }
}

/// Block-wise containment of a masked chain in a masker chain, both in
/// start order.
///
/// Every masked block must sit inside a masker block. In exact mode the
/// masked blocks must also land on consecutive masker blocks with matching
/// internal boundaries; only the outer ends of the chain may fall short.
/// A single-block chain needs plain containment in either mode.
pub fn chain_covers(masked: &[Span], masker: &[Span], exact: bool) -> bool {
    if masked.is_empty() || masker.is_empty() {
        return false;
    }

    if !exact || masked.len() == 1 {
        // Masker blocks may overlap, so any block starting at or before the
        // sub-feature can be the one that holds it.
        return masked.iter().all(|sub| {
            masker
                .iter()
                .take_while(|block| block.x1 <= sub.x1)
                .any(|block| block.covers(sub))
        });
    }

    let last = masked.len() - 1;
    let first = masked[0];
    let Some(start) = masker
        .iter()
        .position(|block| block.covers(&first) && block.x2 == first.x2)
    else {
        return false;
    };
    masked.iter().enumerate().skip(1).all(|(k, sub)| match masker.get(start + k) {
        Some(block) if k == last => block.x1 == sub.x1 && sub.x2 <= block.x2,
        Some(block) => block.x1 == sub.x1 && block.x2 == sub.x2,
        None => false,
    })
}

fn check_featureset(graph: &Graph, set: NodeId) -> MaskResult<()> {
    if graph.get(set)?.level() != Level::FeatureSet {
        return Err(MaskError::NotAFeatureSet(set));
    }
    Ok(())
}

/// Builds the featureset's chains, unless a valid cached set exists.
/// Returns the number of chains.
///
/// Only alignment features take part. Chains are ordered by envelope
/// start, longest first on ties.
pub fn sort_featureset(graph: &mut Graph, set: NodeId) -> MaskResult<usize> {
    check_featureset(graph, set)?;
    if let Some(chains) = &graph.featureset(set)?.masker_sorted {
        return Ok(chains.len());
    }

    let mut groups: IndexMap<Symbol, Vec<(Span, NodeId, bool)>> = IndexMap::new();
    for id in graph.children(set) {
        let node = graph.get(id)?;
        let Some(feature) = node.as_feature() else {
            continue;
        };
        if feature.mode() != FeatureMode::Alignment {
            continue;
        }
        groups
            .entry(node.original_id())
            .or_default()
            .push((feature.span(), id, feature.is_masked()));
    }

    let mut chains: Vec<Chain> = groups
        .into_iter()
        .map(|(name, mut members)| {
            members.sort_by_key(|(span, _, _)| (span.x1, span.x2));
            let x1 = members.iter().map(|(s, _, _)| s.x1).min().unwrap_or_default();
            let x2 = members.iter().map(|(s, _, _)| s.x2).max().unwrap_or_default();
            Chain {
                name,
                masked: members.iter().all(|(_, _, masked)| *masked),
                spans: members.iter().map(|(s, _, _)| *s).collect(),
                features: members.into_iter().map(|(_, id, _)| id).collect(),
                span: Span { x1, x2 },
            }
        })
        .collect();
    chains.sort_by(|a, b| a.span.x1.cmp(&b.span.x1).then(b.span.x2.cmp(&a.span.x2)));

    let count = chains.len();
    log::trace!("sorted {} into {} chains", graph.unique_name(set), count);
    graph.featureset_mut(set)?.masker_sorted = Some(chains);
    Ok(count)
}

/// The cached chains of a featureset, if it has been sorted.
pub fn sorted_chains(graph: &Graph, set: NodeId) -> Option<&[Chain]> {
    graph.featureset(set).ok()?.masker_sorted.as_deref()
}

/// Masks chains of `masked_set` covered by chains of `masker_set`.
/// Masking a set with itself uses exact matching and never lets a chain
/// mask itself. Returns the number of chains newly masked.
pub fn mask_set_with_set(graph: &mut Graph, masked_set: NodeId, masker_set: NodeId) -> MaskResult<usize> {
    sort_featureset(graph, masked_set)?;
    sort_featureset(graph, masker_set)?;
    let exact = masked_set == masker_set;
    log::debug!(
        "masking {} with {}{}",
        graph.unique_name(masked_set),
        graph.unique_name(masker_set),
        if exact { " (exact)" } else { "" }
    );

    let maskers = if exact {
        None
    } else {
        sorted_chains(graph, masker_set).map(<[Chain]>::to_vec)
    };
    let mut chains = graph
        .featureset_mut(masked_set)?
        .masker_sorted
        .take()
        .unwrap_or_default();

    let mut newly = Vec::new();
    for i in 0..chains.len() {
        if chains[i].masked {
            continue;
        }
        let target = &chains[i];
        let covered = match &maskers {
            Some(maskers) => maskers
                .iter()
                .take_while(|m| m.span.x1 <= target.span.x1)
                .any(|m| m.covers(target, false)),
            None => chains
                .iter()
                .enumerate()
                .take_while(|(_, m)| m.span.x1 <= target.span.x1)
                .any(|(j, m)| j != i && !m.masked && m.covers(target, true)),
        };
        if covered {
            chains[i].masked = true;
            newly.push(i);
        }
    }

    let mut result = Ok(newly.len());
    for &i in &newly {
        for &feature in &chains[i].features {
            if let Err(err) = graph.set_feature_masked(feature, true) {
                result = Err(err.into());
            }
        }
    }
    graph.featureset_mut(masked_set)?.masker_sorted = Some(chains);
    result
}

/// Outcome of a masking run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MaskReport {
    /// Featuresets already on display whose masking changed under them
    pub redisplay: Vec<String>,
    pub masked_chains: usize,
    /// Lookups that failed; the affected featuresets were left alone
    pub skipped: Vec<MaskError>,
}

impl MaskReport {
    fn skip(&mut self, err: MaskError) {
        if !self.skipped.contains(&err) {
            log::warn!("masking skipped: {}", err);
            self.skipped.push(err);
        }
    }
}

/// Masks a context after `new_featuresets` have been merged into it.
///
/// Featuresets masked only by themselves are handled first, then the rest
/// of the new featuresets against everything in their block, and finally
/// featuresets that were already present against the new masker data.
pub fn mask_featuresets(
    graph: &mut Graph,
    context: NodeId,
    new_featuresets: &[Symbol],
    styles: &dyn StyleProvider,
) -> MaskResult<MaskReport> {
    graph.context(context)?;
    let mut report = MaskReport::default();

    let mut priority: Vec<(String, Vec<String>)> = Vec::new();
    let mut queued: Vec<(String, Vec<String>)> = Vec::new();
    let mut maskers: HashSet<String> = HashSet::new();
    let mut new_ids: HashSet<String> = HashSet::new();

    for &sym in new_featuresets {
        let id = graph.resolve(sym).to_string();
        new_ids.insert(id.clone());
        let Some(style) = styles.style(&id) else {
            report.skip(MaskError::MissingStyle(id));
            continue;
        };
        if !style.is_masked() {
            maskers.insert(id);
            continue;
        }
        if style.masks_self() {
            maskers.insert(id.clone());
        }
        let masked_by = style.masker_ids(&id);
        if style.masks_only_self() {
            priority.push((id, masked_by));
        } else {
            queued.push((id, masked_by));
        }
    }

    let blocks = graph.nodes_at(context, Level::Block);

    // new featuresets against everything in their block
    for (id, masked_by) in priority.iter().chain(queued.iter()) {
        for &block in &blocks {
            let Some(set) = graph.find_child_named(block, id) else {
                continue;
            };
            for masker in masked_by {
                match graph.find_child_named(block, masker) {
                    Some(masker_set) => report.masked_chains += mask_set_with_set(graph, set, masker_set)?,
                    None => report.skip(MaskError::MissingMasker {
                        featureset: id.clone(),
                        masker: masker.clone(),
                    }),
                }
            }
        }
    }

    // existing featuresets against new maskers
    if !maskers.is_empty() {
        for set in graph.nodes_at(context, Level::FeatureSet) {
            let id = graph.unique_name(set).to_string();
            if new_ids.contains(&id) {
                continue;
            }
            let Some(style) = styles.style(&id) else {
                log::debug!("no style for existing featureset {}", id);
                continue;
            };
            let Some(block) = graph.parent(set) else {
                continue;
            };
            for masker in style.masker_ids(&id) {
                if !maskers.contains(&masker) {
                    continue;
                }
                if let Some(masker_set) = graph.find_child_named(block, &masker) {
                    report.masked_chains += mask_set_with_set(graph, set, masker_set)?;
                    if !report.redisplay.contains(&id) {
                        report.redisplay.push(id.clone());
                    }
                }
            }
        }
    }

    log::debug!(
        "masked {} chains, {} featuresets to redisplay",
        report.masked_chains,
        report.redisplay.len()
    );
    Ok(report)
}
