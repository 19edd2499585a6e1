//! The concept hierarchy graph.
//!
//! Concepts are stored once in a petgraph [`DiGraph`] with a side index from
//! concept id to [`NodeIndex`]. Edges point from ancestor to descendant.
//! Node views ([`ConceptNode`]) borrow the graph and resolve everything
//! through it.

use std::collections::{BTreeSet, HashMap};

use cohort_model::{ConceptId, PrevalenceRow};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use crate::metrics::{CohortMetrics, MetricsByCohort};
use crate::node::ConceptNode;

/// Node payload: concept metadata plus metrics per cohort key.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct ConceptData {
    pub(crate) concept_id: ConceptId,
    pub(crate) concept_name: String,
    pub(crate) concept_code: String,
    pub(crate) metrics: MetricsByCohort,
}

impl ConceptData {
    /// A concept only known as the ancestor of some row.
    fn placeholder(concept_id: ConceptId) -> Self {
        Self {
            concept_id,
            ..Self::default()
        }
    }
}

/// A directed concept graph annotated with per-cohort metrics.
///
/// The `identifier` is the sorted, deduplicated, `+`-joined set of cohort
/// keys the hierarchy was built or merged from. The `scope` records the
/// `(concept_type, filter_count, vocab)` the rows were queried with and keeps
/// unions of different query scopes apart in the cache.
#[derive(Debug, Clone)]
pub struct ConceptHierarchy {
    graph: DiGraph<ConceptData, ()>,
    index: HashMap<ConceptId, NodeIndex>,
    identifier: String,
    scope: String,
}

impl ConceptHierarchy {
    /// Creates an empty hierarchy.
    pub fn new(identifier: &str, scope: impl Into<String>) -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            identifier: normalize_identifier(identifier),
            scope: scope.into(),
        }
    }

    /// Builds a hierarchy from prevalence rows of one cohort.
    ///
    /// The first row seen for a descendant supplies its name, code and the
    /// cohort's metrics. Every row whose ancestor differs from its
    /// descendant adds an `ancestor -> descendant` edge; self rows only seed
    /// metrics. Ancestors that never appear as a descendant become bare
    /// nodes without metadata.
    pub fn from_rows(cohort_key: &str, scope: impl Into<String>, rows: &[PrevalenceRow]) -> Self {
        let mut hierarchy = Self::new(cohort_key, scope);
        let cohort_key = hierarchy.identifier.clone();

        for row in rows {
            if hierarchy.index.contains_key(&row.descendant_concept_id) {
                continue;
            }
            let mut metrics = MetricsByCohort::new();
            metrics.insert(
                cohort_key.clone(),
                CohortMetrics::new(row.count_in_cohort, row.prevalence),
            );
            hierarchy.insert_node(ConceptData {
                concept_id: row.descendant_concept_id,
                concept_name: row.concept_name.clone(),
                concept_code: row.concept_code.clone(),
                metrics,
            });
        }

        for row in rows.iter().filter(|row| row.is_edge()) {
            if let Some(ancestor) = row.ancestor_concept_id {
                hierarchy.add_edge(ancestor, row.descendant_concept_id);
            }
        }

        debug!(
            identifier = %hierarchy.identifier,
            rows = rows.len(),
            nodes = hierarchy.len(),
            edges = hierarchy.edge_count(),
            "built concept hierarchy"
        );
        hierarchy
    }

    /// Provenance label and cache key of this hierarchy.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Query scope the rows were fetched with.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Number of concepts.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the hierarchy has no concepts.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of ancestor/descendant edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns true if the concept is a node of the graph.
    pub fn contains(&self, concept_id: ConceptId) -> bool {
        self.index.contains_key(&concept_id)
    }

    /// Looks up a concept.
    pub fn get_node(&self, concept_id: ConceptId) -> Option<ConceptNode<'_>> {
        self.index
            .get(&concept_id)
            .map(|&index| ConceptNode::new(self, index))
    }

    /// All concepts in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = ConceptNode<'_>> + '_ {
        self.graph
            .node_indices()
            .map(move |index| ConceptNode::new(self, index))
    }

    /// Concepts without parents.
    pub fn get_root_nodes(&self) -> Vec<ConceptNode<'_>> {
        self.nodes()
            .filter(|node| self.degree(node.index(), Direction::Incoming) == 0)
            .collect()
    }

    /// Concepts without children.
    pub fn get_leaf_nodes(&self) -> Vec<ConceptNode<'_>> {
        self.nodes()
            .filter(|node| self.degree(node.index(), Direction::Outgoing) == 0)
            .collect()
    }

    /// Merges two hierarchies without consulting any cache.
    ///
    /// Nodes of `self` keep their position, nodes only in `other` follow.
    /// Metadata and same-cohort metrics of `other` win. Edges are unioned.
    pub fn merge(&self, other: &ConceptHierarchy) -> ConceptHierarchy {
        let identifier = format!("{}+{}", self.identifier, other.identifier);
        let scope = normalize_identifier(&format!("{}+{}", self.scope, other.scope));
        let mut merged = ConceptHierarchy::new(&identifier, scope);

        for source in [self, other] {
            for data in source.graph.node_weights() {
                match merged.index.get(&data.concept_id).copied() {
                    Some(index) => {
                        let target = &mut merged.graph[index];
                        if !data.concept_name.is_empty() || !data.concept_code.is_empty() {
                            target.concept_name.clone_from(&data.concept_name);
                            target.concept_code.clone_from(&data.concept_code);
                        }
                        target
                            .metrics
                            .extend(data.metrics.iter().map(|(k, v)| (k.clone(), *v)));
                    }
                    None => merged.insert_node(data.clone()),
                }
            }
        }

        for source in [self, other] {
            for edge in source.graph.raw_edges() {
                let ancestor = source.graph[edge.source()].concept_id;
                let descendant = source.graph[edge.target()].concept_id;
                merged.add_edge(ancestor, descendant);
            }
        }
        merged
    }

    pub(crate) fn data(&self, index: NodeIndex) -> &ConceptData {
        &self.graph[index]
    }

    /// Neighbours in the order their edges were added.
    pub(crate) fn neighbors(&self, index: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(index, direction).collect();
        // petgraph walks adjacency lists newest first
        neighbors.reverse();
        neighbors
    }

    pub(crate) fn index_of(&self, concept_id: ConceptId) -> Option<NodeIndex> {
        self.index.get(&concept_id).copied()
    }

    fn degree(&self, index: NodeIndex, direction: Direction) -> usize {
        self.graph.neighbors_directed(index, direction).count()
    }

    fn insert_node(&mut self, data: ConceptData) {
        let concept_id = data.concept_id;
        let index = self.graph.add_node(data);
        self.index.insert(concept_id, index);
    }

    fn ensure_node(&mut self, concept_id: ConceptId) -> NodeIndex {
        match self.index.get(&concept_id).copied() {
            Some(index) => index,
            None => {
                let index = self.graph.add_node(ConceptData::placeholder(concept_id));
                self.index.insert(concept_id, index);
                index
            }
        }
    }

    fn add_edge(&mut self, ancestor: ConceptId, descendant: ConceptId) {
        if ancestor == descendant {
            return;
        }
        let from = self.ensure_node(ancestor);
        let to = self.ensure_node(descendant);
        self.graph.update_edge(from, to, ());
    }
}

/// Canonical form of a `+`-joined identifier.
///
/// Parts are trimmed, empty parts dropped, duplicates removed and the rest
/// sorted, so `"2+1"` and `"1 + 2 + 2"` both become `"1+2"`.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier
        .split('+')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join("+")
}
