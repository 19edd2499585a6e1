//! Read-only views of concepts inside a hierarchy.

use cohort_model::ConceptId;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use tracing::warn;

use crate::document::{MetricsDocument, NodeDocument};
use crate::graph::{ConceptData, ConceptHierarchy};
use crate::metrics::{sorted_cohort_keys, CohortMetrics, MetricsByCohort};

/// A concept in a [`ConceptHierarchy`].
///
/// The view owns nothing. Edges and metrics stay in the graph and are
/// resolved on access.
#[derive(Clone, Copy)]
pub struct ConceptNode<'a> {
    hierarchy: &'a ConceptHierarchy,
    index: NodeIndex,
}

impl<'a> ConceptNode<'a> {
    pub(crate) fn new(hierarchy: &'a ConceptHierarchy, index: NodeIndex) -> Self {
        Self { hierarchy, index }
    }

    pub(crate) fn index(&self) -> NodeIndex {
        self.index
    }

    fn data(&self) -> &'a ConceptData {
        self.hierarchy.data(self.index)
    }

    /// Concept id.
    pub fn id(&self) -> ConceptId {
        self.data().concept_id
    }

    /// Concept name, empty for concepts only seen as an ancestor.
    pub fn name(&self) -> &'a str {
        &self.data().concept_name
    }

    /// Vocabulary code of the concept.
    pub fn code(&self) -> &'a str {
        &self.data().concept_code
    }

    /// Direct ancestors.
    pub fn parents(&self) -> Vec<ConceptNode<'a>> {
        self.related(Direction::Incoming)
    }

    /// Direct descendants.
    pub fn children(&self) -> Vec<ConceptNode<'a>> {
        self.related(Direction::Outgoing)
    }

    /// Ids of the direct ancestors.
    pub fn parent_ids(&self) -> Vec<ConceptId> {
        self.parents().iter().map(ConceptNode::id).collect()
    }

    /// Ids of the direct descendants.
    pub fn child_ids(&self) -> Vec<ConceptId> {
        self.children().iter().map(ConceptNode::id).collect()
    }

    /// Metrics of one cohort, if that cohort observed the concept.
    pub fn metrics(&self, cohort_key: &str) -> Option<&'a CohortMetrics> {
        self.data().metrics.get(cohort_key)
    }

    /// Metrics of every contributing cohort.
    pub fn all_metrics(&self) -> &'a MetricsByCohort {
        &self.data().metrics
    }

    /// Aggregate over all contributing cohorts.
    pub fn union_metrics(&self) -> CohortMetrics {
        CohortMetrics::aggregate(self.data().metrics.values())
    }

    /// Cohort keys that contributed metrics, integers in numeric order.
    pub fn source_cohorts(&self) -> Vec<String> {
        sorted_cohort_keys(self.data().metrics.keys())
    }

    /// Serializes the concept, optionally with its full subtree.
    pub fn to_document(&self, include_children: bool, include_union_metrics: bool) -> NodeDocument {
        let mut path = Vec::new();
        self.document_on_path(include_children, include_union_metrics, &mut path)
    }

    fn document_on_path(
        &self,
        include_children: bool,
        include_union_metrics: bool,
        path: &mut Vec<NodeIndex>,
    ) -> NodeDocument {
        let source_cohorts = self.source_cohorts();
        let mut metrics = MetricsDocument::default();
        if include_union_metrics {
            metrics.push("union", self.union_metrics());
        }
        for key in &source_cohorts {
            if let Some(m) = self.metrics(key) {
                metrics.push(key.clone(), *m);
            }
        }

        let children = include_children.then(|| {
            path.push(self.index);
            let mut children = Vec::new();
            for child in self.children() {
                if path.contains(&child.index) {
                    warn!(
                        parent = self.id(),
                        child = child.id(),
                        "skipping cyclic edge while serializing"
                    );
                    continue;
                }
                children.push(child.document_on_path(true, include_union_metrics, path));
            }
            path.pop();
            children
        });

        NodeDocument {
            concept_id: self.id(),
            concept_name: self.name().to_string(),
            concept_code: self.code().to_string(),
            metrics,
            source_cohorts,
            parent_ids: self.parent_ids(),
            children,
        }
    }

    fn related(&self, direction: Direction) -> Vec<ConceptNode<'a>> {
        let hierarchy = self.hierarchy;
        hierarchy
            .neighbors(self.index, direction)
            .into_iter()
            .map(|index| ConceptNode::new(hierarchy, index))
            .collect()
    }
}

impl std::fmt::Debug for ConceptNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConceptNode")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("code", &self.code())
            .field("metrics", self.all_metrics())
            .finish()
    }
}

impl PartialEq for ConceptNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.hierarchy, other.hierarchy) && self.index == other.index
    }
}

impl Eq for ConceptNode<'_> {}
