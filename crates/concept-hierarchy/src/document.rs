//! Serializable hierarchy documents.

use cohort_model::ConceptId;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{HierarchyError, HierarchyResult};
use crate::graph::ConceptHierarchy;
use crate::metrics::CohortMetrics;

/// Metrics of one node, in display order.
///
/// Serialized as a JSON object whose keys keep insertion order: the
/// optional `union` aggregate first, then cohort keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsDocument {
    entries: Vec<(String, CohortMetrics)>,
}

impl MetricsDocument {
    pub(crate) fn push(&mut self, key: impl Into<String>, metrics: CohortMetrics) {
        self.entries.push((key.into(), metrics));
    }

    /// Metrics stored under `key`.
    pub fn get(&self, key: &str) -> Option<&CohortMetrics> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, metrics)| metrics)
    }

    /// Keys in serialization order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MetricsDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, metrics) in &self.entries {
            map.serialize_entry(key, metrics)?;
        }
        map.end()
    }
}

/// One serialized concept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDocument {
    /// Concept id.
    pub concept_id: ConceptId,
    /// Concept name.
    pub concept_name: String,
    /// Vocabulary code.
    pub concept_code: String,
    /// Per-cohort metrics, optionally led by a `union` aggregate.
    pub metrics: MetricsDocument,
    /// Cohort keys contributing metrics.
    pub source_cohorts: Vec<String>,
    /// Ids of direct ancestors.
    pub parent_ids: Vec<ConceptId>,
    /// Serialized descendants, absent when children were not requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeDocument>>,
}

/// A serialized forest of concepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyDocument {
    /// One entry per root, or the single requested subtree.
    pub hierarchy: Vec<NodeDocument>,
}

impl HierarchyDocument {
    /// Converts the document into a JSON value.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl ConceptHierarchy {
    /// Serializes the hierarchy as nested documents.
    ///
    /// With `root_id` the document holds only the subtree rooted there;
    /// otherwise it holds one tree per root node. A node reachable along
    /// several paths appears once under each path.
    pub fn to_document(
        &self,
        root_id: Option<ConceptId>,
        include_union_metrics: bool,
    ) -> HierarchyResult<HierarchyDocument> {
        let hierarchy = match root_id {
            Some(id) => {
                let root = self
                    .get_node(id)
                    .ok_or(HierarchyError::SubHierarchyRootNotFound(id))?;
                vec![root.to_document(true, include_union_metrics)]
            }
            None => self
                .get_root_nodes()
                .iter()
                .map(|root| root.to_document(true, include_union_metrics))
                .collect(),
        };
        Ok(HierarchyDocument { hierarchy })
    }

    /// Root concepts serialized without children.
    pub fn root_documents(&self) -> Vec<NodeDocument> {
        self.get_root_nodes()
            .iter()
            .map(|node| node.to_document(false, false))
            .collect()
    }

    /// Leaf concepts serialized without children.
    pub fn leaf_documents(&self) -> Vec<NodeDocument> {
        self.get_leaf_nodes()
            .iter()
            .map(|node| node.to_document(false, false))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> NodeDocument {
        let mut metrics = MetricsDocument::default();
        metrics.push("union", CohortMetrics::new(7, 0.35));
        metrics.push("2", CohortMetrics::new(3, 0.3));
        metrics.push("10", CohortMetrics::new(4, 0.4));
        NodeDocument {
            concept_id: 2,
            concept_name: "Disorder".into(),
            concept_code: "64572001".into(),
            metrics,
            source_cohorts: vec!["2".into(), "10".into()],
            parent_ids: vec![1],
            children: None,
        }
    }

    #[test]
    fn test_metrics_keep_insertion_order() {
        let json = serde_json::to_string(&leaf().metrics).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"union":{"count":7,"prevalence":0.35},"#,
                r#""2":{"count":3,"prevalence":0.3},"10":{"count":4,"prevalence":0.4}}"#
            )
        );
    }

    #[test]
    fn test_children_omitted_when_absent() {
        let value = serde_json::to_value(leaf()).unwrap();
        assert!(value.get("children").is_none());
        assert_eq!(value["parent_ids"], serde_json::json!([1]));
        assert_eq!(value["source_cohorts"], serde_json::json!(["2", "10"]));
    }

    fn diamond() -> ConceptHierarchy {
        use cohort_model::PrevalenceRow;
        let rows = [
            PrevalenceRow::new(Some(1), 1, "Top", "T", 9, 0.9),
            PrevalenceRow::new(Some(1), 2, "Left", "L", 4, 0.4),
            PrevalenceRow::new(Some(1), 3, "Right", "R", 5, 0.5),
            PrevalenceRow::new(Some(2), 4, "Bottom", "B", 1, 0.1),
            PrevalenceRow::new(Some(3), 4, "Bottom", "B", 1, 0.1),
        ];
        ConceptHierarchy::from_rows("1", "s", &rows)
    }

    #[test]
    fn test_to_document_repeats_shared_descendants_per_path() {
        let document = diamond().to_document(None, false).unwrap();
        assert_eq!(document.hierarchy.len(), 1);

        let top = &document.hierarchy[0];
        let children = top.children.as_ref().unwrap();
        assert_eq!(children.len(), 2);
        for child in children {
            let grandchildren = child.children.as_ref().unwrap();
            assert_eq!(grandchildren.len(), 1);
            assert_eq!(grandchildren[0].concept_id, 4);
            assert_eq!(grandchildren[0].parent_ids, vec![2, 3]);
        }
    }

    #[test]
    fn test_to_document_subtree() {
        let document = diamond().to_document(Some(3), true).unwrap();
        assert_eq!(document.hierarchy.len(), 1);
        assert_eq!(document.hierarchy[0].concept_name, "Right");
        assert_eq!(document.hierarchy[0].metrics.keys(), vec!["union", "1"]);
    }

    #[test]
    fn test_to_document_unknown_root() {
        let err = diamond().to_document(Some(99), false).unwrap_err();
        assert!(matches!(err, HierarchyError::SubHierarchyRootNotFound(99)));
    }

    #[test]
    fn test_root_and_leaf_documents_have_no_children() {
        let hierarchy = diamond();
        let roots = hierarchy.root_documents();
        let leaves = hierarchy.leaf_documents();
        assert_eq!(roots.len(), 1);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].concept_name, "Bottom");
        assert!(roots[0].children.is_none());
    }

    #[test]
    fn test_hierarchy_document_json() {
        let document = HierarchyDocument {
            hierarchy: vec![leaf()],
        };
        let value = document.to_json().unwrap();
        assert_eq!(value["hierarchy"][0]["concept_name"], "Disorder");
        assert_eq!(value["hierarchy"][0]["metrics"]["union"]["count"], 7);
    }
}
