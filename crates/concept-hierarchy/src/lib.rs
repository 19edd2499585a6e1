//! # concept-hierarchy
//!
//! Directed concept graphs annotated with per-cohort prevalence metrics.
//!
//! Hierarchies are built from the rows of a concept prevalence query
//! (see `cohort_sql::build_concept_prevalence_query`), merged across
//! cohorts, walked and serialized into nested documents. A
//! [`HierarchyService`] owns the cache that guarantees one shared instance
//! per build key and per merge.
//!
//! ## Quick Start
//!
//! ```rust
//! use cohort_model::PrevalenceRow;
//! use concept_hierarchy::{HierarchyScope, HierarchyService, TraversalOrder};
//!
//! let service = HierarchyService::new();
//! let scope = HierarchyScope::new("condition_occurrence", 0, None);
//! let rows = vec![
//!     PrevalenceRow::new(Some(1), 1, "Clinical finding", "404684003", 5, 0.5),
//!     PrevalenceRow::new(Some(1), 2, "Disorder", "64572001", 2, 0.2),
//! ];
//!
//! let hierarchy = service.build_concept_hierarchy("1", &scope, &rows);
//! let ids: Vec<i64> = hierarchy
//!     .iter_nodes(1, TraversalOrder::Bfs)
//!     .unwrap()
//!     .map(|node| node.id())
//!     .collect();
//! assert_eq!(ids, vec![1, 2]);
//!
//! let document = hierarchy.to_document(None, true).unwrap();
//! assert_eq!(document.hierarchy[0].concept_name, "Clinical finding");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cache;
mod document;
mod error;
mod graph;
mod metrics;
mod node;
mod service;
mod traversal;

pub use cache::{CacheConfig, CacheStats, HierarchyCache};
pub use document::{HierarchyDocument, MetricsDocument, NodeDocument};
pub use error::{HierarchyError, HierarchyResult};
pub use graph::{normalize_identifier, ConceptHierarchy};
pub use metrics::{CohortMetrics, MetricsByCohort};
pub use node::ConceptNode;
pub use service::{HierarchyScope, HierarchyService};
pub use traversal::{NodeIter, TraversalOrder};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _: Option<ConceptHierarchy> = None;
        let _: Option<HierarchyDocument> = None;
        let _: Option<HierarchyResult<()>> = None;
        let _ = HierarchyService::with_config(CacheConfig::bounded(4));
        assert_eq!(normalize_identifier("2+1"), "1+2");
    }
}
