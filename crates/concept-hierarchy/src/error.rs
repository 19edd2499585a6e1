//! Error types for concept hierarchy lookups and builds.

use cohort_model::ConceptId;
use cohort_sql::CohortError;
use thiserror::Error;

/// Errors raised by hierarchy traversal, serialization and fetching.
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// Traversal root is not a node of the graph.
    #[error("Root node {0} not found in graph.")]
    RootNotFound(ConceptId),

    /// Traversal order token is neither `bfs` nor `dfs`.
    #[error("order must be 'bfs' or 'dfs', got '{0}'")]
    UnsupportedOrder(String),

    /// Sub-hierarchy root requested for serialization is unknown.
    #[error("Input concept id {0} not found in the concept hierarchy graph")]
    SubHierarchyRootNotFound(ConceptId),

    /// `union_all` was called without any hierarchy.
    #[error("union requires at least one hierarchy")]
    EmptyUnion,

    /// Building or running the prevalence query failed.
    #[error(transparent)]
    Cohort(#[from] CohortError),
}

/// Result type for hierarchy operations.
pub type HierarchyResult<T> = std::result::Result<T, HierarchyError>;
