//! Hierarchy service: the cached entry points for building and merging.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use cohort_model::PrevalenceRow;
use cohort_sql::{fetch_prevalence_rows, CohortQueryCompiler, SqlExecutor};
use tracing::info;

use crate::cache::{CacheConfig, CacheStats, HierarchyCache};
use crate::error::{HierarchyError, HierarchyResult};
use crate::graph::{normalize_identifier, ConceptHierarchy};

/// Parameters of the prevalence query a hierarchy was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HierarchyScope {
    /// Domain tag, e.g. `condition_occurrence`.
    pub concept_type: String,
    /// Concepts whose count is not above this were dropped.
    pub filter_count: i64,
    /// Vocabulary override, `None` for the domain default.
    pub vocab: Option<String>,
}

impl HierarchyScope {
    /// Creates a scope.
    pub fn new(concept_type: impl Into<String>, filter_count: i64, vocab: Option<&str>) -> Self {
        Self {
            concept_type: concept_type.into(),
            filter_count,
            vocab: vocab.map(str::to_string),
        }
    }

    /// Build cache key for one cohort under this scope.
    pub fn cache_key(&self, cohort_key: &str) -> String {
        format!("{}-{}", normalize_identifier(cohort_key), self)
    }
}

impl fmt::Display for HierarchyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.concept_type,
            self.filter_count,
            self.vocab.as_deref().unwrap_or("None")
        )
    }
}

/// Owns the hierarchy cache and hands out shared hierarchies.
///
/// Building twice under the same key, or merging the same two hierarchies
/// in either order, returns the same `Arc`.
#[derive(Debug, Default)]
pub struct HierarchyService {
    cache: HierarchyCache,
}

impl HierarchyService {
    /// Creates a service with an unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service with the given cache configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            cache: HierarchyCache::new(config),
        }
    }

    /// Builds the hierarchy of one cohort, or returns the cached one.
    pub fn build_concept_hierarchy(
        &self,
        cohort_key: &str,
        scope: &HierarchyScope,
        rows: &[PrevalenceRow],
    ) -> Arc<ConceptHierarchy> {
        let key = scope.cache_key(cohort_key);
        let started = Instant::now();
        let built = self.cache.get_or_build(&key, || {
            let hierarchy = ConceptHierarchy::from_rows(cohort_key, scope.to_string(), rows);
            info!(
                key = %key,
                nodes = hierarchy.len(),
                edges = hierarchy.edge_count(),
                ms = started.elapsed().as_millis() as u64,
                "built concept hierarchy"
            );
            Ok::<_, Infallible>(hierarchy)
        });
        match built {
            Ok(hierarchy) => hierarchy,
            Err(never) => match never {},
        }
    }

    /// Merges two hierarchies, or returns the cached merge.
    ///
    /// Merges are cached under `union:<cohort keys>|<scopes>`, both parts
    /// normalized like the merged identifier. The cohort key part equals
    /// the merged hierarchy's identifier; the scope part keeps merges of
    /// the same cohorts built from different prevalence queries apart.
    /// `union(a, b)` and `union(b, a)` therefore share one instance.
    pub fn union(&self, a: &ConceptHierarchy, b: &ConceptHierarchy) -> Arc<ConceptHierarchy> {
        let identifier = normalize_identifier(&format!("{}+{}", a.identifier(), b.identifier()));
        let scope = normalize_identifier(&format!("{}+{}", a.scope(), b.scope()));
        let key = format!("union:{identifier}|{scope}");
        let merged = self.cache.get_or_build(&key, || {
            let merged = a.merge(b);
            info!(
                identifier = %merged.identifier(),
                nodes = merged.len(),
                edges = merged.edge_count(),
                "merged concept hierarchies"
            );
            Ok::<_, Infallible>(merged)
        });
        match merged {
            Ok(hierarchy) => hierarchy,
            Err(never) => match never {},
        }
    }

    /// Folds [`union`](Self::union) over any number of hierarchies.
    ///
    /// Every intermediate merge is cached. A single hierarchy is returned
    /// unchanged.
    pub fn union_all(
        &self,
        hierarchies: &[Arc<ConceptHierarchy>],
    ) -> HierarchyResult<Arc<ConceptHierarchy>> {
        let (first, rest) = hierarchies
            .split_first()
            .ok_or(HierarchyError::EmptyUnion)?;
        Ok(rest
            .iter()
            .fold(Arc::clone(first), |acc, next| self.union(&acc, next)))
    }

    /// Runs the prevalence query for a cohort and builds its hierarchy.
    ///
    /// A cached hierarchy is returned without touching the executor.
    pub fn fetch_concept_hierarchy<E: SqlExecutor>(
        &self,
        compiler: &CohortQueryCompiler,
        executor: &E,
        cohort_id: i64,
        scope: &HierarchyScope,
    ) -> HierarchyResult<Arc<ConceptHierarchy>> {
        let cohort_key = cohort_id.to_string();
        if let Some(cached) = self.cache.get(&scope.cache_key(&cohort_key)) {
            return Ok(cached);
        }
        let rows = fetch_prevalence_rows(
            compiler,
            executor,
            &scope.concept_type,
            cohort_id,
            scope.filter_count,
            scope.vocab.as_deref(),
        )?;
        Ok(self.build_concept_hierarchy(&cohort_key, scope, &rows))
    }

    /// Drops every cached hierarchy.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Cache usage counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The underlying cache.
    pub fn cache(&self) -> &HierarchyCache {
        &self.cache
    }
}
