//! Execution collaborator seam.
//!
//! This crate never talks to a database. Callers implement [`SqlExecutor`]
//! for their engine and hand it compiled SQL.

use cohort_model::{CohortCreationConfig, CohortMember, PrevalenceRow};
use tracing::info;

use crate::compiler::CohortQueryCompiler;
use crate::error::CohortError;

/// Runs SQL text and maps result rows.
///
/// Errors are surfaced as is; compiled queries are deterministic, so
/// callers should not retry them blindly.
pub trait SqlExecutor {
    /// Error type of the underlying engine.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs a cohort membership query.
    fn cohort_members(&self, sql: &str) -> Result<Vec<CohortMember>, Self::Error>;

    /// Runs a concept prevalence query.
    fn prevalence_rows(&self, sql: &str) -> Result<Vec<PrevalenceRow>, Self::Error>;
}

/// Compiles a cohort definition and executes it.
pub fn fetch_cohort<E: SqlExecutor>(
    compiler: &CohortQueryCompiler,
    executor: &E,
    config: &CohortCreationConfig,
) -> Result<Vec<CohortMember>, CohortError> {
    let sql = compiler.compile_config(config);
    let started = std::time::Instant::now();
    let members = executor.cohort_members(&sql).map_err(CohortError::execution)?;
    info!(
        members = members.len(),
        ms = started.elapsed().as_millis() as u64,
        "fetched cohort"
    );
    Ok(members)
}

/// Builds and executes a concept prevalence query.
pub fn fetch_prevalence_rows<E: SqlExecutor>(
    compiler: &CohortQueryCompiler,
    executor: &E,
    concept_type: &str,
    cohort_id: i64,
    filter_count: i64,
    vocab: Option<&str>,
) -> Result<Vec<PrevalenceRow>, CohortError> {
    let sql =
        compiler.build_concept_prevalence_query(concept_type, cohort_id, filter_count, vocab)?;
    let rows = executor.prevalence_rows(&sql).map_err(CohortError::execution)?;
    info!(concept_type, cohort_id, rows = rows.len(), "fetched concept prevalence");
    Ok(rows)
}
