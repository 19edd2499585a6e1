//! Error types for cohort query compilation and execution.

use thiserror::Error;

/// Errors raised while building SQL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A table, column or alias name is not a plain SQL identifier.
    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Prevalence queries only run against registered domains.
    #[error("Invalid concept_type: {concept_type}. Must be one of {valid:?}")]
    InvalidConceptType {
        /// Requested concept type.
        concept_type: String,
        /// Registered domain tags.
        valid: Vec<String>,
    },
}

/// Result type for compilation.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Errors raised by compile-then-execute helpers.
#[derive(Error, Debug)]
pub enum CohortError {
    /// The query could not be built.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// The execution collaborator rejected the query.
    #[error("Execution error: {0}")]
    Execution(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CohortError {
    /// Wraps an execution collaborator error.
    pub fn execution<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Execution(Box::new(err))
    }
}
