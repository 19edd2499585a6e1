//! Configuration types for the cohort query compiler.

use cohort_model::DomainRegistry;

use crate::sql::SqlDialect;

/// Configuration for [`CohortQueryCompiler`](crate::CohortQueryCompiler).
///
/// Defaults target an OMOP CDM in the search path, rendered for PostgreSQL.
///
/// # Example
///
/// ```rust
/// use cohort_sql::{CompilerConfig, SqlDialect};
///
/// let config = CompilerConfig::builder()
///     .with_dialect(SqlDialect::DuckDb)
///     .with_person_table("cdm.person")
///     .with_cohort_table("results.cohort")
///     .build();
///
/// assert_eq!(config.dialect, SqlDialect::DuckDb);
/// assert_eq!(config.person_table, "cdm.person");
/// ```
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Clinical domains available to criteria.
    pub registry: DomainRegistry,
    /// Target SQL dialect.
    pub dialect: SqlDialect,
    /// Person table.
    pub person_table: String,
    /// Cohort membership table read by prevalence queries.
    pub cohort_table: String,
    /// Vocabulary concept table.
    pub concept_table: String,
    /// Vocabulary ancestry table.
    pub concept_ancestor_table: String,
}

impl CompilerConfig {
    /// Creates a new builder for CompilerConfig.
    pub fn builder() -> CompilerConfigBuilder {
        CompilerConfigBuilder::default()
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for CompilerConfig.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfigBuilder {
    registry: Option<DomainRegistry>,
    dialect: SqlDialect,
    person_table: Option<String>,
    cohort_table: Option<String>,
    concept_table: Option<String>,
    concept_ancestor_table: Option<String>,
}

impl CompilerConfigBuilder {
    /// Replaces the domain registry.
    pub fn with_registry(mut self, registry: DomainRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the SQL dialect.
    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the person table name.
    pub fn with_person_table(mut self, table: impl Into<String>) -> Self {
        self.person_table = Some(table.into());
        self
    }

    /// Sets the cohort table name.
    pub fn with_cohort_table(mut self, table: impl Into<String>) -> Self {
        self.cohort_table = Some(table.into());
        self
    }

    /// Sets the concept table name.
    pub fn with_concept_table(mut self, table: impl Into<String>) -> Self {
        self.concept_table = Some(table.into());
        self
    }

    /// Sets the concept_ancestor table name.
    pub fn with_concept_ancestor_table(mut self, table: impl Into<String>) -> Self {
        self.concept_ancestor_table = Some(table.into());
        self
    }

    /// Builds the CompilerConfig.
    pub fn build(self) -> CompilerConfig {
        CompilerConfig {
            registry: self.registry.unwrap_or_default(),
            dialect: self.dialect,
            person_table: self.person_table.unwrap_or_else(|| "person".to_string()),
            cohort_table: self.cohort_table.unwrap_or_else(|| "cohort".to_string()),
            concept_table: self.concept_table.unwrap_or_else(|| "concept".to_string()),
            concept_ancestor_table: self
                .concept_ancestor_table
                .unwrap_or_else(|| "concept_ancestor".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_config_default() {
        let config = CompilerConfig::default();
        assert_eq!(config.dialect, SqlDialect::Postgres);
        assert_eq!(config.person_table, "person");
        assert_eq!(config.cohort_table, "cohort");
        assert_eq!(config.concept_table, "concept");
        assert_eq!(config.concept_ancestor_table, "concept_ancestor");
        assert_eq!(config.registry.len(), 6);
    }

    #[test]
    fn test_compiler_config_builder() {
        let config = CompilerConfig::builder()
            .with_registry(DomainRegistry::empty())
            .with_dialect(SqlDialect::Sqlite)
            .with_concept_table("vocab.concept")
            .with_concept_ancestor_table("vocab.concept_ancestor")
            .build();

        assert!(config.registry.is_empty());
        assert_eq!(config.dialect, SqlDialect::Sqlite);
        assert_eq!(config.concept_table, "vocab.concept");
        assert_eq!(config.concept_ancestor_table, "vocab.concept_ancestor");
        assert_eq!(config.person_table, "person");
    }
}
