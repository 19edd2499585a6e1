//! Fetching hierarchies through the execution collaborator.

use std::cell::Cell;
use std::sync::Arc;

use cohort_model::{CohortMember, PrevalenceRow};
use cohort_sql::{CohortQueryCompiler, CompilerConfig, SqlDialect, SqlExecutor};
use concept_hierarchy::{HierarchyError, HierarchyScope, HierarchyService};
use rusqlite::Connection;

const FIXTURE: &str = "
CREATE TABLE condition_occurrence (
    person_id INTEGER, condition_concept_id INTEGER,
    condition_start_date TEXT, condition_end_date TEXT
);
CREATE TABLE concept (
    concept_id INTEGER PRIMARY KEY, concept_name TEXT, concept_code TEXT,
    vocabulary_id TEXT, domain_id TEXT
);
CREATE TABLE concept_ancestor (
    ancestor_concept_id INTEGER, descendant_concept_id INTEGER,
    min_levels_of_separation INTEGER
);
CREATE TABLE cohort (
    cohort_definition_id INTEGER, subject_id INTEGER,
    cohort_start_date TEXT, cohort_end_date TEXT
);
INSERT INTO condition_occurrence VALUES
    (1, 100, '2020-01-01', NULL), (2, 100, '2020-02-01', NULL),
    (3, 10, '2020-03-01', NULL), (4, 100, '2020-04-01', NULL);
INSERT INTO concept VALUES
    (1, 'SNOMED CT Concept', '138875005', 'SNOMED', 'Metadata'),
    (10, 'Clinical finding', '404684003', 'SNOMED', 'Condition'),
    (100, 'Diabetes mellitus', '73211009', 'SNOMED', 'Condition');
INSERT INTO concept_ancestor VALUES
    (1, 1, 0), (10, 10, 0), (100, 100, 0),
    (1, 10, 1), (10, 100, 1), (1, 100, 2);
INSERT INTO cohort VALUES
    (1, 1, NULL, NULL), (1, 2, NULL, NULL), (1, 3, NULL, NULL),
    (2, 3, NULL, NULL), (2, 4, NULL, NULL);
";

struct SqliteExecutor {
    conn: Connection,
    queries: Cell<usize>,
}

impl SqliteExecutor {
    fn new() -> Self {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(FIXTURE).unwrap();
        Self {
            conn,
            queries: Cell::new(0),
        }
    }
}

impl SqlExecutor for SqliteExecutor {
    type Error = rusqlite::Error;

    fn cohort_members(&self, _sql: &str) -> Result<Vec<CohortMember>, Self::Error> {
        Err(rusqlite::Error::InvalidQuery)
    }

    fn prevalence_rows(&self, sql: &str) -> Result<Vec<PrevalenceRow>, Self::Error> {
        self.queries.set(self.queries.get() + 1);
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(PrevalenceRow {
                ancestor_concept_id: row.get(0)?,
                descendant_concept_id: row.get(1)?,
                concept_name: row.get(2)?,
                concept_code: row.get(3)?,
                count_in_cohort: row.get(4)?,
                prevalence: row.get(5)?,
            })
        })?;
        rows.collect()
    }
}

fn compiler() -> CohortQueryCompiler {
    CohortQueryCompiler::new(CompilerConfig::builder().with_dialect(SqlDialect::Sqlite).build())
        .unwrap()
}

fn scope() -> HierarchyScope {
    HierarchyScope::new("condition_occurrence", 0, None)
}

#[test]
fn test_fetch_builds_hierarchy_from_prevalence_rows() {
    let service = HierarchyService::new();
    let executor = SqliteExecutor::new();
    let hierarchy = service
        .fetch_concept_hierarchy(&compiler(), &executor, 1, &scope())
        .unwrap();

    assert_eq!(hierarchy.identifier(), "1");
    assert_eq!(hierarchy.len(), 3);
    let chain: Vec<i64> = hierarchy.get_root_nodes().iter().map(|n| n.id()).collect();
    assert_eq!(chain, vec![1]);
    assert_eq!(hierarchy.get_node(10).unwrap().child_ids(), vec![100]);

    // persons 1 and 2 have diabetes; person 3 only the parent finding
    let diabetes = hierarchy.get_node(100).unwrap().metrics("1").copied().unwrap();
    assert_eq!(diabetes.count, 2);
    let finding = hierarchy.get_node(10).unwrap().metrics("1").copied().unwrap();
    assert_eq!(finding.count, 3);
    assert!((finding.prevalence - 1.0).abs() < 1e-9);
}

#[test]
fn test_fetch_uses_cache_before_executor() {
    let service = HierarchyService::new();
    let executor = SqliteExecutor::new();
    let first = service
        .fetch_concept_hierarchy(&compiler(), &executor, 1, &scope())
        .unwrap();
    let second = service
        .fetch_concept_hierarchy(&compiler(), &executor, 1, &scope())
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(executor.queries.get(), 1);
}

#[test]
fn test_fetch_two_cohorts_and_merge() {
    let service = HierarchyService::new();
    let executor = SqliteExecutor::new();
    let one = service
        .fetch_concept_hierarchy(&compiler(), &executor, 1, &scope())
        .unwrap();
    let two = service
        .fetch_concept_hierarchy(&compiler(), &executor, 2, &scope())
        .unwrap();

    let merged = service.union(&one, &two);
    let diabetes = merged.get_node(100).unwrap();
    assert_eq!(diabetes.source_cohorts(), vec!["1", "2"]);
    assert_eq!(diabetes.union_metrics().count, 3);
}

#[test]
fn test_fetch_unknown_domain_is_rejected() {
    let service = HierarchyService::new();
    let executor = SqliteExecutor::new();
    let scope = HierarchyScope::new("device_exposure", 0, None);
    let err = service
        .fetch_concept_hierarchy(&compiler(), &executor, 1, &scope)
        .unwrap_err();

    assert!(matches!(err, HierarchyError::Cohort(_)));
    assert_eq!(executor.queries.get(), 0);
    assert!(service.cache().is_empty());
}
