//! In-memory OMOP fixture backed by SQLite.

#![allow(dead_code)]

use chrono::NaiveDate;
use cohort_model::{CohortMember, PrevalenceRow};
use cohort_sql::{CohortQueryCompiler, CompilerConfig, SqlDialect, SqlExecutor};
use rusqlite::Connection;

pub const DIABETES: i64 = 100;
pub const METFORMIN: i64 = 200;
pub const APPENDECTOMY: i64 = 300;
pub const INPATIENT_VISIT: i64 = 9201;

const SCHEMA: &str = "
CREATE TABLE person (
    person_id INTEGER PRIMARY KEY,
    gender_concept_id INTEGER,
    year_of_birth INTEGER,
    race_concept_id INTEGER,
    ethnicity_concept_id INTEGER
);
CREATE TABLE condition_occurrence (
    person_id INTEGER, condition_concept_id INTEGER,
    condition_start_date TEXT, condition_end_date TEXT
);
CREATE TABLE drug_exposure (
    person_id INTEGER, drug_concept_id INTEGER,
    drug_exposure_start_date TEXT, drug_exposure_end_date TEXT
);
CREATE TABLE visit_occurrence (
    person_id INTEGER, visit_concept_id INTEGER,
    visit_start_date TEXT, visit_end_date TEXT
);
CREATE TABLE procedure_occurrence (
    person_id INTEGER, procedure_concept_id INTEGER, procedure_date TEXT
);
CREATE TABLE measurement (
    person_id INTEGER, measurement_concept_id INTEGER, measurement_date TEXT
);
CREATE TABLE observation (
    person_id INTEGER, observation_concept_id INTEGER, observation_date TEXT
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
";

// Condition to drug gaps: p1 2 days, p2 6 days, p3 1 day, p5 5 days.
const DATA: &str = "
INSERT INTO person VALUES
    (1, 8507, 1960, 0, 0), (2, 8532, 1970, 0, 0), (3, 8532, 1985, 0, 0),
    (4, 8507, 1990, 0, 0), (5, 8532, 1955, 0, 0), (6, 8507, 2000, 0, 0);
INSERT INTO condition_occurrence VALUES
    (1, 100, '2020-01-01', '2020-01-10'),
    (2, 100, '2020-03-01', NULL),
    (3, 100, '2019-06-01', NULL),
    (5, 100, '2020-05-01', NULL);
INSERT INTO drug_exposure VALUES
    (1, 200, '2020-01-03', NULL),
    (2, 200, '2020-03-07', NULL),
    (3, 200, '2019-06-02', NULL),
    (4, 200, '2021-01-01', NULL),
    (5, 200, '2020-05-06', NULL);
INSERT INTO visit_occurrence VALUES
    (1, 9201, '2020-02-01', '2020-02-03'),
    (1, 9201, '2020-04-01', '2020-04-05'),
    (2, 9201, '2020-02-01', '2020-02-02'),
    (6, 9201, '2018-01-01', '2018-01-01');
INSERT INTO procedure_occurrence VALUES (6, 300, '2019-01-01');
INSERT INTO concept VALUES
    (1, 'SNOMED CT Concept', '138875005', 'SNOMED', 'Metadata'),
    (10, 'Clinical finding', '404684003', 'SNOMED', 'Condition'),
    (100, 'Diabetes mellitus', '73211009', 'SNOMED', 'Condition');
INSERT INTO concept_ancestor VALUES
    (1, 1, 0), (10, 10, 0), (100, 100, 0),
    (1, 10, 1), (10, 100, 1), (1, 100, 2);
INSERT INTO cohort VALUES
    (1, 1, NULL, NULL), (1, 2, NULL, NULL), (1, 3, NULL, NULL),
    (1, 5, NULL, NULL), (1, 6, NULL, NULL);
";

pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    pub fn with_fixture() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(DATA).unwrap();
        Self { conn }
    }
}

fn parse_date(value: Option<String>) -> Option<NaiveDate> {
    value.map(|text| NaiveDate::parse_from_str(&text, "%Y-%m-%d").unwrap())
}

impl SqlExecutor for SqliteExecutor {
    type Error = rusqlite::Error;

    fn cohort_members(&self, sql: &str) -> Result<Vec<CohortMember>, Self::Error> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(CohortMember {
                person_id: row.get(0)?,
                cohort_start_date: parse_date(row.get(1)?),
                cohort_end_date: parse_date(row.get(2)?),
            })
        })?;
        rows.collect()
    }

    fn prevalence_rows(&self, sql: &str) -> Result<Vec<PrevalenceRow>, Self::Error> {
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

pub fn sqlite_compiler() -> CohortQueryCompiler {
    CohortQueryCompiler::new(CompilerConfig::builder().with_dialect(SqlDialect::Sqlite).build())
        .unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn person_ids(members: &[CohortMember]) -> Vec<i64> {
    members.iter().map(|m| m.person_id).collect()
}
