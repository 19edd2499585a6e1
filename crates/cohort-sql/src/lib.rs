//! # cohort-sql
//!
//! Compiles nested temporal cohort criteria into a single SQL statement over
//! an OMOP CDM, and builds the concept prevalence queries that feed concept
//! hierarchies.
//!
//! ## Quick Start
//!
//! ```rust
//! use cohort_model::{CohortCreationCriteria, DayInterval, TemporalEvent, TemporalEventGroup};
//! use cohort_sql::{CohortQueryCompiler, CompilerConfig, SqlDialect};
//!
//! let compiler = CohortQueryCompiler::new(
//!     CompilerConfig::builder().with_dialect(SqlDialect::DuckDb).build(),
//! ).unwrap();
//!
//! let inclusion = CohortCreationCriteria::from_groups(vec![
//!     TemporalEventGroup::before_within(
//!         TemporalEvent::concept("condition_occurrence", 201826),
//!         TemporalEvent::concept("drug_exposure", 1503297),
//!         DayInterval::new(Some(0), Some(90)).unwrap(),
//!     ),
//! ]);
//!
//! let sql = compiler.compile_cohort_query(&inclusion, None, None);
//! assert!(sql.contains("DATE_DIFF('day'"));
//! ```
//!
//! ## Operators
//!
//! | Operator | Rows produced |
//! |----------|---------------|
//! | leaf | occurrences of the concept, optionally from the Nth one on or only the Nth from last |
//! | `AND` | rows of every branch, for persons present in all branches |
//! | `OR` | set union of the branches |
//! | `NOT` | every person without the child, with NULL dates |
//! | `BEFORE` | both rows of each ordered pair, or rows before/after a date anchor |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod compiler;
mod config;
mod error;
mod executor;
mod prevalence;
mod sql;

pub use compiler::{compile_cohort_query, CohortQueryCompiler};
pub use config::{CompilerConfig, CompilerConfigBuilder};
pub use error::{CohortError, CompileError, CompileResult};
pub use executor::{fetch_cohort, fetch_prevalence_rows, SqlExecutor};
pub use prevalence::build_concept_prevalence_query;
pub use sql::SqlDialect;
