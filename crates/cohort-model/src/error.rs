//! Error types for cohort criteria validation and loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating or loading cohort criteria.
#[derive(Error, Debug)]
pub enum ModelError {
    /// An operator received the wrong number of child events.
    #[error("{operator} operator requires {expected} event(s), found {found}")]
    OperatorArity {
        /// Operator name (`NOT`, `BEFORE`).
        operator: &'static str,
        /// Required number of children.
        expected: usize,
        /// Number of children supplied.
        found: usize,
    },

    /// A temporal event group has no children.
    #[error("{operator} event group must contain at least one event")]
    EmptyGroup {
        /// Operator name of the empty group.
        operator: &'static str,
    },

    /// Interval start is after interval end.
    #[error("interval start {start} must not be greater than interval end {end}")]
    InvertedInterval {
        /// Lower bound in days.
        start: i64,
        /// Upper bound in days.
        end: i64,
    },

    /// Interval is not a pair.
    #[error("interval must be a list of exactly 2 entries, found {0}")]
    IntervalLength(usize),

    /// A non-date event is missing its concept id.
    #[error("event of type '{event_type}' requires event_concept_id")]
    MissingConceptId {
        /// The event type of the offending event.
        event_type: String,
    },

    /// A date event is missing its timestamp.
    #[error("event of type 'date' requires a timestamp")]
    MissingTimestamp,

    /// A date event also names a concept.
    #[error("event of type 'date' must not carry event_concept_id")]
    ConceptIdOnDateEvent,

    /// A node has neither `event_type` nor `events`.
    #[error("temporal event requires event_type")]
    MissingEventType,

    /// A node has `events` but no `operator`.
    #[error("temporal event group requires an operator")]
    MissingOperator,

    /// A single event was supplied where a group is required.
    #[error("expected a temporal event group with operator and events")]
    ExpectedGroup,

    /// An event group was supplied where a single event is required.
    #[error("expected a single temporal event, found a {0} group")]
    ExpectedEvent(&'static str),

    /// A date event carries a timestamp that is not an ISO date.
    #[error("invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        /// The raw timestamp text.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: chrono::ParseError,
    },

    /// Event instance ordinals are non-zero and fit in 32 bits.
    #[error("event_instance must be non-zero and fit in 32 bits, found {0}")]
    InvalidInstance(i64),

    /// Window offsets fit in 32 bits.
    #[error("offset {0} is out of range")]
    InvalidOffset(i64),

    /// Birth-year bounds are inverted.
    #[error("max_birth_year {max} must not be less than min_birth_year {min}")]
    InvertedBirthYears {
        /// Lower birth-year bound.
        min: i32,
        /// Upper birth-year bound.
        max: i32,
    },

    /// Criteria document is not valid JSON or does not match the schema.
    #[error("invalid criteria document: {0}")]
    Json(#[from] serde_json::Error),

    /// Criteria file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ModelError {
    /// Creates an I/O error with path context.
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for model operations.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_arity() {
        let err = ModelError::OperatorArity {
            operator: "BEFORE",
            expected: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "BEFORE operator requires 2 event(s), found 1");
    }

    #[test]
    fn test_error_display_interval() {
        let err = ModelError::InvertedInterval { start: 100, end: 50 };
        assert_eq!(
            err.to_string(),
            "interval start 100 must not be greater than interval end 50"
        );
    }

    #[test]
    fn test_error_display_birth_years() {
        let err = ModelError::InvertedBirthYears { min: 2000, max: 1999 };
        assert_eq!(
            err.to_string(),
            "max_birth_year 1999 must not be less than min_birth_year 2000"
        );
    }

    #[test]
    fn test_io_error_keeps_path() {
        let err = ModelError::io_error(
            "criteria.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().starts_with("I/O error at criteria.json"));
    }
}
