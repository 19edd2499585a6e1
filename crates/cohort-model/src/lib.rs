//! # cohort-model
//!
//! Typed cohort definitions over an OMOP CDM warehouse.
//!
//! This crate holds the data side of cohort creation: the [`DomainRegistry`]
//! mapping clinical event types to tables, the temporal algebra
//! ([`TemporalEvent`], [`TemporalEventGroup`]) and the demographic and
//! cohort-level criteria. Every invariant is checked when a value is built
//! or deserialized, so downstream compilers can take a tree as given.
//!
//! ## Quick Start
//!
//! ```rust
//! use cohort_model::{CohortCreationCriteria, TemporalEvent, TemporalEventGroup};
//!
//! // Type 2 diabetes diagnosis followed by metformin within 90 days.
//! let group = TemporalEventGroup::before_within(
//!     TemporalEvent::concept("condition_occurrence", 201826),
//!     TemporalEvent::concept("drug_exposure", 1503297),
//!     cohort_model::DayInterval::new(Some(0), Some(90)).unwrap(),
//! );
//! let inclusion = CohortCreationCriteria::from_groups(vec![group]);
//! assert!(inclusion.has_temporal_events());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod criteria;
mod domain;
mod error;
mod event;
mod rows;

/// OMOP concept identifier.
pub type ConceptId = i64;

pub use criteria::{CohortCreationConfig, CohortCreationCriteria, DemographicsCriteria, Gender};
pub use domain::{
    DemographicsMapping, DomainRegistry, DomainSpec, DATE_EVENT_TYPE, FEMALE_CONCEPT_ID,
    MALE_CONCEPT_ID,
};
pub use error::{ModelError, ModelResult};
pub use event::{
    ConceptEvent, DateAnchor, DayInterval, EventOperator, TemporalEvent, TemporalEventGroup,
    TemporalNode, DEFAULT_INTERVAL_END_DAYS,
};
pub use rows::{CohortMember, PrevalenceRow};
