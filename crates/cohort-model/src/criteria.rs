//! Demographic and cohort-level criteria documents.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::DemographicsMapping;
use crate::error::{ModelError, ModelResult};
use crate::event::TemporalEventGroup;
use crate::ConceptId;

/// Administrative gender as recorded on the person table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male persons.
    Male,
    /// Female persons.
    Female,
}

impl Gender {
    /// Concept id of this gender under the given person mapping.
    pub fn concept_id(&self, mapping: &DemographicsMapping) -> ConceptId {
        match self {
            Gender::Male => mapping.male_concept_id,
            Gender::Female => mapping.female_concept_id,
        }
    }
}

/// Filters on the person table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDemographics")]
pub struct DemographicsCriteria {
    /// Required gender, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    /// Earliest admitted year of birth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_birth_year: Option<i32>,
    /// Latest admitted year of birth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_birth_year: Option<i32>,
}

impl DemographicsCriteria {
    /// Creates criteria, rejecting inverted birth-year bounds.
    pub fn new(
        gender: Option<Gender>,
        min_birth_year: Option<i32>,
        max_birth_year: Option<i32>,
    ) -> ModelResult<Self> {
        if let (Some(min), Some(max)) = (min_birth_year, max_birth_year) {
            if max < min {
                return Err(ModelError::InvertedBirthYears { min, max });
            }
        }
        Ok(Self {
            gender,
            min_birth_year,
            max_birth_year,
        })
    }

    /// Returns true if no filter is set.
    pub fn is_unrestricted(&self) -> bool {
        self.gender.is_none() && self.min_birth_year.is_none() && self.max_birth_year.is_none()
    }
}

#[derive(Deserialize)]
struct RawDemographics {
    #[serde(default)]
    gender: Option<Gender>,
    #[serde(default)]
    min_birth_year: Option<i32>,
    #[serde(default)]
    max_birth_year: Option<i32>,
}

impl TryFrom<RawDemographics> for DemographicsCriteria {
    type Error = ModelError;

    fn try_from(raw: RawDemographics) -> ModelResult<Self> {
        Self::new(raw.gender, raw.min_birth_year, raw.max_birth_year)
    }
}

/// One side (inclusion or exclusion) of a cohort definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortCreationCriteria {
    /// Person-level filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<DemographicsCriteria>,
    /// Top-level temporal groups; siblings are alternatives.
    #[serde(default)]
    pub temporal_events: Vec<TemporalEventGroup>,
}

impl CohortCreationCriteria {
    /// Criteria made of demographic filters only.
    pub fn demographics_only(demographics: DemographicsCriteria) -> Self {
        Self {
            demographics: Some(demographics),
            temporal_events: Vec::new(),
        }
    }

    /// Criteria made of temporal groups only.
    pub fn from_groups(temporal_events: Vec<TemporalEventGroup>) -> Self {
        Self {
            demographics: None,
            temporal_events,
        }
    }

    /// Returns true if there are no temporal groups.
    pub fn has_temporal_events(&self) -> bool {
        !self.temporal_events.is_empty()
    }

    /// Returns true if neither demographics nor temporal groups restrict anything.
    pub fn is_empty(&self) -> bool {
        self.temporal_events.is_empty()
            && self
                .demographics
                .as_ref()
                .map_or(true, DemographicsCriteria::is_unrestricted)
    }
}

/// A full cohort definition document.
///
/// ```rust
/// use cohort_model::CohortCreationConfig;
///
/// let config = CohortCreationConfig::from_json_str(r#"{
///     "inclusion_criteria": {
///         "demographics": {"gender": "female", "min_birth_year": 1970},
///         "temporal_events": [{
///             "operator": "OR",
///             "events": [{"event_type": "condition_occurrence", "event_concept_id": 201826}]
///         }]
///     }
/// }"#).unwrap();
///
/// assert_eq!(config.inclusion_criteria.temporal_events.len(), 1);
/// assert!(config.exclusion_criteria.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortCreationConfig {
    /// Criteria a person must meet.
    #[serde(default)]
    pub inclusion_criteria: CohortCreationCriteria,
    /// Criteria that remove a person.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion_criteria: Option<CohortCreationCriteria>,
}

impl CohortCreationConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses and validates JSON from a reader.
    pub fn from_reader<R: Read>(reader: R) -> ModelResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Loads and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ModelError::io_error(path, e))?;
        let config = Self::from_reader(BufReader::new(file))?;
        tracing::debug!(
            path = %path.display(),
            inclusion_groups = config.inclusion_criteria.temporal_events.len(),
            has_exclusion = config.exclusion_criteria.is_some(),
            "loaded cohort definition"
        );
        Ok(config)
    }
}
