//! Static mapping from clinical event types to their CDM tables.
//!
//! The compiler and the prevalence query builder only ever reach clinical
//! tables through a [`DomainRegistry`], so adding a domain is a matter of
//! registering one more [`DomainSpec`].

use std::collections::BTreeMap;

use crate::ConceptId;

/// Event type tag of the literal date anchor pseudo-domain.
pub const DATE_EVENT_TYPE: &str = "date";

/// OMOP gender concept for male persons.
pub const MALE_CONCEPT_ID: ConceptId = 8507;

/// OMOP gender concept for female persons.
pub const FEMALE_CONCEPT_ID: ConceptId = 8532;

/// Table and column layout of one clinical domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSpec {
    /// Event table, e.g. `condition_occurrence`.
    pub table: String,
    /// Column holding the event's concept id.
    pub concept_id_column: String,
    /// Column holding the event start date.
    pub start_date_column: String,
    /// Column holding the event end date (equal to the start column for single-date tables).
    pub end_date_column: String,
    /// Vocabulary used when a caller does not name one.
    pub default_vocabulary: String,
}

impl DomainSpec {
    /// Creates a domain with distinct start and end date columns.
    pub fn new(
        table: impl Into<String>,
        concept_id_column: impl Into<String>,
        start_date_column: impl Into<String>,
        end_date_column: impl Into<String>,
        default_vocabulary: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            concept_id_column: concept_id_column.into(),
            start_date_column: start_date_column.into(),
            end_date_column: end_date_column.into(),
            default_vocabulary: default_vocabulary.into(),
        }
    }

    /// Creates a domain whose events carry a single date.
    pub fn single_date(
        table: impl Into<String>,
        concept_id_column: impl Into<String>,
        date_column: impl Into<String>,
        default_vocabulary: impl Into<String>,
    ) -> Self {
        let date_column = date_column.into();
        Self::new(
            table,
            concept_id_column,
            date_column.clone(),
            date_column,
            default_vocabulary,
        )
    }

    /// Returns true if the end date lives in its own column.
    pub fn has_end_date_column(&self) -> bool {
        self.start_date_column != self.end_date_column
    }
}

/// How demographic criteria map onto the person table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemographicsMapping {
    /// Column holding the gender concept id.
    pub gender_column: String,
    /// Column holding the year of birth.
    pub birth_year_column: String,
    /// Concept id used for `male`.
    pub male_concept_id: ConceptId,
    /// Concept id used for `female`.
    pub female_concept_id: ConceptId,
}

impl Default for DemographicsMapping {
    fn default() -> Self {
        Self {
            gender_column: "gender_concept_id".to_string(),
            birth_year_column: "year_of_birth".to_string(),
            male_concept_id: MALE_CONCEPT_ID,
            female_concept_id: FEMALE_CONCEPT_ID,
        }
    }
}

/// Registry of clinical domains keyed by event type tag.
///
/// Iteration is ordered by tag so that generated SQL is deterministic.
///
/// # Example
///
/// ```rust
/// use cohort_model::{DomainRegistry, DomainSpec};
///
/// let registry = DomainRegistry::omop()
///     .with_domain("device_exposure", DomainSpec::new(
///         "device_exposure",
///         "device_concept_id",
///         "device_exposure_start_date",
///         "device_exposure_end_date",
///         "SNOMED",
///     ));
///
/// assert!(registry.contains("condition_occurrence"));
/// assert!(registry.contains("device_exposure"));
/// assert!(!registry.contains("date"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRegistry {
    domains: BTreeMap<String, DomainSpec>,
    demographics: DemographicsMapping,
}

impl DomainRegistry {
    /// Creates a registry with no domains and the default person mapping.
    pub fn empty() -> Self {
        Self {
            domains: BTreeMap::new(),
            demographics: DemographicsMapping::default(),
        }
    }

    /// Creates the registry of the standard OMOP CDM event tables.
    pub fn omop() -> Self {
        Self::empty()
            .with_domain(
                "condition_occurrence",
                DomainSpec::new(
                    "condition_occurrence",
                    "condition_concept_id",
                    "condition_start_date",
                    "condition_end_date",
                    "SNOMED",
                ),
            )
            .with_domain(
                "drug_exposure",
                DomainSpec::new(
                    "drug_exposure",
                    "drug_concept_id",
                    "drug_exposure_start_date",
                    "drug_exposure_end_date",
                    "RxNorm",
                ),
            )
            .with_domain(
                "procedure_occurrence",
                DomainSpec::single_date(
                    "procedure_occurrence",
                    "procedure_concept_id",
                    "procedure_date",
                    "SNOMED",
                ),
            )
            .with_domain(
                "visit_occurrence",
                DomainSpec::new(
                    "visit_occurrence",
                    "visit_concept_id",
                    "visit_start_date",
                    "visit_end_date",
                    "Visit",
                ),
            )
            .with_domain(
                "measurement",
                DomainSpec::single_date(
                    "measurement",
                    "measurement_concept_id",
                    "measurement_date",
                    "LOINC",
                ),
            )
            .with_domain(
                "observation",
                DomainSpec::single_date(
                    "observation",
                    "observation_concept_id",
                    "observation_date",
                    "SNOMED",
                ),
            )
    }

    /// Adds or replaces a domain, returning the registry for chaining.
    pub fn with_domain(mut self, tag: impl Into<String>, spec: DomainSpec) -> Self {
        self.register(tag, spec);
        self
    }

    /// Replaces the person-table mapping used for demographic filters.
    pub fn with_demographics(mut self, demographics: DemographicsMapping) -> Self {
        self.demographics = demographics;
        self
    }

    /// Adds or replaces a domain, returning the previous entry if any.
    ///
    /// The `date` pseudo-type is never registered; it has no table.
    pub fn register(&mut self, tag: impl Into<String>, spec: DomainSpec) -> Option<DomainSpec> {
        let tag = tag.into();
        if tag == DATE_EVENT_TYPE {
            tracing::warn!(tag = %tag, "refusing to register the date pseudo-domain");
            return None;
        }
        self.domains.insert(tag, spec)
    }

    /// Looks up a domain by event type tag.
    pub fn get(&self, tag: &str) -> Option<&DomainSpec> {
        self.domains.get(tag)
    }

    /// Returns true if the tag names a registered domain.
    pub fn contains(&self, tag: &str) -> bool {
        self.domains.contains_key(tag)
    }

    /// Iterates registered tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Iterates `(tag, spec)` pairs in sorted tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DomainSpec)> {
        self.domains.iter().map(|(tag, spec)| (tag.as_str(), spec))
    }

    /// Number of registered domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns true if no domain is registered.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Person-table mapping for demographic filters.
    pub fn demographics(&self) -> &DemographicsMapping {
        &self.demographics
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::omop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omop_registry_domains() {
        let registry = DomainRegistry::omop();
        let tags: Vec<&str> = registry.tags().collect();
        assert_eq!(
            tags,
            vec![
                "condition_occurrence",
                "drug_exposure",
                "measurement",
                "observation",
                "procedure_occurrence",
                "visit_occurrence",
            ]
        );
    }

    #[test]
    fn test_condition_layout() {
        let registry = DomainRegistry::omop();
        let spec = registry.get("condition_occurrence").unwrap();
        assert_eq!(spec.table, "condition_occurrence");
        assert_eq!(spec.concept_id_column, "condition_concept_id");
        assert_eq!(spec.start_date_column, "condition_start_date");
        assert_eq!(spec.end_date_column, "condition_end_date");
        assert_eq!(spec.default_vocabulary, "SNOMED");
        assert!(spec.has_end_date_column());
    }

    #[test]
    fn test_single_date_domain() {
        let registry = DomainRegistry::omop();
        let spec = registry.get("procedure_occurrence").unwrap();
        assert_eq!(spec.start_date_column, "procedure_date");
        assert_eq!(spec.end_date_column, "procedure_date");
        assert!(!spec.has_end_date_column());
    }

    #[test]
    fn test_date_is_not_a_domain() {
        let mut registry = DomainRegistry::omop();
        assert!(!registry.contains(DATE_EVENT_TYPE));

        let previous = registry.register(
            DATE_EVENT_TYPE,
            DomainSpec::single_date("dates", "id", "day", "None"),
        );
        assert!(previous.is_none());
        assert!(!registry.contains(DATE_EVENT_TYPE));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = DomainRegistry::empty();
        assert!(registry.is_empty());

        registry.register(
            "note",
            DomainSpec::single_date("note", "note_type_concept_id", "note_date", "None"),
        );
        let previous = registry.register(
            "note",
            DomainSpec::single_date("note", "note_class_concept_id", "note_date", "None"),
        );

        assert_eq!(previous.unwrap().concept_id_column, "note_type_concept_id");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("note").unwrap().concept_id_column, "note_class_concept_id");
    }

    #[test]
    fn test_default_demographics() {
        let registry = DomainRegistry::default();
        let demographics = registry.demographics();
        assert_eq!(demographics.gender_column, "gender_concept_id");
        assert_eq!(demographics.birth_year_column, "year_of_birth");
        assert_eq!(demographics.male_concept_id, 8507);
        assert_eq!(demographics.female_concept_id, 8532);
    }
}
