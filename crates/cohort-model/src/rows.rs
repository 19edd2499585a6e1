//! Row shapes returned by the execution collaborator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ConceptId;

/// One member of a compiled cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortMember {
    /// Person identifier.
    pub person_id: i64,
    /// Earliest qualifying event date (None for demographics-only members without events).
    pub cohort_start_date: Option<NaiveDate>,
    /// Latest qualifying event end date.
    pub cohort_end_date: Option<NaiveDate>,
}

/// One ancestor/descendant pair with the descendant's cohort prevalence.
///
/// Self rows (`ancestor == descendant`) carry a concept's own metrics; the
/// ancestor is None when a concept has no recorded ancestor in scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrevalenceRow {
    /// Ancestor concept, if any.
    pub ancestor_concept_id: Option<ConceptId>,
    /// Descendant concept the metrics belong to.
    pub descendant_concept_id: ConceptId,
    /// Display name of the descendant.
    pub concept_name: String,
    /// Vocabulary code of the descendant.
    pub concept_code: String,
    /// Distinct cohort members with the descendant or any of its descendants.
    pub count_in_cohort: i64,
    /// `count_in_cohort` over the cohort size.
    pub prevalence: f64,
}

impl PrevalenceRow {
    /// Convenience constructor.
    pub fn new(
        ancestor_concept_id: Option<ConceptId>,
        descendant_concept_id: ConceptId,
        concept_name: impl Into<String>,
        concept_code: impl Into<String>,
        count_in_cohort: i64,
        prevalence: f64,
    ) -> Self {
        Self {
            ancestor_concept_id,
            descendant_concept_id,
            concept_name: concept_name.into(),
            concept_code: concept_code.into(),
            count_in_cohort,
            prevalence,
        }
    }

    /// Returns true if this row links two distinct concepts.
    pub fn is_edge(&self) -> bool {
        matches!(self.ancestor_concept_id, Some(anc) if anc != self.descendant_concept_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_row_is_not_edge() {
        let row = PrevalenceRow::new(Some(1), 1, "Disorder", "64572001", 5, 0.5);
        assert!(!row.is_edge());
        let row = PrevalenceRow::new(None, 1, "Disorder", "64572001", 5, 0.5);
        assert!(!row.is_edge());
        let row = PrevalenceRow::new(Some(1), 2, "Diabetes", "73211009", 2, 0.2);
        assert!(row.is_edge());
    }

    #[test]
    fn test_member_deserialize_null_dates() {
        let member: CohortMember = serde_json::from_str(
            r#"{"person_id": 7, "cohort_start_date": null, "cohort_end_date": "2020-02-01"}"#,
        )
        .unwrap();
        assert_eq!(member.person_id, 7);
        assert!(member.cohort_start_date.is_none());
        assert_eq!(member.cohort_end_date, NaiveDate::from_ymd_opt(2020, 2, 1));
    }
}
