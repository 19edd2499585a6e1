//! Concept prevalence query builder.
//!
//! For one cohort and one clinical domain, counts distinct cohort members
//! per concept rolled up through the vocabulary ancestry, and emits self rows
//! and direct parent/child rows ready to be built into a concept hierarchy.

use tracing::debug;

use crate::compiler::CohortQueryCompiler;
use crate::error::{CompileError, CompileResult};
use crate::sql::{Cte, Expr, FromItem, Ident, Query, Select};

impl CohortQueryCompiler {
    /// Builds the prevalence query for `concept_type` over cohort `cohort_id`.
    ///
    /// Concepts whose count is not above `filter_count` are dropped (0
    /// keeps every observed concept). `vocab` defaults to the domain's
    /// default vocabulary.
    pub fn build_concept_prevalence_query(
        &self,
        concept_type: &str,
        cohort_id: i64,
        filter_count: i64,
        vocab: Option<&str>,
    ) -> CompileResult<String> {
        let domain = self
            .domains
            .get(concept_type)
            .ok_or_else(|| CompileError::InvalidConceptType {
                concept_type: concept_type.to_string(),
                valid: self.domain_tags().map(str::to_string).collect(),
            })?;
        let vocab = vocab.unwrap_or(domain.default_vocabulary.as_str());

        let person_id = Ident::known("person_id");
        let concept_id = Ident::known("concept_id");
        let count_in_cohort = Ident::known("count_in_cohort");
        let ancestor_concept_id = Ident::known("ancestor_concept_id");
        let descendant_concept_id = Ident::known("descendant_concept_id");
        let vocabulary_id = Ident::known("vocabulary_id");
        let cohort_persons = Ident::known("cohort_persons");
        let concept_counts = Ident::known("concept_counts");
        let (t, cp, ca, cc, c, ac) = (
            Ident::known("t"),
            Ident::known("cp"),
            Ident::known("ca"),
            Ident::known("cc"),
            Ident::known("c"),
            Ident::known("ac"),
        );

        let members = Select::new()
            .distinct()
            .column_as(Expr::column(&Ident::known("subject_id")), &person_id)
            .from(FromItem::table(&self.cohort_table))
            .filter(
                Expr::column(&Ident::known("cohort_definition_id")).equals(Expr::int(cohort_id)),
            );

        let counts = Select::new()
            .column_as(Expr::qualified(&ca, &ancestor_concept_id), &concept_id)
            .column_as(
                Expr::count_distinct(Expr::qualified(&t, &person_id)),
                &count_in_cohort,
            )
            .from(FromItem::aliased(&domain.table, &t))
            .join(
                FromItem::aliased(&cohort_persons, &cp),
                Expr::qualified(&cp, &person_id).equals(Expr::qualified(&t, &person_id)),
            )
            .join(
                FromItem::aliased(&self.concept_ancestor_table, &ca),
                Expr::qualified(&ca, &descendant_concept_id)
                    .equals(Expr::qualified(&t, &domain.concept_id_column)),
            )
            .group_by(Expr::qualified(&ca, &ancestor_concept_id));

        let cohort_size = Select::new()
            .column(Expr::CountStar)
            .from(FromItem::table(&cohort_persons));

        let rows = Select::new()
            .column_as(Expr::qualified(&ca, &ancestor_concept_id), &ancestor_concept_id)
            .column_as(Expr::qualified(&ca, &descendant_concept_id), &descendant_concept_id)
            .column_as(
                Expr::qualified(&c, &Ident::known("concept_name")),
                &Ident::known("concept_name"),
            )
            .column_as(
                Expr::qualified(&c, &Ident::known("concept_code")),
                &Ident::known("concept_code"),
            )
            .column_as(Expr::qualified(&cc, &count_in_cohort), &count_in_cohort)
            .column_as(
                Expr::qualified(&cc, &count_in_cohort)
                    .to_float()
                    .div(Expr::subquery(cohort_size)),
                &Ident::known("prevalence"),
            )
            .from(FromItem::aliased(&concept_counts, &cc))
            .join(
                FromItem::aliased(&self.concept_table, &c),
                Expr::qualified(&c, &concept_id).equals(Expr::qualified(&cc, &concept_id)),
            )
            .join(
                FromItem::aliased(&self.concept_ancestor_table, &ca),
                Expr::qualified(&ca, &descendant_concept_id)
                    .equals(Expr::qualified(&cc, &concept_id)),
            )
            .join(
                FromItem::aliased(&self.concept_table, &ac),
                Expr::qualified(&ac, &concept_id)
                    .equals(Expr::qualified(&ca, &ancestor_concept_id)),
            )
            .filter(
                Expr::qualified(&ca, &Ident::known("min_levels_of_separation"))
                    .lte(Expr::int(1)),
            )
            .filter(Expr::qualified(&c, &vocabulary_id).equals(Expr::string(vocab)))
            .filter(Expr::qualified(&ac, &vocabulary_id).equals(Expr::string(vocab)))
            .filter(Expr::qualified(&cc, &count_in_cohort).gt(Expr::int(filter_count)))
            .order_by(Expr::qualified(&ca, &descendant_concept_id))
            .order_by(Expr::qualified(&ca, &ancestor_concept_id));

        let query = Query::with(
            vec![
                Cte::new(cohort_persons.clone(), members),
                Cte::new(concept_counts.clone(), counts),
            ],
            rows,
        );
        let sql = query.to_sql(self.dialect());
        debug!(
            concept_type,
            cohort_id,
            filter_count,
            vocab,
            sql_len = sql.len(),
            "built concept prevalence query"
        );
        Ok(sql)
    }
}

/// Builds a prevalence query with the default OMOP configuration.
pub fn build_concept_prevalence_query(
    concept_type: &str,
    cohort_id: i64,
    filter_count: i64,
    vocab: Option<&str>,
) -> CompileResult<String> {
    CohortQueryCompiler::new(crate::CompilerConfig::default())?
        .build_concept_prevalence_query(concept_type, cohort_id, filter_count, vocab)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prevalence_query_shape() {
        let sql = build_concept_prevalence_query("condition_occurrence", 3, 0, None).unwrap();
        assert!(sql.starts_with(
            "WITH cohort_persons AS (SELECT DISTINCT subject_id AS person_id FROM cohort \
             WHERE cohort_definition_id = 3), concept_counts AS (SELECT \
             ca.ancestor_concept_id AS concept_id, COUNT(DISTINCT t.person_id) AS count_in_cohort \
             FROM condition_occurrence AS t"
        ));
        assert!(sql.contains("ca.descendant_concept_id = t.condition_concept_id"));
        assert!(sql.contains(
            "CAST(cc.count_in_cohort AS DOUBLE PRECISION) / (SELECT COUNT(*) FROM cohort_persons) \
             AS prevalence"
        ));
        assert!(sql.contains(
            "WHERE ca.min_levels_of_separation <= 1 AND c.vocabulary_id = 'SNOMED' \
             AND ac.vocabulary_id = 'SNOMED' AND cc.count_in_cohort > 0"
        ));
    }

    #[test]
    fn test_prevalence_default_vocab_per_domain() {
        let sql = build_concept_prevalence_query("drug_exposure", 1, 5, None).unwrap();
        assert!(sql.contains("c.vocabulary_id = 'RxNorm'"));
        assert!(sql.contains("cc.count_in_cohort > 5"));

        let sql = build_concept_prevalence_query("drug_exposure", 1, 0, Some("ATC")).unwrap();
        assert!(sql.contains("c.vocabulary_id = 'ATC'"));
    }

    #[test]
    fn test_prevalence_vocab_is_escaped() {
        let sql =
            build_concept_prevalence_query("measurement", 1, 0, Some("x' OR '1'='1")).unwrap();
        assert!(sql.contains("c.vocabulary_id = 'x'' OR ''1''=''1'"));
    }

    #[test]
    fn test_prevalence_invalid_concept_type() {
        let err = build_concept_prevalence_query("device_exposure", 1, 0, None).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Invalid concept_type: device_exposure. Must be one of"));
        assert!(message.contains("condition_occurrence"));
        assert!(message.contains("visit_occurrence"));
    }
}
