//! Per-cohort prevalence metrics attached to concept nodes.

use std::collections::BTreeMap;

use serde::Serialize;

/// Count and prevalence of one concept within one cohort.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CohortMetrics {
    /// Distinct cohort members with the concept or one of its descendants.
    pub count: i64,
    /// `count` divided by the cohort size.
    pub prevalence: f64,
}

impl CohortMetrics {
    /// Creates a metrics record.
    pub fn new(count: i64, prevalence: f64) -> Self {
        Self { count, prevalence }
    }

    /// Aggregates metrics across cohorts.
    ///
    /// The count is summed. The prevalence is the mean of the per-cohort
    /// prevalences, or `0.0` when no cohort contributes.
    pub fn aggregate<'a, I>(metrics: I) -> Self
    where
        I: IntoIterator<Item = &'a CohortMetrics>,
    {
        let mut count = 0;
        let mut prevalence_sum = 0.0;
        let mut contributors = 0usize;
        for m in metrics {
            count += m.count;
            prevalence_sum += m.prevalence;
            contributors += 1;
        }
        let prevalence = if contributors == 0 {
            0.0
        } else {
            prevalence_sum / contributors as f64
        };
        Self { count, prevalence }
    }
}

/// Metrics of one concept keyed by cohort key.
pub type MetricsByCohort = BTreeMap<String, CohortMetrics>;

/// Orders cohort keys numerically when they are integers, then lexically.
pub(crate) fn sorted_cohort_keys<'a, I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut keys: Vec<String> = keys.into_iter().cloned().collect();
    keys.sort_by(|a, b| {
        let left = (a.parse::<i64>().map_err(|_| ()), a);
        let right = (b.parse::<i64>().map_err(|_| ()), b);
        left.cmp(&right)
    });
    keys
}
