//! Temporal cohort query compiler.
//!
//! Every criteria node lowers to a subquery yielding `person_id`, the
//! event's own `event_start_date`/`event_end_date`, and the
//! `window_start_date`/`window_end_date` it contributes to the cohort
//! window after any offset. The final query materializes ranked views per
//! referenced domain, gathers qualifying rows from the inclusion groups,
//! removes excluded persons and reduces each person to the earliest window
//! start and the latest window end.

use std::collections::{BTreeMap, BTreeSet};

use cohort_model::{
    CohortCreationConfig, CohortCreationCriteria, ConceptEvent, DateAnchor, DayInterval,
    DemographicsCriteria, DemographicsMapping, DomainSpec, TemporalEvent, TemporalEventGroup,
    TemporalNode,
};
use tracing::{debug, warn};

use crate::config::CompilerConfig;
use crate::error::CompileResult;
use crate::sql::{Cte, Expr, FromItem, Ident, Query, Select, SortOrder, SqlDialect};

const PERSON_ID: &str = "person_id";
const CONCEPT_ID: &str = "concept_id";
const EVENT_START_DATE: &str = "event_start_date";
const EVENT_END_DATE: &str = "event_end_date";
const WINDOW_START_DATE: &str = "window_start_date";
const WINDOW_END_DATE: &str = "window_end_date";
const EVENT_INSTANCE: &str = "event_instance";
const COHORT_START_DATE: &str = "cohort_start_date";
const COHORT_END_DATE: &str = "cohort_end_date";
const QUALIFYING_EVENTS: &str = "qualifying_events";
const RANKED_VIEW_PREFIX: &str = "ranked_events_";
const RANKED_DESC_VIEW_PREFIX: &str = "ranked_events_desc_";

/// Columns every rendered node projects, in order.
const EVENT_COLUMNS: [&str; 5] = [
    PERSON_ID,
    EVENT_START_DATE,
    EVENT_END_DATE,
    WINDOW_START_DATE,
    WINDOW_END_DATE,
];

fn ident(name: &'static str) -> Ident {
    Ident::known(name)
}

fn alias(name: String) -> Ident {
    Ident::generated(name)
}

/// Validated table layout of one registered domain.
#[derive(Debug, Clone)]
pub(crate) struct DomainTables {
    pub(crate) table: Ident,
    pub(crate) concept_id_column: Ident,
    pub(crate) start_date_column: Ident,
    pub(crate) end_date_column: Option<Ident>,
    ranked_view: Ident,
    ranked_desc_view: Ident,
    pub(crate) default_vocabulary: String,
}

impl DomainTables {
    fn from_spec(tag: &str, spec: &DomainSpec) -> CompileResult<Self> {
        Ok(Self {
            table: Ident::new(spec.table.as_str())?,
            concept_id_column: Ident::new(spec.concept_id_column.as_str())?,
            start_date_column: Ident::new(spec.start_date_column.as_str())?,
            end_date_column: if spec.has_end_date_column() {
                Some(Ident::new(spec.end_date_column.as_str())?)
            } else {
                None
            },
            ranked_view: Ident::new(format!("{}{}", RANKED_VIEW_PREFIX, tag))?,
            ranked_desc_view: Ident::new(format!("{}{}", RANKED_DESC_VIEW_PREFIX, tag))?,
            default_vocabulary: spec.default_vocabulary.clone(),
        })
    }

    fn view(&self, order: SortOrder) -> &Ident {
        match order {
            SortOrder::Asc => &self.ranked_view,
            SortOrder::Desc => &self.ranked_desc_view,
        }
    }

    /// `SELECT person_id, concept_id, event dates, event_instance FROM <table>`
    ///
    /// Descending views number occurrences from the most recent one.
    fn ranked_view_cte(&self, order: SortOrder) -> Cte {
        let start = Expr::column(&self.start_date_column);
        let end = match &self.end_date_column {
            Some(end) => Expr::coalesce(vec![Expr::column(end), start.clone()]),
            None => start.clone(),
        };
        let query = Select::new()
            .column(Expr::column(&ident(PERSON_ID)))
            .column_as(Expr::column(&self.concept_id_column), &ident(CONCEPT_ID))
            .column_as(start.clone(), &ident(EVENT_START_DATE))
            .column_as(end, &ident(EVENT_END_DATE))
            .column_as(
                Expr::row_number(
                    vec![
                        Expr::column(&ident(PERSON_ID)),
                        Expr::column(&self.concept_id_column),
                    ],
                    vec![start],
                    order,
                ),
                &ident(EVENT_INSTANCE),
            )
            .from(FromItem::table(&self.table));
        Cte::new(self.view(order).clone(), query)
    }
}

/// Person-table columns used for demographic filters.
#[derive(Debug, Clone)]
struct PersonTable {
    table: Ident,
    gender_column: Ident,
    birth_year_column: Ident,
    mapping: DemographicsMapping,
}

/// Compiles cohort criteria into one SQL statement.
///
/// Construction validates every table and column name coming from the
/// configuration; compiling is then infallible and deterministic.
///
/// # Example
///
/// ```rust
/// use cohort_model::CohortCreationConfig;
/// use cohort_sql::{CohortQueryCompiler, CompilerConfig};
///
/// let compiler = CohortQueryCompiler::new(CompilerConfig::default()).unwrap();
/// let config = CohortCreationConfig::from_json_str(r#"{
///     "inclusion_criteria": {
///         "temporal_events": [{
///             "operator": "OR",
///             "events": [{"event_type": "condition_occurrence", "event_concept_id": 201826}]
///         }]
///     }
/// }"#).unwrap();
///
/// let sql = compiler.compile_config(&config);
/// assert!(sql.starts_with("WITH ranked_events_condition_occurrence AS ("));
/// assert!(sql.contains("GROUP BY p.person_id"));
/// ```
#[derive(Debug, Clone)]
pub struct CohortQueryCompiler {
    dialect: SqlDialect,
    pub(crate) domains: BTreeMap<String, DomainTables>,
    person: PersonTable,
    pub(crate) cohort_table: Ident,
    pub(crate) concept_table: Ident,
    pub(crate) concept_ancestor_table: Ident,
}

impl CohortQueryCompiler {
    /// Creates a compiler, validating all configured names.
    pub fn new(config: CompilerConfig) -> CompileResult<Self> {
        let domains = config
            .registry
            .iter()
            .map(|(tag, spec)| Ok((tag.to_string(), DomainTables::from_spec(tag, spec)?)))
            .collect::<CompileResult<BTreeMap<_, _>>>()?;
        let mapping = config.registry.demographics().clone();

        Ok(Self {
            dialect: config.dialect,
            domains,
            person: PersonTable {
                table: Ident::new(config.person_table)?,
                gender_column: Ident::new(mapping.gender_column.as_str())?,
                birth_year_column: Ident::new(mapping.birth_year_column.as_str())?,
                mapping,
            },
            cohort_table: Ident::new(config.cohort_table)?,
            concept_table: Ident::new(config.concept_table)?,
            concept_ancestor_table: Ident::new(config.concept_ancestor_table)?,
        })
    }

    /// Dialect queries are rendered for.
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Registered domain tags in sorted order.
    pub fn domain_tags(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    // =========================================================================
    // Event and group rendering
    // =========================================================================

    /// Renders one event group as a standalone subquery.
    ///
    /// Returns None when nothing in the group maps to a registered domain.
    pub fn render_event_group(&self, group: &TemporalEventGroup) -> Option<String> {
        self.render_group(group, "evt")
            .map(|query| query.to_sql(self.dialect))
    }

    fn render_node(&self, node: &TemporalNode, prefix: &str) -> Option<Query> {
        match node {
            TemporalNode::Event(TemporalEvent::Concept(event)) => self.render_event(event),
            TemporalNode::Event(TemporalEvent::Date(anchor)) => {
                debug!(timestamp = %anchor.timestamp, "date anchor outside BEFORE has no rows");
                None
            }
            TemporalNode::Group(group) => self.render_group(group, prefix),
        }
    }

    fn render_event(&self, event: &ConceptEvent) -> Option<Query> {
        let Some(domain) = self.domains.get(&event.event_type) else {
            warn!(
                event_type = %event.event_type,
                concept_id = event.concept_id,
                "no domain registered for event type, dropping event"
            );
            return None;
        };

        let instance = Expr::column(&ident(EVENT_INSTANCE));
        let (order, instance_filter) = match event.instance {
            None => (SortOrder::Asc, None),
            Some(n) if n < 0 => (
                SortOrder::Desc,
                Some(instance.equals(Expr::int(i64::from(n.unsigned_abs())))),
            ),
            Some(n) => (SortOrder::Asc, Some(instance.gte(Expr::int(i64::from(n))))),
        };

        let mut select = window_columns(Select::new(), event.offset)
            .from(FromItem::table(domain.view(order)))
            .filter(Expr::column(&ident(CONCEPT_ID)).equals(Expr::int(event.concept_id)));
        if let Some(predicate) = instance_filter {
            select = select.filter(predicate);
        }
        Some(select.into_query())
    }

    fn render_group(&self, group: &TemporalEventGroup, prefix: &str) -> Option<Query> {
        match group {
            TemporalEventGroup::And(children) => {
                let queries = self.render_children(children, prefix);
                self.render_and(queries, prefix)
            }
            TemporalEventGroup::Or(children) => {
                let queries = self.render_children(children, prefix);
                if queries.is_empty() {
                    None
                } else {
                    Some(Query::union(queries))
                }
            }
            TemporalEventGroup::Not(child) => {
                let query = self.render_node(child, &format!("{}_0", prefix))?;
                Some(self.render_not(query, prefix))
            }
            TemporalEventGroup::Before {
                first,
                second,
                interval,
            } => self.render_before(first, second, *interval, prefix),
        }
    }

    fn render_children(&self, children: &[TemporalNode], prefix: &str) -> Vec<Query> {
        children
            .iter()
            .enumerate()
            .filter_map(|(i, child)| self.render_node(child, &format!("{}_{}", prefix, i)))
            .collect()
    }

    /// Rows of every branch, kept only for persons present in all branches.
    ///
    /// Branches are reduced to their distinct persons before being joined.
    fn render_and(&self, mut queries: Vec<Query>, prefix: &str) -> Option<Query> {
        if queries.len() <= 1 {
            return queries.pop();
        }

        let person_id = ident(PERSON_ID);
        let persons_of = |i: usize, query: &Query| {
            let branch = alias(format!("{}_a{}", prefix, i));
            let distinct = Select::new()
                .distinct()
                .column(Expr::column(&person_id))
                .from(FromItem::subquery(
                    query.clone(),
                    &alias(format!("{}_b{}", prefix, i)),
                ));
            (FromItem::subquery(distinct, &branch), branch)
        };

        let (first_item, first) = persons_of(0, &queries[0]);
        let mut persons = Select::new()
            .column(Expr::qualified(&first, &person_id))
            .from(first_item);
        for (i, query) in queries.iter().enumerate().skip(1) {
            let (item, branch) = persons_of(i, query);
            persons = persons.join(
                item,
                Expr::qualified(&branch, &person_id).equals(Expr::qualified(&first, &person_id)),
            );
        }

        let all_events = alias(format!("{}_all", prefix));
        Some(
            event_columns(Select::new(), None)
                .from(FromItem::subquery(Query::union_all(queries), &all_events))
                .filter(Expr::column(&person_id).in_query(persons))
                .into_query(),
        )
    }

    /// Every person without a row in `query`; absence carries no dates.
    fn render_not(&self, query: Query, prefix: &str) -> Query {
        let person_id = ident(PERSON_ID);
        let negated = alias(format!("{}_not", prefix));
        null_dates(Select::new())
            .from(FromItem::table(&self.person.table))
            .filter(
                Expr::column(&person_id).not_in_query(
                    Select::new()
                        .column(Expr::column(&person_id))
                        .from(FromItem::subquery(query, &negated)),
                ),
            )
            .into_query()
    }

    fn render_before(
        &self,
        first: &TemporalNode,
        second: &TemporalNode,
        interval: Option<DayInterval>,
        prefix: &str,
    ) -> Option<Query> {
        match (first.as_date_anchor(), second.as_date_anchor()) {
            (Some(_), Some(_)) => {
                warn!("BEFORE between two date anchors selects no events, dropping group");
                None
            }
            (Some(anchor), None) => {
                let query = self.render_node(second, &format!("{}_1", prefix))?;
                Some(self.render_anchor_filter(query, anchor, true, prefix))
            }
            (None, Some(anchor)) => {
                let query = self.render_node(first, &format!("{}_0", prefix))?;
                Some(self.render_anchor_filter(query, anchor, false, prefix))
            }
            (None, None) => {
                let earlier = self.render_node(first, &format!("{}_0", prefix))?;
                let later = self.render_node(second, &format!("{}_1", prefix))?;
                Some(self.render_event_pair(earlier, later, interval, prefix))
            }
        }
    }

    /// Keeps rows after (`anchor_first`) or before the anchor date.
    fn render_anchor_filter(
        &self,
        query: Query,
        anchor: &DateAnchor,
        anchor_first: bool,
        prefix: &str,
    ) -> Query {
        let start = Expr::column(&ident(EVENT_START_DATE));
        let date = Expr::date(anchor.timestamp);
        let predicate = if anchor_first {
            start.gt(date)
        } else {
            start.lt(date)
        };
        event_columns(Select::new(), None)
            .from(FromItem::subquery(query, &alias(format!("{}_0", prefix))))
            .filter(predicate)
            .into_query()
    }

    /// Pairs where the first branch starts strictly before the second.
    ///
    /// Ordering uses the events' own start dates, never the offset window.
    /// Rows of both sides of each pair are emitted so either can shape the
    /// cohort window.
    fn render_event_pair(
        &self,
        earlier: Query,
        later: Query,
        interval: Option<DayInterval>,
        prefix: &str,
    ) -> Query {
        let person_id = ident(PERSON_ID);
        let start = ident(EVENT_START_DATE);
        let e1 = alias(format!("e1_{}", prefix));
        let e2 = alias(format!("e2_{}", prefix));

        let mut on = Expr::qualified(&e1, &person_id)
            .equals(Expr::qualified(&e2, &person_id))
            .and(Expr::qualified(&e1, &start).lt(Expr::qualified(&e2, &start)));
        if let Some(interval) = interval {
            on = on.and(
                Expr::day_diff(Expr::qualified(&e2, &start), Expr::qualified(&e1, &start))
                    .between(Expr::int(interval.start_days), Expr::int(interval.end_days)),
            );
        }

        let earlier_rows = event_columns(Select::new(), Some(&e1))
            .from(FromItem::subquery(earlier.clone(), &e1))
            .join(FromItem::subquery(later.clone(), &e2), on.clone())
            .into_query();
        let later_rows = event_columns(Select::new(), Some(&e2))
            .from(FromItem::subquery(later, &e2))
            .join(FromItem::subquery(earlier, &e1), on)
            .into_query();
        Query::union_all(vec![earlier_rows, later_rows])
    }

    // =========================================================================
    // Filters
    // =========================================================================

    /// Qualifying rows of the top-level inclusion groups, rendered as SQL.
    ///
    /// Sibling groups are alternatives: their rows are concatenated into a
    /// `combined_events` relation.
    pub fn temporal_event_filter(&self, groups: &[TemporalEventGroup]) -> Option<String> {
        self.qualifying_rows(groups)
            .map(|query| query.to_sql(self.dialect))
    }

    fn qualifying_rows(&self, groups: &[TemporalEventGroup]) -> Option<Query> {
        let mut filters: Vec<Query> = groups
            .iter()
            .enumerate()
            .filter_map(|(i, group)| self.render_group(group, &format!("evt{}", i)))
            .collect();

        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(
                event_columns(Select::new(), None)
                    .from(FromItem::subquery(
                        Query::union_all(filters),
                        &ident("combined_events"),
                    ))
                    .into_query(),
            ),
        }
    }

    /// Predicate removing persons matching the exclusion profile, rendered
    /// against the final query's `p` alias.
    ///
    /// A person is excluded when they meet the exclusion demographics and
    /// every renderable exclusion group.
    pub fn exclusion_filter(&self, exclusion: &CohortCreationCriteria) -> Option<String> {
        self.exclusion_predicate(exclusion)
            .map(|predicate| predicate.to_sql(self.dialect))
    }

    fn exclusion_predicate(&self, exclusion: &CohortCreationCriteria) -> Option<Expr> {
        let ex = ident("ex");
        let person_id = ident(PERSON_ID);
        let mut predicates = exclusion
            .demographics
            .as_ref()
            .map(|d| self.demographic_predicates(&ex, d))
            .unwrap_or_default();

        for (i, group) in exclusion.temporal_events.iter().enumerate() {
            match self.render_group(group, &format!("ex{}", i)) {
                Some(query) => predicates.push(
                    Expr::qualified(&ex, &person_id).in_query(
                        Select::new()
                            .column(Expr::column(&person_id))
                            .from(FromItem::subquery(
                                query,
                                &alias(format!("ex_subquery_{}", i)),
                            )),
                    ),
                ),
                None => warn!(group = i, "exclusion group has no renderable events, skipping"),
            }
        }

        let profile = predicates.into_iter().reduce(Expr::and)?;
        let excluded = Select::new()
            .column(Expr::qualified(&ex, &person_id))
            .from(FromItem::aliased(&self.person.table, &ex))
            .filter(profile);
        Some(Expr::qualified(&ident("p"), &person_id).not_in_query(excluded))
    }

    fn demographic_predicates(&self, alias: &Ident, criteria: &DemographicsCriteria) -> Vec<Expr> {
        let mut predicates = Vec::new();
        if let Some(gender) = criteria.gender {
            predicates.push(
                Expr::qualified(alias, &self.person.gender_column)
                    .equals(Expr::int(gender.concept_id(&self.person.mapping))),
            );
        }
        if let Some(min) = criteria.min_birth_year {
            predicates.push(
                Expr::qualified(alias, &self.person.birth_year_column).gte(Expr::int(min.into())),
            );
        }
        if let Some(max) = criteria.max_birth_year {
            predicates.push(
                Expr::qualified(alias, &self.person.birth_year_column).lte(Expr::int(max.into())),
            );
        }
        predicates
    }

    // =========================================================================
    // Final query
    // =========================================================================

    /// Domains the final query materializes ranked views for.
    ///
    /// Without inclusion temporal events every registered domain is used.
    pub fn ranked_domains(
        &self,
        inclusion: &CohortCreationCriteria,
        exclusion: Option<&CohortCreationCriteria>,
    ) -> Vec<&str> {
        if !inclusion.has_temporal_events() {
            return self.domain_tags().collect();
        }

        let mut referenced = BTreeSet::new();
        for group in criteria_groups(inclusion, exclusion) {
            group.collect_event_types(&mut referenced);
        }
        self.registered(&referenced)
    }

    /// Domains that also need a most-recent-first ranked view, because some
    /// event selects an occurrence counted from the last one.
    pub fn descending_ranked_domains(
        &self,
        inclusion: &CohortCreationCriteria,
        exclusion: Option<&CohortCreationCriteria>,
    ) -> Vec<&str> {
        let mut referenced = BTreeSet::new();
        for group in criteria_groups(inclusion, exclusion) {
            group.visit_concept_events(&mut |event| {
                if event.instance.is_some_and(|n| n < 0) {
                    referenced.insert(event.event_type.clone());
                }
            });
        }
        self.registered(&referenced)
    }

    fn registered(&self, referenced: &BTreeSet<String>) -> Vec<&str> {
        self.domains
            .keys()
            .filter(|tag| referenced.contains(tag.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Builds the cohort membership query.
    ///
    /// `demographics` applies on top of the inclusion criteria's own
    /// demographics.
    pub(crate) fn build_cohort_query(
        &self,
        inclusion: &CohortCreationCriteria,
        exclusion: Option<&CohortCreationCriteria>,
        demographics: Option<&DemographicsCriteria>,
    ) -> Query {
        let person_id = ident(PERSON_ID);
        let p = ident("p");
        let qe = ident("qe");
        let qualifying = ident(QUALIFYING_EVENTS);

        let ranked = self.ranked_domains(inclusion, exclusion);
        let descending = self.descending_ranked_domains(inclusion, exclusion);
        let mut ctes: Vec<Cte> = ranked
            .iter()
            .filter_map(|tag| self.domains.get(*tag))
            .map(|domain| domain.ranked_view_cte(SortOrder::Asc))
            .collect();

        let temporal = inclusion.has_temporal_events();
        let qualifying_query = if temporal {
            self.qualifying_rows(&inclusion.temporal_events)
                .unwrap_or_else(|| {
                    warn!("no inclusion group could be rendered, cohort will be empty");
                    self.no_events()
                })
        } else {
            let all_events: Vec<Query> = ctes
                .iter()
                .map(|cte| {
                    window_columns(Select::new(), 0)
                        .from(FromItem::table(&cte.name))
                        .into_query()
                })
                .collect();
            if all_events.is_empty() {
                self.no_events()
            } else {
                Query::union_all(all_events)
            }
        };
        ctes.extend(
            descending
                .iter()
                .filter_map(|tag| self.domains.get(*tag))
                .map(|domain| domain.ranked_view_cte(SortOrder::Desc)),
        );
        ctes.push(Cte::new(qualifying.clone(), qualifying_query));

        let on = Expr::qualified(&qe, &person_id).equals(Expr::qualified(&p, &person_id));
        let mut select = Select::new()
            .column_as(Expr::qualified(&p, &person_id), &person_id)
            .column_as(
                Expr::min(Expr::qualified(&qe, &ident(WINDOW_START_DATE))),
                &ident(COHORT_START_DATE),
            )
            .column_as(
                Expr::max(Expr::qualified(&qe, &ident(WINDOW_END_DATE))),
                &ident(COHORT_END_DATE),
            )
            .from(FromItem::aliased(&self.person.table, &p));
        select = if temporal {
            select.join(FromItem::aliased(&qualifying, &qe), on)
        } else {
            select.left_join(FromItem::aliased(&qualifying, &qe), on)
        };

        let demographic_filters = inclusion
            .demographics
            .iter()
            .chain(demographics)
            .flat_map(|d| self.demographic_predicates(&p, d));
        for predicate in demographic_filters {
            select = select.filter(predicate);
        }
        if let Some(exclusion) = exclusion.and_then(|e| self.exclusion_predicate(e)) {
            select = select.filter(exclusion);
        }

        let query = Query::with(
            ctes,
            select
                .group_by(Expr::qualified(&p, &person_id))
                .order_by(Expr::qualified(&p, &person_id)),
        );
        debug!(
            dialect = %self.dialect,
            ranked_domains = ranked.len(),
            descending_domains = descending.len(),
            inclusion_groups = inclusion.temporal_events.len(),
            has_exclusion = exclusion.is_some(),
            "built cohort query"
        );
        query
    }

    /// Compiles criteria to SQL text.
    pub fn compile_cohort_query(
        &self,
        inclusion: &CohortCreationCriteria,
        exclusion: Option<&CohortCreationCriteria>,
        demographics: Option<&DemographicsCriteria>,
    ) -> String {
        let sql = self
            .build_cohort_query(inclusion, exclusion, demographics)
            .to_sql(self.dialect);
        debug!(sql_len = sql.len(), "compiled cohort query");
        sql
    }

    /// Compiles a full cohort definition document.
    pub fn compile_config(&self, config: &CohortCreationConfig) -> String {
        self.compile_cohort_query(
            &config.inclusion_criteria,
            config.exclusion_criteria.as_ref(),
            None,
        )
    }

    fn no_events(&self) -> Query {
        null_dates(Select::new())
            .from(FromItem::table(&self.person.table))
            .filter(Expr::int(1).equals(Expr::int(0)))
            .into_query()
    }
}

/// Compiles criteria with the default OMOP configuration.
pub fn compile_cohort_query(
    inclusion: &CohortCreationCriteria,
    exclusion: Option<&CohortCreationCriteria>,
    demographics: Option<&DemographicsCriteria>,
) -> CompileResult<String> {
    let compiler = CohortQueryCompiler::new(CompilerConfig::default())?;
    Ok(compiler.compile_cohort_query(inclusion, exclusion, demographics))
}

fn criteria_groups<'a>(
    inclusion: &'a CohortCreationCriteria,
    exclusion: Option<&'a CohortCreationCriteria>,
) -> impl Iterator<Item = &'a TemporalEventGroup> {
    let exclusion_groups = exclusion.map(|e| e.temporal_events.as_slice()).unwrap_or(&[]);
    inclusion.temporal_events.iter().chain(exclusion_groups)
}

/// Projects the event columns, qualified and re-aliased when `table` is given.
fn event_columns(select: Select, table: Option<&Ident>) -> Select {
    EVENT_COLUMNS.into_iter().fold(select, |select, name| {
        let column = ident(name);
        match table {
            Some(table) => select.column_as(Expr::qualified(table, &column), &column),
            None => select.column(Expr::column(&column)),
        }
    })
}

/// Projects ranked-view rows with their cohort window widened by `offset` days.
fn window_columns(select: Select, offset: i32) -> Select {
    let offset = i64::from(offset);
    let start = Expr::column(&ident(EVENT_START_DATE));
    let end = Expr::column(&ident(EVENT_END_DATE));
    select
        .column(Expr::column(&ident(PERSON_ID)))
        .column(start.clone())
        .column(end.clone())
        .column_as(start.add_days(offset.min(0)), &ident(WINDOW_START_DATE))
        .column_as(end.add_days(offset.max(0)), &ident(WINDOW_END_DATE))
}

/// `person_id` followed by NULL for every date column.
fn null_dates(select: Select) -> Select {
    EVENT_COLUMNS[1..]
        .iter()
        .fold(select.column(Expr::column(&ident(PERSON_ID))), |select, &name| {
            select.column_as(Expr::null_date(), &ident(name))
        })
}
