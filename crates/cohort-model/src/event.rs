//! Temporal algebra over clinical events.
//!
//! A criteria tree is made of [`TemporalNode`]s: either a single
//! [`TemporalEvent`] or a [`TemporalEventGroup`] combining children with
//! `AND`, `OR`, `NOT` or `BEFORE`. Operator arity is part of the type:
//! `NOT` holds one child and `BEFORE` holds exactly two, so a tree that
//! exists has already passed validation.
//!
//! The JSON shape matches the cohort definition documents:
//!
//! ```json
//! {
//!   "operator": "BEFORE",
//!   "events": [
//!     {"event_type": "condition_occurrence", "event_concept_id": 201826},
//!     {"event_type": "drug_exposure", "event_concept_id": 4285892, "event_instance": 2,
//!      "offset": 30}
//!   ],
//!   "interval": [0, 30]
//! }
//! ```

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::DATE_EVENT_TYPE;
use crate::error::{ModelError, ModelResult};
use crate::ConceptId;

/// Upper interval bound used when a `BEFORE` interval leaves it open.
pub const DEFAULT_INTERVAL_END_DAYS: i64 = 99_999;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Events
// =============================================================================

/// Reference to occurrences of one concept in one clinical domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptEvent {
    /// Domain tag, e.g. `condition_occurrence`.
    pub event_type: String,
    /// Concept to match.
    pub concept_id: ConceptId,
    /// Occurrence ordinal, never zero. Positive counts from the first
    /// occurrence, negative from the last (None = any occurrence).
    pub instance: Option<i32>,
    /// Days the cohort window is widened by: a negative offset moves the
    /// window start earlier, a positive one moves the window end later.
    pub offset: i32,
}

/// A literal date used as a temporal anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateAnchor {
    /// The anchor date.
    pub timestamp: NaiveDate,
}

/// A single clinical observation reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub enum TemporalEvent {
    /// Occurrences of a concept.
    Concept(ConceptEvent),
    /// A fixed date not tied to any person.
    Date(DateAnchor),
}

impl TemporalEvent {
    /// Any occurrence of `concept_id` in the given domain.
    pub fn concept(event_type: impl Into<String>, concept_id: ConceptId) -> Self {
        Self::Concept(ConceptEvent {
            event_type: event_type.into(),
            concept_id,
            instance: None,
            offset: 0,
        })
    }

    /// Occurrences of `concept_id` selected by ordinal.
    ///
    /// `instance = 2` keeps the second occurrence onwards; `instance = -1`
    /// keeps only the last one.
    pub fn nth(
        event_type: impl Into<String>,
        concept_id: ConceptId,
        instance: i32,
    ) -> ModelResult<Self> {
        if instance == 0 {
            return Err(ModelError::InvalidInstance(0));
        }
        Ok(Self::Concept(ConceptEvent {
            event_type: event_type.into(),
            concept_id,
            instance: Some(instance),
            offset: 0,
        }))
    }

    /// Widens the cohort window this event contributes by `days`.
    ///
    /// Date anchors have no window and are returned unchanged.
    pub fn with_offset(mut self, days: i32) -> Self {
        if let TemporalEvent::Concept(event) = &mut self {
            event.offset = days;
        }
        self
    }

    /// A literal date anchor.
    pub fn date(timestamp: NaiveDate) -> Self {
        Self::Date(DateAnchor { timestamp })
    }

    /// The event type tag (`date` for anchors).
    pub fn event_type(&self) -> &str {
        match self {
            TemporalEvent::Concept(event) => &event.event_type,
            TemporalEvent::Date(_) => DATE_EVENT_TYPE,
        }
    }

    /// Returns the anchor if this is a date event.
    pub fn as_date_anchor(&self) -> Option<&DateAnchor> {
        match self {
            TemporalEvent::Date(anchor) => Some(anchor),
            TemporalEvent::Concept(_) => None,
        }
    }
}

// =============================================================================
// Groups
// =============================================================================

/// Boolean/temporal operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventOperator {
    /// All children must be satisfied.
    And,
    /// Any child may be satisfied.
    Or,
    /// The single child must not be satisfied.
    Not,
    /// The first child occurs before the second.
    Before,
}

impl EventOperator {
    /// Upper-case operator name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOperator::And => "AND",
            EventOperator::Or => "OR",
            EventOperator::Not => "NOT",
            EventOperator::Before => "BEFORE",
        }
    }
}

impl fmt::Display for EventOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive bound on the day distance between the two `BEFORE` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayInterval {
    /// Minimum days between the events.
    pub start_days: i64,
    /// Maximum days between the events.
    pub end_days: i64,
}

impl DayInterval {
    /// Creates an interval, defaulting open bounds to `0` and [`DEFAULT_INTERVAL_END_DAYS`].
    pub fn new(start_days: Option<i64>, end_days: Option<i64>) -> ModelResult<Self> {
        let start_days = start_days.unwrap_or(0);
        let end_days = end_days.unwrap_or(DEFAULT_INTERVAL_END_DAYS);
        if start_days > end_days {
            return Err(ModelError::InvertedInterval {
                start: start_days,
                end: end_days,
            });
        }
        Ok(Self {
            start_days,
            end_days,
        })
    }

    fn from_raw(raw: &[Option<i64>]) -> ModelResult<Self> {
        match raw {
            [start, end] => Self::new(*start, *end),
            other => Err(ModelError::IntervalLength(other.len())),
        }
    }
}

/// A combinator node in the criteria tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub enum TemporalEventGroup {
    /// Persons satisfying every child.
    And(Vec<TemporalNode>),
    /// Persons satisfying any child.
    Or(Vec<TemporalNode>),
    /// Persons not satisfying the child.
    Not(Box<TemporalNode>),
    /// `first` happens before `second`, optionally within an interval.
    ///
    /// When one side is a date anchor, list order decides the comparison:
    /// an anchor in `first` keeps events after the date, an anchor in
    /// `second` keeps events before it.
    Before {
        /// Earlier child in list order.
        first: Box<TemporalNode>,
        /// Later child in list order.
        second: Box<TemporalNode>,
        /// Day distance bound, if any.
        interval: Option<DayInterval>,
    },
}

impl TemporalEventGroup {
    /// Conjunction of the given children.
    pub fn and(children: Vec<TemporalNode>) -> ModelResult<Self> {
        non_empty(EventOperator::And, &children)?;
        Ok(Self::And(children))
    }

    /// Disjunction of the given children.
    pub fn or(children: Vec<TemporalNode>) -> ModelResult<Self> {
        non_empty(EventOperator::Or, &children)?;
        Ok(Self::Or(children))
    }

    /// Negation of a child.
    pub fn not(child: impl Into<TemporalNode>) -> Self {
        Self::Not(Box::new(child.into()))
    }

    /// `first` before `second` with no interval bound.
    pub fn before(first: impl Into<TemporalNode>, second: impl Into<TemporalNode>) -> Self {
        Self::Before {
            first: Box::new(first.into()),
            second: Box::new(second.into()),
            interval: None,
        }
    }

    /// `first` before `second` with the day distance inside `interval`.
    pub fn before_within(
        first: impl Into<TemporalNode>,
        second: impl Into<TemporalNode>,
        interval: DayInterval,
    ) -> Self {
        Self::Before {
            first: Box::new(first.into()),
            second: Box::new(second.into()),
            interval: Some(interval),
        }
    }

    /// The group's operator.
    pub fn operator(&self) -> EventOperator {
        match self {
            TemporalEventGroup::And(_) => EventOperator::And,
            TemporalEventGroup::Or(_) => EventOperator::Or,
            TemporalEventGroup::Not(_) => EventOperator::Not,
            TemporalEventGroup::Before { .. } => EventOperator::Before,
        }
    }

    /// Children in list order.
    pub fn children(&self) -> Vec<&TemporalNode> {
        match self {
            TemporalEventGroup::And(children) | TemporalEventGroup::Or(children) => {
                children.iter().collect()
            }
            TemporalEventGroup::Not(child) => vec![child.as_ref()],
            TemporalEventGroup::Before { first, second, .. } => {
                vec![first.as_ref(), second.as_ref()]
            }
        }
    }

    /// Interval bound (only `BEFORE` groups carry one).
    pub fn interval(&self) -> Option<DayInterval> {
        match self {
            TemporalEventGroup::Before { interval, .. } => *interval,
            _ => None,
        }
    }

    /// Adds every concrete event type referenced below this group to `out`.
    pub fn collect_event_types(&self, out: &mut BTreeSet<String>) {
        self.visit_concept_events(&mut |event| {
            out.insert(event.event_type.clone());
        });
    }

    /// Calls `f` for every concept event below this group, depth first.
    pub fn visit_concept_events<'a>(&'a self, f: &mut impl FnMut(&'a ConceptEvent)) {
        for child in self.children() {
            child.visit_concept_events(f);
        }
    }
}

fn non_empty(operator: EventOperator, children: &[TemporalNode]) -> ModelResult<()> {
    if children.is_empty() {
        return Err(ModelError::EmptyGroup {
            operator: operator.as_str(),
        });
    }
    Ok(())
}

/// Either a single event or a nested group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub enum TemporalNode {
    /// A leaf event.
    Event(TemporalEvent),
    /// A nested combinator.
    Group(TemporalEventGroup),
}

impl TemporalNode {
    /// Adds every concrete event type referenced in this subtree to `out`.
    ///
    /// Date anchors are skipped since they have no table.
    pub fn collect_event_types(&self, out: &mut BTreeSet<String>) {
        self.visit_concept_events(&mut |event| {
            out.insert(event.event_type.clone());
        });
    }

    /// Calls `f` for every concept event in this subtree, depth first.
    pub fn visit_concept_events<'a>(&'a self, f: &mut impl FnMut(&'a ConceptEvent)) {
        match self {
            TemporalNode::Event(TemporalEvent::Concept(event)) => f(event),
            TemporalNode::Event(TemporalEvent::Date(_)) => {}
            TemporalNode::Group(group) => group.visit_concept_events(f),
        }
    }

    /// Returns the anchor if this node is a date event.
    pub fn as_date_anchor(&self) -> Option<&DateAnchor> {
        match self {
            TemporalNode::Event(event) => event.as_date_anchor(),
            TemporalNode::Group(_) => None,
        }
    }
}

impl From<TemporalEvent> for TemporalNode {
    fn from(event: TemporalEvent) -> Self {
        TemporalNode::Event(event)
    }
}

impl From<TemporalEventGroup> for TemporalNode {
    fn from(group: TemporalEventGroup) -> Self {
        TemporalNode::Group(group)
    }
}

// =============================================================================
// Wire format
// =============================================================================

/// Untyped document node; every shape is validated on conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<EventOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    events: Option<Vec<RawNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interval: Option<Vec<Option<i64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_concept_id: Option<ConceptId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_instance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

fn parse_timestamp(value: &str) -> ModelResult<NaiveDate> {
    let trimmed = value.trim();
    match NaiveDate::parse_from_str(trimmed, TIMESTAMP_FORMAT) {
        Ok(date) => Ok(date),
        Err(source) => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S"))
            .map(|dt| dt.date())
            .map_err(|_| ModelError::InvalidTimestamp {
                value: value.to_string(),
                source,
            }),
    }
}

impl TryFrom<RawNode> for TemporalEvent {
    type Error = ModelError;

    fn try_from(raw: RawNode) -> ModelResult<Self> {
        if raw.events.is_some() {
            let operator = raw.operator.map(|op| op.as_str()).unwrap_or("unnamed");
            return Err(ModelError::ExpectedEvent(operator));
        }
        let event_type = raw.event_type.ok_or(ModelError::MissingEventType)?;

        if event_type == DATE_EVENT_TYPE {
            if raw.event_concept_id.is_some() {
                return Err(ModelError::ConceptIdOnDateEvent);
            }
            let timestamp = raw.timestamp.ok_or(ModelError::MissingTimestamp)?;
            return Ok(TemporalEvent::date(parse_timestamp(&timestamp)?));
        }

        let concept_id = raw
            .event_concept_id
            .ok_or_else(|| ModelError::MissingConceptId {
                event_type: event_type.clone(),
            })?;
        let instance = match raw.event_instance {
            None => None,
            Some(0) => return Err(ModelError::InvalidInstance(0)),
            Some(n) => Some(i32::try_from(n).map_err(|_| ModelError::InvalidInstance(n))?),
        };
        let offset = match raw.offset {
            None => 0,
            Some(days) => i32::try_from(days).map_err(|_| ModelError::InvalidOffset(days))?,
        };

        Ok(TemporalEvent::Concept(ConceptEvent {
            event_type,
            concept_id,
            instance,
            offset,
        }))
    }
}

impl TryFrom<RawNode> for TemporalEventGroup {
    type Error = ModelError;

    fn try_from(raw: RawNode) -> ModelResult<Self> {
        let Some(raw_events) = raw.events else {
            return Err(ModelError::ExpectedGroup);
        };
        let operator = raw.operator.ok_or(ModelError::MissingOperator)?;
        let interval = raw
            .interval
            .as_deref()
            .map(DayInterval::from_raw)
            .transpose()?;

        let mut children = raw_events
            .into_iter()
            .map(TemporalNode::try_from)
            .collect::<ModelResult<Vec<_>>>()?;
        non_empty(operator, &children)?;

        if interval.is_some() && operator != EventOperator::Before {
            tracing::debug!(%operator, "ignoring interval on non-BEFORE group");
        }

        match operator {
            EventOperator::And => Ok(TemporalEventGroup::And(children)),
            EventOperator::Or => Ok(TemporalEventGroup::Or(children)),
            EventOperator::Not => {
                if children.len() != 1 {
                    return Err(ModelError::OperatorArity {
                        operator: "NOT",
                        expected: 1,
                        found: children.len(),
                    });
                }
                Ok(TemporalEventGroup::Not(Box::new(children.remove(0))))
            }
            EventOperator::Before => {
                if children.len() != 2 {
                    return Err(ModelError::OperatorArity {
                        operator: "BEFORE",
                        expected: 2,
                        found: children.len(),
                    });
                }
                let second = children.remove(1);
                let first = children.remove(0);
                Ok(TemporalEventGroup::Before {
                    first: Box::new(first),
                    second: Box::new(second),
                    interval,
                })
            }
        }
    }
}

impl TryFrom<RawNode> for TemporalNode {
    type Error = ModelError;

    fn try_from(raw: RawNode) -> ModelResult<Self> {
        if raw.events.is_some() || raw.operator.is_some() {
            if raw.events.is_none() {
                return Err(ModelError::ExpectedGroup);
            }
            TemporalEventGroup::try_from(raw).map(TemporalNode::Group)
        } else {
            TemporalEvent::try_from(raw).map(TemporalNode::Event)
        }
    }
}

impl From<TemporalEvent> for RawNode {
    fn from(event: TemporalEvent) -> Self {
        match event {
            TemporalEvent::Concept(event) => RawNode {
                event_type: Some(event.event_type),
                event_concept_id: Some(event.concept_id),
                event_instance: event.instance.map(i64::from),
                offset: (event.offset != 0).then_some(i64::from(event.offset)),
                ..RawNode::default()
            },
            TemporalEvent::Date(anchor) => RawNode {
                event_type: Some(DATE_EVENT_TYPE.to_string()),
                timestamp: Some(anchor.timestamp.format(TIMESTAMP_FORMAT).to_string()),
                ..RawNode::default()
            },
        }
    }
}

impl From<TemporalEventGroup> for RawNode {
    fn from(group: TemporalEventGroup) -> Self {
        let operator = group.operator();
        let (children, interval) = match group {
            TemporalEventGroup::And(children) | TemporalEventGroup::Or(children) => {
                (children, None)
            }
            TemporalEventGroup::Not(child) => (vec![*child], None),
            TemporalEventGroup::Before {
                first,
                second,
                interval,
            } => (
                vec![*first, *second],
                interval.map(|i| vec![Some(i.start_days), Some(i.end_days)]),
            ),
        };
        RawNode {
            operator: Some(operator),
            events: Some(children.into_iter().map(RawNode::from).collect()),
            interval,
            ..RawNode::default()
        }
    }
}

impl From<TemporalNode> for RawNode {
    fn from(node: TemporalNode) -> Self {
        match node {
            TemporalNode::Event(event) => event.into(),
            TemporalNode::Group(group) => group.into(),
        }
    }
}
