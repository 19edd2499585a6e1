//! Typed SQL builder.
//!
//! Queries are assembled from [`Select`], [`Expr`] and [`Query`] values and
//! rendered for one [`SqlDialect`]. Names only enter a query as validated
//! [`Ident`]s and values only as typed literals, so generated text never
//! depends on callers having sanitized anything.

use std::fmt;

use chrono::NaiveDate;

use crate::error::{CompileError, CompileResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Dialect
// =============================================================================

/// Target SQL engine.
///
/// Engines differ only in date handling and numeric casts for the queries
/// built here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SqlDialect {
    /// PostgreSQL: `DATE '...'` literals, `date - date` yields days.
    #[default]
    Postgres,
    /// DuckDB: `DATE '...'` literals, `DATE_DIFF('day', a, b)`.
    DuckDb,
    /// SQLite: ISO text dates, `julianday` arithmetic.
    Sqlite,
}

impl SqlDialect {
    /// Dialect name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "postgres",
            SqlDialect::DuckDb => "duckdb",
            SqlDialect::Sqlite => "sqlite",
        }
    }

    /// Renders a date literal.
    pub fn date_literal(&self, date: NaiveDate) -> String {
        let text = date.format(DATE_FORMAT);
        match self {
            SqlDialect::Postgres | SqlDialect::DuckDb => format!("DATE '{}'", text),
            SqlDialect::Sqlite => format!("'{}'", text),
        }
    }

    /// Renders the number of days from `earlier` to `later`.
    pub fn day_diff(&self, later: &str, earlier: &str) -> String {
        match self {
            SqlDialect::Postgres => format!("({} - {})", later, earlier),
            SqlDialect::DuckDb => format!("DATE_DIFF('day', {}, {})", earlier, later),
            SqlDialect::Sqlite => format!("(julianday({}) - julianday({}))", later, earlier),
        }
    }

    /// Renders `date` shifted by `days` (negative moves it earlier).
    pub fn add_days(&self, date: &str, days: i64) -> String {
        let sign = if days < 0 { '-' } else { '+' };
        let magnitude = days.unsigned_abs();
        match self {
            SqlDialect::Postgres | SqlDialect::DuckDb => {
                format!("({} {} {})", date, sign, magnitude)
            }
            SqlDialect::Sqlite => format!("date({}, '{}{} days')", date, sign, magnitude),
        }
    }

    fn float_type(&self) -> &'static str {
        match self {
            SqlDialect::Postgres => "DOUBLE PRECISION",
            SqlDialect::DuckDb => "DOUBLE",
            SqlDialect::Sqlite => "REAL",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// A validated SQL identifier, optionally schema-qualified (`cdm.person`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Ident(String);

impl Ident {
    /// Validates `name` as `[A-Za-z_][A-Za-z0-9_]*` segments joined by `.`.
    pub(crate) fn new(name: impl Into<String>) -> CompileResult<Self> {
        let name = name.into();
        if is_plain_identifier(&name) {
            Ok(Self(name))
        } else {
            Err(CompileError::InvalidIdentifier(name))
        }
    }

    /// Identifier from a literal in this crate's own source.
    pub(crate) fn known(name: &'static str) -> Self {
        debug_assert!(is_plain_identifier(name), "bad built-in identifier {name}");
        Self(name.to_string())
    }

    /// Alias composed by the compiler from built-in parts and indices.
    pub(crate) fn generated(name: String) -> Self {
        debug_assert!(is_plain_identifier(&name), "bad generated alias {name}");
        Self(name)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Div,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Div => "/",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::And => 1,
            BinaryOp::Div => 3,
            _ => 2,
        }
    }
}

/// Direction of a window ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortOrder {
    Asc,
    Desc,
}

/// A SQL expression.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Column {
        table: Option<Ident>,
        name: Ident,
    },
    Int(i64),
    /// Quoted with `''` escaping.
    Str(String),
    Date(NaiveDate),
    NullDate,
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Inclusive on both ends.
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    InSubquery {
        expr: Box<Expr>,
        query: Box<Query>,
        negated: bool,
    },
    Function {
        name: &'static str,
        args: Vec<Expr>,
        distinct: bool,
    },
    CountStar,
    RowNumber {
        partition_by: Vec<Expr>,
        order_by: Vec<Expr>,
        order: SortOrder,
    },
    DayDiff {
        later: Box<Expr>,
        earlier: Box<Expr>,
    },
    AddDays {
        date: Box<Expr>,
        days: i64,
    },
    /// Cast to the dialect's double type.
    ToFloat(Box<Expr>),
    Subquery(Box<Query>),
}

impl Expr {
    pub(crate) fn column(name: &Ident) -> Self {
        Expr::Column {
            table: None,
            name: name.clone(),
        }
    }

    pub(crate) fn qualified(table: &Ident, name: &Ident) -> Self {
        Expr::Column {
            table: Some(table.clone()),
            name: name.clone(),
        }
    }

    pub(crate) fn int(value: i64) -> Self {
        Expr::Int(value)
    }

    pub(crate) fn string(value: impl Into<String>) -> Self {
        Expr::Str(value.into())
    }

    pub(crate) fn date(value: NaiveDate) -> Self {
        Expr::Date(value)
    }

    pub(crate) fn null_date() -> Self {
        Expr::NullDate
    }

    fn binary(self, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    pub(crate) fn equals(self, right: Expr) -> Self {
        self.binary(BinaryOp::Eq, right)
    }

    pub(crate) fn lt(self, right: Expr) -> Self {
        self.binary(BinaryOp::Lt, right)
    }

    pub(crate) fn gt(self, right: Expr) -> Self {
        self.binary(BinaryOp::Gt, right)
    }

    pub(crate) fn lte(self, right: Expr) -> Self {
        self.binary(BinaryOp::Lte, right)
    }

    pub(crate) fn gte(self, right: Expr) -> Self {
        self.binary(BinaryOp::Gte, right)
    }

    pub(crate) fn and(self, right: Expr) -> Self {
        self.binary(BinaryOp::And, right)
    }

    pub(crate) fn div(self, right: Expr) -> Self {
        self.binary(BinaryOp::Div, right)
    }

    pub(crate) fn between(self, low: Expr, high: Expr) -> Self {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
        }
    }

    pub(crate) fn in_query(self, query: impl Into<Query>) -> Self {
        Expr::InSubquery {
            expr: Box::new(self),
            query: Box::new(query.into()),
            negated: false,
        }
    }

    pub(crate) fn not_in_query(self, query: impl Into<Query>) -> Self {
        Expr::InSubquery {
            expr: Box::new(self),
            query: Box::new(query.into()),
            negated: true,
        }
    }

    fn func(name: &'static str, args: Vec<Expr>, distinct: bool) -> Self {
        Expr::Function {
            name,
            args,
            distinct,
        }
    }

    pub(crate) fn min(expr: Expr) -> Self {
        Self::func("MIN", vec![expr], false)
    }

    pub(crate) fn max(expr: Expr) -> Self {
        Self::func("MAX", vec![expr], false)
    }

    pub(crate) fn coalesce(args: Vec<Expr>) -> Self {
        Self::func("COALESCE", args, false)
    }

    pub(crate) fn count_distinct(expr: Expr) -> Self {
        Self::func("COUNT", vec![expr], true)
    }

    pub(crate) fn row_number(
        partition_by: Vec<Expr>,
        order_by: Vec<Expr>,
        order: SortOrder,
    ) -> Self {
        Expr::RowNumber {
            partition_by,
            order_by,
            order,
        }
    }

    /// Days from `earlier` to `later`.
    pub(crate) fn day_diff(later: Expr, earlier: Expr) -> Self {
        Expr::DayDiff {
            later: Box::new(later),
            earlier: Box::new(earlier),
        }
    }

    /// `self` moved by `days`; a zero shift returns `self` unchanged.
    pub(crate) fn add_days(self, days: i64) -> Self {
        if days == 0 {
            return self;
        }
        Expr::AddDays {
            date: Box::new(self),
            days,
        }
    }

    pub(crate) fn to_float(self) -> Self {
        Expr::ToFloat(Box::new(self))
    }

    pub(crate) fn subquery(query: impl Into<Query>) -> Self {
        Expr::Subquery(Box::new(query.into()))
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Between { .. } | Expr::InSubquery { .. } => 2,
            _ => u8::MAX,
        }
    }

    pub(crate) fn to_sql(&self, dialect: SqlDialect) -> String {
        match self {
            Expr::Column { table: Some(t), name } => format!("{}.{}", t, name),
            Expr::Column { table: None, name } => name.to_string(),
            Expr::Int(n) => n.to_string(),
            Expr::Str(s) => format!("'{}'", s.replace('\'', "''")),
            Expr::Date(d) => dialect.date_literal(*d),
            Expr::NullDate => "CAST(NULL AS DATE)".to_string(),
            Expr::Binary { left, op, right } => {
                let prec = op.precedence();
                // AND chains stay flat; other equal-precedence right operands are grouped.
                let left_grouped = left.precedence() < prec;
                let right_grouped = right.precedence() < prec
                    || (right.precedence() == prec && *op != BinaryOp::And);
                format!(
                    "{} {} {}",
                    wrap_if(left, dialect, left_grouped),
                    op.symbol(),
                    wrap_if(right, dialect, right_grouped)
                )
            }
            Expr::Between { expr, low, high } => format!(
                "{} BETWEEN {} AND {}",
                wrap_if(expr, dialect, expr.precedence() <= 2),
                wrap_if(low, dialect, low.precedence() <= 2),
                wrap_if(high, dialect, high.precedence() <= 2),
            ),
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => format!(
                "{} {}IN ({})",
                wrap_if(expr, dialect, expr.precedence() <= 2),
                if *negated { "NOT " } else { "" },
                query.to_sql(dialect)
            ),
            Expr::Function {
                name,
                args,
                distinct,
            } => format!(
                "{}({}{})",
                name,
                if *distinct { "DISTINCT " } else { "" },
                join_exprs(args, dialect)
            ),
            Expr::CountStar => "COUNT(*)".to_string(),
            Expr::RowNumber {
                partition_by,
                order_by,
                order,
            } => {
                let mut window = Vec::new();
                if !partition_by.is_empty() {
                    window.push(format!("PARTITION BY {}", join_exprs(partition_by, dialect)));
                }
                if !order_by.is_empty() {
                    let direction = match order {
                        SortOrder::Asc => "",
                        SortOrder::Desc => " DESC",
                    };
                    let keys = order_by
                        .iter()
                        .map(|key| format!("{}{}", key.to_sql(dialect), direction))
                        .collect::<Vec<_>>();
                    window.push(format!("ORDER BY {}", keys.join(", ")));
                }
                format!("ROW_NUMBER() OVER ({})", window.join(" "))
            }
            Expr::DayDiff { later, earlier } => {
                dialect.day_diff(&later.to_sql(dialect), &earlier.to_sql(dialect))
            }
            Expr::AddDays { date, days } => dialect.add_days(&date.to_sql(dialect), *days),
            Expr::ToFloat(expr) => {
                format!("CAST({} AS {})", expr.to_sql(dialect), dialect.float_type())
            }
            Expr::Subquery(query) => format!("({})", query.to_sql(dialect)),
        }
    }
}

fn wrap_if(expr: &Expr, dialect: SqlDialect, wrap: bool) -> String {
    if wrap {
        format!("({})", expr.to_sql(dialect))
    } else {
        expr.to_sql(dialect)
    }
}

fn join_exprs(exprs: &[Expr], dialect: SqlDialect) -> String {
    exprs
        .iter()
        .map(|e| e.to_sql(dialect))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// SELECT
// =============================================================================

/// A FROM or JOIN source.
#[derive(Debug, Clone)]
pub(crate) enum FromItem {
    Table { name: Ident, alias: Option<Ident> },
    /// Derived tables always carry an alias.
    Subquery { query: Box<Query>, alias: Ident },
}

impl FromItem {
    pub(crate) fn table(name: &Ident) -> Self {
        FromItem::Table {
            name: name.clone(),
            alias: None,
        }
    }

    pub(crate) fn aliased(name: &Ident, alias: &Ident) -> Self {
        FromItem::Table {
            name: name.clone(),
            alias: Some(alias.clone()),
        }
    }

    pub(crate) fn subquery(query: impl Into<Query>, alias: &Ident) -> Self {
        FromItem::Subquery {
            query: Box::new(query.into()),
            alias: alias.clone(),
        }
    }

    fn to_sql(&self, dialect: SqlDialect) -> String {
        match self {
            FromItem::Table { name, alias: None } => name.to_string(),
            FromItem::Table {
                name,
                alias: Some(alias),
            } => format!("{} AS {}", name, alias),
            FromItem::Subquery { query, alias } => {
                format!("({}) AS {}", query.to_sql(dialect), alias)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    left: bool,
    item: FromItem,
    on: Expr,
}

/// A single SELECT statement.
#[derive(Debug, Clone, Default)]
#[must_use = "builders have no effect until used"]
pub(crate) struct Select {
    distinct: bool,
    projection: Vec<(Expr, Option<Ident>)>,
    from: Option<FromItem>,
    joins: Vec<Join>,
    filter: Option<Expr>,
    group_by: Vec<Expr>,
    order_by: Vec<Expr>,
}

impl Select {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub(crate) fn column(mut self, expr: Expr) -> Self {
        self.projection.push((expr, None));
        self
    }

    pub(crate) fn column_as(mut self, expr: Expr, alias: &Ident) -> Self {
        self.projection.push((expr, Some(alias.clone())));
        self
    }

    pub(crate) fn from(mut self, item: FromItem) -> Self {
        self.from = Some(item);
        self
    }

    pub(crate) fn join(mut self, item: FromItem, on: Expr) -> Self {
        self.joins.push(Join {
            left: false,
            item,
            on,
        });
        self
    }

    pub(crate) fn left_join(mut self, item: FromItem, on: Expr) -> Self {
        self.joins.push(Join {
            left: true,
            item,
            on,
        });
        self
    }

    /// Adds a WHERE predicate, AND-ed with any existing one.
    pub(crate) fn filter(mut self, predicate: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub(crate) fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub(crate) fn order_by(mut self, expr: Expr) -> Self {
        self.order_by.push(expr);
        self
    }

    pub(crate) fn into_query(self) -> Query {
        Query::Select(Box::new(self))
    }

    fn to_sql(&self, dialect: SqlDialect) -> String {
        let projection = if self.projection.is_empty() {
            "*".to_string()
        } else {
            self.projection
                .iter()
                .map(|(expr, alias)| match alias {
                    Some(alias) => format!("{} AS {}", expr.to_sql(dialect), alias),
                    None => expr.to_sql(dialect),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!(
            "SELECT {}{}",
            if self.distinct { "DISTINCT " } else { "" },
            projection
        );
        if let Some(from) = &self.from {
            sql.push_str(" FROM ");
            sql.push_str(&from.to_sql(dialect));
        }
        for join in &self.joins {
            sql.push_str(if join.left { " LEFT JOIN " } else { " JOIN " });
            sql.push_str(&join.item.to_sql(dialect));
            sql.push_str(" ON ");
            sql.push_str(&join.on.to_sql(dialect));
        }
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.to_sql(dialect));
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&join_exprs(&self.group_by, dialect));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&join_exprs(&self.order_by, dialect));
        }
        sql
    }
}

// =============================================================================
// Queries
// =============================================================================

/// A named common table expression.
#[derive(Debug, Clone)]
pub(crate) struct Cte {
    pub(crate) name: Ident,
    pub(crate) query: Query,
}

impl Cte {
    pub(crate) fn new(name: Ident, query: impl Into<Query>) -> Self {
        Self {
            name,
            query: query.into(),
        }
    }
}

/// A complete query.
#[derive(Debug, Clone)]
pub(crate) enum Query {
    Select(Box<Select>),
    /// Members joined by `UNION ALL` (`all`) or `UNION`.
    Compound {
        all: bool,
        members: Vec<Query>,
    },
    With {
        ctes: Vec<Cte>,
        body: Box<Query>,
    },
}

impl Query {
    /// `UNION` of the members (a single member is returned as is).
    pub(crate) fn union(members: Vec<Query>) -> Self {
        Self::compound(false, members)
    }

    /// `UNION ALL` of the members (a single member is returned as is).
    pub(crate) fn union_all(members: Vec<Query>) -> Self {
        Self::compound(true, members)
    }

    fn compound(all: bool, mut members: Vec<Query>) -> Self {
        if members.len() == 1 {
            return members.remove(0);
        }
        Query::Compound { all, members }
    }

    pub(crate) fn with(ctes: Vec<Cte>, body: impl Into<Query>) -> Self {
        Query::With {
            ctes,
            body: Box::new(body.into()),
        }
    }

    /// Renders the query as a single line of SQL.
    pub(crate) fn to_sql(&self, dialect: SqlDialect) -> String {
        match self {
            Query::Select(select) => select.to_sql(dialect),
            Query::Compound { all, members } => members
                .iter()
                .enumerate()
                .map(|(i, member)| match member {
                    Query::Select(select) => select.to_sql(dialect),
                    // Compound members cannot be parenthesized portably.
                    nested => format!("SELECT * FROM ({}) AS set_{}", nested.to_sql(dialect), i),
                })
                .collect::<Vec<_>>()
                .join(if *all { " UNION ALL " } else { " UNION " }),
            Query::With { ctes, body } => {
                let defs = ctes
                    .iter()
                    .map(|cte| format!("{} AS ({})", cte.name, cte.query.to_sql(dialect)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("WITH {} {}", defs, body.to_sql(dialect))
            }
        }
    }
}

impl From<Select> for Query {
    fn from(select: Select) -> Self {
        select.into_query()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Ident {
        Ident::new(name).unwrap()
    }

    #[test]
    fn test_identifier_validation() {
        assert!(Ident::new("person").is_ok());
        assert!(Ident::new("cdm.person").is_ok());
        assert!(Ident::new("_tmp1").is_ok());
        assert!(Ident::new("").is_err());
        assert!(Ident::new("1person").is_err());
        assert!(Ident::new("person;").is_err());
        assert!(Ident::new("cdm.").is_err());
        assert_eq!(
            Ident::new("drop table").unwrap_err(),
            CompileError::InvalidIdentifier("drop table".to_string())
        );
    }

    #[test]
    fn test_string_literal_escaped() {
        let expr = Expr::string("O'Brien");
        assert_eq!(expr.to_sql(SqlDialect::Postgres), "'O''Brien'");
    }

    #[test]
    fn test_dialect_dates() {
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(Expr::date(day).to_sql(SqlDialect::Postgres), "DATE '2020-01-01'");
        assert_eq!(Expr::date(day).to_sql(SqlDialect::DuckDb), "DATE '2020-01-01'");
        assert_eq!(Expr::date(day).to_sql(SqlDialect::Sqlite), "'2020-01-01'");
    }

    #[test]
    fn test_dialect_day_diff() {
        let diff = Expr::day_diff(
            Expr::qualified(&id("e2"), &id("d")),
            Expr::qualified(&id("e1"), &id("d")),
        );
        assert_eq!(diff.to_sql(SqlDialect::Postgres), "(e2.d - e1.d)");
        assert_eq!(diff.to_sql(SqlDialect::DuckDb), "DATE_DIFF('day', e1.d, e2.d)");
        assert_eq!(
            diff.to_sql(SqlDialect::Sqlite),
            "(julianday(e2.d) - julianday(e1.d))"
        );
    }

    #[test]
    fn test_dialect_add_days() {
        let start = Expr::column(&id("event_start_date"));
        assert_eq!(start.clone().add_days(0).to_sql(SqlDialect::Postgres), "event_start_date");
        assert_eq!(
            start.clone().add_days(-30).to_sql(SqlDialect::Postgres),
            "(event_start_date - 30)"
        );
        assert_eq!(
            start.clone().add_days(7).to_sql(SqlDialect::DuckDb),
            "(event_start_date + 7)"
        );
        assert_eq!(
            start.clone().add_days(-30).to_sql(SqlDialect::Sqlite),
            "date(event_start_date, '-30 days')"
        );
        assert_eq!(
            start.add_days(7).to_sql(SqlDialect::Sqlite),
            "date(event_start_date, '+7 days')"
        );
    }

    #[test]
    fn test_float_cast_per_dialect() {
        let ratio = Expr::column(&id("n"))
            .to_float()
            .div(Expr::column(&id("total")));
        assert_eq!(
            ratio.to_sql(SqlDialect::Postgres),
            "CAST(n AS DOUBLE PRECISION) / total"
        );
        assert_eq!(ratio.to_sql(SqlDialect::DuckDb), "CAST(n AS DOUBLE) / total");
        assert_eq!(ratio.to_sql(SqlDialect::Sqlite), "CAST(n AS REAL) / total");
    }

    #[test]
    fn test_operand_grouping() {
        let a = Expr::column(&id("a")).equals(Expr::int(1));
        let b = Expr::column(&id("b")).gte(Expr::int(2));
        let c = Expr::column(&id("c")).lt(Expr::int(3));
        assert_eq!(
            a.and(b.and(c)).to_sql(SqlDialect::Postgres),
            "a = 1 AND b >= 2 AND c < 3"
        );

        let expr = Expr::column(&id("n")).div(Expr::column(&id("a")).div(Expr::column(&id("b"))));
        assert_eq!(expr.to_sql(SqlDialect::Postgres), "n / (a / b)");
    }

    #[test]
    fn test_select_rendering() {
        let query = Select::new()
            .distinct()
            .column_as(Expr::qualified(&id("p"), &id("person_id")), &id("pid"))
            .from(FromItem::aliased(&id("person"), &id("p")))
            .left_join(
                FromItem::aliased(&id("visit_occurrence"), &id("v")),
                Expr::qualified(&id("v"), &id("person_id"))
                    .equals(Expr::qualified(&id("p"), &id("person_id"))),
            )
            .filter(Expr::qualified(&id("p"), &id("year_of_birth")).gte(Expr::int(1950)))
            .filter(Expr::qualified(&id("p"), &id("year_of_birth")).lte(Expr::int(1990)))
            .group_by(Expr::qualified(&id("p"), &id("person_id")))
            .order_by(Expr::qualified(&id("p"), &id("person_id")))
            .into_query();

        assert_eq!(
            query.to_sql(SqlDialect::Postgres),
            "SELECT DISTINCT p.person_id AS pid FROM person AS p \
             LEFT JOIN visit_occurrence AS v ON v.person_id = p.person_id \
             WHERE p.year_of_birth >= 1950 AND p.year_of_birth <= 1990 \
             GROUP BY p.person_id ORDER BY p.person_id"
        );
    }

    #[test]
    fn test_nested_compound_member_is_wrapped() {
        let leaf = |table: &str| {
            Select::new()
                .column(Expr::column(&id("person_id")))
                .from(FromItem::table(&id(table)))
                .into_query()
        };
        let inner = Query::union(vec![leaf("a"), leaf("b")]);
        let outer = Query::union_all(vec![inner, leaf("c")]);
        assert_eq!(
            outer.to_sql(SqlDialect::Sqlite),
            "SELECT * FROM (SELECT person_id FROM a UNION SELECT person_id FROM b) AS set_0 \
             UNION ALL SELECT person_id FROM c"
        );
        assert!(matches!(Query::union(vec![leaf("a")]), Query::Select(_)));
    }

    #[test]
    fn test_with_and_descending_window() {
        let ranked = Select::new()
            .column(Expr::column(&id("person_id")))
            .column_as(
                Expr::row_number(
                    vec![Expr::column(&id("person_id"))],
                    vec![Expr::column(&id("visit_start_date"))],
                    SortOrder::Desc,
                ),
                &id("event_instance"),
            )
            .from(FromItem::table(&id("visit_occurrence")));
        let body = Select::new().from(FromItem::table(&id("ranked")));
        let query = Query::with(vec![Cte::new(id("ranked"), ranked)], body);
        assert_eq!(
            query.to_sql(SqlDialect::Postgres),
            "WITH ranked AS (SELECT person_id, ROW_NUMBER() OVER (PARTITION BY person_id \
             ORDER BY visit_start_date DESC) AS event_instance FROM visit_occurrence) \
             SELECT * FROM ranked"
        );
    }

    #[test]
    fn test_between_and_count_distinct() {
        let expr = Expr::day_diff(Expr::column(&id("b")), Expr::column(&id("a")))
            .between(Expr::int(2), Expr::int(5));
        assert_eq!(expr.to_sql(SqlDialect::Postgres), "(b - a) BETWEEN 2 AND 5");

        let count = Expr::count_distinct(Expr::column(&id("person_id")));
        assert_eq!(count.to_sql(SqlDialect::Postgres), "COUNT(DISTINCT person_id)");
        assert_eq!(Expr::CountStar.to_sql(SqlDialect::Sqlite), "COUNT(*)");
    }
}
