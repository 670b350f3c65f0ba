//! Lookups and the lookup builder.
//!
//! A lookup is a filter key such as `name__icontains` paired with a value.
//! The [`LookupBuilder`] splits the key into a column path and a
//! [`LookupOp`], and resolves relation paths (`author__name`) into joined
//! column references when a [`Schema`] is available.

use std::collections::HashMap;
use std::sync::Arc;

use sqlq_core::{QueryError, QueryResult};

use super::builder::QueryBuilder;
use super::expressions::Expression;
use super::schema::{JoinScope, Schema};
use crate::value::Value;

/// Separator between the segments of a lookup key.
pub const SEPARATOR: &str = "__";

/// A lookup operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupOp {
    /// Equality; `IS NULL` against NULL.
    Exact,
    /// Case-insensitive equality.
    IExact,
    /// Inequality; `IS NOT NULL` against NULL.
    Isnt,
    /// Case-sensitive substring match.
    Contains,
    /// Case-insensitive substring match.
    IContains,
    /// Case-sensitive prefix match.
    StartsWith,
    /// Case-insensitive prefix match.
    IStartsWith,
    /// Case-sensitive suffix match.
    EndsWith,
    /// Case-insensitive suffix match.
    IEndsWith,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Membership in a list or subquery.
    In,
    /// Inclusive range between two values.
    Range,
    /// NULL check; the value says which way.
    IsNull,
    /// Case-sensitive regular expression.
    Regex,
    /// Case-insensitive regular expression.
    IRegex,
    /// Year of a date or datetime.
    Year,
    /// Month of a date or datetime.
    Month,
    /// Day of month.
    Day,
    /// Day of week, 1 (Sunday) to 7 (Saturday).
    WeekDay,
    /// Hour of a datetime.
    Hour,
    /// Minute of a datetime.
    Minute,
    /// Second of a datetime.
    Second,
}

impl LookupOp {
    /// Every operator, in vocabulary order.
    pub const ALL: [Self; 25] = [
        Self::Exact,
        Self::IExact,
        Self::Isnt,
        Self::Contains,
        Self::IContains,
        Self::StartsWith,
        Self::IStartsWith,
        Self::EndsWith,
        Self::IEndsWith,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::In,
        Self::Range,
        Self::IsNull,
        Self::Regex,
        Self::IRegex,
        Self::Year,
        Self::Month,
        Self::Day,
        Self::WeekDay,
        Self::Hour,
        Self::Minute,
        Self::Second,
    ];

    /// The name used in lookup keys.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::Isnt => "isnt",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::StartsWith => "startswith",
            Self::IStartsWith => "istartswith",
            Self::EndsWith => "endswith",
            Self::IEndsWith => "iendswith",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Range => "range",
            Self::IsNull => "isnull",
            Self::Regex => "regex",
            Self::IRegex => "iregex",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::WeekDay => "week_day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }

    /// Looks an operator up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Returns `true` for the case-insensitive pattern operators.
    pub const fn is_case_insensitive(self) -> bool {
        matches!(
            self,
            Self::IExact | Self::IContains | Self::IStartsWith | Self::IEndsWith | Self::IRegex
        )
    }

    /// The date part extracted by a date lookup.
    pub const fn date_part(self) -> Option<DatePart> {
        match self {
            Self::Year => Some(DatePart::Year),
            Self::Month => Some(DatePart::Month),
            Self::Day => Some(DatePart::Day),
            Self::WeekDay => Some(DatePart::WeekDay),
            Self::Hour => Some(DatePart::Hour),
            Self::Minute => Some(DatePart::Minute),
            Self::Second => Some(DatePart::Second),
            _ => None,
        }
    }
}

/// A component of a date or datetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    /// Calendar year.
    Year,
    /// Month, 1-12.
    Month,
    /// Day of month.
    Day,
    /// Day of week.
    WeekDay,
    /// Hour, 0-23.
    Hour,
    /// Minute.
    Minute,
    /// Second.
    Second,
}

impl DatePart {
    /// The field name used by `EXTRACT`.
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Year => "YEAR",
            Self::Month => "MONTH",
            Self::Day => "DAY",
            Self::WeekDay => "DOW",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
        }
    }
}

/// The right-hand side of a lookup.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A plain value, inlined or bound.
    Value(Value),
    /// Raw SQL (markers allowed), never quoted as a value.
    Expression(Expression),
    /// A nested SELECT.
    Subquery(Box<QueryBuilder>),
}

macro_rules! operand_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Self::Value(v.into())
                }
            }
        )*
    };
}

operand_from_value!(
    Value,
    bool,
    i32,
    i64,
    u32,
    f64,
    String,
    &str,
    Vec<Value>,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::NaiveTime,
);

impl From<Expression> for Operand {
    fn from(expr: Expression) -> Self {
        Self::Expression(expr)
    }
}

impl From<QueryBuilder> for Operand {
    fn from(query: QueryBuilder) -> Self {
        Self::Subquery(Box::new(query))
    }
}

/// A parsed lookup: operator, column path, and operand.
#[derive(Debug, Clone)]
pub struct Lookup {
    /// The operator.
    pub op: LookupOp,
    /// The column path, possibly `relation__field`.
    pub column: String,
    /// The operand.
    pub value: Operand,
}

/// Parses lookup keys and resolves column paths.
///
/// # Examples
///
/// ```
/// use sqlq_db::query::lookups::{LookupBuilder, LookupOp};
///
/// let builder = LookupBuilder::new();
/// let lookup = builder.parse_lookup("name__icontains", "foo").unwrap();
/// assert_eq!(lookup.op, LookupOp::IContains);
/// assert_eq!(lookup.column, "name");
/// ```
#[derive(Debug, Clone, Default)]
pub struct LookupBuilder {
    schema: Option<Arc<Schema>>,
    field_aliases: HashMap<String, String>,
}

impl LookupBuilder {
    /// Creates a lookup builder without relation metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a schema so relation paths resolve to joins.
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Maps a field name to a column (for example `pk` to `id`).
    #[must_use]
    pub fn with_field_alias(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.field_aliases.insert(field.into(), column.into());
        self
    }

    /// Returns the attached schema, if any.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }

    /// Splits a key into its operator and column path.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedConditionType`] for an empty key or
    /// a key with an empty segment.
    pub fn split_key(&self, key: &str) -> QueryResult<(LookupOp, String)> {
        if key.is_empty() {
            return Err(QueryError::UnsupportedConditionType(
                "empty lookup key".to_string(),
            ));
        }
        let segments: Vec<&str> = key.split(SEPARATOR).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(QueryError::UnsupportedConditionType(format!(
                "malformed lookup key '{key}'"
            )));
        }
        if let [column @ .., last] = segments.as_slice() {
            if !column.is_empty() {
                if let Some(op) = LookupOp::from_name(last) {
                    return Ok((op, column.join(SEPARATOR)));
                }
            }
        }
        Ok((LookupOp::Exact, key.to_string()))
    }

    /// Parses a key/value pair into a [`Lookup`].
    ///
    /// # Errors
    ///
    /// See [`split_key`](Self::split_key).
    pub fn parse_lookup(&self, key: &str, value: impl Into<Operand>) -> QueryResult<Lookup> {
        let (op, column) = self.split_key(key)?;
        Ok(Lookup {
            op,
            column,
            value: value.into(),
        })
    }

    /// Resolves a column path against the scope's base table.
    ///
    /// With a schema and a base table, every relation segment registers a
    /// LEFT JOIN in `scope` (reused for repeated paths) and the result is
    /// qualified with the join alias. Without either, the path is returned
    /// as is.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRelation`] when a relation segment does
    /// not exist on the table it is applied to.
    pub fn resolve_column(&self, column: &str, scope: &mut JoinScope) -> QueryResult<String> {
        let (Some(schema), Some(table)) = (self.schema.as_deref(), scope.table().map(str::to_owned))
        else {
            return Ok(self.alias_field(column).to_string());
        };
        if column.contains('.') || column.contains('(') || column.contains("[[") {
            return Ok(column.to_string());
        }

        let segments: Vec<&str> = column.split(SEPARATOR).collect();
        let Some((field, relations)) = segments.split_last() else {
            return Ok(column.to_string());
        };

        let mut current = table;
        let mut qualifier = scope
            .qualifier()
            .map_or_else(|| current.clone(), str::to_owned);
        let mut path: Vec<&str> = Vec::with_capacity(relations.len());
        for name in relations {
            let relation = schema.relation(&current, name).ok_or_else(|| {
                QueryError::UnknownRelation(format!("'{name}' on table '{current}'"))
            })?;
            path.push(name);
            qualifier = scope.join(&path.join(SEPARATOR), relation, &qualifier);
            current.clone_from(&relation.target);
        }

        let field = self.alias_field(field);
        let resolved = match schema.relation(&current, field) {
            Some(relation) => format!("{qualifier}.{}", relation.local_column),
            None => format!("{qualifier}.{field}"),
        };
        tracing::trace!(column, resolved = %resolved, "resolved lookup column");
        Ok(resolved)
    }

    pub(crate) fn alias_field<'a>(&'a self, field: &'a str) -> &'a str {
        self.field_aliases.get(field).map_or(field, String::as_str)
    }
}
