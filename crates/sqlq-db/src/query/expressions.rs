//! SQL expressions and aggregations.
//!
//! [`Expression`] covers the non-value operands a builder accepts: raw SQL
//! with identifier markers, column references, casts, and aggregates.
//! [`Aggregation`] wraps an expression in `COUNT`, `SUM`, `AVG`, `MIN` or
//! `MAX` with an optional `DISTINCT` and alias.

use sqlq_core::QueryResult;

use super::compiler::Compiler;
use crate::adapters::{Adapter, ColumnType};
use crate::value::Value;

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Raw SQL. `[[col]]` and `{{table}}` markers are quoted, the rest is
    /// emitted verbatim.
    Raw(String),
    /// A column reference; relation paths resolve like lookup columns.
    Column(String),
    /// A literal value (inlined or bound).
    Value(Value),
    /// `CAST(expr AS type)`.
    Cast(Box<Expression>, ColumnType),
    /// An aggregate call.
    Aggregate(Box<Aggregation>),
}

impl Expression {
    /// Creates a raw SQL expression.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// Creates a column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// Creates a literal value expression.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Wraps this expression in a CAST.
    #[must_use]
    pub fn cast(self, ty: ColumnType) -> Self {
        Self::Cast(Box::new(self), ty)
    }

    /// Renders the expression.
    ///
    /// # Errors
    ///
    /// Returns identifier or relation errors from quoting and resolution.
    pub fn to_sql(&self, compiler: &mut Compiler<'_>) -> QueryResult<String> {
        match self {
            Self::Raw(sql) => compiler.adapter().quote_sql(sql),
            Self::Column(name) => compiler.column(name),
            Self::Value(value) => Ok(compiler.bind(value.clone())),
            Self::Cast(inner, ty) => {
                let inner = inner.to_sql(compiler)?;
                Ok(format!("CAST({inner} AS {})", compiler.adapter().cast_type(*ty)))
            }
            Self::Aggregate(aggregation) => aggregation.to_sql(compiler.adapter()),
        }
    }
}

impl From<Aggregation> for Expression {
    fn from(aggregation: Aggregation) -> Self {
        Self::Aggregate(Box::new(aggregation))
    }
}

/// SQL aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    /// `COUNT`
    Count,
    /// `SUM`
    Sum,
    /// `AVG`
    Avg,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
}

impl AggregateFunc {
    /// Returns the SQL function name.
    pub const fn sql_name(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

/// An aggregate over an expression, with optional DISTINCT and alias.
///
/// # Examples
///
/// ```
/// use sqlq_db::adapters::MySqlAdapter;
/// use sqlq_db::query::expressions::Aggregation;
///
/// let count = Aggregation::count("*").alias("total");
/// assert_eq!(count.to_sql(&MySqlAdapter).unwrap(), "COUNT(*) AS `total`");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    expression: String,
    func: Option<AggregateFunc>,
    distinct: bool,
    alias: Option<String>,
}

impl Aggregation {
    /// An expression without an aggregate function.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            func: None,
            distinct: false,
            alias: None,
        }
    }

    fn with_func(expression: impl Into<String>, func: AggregateFunc) -> Self {
        Self {
            func: Some(func),
            ..Self::new(expression)
        }
    }

    /// `COUNT(expr)`
    pub fn count(expression: impl Into<String>) -> Self {
        Self::with_func(expression, AggregateFunc::Count)
    }

    /// `SUM(expr)`
    pub fn sum(expression: impl Into<String>) -> Self {
        Self::with_func(expression, AggregateFunc::Sum)
    }

    /// `AVG(expr)`
    pub fn avg(expression: impl Into<String>) -> Self {
        Self::with_func(expression, AggregateFunc::Avg)
    }

    /// `MIN(expr)`
    pub fn min(expression: impl Into<String>) -> Self {
        Self::with_func(expression, AggregateFunc::Min)
    }

    /// `MAX(expr)`
    pub fn max(expression: impl Into<String>) -> Self {
        Self::with_func(expression, AggregateFunc::Max)
    }

    /// Aggregates over distinct values only.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Names the result column.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The aggregated expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The aggregate function, if any.
    pub const fn func(&self) -> Option<AggregateFunc> {
        self.func
    }

    /// The alias, if any.
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Renders `FUNC([DISTINCT ]expr)[ AS alias]`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedIdentifier`](sqlq_core::QueryError::MalformedIdentifier)
    /// when the expression or alias cannot be quoted.
    pub fn to_sql(&self, adapter: &dyn Adapter) -> QueryResult<String> {
        let expr = if self.expression == "*" {
            "*".to_string()
        } else if is_identifier(&self.expression) {
            adapter.quote_column(&self.expression)?
        } else {
            adapter.quote_sql(&self.expression)?
        };
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        let mut sql = match self.func {
            Some(func) => format!("{}({distinct}{expr})", func.sql_name()),
            None => format!("{distinct}{expr}"),
        };
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&adapter.quote_column(alias)?);
        }
        Ok(sql)
    }
}

/// A bare, optionally dotted identifier such as `price` or `t.price`.
fn is_identifier(expr: &str) -> bool {
    !expr.is_empty()
        && !expr.starts_with(|c: char| c.is_ascii_digit())
        && expr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}
