//! SQL dialect adapters.
//!
//! An [`Adapter`] is the stateless rendering policy for one SQL dialect. It
//! owns identifier quoting, value quoting, the translation of a lookup into
//! a boolean SQL fragment, type names, and the handful of clause rules that
//! differ between engines (LIMIT/OFFSET, NULL ordering, default-values
//! inserts).
//!
//! Three adapters ship with the crate:
//!
//! - [`MySqlAdapter`] - backtick quoting, `?` placeholders
//! - [`PostgresAdapter`] - double-quote quoting, `$n` placeholders
//! - [`SqliteAdapter`] - double-quote quoting, `?` placeholders
//!
//! Raw SQL handed to [`Adapter::quote_sql`] may use two marker syntaxes:
//! `[[column]]` for a column reference and `{{table}}` for a table
//! reference. Both are replaced by the dialect-quoted identifier.

pub mod mysql;
pub mod postgresql;
pub mod sqlite;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use sqlq_core::{QueryError, QueryResult};

use crate::query::compiler::Compiler;
use crate::query::lookups::{DatePart, LookupOp, Operand};
use crate::value::Value;

pub use mysql::MySqlAdapter;
pub use postgresql::PostgresAdapter;
pub use sqlite::SqliteAdapter;

static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{(%?[\w\-\. ]+%?)\}\}|\[\[([\w\-\. \*]+)\]\]")
        .expect("unable to compile identifier marker regex")
});

/// Logical column types, mapped to a dialect type name by
/// [`Adapter::sql_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// A boolean flag.
    Boolean,
    /// A 16-bit integer.
    SmallInt,
    /// A 32-bit integer.
    Integer,
    /// A 64-bit integer.
    BigInt,
    /// A single-precision float.
    Float,
    /// A double-precision float.
    Double,
    /// An exact decimal number.
    Decimal,
    /// A bounded string (255 characters).
    String,
    /// Unbounded text.
    Text,
    /// A calendar date.
    Date,
    /// A date and time.
    DateTime,
    /// A time of day.
    Time,
    /// Binary data.
    Binary,
    /// A JSON document.
    Json,
    /// A UUID.
    Uuid,
}

/// NULL placement for an ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    /// NULLs sort before all other values.
    First,
    /// NULLs sort after all other values.
    Last,
}

/// Where the wildcards go in a pattern-matching lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `%needle%`
    Contains,
    /// `needle%`
    StartsWith,
    /// `%needle`
    EndsWith,
}

impl PatternKind {
    /// Wraps an already-escaped needle with the given wildcard.
    pub fn wrap(self, escaped: &str, wildcard: char) -> String {
        match self {
            Self::Contains => format!("{wildcard}{escaped}{wildcard}"),
            Self::StartsWith => format!("{escaped}{wildcard}"),
            Self::EndsWith => format!("{wildcard}{escaped}"),
        }
    }
}

/// Escapes `\`, `%` and `_` so a user value matches literally inside a LIKE
/// pattern that uses `\` as its escape character.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// A SQL dialect.
///
/// Only a few methods are required; everything else has a default that
/// matches PostgreSQL-flavoured standard SQL and is overridden where a
/// dialect deviates.
pub trait Adapter: Send + Sync + fmt::Debug {
    /// Short vendor name (`mysql`, `postgresql`, `sqlite`).
    fn vendor(&self) -> &'static str;

    /// The character used to quote identifiers.
    fn quote_char(&self) -> char;

    /// Formats a bound-parameter placeholder for the given 1-based index.
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// The literal used for a boolean value.
    fn bool_literal(&self, value: bool) -> &'static str;

    /// Renders a bytes value as a literal.
    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("X'{}'", to_hex(bytes))
    }

    /// Escapes the body of a string literal (without the surrounding
    /// quotes).
    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }

    /// The dialect type name for a logical column type.
    fn sql_type(&self, ty: ColumnType) -> &'static str;

    /// The type name to use inside `CAST(.. AS ..)`.
    fn cast_type(&self, ty: ColumnType) -> &'static str {
        self.sql_type(ty)
    }

    /// The function producing a random ordering key.
    fn random_function(&self) -> &'static str {
        "RANDOM()"
    }

    /// Renders the LIMIT/OFFSET tail, if any.
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("LIMIT {limit}")),
            (Some(limit), Some(offset)) => Some(format!("LIMIT {limit} OFFSET {offset}")),
            (None, Some(offset)) => Some(format!("OFFSET {offset}")),
        }
    }

    /// Renders one ORDER BY term for an already-quoted column.
    fn order_by(&self, column: &str, descending: bool, nulls: Option<NullsOrder>) -> String {
        let direction = if descending { "DESC" } else { "ASC" };
        match nulls {
            None => format!("{column} {direction}"),
            Some(NullsOrder::First) => format!("{column} {direction} NULLS FIRST"),
            Some(NullsOrder::Last) => format!("{column} {direction} NULLS LAST"),
        }
    }

    /// Renders an INSERT of a single row made entirely of column defaults.
    fn default_values_insert(&self, table: &str) -> String {
        format!("INSERT INTO {table} DEFAULT VALUES")
    }

    /// Renders a date-part extraction over an already-quoted column.
    fn date_part(&self, column: &str, part: DatePart) -> String;

    /// Renders a regular-expression match. `pattern` is already rendered
    /// (a literal or a placeholder).
    fn regex_lookup(&self, column: &str, pattern: &str, case_insensitive: bool) -> String;

    /// Renders a LIKE-style pattern match for a literal needle.
    fn pattern_lookup(
        &self,
        column: &str,
        needle: &str,
        kind: PatternKind,
        case_insensitive: bool,
        compiler: &mut Compiler<'_>,
    ) -> String {
        let pattern = compiler.bind(Value::String(kind.wrap(&escape_like(needle), '%')));
        let op = if case_insensitive { "ILIKE" } else { "LIKE" };
        format!("{column} {op} {pattern}")
    }

    // ── Quoting ─────────────────────────────────────────────────────────

    /// Quotes a single identifier segment. Already-quoted segments and `*`
    /// are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MalformedIdentifier`] for an empty segment or
    /// a stray quote character.
    fn quote_simple_name(&self, name: &str) -> QueryResult<String> {
        let q = self.quote_char();
        if name.is_empty() {
            return Err(QueryError::MalformedIdentifier(
                "empty identifier segment".to_string(),
            ));
        }
        if name == "*" {
            return Ok(name.to_string());
        }
        if let Some(inner) = name.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)) {
            let doubled = format!("{q}{q}");
            if !inner.is_empty() && !inner.replace(&doubled, "").contains(q) {
                return Ok(name.to_string());
            }
            return Err(QueryError::MalformedIdentifier(name.to_string()));
        }
        if name.contains(q) {
            return Err(QueryError::MalformedIdentifier(name.to_string()));
        }
        Ok(format!("{q}{name}{q}"))
    }

    /// Quotes a table name, segment by segment (`schema.table`).
    ///
    /// Names containing `(` or a `{{..}}` marker are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MalformedIdentifier`] if a segment cannot be
    /// quoted.
    fn quote_table_name(&self, name: &str) -> QueryResult<String> {
        if name.contains('(') || name.contains("{{") {
            return Ok(name.to_string());
        }
        let parts = split_identifier(name, self.quote_char())
            .into_iter()
            .map(|part| self.quote_simple_name(part))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(parts.join("."))
    }

    /// Quotes a column name, optionally prefixed by a table (`t.col`,
    /// `schema.t.col`). `*` and `t.*` keep the star unquoted.
    ///
    /// Names containing `(`, `[[..]]` or `{{..}}` are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MalformedIdentifier`] if a segment cannot be
    /// quoted.
    fn quote_column(&self, name: &str) -> QueryResult<String> {
        if name.contains('(') || name.contains("[[") || name.contains("{{") {
            return Ok(name.to_string());
        }
        let mut parts = split_identifier(name, self.quote_char());
        let column = parts.pop().unwrap_or_default();
        let column = self.quote_simple_name(column)?;
        if parts.is_empty() {
            return Ok(column);
        }
        let table = self.quote_table_name(&parts.join("."))?;
        Ok(format!("{table}.{column}"))
    }

    /// Renders a value as a dialect literal.
    fn quote_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.bool_literal(*b).to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(f) => self.quote_string(&f.to_string()),
            Value::String(s) => self.quote_string(s),
            Value::Bytes(b) => self.bytes_literal(b),
            Value::Date(_)
            | Value::DateTime(_)
            | Value::DateTimeTz(_)
            | Value::Time(_)
            | Value::Uuid(_)
            | Value::Json(_) => self.quote_string(&value.to_string()),
            Value::List(items) => items
                .iter()
                .map(|item| self.quote_value(item))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Wraps a string in single quotes after escaping it.
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", self.escape_string(value))
    }

    /// Replaces `[[column]]` and `{{table}}` markers in raw SQL with quoted
    /// identifiers. Everything else is kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MalformedIdentifier`] if a marker holds an
    /// identifier that cannot be quoted.
    fn quote_sql(&self, sql: &str) -> QueryResult<String> {
        let mut out = String::with_capacity(sql.len());
        let mut last = 0;
        for caps in MARKER_RE.captures_iter(sql) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&sql[last..whole.start()]);
            if let Some(table) = caps.get(1) {
                out.push_str(&self.quote_table_name(table.as_str().trim_matches('%'))?);
            } else if let Some(column) = caps.get(2) {
                out.push_str(&self.quote_column(column.as_str())?);
            }
            last = whole.end();
        }
        out.push_str(&sql[last..]);
        Ok(out)
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    /// Translates a lookup into a boolean SQL fragment. `column` is an
    /// unquoted (possibly table-qualified) column reference.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedLookup`] for a name outside the
    /// vocabulary and [`QueryError::InvalidLookupValue`] when the operand
    /// does not fit the lookup.
    fn run_lookup(
        &self,
        lookup: &str,
        column: &str,
        value: &Operand,
        compiler: &mut Compiler<'_>,
    ) -> QueryResult<String> {
        let op = LookupOp::from_name(lookup)
            .ok_or_else(|| QueryError::UnsupportedLookup(lookup.to_string()))?;
        let column = self.quote_column(column)?;
        render_lookup(self, op, &column, value, compiler)
    }
}

/// Returns the adapter for a settings engine name.
///
/// Dotted engine paths are matched on their last segment, so
/// `backends.postgresql` selects the PostgreSQL adapter.
///
/// # Errors
///
/// Returns [`QueryError::ConfigurationError`] for an unknown engine.
pub fn adapter_for_engine(engine: &str) -> QueryResult<Arc<dyn Adapter>> {
    let name = engine.rsplit('.').next().unwrap_or(engine).to_ascii_lowercase();
    match name.as_str() {
        "mysql" | "mariadb" => Ok(Arc::new(MySqlAdapter)),
        "postgresql" | "postgres" | "pgsql" => Ok(Arc::new(PostgresAdapter)),
        "sqlite" | "sqlite3" => Ok(Arc::new(SqliteAdapter)),
        _ => Err(QueryError::ConfigurationError(format!(
            "unknown database engine '{engine}'"
        ))),
    }
}

/// Splits a dotted identifier on dots that are not inside quotes.
fn split_identifier(name: &str, quote: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (idx, ch) in name.char_indices() {
        if ch == quote {
            quoted = !quoted;
        } else if ch == '.' && !quoted {
            parts.push(&name[start..idx]);
            start = idx + 1;
        }
    }
    parts.push(&name[start..]);
    parts
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Text of a pattern-lookup needle. Only scalar values qualify.
fn needle_text(op: LookupOp, value: &Operand) -> QueryResult<String> {
    match value {
        Operand::Value(
            v @ (Value::String(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Bool(_)
            | Value::Uuid(_)
            | Value::Date(_)
            | Value::DateTime(_)
            | Value::Time(_)),
        ) => Ok(v.to_string()),
        other => Err(QueryError::InvalidLookupValue(format!(
            "'{}' needs a scalar value, got {other:?}",
            op.name()
        ))),
    }
}

/// Renders the right-hand side of a scalar comparison. Lists are rejected.
fn comparand(op: LookupOp, value: &Operand, compiler: &mut Compiler<'_>) -> QueryResult<String> {
    if let Operand::Value(Value::List(_)) = value {
        return Err(QueryError::InvalidLookupValue(format!(
            "'{}' compares against a single value, got a list",
            op.name()
        )));
    }
    compiler.operand(value)
}

fn truthy(value: &Operand) -> QueryResult<bool> {
    match value {
        Operand::Value(Value::Bool(b)) => Ok(*b),
        Operand::Value(Value::Int(i)) => Ok(*i != 0),
        Operand::Value(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(QueryError::InvalidLookupValue(format!(
                "'isnull' expects a boolean, got '{s}'"
            ))),
        },
        other => Err(QueryError::InvalidLookupValue(format!(
            "'isnull' expects a boolean, got {other:?}"
        ))),
    }
}

/// Renders a lookup against an already-quoted column using the adapter's
/// dialect hooks.
fn render_lookup<A: Adapter + ?Sized>(
    adapter: &A,
    op: LookupOp,
    column: &str,
    value: &Operand,
    compiler: &mut Compiler<'_>,
) -> QueryResult<String> {
    let is_null = matches!(value, Operand::Value(Value::Null));
    let sql = match op {
        LookupOp::Exact if is_null => format!("{column} IS NULL"),
        LookupOp::Isnt if is_null => format!("{column} IS NOT NULL"),
        LookupOp::IExact if is_null => format!("{column} IS NULL"),
        LookupOp::Exact => format!("{column} = {}", comparand(op, value, compiler)?),
        LookupOp::Isnt => format!("{column} != {}", comparand(op, value, compiler)?),
        LookupOp::IExact => {
            format!("LOWER({column}) = LOWER({})", comparand(op, value, compiler)?)
        }
        LookupOp::Gt => format!("{column} > {}", comparand(op, value, compiler)?),
        LookupOp::Gte => format!("{column} >= {}", comparand(op, value, compiler)?),
        LookupOp::Lt => format!("{column} < {}", comparand(op, value, compiler)?),
        LookupOp::Lte => format!("{column} <= {}", comparand(op, value, compiler)?),
        LookupOp::In => match value {
            Operand::Value(Value::List(items)) if items.is_empty() => {
                tracing::warn!(column, "empty list for 'in' lookup; condition is always false");
                "0=1".to_string()
            }
            Operand::Value(Value::List(items)) => {
                let rendered = items
                    .iter()
                    .map(|item| compiler.bind(item.clone()))
                    .collect::<Vec<_>>();
                format!("{column} IN ({})", rendered.join(", "))
            }
            Operand::Subquery(_) => format!("{column} IN {}", compiler.operand(value)?),
            _ => format!("{column} IN ({})", compiler.operand(value)?),
        },
        LookupOp::Range => match value {
            Operand::Value(Value::List(items)) if items.len() == 2 => {
                let low = compiler.bind(items[0].clone());
                let high = compiler.bind(items[1].clone());
                format!("{column} BETWEEN {low} AND {high}")
            }
            other => {
                return Err(QueryError::InvalidLookupValue(format!(
                    "'range' needs a list of exactly two values, got {other:?}"
                )))
            }
        },
        LookupOp::IsNull => {
            if truthy(value)? {
                format!("{column} IS NULL")
            } else {
                format!("{column} IS NOT NULL")
            }
        }
        LookupOp::Contains
        | LookupOp::IContains
        | LookupOp::StartsWith
        | LookupOp::IStartsWith
        | LookupOp::EndsWith
        | LookupOp::IEndsWith => {
            let needle = needle_text(op, value)?;
            let kind = match op {
                LookupOp::Contains | LookupOp::IContains => PatternKind::Contains,
                LookupOp::StartsWith | LookupOp::IStartsWith => PatternKind::StartsWith,
                _ => PatternKind::EndsWith,
            };
            adapter.pattern_lookup(column, &needle, kind, op.is_case_insensitive(), compiler)
        }
        LookupOp::Regex | LookupOp::IRegex => {
            let pattern = comparand(op, value, compiler)?;
            adapter.regex_lookup(column, &pattern, op == LookupOp::IRegex)
        }
        LookupOp::Year
        | LookupOp::Month
        | LookupOp::Day
        | LookupOp::WeekDay
        | LookupOp::Hour
        | LookupOp::Minute
        | LookupOp::Second => {
            let part = op.date_part().ok_or_else(|| {
                QueryError::UnsupportedLookup(op.name().to_string())
            })?;
            format!("{} = {}", adapter.date_part(column, part), comparand(op, value, compiler)?)
        }
    };
    Ok(sql)
}
