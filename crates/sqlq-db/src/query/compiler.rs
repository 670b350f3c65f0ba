//! The per-statement render context and result rows.
//!
//! A [`Compiler`] is created for every rendered statement. It carries the
//! dialect [`Adapter`], the [`LookupBuilder`], the parameter mode, the bound
//! parameters collected so far, and the [`JoinScope`] that relation lookups
//! add joins to. Condition trees and builders render themselves into it.
//!
//! In [`ParamMode::Inline`] values are written as dialect literals through
//! [`Adapter::quote_value`]. In [`ParamMode::Bind`] they are replaced by
//! placeholders (`$1, $2, ...` for PostgreSQL, `?` otherwise) and collected
//! in order.

use sqlq_core::{QueryError, QueryResult};

use super::builder::QueryBuilder;
use super::lookups::{LookupBuilder, Operand};
use super::schema::JoinScope;
use crate::adapters::Adapter;
use crate::value::Value;

/// How values reach the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamMode {
    /// Values are inlined as quoted literals.
    Inline,
    /// Values become placeholders and are returned alongside the SQL.
    #[default]
    Bind,
}

impl ParamMode {
    /// Picks the mode from a `bind_params` settings flag.
    pub const fn from_bind_flag(bind: bool) -> Self {
        if bind {
            Self::Bind
        } else {
            Self::Inline
        }
    }
}

/// Render context for one statement.
pub struct Compiler<'a> {
    adapter: &'a dyn Adapter,
    lookups: &'a LookupBuilder,
    mode: ParamMode,
    params: Vec<Value>,
    scope: JoinScope,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler in the given mode.
    pub fn new(adapter: &'a dyn Adapter, lookups: &'a LookupBuilder, mode: ParamMode) -> Self {
        Self {
            adapter,
            lookups,
            mode,
            params: Vec::new(),
            scope: JoinScope::default(),
        }
    }

    /// Creates a compiler that inlines values.
    pub fn inline(adapter: &'a dyn Adapter, lookups: &'a LookupBuilder) -> Self {
        Self::new(adapter, lookups, ParamMode::Inline)
    }

    /// Creates a compiler that binds values as parameters.
    pub fn parameterized(adapter: &'a dyn Adapter, lookups: &'a LookupBuilder) -> Self {
        Self::new(adapter, lookups, ParamMode::Bind)
    }

    /// The dialect adapter.
    pub fn adapter(&self) -> &'a dyn Adapter {
        self.adapter
    }

    /// The lookup builder.
    pub fn lookups(&self) -> &'a LookupBuilder {
        self.lookups
    }

    /// The parameter mode.
    pub const fn mode(&self) -> ParamMode {
        self.mode
    }

    /// Parameters bound so far.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Consumes the compiler and returns the bound parameters.
    pub fn into_params(self) -> Vec<Value> {
        self.params
    }

    /// The join scope of the statement being rendered.
    pub fn scope(&self) -> &JoinScope {
        &self.scope
    }

    /// Replaces the join scope (done once per statement, before any
    /// condition renders).
    pub fn set_scope(&mut self, scope: JoinScope) {
        self.scope = scope;
    }

    /// Renders a value: a literal when inlining, a placeholder otherwise.
    /// Lists render as comma-separated items.
    pub fn bind(&mut self, value: Value) -> String {
        match (self.mode, value) {
            (ParamMode::Inline, value) => self.adapter.quote_value(&value),
            (ParamMode::Bind, Value::List(items)) => items
                .into_iter()
                .map(|item| self.bind(item))
                .collect::<Vec<_>>()
                .join(", "),
            (ParamMode::Bind, value) => {
                self.params.push(value);
                self.adapter.placeholder(self.params.len())
            }
        }
    }

    /// Renders a lookup operand. Subqueries come back parenthesized.
    ///
    /// # Errors
    ///
    /// Propagates errors from expression or subquery rendering.
    pub fn operand(&mut self, operand: &Operand) -> QueryResult<String> {
        match operand {
            Operand::Value(value) => Ok(self.bind(value.clone())),
            Operand::Expression(expr) => expr.to_sql(self),
            Operand::Subquery(query) => Ok(format!("({})", self.subquery(query)?)),
        }
    }

    /// Renders a nested statement with its own join scope. Parameters keep
    /// their order across the boundary.
    ///
    /// # Errors
    ///
    /// Propagates errors from the nested statement.
    pub fn subquery(&mut self, query: &QueryBuilder) -> QueryResult<String> {
        let mut child = Compiler::new(self.adapter, query.lookup_builder(), self.mode);
        child.params = std::mem::take(&mut self.params);
        let result = query.compile(&mut child);
        self.params = child.params;
        result
    }

    /// Resolves a column path and quotes it.
    ///
    /// # Errors
    ///
    /// Returns relation and identifier errors.
    pub fn column(&mut self, path: &str) -> QueryResult<String> {
        let column = self.lookups.resolve_column(path, &mut self.scope)?;
        self.adapter.quote_column(&column)
    }

    /// Quotes a result-column name without table qualification or joins.
    /// Compound statements can only order by output columns.
    ///
    /// # Errors
    ///
    /// Returns identifier errors.
    pub fn output_column(&self, name: &str) -> QueryResult<String> {
        self.adapter.quote_column(self.lookups.alias_field(name))
    }

    /// Renders one `key => value` lookup: parses the key, resolves the
    /// column path, and lets the adapter produce the fragment.
    ///
    /// # Errors
    ///
    /// Returns key parsing, relation, and lookup errors.
    pub fn lookup(&mut self, key: &str, value: &Operand) -> QueryResult<String> {
        let lookups = self.lookups;
        let adapter = self.adapter;
        let (op, column) = lookups.split_key(key)?;
        let column = lookups.resolve_column(&column, &mut self.scope)?;
        tracing::trace!(key, lookup = op.name(), column = %column, "rendering lookup");
        adapter.run_lookup(op.name(), &column, value, self)
    }
}

/// A result row: column names and their values.
///
/// Typed access goes through [`get`](Row::get) and [`FromValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from column names and values.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::DatabaseError`] if the counts differ.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> QueryResult<Self> {
        if columns.len() != values.len() {
            return Err(QueryError::DatabaseError(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromValue>(&self, column: &str) -> QueryResult<T> {
        let value = self.get_value(column).ok_or_else(|| {
            QueryError::DatabaseError(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    /// Gets a typed value by column index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds or the value cannot be
    /// converted to the requested type.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> QueryResult<T> {
        let value = self.values.get(idx).ok_or_else(|| {
            QueryError::DatabaseError(format!(
                "Column index {idx} out of bounds (row has {} columns)",
                self.values.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Returns the raw value for a column.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }
}

/// Conversion from a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> QueryResult<Self>;
}

fn type_mismatch(expected: &str, value: &Value) -> QueryError {
    QueryError::DatabaseError(format!("Expected {expected}, got {value:?}"))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> QueryResult<Self> {
        value.as_int().ok_or_else(|| type_mismatch("Int", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> QueryResult<Self> {
        let wide = i64::from_value(value)?;
        Self::try_from(wide)
            .map_err(|e| QueryError::DatabaseError(format!("Int value out of i32 range: {e}")))
    }
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as Self),
            _ => Err(type_mismatch("Float", value)),
        }
    }
}

// SQLite stores booleans as integers.
impl FromValue for bool {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            _ => Err(type_mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> QueryResult<Self> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| type_mismatch("String", value))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            _ => Err(type_mismatch("Bytes", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> QueryResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}
