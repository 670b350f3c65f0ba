//! The statement builder.
//!
//! [`QueryBuilder`] assembles one SELECT, INSERT, UPDATE or DELETE
//! statement. Setters take and return the builder by value so calls chain;
//! nothing is rendered until [`to_sql`](QueryBuilder::to_sql),
//! [`to_sql_with_params`](QueryBuilder::to_sql_with_params) or
//! [`build`](QueryBuilder::build) is called.
//!
//! ```
//! use std::sync::Arc;
//!
//! use sqlq_db::adapters::MySqlAdapter;
//! use sqlq_db::query::builder::QueryBuilder;
//! use sqlq_db::query::lookups::LookupBuilder;
//!
//! let sql = QueryBuilder::new(Arc::new(MySqlAdapter), Arc::new(LookupBuilder::new()))
//!     .set_select(["COUNT(*)"])
//!     .set_from("test")
//!     .to_sql()
//!     .unwrap();
//! assert_eq!(sql, "SELECT COUNT(*) FROM `test`");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use sqlq_core::logging::statement_span;
use sqlq_core::{QueryError, QueryResult};

use super::compiler::{Compiler, ParamMode};
use super::expressions::{Aggregation, Expression};
use super::lookups::{LookupBuilder, Operand};
use super::q::Q;
use super::schema::JoinScope;
use crate::adapters::{Adapter, NullsOrder};
use crate::value::Value;

/// The kind of statement a builder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementType {
    /// `SELECT`
    #[default]
    Select,
    /// `INSERT`
    Insert,
    /// `UPDATE`
    Update,
    /// `DELETE`
    Delete,
}

impl StatementType {
    /// The SQL keyword.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item of a SELECT list.
#[derive(Debug, Clone)]
pub enum SelectItem {
    /// A column name or a raw expression such as `COUNT(*)`.
    Column(String),
    /// An expression with an alias.
    Aliased(Expression, String),
    /// An aggregate.
    Aggregate(Aggregation),
    /// A scalar subquery with an alias.
    Subquery(Box<QueryBuilder>, String),
}

impl SelectItem {
    /// An aliased expression.
    pub fn aliased(expr: impl Into<Expression>, alias: impl Into<String>) -> Self {
        Self::Aliased(expr.into(), alias.into())
    }

    /// An aliased scalar subquery.
    pub fn subquery(query: QueryBuilder, alias: impl Into<String>) -> Self {
        Self::Subquery(Box::new(query), alias.into())
    }
}

impl From<&str> for SelectItem {
    fn from(column: &str) -> Self {
        Self::Column(column.to_string())
    }
}

impl From<String> for SelectItem {
    fn from(column: String) -> Self {
        Self::Column(column)
    }
}

impl From<Aggregation> for SelectItem {
    fn from(aggregation: Aggregation) -> Self {
        Self::Aggregate(aggregation)
    }
}

/// A column ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// The column path, or `?` for random order.
    pub column: String,
    /// Whether to sort in descending order.
    pub descending: bool,
    /// Where NULLs go.
    pub nulls: Option<NullsOrder>,
}

impl OrderBy {
    /// Creates an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
            nulls: None,
        }
    }

    /// Creates a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            descending: true,
            ..Self::asc(column)
        }
    }

    /// Random order.
    pub fn random() -> Self {
        Self::asc("?")
    }

    /// Puts NULLs first.
    #[must_use]
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    /// Puts NULLs last.
    #[must_use]
    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    fn is_random(&self) -> bool {
        self.column == "?"
    }
}

/// `"-name"` sorts descending, `"?"` sorts randomly.
impl From<&str> for OrderBy {
    fn from(term: &str) -> Self {
        term.strip_prefix('-')
            .map_or_else(|| Self::asc(term), Self::desc)
    }
}

/// SQL JOIN types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN.
    Inner,
    /// LEFT JOIN.
    Left,
    /// RIGHT JOIN (not supported by older SQLite).
    Right,
    /// FULL OUTER JOIN.
    Full,
    /// CROSS JOIN.
    Cross,
}

impl JoinType {
    /// Returns the SQL keyword for this join type.
    pub const fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL OUTER JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// The ON part of a join.
#[derive(Debug, Clone)]
pub enum JoinOn {
    /// No ON clause (cross joins).
    None,
    /// Column pairs compared with `=` and combined with AND.
    Columns(Vec<(String, String)>),
    /// An arbitrary condition.
    Condition(Q),
}

/// An explicit JOIN clause.
#[derive(Debug, Clone)]
pub struct Join {
    /// The type of join.
    pub join_type: JoinType,
    /// The table to join.
    pub table: String,
    /// Optional alias for the joined table.
    pub alias: Option<String>,
    /// The ON clause.
    pub on: JoinOn,
}

impl Join {
    /// A join without an ON clause yet.
    pub fn new(join_type: JoinType, table: impl Into<String>) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: None,
            on: JoinOn::None,
        }
    }

    /// Aliases the joined table.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds a `left = right` column pair to the ON clause.
    #[must_use]
    pub fn on(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        let pair = (left.into(), right.into());
        match &mut self.on {
            JoinOn::Columns(pairs) => pairs.push(pair),
            _ => self.on = JoinOn::Columns(vec![pair]),
        }
        self
    }

    /// Uses a condition tree as the ON clause.
    #[must_use]
    pub fn on_condition(mut self, condition: Q) -> Self {
        self.on = JoinOn::Condition(condition);
        self
    }

    fn to_sql(&self, compiler: &mut Compiler<'_>) -> QueryResult<String> {
        let adapter = compiler.adapter();
        let mut sql = format!(
            "{} {}",
            self.join_type.sql_keyword(),
            adapter.quote_table_name(&self.table)?
        );
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&adapter.quote_table_name(alias)?);
        }
        let on = match &self.on {
            JoinOn::None => String::new(),
            JoinOn::Columns(pairs) => pairs
                .iter()
                .map(|(left, right)| {
                    Ok(format!(
                        "{} = {}",
                        adapter.quote_column(left)?,
                        adapter.quote_column(right)?
                    ))
                })
                .collect::<QueryResult<Vec<_>>>()?
                .join(" AND "),
            JoinOn::Condition(q) => q.to_sql(compiler)?,
        };
        if !on.is_empty() {
            sql.push_str(" ON ");
            sql.push_str(&on);
        }
        Ok(sql)
    }
}

#[derive(Debug, Clone)]
enum FromSource {
    Table(String),
    Subquery(Box<QueryBuilder>),
}

/// Builds one SQL statement.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    adapter: Arc<dyn Adapter>,
    lookups: Arc<LookupBuilder>,
    param_mode: ParamMode,
    statement: Option<StatementType>,
    type_conflict: Option<StatementType>,
    select: Vec<SelectItem>,
    distinct: bool,
    from: Option<FromSource>,
    alias: Option<String>,
    joins: Vec<Join>,
    where_clause: Q,
    excludes: Vec<Q>,
    group_by: Vec<String>,
    having: Q,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    insert_rows: Vec<Vec<(String, Operand)>>,
    update_values: Vec<(String, Operand)>,
    unions: Vec<(QueryBuilder, bool)>,
}

impl QueryBuilder {
    /// Creates an empty SELECT builder.
    pub fn new(adapter: Arc<dyn Adapter>, lookups: Arc<LookupBuilder>) -> Self {
        Self {
            adapter,
            lookups,
            param_mode: ParamMode::default(),
            statement: None,
            type_conflict: None,
            select: Vec::new(),
            distinct: false,
            from: None,
            alias: None,
            joins: Vec::new(),
            where_clause: Q::empty(),
            excludes: Vec::new(),
            group_by: Vec::new(),
            having: Q::empty(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            insert_rows: Vec::new(),
            update_values: Vec::new(),
            unions: Vec::new(),
        }
    }

    /// The dialect adapter.
    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// The lookup builder.
    pub fn lookup_builder(&self) -> &LookupBuilder {
        &self.lookups
    }

    /// Sets the statement type. The type can be set once; a later,
    /// different type makes rendering fail.
    #[must_use]
    pub fn set_type(mut self, statement: StatementType) -> Self {
        match self.statement {
            None => self.statement = Some(statement),
            Some(current) if current == statement => {}
            Some(_) => self.type_conflict = Some(statement),
        }
        self
    }

    /// The statement type to render.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidStatementState`] after conflicting
    /// [`set_type`](Self::set_type) calls.
    pub fn statement_type(&self) -> QueryResult<StatementType> {
        let current = self.statement.unwrap_or_default();
        match self.type_conflict {
            Some(requested) => Err(QueryError::InvalidStatementState(format!(
                "statement type is already {current}; cannot switch to {requested}"
            ))),
            None => Ok(current),
        }
    }

    /// Sets the parameter mode used by [`build`](Self::build).
    #[must_use]
    pub fn set_param_mode(mut self, mode: ParamMode) -> Self {
        self.param_mode = mode;
        self
    }

    /// Replaces the SELECT list.
    #[must_use]
    pub fn set_select<I: Into<SelectItem>>(mut self, items: impl IntoIterator<Item = I>) -> Self {
        self.select = items.into_iter().map(Into::into).collect();
        self
    }

    /// Appends to the SELECT list.
    #[must_use]
    pub fn add_select(mut self, item: impl Into<SelectItem>) -> Self {
        self.select.push(item.into());
        self
    }

    /// Toggles `SELECT DISTINCT`.
    #[must_use]
    pub fn set_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Sets the table.
    #[must_use]
    pub fn set_from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(FromSource::Table(table.into()));
        self
    }

    /// Aliases the table.
    #[must_use]
    pub fn set_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Selects from a subquery under the given alias.
    #[must_use]
    pub fn set_from_subquery(mut self, query: Self, alias: impl Into<String>) -> Self {
        self.from = Some(FromSource::Subquery(Box::new(query)));
        self.alias = Some(alias.into());
        self
    }

    /// ANDs a condition into WHERE.
    #[must_use]
    pub fn filter(mut self, condition: impl Into<Q>) -> Self {
        let condition = condition.into();
        self.where_clause = if self.where_clause.is_empty() {
            condition
        } else {
            std::mem::take(&mut self.where_clause) & condition
        };
        self
    }

    /// Replaces the WHERE condition.
    #[must_use]
    pub fn set_where(mut self, condition: impl Into<Q>) -> Self {
        self.where_clause = condition.into();
        self
    }

    /// ANDs `NOT (condition)` into WHERE.
    #[must_use]
    pub fn exclude(mut self, condition: impl Into<Q>) -> Self {
        self.excludes.push(condition.into());
        self
    }

    /// Adds a join on one column pair.
    #[must_use]
    pub fn set_join(
        self,
        join_type: JoinType,
        table: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        self.join(Join::new(join_type, table).on(left, right))
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Replaces the GROUP BY list.
    #[must_use]
    pub fn set_group<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the HAVING condition.
    #[must_use]
    pub fn set_having(mut self, condition: impl Into<Q>) -> Self {
        self.having = condition.into();
        self
    }

    /// Replaces the ORDER BY list.
    #[must_use]
    pub fn set_order<O: Into<OrderBy>>(mut self, terms: impl IntoIterator<Item = O>) -> Self {
        self.order_by = terms.into_iter().map(Into::into).collect();
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub fn set_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub fn set_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the rows to insert. The first row's key order is the column
    /// order. Makes the statement an INSERT unless a type was set.
    #[must_use]
    pub fn set_insert<R, K, V>(mut self, rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        self.insert_rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect()
            })
            .collect();
        self.statement.get_or_insert(StatementType::Insert);
        self
    }

    /// Sets the column assignments of an UPDATE. Makes the statement an
    /// UPDATE unless a type was set.
    #[must_use]
    pub fn set_update<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Operand>,
    {
        self.update_values = values
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.statement.get_or_insert(StatementType::Update);
        self
    }

    /// Appends `UNION [ALL] <query>`.
    #[must_use]
    pub fn union(mut self, query: Self, all: bool) -> Self {
        self.unions.push((query, all));
        self
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Renders the statement with values inlined as literals.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidStatementState`] for an incomplete or
    /// conflicting statement, and any lookup or quoting error.
    pub fn to_sql(&self) -> QueryResult<String> {
        let mut compiler = Compiler::inline(self.adapter.as_ref(), &self.lookups);
        self.compile(&mut compiler)
    }

    /// Renders the statement with placeholders and returns the values in
    /// placeholder order.
    ///
    /// # Errors
    ///
    /// See [`to_sql`](Self::to_sql).
    pub fn to_sql_with_params(&self) -> QueryResult<(String, Vec<Value>)> {
        let mut compiler = Compiler::parameterized(self.adapter.as_ref(), &self.lookups);
        let sql = self.compile(&mut compiler)?;
        Ok((sql, compiler.into_params()))
    }

    /// Renders the statement in the builder's parameter mode.
    ///
    /// # Errors
    ///
    /// See [`to_sql`](Self::to_sql).
    pub fn build(&self) -> QueryResult<(String, Vec<Value>)> {
        let mut compiler = Compiler::new(self.adapter.as_ref(), &self.lookups, self.param_mode);
        let sql = self.compile(&mut compiler)?;
        Ok((sql, compiler.into_params()))
    }

    pub(crate) fn compile(&self, compiler: &mut Compiler<'_>) -> QueryResult<String> {
        let kind = self.statement_type()?;
        let span = statement_span(kind.as_str());
        let _guard = span.enter();

        compiler.set_scope(self.join_scope());
        let sql = match kind {
            StatementType::Select => self.compile_select(compiler)?,
            StatementType::Insert => self.compile_insert(compiler)?,
            StatementType::Update => self.compile_update(compiler)?,
            StatementType::Delete => self.compile_delete(compiler)?,
        };
        tracing::debug!(
            vendor = compiler.adapter().vendor(),
            sql = %sql,
            params = compiler.params().len(),
            "compiled statement"
        );
        Ok(sql)
    }

    fn join_scope(&self) -> JoinScope {
        match &self.from {
            Some(FromSource::Table(table)) => JoinScope::for_table(table, self.alias.as_deref()),
            _ => JoinScope::default(),
        }
    }

    fn table_name(&self, kind: StatementType) -> QueryResult<&str> {
        match &self.from {
            Some(FromSource::Table(table)) => Ok(table),
            Some(FromSource::Subquery(_)) => Err(QueryError::InvalidStatementState(format!(
                "{kind} needs a table, not a subquery"
            ))),
            None => Err(QueryError::InvalidStatementState(format!(
                "{kind} has no table; call set_from first"
            ))),
        }
    }

    fn compile_select(&self, compiler: &mut Compiler<'_>) -> QueryResult<String> {
        let adapter = compiler.adapter();
        if self.from.is_none() {
            return Err(QueryError::InvalidStatementState(
                "SELECT has no table; call set_from first".to_string(),
            ));
        }

        let columns = if self.select.is_empty() {
            "*".to_string()
        } else {
            self.select
                .iter()
                .map(|item| render_select_item(item, compiler))
                .collect::<QueryResult<Vec<_>>>()?
                .join(", ")
        };

        let mut from = match &self.from {
            Some(FromSource::Subquery(query)) => format!("({})", compiler.subquery(query)?),
            _ => adapter.quote_table_name(self.table_name(StatementType::Select)?)?,
        };
        if let Some(alias) = &self.alias {
            from.push_str(" AS ");
            from.push_str(&adapter.quote_table_name(alias)?);
        }

        let joins = self
            .joins
            .iter()
            .map(|join| join.to_sql(compiler))
            .collect::<QueryResult<Vec<_>>>()?;
        let where_sql = self.render_where(compiler)?;
        let group_by = self
            .group_by
            .iter()
            .map(|column| compiler.column(column))
            .collect::<QueryResult<Vec<_>>>()?;
        let having = self.having.to_sql(compiler)?;
        let unions = self
            .unions
            .iter()
            .map(|(query, all)| {
                let keyword = if *all { "UNION ALL" } else { "UNION" };
                Ok(format!("{keyword} {}", compiler.subquery(query)?))
            })
            .collect::<QueryResult<Vec<_>>>()?;
        let order_by = self
            .order_by
            .iter()
            .map(|term| {
                if term.is_random() {
                    return Ok(adapter.random_function().to_string());
                }
                let column = if self.unions.is_empty() {
                    compiler.column(&term.column)?
                } else {
                    compiler.output_column(&term.column)?
                };
                Ok(adapter.order_by(&column, term.descending, term.nulls))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&columns);
        sql.push_str(" FROM ");
        sql.push_str(&from);
        for join in joins {
            sql.push(' ');
            sql.push_str(&join);
        }
        for join in render_auto_joins(compiler)? {
            sql.push(' ');
            sql.push_str(&join);
        }
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        if !group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_by.join(", "));
        }
        if !having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having);
        }
        for union in unions {
            sql.push(' ');
            sql.push_str(&union);
        }
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by.join(", "));
        }
        if let Some(tail) = adapter.limit_offset(self.limit, self.offset) {
            sql.push(' ');
            sql.push_str(&tail);
        }
        Ok(sql)
    }

    fn compile_insert(&self, compiler: &mut Compiler<'_>) -> QueryResult<String> {
        let adapter = compiler.adapter();
        let table = adapter.quote_table_name(self.table_name(StatementType::Insert)?)?;

        let Some(first) = self.insert_rows.first() else {
            return Ok(adapter.default_values_insert(&table));
        };
        if first.is_empty() {
            if self.insert_rows.len() == 1 {
                return Ok(adapter.default_values_insert(&table));
            }
            return Err(QueryError::InvalidStatementState(
                "INSERT of several rows needs at least one column".to_string(),
            ));
        }

        let columns: Vec<&str> = first.iter().map(|(key, _)| key.as_str()).collect();
        if columns.iter().collect::<HashSet<_>>().len() != columns.len() {
            return Err(QueryError::InvalidStatementState(
                "INSERT row repeats a column".to_string(),
            ));
        }

        let mut tuples = Vec::with_capacity(self.insert_rows.len());
        for (idx, row) in self.insert_rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(QueryError::InvalidStatementState(format!(
                    "INSERT row {idx} has {} columns, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            let mut values = Vec::with_capacity(columns.len());
            for column in &columns {
                let (_, value) = row.iter().find(|(key, _)| key == column).ok_or_else(|| {
                    QueryError::InvalidStatementState(format!(
                        "INSERT row {idx} is missing column '{column}'"
                    ))
                })?;
                values.push(compiler.operand(value)?);
            }
            tuples.push(format!("({})", values.join(", ")));
        }

        let columns = columns
            .iter()
            .map(|column| adapter.quote_column(column))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(format!(
            "INSERT INTO {table} ({}) VALUES {}",
            columns.join(", "),
            tuples.join(", ")
        ))
    }

    fn compile_update(&self, compiler: &mut Compiler<'_>) -> QueryResult<String> {
        let adapter = compiler.adapter();
        let table = adapter.quote_table_name(self.table_name(StatementType::Update)?)?;
        if self.update_values.is_empty() {
            return Err(QueryError::InvalidStatementState(
                "UPDATE has no values; call set_update first".to_string(),
            ));
        }

        let assignments = self
            .update_values
            .iter()
            .map(|(column, value)| {
                Ok(format!(
                    "{}={}",
                    adapter.quote_column(column)?,
                    compiler.operand(value)?
                ))
            })
            .collect::<QueryResult<Vec<_>>>()?;
        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        let where_sql = self.render_where(compiler)?;
        ensure_no_auto_joins(StatementType::Update, compiler)?;
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        Ok(sql)
    }

    fn compile_delete(&self, compiler: &mut Compiler<'_>) -> QueryResult<String> {
        let table = compiler
            .adapter()
            .quote_table_name(self.table_name(StatementType::Delete)?)?;
        let mut sql = format!("DELETE FROM {table}");
        let where_sql = self.render_where(compiler)?;
        ensure_no_auto_joins(StatementType::Delete, compiler)?;
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        Ok(sql)
    }

    /// WHERE is the filter tree ANDed with `NOT (..)` of each exclusion.
    fn render_where(&self, compiler: &mut Compiler<'_>) -> QueryResult<String> {
        let mut parts = Vec::with_capacity(1 + self.excludes.len());
        let filter = self.where_clause.to_sql(compiler)?;
        if !filter.is_empty() {
            parts.push(filter);
        }
        for exclude in &self.excludes {
            let sql = exclude.to_sql(compiler)?;
            if !sql.is_empty() {
                parts.push(format!("NOT ({sql})"));
            }
        }
        Ok(match parts.len() {
            0 => String::new(),
            1 => parts.remove(0),
            _ => parts
                .iter()
                .map(|part| format!("({part})"))
                .collect::<Vec<_>>()
                .join(" AND "),
        })
    }
}

fn render_select_item(item: &SelectItem, compiler: &mut Compiler<'_>) -> QueryResult<String> {
    let adapter = compiler.adapter();
    match item {
        SelectItem::Column(column) => adapter.quote_sql(&adapter.quote_column(column)?),
        SelectItem::Aliased(expr, alias) => Ok(format!(
            "{} AS {}",
            expr.to_sql(compiler)?,
            adapter.quote_column(alias)?
        )),
        SelectItem::Aggregate(aggregation) => aggregation.to_sql(adapter),
        SelectItem::Subquery(query, alias) => Ok(format!(
            "({}) AS {}",
            compiler.subquery(query)?,
            adapter.quote_column(alias)?
        )),
    }
}

fn render_auto_joins(compiler: &Compiler<'_>) -> QueryResult<Vec<String>> {
    let adapter = compiler.adapter();
    compiler
        .scope()
        .joins()
        .iter()
        .map(|join| {
            Ok(format!(
                "LEFT JOIN {} AS {} ON {} = {}",
                adapter.quote_table_name(&join.table)?,
                adapter.quote_table_name(&join.alias)?,
                adapter.quote_column(&join.left)?,
                adapter.quote_column(&join.right)?
            ))
        })
        .collect()
}

fn ensure_no_auto_joins(kind: StatementType, compiler: &Compiler<'_>) -> QueryResult<()> {
    if compiler.scope().joins().is_empty() {
        Ok(())
    } else {
        Err(QueryError::InvalidStatementState(format!(
            "{kind} cannot filter across relations"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MySqlAdapter, PostgresAdapter, SqliteAdapter};
    use crate::query::schema::{Schema, TableDef};

    fn mysql() -> QueryBuilder {
        QueryBuilder::new(Arc::new(MySqlAdapter), Arc::new(LookupBuilder::new()))
    }

    fn pg() -> QueryBuilder {
        QueryBuilder::new(Arc::new(PostgresAdapter), Arc::new(LookupBuilder::new()))
    }

    fn sqlite() -> QueryBuilder {
        QueryBuilder::new(Arc::new(SqliteAdapter), Arc::new(LookupBuilder::new()))
    }

    // ── SELECT ──────────────────────────────────────────────────────────

    #[test]
    fn test_select_count() {
        let sql = mysql().set_select(["COUNT(*)"]).set_from("test").to_sql().unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM `test`");
    }

    #[test]
    fn test_select_star_by_default() {
        assert_eq!(pg().set_from("test").to_sql().unwrap(), "SELECT * FROM \"test\"");
    }

    #[test]
    fn test_select_columns_alias_distinct() {
        let sql = pg()
            .set_select(["id", "t.name"])
            .set_distinct(true)
            .set_from("test")
            .set_alias("t")
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT DISTINCT \"id\", \"t\".\"name\" FROM \"test\" AS \"t\""
        );
    }

    #[test]
    fn test_select_marker_column() {
        let sql = pg()
            .set_select(["SUM([[price]])"])
            .set_from("orders")
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT SUM(\"price\") FROM \"orders\"");
    }

    #[test]
    fn test_select_with_where_order_limit() {
        let sql = mysql()
            .set_from("user")
            .filter(Q::and([("name__icontains", "ann")]))
            .set_order(["-created", "name"])
            .set_limit(10)
            .set_offset(20)
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `user` WHERE `name` LIKE '%ann%' ORDER BY `created` DESC, `name` ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_filter_twice_ands_trees() {
        let sql = sqlite()
            .set_from("t")
            .filter(Q::and([("a", 1)]))
            .filter(Q::and([("b", 2)]))
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" WHERE (\"a\" = 1) AND (\"b\" = 2)");
    }

    #[test]
    fn test_exclude() {
        let sql = sqlite()
            .set_from("t")
            .filter(Q::and([("a", 1)]))
            .exclude(Q::and([("b", 2)]))
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"t\" WHERE (\"a\" = 1) AND (NOT (\"b\" = 2))"
        );

        let sql = sqlite().set_from("t").exclude(Q::and([("b", 2)])).to_sql().unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" WHERE NOT (\"b\" = 2)");
    }

    #[test]
    fn test_group_having_aggregate() {
        let sql = pg()
            .set_select([
                SelectItem::from("author_id"),
                Aggregation::count("*").alias("total").into(),
            ])
            .set_from("book")
            .set_group(["author_id"])
            .set_having(Q::raw("COUNT(*) > 1"))
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"author_id\", COUNT(*) AS \"total\" FROM \"book\" GROUP BY \"author_id\" HAVING COUNT(*) > 1"
        );
    }

    #[test]
    fn test_explicit_join() {
        let sql = mysql()
            .set_from("book")
            .set_alias("b")
            .set_join(JoinType::Inner, "author", "b.author_id", "author.id")
            .join(Join::new(JoinType::Left, "publisher").alias("p").on_condition(Q::raw(
                "[[p.id]] = [[b.publisher_id]]",
            )))
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `book` AS `b` INNER JOIN `author` ON `b`.`author_id` = `author`.`id` LEFT JOIN `publisher` AS `p` ON `p`.`id` = `b`.`publisher_id`"
        );
    }

    #[test]
    fn test_relation_lookup_adds_auto_join() {
        let schema = Schema::new()
            .table(TableDef::new("book").foreign_key("author", "author"))
            .table(TableDef::new("author"));
        let lookups = LookupBuilder::new().with_schema(Arc::new(schema));
        let sql = QueryBuilder::new(Arc::new(PostgresAdapter), Arc::new(lookups))
            .set_from("book")
            .filter(Q::and([("author__name__startswith", "A"), ("title", "X")]))
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"book\" LEFT JOIN \"author\" AS \"author_1\" ON \"book\".\"author_id\" = \"author_1\".\"id\" WHERE \"author_1\".\"name\" LIKE 'A%' AND \"book\".\"title\" = 'X'"
        );
    }

    #[test]
    fn test_random_order() {
        let sql = mysql().set_from("t").set_order([OrderBy::random()]).to_sql().unwrap();
        assert_eq!(sql, "SELECT * FROM `t` ORDER BY RAND()");
        let sql = sqlite().set_from("t").set_order(["?"]).to_sql().unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" ORDER BY RANDOM()");
    }

    #[test]
    fn test_nulls_order() {
        let sql = pg()
            .set_from("t")
            .set_order([OrderBy::desc("x").nulls_last()])
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" ORDER BY \"x\" DESC NULLS LAST");
    }

    #[test]
    fn test_offset_only_sqlite() {
        let sql = sqlite().set_from("t").set_offset(5).to_sql().unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" LIMIT -1 OFFSET 5");
    }

    #[test]
    fn test_subquery_in_lookup_keeps_param_order() {
        let inner = pg()
            .set_select(["id"])
            .set_from("author")
            .filter(Q::and([("country", "NZ")]));
        let (sql, params) = pg()
            .set_from("book")
            .filter(Q::and([("year__gte", Operand::from(2000)), ("author_id__in", Operand::from(inner))]))
            .to_sql_with_params()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"book\" WHERE \"year\" >= $1 AND \"author_id\" IN (SELECT \"id\" FROM \"author\" WHERE \"country\" = $2)"
        );
        assert_eq!(params, vec![Value::Int(2000), Value::from("NZ")]);
    }

    #[test]
    fn test_from_subquery() {
        let inner = sqlite().set_select(["id"]).set_from("t");
        let sql = sqlite().set_from_subquery(inner, "sub").to_sql().unwrap();
        assert_eq!(sql, "SELECT * FROM (SELECT \"id\" FROM \"t\") AS \"sub\"");
    }

    #[test]
    fn test_select_subquery_item() {
        let count = sqlite().set_select(["COUNT(*)"]).set_from("b");
        let sql = sqlite()
            .set_select([SelectItem::from("id"), SelectItem::subquery(count, "n")])
            .set_from("a")
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT \"id\", (SELECT COUNT(*) FROM \"b\") AS \"n\" FROM \"a\"");
    }

    #[test]
    fn test_union() {
        let other = sqlite().set_select(["id"]).set_from("b");
        let sql = sqlite()
            .set_select(["id"])
            .set_from("a")
            .union(other, true)
            .set_order(["id"])
            .to_sql()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\" FROM \"a\" UNION ALL SELECT \"id\" FROM \"b\" ORDER BY \"id\" ASC"
        );
    }

    // ── INSERT ──────────────────────────────────────────────────────────

    #[test]
    fn test_insert_single_row() {
        let sql = mysql()
            .set_type(StatementType::Insert)
            .set_insert([[("name", "foo")]])
            .set_from("test")
            .to_sql()
            .unwrap();
        assert_eq!(sql, "INSERT INTO `test` (`name`) VALUES ('foo')");
    }

    #[test]
    fn test_insert_many_rows_keeps_order() {
        let (sql, params) = pg()
            .set_insert([
                vec![("name", Operand::from("a")), ("age", Operand::from(1))],
                vec![("age", Operand::from(2)), ("name", Operand::from("b"))],
                vec![("name", Operand::from("c")), ("age", Operand::from(3))],
            ])
            .set_from("people")
            .to_sql_with_params()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"people\" (\"name\", \"age\") VALUES ($1, $2), ($3, $4), ($5, $6)"
        );
        assert_eq!(
            params,
            vec![
                Value::from("a"),
                Value::Int(1),
                Value::from("b"),
                Value::Int(2),
                Value::from("c"),
                Value::Int(3),
            ]
        );
    }

    #[test]
    fn test_insert_mismatched_keys() {
        let err = mysql()
            .set_insert([vec![("a", 1)], vec![("b", 2)]])
            .set_from("t")
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidStatementState(_)));
    }

    #[test]
    fn test_insert_default_values() {
        let empty: Vec<Vec<(String, Value)>> = vec![vec![]];
        assert_eq!(
            sqlite().set_insert(empty.clone()).set_from("t").to_sql().unwrap(),
            "INSERT INTO \"t\" DEFAULT VALUES"
        );
        assert_eq!(
            mysql().set_insert(empty).set_from("t").to_sql().unwrap(),
            "INSERT INTO `t` () VALUES ()"
        );
    }

    // ── UPDATE / DELETE ─────────────────────────────────────────────────

    #[test]
    fn test_update() {
        let sql = mysql()
            .set_update([("name", Operand::from("bar")), ("hits", Operand::from(Expression::raw("[[hits]] + 1")))])
            .set_from("test")
            .filter(Q::and([("id", 1)]))
            .to_sql()
            .unwrap();
        assert_eq!(sql, "UPDATE `test` SET `name`='bar', `hits`=`hits` + 1 WHERE `id` = 1");
    }

    #[test]
    fn test_update_without_values() {
        let err = mysql()
            .set_type(StatementType::Update)
            .set_from("t")
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidStatementState(_)));
    }

    #[test]
    fn test_delete() {
        let sql = mysql().set_type(StatementType::Delete).set_from("test").to_sql().unwrap();
        assert_eq!(sql, "DELETE FROM `test`");
        let (sql, params) = pg()
            .set_type(StatementType::Delete)
            .set_from("test")
            .filter(Q::and([("id__in", Value::list([1, 2]))]))
            .to_sql_with_params()
            .unwrap();
        assert_eq!(sql, "DELETE FROM \"test\" WHERE \"id\" IN ($1, $2)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_delete_across_relation_rejected() {
        let schema = Schema::new().table(TableDef::new("book").foreign_key("author", "author"));
        let lookups = LookupBuilder::new().with_schema(Arc::new(schema));
        let err = QueryBuilder::new(Arc::new(SqliteAdapter), Arc::new(lookups))
            .set_type(StatementType::Delete)
            .set_from("book")
            .filter(Q::and([("author__name", "x")]))
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidStatementState(_)));
    }

    // ── State errors ────────────────────────────────────────────────────

    #[test]
    fn test_missing_from() {
        for builder in [mysql(), mysql().set_type(StatementType::Delete)] {
            assert!(matches!(
                builder.to_sql(),
                Err(QueryError::InvalidStatementState(_))
            ));
        }
    }

    #[test]
    fn test_conflicting_types() {
        let builder = mysql()
            .set_type(StatementType::Delete)
            .set_type(StatementType::Update)
            .set_from("t");
        assert!(matches!(
            builder.statement_type(),
            Err(QueryError::InvalidStatementState(_))
        ));
        assert!(builder.to_sql().is_err());

        let same = mysql().set_type(StatementType::Delete).set_type(StatementType::Delete);
        assert_eq!(same.statement_type().unwrap(), StatementType::Delete);
    }

    #[test]
    fn test_default_type_is_select() {
        assert_eq!(mysql().statement_type().unwrap(), StatementType::Select);
    }

    #[test]
    fn test_build_uses_param_mode() {
        let builder = sqlite().set_from("t").filter(Q::and([("a", 1)]));
        let (sql, params) = builder.clone().set_param_mode(ParamMode::Inline).build().unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" WHERE \"a\" = 1");
        assert!(params.is_empty());
        let (sql, params) = builder.build().unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" WHERE \"a\" = ?");
        assert_eq!(params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_order_by_from_str() {
        assert_eq!(OrderBy::from("-x"), OrderBy::desc("x"));
        assert_eq!(OrderBy::from("x"), OrderBy::asc("x"));
        assert!(OrderBy::from("?").is_random());
    }
}
