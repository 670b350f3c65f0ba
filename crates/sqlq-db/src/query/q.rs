//! The `Q` condition tree.
//!
//! A [`Q`] is a composable boolean expression. Its [`Condition`] is one of:
//!
//! - empty (renders nothing),
//! - raw SQL (markers quoted, otherwise verbatim),
//! - a list of [`Entry`] values joined by the node's [`Connector`],
//! - a nested `Q`,
//! - a composite `(left) OP (right)`.
//!
//! `Q` values combine with `&`, `|` and `!`.
//!
//! ```
//! use sqlq_db::adapters::MySqlAdapter;
//! use sqlq_db::query::lookups::LookupBuilder;
//! use sqlq_db::query::q::Q;
//!
//! let q = Q::and([("name", "foo")]) | Q::and([("name", "bar")]);
//! let sql = q.render(&MySqlAdapter, &LookupBuilder::new()).unwrap();
//! assert_eq!(sql, "(`name` = 'foo') OR (`name` = 'bar')");
//! ```

use std::fmt;
use std::ops;

use sqlq_core::{QueryError, QueryResult};

use super::compiler::Compiler;
use super::lookups::{LookupBuilder, Operand};
use crate::adapters::Adapter;
use crate::value::Value;

/// Keys of a JSON object that describe a composite node.
const JSON_OPERATOR: &str = "___operator";
const JSON_LEFT: &str = "___where";
const JSON_RIGHT: &str = "___condition";

/// The boolean connector of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    /// All parts must hold.
    #[default]
    And,
    /// Any part may hold.
    Or,
}

impl Connector {
    /// The SQL keyword.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Parses a connector name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("and") {
            Some(Self::And)
        } else if name.eq_ignore_ascii_case("or") {
            Some(Self::Or)
        } else {
            None
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One item in a lookup list.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A `key => value` lookup.
    Lookup(String, Operand),
    /// A nested tree, rendered in parentheses.
    Nested(Q),
    /// A group of entries rendered inline with the parent's connector.
    Group(Vec<Entry>),
    /// Raw SQL.
    Raw(String),
}

impl Entry {
    /// Creates a lookup entry.
    pub fn lookup(key: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::Lookup(key.into(), value.into())
    }
}

/// The shape of a condition.
#[derive(Debug, Clone, Default)]
pub enum Condition {
    /// No condition.
    #[default]
    Empty,
    /// Raw SQL with optional identifier markers.
    Raw(String),
    /// Entries joined by the node's connector.
    Lookups(Vec<Entry>),
    /// A nested tree.
    Nested(Box<Q>),
    /// `(left) OP (right)`.
    Composite {
        /// The operator between the two sides.
        operator: Connector,
        /// The left side.
        left: Box<Condition>,
        /// The right side.
        right: Box<Condition>,
    },
}

/// A composable condition tree.
#[derive(Debug, Clone, Default)]
pub struct Q {
    connector: Connector,
    condition: Condition,
    negated: bool,
}

impl Q {
    /// A condition that renders as nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    fn lookups<K, V>(connector: Connector, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Operand>,
    {
        let entries: Vec<Entry> = pairs
            .into_iter()
            .map(|(key, value)| Entry::lookup(key, value))
            .collect();
        Self {
            connector,
            condition: if entries.is_empty() {
                Condition::Empty
            } else {
                Condition::Lookups(entries)
            },
            negated: false,
        }
    }

    /// Lookups that must all hold.
    pub fn and<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Operand>,
    {
        Self::lookups(Connector::And, pairs)
    }

    /// Lookups of which any may hold.
    pub fn or<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Operand>,
    {
        Self::lookups(Connector::Or, pairs)
    }

    /// Raw SQL. `[[col]]` and `{{table}}` markers are quoted when rendered.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            condition: Condition::Raw(sql.into()),
            ..Self::default()
        }
    }

    /// `(left) OP (right)`.
    pub fn composite(operator: Connector, left: Self, right: Self) -> Self {
        Self {
            connector: operator,
            condition: Condition::Composite {
                operator,
                left: Box::new(Condition::Nested(Box::new(left))),
                right: Box::new(Condition::Nested(Box::new(right))),
            },
            negated: false,
        }
    }

    /// Appends a lookup.
    #[must_use]
    pub fn lookup(mut self, key: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.add_where(Entry::lookup(key, value));
        self
    }

    /// Appends a nested tree.
    #[must_use]
    pub fn nested(mut self, q: Self) -> Self {
        self.add_where(Entry::Nested(q));
        self
    }

    /// Appends a group of entries.
    #[must_use]
    pub fn group(mut self, entries: Vec<Entry>) -> Self {
        self.add_where(Entry::Group(entries));
        self
    }

    /// Appends an entry. A raw, nested or composite condition is first
    /// turned into an entry of a new lookup list.
    pub fn add_where(&mut self, entry: Entry) {
        let entries = match std::mem::take(&mut self.condition) {
            Condition::Empty => vec![entry],
            Condition::Lookups(mut entries) => {
                entries.push(entry);
                entries
            }
            Condition::Raw(sql) => vec![Entry::Raw(sql), entry],
            Condition::Nested(q) => vec![Entry::Nested(*q), entry],
            composite @ Condition::Composite { .. } => {
                let previous = Self {
                    connector: self.connector,
                    condition: composite,
                    negated: false,
                };
                vec![Entry::Nested(previous), entry]
            }
        };
        self.condition = Condition::Lookups(entries);
    }

    /// The connector used between entries.
    pub const fn connector(&self) -> Connector {
        self.connector
    }

    /// The condition.
    pub const fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Whether the tree renders wrapped in `NOT (..)`.
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    /// Returns `true` if the tree has no condition at all.
    pub fn is_empty(&self) -> bool {
        match &self.condition {
            Condition::Empty => true,
            Condition::Lookups(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Renders the tree.
    ///
    /// # Errors
    ///
    /// Returns lookup, relation, and identifier errors from rendering the
    /// entries.
    pub fn to_sql(&self, compiler: &mut Compiler<'_>) -> QueryResult<String> {
        let sql = self.render_condition(&self.condition, compiler)?;
        if self.negated && !sql.is_empty() {
            return Ok(format!("NOT ({sql})"));
        }
        Ok(sql)
    }

    /// Renders the tree with inlined values.
    ///
    /// # Errors
    ///
    /// See [`to_sql`](Self::to_sql).
    pub fn render(&self, adapter: &dyn Adapter, lookups: &LookupBuilder) -> QueryResult<String> {
        let mut compiler = Compiler::inline(adapter, lookups);
        self.to_sql(&mut compiler)
    }

    fn render_condition(
        &self,
        condition: &Condition,
        compiler: &mut Compiler<'_>,
    ) -> QueryResult<String> {
        match condition {
            Condition::Empty => Ok(String::new()),
            Condition::Raw(sql) => compiler.adapter().quote_sql(sql),
            Condition::Lookups(entries) => self.render_entries(entries, compiler),
            Condition::Nested(q) => q.to_sql(compiler),
            Condition::Composite {
                operator,
                left,
                right,
            } => {
                let left = self.render_condition(left, compiler)?;
                let right = self.render_condition(right, compiler)?;
                Ok(match (left.is_empty(), right.is_empty()) {
                    (true, _) => right,
                    (false, true) => left,
                    (false, false) => format!("({left}) {operator} ({right})"),
                })
            }
        }
    }

    fn render_entries(&self, entries: &[Entry], compiler: &mut Compiler<'_>) -> QueryResult<String> {
        let mut parts = Vec::with_capacity(entries.len());
        for entry in entries {
            let sql = match entry {
                Entry::Lookup(key, value) => compiler.lookup(key, value)?,
                Entry::Nested(q) => {
                    let inner = q.to_sql(compiler)?;
                    if inner.is_empty() {
                        continue;
                    }
                    format!("({inner})")
                }
                Entry::Group(group) => self.render_entries(group, compiler)?,
                Entry::Raw(sql) => compiler.adapter().quote_sql(sql)?,
            };
            if !sql.is_empty() {
                parts.push(sql);
            }
        }
        Ok(parts.join(&format!(" {} ", self.connector)))
    }

    /// Builds a tree from dynamic JSON.
    ///
    /// - a string is raw SQL;
    /// - an object maps lookup keys to values, or describes a composite
    ///   with `___operator`, `___where` and `___condition`;
    /// - an array holds raw strings, objects and arrays, each rendered
    ///   inline.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedConditionType`] for any other JSON
    /// value or an unknown composite operator.
    pub fn from_json(json: &serde_json::Value) -> QueryResult<Self> {
        match json {
            serde_json::Value::String(sql) => Ok(Self::raw(sql.clone())),
            serde_json::Value::Object(map) if map.contains_key(JSON_OPERATOR) => {
                let operator = map
                    .get(JSON_OPERATOR)
                    .and_then(serde_json::Value::as_str)
                    .and_then(Connector::parse)
                    .ok_or_else(|| {
                        QueryError::UnsupportedConditionType(format!(
                            "invalid composite operator in {json}"
                        ))
                    })?;
                let left = map.get(JSON_LEFT).map_or_else(|| Ok(Self::empty()), Self::from_json)?;
                let right = map
                    .get(JSON_RIGHT)
                    .map_or_else(|| Ok(Self::empty()), Self::from_json)?;
                Ok(Self::composite(operator, left, right))
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                let entries = json_entries(json)?;
                let mut q = Self::empty();
                for entry in entries {
                    q.add_where(entry);
                }
                Ok(q)
            }
            other => Err(QueryError::UnsupportedConditionType(format!(
                "cannot build a condition from {other}"
            ))),
        }
    }
}

fn json_entries(json: &serde_json::Value) -> QueryResult<Vec<Entry>> {
    match json {
        serde_json::Value::Object(map) => Ok(map
            .iter()
            .map(|(key, value)| Entry::lookup(key.clone(), Value::from_json(value)))
            .collect()),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(sql) => Ok(Entry::Raw(sql.clone())),
                serde_json::Value::Object(map) if map.contains_key(JSON_OPERATOR) => {
                    Q::from_json(item).map(Entry::Nested)
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    json_entries(item).map(Entry::Group)
                }
                other => Err(QueryError::UnsupportedConditionType(format!(
                    "cannot build a condition entry from {other}"
                ))),
            })
            .collect(),
        other => Err(QueryError::UnsupportedConditionType(format!(
            "cannot build condition entries from {other}"
        ))),
    }
}

impl ops::BitAnd for Q {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::composite(Connector::And, self, rhs)
    }
}

impl ops::BitOr for Q {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::composite(Connector::Or, self, rhs)
    }
}

impl ops::Not for Q {
    type Output = Self;

    fn not(mut self) -> Self::Output {
        self.negated = !self.negated;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MySqlAdapter, PostgresAdapter, SqliteAdapter};

    fn mysql(q: &Q) -> String {
        q.render(&MySqlAdapter, &LookupBuilder::new()).unwrap()
    }

    // ── Basic shapes ────────────────────────────────────────────────────

    #[test]
    fn test_empty_renders_nothing_for_every_adapter() {
        let lookups = LookupBuilder::new();
        let adapters: [&dyn Adapter; 3] = [&MySqlAdapter, &PostgresAdapter, &SqliteAdapter];
        for adapter in adapters {
            assert_eq!(Q::empty().render(adapter, &lookups).unwrap(), "");
            assert_eq!(
                Q::and(Vec::<(String, Value)>::new()).render(adapter, &lookups).unwrap(),
                ""
            );
            assert_eq!((!Q::empty()).render(adapter, &lookups).unwrap(), "");
        }
    }

    #[test]
    fn test_and_lookups() {
        let q = Q::and([("name", Operand::from("foo")), ("age__gt", Operand::from(3))]);
        assert_eq!(mysql(&q), "`name` = 'foo' AND `age` > 3");
    }

    #[test]
    fn test_or_lookups() {
        let q = Q::or([("id", 1), ("id", 2)]);
        assert_eq!(mysql(&q), "`id` = 1 OR `id` = 2");
    }

    #[test]
    fn test_raw_quotes_markers() {
        let q = Q::raw("[[a]] > [[b]]");
        assert_eq!(mysql(&q), "`a` > `b`");
    }

    // ── Composition ─────────────────────────────────────────────────────

    #[test]
    fn test_composite_or() {
        let q = Q::composite(
            Connector::Or,
            Q::and([("a", 1)]),
            Q::and([("b", 2)]),
        );
        assert_eq!(mysql(&q), "(`a` = 1) OR (`b` = 2)");
    }

    #[test]
    fn test_composite_with_empty_side() {
        let q = Q::empty() & Q::and([("a", 1)]);
        assert_eq!(mysql(&q), "`a` = 1");
        let q = Q::and([("a", 1)]) | Q::empty();
        assert_eq!(mysql(&q), "`a` = 1");
    }

    #[test]
    fn test_nested_composites() {
        let q = (Q::and([("a", 1)]) | Q::and([("b", 2)])) & Q::and([("c", 3)]);
        assert_eq!(mysql(&q), "((`a` = 1) OR (`b` = 2)) AND (`c` = 3)");
    }

    #[test]
    fn test_negation() {
        let q = !Q::and([("a", 1)]);
        assert!(q.is_negated());
        assert_eq!(mysql(&q), "NOT (`a` = 1)");
        assert_eq!(mysql(&!q), "`a` = 1");
    }

    #[test]
    fn test_nested_entry_is_parenthesized() {
        let q = Q::and([("a", 1)]).nested(Q::or([("b", 2), ("c", 3)]));
        assert_eq!(mysql(&q), "`a` = 1 AND (`b` = 2 OR `c` = 3)");
    }

    #[test]
    fn test_group_entry_is_inline() {
        let q = Q::or([("a", 1)]).group(vec![Entry::lookup("b", 2), Entry::lookup("c", 3)]);
        assert_eq!(mysql(&q), "`a` = 1 OR `b` = 2 OR `c` = 3");
    }

    #[test]
    fn test_empty_nested_entry_is_skipped() {
        let q = Q::and([("a", 1)]).nested(Q::empty());
        assert_eq!(mysql(&q), "`a` = 1");
    }

    #[test]
    fn test_add_where_on_raw() {
        let mut q = Q::raw("[[x]] = 1");
        q.add_where(Entry::lookup("y", 2));
        assert_eq!(mysql(&q), "`x` = 1 AND `y` = 2");
    }

    #[test]
    fn test_add_where_on_composite() {
        let mut q = Q::and([("a", 1)]) | Q::and([("b", 2)]);
        q.add_where(Entry::lookup("c", 3));
        assert_eq!(mysql(&q), "((`a` = 1) OR (`b` = 2)) OR `c` = 3");
    }

    #[test]
    fn test_bind_mode_collects_params() {
        let lookups = LookupBuilder::new();
        let mut compiler = Compiler::parameterized(&PostgresAdapter, &lookups);
        let q = Q::and([("a", 1)]) | Q::and([("b__in", Value::list([2, 3]))]);
        let sql = q.to_sql(&mut compiler).unwrap();
        assert_eq!(sql, "(\"a\" = $1) OR (\"b\" IN ($2, $3))");
        assert_eq!(compiler.params().len(), 3);
    }

    #[test]
    fn test_malformed_key_errors() {
        let q = Q::and([("a__", 1)]);
        assert!(matches!(
            q.render(&MySqlAdapter, &LookupBuilder::new()),
            Err(QueryError::UnsupportedConditionType(_))
        ));
    }

    // ── JSON ────────────────────────────────────────────────────────────

    #[test]
    fn test_from_json_object() {
        let q = Q::from_json(&serde_json::json!({"name__icontains": "foo"})).unwrap();
        assert_eq!(mysql(&q), "`name` LIKE '%foo%'");
    }

    #[test]
    fn test_from_json_string_and_array() {
        let q = Q::from_json(&serde_json::json!("[[a]] IS NULL")).unwrap();
        assert_eq!(mysql(&q), "`a` IS NULL");

        let q = Q::from_json(&serde_json::json!(["[[a]] = 1", {"b": 2}])).unwrap();
        assert_eq!(mysql(&q), "`a` = 1 AND `b` = 2");
    }

    #[test]
    fn test_from_json_keeps_key_order() {
        let q = Q::from_json(&serde_json::json!({"zeta": 1, "alpha": 2, "mid__gt": 3})).unwrap();
        assert_eq!(mysql(&q), "`zeta` = 1 AND `alpha` = 2 AND `mid` > 3");

        let parsed: serde_json::Value =
            serde_json::from_str(r#"{"status": "open", "created__year": 2024}"#).unwrap();
        let q = Q::from_json(&parsed).unwrap();
        assert_eq!(mysql(&q), "`status` = 'open' AND EXTRACT(YEAR FROM `created`) = 2024");
    }

    #[test]
    fn test_from_json_composite() {
        let q = Q::from_json(&serde_json::json!({
            "___operator": "or",
            "___where": {"a": 1},
            "___condition": {"b__in": [1, 2]}
        }))
        .unwrap();
        assert_eq!(mysql(&q), "(`a` = 1) OR (`b` IN (1, 2))");
    }

    #[test]
    fn test_from_json_rejects_scalars() {
        for json in [serde_json::json!(1), serde_json::json!(null), serde_json::json!(true)] {
            assert!(matches!(
                Q::from_json(&json),
                Err(QueryError::UnsupportedConditionType(_))
            ));
        }
        assert!(Q::from_json(&serde_json::json!({"___operator": "xor"})).is_err());
        assert!(Q::from_json(&serde_json::json!([1])).is_err());
    }
}
