//! Relation metadata and per-statement join bookkeeping.
//!
//! A [`Schema`] lists tables and their named relations. When a
//! [`LookupBuilder`](super::lookups::LookupBuilder) has a schema, a filter
//! key like `author__name` on `book` becomes `author_1.name` plus a LEFT
//! JOIN recorded in the statement's [`JoinScope`].

use std::collections::HashMap;

/// A foreign-key style relation from one table to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// The related table.
    pub target: String,
    /// The column on the owning table.
    pub local_column: String,
    /// The column on the related table.
    pub target_column: String,
}

impl Relation {
    /// Creates a relation to `target` joined on `local_column = target_column`.
    pub fn new(
        target: impl Into<String>,
        local_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            local_column: local_column.into(),
            target_column: target_column.into(),
        }
    }
}

/// A table and its named relations.
#[derive(Debug, Clone, Default)]
pub struct TableDef {
    name: String,
    relations: HashMap<String, Relation>,
}

impl TableDef {
    /// Creates a table definition with no relations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: HashMap::new(),
        }
    }

    /// Adds a named relation.
    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    /// Adds a relation named `name` through `<name>_id` to `target.id`.
    #[must_use]
    pub fn foreign_key(self, name: &str, target: impl Into<String>) -> Self {
        let relation = Relation::new(target, format!("{name}_id"), "id");
        self.relation(name, relation)
    }

    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Table definitions keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: HashMap<String, TableDef>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a table definition.
    #[must_use]
    pub fn table(mut self, table: TableDef) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Returns a table definition.
    pub fn get(&self, table: &str) -> Option<&TableDef> {
        self.tables.get(table)
    }

    /// Returns the relation `name` declared on `table`.
    pub fn relation(&self, table: &str, name: &str) -> Option<&Relation> {
        self.tables.get(table)?.relations.get(name)
    }
}

/// A LEFT JOIN added while resolving a relation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoJoin {
    /// The relation path that produced the join (`author__country`).
    pub path: String,
    /// The joined table.
    pub table: String,
    /// The alias the joined table is known by.
    pub alias: String,
    /// Qualified column on the left side of the ON clause.
    pub left: String,
    /// Qualified column on the right side of the ON clause.
    pub right: String,
}

/// The base table of a statement and the joins its lookups required.
#[derive(Debug, Clone, Default)]
pub struct JoinScope {
    table: Option<String>,
    alias: Option<String>,
    joins: Vec<AutoJoin>,
}

impl JoinScope {
    /// Creates a scope rooted at `table`, optionally aliased.
    pub fn for_table(table: impl Into<String>, alias: Option<&str>) -> Self {
        Self {
            table: Some(table.into()),
            alias: alias.map(str::to_owned),
            joins: Vec::new(),
        }
    }

    /// The base table name.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// The name columns of the base table are qualified with.
    pub fn qualifier(&self) -> Option<&str> {
        self.alias.as_deref().or(self.table.as_deref())
    }

    /// The joins registered so far, in registration order.
    pub fn joins(&self) -> &[AutoJoin] {
        &self.joins
    }

    /// Returns the alias for `path`, registering a join from `from` if the
    /// path has not been joined yet.
    pub fn join(&mut self, path: &str, relation: &Relation, from: &str) -> String {
        if let Some(existing) = self.joins.iter().find(|join| join.path == path) {
            return existing.alias.clone();
        }
        let alias = format!("{}_{}", relation.target, self.joins.len() + 1);
        self.joins.push(AutoJoin {
            path: path.to_string(),
            table: relation.target.clone(),
            alias: alias.clone(),
            left: format!("{from}.{}", relation.local_column),
            right: format!("{alias}.{}", relation.target_column),
        });
        alias
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_relation_lookup() {
        let schema = Schema::new().table(TableDef::new("book").foreign_key("author", "author"));
        let relation = schema.relation("book", "author").unwrap();
        assert_eq!(relation.local_column, "author_id");
        assert_eq!(relation.target_column, "id");
        assert!(schema.relation("book", "publisher").is_none());
        assert!(schema.relation("missing", "author").is_none());
        assert_eq!(schema.get("book").unwrap().name(), "book");
    }

    #[test]
    fn test_join_scope_reuses_path() {
        let relation = Relation::new("author", "author_id", "id");
        let mut scope = JoinScope::for_table("book", None);
        let first = scope.join("author", &relation, "book");
        let second = scope.join("author", &relation, "book");
        assert_eq!(first, "author_1");
        assert_eq!(first, second);
        assert_eq!(scope.joins().len(), 1);
    }

    #[test]
    fn test_qualifier_prefers_alias() {
        assert_eq!(JoinScope::for_table("book", Some("b")).qualifier(), Some("b"));
        assert_eq!(JoinScope::for_table("book", None).qualifier(), Some("book"));
        assert_eq!(JoinScope::default().qualifier(), None);
    }
}
