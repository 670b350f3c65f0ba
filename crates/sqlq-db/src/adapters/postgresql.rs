//! PostgreSQL dialect.

use super::{to_hex, Adapter, ColumnType};
use crate::query::lookups::DatePart;

/// The PostgreSQL adapter. Placeholders are numbered (`$1`, `$2`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAdapter;

impl Adapter for PostgresAdapter {
    fn vendor(&self) -> &'static str {
        "postgresql"
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn bytes_literal(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::bytea", to_hex(bytes))
    }

    fn sql_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Float => "REAL",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Decimal => "NUMERIC",
            ColumnType::String => "VARCHAR(255)",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "TIMESTAMP",
            ColumnType::Time => "TIME",
            ColumnType::Binary => "BYTEA",
            ColumnType::Json => "JSONB",
            ColumnType::Uuid => "UUID",
        }
    }

    fn date_part(&self, column: &str, part: DatePart) -> String {
        match part {
            // DOW counts from 0 (Sunday); week_day counts from 1.
            DatePart::WeekDay => format!("EXTRACT(DOW FROM {column}::timestamp) + 1"),
            other => format!("EXTRACT({} FROM {column}::timestamp)", other.sql_name()),
        }
    }

    fn regex_lookup(&self, column: &str, pattern: &str, case_insensitive: bool) -> String {
        let op = if case_insensitive { "~*" } else { "~" };
        format!("{column} {op} {pattern}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::compiler::Compiler;
    use crate::query::lookups::{LookupBuilder, Operand};
    use crate::value::Value;
    use sqlq_core::QueryError;

    fn render(op: &str, column: &str, value: impl Into<Operand>) -> String {
        let adapter = PostgresAdapter;
        let lookups = LookupBuilder::new();
        let mut compiler = Compiler::inline(&adapter, &lookups);
        adapter
            .run_lookup(op, column, &value.into(), &mut compiler)
            .unwrap()
    }

    // ── Quoting ─────────────────────────────────────────────────────────

    #[test]
    fn test_quote_sql() {
        let a = PostgresAdapter;
        assert_eq!(
            a.quote_sql("SELECT [[id]], [[t.name]] FROM {{customer}} t").unwrap(),
            "SELECT \"id\", \"t\".\"name\" FROM \"customer\" t"
        );
    }

    #[test]
    fn test_quote_value() {
        let a = PostgresAdapter;
        assert_eq!(a.quote_value(&Value::Int(123)), "123");
        assert_eq!(a.quote_value(&Value::from("string")), "'string'");
        assert_eq!(
            a.quote_value(&Value::from("It's interesting")),
            "'It''s interesting'"
        );
        assert_eq!(a.quote_value(&Value::Bool(false)), "FALSE");
        assert_eq!(a.quote_value(&Value::Null), "NULL");
        assert_eq!(a.quote_value(&Value::Bytes(vec![1, 255])), "'\\x01ff'::bytea");
        assert_eq!(a.quote_value(&Value::list([1, 2])), "1, 2");
    }

    #[test]
    fn test_quote_table_name() {
        let a = PostgresAdapter;
        assert_eq!(a.quote_table_name("table").unwrap(), "\"table\"");
        assert_eq!(a.quote_table_name("\"table\"").unwrap(), "\"table\"");
        assert_eq!(a.quote_table_name("schema.table").unwrap(), "\"schema\".\"table\"");
        assert_eq!(
            a.quote_table_name("schema.\"table\"").unwrap(),
            "\"schema\".\"table\""
        );
        assert_eq!(
            a.quote_table_name("\"schema\".\"table\"").unwrap(),
            "\"schema\".\"table\""
        );
        assert_eq!(a.quote_table_name("{{table}}").unwrap(), "{{table}}");
        assert_eq!(a.quote_table_name("(table)").unwrap(), "(table)");
    }

    #[test]
    fn test_quote_column() {
        let a = PostgresAdapter;
        assert_eq!(a.quote_column("column").unwrap(), "\"column\"");
        assert_eq!(a.quote_column("\"column\"").unwrap(), "\"column\"");
        assert_eq!(a.quote_column("table.column").unwrap(), "\"table\".\"column\"");
        assert_eq!(
            a.quote_column("table.\"column\"").unwrap(),
            "\"table\".\"column\""
        );
        assert_eq!(
            a.quote_column("\"table\".\"column\"").unwrap(),
            "\"table\".\"column\""
        );
        assert_eq!(a.quote_column("[[column]]").unwrap(), "[[column]]");
        assert_eq!(a.quote_column("{{column}}").unwrap(), "{{column}}");
        assert_eq!(a.quote_column("(column)").unwrap(), "(column)");
    }

    #[test]
    fn test_quote_rejects_stray_quote() {
        let err = PostgresAdapter.quote_table_name("ta\"ble").unwrap_err();
        assert!(matches!(err, QueryError::MalformedIdentifier(_)));
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    #[test]
    fn test_exact_and_null() {
        assert_eq!(render("exact", "name", "foo"), "\"name\" = 'foo'");
        assert_eq!(render("exact", "name", Value::Null), "\"name\" IS NULL");
        assert_eq!(render("isnt", "name", Value::Null), "\"name\" IS NOT NULL");
        assert_eq!(render("isnt", "name", "foo"), "\"name\" != 'foo'");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(render("gt", "age", 18), "\"age\" > 18");
        assert_eq!(render("gte", "age", 18), "\"age\" >= 18");
        assert_eq!(render("lt", "age", 18), "\"age\" < 18");
        assert_eq!(render("lte", "age", 18), "\"age\" <= 18");
    }

    #[test]
    fn test_in_and_range() {
        assert_eq!(render("in", "id", Value::list([1, 2, 3])), "\"id\" IN (1, 2, 3)");
        assert_eq!(render("in", "id", 7), "\"id\" IN (7)");
        assert_eq!(
            render("range", "age", Value::list([18, 30])),
            "\"age\" BETWEEN 18 AND 30"
        );
    }

    #[test]
    fn test_pattern_lookups() {
        assert_eq!(render("contains", "name", "foo"), "\"name\" LIKE '%foo%'");
        assert_eq!(render("icontains", "name", "foo"), "\"name\" ILIKE '%foo%'");
        assert_eq!(render("startswith", "name", "foo"), "\"name\" LIKE 'foo%'");
        assert_eq!(render("iendswith", "name", "foo"), "\"name\" ILIKE '%foo'");
        assert_eq!(render("contains", "name", "100%"), "\"name\" LIKE '%100\\%%'");
    }

    #[test]
    fn test_iexact() {
        assert_eq!(
            render("iexact", "name", "Foo"),
            "LOWER(\"name\") = LOWER('Foo')"
        );
    }

    #[test]
    fn test_regex() {
        assert_eq!(render("regex", "name", "^a"), "\"name\" ~ '^a'");
        assert_eq!(render("iregex", "name", "^a"), "\"name\" ~* '^a'");
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(
            render("month", "t.created", 3),
            "EXTRACT(MONTH FROM \"t\".\"created\"::timestamp) = 3"
        );
        assert_eq!(
            render("week_day", "created", 1),
            "EXTRACT(DOW FROM \"created\"::timestamp) + 1 = 1"
        );
    }

    #[test]
    fn test_placeholder_numbering() {
        assert_eq!(PostgresAdapter.placeholder(1), "$1");
        assert_eq!(PostgresAdapter.placeholder(12), "$12");
    }

    #[test]
    fn test_limit_offset_and_random() {
        let a = PostgresAdapter;
        assert_eq!(a.limit_offset(None, Some(5)).unwrap(), "OFFSET 5");
        assert_eq!(a.random_function(), "RANDOM()");
    }
}
