//! MySQL dialect.
//!
//! Identifiers are quoted with backticks, placeholders are `?`. String
//! literals double both single quotes and backslashes because MySQL treats
//! `\` as an escape character inside literals.

use super::{Adapter, ColumnType, NullsOrder, PatternKind};
use crate::query::compiler::Compiler;
use crate::query::lookups::DatePart;
use crate::value::Value;

/// The MySQL / MariaDB adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlAdapter;

impl Adapter for MySqlAdapter {
    fn vendor(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn escape_string(&self, value: &str) -> String {
        value.replace('\\', "\\\\").replace('\'', "''")
    }

    fn sql_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Boolean => "TINYINT(1)",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::String => "VARCHAR(255)",
            ColumnType::Text => "LONGTEXT",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Time => "TIME",
            ColumnType::Binary => "LONGBLOB",
            ColumnType::Json => "JSON",
            ColumnType::Uuid => "CHAR(36)",
        }
    }

    // MySQL only accepts a short list of CAST targets.
    fn cast_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Boolean | ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => {
                "SIGNED"
            }
            ColumnType::Float | ColumnType::Double => "DOUBLE",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::String | ColumnType::Text | ColumnType::Uuid => "CHAR",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Time => "TIME",
            ColumnType::Binary => "BINARY",
            ColumnType::Json => "JSON",
        }
    }

    fn random_function(&self) -> &'static str {
        "RAND()"
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        // MySQL has no bare OFFSET; the largest row count stands in.
        let limit = match (limit, offset) {
            (None, None) => return None,
            (None, Some(_)) => u64::MAX,
            (Some(limit), _) => limit,
        };
        Some(match offset {
            Some(offset) => format!("LIMIT {limit} OFFSET {offset}"),
            None => format!("LIMIT {limit}"),
        })
    }

    fn order_by(&self, column: &str, descending: bool, nulls: Option<NullsOrder>) -> String {
        let direction = if descending { "DESC" } else { "ASC" };
        match nulls {
            None => format!("{column} {direction}"),
            Some(NullsOrder::First) => format!("{column} IS NULL DESC, {column} {direction}"),
            Some(NullsOrder::Last) => format!("{column} IS NULL ASC, {column} {direction}"),
        }
    }

    fn default_values_insert(&self, table: &str) -> String {
        format!("INSERT INTO {table} () VALUES ()")
    }

    fn date_part(&self, column: &str, part: DatePart) -> String {
        match part {
            DatePart::WeekDay => format!("DAYOFWEEK({column})"),
            other => format!("EXTRACT({} FROM {column})", other.sql_name()),
        }
    }

    fn regex_lookup(&self, column: &str, pattern: &str, case_insensitive: bool) -> String {
        let mode = if case_insensitive { 'i' } else { 'c' };
        format!("REGEXP_LIKE({column}, {pattern}, '{mode}')")
    }

    fn pattern_lookup(
        &self,
        column: &str,
        needle: &str,
        kind: PatternKind,
        case_insensitive: bool,
        compiler: &mut Compiler<'_>,
    ) -> String {
        let pattern = compiler.bind(Value::String(kind.wrap(&super::escape_like(needle), '%')));
        if case_insensitive {
            format!("{column} LIKE {pattern}")
        } else {
            format!("{column} LIKE BINARY {pattern}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lookups::{LookupBuilder, Operand};

    fn render(op: &str, column: &str, value: impl Into<Operand>) -> String {
        let adapter = MySqlAdapter;
        let lookups = LookupBuilder::new();
        let mut compiler = Compiler::inline(&adapter, &lookups);
        adapter
            .run_lookup(op, column, &value.into(), &mut compiler)
            .unwrap()
    }

    #[test]
    fn test_quote_identifiers() {
        let a = MySqlAdapter;
        assert_eq!(a.quote_table_name("test").unwrap(), "`test`");
        assert_eq!(a.quote_table_name("db.test").unwrap(), "`db`.`test`");
        assert_eq!(a.quote_table_name("`test`").unwrap(), "`test`");
        assert_eq!(a.quote_column("t.name").unwrap(), "`t`.`name`");
    }

    #[test]
    fn test_quote_value() {
        let a = MySqlAdapter;
        assert_eq!(a.quote_value(&Value::Int(123)), "123");
        assert_eq!(a.quote_value(&Value::from("It's")), "'It''s'");
        assert_eq!(a.quote_value(&Value::from("a\\b")), "'a\\\\b'");
        assert_eq!(a.quote_value(&Value::Bool(true)), "1");
        assert_eq!(a.quote_value(&Value::Bytes(vec![0xde, 0xad])), "X'dead'");
    }

    #[test]
    fn test_contains_variants() {
        assert_eq!(render("contains", "name", "foo"), "`name` LIKE BINARY '%foo%'");
        assert_eq!(render("icontains", "name", "foo"), "`name` LIKE '%foo%'");
        assert_eq!(render("istartswith", "name", "a_b"), "`name` LIKE 'a\\\\_b%'");
    }

    #[test]
    fn test_regex() {
        assert_eq!(render("regex", "name", "^a"), "REGEXP_LIKE(`name`, '^a', 'c')");
        assert_eq!(render("iregex", "name", "^a"), "REGEXP_LIKE(`name`, '^a', 'i')");
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(render("year", "created", 2024), "EXTRACT(YEAR FROM `created`) = 2024");
        assert_eq!(render("week_day", "created", 2), "DAYOFWEEK(`created`) = 2");
    }

    #[test]
    fn test_limit_offset() {
        let a = MySqlAdapter;
        assert_eq!(
            a.limit_offset(None, Some(5)).unwrap(),
            "LIMIT 18446744073709551615 OFFSET 5"
        );
        assert_eq!(a.limit_offset(Some(10), Some(5)).unwrap(), "LIMIT 10 OFFSET 5");
        assert_eq!(a.limit_offset(Some(10), None).unwrap(), "LIMIT 10");
        assert!(a.limit_offset(None, None).is_none());
    }

    #[test]
    fn test_nulls_ordering_emulated() {
        let a = MySqlAdapter;
        assert_eq!(
            a.order_by("`x`", true, Some(NullsOrder::Last)),
            "`x` IS NULL ASC, `x` DESC"
        );
    }

    #[test]
    fn test_default_values_insert() {
        assert_eq!(
            MySqlAdapter.default_values_insert("`t`"),
            "INSERT INTO `t` () VALUES ()"
        );
    }

    #[test]
    fn test_cast_type() {
        assert_eq!(MySqlAdapter.cast_type(ColumnType::Integer), "SIGNED");
        assert_eq!(MySqlAdapter.sql_type(ColumnType::Integer), "INT");
    }
}
