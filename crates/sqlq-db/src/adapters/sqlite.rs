//! SQLite dialect.
//!
//! `LIKE` is case-insensitive for ASCII in SQLite, so the case-sensitive
//! pattern lookups use `GLOB` instead.

use super::{escape_like, Adapter, ColumnType, PatternKind};
use crate::query::compiler::Compiler;
use crate::query::lookups::DatePart;
use crate::value::Value;

/// The SQLite adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteAdapter;

/// Escapes GLOB metacharacters by wrapping each in a character class.
fn escape_glob(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' | '?' | '[' => {
                out.push('[');
                out.push(ch);
                out.push(']');
            }
            _ => out.push(ch),
        }
    }
    out
}

impl Adapter for SqliteAdapter {
    fn vendor(&self) -> &'static str {
        "sqlite"
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn sql_type(&self, ty: ColumnType) -> &'static str {
        match ty {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::String => "VARCHAR(255)",
            ColumnType::Text | ColumnType::Json => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Time => "TIME",
            ColumnType::Binary => "BLOB",
            ColumnType::Uuid => "CHAR(36)",
        }
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(limit), None) => Some(format!("LIMIT {limit}")),
            (Some(limit), Some(offset)) => Some(format!("LIMIT {limit} OFFSET {offset}")),
            (None, Some(offset)) => Some(format!("LIMIT -1 OFFSET {offset}")),
        }
    }

    fn date_part(&self, column: &str, part: DatePart) -> String {
        let format = match part {
            DatePart::Year => "%Y",
            DatePart::Month => "%m",
            DatePart::Day => "%d",
            DatePart::WeekDay => "%w",
            DatePart::Hour => "%H",
            DatePart::Minute => "%M",
            DatePart::Second => "%S",
        };
        let extracted = format!("CAST(strftime('{format}', {column}) AS INTEGER)");
        if part == DatePart::WeekDay {
            format!("{extracted} + 1")
        } else {
            extracted
        }
    }

    fn regex_lookup(&self, column: &str, pattern: &str, case_insensitive: bool) -> String {
        if case_insensitive {
            format!("{column} REGEXP '(?i)' || {pattern}")
        } else {
            format!("{column} REGEXP {pattern}")
        }
    }

    fn pattern_lookup(
        &self,
        column: &str,
        needle: &str,
        kind: PatternKind,
        case_insensitive: bool,
        compiler: &mut Compiler<'_>,
    ) -> String {
        if case_insensitive {
            let pattern = compiler.bind(Value::String(kind.wrap(&escape_like(needle), '%')));
            format!("{column} LIKE {pattern} ESCAPE '\\'")
        } else {
            let pattern = compiler.bind(Value::String(kind.wrap(&escape_glob(needle), '*')));
            format!("{column} GLOB {pattern}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lookups::{LookupBuilder, Operand};

    fn render(op: &str, column: &str, value: impl Into<Operand>) -> String {
        let adapter = SqliteAdapter;
        let lookups = LookupBuilder::new();
        let mut compiler = Compiler::inline(&adapter, &lookups);
        adapter
            .run_lookup(op, column, &value.into(), &mut compiler)
            .unwrap()
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("a*b?c[d"), "a[*]b[?]c[[]d");
        assert_eq!(escape_glob("plain"), "plain");
    }

    #[test]
    fn test_pattern_lookups() {
        assert_eq!(render("contains", "name", "foo"), "\"name\" GLOB '*foo*'");
        assert_eq!(
            render("icontains", "name", "foo"),
            "\"name\" LIKE '%foo%' ESCAPE '\\'"
        );
        assert_eq!(render("startswith", "name", "a*"), "\"name\" GLOB 'a[*]*'");
        assert_eq!(
            render("iendswith", "name", "_x"),
            "\"name\" LIKE '%\\_x' ESCAPE '\\'"
        );
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(
            render("year", "created", 2024),
            "CAST(strftime('%Y', \"created\") AS INTEGER) = 2024"
        );
        assert_eq!(
            render("week_day", "created", 1),
            "CAST(strftime('%w', \"created\") AS INTEGER) + 1 = 1"
        );
    }

    #[test]
    fn test_regex() {
        assert_eq!(render("regex", "name", "^a"), "\"name\" REGEXP '^a'");
        assert_eq!(render("iregex", "name", "^a"), "\"name\" REGEXP '(?i)' || '^a'");
    }

    #[test]
    fn test_quote_value() {
        let a = SqliteAdapter;
        assert_eq!(a.quote_value(&Value::Bool(true)), "1");
        assert_eq!(a.quote_value(&Value::from("a\\b")), "'a\\b'");
        assert_eq!(a.quote_value(&Value::Bytes(vec![0x0f])), "X'0f'");
    }

    #[test]
    fn test_limit_offset() {
        let a = SqliteAdapter;
        assert_eq!(a.limit_offset(None, Some(3)).unwrap(), "LIMIT -1 OFFSET 3");
        assert_eq!(a.limit_offset(Some(2), None).unwrap(), "LIMIT 2");
    }

    #[test]
    fn test_sql_type() {
        assert_eq!(SqliteAdapter.sql_type(ColumnType::Json), "TEXT");
        assert_eq!(SqliteAdapter.cast_type(ColumnType::Integer), "INTEGER");
    }
}
