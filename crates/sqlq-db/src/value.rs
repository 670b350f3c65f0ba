//! Literal values that flow through the query layer.
//!
//! A [`Value`] is a lookup operand, an INSERT/UPDATE cell, a bound
//! parameter, or a result column. Adapters render it as a dialect literal
//! with [`Adapter::quote_value`](crate::adapters::Adapter::quote_value).

use std::fmt;

/// A single SQL literal, independent of any dialect.
///
/// ```
/// use sqlq_db::value::Value;
///
/// assert_eq!(Value::from(42_i64), Value::Int(42));
/// assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
/// assert_eq!(Value::from(None::<i64>), Value::Null);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Rendered as a hex blob literal.
    Bytes(Vec<u8>),
    Date(chrono::NaiveDate),
    /// Naive timestamp, rendered as `YYYY-MM-DD HH:MM:SS`.
    DateTime(chrono::NaiveDateTime),
    /// UTC timestamp, rendered in RFC 3339 form.
    DateTimeTz(chrono::DateTime<chrono::Utc>),
    Time(chrono::NaiveTime),
    Uuid(uuid::Uuid),
    /// Rendered as its serialized text.
    Json(serde_json::Value),
    /// Operand of `in` and `range`; never bound as a single parameter.
    List(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::DateTimeTz(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Time(t) => write!(f, "{t}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Json(j) => write!(f, "{j}"),
            Self::List(vals) => {
                write!(f, "[")?;
                for (i, v) in vals.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

// ── Conversions ────────────────────────────────────────────────────────

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

value_from! {
    bool => |v| Self::Bool(v),
    i32 => |v| Self::Int(i64::from(v)),
    u32 => |v| Self::Int(i64::from(v)),
    i64 => |v| Self::Int(v),
    f64 => |v| Self::Float(v),
    String => |v| Self::String(v),
    &str => |v| Self::String(v.to_owned()),
    Vec<u8> => |v| Self::Bytes(v),
    chrono::NaiveDate => |v| Self::Date(v),
    chrono::NaiveDateTime => |v| Self::DateTime(v),
    chrono::DateTime<chrono::Utc> => |v| Self::DateTimeTz(v),
    chrono::NaiveTime => |v| Self::Time(v),
    uuid::Uuid => |v| Self::Uuid(v),
    serde_json::Value => |v| Self::Json(v),
    Vec<Value> => |v| Self::List(v),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

impl Value {
    /// Builds a [`Value::List`] from any iterator of convertible items.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Converts a JSON scalar into a value. Arrays become lists, objects
    /// stay JSON. Integers outside the `i64` range keep their exact text.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.is_f64()) {
                (Some(i), _) => Self::Int(i),
                (None, true) => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
                (None, false) => Self::String(n.to_string()),
            },
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(_) => Self::Json(json.clone()),
        }
    }

    /// Whether this is SQL NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for numeric values, which adapters render unquoted.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// The boolean payload, if any.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer payload, if any.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42_i32), Value::Int(42));
        assert_eq!(Value::from(7_u32), Value::Int(7));
        assert_eq!(Value::from(1.5_f64), Value::Float(1.5));
        assert_eq!(Value::from("hi"), Value::String("hi".into()));
    }

    #[test]
    fn test_optional_values_map_to_null() {
        assert_eq!(Value::from(Some(String::from("a"))), Value::String("a".into()));
        assert_eq!(Value::from(None::<f64>), Value::Null);
    }

    #[test]
    fn test_list_helper() {
        assert_eq!(
            Value::list([1, 2, 3]),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_json_arrays_become_lists() {
        let json = serde_json::json!([1, "a", null, 2.5, true]);
        assert_eq!(
            Value::from_json(&json),
            Value::List(vec![
                Value::Int(1),
                Value::String("a".into()),
                Value::Null,
                Value::Float(2.5),
                Value::Bool(true),
            ])
        );
        let obj = serde_json::json!({"k": 1});
        assert_eq!(Value::from_json(&obj), Value::Json(obj.clone()));
    }

    #[test]
    fn test_json_integers_beyond_i64_keep_their_text() {
        assert_eq!(
            Value::from_json(&serde_json::json!(u64::MAX)),
            Value::String("18446744073709551615".into())
        );
        assert_eq!(Value::from_json(&serde_json::json!(i64::MIN)), Value::Int(i64::MIN));
        assert_eq!(Value::from_json(&serde_json::json!(0.25)), Value::Float(0.25));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Bytes(vec![0; 16]).to_string(), "<16 bytes>");
        assert_eq!(Value::list([1, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn test_is_numeric() {
        assert!(Value::Int(1).is_numeric());
        assert!(Value::Float(1.0).is_numeric());
        assert!(!Value::String("1".into()).is_numeric());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(3).as_int(), Some(3));
        assert_eq!(Value::String("x".into()).as_str(), Some("x"));
        assert!(Value::Null.is_null());
    }
}
