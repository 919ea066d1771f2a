/// Parameter and Column Values
///
/// Tagged scalar values exchanged with the database, and the positional
/// type-code inference used when binding them.
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};
use std::fmt;

/// A scalar value bound to a placeholder or read from a result column.
///
/// TEXT columns holding bytes that are not valid UTF-8 are read as `Blob`,
/// so column data is never altered on the way out.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Binding marker for a single positional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Integer,
    Double,
    String,
    Blob,
    /// SQL NULL. Never folded into `Blob`.
    Null,
}

impl ParamType {
    /// Single-character code used in a type-code string.
    pub fn code(self) -> char {
        match self {
            ParamType::Integer => 'i',
            ParamType::Double => 'd',
            ParamType::String => 's',
            ParamType::Blob => 'b',
            ParamType::Null => 'n',
        }
    }
}

impl Value {
    /// Classifies the value into its binding marker.
    pub fn param_type(&self) -> ParamType {
        match self {
            Value::Null => ParamType::Null,
            Value::Integer(_) => ParamType::Integer,
            Value::Real(_) => ParamType::Double,
            Value::Text(_) => ParamType::String,
            Value::Blob(_) => ParamType::Blob,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

/// Builds the type-code string for a parameter list.
///
/// The result has exactly one marker per parameter, in positional order:
/// `i` integer, `d` double, `s` string, `b` blob, `n` NULL.
///
/// ```
/// use dbfacade::{params, type_codes};
///
/// assert_eq!(type_codes(&params![42, "alice"]), "is");
/// ```
pub fn type_codes(params: &[Value]) -> String {
    params.iter().map(|p| p.param_type().code()).collect()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<BLOB {} bytes>", b.len()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value_ref = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(r) => ValueRef::Real(*r),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value_ref))
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value_ref: ValueRef<'_>) -> Self {
        match value_ref {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => Value::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(r) => serializer.serialize_f64(*r),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_bytes(b),
        }
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Integer(i64::from(v))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32, bool);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Builds a `Vec<Value>` from heterogeneous expressions.
///
/// ```
/// use dbfacade::{params, Value};
///
/// let p = params![1, 2.5, "x", None::<i64>];
/// assert_eq!(p[3], Value::Null);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($param:expr),+ $(,)?) => {
        vec![$($crate::Value::from($param)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes_basic() {
        assert_eq!(type_codes(&crate::params![42, "alice"]), "is");
        assert_eq!(type_codes(&crate::params![1.5, vec![0u8, 1], 7i32]), "dbi");
        assert_eq!(type_codes(&[]), "");
    }

    #[test]
    fn test_null_has_its_own_marker() {
        let p = crate::params![None::<String>, Some("x")];
        assert_eq!(p[0], Value::Null);
        assert_eq!(p[1], Value::Text("x".to_string()));
        assert_eq!(type_codes(&p), "ns");
    }

    #[test]
    fn test_bool_binds_as_integer() {
        assert_eq!(Value::from(true), Value::Integer(1));
        assert_eq!(Value::from(false).param_type(), ParamType::Integer);
    }

    #[test]
    fn test_from_value_ref() {
        assert_eq!(Value::from(ValueRef::Text(b"hi")), Value::Text("hi".to_string()));
        assert_eq!(Value::from(ValueRef::Blob(&[1, 2])), Value::Blob(vec![1, 2]));
        assert_eq!(Value::from(ValueRef::Null), Value::Null);
    }

    #[test]
    fn test_invalid_utf8_text_reads_as_blob() {
        assert_eq!(
            Value::from(ValueRef::Text(&[b'a', 0xff, 0xfe])),
            Value::Blob(vec![b'a', 0xff, 0xfe])
        );
    }

    #[test]
    fn test_serialize_to_json() {
        let json = serde_json::to_string(&crate::params![1, 2.5, "a", None::<i64>]).unwrap();
        assert_eq!(json, r#"[1,2.5,"a",null]"#);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Blob(vec![0; 4]).to_string(), "<BLOB 4 bytes>");
    }
}
