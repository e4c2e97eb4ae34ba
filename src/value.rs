//! Cell values and rows.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use std::fmt;

/// One row: column name to value, in insertion (header) order.
///
/// A missing key means SQL NULL. CSV has no null token, so this is the only
/// way the text side can say it.
pub type Row = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Text form, as written to CSV. Booleans use `True`/`False` so that the
/// type coercer reads them back unchanged.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Real(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
            Self::Boolean(true) => f.write_str("True"),
            Self::Boolean(false) => f.write_str("False"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Build a [`Row`] from `name => value` pairs.
#[macro_export]
macro_rules! row {
    () => { $crate::value::Row::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::value::Row::new();
        $( row.insert(::std::string::String::from($name), $crate::value::Value::from($value)); )+
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_through_text() {
        assert_eq!(Value::Boolean(true).to_string(), "True");
        assert_eq!(Value::Boolean(false).to_string(), "False");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Null.to_string(), "");

        let d = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        assert_eq!(Value::Date(d).to_string(), "2020-02-29");
        let dt = d.and_hms_opt(13, 5, 0).unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2020-02-29 13:05:00");
    }

    #[test]
    fn test_row_macro_keeps_order() {
        let r = row! { "b" => 1i64, "a" => "x" };
        let keys: Vec<&str> = r.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(r["a"], Value::Text("x".to_string()));
    }
}
