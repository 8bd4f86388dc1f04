//! Typed attribute values
//!
//! Configuration and observed state are both expressed as maps from
//! attribute name to [`Value`]. Values are checked against the
//! [`AttributeSpec`](crate::schema::AttributeSpec) at the diff boundary,
//! not at arbitrary call sites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute values keyed by attribute name
pub type Attributes = BTreeMap<String, Value>;

/// A configuration or state value
///
/// Serialized untagged, so a JSON or TOML scalar, array, or table maps
/// directly onto the matching variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in validation messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Whether the value spans multiple lines when rendered
    pub fn is_multiline(&self) -> bool {
        matches!(self, Self::String(s) if s.contains('\n'))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Build an [`Attributes`] map from `name => value` pairs
///
/// ```
/// use declarative::attrs;
///
/// let a = attrs! { "name" => "archive", "retention_days" => 7_i64 };
/// assert_eq!(a.len(), 2);
/// ```
#[macro_export]
macro_rules! attrs {
    () => { $crate::value::Attributes::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::value::Attributes::new();
        $( map.insert(($name).to_string(), $crate::value::Value::from($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_roundtrip_picks_variants() {
        let parsed: Attributes =
            serde_json::from_str(r#"{"a": true, "b": 7, "c": "x", "d": [1, 2], "e": {"k": "v"}}"#)
                .unwrap();

        assert_eq!(parsed["a"], Value::Bool(true));
        assert_eq!(parsed["b"], Value::Int(7));
        assert_eq!(parsed["c"], Value::from("x"));
        assert_eq!(parsed["d"], Value::from(vec![1_i64, 2]));
        assert_eq!(parsed["e"].as_map().unwrap()["k"], Value::from("v"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("a").to_string(), "\"a\"");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[\"a\", \"b\"]");
        assert_eq!(Value::Int(3).to_string(), "3");
    }

    #[test]
    fn test_list_equality_is_whole_value() {
        let a = Value::from(vec!["x", "y"]);
        let b = Value::from(vec!["y", "x"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_attrs_macro() {
        let a = attrs! { "name" => "n", "enabled" => true };
        assert_eq!(a["name"].as_str(), Some("n"));
        assert_eq!(a["enabled"].as_bool(), Some(true));
        assert!(attrs! {}.is_empty());
    }
}
