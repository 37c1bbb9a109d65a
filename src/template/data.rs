//! Substitution data.
//!
//! A [`DataTree`] is the schema-less value a slide job supplies for its
//! placeholders: scalars, ordered lists and string-keyed mappings, nested to
//! any depth. It deserializes from any JSON value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Largest magnitude at which every integer is exactly representable in `f64`.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum DataTree {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<DataTree>),
    Map(BTreeMap<String, DataTree>),
}

impl DataTree {
    /// An empty mapping.
    pub fn empty_map() -> Self {
        DataTree::Map(BTreeMap::new())
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, DataTree::List(_) | DataTree::Map(_))
    }

    #[inline]
    pub fn is_map(&self) -> bool {
        matches!(self, DataTree::Map(_))
    }

    /// Value under `key` when this is a mapping.
    pub fn get(&self, key: &str) -> Option<&DataTree> {
        match self {
            DataTree::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Element `index` when this is a list.
    pub fn index(&self, index: usize) -> Option<&DataTree> {
        match self {
            DataTree::List(items) => items.get(index),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            DataTree::Null => "null",
            DataTree::Bool(_) => "bool",
            DataTree::Integer(_) => "integer",
            DataTree::Float(_) => "float",
            DataTree::String(_) => "string",
            DataTree::List(_) => "list",
            DataTree::Map(_) => "mapping",
        }
    }

    /// Display text of a scalar; `None` for lists and mappings.
    ///
    /// Rendering does not depend on the locale. Booleans are `true`/`false`,
    /// null is empty, and numbers carry no superfluous trailing zeros: a float
    /// with an integral value renders like the integer.
    pub fn render(&self) -> Option<String> {
        match self {
            DataTree::Null => Some(String::new()),
            DataTree::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
            DataTree::Integer(i) => Some(itoa::Buffer::new().format(*i).to_string()),
            DataTree::Float(f) => Some(render_float(*f)),
            DataTree::String(s) => Some(s.clone()),
            DataTree::List(_) | DataTree::Map(_) => None,
        }
    }
}

fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT_FLOAT_INT {
        return itoa::Buffer::new().format(value as i64).to_string();
    }
    ryu::Buffer::new().format(value).to_string()
}

impl From<Value> for DataTree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => DataTree::Null,
            Value::Bool(b) => DataTree::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DataTree::Integer(i),
                None => DataTree::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => DataTree::String(s),
            Value::Array(items) => DataTree::List(items.into_iter().map(DataTree::from).collect()),
            Value::Object(map) => DataTree::Map(map.into_iter().map(|(k, v)| (k, DataTree::from(v))).collect()),
        }
    }
}

impl From<DataTree> for Value {
    fn from(tree: DataTree) -> Self {
        match tree {
            DataTree::Null => Value::Null,
            DataTree::Bool(b) => Value::Bool(b),
            DataTree::Integer(i) => Value::Number(i.into()),
            DataTree::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            DataTree::String(s) => Value::String(s),
            DataTree::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            DataTree::Map(map) => Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect::<Map<_, _>>()),
        }
    }
}

impl From<&str> for DataTree {
    fn from(s: &str) -> Self {
        DataTree::String(s.to_string())
    }
}

impl From<String> for DataTree {
    fn from(s: String) -> Self {
        DataTree::String(s)
    }
}

impl From<i64> for DataTree {
    fn from(i: i64) -> Self {
        DataTree::Integer(i)
    }
}

impl From<f64> for DataTree {
    fn from(f: f64) -> Self {
        DataTree::Float(f)
    }
}

impl From<bool> for DataTree {
    fn from(b: bool) -> Self {
        DataTree::Bool(b)
    }
}
