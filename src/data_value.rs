//! Rich per-node payloads
//!
//! [`DataValue`] is the conventional user-data type for trees that want
//! JSON-like structured data attached to each tracked network without
//! defining their own payload type. It round-trips through serde and
//! converts to and from `serde_json::Value` for interchange with external
//! tooling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// JSON-like data value attachable to a tree node
///
/// Untagged serde representation: a value serializes as the plain JSON
/// form (`true`, `2`, `"high"`, `[..]`, `{..}`). Integer-valued JSON
/// numbers deserialize as `Uint64` where they fit, `Double` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// Boolean value
    Bool(bool),
    /// Unsigned 64-bit integer
    Uint64(u64),
    /// IEEE 754 double precision float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    Array(Vec<DataValue>),
    /// String-keyed map
    Map(HashMap<String, DataValue>),
}

impl DataValue {
    /// Empty map, the usual starting point for counter-style payloads
    pub fn empty_map() -> DataValue {
        DataValue::Map(HashMap::new())
    }

    /// Map entry lookup; `None` for non-map values or missing keys
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        match self {
            DataValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Mutable map entry lookup
    pub fn get_mut(&mut self, key: &str) -> Option<&mut DataValue> {
        match self {
            DataValue::Map(map) => map.get_mut(key),
            _ => None,
        }
    }

    /// Insert into a map value; no effect on non-map values
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DataValue>) {
        if let DataValue::Map(map) = self {
            map.insert(key.into(), value.into());
        }
    }

    /// Integer coercion
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DataValue::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    /// Float coercion; integers widen losslessly enough for counters
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Double(v) => Some(*v),
            DataValue::Uint64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String coercion
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean coercion
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert from a `serde_json::Value`
    ///
    /// `None` for JSON nulls (at any nesting level); numbers that are not
    /// u64-representable map through f64.
    pub fn from_json(value: &serde_json::Value) -> Option<DataValue> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(DataValue::Bool(*b)),
            Value::Number(n) => n
                .as_u64()
                .map(DataValue::Uint64)
                .or_else(|| n.as_f64().map(DataValue::Double)),
            Value::String(s) => Some(DataValue::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(DataValue::Array),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Self::from_json(v).map(|v| (k.clone(), v)))
                .collect::<Option<HashMap<_, _>>>()
                .map(DataValue::Map),
        }
    }

    /// Convert into a `serde_json::Value`
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            DataValue::Bool(b) => Value::Bool(*b),
            DataValue::Uint64(v) => Value::from(*v),
            DataValue::Double(v) => Value::from(*v),
            DataValue::String(s) => Value::String(s.clone()),
            DataValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            DataValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<u64> for DataValue {
    fn from(v: u64) -> Self {
        DataValue::Uint64(v)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Double(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::String(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::String(v)
    }
}

impl From<Vec<DataValue>> for DataValue {
    fn from(v: Vec<DataValue>) -> Self {
        DataValue::Array(v)
    }
}

impl From<HashMap<String, DataValue>> for DataValue {
    fn from(v: HashMap<String, DataValue>) -> Self {
        DataValue::Map(v)
    }
}
