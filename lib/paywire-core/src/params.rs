//! Call parameter values.
//!
//! Parameters are a closed set of serializable kinds. Nested maps and lists are
//! flattened by the codec using bracket notation.

use std::collections::BTreeMap;
use std::fmt;

use crate::{Error, Result};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text value.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Nested mapping, flattened as `key[child]`.
    Map(BTreeMap<String, Value>),
    /// Sequence, flattened as `key[index]`.
    List(Vec<Value>),
}

impl Value {
    /// Returns `true` for strings, numbers and booleans.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Map(_) | Self::List(_))
    }
}

/// Scalars render as their form value; nested shapes render as JSON-like text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::List(items) => {
                f.write_str("[")?;
                for (i, value) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! value_from {
    ($variant:ident: $($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )+
    };
}

value_from!(String: String, &str, &String);
value_from!(Integer: i64, i32, i16, i8, u32, u16, u8);
value_from!(Float: f64, f32);
value_from!(Bool: bool);
value_from!(Map: BTreeMap<String, Value>);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Params> for Value {
    fn from(params: Params) -> Self {
        Self::Map(params.0)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Err(Error::invalid_call("null is not a parameter value")),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| Error::invalid_call(format!("unsupported number: {n}"))),
            serde_json::Value::String(s) => Ok(Self::String(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<Result<Vec<_>>>()
                .map(Self::List),
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| Self::try_from(value).map(|value| (key, value)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Self::Map),
        }
    }
}

/// Key/value parameters of a call, ordered by key.
///
/// # Example
///
/// ```
/// use paywire_core::Params;
///
/// let params = Params::new()
///     .with("amount", 2000)
///     .with("currency", "usd")
///     .with("metadata", Params::new().with("order_id", "6735"));
///
/// assert_eq!(params.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    /// Creates empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value for the key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a parameter, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of top-level parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over top-level parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl TryFrom<serde_json::Value> for Params {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match Value::try_from(value)? {
            Value::Map(map) => Ok(Self(map)),
            other => Err(Error::invalid_call(format!(
                "parameters must be an object, got {other}"
            ))),
        }
    }
}
