//! Parameter encoding and JSON decoding.
//!
//! Parameters are placed according to the HTTP method:
//!
//! | Method | Placement | Encoding |
//! |--------|-----------|----------|
//! | `GET`, `DELETE` | query string | flattened pairs, encoded by the URL layer |
//! | `POST` | request body | `application/x-www-form-urlencoded` |
//!
//! Nested maps and lists are flattened with bracket notation:
//! `metadata[order_id]=6735`, `items[0][price]=price_1`.

use bytes::Bytes;
use url::form_urlencoded;

use crate::{Method, Params, Result, Value};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters encoded for a given method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    /// Flattened pairs for the query string, not yet percent-encoded.
    Query(Vec<(String, String)>),
    /// Form URL-encoded request body.
    Body(Bytes),
}

/// Encode parameters for the given method.
///
/// # Example
///
/// ```
/// use paywire_core::{Encoded, Method, Params, encode};
///
/// let params = Params::new().with("limit", 3);
///
/// assert_eq!(
///     encode(Method::Get, &params),
///     Encoded::Query(vec![("limit".to_string(), "3".to_string())])
/// );
/// assert_eq!(
///     encode(Method::Post, &params),
///     Encoded::Body("limit=3".into())
/// );
/// ```
#[must_use]
pub fn encode(method: Method, params: &Params) -> Encoded {
    if method.uses_query() {
        Encoded::Query(flatten(params))
    } else {
        Encoded::Body(to_form(params))
    }
}

/// Flatten parameters into key/value pairs using bracket notation.
///
/// Empty maps and lists contribute no pairs.
#[must_use]
pub fn flatten(params: &Params) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params {
        flatten_into(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Map(map) => {
            for (key, child) in map {
                flatten_into(format!("{prefix}[{key}]"), child, pairs);
            }
        }
        Value::List(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(format!("{prefix}[{index}]"), child, pairs);
            }
        }
        scalar => pairs.push((prefix, scalar.to_string())),
    }
}

/// Serialize parameters to a form URL-encoded body.
///
/// # Example
///
/// ```
/// use paywire_core::{Params, to_form};
///
/// let params = Params::new()
///     .with("description", "Coffee & cake")
///     .with("metadata", Params::new().with("order", 7));
///
/// let body = to_form(&params);
/// assert_eq!(body.as_ref(), b"description=Coffee+%26+cake&metadata%5Border%5D=7");
/// ```
#[must_use]
pub fn to_form(params: &Params) -> Bytes {
    let body = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(flatten(params))
        .finish();
    Bytes::from(body.into_bytes())
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// Uses `serde_path_to_error` so that the error message includes the exact
/// path to the field that failed to deserialize.
///
/// # Example
///
/// ```
/// use paywire_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct Customer { id: String }
///
/// let customer: Customer = from_json(br#"{"id":"cus_123"}"#).expect("deserialize");
/// assert_eq!(customer, Customer { id: "cus_123".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
