//! HTTP method types.

use std::str::FromStr;

use derive_more::Display;

/// HTTP request method supported by the payment API.
///
/// The set is closed: reads go through `GET`, writes through `POST`, and
/// removals through `DELETE`. Anything else is rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// GET method - retrieve or list resources.
    #[display("GET")]
    Get,
    /// POST method - create or update a resource.
    #[display("POST")]
    Post,
    /// DELETE method - remove a resource.
    #[display("DELETE")]
    Delete,
}

impl Method {
    /// All supported methods.
    pub const ALL: [Self; 3] = [Self::Get, Self::Post, Self::Delete];

    /// Returns `true` if parameters travel in the query string.
    #[must_use]
    pub const fn uses_query(&self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Delete => Self::DELETE,
        }
    }
}

impl TryFrom<http::Method> for Method {
    type Error = crate::Error;

    fn try_from(method: http::Method) -> Result<Self, Self::Error> {
        match method {
            http::Method::GET => Ok(Self::Get),
            http::Method::POST => Ok(Self::Post),
            http::Method::DELETE => Ok(Self::Delete),
            other => Err(crate::Error::invalid_call(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}

impl FromStr for Method {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::Error::invalid_call(format!("unsupported HTTP method: {s}")))
    }
}
