//! HTTP request building.
//!
//! Use [`Request::builder`] to construct requests with headers, query parameters, and bodies.
//!
//! # Example
//!
//! ```
//! use paywire_core::{Request, Method};
//! use bytes::Bytes;
//!
//! let request = Request::<Bytes>::builder(Method::Get, "https://api.example.com".parse().unwrap())
//!     .basic_auth("sk_test_123", "")
//!     .query("limit", "3")
//!     .build();
//! ```

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;

use crate::Method;

/// An HTTP request with method, URL, headers, optional body and transport overrides.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    timeout: Option<Duration>,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Single header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Per-request timeout requested by the caller.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HashMap<String, String>, Option<B>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    timeout: Option<Duration>,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Sets a header, replacing any existing header with the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        remove_header(&mut self.headers, &name);
        self.headers.insert(name, value.into());
        self
    }

    /// Merges headers over the ones already set.
    ///
    /// Names are compared ignoring ASCII case; merged headers win on collision.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    /// Sets `Authorization: Basic <base64(username:password)>`.
    #[must_use]
    pub fn basic_auth(self, username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.header(http::header::AUTHORIZATION.as_str(), format!("Basic {encoded}"))
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Appends multiple query parameters to the URL.
    ///
    /// An empty iterator leaves the URL without a `?`.
    #[must_use]
    pub fn query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_some() {
            let mut query = self.url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(&name, &value);
            }
        }
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request<B> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
        }
    }
}

pub(crate) fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn remove_header(headers: &mut HashMap<String, String>, name: &str) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> url::Url {
        url::Url::parse(s).expect("valid URL")
    }

    #[test]
    fn request_builder_basic() {
        let request = Request::<Bytes>::builder(Method::Get, url("https://api.example.com/v1/customers"))
            .header("Accept", "application/json")
            .build();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.url().as_str(), "https://api.example.com/v1/customers");
        assert_eq!(request.header("accept"), Some("application/json"));
        assert!(request.body().is_none());
        assert!(request.timeout().is_none());
    }

    #[test]
    fn request_builder_with_query() {
        let request = Request::<Bytes>::builder(Method::Get, url("https://api.example.com/v1/customers"))
            .query("limit", "3")
            .query_pairs([("email".to_string(), "a b@example.com".to_string())])
            .build();

        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/v1/customers?limit=3&email=a+b%40example.com"
        );
    }

    #[test]
    fn empty_query_pairs_leave_url_untouched() {
        let request = Request::<Bytes>::builder(Method::Delete, url("https://api.example.com/v1/customers/cus_1"))
            .query_pairs(Vec::new())
            .build();

        assert_eq!(request.url().as_str(), "https://api.example.com/v1/customers/cus_1");
    }

    #[test]
    fn request_builder_with_body() {
        let body = Bytes::from("amount=2000");
        let request = Request::builder(Method::Post, url("https://api.example.com/v1/charges"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body.clone())
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.body(), Some(&body));
        assert_eq!(request.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn basic_auth_uses_empty_password() {
        // "sk_test_123:" -> "c2tfdGVzdF8xMjM6"
        let request = Request::<Bytes>::builder(Method::Get, url("https://api.example.com"))
            .basic_auth("sk_test_123", "")
            .build();

        assert_eq!(request.header("Authorization"), Some("Basic c2tfdGVzdF8xMjM6"));
    }

    #[test]
    fn merged_headers_win_ignoring_case() {
        let request = Request::<Bytes>::builder(Method::Get, url("https://api.example.com"))
            .header("Accept", "application/json")
            .header("API-Version", "2024-06-20")
            .headers([
                ("accept".to_string(), "text/plain".to_string()),
                ("X-Trace".to_string(), "abc".to_string()),
            ])
            .build();

        assert_eq!(request.headers().len(), 3);
        assert_eq!(request.header("Accept"), Some("text/plain"));
        assert_eq!(request.header("api-version"), Some("2024-06-20"));
        assert_eq!(request.header("x-trace"), Some("abc"));
    }
}
