//! Call descriptions.
//!
//! A [`Call`] names the method and endpoint of an API call. Everything else is
//! optional and lives in [`CallOptions`]. The presence of a [`Completion`]
//! selects asynchronous dispatch.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use paywire_core::{Call, CallOptions, Params};
//!
//! let call = Call::post("charges").options(
//!     CallOptions::new()
//!         .params(Params::new().with("amount", 2000).with("currency", "usd"))
//!         .account("acct_1032D82eZvKYlo2C")
//!         .idempotency_key("order-6735")
//!         .timeout(Duration::from_secs(20)),
//! );
//!
//! assert!(call.validate().is_ok());
//! assert!(!call.is_async());
//! ```

use std::collections::HashMap;
use std::time::Duration;

use http::{HeaderName, HeaderValue};

use crate::{Completion, Error, Method, Params, Result, Value};

/// Transport options supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Extra headers; they win over generated headers of the same name.
    pub headers: HashMap<String, String>,
    /// Per-call timeout, overriding the transport default.
    pub timeout: Option<Duration>,
    /// Sent as the `Idempotency-Key` header.
    pub idempotency_key: Option<String>,
}

impl ClientOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the idempotency key.
    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Optional parts of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    /// Request parameters.
    pub params: Params,
    /// API token, overriding the context.
    pub token: Option<String>,
    /// Connected account, overriding the context.
    pub account: Option<String>,
    /// API version, overriding the context.
    pub api_version: Option<String>,
    /// Transport options.
    pub client_options: ClientOptions,
    /// Turn failures into errors instead of failed outcomes.
    pub throw_on_error: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            params: Params::new(),
            token: None,
            account: None,
            api_version: None,
            client_options: ClientOptions::default(),
            throw_on_error: true,
        }
    }
}

impl CallOptions {
    /// Creates default options: no parameters, errors are thrown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the parameters.
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Add a single parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Set the API token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the connected account.
    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Replace the transport options.
    #[must_use]
    pub fn client_options(mut self, client_options: ClientOptions) -> Self {
        self.client_options = client_options;
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.client_options = self.client_options.header(name, value);
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.client_options.timeout = Some(timeout);
        self
    }

    /// Set the idempotency key.
    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.client_options = self.client_options.idempotency_key(key);
        self
    }

    /// Choose between `Err` (the default) and a failed [`crate::Outcome`].
    #[must_use]
    pub const fn throw_on_error(mut self, throw_on_error: bool) -> Self {
        self.throw_on_error = throw_on_error;
        self
    }
}

/// Description of a single API call.
#[derive(Debug)]
pub struct Call {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base URL, such as `customers/cus_123`.
    pub endpoint: String,
    /// Optional parts.
    pub options: CallOptions,
    /// Completion channel; its presence makes the call asynchronous.
    pub completion: Option<Completion>,
}

impl Call {
    /// Creates a call with default options.
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            options: CallOptions::default(),
            completion: None,
        }
    }

    /// Creates a `GET` call.
    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    /// Creates a `POST` call.
    #[must_use]
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    /// Creates a `DELETE` call.
    #[must_use]
    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    /// Replace the options.
    #[must_use]
    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a completion channel.
    #[must_use]
    pub fn completion(mut self, completion: Completion) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Returns `true` if a completion channel is attached.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        self.completion.is_some()
    }

    /// Check that the call is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCall`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        validate_endpoint(&self.endpoint)?;

        let options = &self.options;
        if options.account.as_deref() == Some("") {
            return Err(Error::invalid_call("account is empty"));
        }
        if options.api_version.as_deref() == Some("") {
            return Err(Error::invalid_call("API version is empty"));
        }

        for (key, value) in &options.params {
            validate_param(key, value)?;
        }

        let client = &options.client_options;
        for (name, value) in &client.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::invalid_call(format!("invalid header name: {name:?}")))?;
            HeaderValue::from_str(value).map_err(|_| {
                Error::invalid_call(format!("invalid value for header {name}"))
            })?;
        }
        if client.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::invalid_call("timeout must be greater than zero"));
        }
        if let Some(key) = &client.idempotency_key
            && (key.is_empty() || HeaderValue::from_str(key).is_err())
        {
            return Err(Error::invalid_call("invalid idempotency key"));
        }

        Ok(())
    }
}

/// Endpoints are paths beneath the base URL and can never leave it.
pub(crate) fn validate_endpoint(endpoint: &str) -> Result<()> {
    let path = endpoint.trim_start_matches('/');
    if path.is_empty() {
        return Err(Error::invalid_call("endpoint is empty"));
    }
    // A colon in the first segment reads as a scheme
    let first = path.split('/').next().unwrap_or_default();
    if endpoint.starts_with("//") || endpoint.contains("://") || first.contains(':') {
        return Err(Error::invalid_call(format!(
            "endpoint must be relative to the base URL: {endpoint}"
        )));
    }
    if path.split('/').any(|segment| matches!(segment, "." | "..")) {
        return Err(Error::invalid_call(format!(
            "endpoint contains a dot segment: {endpoint:?}"
        )));
    }
    if let Some(c) = endpoint
        .chars()
        .find(|c| matches!(c, '?' | '#') || c.is_whitespace() || c.is_control())
    {
        return Err(Error::invalid_call(format!(
            "endpoint contains {c:?}: {endpoint:?}"
        )));
    }
    Ok(())
}

fn validate_param(key: &str, value: &Value) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_call("parameter key is empty"));
    }
    match value {
        Value::Float(x) if !x.is_finite() => Err(Error::invalid_call(format!(
            "parameter {key} is not a finite number"
        ))),
        Value::Map(map) => map
            .iter()
            .try_for_each(|(child, value)| validate_param(child, value)),
        Value::List(items) => items.iter().try_for_each(|value| validate_param(key, value)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn invalid(call: &Call) -> String {
        let_assert!(Err(Error::InvalidCall(message)) = call.validate());
        message
    }

    #[test]
    fn default_options_throw() {
        let options = CallOptions::default();
        check!(options.throw_on_error);
        check!(options.params.is_empty());
        check!(options.client_options == ClientOptions::default());
    }

    #[test]
    fn verb_constructors() {
        check!(Call::get("customers").method == Method::Get);
        check!(Call::post("customers").method == Method::Post);
        check!(Call::delete("customers/cus_1").method == Method::Delete);
    }

    #[test]
    fn completion_makes_call_async() {
        let (completion, _receiver) = crate::completion();
        let call = Call::get("balance").completion(completion);
        check!(call.is_async());
        check!(call.validate().is_ok());
    }

    #[test]
    fn well_formed_call_is_accepted() {
        let call = Call::post("/customers/cus_123").options(
            CallOptions::new()
                .param("email", "jenny@example.com")
                .param("metadata", Params::new().with("order", 6735))
                .param("amounts", vec![1.5, 2.0])
                .header("Stripe-Context", "ctx_1")
                .timeout(Duration::from_millis(500))
                .idempotency_key("key-1")
                .throw_on_error(false),
        );
        check!(call.validate().is_ok());
    }

    #[test]
    fn endpoint_rules() {
        check!(invalid(&Call::get("")) == "endpoint is empty");
        check!(invalid(&Call::get("/")) == "endpoint is empty");
        check!(invalid(&Call::get("https://evil.example.com/v1")).starts_with("endpoint must be relative"));
        check!(invalid(&Call::get("//evil.example.com")).starts_with("endpoint must be relative"));
        check!(invalid(&Call::get("customers?limit=3")) == r#"endpoint contains '?': "customers?limit=3""#);
        check!(invalid(&Call::get("customers#x")).contains("'#'"));
        check!(invalid(&Call::get("customers/cus 1")).contains("' '"));
        check!(invalid(&Call::get("customers\n")).contains("'\\n'"));
    }

    #[test]
    fn endpoint_cannot_leave_the_base_url() {
        check!(invalid(&Call::get("http:evil.example.com/steal")).starts_with("endpoint must be relative"));
        check!(invalid(&Call::get("x:y")).starts_with("endpoint must be relative"));
        check!(invalid(&Call::get("/mailto:someone")).starts_with("endpoint must be relative"));
        check!(invalid(&Call::get("customers/../../evil")) == r#"endpoint contains a dot segment: "customers/../../evil""#);
        check!(invalid(&Call::get("./customers")).contains("dot segment"));

        // Colons and dots further down are plain characters
        check!(Call::get("customers/cus_1/sources/card:visa").validate().is_ok());
        check!(Call::get("files/report.v2.csv").validate().is_ok());
    }

    #[test]
    fn empty_explicit_overrides_are_rejected() {
        let call = Call::get("balance").options(CallOptions::new().account(""));
        check!(invalid(&call) == "account is empty");

        let call = Call::get("balance").options(CallOptions::new().api_version(""));
        check!(invalid(&call) == "API version is empty");
    }

    #[test]
    fn header_rules() {
        let call = Call::get("balance").options(CallOptions::new().header("Bad Header", "x"));
        check!(invalid(&call) == r#"invalid header name: "Bad Header""#);

        let call = Call::get("balance").options(CallOptions::new().header("X-Note", "a\r\nb"));
        check!(invalid(&call) == "invalid value for header X-Note");

        let call = Call::get("balance").options(CallOptions::new().idempotency_key(""));
        check!(invalid(&call) == "invalid idempotency key");
    }

    #[test]
    fn param_rules() {
        let call = Call::post("charges").options(CallOptions::new().param("", 1));
        check!(invalid(&call) == "parameter key is empty");

        let nested = Params::new().with("", "x");
        let call = Call::post("charges").options(CallOptions::new().param("metadata", nested));
        check!(invalid(&call) == "parameter key is empty");

        let call = Call::post("charges").options(CallOptions::new().param("amount", f64::NAN));
        check!(invalid(&call) == "parameter amount is not a finite number");

        let call = Call::post("charges")
            .options(CallOptions::new().param("rates", vec![1.0, f64::INFINITY]));
        check!(invalid(&call) == "parameter rates is not a finite number");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let call = Call::get("balance").options(CallOptions::new().timeout(Duration::ZERO));
        check!(invalid(&call) == "timeout must be greater than zero");
    }
}
