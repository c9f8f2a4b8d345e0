//! Response processing.
//!
//! [`process`] turns the transport result into an [`Outcome`]. It never fails:
//! transport errors, API-reported errors and unparsable bodies all become
//! [`Outcome::Failure`], so the same value can be returned to a blocking caller
//! or sent on a completion channel.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use serde_json::{Value, json};

use crate::{Error, Response, Result};

/// Successful API payload.
///
/// Dereferences to the parsed JSON body; the raw response stays available for
/// status and header introspection.
#[derive(Debug, Clone)]
pub struct Payload {
    value: Value,
    response: Response<Bytes>,
}

impl Payload {
    /// Creates a payload from a parsed body and its response.
    #[must_use]
    pub fn new(value: Value, response: Response<Bytes>) -> Self {
        Self { value, response }
    }

    /// Parsed JSON body.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.response.status()
    }

    /// Response header by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.header(name)
    }

    /// The raw response.
    #[must_use]
    pub fn response(&self) -> &Response<Bytes> {
        &self.response
    }

    /// Consume into the parsed JSON body.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Decode the body into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonDeserialization`] with the failing path.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        self.response.json()
    }
}

impl Deref for Payload {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.value
    }
}

/// Error object reported by the API in a response body.
#[derive(Debug, Clone)]
pub struct ApiError {
    error: Value,
    response: Response<Bytes>,
}

impl ApiError {
    /// Creates an API error from the `error` member of a body.
    #[must_use]
    pub fn new(error: Value, response: Response<Bytes>) -> Self {
        Self { error, response }
    }

    /// The `error` member, as sent by the API.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.error
    }

    /// Human readable message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.field("message")
    }

    /// Error type, such as `card_error` or `invalid_request_error`.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.field("type")
    }

    /// Machine readable code, such as `card_declined`.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.field("code")
    }

    /// Parameter the error relates to.
    #[must_use]
    pub fn param(&self) -> Option<&str> {
        self.field("param")
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.response.status()
    }

    /// The raw response.
    #[must_use]
    pub fn response(&self) -> &Response<Bytes> {
        &self.response
    }

    /// The error wrapped as the API sent it: `{"error": ...}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "error": self.error })
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.error.get(name).and_then(Value::as_str)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API error (status {})", self.status())?;
        match self.message() {
            Some(message) => write!(f, ": {message}"),
            None => write!(f, ": {}", self.error),
        }
    }
}

/// Why a call failed.
#[derive(Debug)]
pub enum Failure {
    /// The API answered with an `error` object.
    Api(ApiError),
    /// No usable response: network, TLS, timeout or unparsable body.
    Transport(Error),
}

impl Failure {
    /// HTTP status code, when a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(error) => Some(error.status()),
            Self::Transport(error) => error.status(),
        }
    }

    /// Returns `true` for API-reported errors.
    #[must_use]
    pub const fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }

    /// Render the failure as a JSON error envelope.
    ///
    /// API errors render exactly as received. Transport errors render as
    /// `{"error": {"type": "transport_error", "message": ...}}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Api(error) => error.to_value(),
            Self::Transport(error) => json!({
                "error": {
                    "type": "transport_error",
                    "message": error.to_string(),
                }
            }),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(error) => fmt::Display::fmt(error, f),
            Self::Transport(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl From<Failure> for Error {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Api(error) => error.into(),
            Failure::Transport(error) => error,
        }
    }
}

/// Normalized result of a call.
#[derive(Debug)]
pub enum Outcome {
    /// The API returned a payload.
    Success(Payload),
    /// The call failed.
    Failure(Failure),
}

impl Outcome {
    /// Returns `true` on success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` on failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The payload, on success.
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }

    /// The failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// HTTP status code, when a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success(payload) => Some(payload.status()),
            Self::Failure(failure) => failure.status(),
        }
    }

    /// JSON rendering: the payload body, or the failure's error envelope.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success(payload) => payload.value().clone(),
            Self::Failure(failure) => failure.to_value(),
        }
    }

    /// Convert into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the failure converted into an [`Error`].
    pub fn into_result(self) -> Result<Payload> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Failure(failure) => Err(failure.into()),
        }
    }
}

/// Process a transport result into an [`Outcome`].
///
/// A body carrying a non-null top-level `error` member is an API failure
/// whatever the status code; any other JSON body is a success.
#[must_use]
pub fn process(result: Result<Response<Bytes>>) -> Outcome {
    let response = match result {
        Ok(response) => response,
        Err(error) => return Outcome::Failure(Failure::Transport(error)),
    };

    let mut value = match serde_json::from_slice::<Value>(response.body()) {
        Ok(value) => value,
        Err(error) => {
            let error =
                Error::malformed_body(response.status(), error.to_string(), response.body().clone());
            return Outcome::Failure(Failure::Transport(error));
        }
    };

    match value
        .get_mut("error")
        .filter(|error| !error.is_null())
        .map(Value::take)
    {
        Some(error) => Outcome::Failure(Failure::Api(ApiError::new(error, response))),
        None => Outcome::Success(Payload::new(value, response)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert2::{check, let_assert};

    use super::*;

    fn response(status: u16, body: &'static str) -> Response<Bytes> {
        let mut headers = HashMap::new();
        headers.insert("Request-Id".to_string(), "req_42".to_string());
        Response::new(status, headers, Bytes::from(body))
    }

    #[test]
    fn json_body_is_success() {
        let outcome = process(Ok(response(200, r#"{"id":"cus_123"}"#)));

        let_assert!(Outcome::Success(payload) = &outcome);
        check!(payload["id"] == "cus_123");
        check!(payload.status() == 200);
        check!(payload.header("request-id") == Some("req_42"));
        check!(outcome.to_value() == json!({ "id": "cus_123" }));
    }

    #[test]
    fn error_member_is_api_failure() {
        let outcome = process(Ok(response(400, r#"{"error":{"message":"bad request"}}"#)));

        let_assert!(Outcome::Failure(Failure::Api(error)) = &outcome);
        check!(error.message() == Some("bad request"));
        check!(error.status() == 400);
        check!(outcome.status() == Some(400));
        check!(outcome.to_value() == json!({ "error": { "message": "bad request" } }));
    }

    #[test]
    fn error_member_wins_over_success_status() {
        let outcome = process(Ok(response(
            200,
            r#"{"error":{"type":"card_error","code":"card_declined","param":"source"}}"#,
        )));

        let_assert!(Outcome::Failure(Failure::Api(error)) = outcome);
        check!(error.kind() == Some("card_error"));
        check!(error.code() == Some("card_declined"));
        check!(error.param() == Some("source"));
        check!(error.message().is_none());
    }

    #[test]
    fn null_error_member_is_success() {
        let outcome = process(Ok(response(200, r#"{"id":"ch_1","error":null}"#)));
        check!(outcome.is_success());
    }

    #[test]
    fn error_status_without_error_member_is_success() {
        let outcome = process(Ok(response(404, r#"{"deleted":true}"#)));
        let_assert!(Outcome::Success(payload) = outcome);
        check!(payload.status() == 404);
        check!(payload["deleted"] == true);
    }

    #[test]
    fn unparsable_body_is_transport_failure() {
        for body in ["", "<html>Bad Gateway</html>"] {
            let outcome = process(Ok(response(502, body)));
            let_assert!(
                Outcome::Failure(Failure::Transport(Error::MalformedBody { status, body: raw, .. })) =
                    outcome
            );
            check!(status == 502);
            check!(raw == body.as_bytes());
        }
    }

    #[test]
    fn transport_error_is_forwarded() {
        let outcome = process(Err(Error::Timeout));

        let_assert!(Outcome::Failure(failure) = &outcome);
        check!(!failure.is_api());
        check!(failure.status().is_none());
        insta::assert_snapshot!(
            outcome.to_value().to_string(),
            @r#"{"error":{"message":"request timeout","type":"transport_error"}}"#
        );
    }

    #[test]
    fn failures_convert_into_errors() {
        let api = process(Ok(response(402, r#"{"error":{"message":"declined"}}"#)));
        let_assert!(Err(Error::Api(error)) = api.into_result());
        check!(error.to_string() == "API error (status 402): declined");

        let transport = process(Err(Error::connection("refused")));
        let_assert!(Err(Error::Connection(message)) = transport.into_result());
        check!(message == "refused");
    }

    #[test]
    fn payload_decodes_typed() {
        #[derive(Debug, serde::Deserialize)]
        struct Customer {
            id: String,
        }

        let outcome = process(Ok(response(200, r#"{"id":"cus_9","object":"customer"}"#)));
        let payload = outcome.into_result().expect("success");
        let customer: Customer = payload.json().expect("typed");
        check!(customer.id == "cus_9");
    }
}
