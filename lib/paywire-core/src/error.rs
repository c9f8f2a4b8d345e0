//! Error types for paywire.

use derive_more::{Display, Error, From};

use crate::ApiError;

/// Main error type for paywire operations.
///
/// Precondition failures ([`Error::MissingToken`], [`Error::InvalidCall`]) are
/// raised before any I/O. [`Error::Api`] carries an error reported by the API
/// itself; the remaining variants describe transport-level failures.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// No API token could be resolved for the call.
    #[display("no API token configured: set one process-wide, in a scope, or on the call")]
    #[from(skip)]
    MissingToken,

    /// The call description is malformed.
    #[display("invalid call: {_0}")]
    #[from(skip)]
    InvalidCall(#[error(not(source))] String),

    /// The API answered with an `error` object.
    #[display("{_0}")]
    #[from(skip)]
    Api(#[error(not(source))] Box<ApiError>),

    /// The response body could not be parsed as JSON.
    #[display("malformed response body (status {status}): {message}")]
    #[from(skip)]
    MalformedBody {
        /// HTTP status code.
        status: u16,
        /// Parser error message.
        message: String,
        /// Raw response body.
        #[error(not(source))]
        body: bytes::Bytes,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The prepared request could not be handed to the transport.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "customer.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// A synchronous call was made where the thread cannot block, such as a
    /// task of a current-thread runtime.
    #[display("synchronous call cannot block this thread: {_0}")]
    #[from(skip)]
    BlockingNotAllowed(#[error(not(source))] String),

    /// The dispatched transport task ended without a reply.
    #[display("dispatch failed: {_0}")]
    #[from(skip)]
    Dispatch(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// The dispatch runtime could not be started.
    #[display("runtime error: {_0}")]
    #[from]
    Runtime(std::io::Error),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl From<ApiError> for Error {
    fn from(error: ApiError) -> Self {
        Self::Api(Box::new(error))
    }
}

impl Error {
    /// Create an invalid call error.
    #[must_use]
    pub fn invalid_call(message: impl Into<String>) -> Self {
        Self::InvalidCall(message.into())
    }

    /// Create a malformed body error.
    #[must_use]
    pub fn malformed_body(status: u16, message: impl Into<String>, body: bytes::Bytes) -> Self {
        Self::MalformedBody {
            status,
            message: message.into(),
            body,
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a dispatch error.
    #[must_use]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if no token could be resolved.
    #[must_use]
    pub const fn is_missing_token(&self) -> bool {
        matches!(self, Self::MissingToken)
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// The API-reported error, if any.
    #[must_use]
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the HTTP status code, when a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(error) => Some(error.status()),
            Self::MalformedBody { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns the raw response body, when a response was received.
    #[must_use]
    pub fn body(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::Api(error) => Some(error.response().body()),
            Self::MalformedBody { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Try to decode the raw response body as JSON.
    ///
    /// Returns `None` if no response body is attached to this error.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;

    use super::*;
    use crate::Response;

    fn api_error(status: u16, body: &'static str) -> Error {
        let response = Response::new(status, HashMap::new(), Bytes::from(body));
        let value: serde_json::Value = serde_json::from_str(body).expect("json");
        ApiError::new(value["error"].clone(), response).into()
    }

    #[test]
    fn error_display() {
        assert_eq!(
            Error::MissingToken.to_string(),
            "no API token configured: set one process-wide, in a scope, or on the call"
        );
        assert_eq!(Error::Timeout.to_string(), "request timeout");
        assert_eq!(
            Error::connection("failed to connect").to_string(),
            "connection error: failed to connect"
        );
        assert_eq!(
            Error::invalid_call("endpoint is empty").to_string(),
            "invalid call: endpoint is empty"
        );
        assert_eq!(
            Error::malformed_body(502, "EOF while parsing", Bytes::new()).to_string(),
            "malformed response body (status 502): EOF while parsing"
        );
        assert_eq!(
            Error::dispatch("transport task panicked").to_string(),
            "dispatch failed: transport task panicked"
        );
    }

    #[test]
    fn error_status() {
        let err = api_error(402, r#"{"error":{"message":"card declined"}}"#);
        assert_eq!(err.status(), Some(402));
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = Error::malformed_body(503, "expected value", Bytes::from("<html>"));
        assert_eq!(err.status(), Some(503));
        assert!(err.is_server_error());

        assert_eq!(Error::Timeout.status(), None);
        assert_eq!(Error::MissingToken.status(), None);
    }

    #[test]
    fn error_predicates() {
        assert!(Error::Timeout.is_timeout());
        assert!(Error::connection("refused").is_connection());
        assert!(Error::MissingToken.is_missing_token());
        assert!(!Error::Timeout.is_missing_token());
    }

    #[test]
    fn error_api_accessor() {
        let err = api_error(400, r#"{"error":{"message":"bad request"}}"#);
        let api = err.api().expect("api error");
        assert_eq!(api.message(), Some("bad request"));
        assert!(Error::Timeout.api().is_none());
    }

    #[test]
    fn error_decode_body() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Envelope {
            error: Detail,
        }

        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Detail {
            message: String,
        }

        let err = api_error(404, r#"{"error":{"message":"No such customer"}}"#);
        let decoded = err
            .decode_body::<Envelope>()
            .expect("has body")
            .expect("decodes");
        assert_eq!(decoded.error.message, "No such customer");

        assert!(Error::Timeout.decode_body::<Envelope>().is_none());
    }
}
