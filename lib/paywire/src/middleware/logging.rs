//! Request/response logging middleware.
//!
//! Logs through `tracing`. Credentials never reach the log: the
//! `Authorization` header is replaced by a placeholder before headers are
//! recorded.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{Instrument, Level, debug, info, span, warn};

use crate::{Error, Request, Response, Result};

const REDACTED: &str = "[redacted]";

/// Layer that adds request/response logging.
///
/// # Example
///
/// ```
/// use paywire::HyperClient;
/// use paywire::middleware::LoggingLayer;
///
/// let client = HyperClient::builder()
///     .layer(LoggingLayer::new())
///     .build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

/// Log level for the logging middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level, redacted headers and request ids included.
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

impl LoggingLayer {
    /// Create a new logging layer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging layer that logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// Service that logs requests and responses.
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

impl<S> Logging<S> {
    /// Create a new logging service wrapping the given service.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            level: LogLevel::Info,
        }
    }
}

/// Headers as they may appear in logs.
#[must_use]
pub fn redacted_headers(request: &Request<Bytes>) -> BTreeMap<&str, &str> {
    request
        .headers()
        .iter()
        .map(|(name, value)| {
            let value = if name.eq_ignore_ascii_case(http::header::AUTHORIZATION.as_str()) {
                REDACTED
            } else {
                value.as_str()
            };
            (name.as_str(), value)
        })
        .collect()
}

impl<S> Service<Request<Bytes>> for Logging<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let method = request.method();
        let url = request.url().clone();
        let level = self.level;

        let span = span!(Level::INFO, "api_request", %method, path = url.path());

        if level == LogLevel::Debug {
            debug!(
                method = %method,
                url = %url,
                headers = ?redacted_headers(&request),
                body_len = request.body().map_or(0, Bytes::len),
                "sending request"
            );
        }

        // The readied service is the one that must be called
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(
            async move {
                let start = Instant::now();

                if level == LogLevel::Info {
                    info!(method = %method, url = %url, "sending request");
                }

                let result = inner.call(request).await;

                // Saturating conversion to u64
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => {
                        let status = response.status();
                        let request_id = response.request_id().unwrap_or("-");
                        if response.is_success() {
                            info!(status, elapsed_ms, request_id, "request completed");
                        } else {
                            warn!(status, elapsed_ms, request_id, "request failed with HTTP error");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;
    use crate::Method;

    #[test]
    fn logging_layer_default() {
        let layer = LoggingLayer::new();
        check!(layer.level == LogLevel::Info);
    }

    #[test]
    fn logging_layer_debug() {
        let layer = LoggingLayer::debug();
        check!(layer.level == LogLevel::Debug);
    }

    #[test]
    fn authorization_is_redacted() {
        let url = url::Url::parse("https://api.example.com/v1/balance").expect("url");
        let request = Request::<Bytes>::builder(Method::Get, url)
            .basic_auth("sk_live_secret", "")
            .header("Account", "acct_1")
            .build();

        let headers = redacted_headers(&request);

        check!(headers.get("authorization") == Some(&REDACTED));
        check!(headers.get("Account") == Some(&"acct_1"));
        check!(!format!("{headers:?}").contains("sk_live_secret"));
    }
}
