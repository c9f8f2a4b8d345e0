//! Transport boundary.
//!
//! [`HttpClient`] is the only capability the dispatcher needs from an HTTP
//! stack. The `paywire` crate ships a hyper-based implementation; tests and
//! alternative stacks can provide their own.

use std::future::Future;

use bytes::Bytes;

use crate::{Request, Response, Result};

/// Core HTTP client trait.
///
/// Implementations receive a fully prepared request (URL with query string,
/// authentication and API headers, optional body, optional timeout) and must
/// return the raw response, whatever its status code.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use paywire_core::{HttpClient, Request, Response, Result};
/// use std::collections::HashMap;
///
/// struct Canned;
///
/// impl HttpClient for Canned {
///     async fn execute(&self, _request: Request<Bytes>) -> Result<Response<Bytes>> {
///         Ok(Response::new(200, HashMap::new(), Bytes::from(r#"{"id":"cus_1"}"#)))
///     }
/// }
/// ```
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}

impl<C: HttpClient> HttpClient for std::sync::Arc<C> {
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send {
        (**self).execute(request)
    }
}
