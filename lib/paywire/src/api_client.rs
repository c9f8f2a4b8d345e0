//! Call dispatcher.
//!
//! [`ApiClient`] validates a [`Call`], resolves its configuration on the
//! calling thread, prepares the request, and then either blocks until the
//! response is processed (no completion channel) or returns at once and
//! delivers the processed result on the channel.

use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::{
    Call, CallOptions, Completion, CompletionReceiver, Error, HttpClient, HyperClient, Method,
    Outcome, Request, Result, completion, prepare, process, resolve,
};

/// Result of [`ApiClient::call`].
#[derive(Debug)]
#[must_use = "a ready reply carries the outcome of the call"]
pub enum Reply {
    /// Synchronous call: the processed outcome.
    Ready(Outcome),
    /// Asynchronous call: the outcome will be delivered on the completion channel.
    Pending,
}

impl Reply {
    /// The outcome of a synchronous call.
    #[must_use]
    pub fn into_outcome(self) -> Option<Outcome> {
        match self {
            Self::Ready(outcome) => Some(outcome),
            Self::Pending => None,
        }
    }

    /// Returns `true` for asynchronous calls.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Runtime created by the client; shut down without blocking when the last
/// client clone goes away, even from inside another runtime.
#[derive(Debug)]
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

/// Payment API client.
///
/// Cloning is cheap: clones share the transport and the runtime.
///
/// # Example
///
/// ```no_run
/// use paywire::{ApiClient, CallOptions, Scope};
///
/// # fn main() -> paywire::Result<()> {
/// paywire::context::set_token("sk_test_4eC39HqLyjWDarjtT1zdp7dc");
/// let client = ApiClient::new()?;
///
/// let customer = client.post(
///     "customers",
///     CallOptions::new().param("email", "jenny.rosen@example.com"),
/// )?;
/// println!("created {}", customer.to_value()["id"]);
///
/// // Same call on behalf of a connected account
/// Scope::new()
///     .account("acct_1032D82eZvKYlo2C")
///     .run(|| client.get("balance", CallOptions::default()))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ApiClient<C = HyperClient> {
    transport: Arc<C>,
    handle: Handle,
    runtime: Option<Arc<OwnedRuntime>>,
}

impl<C> Clone for ApiClient<C> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            handle: self.handle.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl ApiClient<HyperClient> {
    /// Create a client over a default [`HyperClient`] with its own runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if the runtime cannot be started.
    pub fn new() -> Result<Self> {
        Self::with_transport(HyperClient::new())
    }
}

impl<C> ApiClient<C>
where
    C: HttpClient + 'static,
{
    /// Create a client over `transport` with its own multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if the runtime cannot be started.
    pub fn with_transport(transport: C) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("paywire-dispatch")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        Ok(Self {
            transport: Arc::new(transport),
            handle,
            runtime: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    /// Create a client over `transport` that spawns onto an existing runtime.
    ///
    /// Synchronous calls block the calling thread. From a task of a
    /// multi-threaded runtime they block in place; a current-thread runtime
    /// cannot block, so they fail there.
    #[must_use]
    pub fn with_runtime(transport: C, handle: Handle) -> Self {
        Self {
            transport: Arc::new(transport),
            handle,
            runtime: None,
        }
    }

    /// The transport.
    #[must_use]
    pub fn transport(&self) -> &C {
        &self.transport
    }

    /// Handle of the runtime calls are dispatched on.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Dispatch a call.
    ///
    /// Validation and configuration resolution happen on the calling thread
    /// before any I/O, and their errors are returned here in both modes.
    /// Without a completion channel the call blocks and returns
    /// [`Reply::Ready`]; with one it returns [`Reply::Pending`] immediately.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCall`] for a malformed call
    /// - [`Error::MissingToken`] when no token is configured
    /// - [`Error::BlockingNotAllowed`] for a synchronous call from a
    ///   current-thread runtime
    /// - on the synchronous path with `throw_on_error`, the call's failure
    pub fn call(&self, mut call: Call) -> Result<Reply> {
        match call.completion.take() {
            Some(completion) => self.start(&call, completion).map(|()| Reply::Pending),
            None => self.run(&call).map(Reply::Ready),
        }
    }

    // ========================================================================
    // Verb helpers
    // ========================================================================

    /// Synchronous `GET`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub fn get(&self, endpoint: impl Into<String>, options: CallOptions) -> Result<Outcome> {
        self.run(&Call::new(Method::Get, endpoint).options(options))
    }

    /// Synchronous `POST`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub fn post(&self, endpoint: impl Into<String>, options: CallOptions) -> Result<Outcome> {
        self.run(&Call::new(Method::Post, endpoint).options(options))
    }

    /// Synchronous `DELETE`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub fn delete(&self, endpoint: impl Into<String>, options: CallOptions) -> Result<Outcome> {
        self.run(&Call::new(Method::Delete, endpoint).options(options))
    }

    /// Asynchronous `GET`, delivering on the returned receiver.
    ///
    /// # Errors
    ///
    /// Precondition failures, see [`ApiClient::call`].
    pub fn get_async(
        &self,
        endpoint: impl Into<String>,
        options: CallOptions,
    ) -> Result<CompletionReceiver> {
        self.spawn_verb(Method::Get, endpoint.into(), options)
    }

    /// Asynchronous `POST`, delivering on the returned receiver.
    ///
    /// # Errors
    ///
    /// Precondition failures, see [`ApiClient::call`].
    pub fn post_async(
        &self,
        endpoint: impl Into<String>,
        options: CallOptions,
    ) -> Result<CompletionReceiver> {
        self.spawn_verb(Method::Post, endpoint.into(), options)
    }

    /// Asynchronous `DELETE`, delivering on the returned receiver.
    ///
    /// # Errors
    ///
    /// Precondition failures, see [`ApiClient::call`].
    pub fn delete_async(
        &self,
        endpoint: impl Into<String>,
        options: CallOptions,
    ) -> Result<CompletionReceiver> {
        self.spawn_verb(Method::Delete, endpoint.into(), options)
    }

    fn spawn_verb(
        &self,
        method: Method,
        endpoint: String,
        options: CallOptions,
    ) -> Result<CompletionReceiver> {
        let (completion, receiver) = completion();
        self.start(&Call::new(method, endpoint).options(options), completion)?;
        Ok(receiver)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn run(&self, call: &Call) -> Result<Outcome> {
        let request = prepare_call(call)?;
        let in_runtime = blocking_context()?;
        debug!(method = %call.method, endpoint = %call.endpoint, "dispatching synchronous call");

        let transport = Arc::clone(&self.transport);
        let task = self
            .handle
            .spawn(async move { transport.execute(request).await });

        let joined = if in_runtime {
            tokio::task::block_in_place(|| self.handle.block_on(task))
        } else {
            self.handle.block_on(task)
        };
        let result = joined.unwrap_or_else(|err| Err(join_failure(&err)));
        settle(process(result), call.options.throw_on_error)
    }

    fn start(&self, call: &Call, completion: Completion) -> Result<()> {
        let request = prepare_call(call)?;
        debug!(method = %call.method, endpoint = %call.endpoint, "dispatching asynchronous call");

        let throw_on_error = call.options.throw_on_error;
        let transport = Arc::clone(&self.transport);
        self.handle.spawn(async move {
            let outcome = process(transport.execute(request).await);
            if !completion.deliver(settle(outcome, throw_on_error)) {
                debug!("completion receiver dropped before delivery");
            }
        });
        Ok(())
    }
}

/// Validate, resolve and prepare on the calling thread.
fn prepare_call(call: &Call) -> Result<Request<Bytes>> {
    call.validate()?;
    let config = resolve(&call.options)?;
    prepare(call, &config)
}

/// Whether the calling thread is inside a runtime that lets it block.
fn blocking_context() -> Result<bool> {
    match Handle::try_current() {
        Err(_) => Ok(false),
        Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => Ok(true),
        Ok(_) => Err(Error::BlockingNotAllowed(
            "current-thread runtime, use the asynchronous helpers".to_string(),
        )),
    }
}

fn join_failure(err: &JoinError) -> Error {
    if err.is_panic() {
        Error::dispatch("transport task panicked")
    } else {
        Error::dispatch("dispatch runtime shut down")
    }
}

fn settle(outcome: Outcome, throw_on_error: bool) -> Result<Outcome> {
    if let Outcome::Failure(failure) = &outcome {
        warn!(status = ?failure.status(), error = %failure, "call failed");
    }
    match outcome {
        Outcome::Failure(failure) if throw_on_error => Err(failure.into()),
        outcome => Ok(outcome),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert2::{check, let_assert};

    use super::*;
    use crate::{Failure, Response};

    fn api_failure() -> Outcome {
        let body = r#"{"error":{"message":"bad request"}}"#;
        process(Ok(Response::new(400, HashMap::new(), Bytes::from(body))))
    }

    #[test]
    fn settle_throws_only_when_asked() {
        let_assert!(Err(Error::Api(error)) = settle(api_failure(), true));
        check!(error.message() == Some("bad request"));

        let_assert!(Ok(Outcome::Failure(Failure::Api(_))) = settle(api_failure(), false));
    }

    #[test]
    fn settle_passes_success_through() {
        let outcome = process(Ok(Response::new(200, HashMap::new(), Bytes::from("{}"))));
        let_assert!(Ok(Outcome::Success(_)) = settle(outcome, true));
    }

    #[test]
    fn reply_accessors() {
        check!(Reply::Pending.is_pending());
        check!(Reply::Pending.into_outcome().is_none());
        check!(Reply::Ready(api_failure()).into_outcome().is_some());
    }
}
