//! Payment API client.
//!
//! Calls are described with [`Call`] (or the verb helpers on [`ApiClient`]),
//! authenticated from the [`context`], sent over a hyper transport, and
//! normalized into an [`Outcome`]. A call runs synchronously unless it carries
//! a completion channel, in which case the result is delivered there.
//!
//! # Example
//!
//! ```no_run
//! use paywire::prelude::*;
//!
//! # fn main() -> paywire::Result<()> {
//! paywire::context::set_token("sk_test_4eC39HqLyjWDarjtT1zdp7dc");
//! let client = ApiClient::new()?;
//!
//! // Blocking
//! let charges = client.get("charges", CallOptions::new().param("limit", 3))?;
//! println!("{}", charges.to_value());
//!
//! // Delivered on a channel; failures stay values
//! let mut receiver = client.post_async(
//!     "refunds",
//!     CallOptions::new().param("charge", "ch_1").throw_on_error(false),
//! )?;
//! if let Some(Ok(outcome)) = receiver.blocking_recv() {
//!     println!("refund: {}", outcome.to_value());
//! }
//! # Ok(())
//! # }
//! ```

mod api_client;
mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;

pub use api_client::{ApiClient, Reply};
pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use paywire_core::{
    ACCOUNT_HEADER, API_VERSION_HEADER, ApiError, Call, CallOptions, ClientOptions, Completion,
    CompletionReceiver, ContentType, DEFAULT_BASE_URL, Delivery, EffectiveConfig, Encoded, Error,
    Failure, HttpClient, IDEMPOTENCY_KEY_HEADER, Method, Outcome, Params, Payload, Request,
    RequestBuilder, Response, Result, Scope, ScopeGuard, Scoped, Value, completion, context,
    encode, flatten, from_json, prepare, process, resolve, to_form,
};

// Re-export http types for status codes and headers
pub use paywire_core::{StatusCode, header};

pub use url;
