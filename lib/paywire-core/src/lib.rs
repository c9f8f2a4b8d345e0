//! Core types for the paywire payment API client.
//!
//! This crate is transport-agnostic. It provides:
//! - [`Call`], [`CallOptions`] and [`ClientOptions`] - call descriptions and their validation
//! - [`Scope`] and [`resolve`] - token, API version, account and base URL resolution
//! - [`encode`] and [`Params`] - per-method parameter encoding
//! - [`prepare`] - building the outbound [`Request`]
//! - [`HttpClient`] - the transport boundary
//! - [`process`] and [`Outcome`] - normalized call results
//! - [`completion`] - one-shot delivery of asynchronous results
//! - [`Error`] and [`Result`] - error handling
//!
//! The `paywire` crate adds a hyper transport and the dispatcher.

mod call;
mod client;
mod codec;
mod completion;
pub mod context;
mod error;
mod method;
mod outcome;
mod params;
pub mod prelude;
mod prepare;
mod request;
mod response;

pub use call::{Call, CallOptions, ClientOptions};
pub use client::HttpClient;
pub use codec::{ContentType, Encoded, encode, flatten, from_json, to_form};
pub use completion::{Completion, CompletionReceiver, Delivery, completion};
pub use context::{DEFAULT_BASE_URL, EffectiveConfig, Scope, ScopeGuard, Scoped, resolve};
pub use error::{Error, Result};
pub use method::Method;
pub use outcome::{ApiError, Failure, Outcome, Payload, process};
pub use params::{Params, Value};
pub use prepare::{ACCOUNT_HEADER, API_VERSION_HEADER, IDEMPOTENCY_KEY_HEADER, prepare};
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
