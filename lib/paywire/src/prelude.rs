//! Prelude module for convenient imports.
//!
//! ```
//! use paywire::prelude::*;
//! ```

pub use crate::{
    ApiClient, ApiError, Call, CallOptions, ClientConfig, ClientOptions, CompletionReceiver,
    Error, Failure, HttpClient, HyperClient, Method, Outcome, Params, Payload, Reply, Result,
    Scope, Value,
};
