//! Prelude module for convenient imports.
//!
//! ```
//! use paywire_core::prelude::*;
//!
//! let call = Call::get("customers").options(CallOptions::new().param("limit", 3));
//! assert!(call.validate().is_ok());
//! ```

pub use crate::{
    ApiError, Call, CallOptions, ClientOptions, Error, Failure, HttpClient, Method, Outcome,
    Params, Payload, Result, Scope, Value,
};
