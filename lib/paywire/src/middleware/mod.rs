//! Tower middleware layers for the hyper transport.
//!
//! Layers wrap the type-erased transport service and see every prepared
//! request before it hits the network. Add them with
//! [`HyperClientBuilder::layer`](crate::HyperClientBuilder::layer) or the
//! `with_*` helpers.
//!
//! # Example
//!
//! ```
//! use paywire::HyperClient;
//! use paywire::middleware::{ConcurrencyLimitLayer, LoggingLayer};
//!
//! let client = HyperClient::builder()
//!     .layer(LoggingLayer::new())
//!     .layer(ConcurrencyLimitLayer::new(16))
//!     .build();
//! ```

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer, redacted_headers};

// Re-export tower types for convenience
pub use tower::limit::ConcurrencyLimitLayer;
pub use tower::{Layer, ServiceBuilder};
