//! fetchkit-core - interceptor pipeline and persistent response cache for
//! HTTP clients
//!
//! This crate layers convenience behavior around a single terminal network
//! call without owning any of the wire-level machinery itself:
//!
//! - **Interceptor pipeline**: an ordered onion of stages (credential
//!   injection, 401 refresh-and-retry, status-to-error classification,
//!   logging, and anything user-defined) around one transport call
//! - **Response cache**: a file-based, TTL- and size-bounded store that
//!   survives process restarts and degrades to a cold cache on corruption
//! - **Error taxonomy**: typed errors for network, timeout, parse, HTTP
//!   status, authentication, and cache storage failures
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fetchkit_core::{
//!     AuthInterceptor, Client, ClientConfig, Request, Result, StaticTokenSource,
//! };
//!
//! async fn example() -> Result<()> {
//!     let config = ClientConfig::default()
//!         .with_base_url("https://api.example.com/v1/")
//!         .with_request_logging(true);
//!     let client = Client::new(config)?.with_interceptors(vec![Arc::new(
//!         AuthInterceptor::new(Arc::new(StaticTokenSource::new("token"))),
//!     )]);
//!
//!     let response = client.execute(Request::get("items")).await?;
//!     println!("{}", response.body().unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod interceptor;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheEntry, CacheStore, ProtocolVersion};
pub use client::{default_client, set_default_client, Client, ClientConfig};
pub use error::{Error, Result};
pub use interceptor::{
    AuthInterceptor, Chain, Interceptor, LoggingInterceptor, StaticTokenSource,
    StatusValidationInterceptor, TokenRefreshInterceptor, TokenRefresher, TokenSource,
};
pub use transport::{CachingTransport, ReqwestTransport, Transport};
pub use types::{Method, Request, Response};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::from_status(503, None);
        assert!(err.to_string().contains("Service unavailable"));
    }
}
