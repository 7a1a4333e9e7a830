//! Interceptor pipeline
//!
//! This module provides the composable request/response pipeline that
//! wraps every network call:
//! - The [`Interceptor`] trait and the [`Chain`] executor
//! - Authentication header injection
//! - Token-refresh-and-retry recovery for 401 responses
//! - Status-code-to-error classification
//! - Request/response logging
//!
//! Interceptors registered earlier wrap those registered later: requests
//! flow through the list in order, responses come back in reverse. An
//! interceptor either returns a response directly (short-circuit) or calls
//! [`Chain::proceed`] with a possibly-modified request.

pub mod auth;
pub mod logging;
pub mod refresh;
pub mod status;

pub use auth::{AuthInterceptor, StaticTokenSource, TokenSource};
pub use logging::LoggingInterceptor;
pub use refresh::{TokenRefreshInterceptor, TokenRefresher};
pub use status::StatusValidationInterceptor;

use std::sync::Arc;

use async_trait::async_trait;

use crate::transport::Transport;
use crate::types::{Request, Response};
use crate::Result;

/// A single stage in the request pipeline
///
/// Implementations must call [`Chain::proceed`] exactly once per
/// invocation, or return a response without proceeding at all
/// (short-circuit). This is a caller contract the runtime does not
/// enforce: proceeding twice duplicates downstream side effects, never
/// proceeding without returning a response starves the caller.
///
/// The one sanctioned exception is retry-style recovery, where an
/// interceptor re-drives the downstream chain after observing the first
/// response; see [`TokenRefreshInterceptor`].
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, chain: Chain) -> Result<Response>;
}

/// The live remainder of a pipeline for one request
///
/// Holds the current request, the not-yet-invoked interceptors, and the
/// terminal transport. The cursor only moves forward; proceeding past the
/// end of the list performs the terminal call.
pub struct Chain {
    request: Request,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    cursor: usize,
    transport: Arc<dyn Transport>,
}

impl Chain {
    pub(crate) fn new(
        request: Request,
        interceptors: Arc<[Arc<dyn Interceptor>]>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            request,
            interceptors,
            cursor: 0,
            transport,
        }
    }

    /// The request as this stage received it
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Hand `request` to the next stage and return its response
    ///
    /// Errors raised downstream, by a later interceptor or by the
    /// terminal call, propagate unmodified; the executor itself never
    /// catches or retries.
    pub async fn proceed(&self, request: Request) -> Result<Response> {
        match self.interceptors.get(self.cursor) {
            None => self.transport.call(request).await,
            Some(interceptor) => {
                let next = Chain {
                    request,
                    interceptors: Arc::clone(&self.interceptors),
                    cursor: self.cursor + 1,
                    transport: Arc::clone(&self.transport),
                };
                interceptor.intercept(next).await
            }
        }
    }
}
