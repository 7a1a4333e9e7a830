//! Request/response logging
//!
//! Emits one `tracing` event per request with method, URL, outcome, and
//! elapsed time. Never short-circuits and never modifies the request.

use std::time::Instant;

use async_trait::async_trait;

use crate::interceptor::{Chain, Interceptor};
use crate::types::Response;
use crate::Result;

/// Interceptor that logs each request's outcome and duration
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<Response> {
        let method = chain.request().method();
        let url = chain.request().url().to_string();
        let start = Instant::now();

        let request = chain.request().clone();
        let result = chain.proceed(request).await;

        let elapsed = start.elapsed();
        match &result {
            Ok(response) => {
                tracing::info!(%method, %url, status = response.status(), ?elapsed, "request completed");
            }
            Err(error) => {
                tracing::warn!(%method, %url, %error, ?elapsed, "request failed");
            }
        }
        result
    }
}
