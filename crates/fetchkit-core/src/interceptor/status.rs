//! Status-code-to-error classification
//!
//! A pure, stateless mapping stage: any 4xx/5xx response is converted into
//! its typed error via [`Error::from_status`], carrying the numeric code
//! and the response body. Everything below 400 passes through unchanged.

use async_trait::async_trait;

use crate::error::Error;
use crate::interceptor::{Chain, Interceptor};
use crate::types::Response;
use crate::Result;

/// Interceptor that raises typed errors for unsuccessful status codes
///
/// Performs no retries and holds no state. Place it *before* any recovery
/// interceptor in the list so recovery stages still observe raw responses;
/// by the time a status reaches this stage it is final.
pub struct StatusValidationInterceptor;

#[async_trait]
impl Interceptor for StatusValidationInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<Response> {
        let request = chain.request().clone();
        let response = chain.proceed(request).await?;

        if (400..=599).contains(&response.status()) {
            let status = response.status();
            let body = response.body().map(str::to_string);
            tracing::debug!(url = %response.url(), status, "mapping unsuccessful status to typed error");
            return Err(Error::from_status(status, body));
        }
        Ok(response)
    }
}
