//! Bearer credential injection
//!
//! Adds a credential header to outgoing requests. Requests that already
//! carry the header pass through untouched, as do requests when the token
//! source has nothing to offer; deciding what "no credential" means is
//! the caller's business, not this interceptor's.

use std::sync::Arc;

use async_trait::async_trait;

use crate::interceptor::{Chain, Interceptor};
use crate::types::Response;
use crate::Result;

/// Default header the credential is written to
pub const DEFAULT_AUTH_HEADER: &str = "Authorization";

/// Default prefix in front of the token value
pub const DEFAULT_TOKEN_PREFIX: &str = "Bearer ";

/// Supplies the current credential, if one exists
///
/// Fetching may suspend (keychain access, token endpoint, disk). A failure
/// here propagates to the caller of `execute`; the interceptor does not
/// swallow token-source errors.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Option<String>>;
}

/// A fixed, in-memory token source
///
/// Useful for tests and for clients whose credential never rotates.
pub struct StaticTokenSource {
    token: Option<String>,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A source that never yields a credential
    pub fn empty() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }
}

/// Interceptor that injects `<prefix><token>` into the configured header
pub struct AuthInterceptor {
    source: Arc<dyn TokenSource>,
    header_name: String,
    token_prefix: String,
}

impl AuthInterceptor {
    /// Create an interceptor with the default header and prefix
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            header_name: DEFAULT_AUTH_HEADER.to_string(),
            token_prefix: DEFAULT_TOKEN_PREFIX.to_string(),
        }
    }

    /// Use a different header name
    pub fn with_header_name(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self
    }

    /// Use a different value prefix (pass "" for a bare token)
    pub fn with_token_prefix(mut self, token_prefix: impl Into<String>) -> Self {
        self.token_prefix = token_prefix.into();
        self
    }
}

#[async_trait]
impl Interceptor for AuthInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<Response> {
        let request = chain.request().clone();

        // An explicitly-set header always wins over the token source.
        if request.has_header(&self.header_name) {
            tracing::debug!(header = %self.header_name, "credential already present, passing through");
            return chain.proceed(request).await;
        }

        match self.source.token().await? {
            Some(token) => {
                let authorized = request.with_header(
                    self.header_name.clone(),
                    format!("{}{}", self.token_prefix, token),
                );
                chain.proceed(authorized).await
            }
            None => {
                tracing::debug!("token source yielded no credential, passing through");
                chain.proceed(request).await
            }
        }
    }
}
