//! Credential staleness recovery
//!
//! Watches for 401 responses and attempts exactly one token refresh
//! followed by exactly one retry. The retry amplification of any single
//! request is therefore bounded at one extra network call: a second 401 is
//! returned as-is, never re-refreshed.
//!
//! This deliberately complements [`AuthInterceptor`](crate::interceptor::AuthInterceptor):
//! one adds the credential, the other recovers when the credential has
//! gone stale. Place this interceptor *before* the auth interceptor in the
//! list so that the retried request re-enters auth and picks up the
//! renewed token.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Error;
use crate::interceptor::{Chain, Interceptor};
use crate::types::Response;
use crate::Result;

/// Renews the credential behind a [`TokenSource`](crate::interceptor::TokenSource)
///
/// Returns `Ok(true)` when a fresh credential is available, `Ok(false)`
/// when renewal is impossible (revoked session, expired refresh token).
/// Concurrent requests observing 401s at the same time will each invoke
/// this, so implementations must tolerate concurrent calls.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<bool>;
}

type UnauthorizedCallback = Arc<dyn Fn() + Send + Sync>;

/// Where a single intercepted attempt ended up, before the outcome is
/// mapped onto the public response/error surface.
enum Outcome {
    /// First response was not a 401
    Passthrough(Response),
    /// Refresh succeeded; this is whatever the one retry produced
    Retried(Response),
    /// Refresh failed; the original 401 is discarded
    AuthFailed,
}

/// Interceptor that recovers from 401 responses via a single refresh-and-retry
pub struct TokenRefreshInterceptor {
    refresher: Arc<dyn TokenRefresher>,
    on_unauthorized: Option<UnauthorizedCallback>,
}

impl TokenRefreshInterceptor {
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            refresher,
            on_unauthorized: None,
        }
    }

    /// Register a fire-and-forget hook invoked when refresh fails
    ///
    /// Intended for session-teardown side effects (logout UI, credential
    /// wipe). Runs before [`Error::AuthenticationRequired`] is raised.
    pub fn with_unauthorized_callback(
        mut self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_unauthorized = Some(Arc::new(callback));
        self
    }

    async fn run(&self, chain: &Chain) -> Result<Outcome> {
        let request = chain.request().clone();
        let response = chain.proceed(request.clone()).await?;

        if response.status() != 401 {
            return Ok(Outcome::Passthrough(response));
        }

        tracing::debug!(url = %request.url(), "received 401, attempting token refresh");
        if self.refresher.refresh().await? {
            // Exactly one retry. Whatever comes back, including another
            // 401, is the final answer for this request.
            tracing::debug!(url = %request.url(), "refresh succeeded, retrying request");
            let retried = chain.proceed(request).await?;
            Ok(Outcome::Retried(retried))
        } else {
            Ok(Outcome::AuthFailed)
        }
    }
}

#[async_trait]
impl Interceptor for TokenRefreshInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<Response> {
        match self.run(&chain).await? {
            Outcome::Passthrough(response) | Outcome::Retried(response) => Ok(response),
            Outcome::AuthFailed => {
                tracing::warn!(url = %chain.request().url(), "token refresh failed, session is unauthorized");
                if let Some(callback) = &self.on_unauthorized {
                    callback();
                }
                Err(Error::AuthenticationRequired {
                    message: "token refresh failed after a 401 response".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use crate::types::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves a scripted sequence of status codes, then repeats the last.
    struct ScriptedTransport {
        statuses: Mutex<Vec<u16>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(statuses: Vec<u16>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn call(&self, request: Request) -> Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.len() > 1 {
                statuses.remove(0)
            } else {
                statuses[0]
            };
            Ok(Response::new(request.url(), status))
        }
    }

    struct FixedRefresher {
        succeeds: bool,
        calls: AtomicUsize,
    }

    impl FixedRefresher {
        fn new(succeeds: bool) -> Self {
            Self {
                succeeds,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TokenRefresher for FixedRefresher {
        async fn refresh(&self) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.succeeds)
        }
    }

    async fn run(
        interceptor: TokenRefreshInterceptor,
        transport: Arc<ScriptedTransport>,
    ) -> Result<Response> {
        let request = Request::get("https://api.example.com/items");
        let chain = Chain::new(
            request.clone(),
            vec![Arc::new(interceptor) as Arc<dyn Interceptor>].into(),
            transport,
        );
        chain.proceed(request).await
    }

    #[tokio::test]
    async fn test_non_401_passes_through_without_refresh() {
        let transport = Arc::new(ScriptedTransport::new(vec![200]));
        let refresher = Arc::new(FixedRefresher::new(true));
        let interceptor = TokenRefreshInterceptor::new(refresher.clone());

        let response = run(interceptor, transport.clone()).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(transport.calls(), 1);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_retry_after_successful_refresh() {
        let transport = Arc::new(ScriptedTransport::new(vec![401, 200]));
        let refresher = Arc::new(FixedRefresher::new(true));
        let interceptor = TokenRefreshInterceptor::new(refresher.clone());

        let response = run(interceptor, transport.clone()).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(transport.calls(), 2);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_401_is_returned_as_is() {
        // Server never stops returning 401; the interceptor must not loop.
        let transport = Arc::new(ScriptedTransport::new(vec![401]));
        let refresher = Arc::new(FixedRefresher::new(true));
        let interceptor = TokenRefreshInterceptor::new(refresher.clone());

        let response = run(interceptor, transport.clone()).await.unwrap();

        assert_eq!(response.status(), 401);
        assert_eq!(transport.calls(), 2);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_raises_and_notifies_once() {
        let transport = Arc::new(ScriptedTransport::new(vec![401]));
        let refresher = Arc::new(FixedRefresher::new(false));
        let notified = Arc::new(AtomicUsize::new(0));
        let notified_clone = Arc::clone(&notified);
        let interceptor = TokenRefreshInterceptor::new(refresher.clone())
            .with_unauthorized_callback(move || {
                notified_clone.fetch_add(1, Ordering::SeqCst);
            });

        let result = run(interceptor, transport.clone()).await;

        assert!(matches!(result, Err(Error::AuthenticationRequired { .. })));
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls(), 1);
    }
}
