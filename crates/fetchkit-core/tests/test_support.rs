//! Shared test support utilities for integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use fetchkit_core::{Request, Response, Result, TokenRefresher, TokenSource, Transport};

/// Transport that serves a scripted sequence of responses and records
/// every request it receives. Once the script runs out, the last step
/// repeats forever.
pub struct ScriptedTransport {
    script: Mutex<Vec<(u16, Option<String>)>>,
    requests: Mutex<Vec<Request>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(script: Vec<(u16, Option<&str>)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|(status, body)| (status, body.map(str::to_string)))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(status: u16, body: Option<&str>) -> Arc<Self> {
        Self::new(vec![(status, body)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let mut script = self.script.lock().unwrap();
        let (status, body) = if script.len() > 1 {
            script.remove(0)
        } else {
            script[0].clone()
        };

        let mut response = Response::new(request.url(), status);
        if let Some(body) = body {
            response = response.with_body(body);
        }
        Ok(response)
    }
}

/// Transport that answers 200 only when the expected credential header is
/// present, and 401 otherwise.
pub struct CredentialCheckingTransport {
    expected: String,
    calls: AtomicUsize,
}

impl CredentialCheckingTransport {
    pub fn new(expected: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            expected: expected.into(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CredentialCheckingTransport {
    async fn call(&self, request: Request) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = if request.header("Authorization") == Some(self.expected.as_str()) {
            200
        } else {
            401
        };
        Ok(Response::new(request.url(), status))
    }
}

/// Token source backed by a mutable slot, so a refresher can rotate the
/// credential underneath it.
pub struct RotatingTokenSource {
    current: Mutex<String>,
}

impl RotatingTokenSource {
    pub fn new(initial: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(initial.into()),
        })
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.current.lock().unwrap() = token.into();
    }
}

#[async_trait]
impl TokenSource for RotatingTokenSource {
    async fn token(&self) -> Result<Option<String>> {
        Ok(Some(self.current.lock().unwrap().clone()))
    }
}

/// Refresher that swaps the rotating source over to a fresh token.
pub struct RotatingRefresher {
    source: Arc<RotatingTokenSource>,
    fresh: String,
    calls: AtomicUsize,
}

impl RotatingRefresher {
    pub fn new(source: Arc<RotatingTokenSource>, fresh: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            source,
            fresh: fresh.into(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for RotatingRefresher {
    async fn refresh(&self) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.source.set(self.fresh.clone());
        Ok(true)
    }
}

/// Refresher with a fixed outcome.
pub struct FixedRefresher {
    succeeds: bool,
    calls: AtomicUsize,
}

impl FixedRefresher {
    pub fn new(succeeds: bool) -> Arc<Self> {
        Arc::new(Self {
            succeeds,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for FixedRefresher {
    async fn refresh(&self) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.succeeds)
    }
}
