//! Persisted response snapshots
//!
//! A [`CacheEntry`] is everything needed to replay a response without
//! touching the network: status line, protocol metadata, headers, body
//! bytes, and the timestamps that drive expiry. Entries are encoded with
//! bincode for a compact binary on-disk representation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Response;

/// Protocol name and version recorded with a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub name: String,
    pub major: u8,
    pub minor: u8,
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self {
            name: "HTTP".to_string(),
            major: 1,
            minor: 1,
        }
    }
}

/// A cached response snapshot
///
/// Lookup identity is `{url, vary_keys}`: two entries for the same URL with
/// different vary keys are distinct and never satisfy each other's lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Canonical URL this entry was stored under
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Reason phrase matching the status code
    pub status_message: String,
    /// Protocol metadata
    pub protocol: ProtocolVersion,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Request attributes beyond the URL that distinguish this entry
    pub vary_keys: HashMap<String, String>,
    /// Response body bytes
    pub body: Vec<u8>,
    /// When the request was sent
    pub sent_at: DateTime<Utc>,
    /// When the response was received
    pub received_at: DateTime<Utc>,
    /// Server-declared expiry, if any
    pub expires_at: Option<DateTime<Utc>>,
    /// When the entry was written to the store
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Snapshot a response under the given canonical URL and vary keys
    pub fn from_response(
        url: impl Into<String>,
        response: &Response,
        vary_keys: HashMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            url: url.into(),
            status: response.status(),
            status_message: reason_phrase(response.status()).to_string(),
            protocol: ProtocolVersion::default(),
            headers: response.headers().clone(),
            vary_keys,
            body: response.body().map(|b| b.as_bytes().to_vec()).unwrap_or_default(),
            sent_at: now,
            received_at: now,
            expires_at: None,
            stored_at: now,
        }
    }

    /// Replay this snapshot as a response
    pub fn to_response(&self) -> Response {
        let mut response = Response::new(self.url.clone(), self.status);
        for (name, value) in &self.headers {
            response = response.with_header(name.clone(), value.clone());
        }
        if !self.body.is_empty() {
            response = response.with_body(String::from_utf8_lossy(&self.body).into_owned());
        }
        response
    }

    /// Whether this entry satisfies a lookup for `{url, vary_keys}`
    pub fn matches(&self, url: &str, vary_keys: &HashMap<String, String>) -> bool {
        self.url == url && self.vary_keys == *vary_keys
    }

    pub(crate) fn encode(&self) -> std::result::Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub(crate) fn decode(bytes: &[u8]) -> std::result::Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Reason phrase for the status codes this crate cares about
fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}
