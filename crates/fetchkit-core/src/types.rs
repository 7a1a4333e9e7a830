//! Core request and response types shared across the interceptor pipeline
//!
//! Both [`Request`] and [`Response`] are immutable values: every mutation
//! produces a new value via the consuming `with_*` builders, so a request
//! handed to one interceptor can never be changed under the feet of
//! another.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl Method {
    /// Parse a method from its standard verb string
    pub fn parse(method_str: &str) -> Result<Self> {
        match method_str.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            _ => Err(Error::Configuration {
                message: format!("Unsupported HTTP method: {}", method_str),
                source: None,
            }),
        }
    }

    /// The standard verb string for this method
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable HTTP request
///
/// Headers and query parameters are unordered string maps with unique keys;
/// setting an existing key overwrites the previous value (last write wins).
/// Header lookup via [`Request::header`] is case-insensitive, matching how
/// HTTP treats header names on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    method: Method,
    url: String,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl Request {
    /// Create a request with the given method and URL
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            query: HashMap::new(),
            body: None,
        }
    }

    /// Convenience constructor for a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Convenience constructor for a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Return a copy with the given header set (last write wins)
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Return a copy with all of the given headers merged in
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Return a copy with the given query parameter set
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Return a copy with the given body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Return a copy with the body set to the JSON encoding of `value`
    pub fn with_json_body<T: Serialize>(mut self, value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)?;
        self.body = Some(bytes);
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Return a copy with a different URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Look up a header value, matching the name case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether a header with this name is present (case-insensitive)
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }
}

/// An immutable HTTP response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    url: String,
    status: u16,
    headers: HashMap<String, String>,
    body: Option<String>,
}

impl Response {
    /// Create a response for the given source URL and status code
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Return a copy with the given header set
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Return a copy with the given text body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Look up a header value, matching the name case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status code is in the 2xx success range
    pub fn is_successful(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Decode the body as JSON into the requested shape
    ///
    /// An absent body or a decode failure raises [`Error::Parse`].
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body.as_deref().ok_or_else(|| Error::Parse {
            message: "response has no body to decode".to_string(),
            source: None,
        })?;
        serde_json::from_str(body).map_err(|e| Error::Parse {
            message: format!("failed to decode response body: {}", e),
            source: Some(anyhow::Error::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("get").unwrap(), Method::Get);
        assert_eq!(Method::parse("POST").unwrap(), Method::Post);
        assert!(Method::parse("TRACE").is_err());
    }

    #[test]
    fn test_request_header_last_write_wins() {
        let request = Request::get("https://api.example.com/items")
            .with_header("Accept", "text/plain")
            .with_header("Accept", "application/json");
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.headers().len(), 1);
    }

    #[test]
    fn test_request_header_lookup_is_case_insensitive() {
        let request =
            Request::get("https://api.example.com/items").with_header("Authorization", "Bearer t");
        assert!(request.has_header("authorization"));
        assert_eq!(request.header("AUTHORIZATION"), Some("Bearer t"));
    }

    #[test]
    fn test_request_mutation_produces_new_value() {
        let original = Request::get("https://api.example.com/items");
        let modified = original.clone().with_header("X-Trace", "abc");
        assert!(!original.has_header("X-Trace"));
        assert!(modified.has_header("X-Trace"));
    }

    #[test]
    fn test_response_is_successful_bounds() {
        assert!(Response::new("https://api.example.com", 200).is_successful());
        assert!(Response::new("https://api.example.com", 299).is_successful());
        assert!(!Response::new("https://api.example.com", 199).is_successful());
        assert!(!Response::new("https://api.example.com", 300).is_successful());
        assert!(!Response::new("https://api.example.com", 404).is_successful());
    }

    #[test]
    fn test_response_json_decode() {
        #[derive(Deserialize)]
        struct Item {
            name: String,
        }

        let response =
            Response::new("https://api.example.com", 200).with_body(r#"{"name":"widget"}"#);
        let item: Item = response.json().unwrap();
        assert_eq!(item.name, "widget");
    }

    #[test]
    fn test_response_json_decode_failure_is_parse_error() {
        let response = Response::new("https://api.example.com", 200).with_body("not json");
        let result: Result<serde_json::Value> = response.json();
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn test_response_json_missing_body_is_parse_error() {
        let response = Response::new("https://api.example.com", 204);
        let result: Result<serde_json::Value> = response.json();
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
