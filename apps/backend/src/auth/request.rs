//! Minimal view of an inbound request: header and cookie lookup.

use std::collections::HashMap;

use actix_web::dev::ServiceRequest;
use actix_web::HttpRequest;

pub trait CredentialSource {
    /// Value of the named header, if present and valid UTF-8.
    fn header(&self, name: &str) -> Option<&str>;

    /// Value of the named cookie, if present.
    fn cookie_value(&self, name: &str) -> Option<String>;
}

impl CredentialSource for HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn cookie_value(&self, name: &str) -> Option<String> {
        self.cookie(name).map(|c| c.value().to_string())
    }
}

impl CredentialSource for ServiceRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn cookie_value(&self, name: &str) -> Option<String> {
        self.cookie(name).map(|c| c.value().to_string())
    }
}

/// Owned header/cookie maps, for callers that are not actix handlers.
/// Header names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
}

impl RequestParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.insert(name.to_string(), value.into());
        self
    }
}

impl CredentialSource for RequestParts {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn cookie_value(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }
}
