//! CORS header injection module
//!
//! Every response the server produces passes through [`CorsLayer::apply`]
//! as its final header step, so success and error responses alike carry
//! the `Access-Control-Allow-*` headers.

use crate::config::CorsConfig;
use hyper::header::{
    HeaderMap, HeaderValue, InvalidHeaderValue, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};

/// Pre-validated CORS header values
///
/// Built once at startup from [`CorsConfig`] so per-request application
/// is a plain insert with no parsing or failure path.
#[derive(Debug, Clone)]
pub struct CorsLayer {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsLayer {
    /// Validate the configured header values
    ///
    /// Fails at startup if a configured value is not a legal header value,
    /// rather than silently dropping headers per request.
    pub fn new(cfg: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            allow_origin: HeaderValue::from_str(&cfg.allow_origin)?,
            allow_methods: HeaderValue::from_str(&cfg.allow_methods)?,
            allow_headers: HeaderValue::from_str(&cfg.allow_headers)?,
        })
    }

    /// Insert the three CORS headers into a response header map
    ///
    /// Applied unconditionally regardless of status code.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }
}

impl Default for CorsLayer {
    fn default() -> Self {
        Self::new(&CorsConfig::default()).expect("default CORS values are valid header values")
    }
}
