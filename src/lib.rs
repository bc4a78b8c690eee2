//! corsd - a static file server with permissive CORS headers
//!
//! Serves files from a configured root directory over HTTP/1.1 and
//! injects `Access-Control-Allow-*` headers into every response,
//! including error responses.

pub mod config;
pub mod cors;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
