//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, static
//! file dispatch, CORS header finalization, and access logging.

use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::server::ServerState;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
}

/// Main entry point for HTTP request handling
///
/// Every response produced here, success or error, passes through the
/// CORS layer before it is returned.
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<ServerState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let http_version = version_str(req.version());
    let referer = header_string(&req, "referer");
    let user_agent = header_string(&req, "user-agent");

    let ctx = RequestContext {
        path: &path,
        is_head: method == Method::HEAD,
        if_none_match: header_string(&req, "if-none-match"),
    };

    let mut response = dispatch(&method, &ctx, &state).await;

    // Header finalization: the CORS headers go on unconditionally,
    // whatever the status code
    state.cors.apply(response.headers_mut());

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(peer_addr.ip().to_string(), method.to_string(), path);
        entry.http_version = http_version.to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = body_bytes(&response);
        entry.referer = referer;
        entry.user_agent = user_agent;
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Dispatch by HTTP method
///
/// GET/HEAD serve files; OPTIONS gets an empty 204. POST is advertised in
/// the CORS allow-methods header but gets no handling beyond the base
/// behavior, so it lands in the 405 arm with the other methods.
async fn dispatch(
    method: &Method,
    ctx: &RequestContext<'_>,
    state: &Arc<ServerState>,
) -> Response<Full<Bytes>> {
    match *method {
        Method::GET | Method::HEAD => static_files::serve(ctx, &state.config.server.root).await,
        Method::OPTIONS => http::build_options_response(),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            http::build_405_response()
        }
    }
}

fn header_string(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_str(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_10 => "1.0",
        _ => "1.1",
    }
}

/// Body size for the access log, taken from Content-Length
fn body_bytes(response: &Response<Full<Bytes>>) -> usize {
    response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
