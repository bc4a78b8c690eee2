//! Static file serving module
//!
//! Maps URL paths to files under the served root directory and builds
//! responses with MIME type detection and conditional request support.

use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Index files tried when a directory path is requested
const INDEX_FILES: &[&str] = &["index.html", "index.htm"];

/// Serve a file from the root directory for the request path
///
/// Missing files, unreadable files, and traversal attempts all yield 404.
pub async fn serve(ctx: &RequestContext<'_>, root: &str) -> Response<Full<Bytes>> {
    match load(root, ctx.path).await {
        Some((content, content_type)) => build_file_response(
            &content,
            content_type,
            ctx.if_none_match.as_deref(),
            ctx.is_head,
        ),
        None => http::build_404_response(),
    }
}

/// Resolve a URL path against the root directory and read the file
pub async fn load(root: &str, path: &str) -> Option<(Vec<u8>, &'static str)> {
    let file_path = resolve_path(root, path)?;

    let content = match fs::read(&file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {}",
                file_path.display(),
                e
            ));
            return None;
        }
    };

    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));

    Some((content, content_type))
}

/// Map a URL path to a filesystem path under the root directory
///
/// Returns None if the path does not exist or escapes the root. The
/// canonicalized-prefix check is what actually blocks traversal; the
/// `..` strip just keeps the join from leaving the root in the common
/// case before canonicalization.
fn resolve_path(root: &str, path: &str) -> Option<PathBuf> {
    let clean_path = path.trim_start_matches('/').replace("..", "");

    let mut file_path = Path::new(root).join(&clean_path);

    let root_canonical = match Path::new(root).canonicalize() {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Root directory not found or inaccessible '{root}': {e}"
            ));
            return None;
        }
    };

    // Directory paths fall back to index files
    if file_path.is_dir() || clean_path.is_empty() || clean_path.ends_with('/') {
        for index_file in INDEX_FILES {
            let index_path = file_path.join(index_file);
            if index_path.is_file() {
                file_path = index_path;
                break;
            }
        }
    }

    // File not found is common (404), no need to log at warning level
    let Ok(file_path_canonical) = file_path.canonicalize() else {
        return None;
    };
    if !file_path_canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            path,
            file_path_canonical.display()
        ));
        return None;
    }
    if !file_path_canonical.is_file() {
        return None;
    }

    Some(file_path_canonical)
}

/// Build static file response with `ETag` support
fn build_file_response(
    data: &[u8],
    content_type: &str,
    if_none_match: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(data);

    // Check if client has cached version
    if cache::check_etag_match(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    // The builder records Content-Length from the full entity before
    // dropping the body for HEAD
    http::build_cached_response(Bytes::from(data.to_owned()), content_type, &etag, is_head)
}
