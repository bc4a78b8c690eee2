//! End-to-end tests
//!
//! Each test binds a real server instance on port 0, talks raw HTTP/1.1
//! over a TCP socket, and checks status line, headers, and body.

use corsd::config::{Config, CorsConfig, LoggingConfig, PerformanceConfig, ServerConfig};
use corsd::server::Server;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

static DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Create a unique scratch directory for one test
fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "corsd-test-{}-{}",
        std::process::id(),
        DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).expect("failed to create scratch dir");
    dir
}

fn test_config(root: &Path, port: u16) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            root: root.to_string_lossy().into_owned(),
            workers: None,
        },
        cors: CorsConfig::default(),
        logging: LoggingConfig {
            access_log: false,
            access_log_format: "common".to_string(),
            access_log_file: None,
            error_log_file: None,
        },
        performance: PerformanceConfig {
            keep_alive_timeout: 0,
            read_timeout: 5,
            write_timeout: 5,
            max_connections: None,
        },
    }
}

/// Bind a server on port 0, spawn its accept loop, return the address
fn start_server(root: &Path) -> SocketAddr {
    let server = Server::bind(test_config(root, 0)).expect("bind on port 0 should succeed");
    let addr = server.local_addr().expect("bound server has an address");
    tokio::spawn(async move {
        let _ = server.serve().await;
    });
    addr
}

/// Send one raw HTTP/1.1 request and read the response to EOF
async fn request(addr: SocketAddr, method: &str, path: &str) -> (u16, Vec<(String, String)>, Vec<u8>) {
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");
    let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(raw.as_bytes()).await.expect("write failed");

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("read failed");

    parse_response(&response)
}

fn parse_response(raw: &[u8]) -> (u16, Vec<(String, String)>, Vec<u8>) {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator in response");
    let head = String::from_utf8(raw[..split].to_vec()).expect("non-UTF8 header block");
    let body = raw[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next().expect("empty response");
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .expect("malformed status line")
        .parse()
        .expect("non-numeric status");

    let headers = lines
        .filter_map(|line| {
            line.split_once(':')
                .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        })
        .collect();

    (status, headers, body)
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == &name.to_ascii_lowercase())
        .map(|(_, v)| v.as_str())
}

fn assert_cors_headers(headers: &[(String, String)]) {
    assert_eq!(header(headers, "access-control-allow-origin"), Some("*"));
    assert_eq!(
        header(headers, "access-control-allow-methods"),
        Some("GET, POST, OPTIONS")
    );
    assert_eq!(
        header(headers, "access-control-allow-headers"),
        Some("Content-Type")
    );
}

#[tokio::test]
async fn get_existing_file_returns_content_with_cors() {
    let dir = scratch_dir();
    std::fs::write(dir.join("hello.txt"), "hi").expect("write test file");
    let addr = start_server(&dir);

    let (status, headers, body) = request(addr, "GET", "/hello.txt").await;

    assert_eq!(status, 200);
    assert_eq!(body, b"hi");
    assert_cors_headers(&headers);
    assert_eq!(
        header(&headers, "content-type"),
        Some("text/plain; charset=utf-8")
    );
}

#[tokio::test]
async fn body_matches_disk_content_byte_for_byte() {
    let dir = scratch_dir();
    let content: Vec<u8> = (0..=255).collect();
    std::fs::write(dir.join("blob.bin"), &content).expect("write test file");
    let addr = start_server(&dir);

    let (status, headers, body) = request(addr, "GET", "/blob.bin").await;

    assert_eq!(status, 200);
    assert_eq!(body, content);
    assert_eq!(header(&headers, "content-length"), Some("256"));
    assert_eq!(
        header(&headers, "content-type"),
        Some("application/octet-stream")
    );
}

#[tokio::test]
async fn missing_file_returns_404_with_cors() {
    let dir = scratch_dir();
    let addr = start_server(&dir);

    let (status, headers, _body) = request(addr, "GET", "/no-such-file.txt").await;

    assert_eq!(status, 404);
    assert_cors_headers(&headers);
}

#[tokio::test]
async fn options_response_carries_cors() {
    let dir = scratch_dir();
    let addr = start_server(&dir);

    let (status, headers, body) = request(addr, "OPTIONS", "/anything").await;

    assert_eq!(status, 204);
    assert!(body.is_empty());
    assert_cors_headers(&headers);
}

#[tokio::test]
async fn post_gets_base_handling_with_cors() {
    let dir = scratch_dir();
    std::fs::write(dir.join("hello.txt"), "hi").expect("write test file");
    let addr = start_server(&dir);

    // POST is advertised in Access-Control-Allow-Methods but gets no
    // handling beyond the base behavior
    let (status, headers, _body) = request(addr, "POST", "/hello.txt").await;

    assert_eq!(status, 405);
    assert_cors_headers(&headers);
}

#[tokio::test]
async fn head_returns_headers_without_body() {
    let dir = scratch_dir();
    std::fs::write(dir.join("hello.txt"), "hi").expect("write test file");
    let addr = start_server(&dir);

    let (status, headers, body) = request(addr, "HEAD", "/hello.txt").await;

    assert_eq!(status, 200);
    assert!(body.is_empty());
    assert_eq!(header(&headers, "content-length"), Some("2"));
    assert_cors_headers(&headers);
}

#[tokio::test]
async fn directory_path_serves_index_file() {
    let dir = scratch_dir();
    std::fs::write(dir.join("index.html"), "<h1>home</h1>").expect("write test file");
    let addr = start_server(&dir);

    let (status, headers, body) = request(addr, "GET", "/").await;

    assert_eq!(status, 200);
    assert_eq!(body, b"<h1>home</h1>");
    assert_eq!(
        header(&headers, "content-type"),
        Some("text/html; charset=utf-8")
    );
    assert_cors_headers(&headers);
}

#[tokio::test]
async fn traversal_outside_root_is_blocked() {
    let dir = scratch_dir();
    let addr = start_server(&dir);

    let (status, headers, _body) = request(addr, "GET", "/../../../../etc/passwd").await;

    assert_eq!(status, 404);
    assert_cors_headers(&headers);
}

#[tokio::test]
async fn conditional_request_returns_304_with_cors() {
    let dir = scratch_dir();
    std::fs::write(dir.join("hello.txt"), "hi").expect("write test file");
    let addr = start_server(&dir);

    let (_, headers, _) = request(addr, "GET", "/hello.txt").await;
    let etag = header(&headers, "etag").expect("200 response carries ETag").to_string();

    let mut stream = TcpStream::connect(addr).await.expect("connect failed");
    let raw = format!(
        "GET /hello.txt HTTP/1.1\r\nHost: localhost\r\nIf-None-Match: {etag}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(raw.as_bytes()).await.expect("write failed");
    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .expect("read failed");
    let (status, headers, body) = parse_response(&response);

    assert_eq!(status, 304);
    assert!(body.is_empty());
    assert_cors_headers(&headers);
}

#[tokio::test]
async fn binding_occupied_port_fails() {
    let dir = scratch_dir();

    let first = Server::bind(test_config(&dir, 0)).expect("first bind should succeed");
    let port = first.local_addr().expect("bound server has an address").port();

    let second = Server::bind(test_config(&dir, port));
    assert!(second.is_err(), "second bind on port {port} should fail");
}

#[tokio::test]
async fn two_instances_serve_independently() {
    let dir_a = scratch_dir();
    let dir_b = scratch_dir();
    std::fs::write(dir_a.join("a.txt"), "from a").expect("write test file");
    std::fs::write(dir_b.join("b.txt"), "from b").expect("write test file");

    let addr_a = start_server(&dir_a);
    let addr_b = start_server(&dir_b);

    let (status_a, _, body_a) = request(addr_a, "GET", "/a.txt").await;
    let (status_b, _, body_b) = request(addr_b, "GET", "/b.txt").await;
    assert_eq!(status_a, 200);
    assert_eq!(body_a, b"from a");
    assert_eq!(status_b, 200);
    assert_eq!(body_b, b"from b");

    // Each instance only knows its own root
    let (cross_status, _, _) = request(addr_a, "GET", "/b.txt").await;
    assert_eq!(cross_status, 404);
}
