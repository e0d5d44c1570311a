//! Webhook HTTP Server
//!
//! Minimal HTTP/1.1 server on tokio (no web framework): one request per
//! connection, `Content-Length` bodies, JSON errors and permissive CORS.
//! `GET /health` is answered here; every other path goes to the hosted
//! integration.

use crate::error::{IntegrationError, Result};
use crate::host::IntegrationHost;
use crate::webhook::{Method, WebhookRequest, WebhookResponse};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info};

const READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    integration: String,
    version: String,
}

/// Request line and headers of an HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub content_length: usize,
}

pub async fn serve(host: Arc<IntegrationHost>, bind_addr: &str) -> Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!("Integration '{}' listening on {}", host.kind(), bind_addr);
    serve_listener(host, listener).await
}

pub async fn serve_listener(host: Arc<IntegrationHost>, listener: TcpListener) -> Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        let host = host.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, host).await {
                error!("Error handling connection from {}: {}", addr, e);
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, host: Arc<IntegrationHost>) -> Result<()> {
    let request = match timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(Ok(request))) => request,
        Ok(Ok(Err(rejection))) => return send_response(&mut stream, &rejection).await,
        Ok(Err(IntegrationError::Http(message))) => {
            return send_response(&mut stream, &WebhookResponse::bad_request(&message)).await;
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            return send_response(&mut stream, &WebhookResponse::error(408, "Request timeout")).await;
        }
    };

    let response = route(&host, &request).await;
    debug!("{:?} {} -> {}", request.method, request.path, response.status);
    send_response(&mut stream, &response).await
}

/// Reads one request. Oversized requests are answered with a rejection
/// instead of being read to the end.
async fn read_request(
    stream: &mut TcpStream,
) -> Result<std::result::Result<WebhookRequest, WebhookResponse>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_REQUEST_BYTES {
            return Ok(Err(WebhookResponse::error(413, "Request headers too large")));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(IntegrationError::Http("Incomplete request".to_string()));
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = parse_head(&String::from_utf8_lossy(&buffer[..header_end]))?;
    if head.content_length > MAX_REQUEST_BYTES {
        return Ok(Err(WebhookResponse::error(413, "Request body too large")));
    }

    let mut body = buffer.split_off(header_end + 4);
    while body.len() < head.content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(head.content_length);

    Ok(Ok(WebhookRequest {
        method: head.method,
        path: head.path,
        query: head.query,
        body,
    }))
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

pub async fn route(host: &IntegrationHost, request: &WebhookRequest) -> WebhookResponse {
    match (request.method, request.path.as_str()) {
        (Method::Get, "/health") => {
            let health = HealthResponse {
                status: "ok".to_string(),
                integration: host.kind().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            };
            WebhookResponse::json(&health)
                .unwrap_or_else(|e| WebhookResponse::error(500, &e.to_string()))
        }
        // CORS preflight
        (Method::Options, _) => WebhookResponse::empty_success(),
        _ => host.webhook(request).await,
    }
}

async fn send_response(stream: &mut TcpStream, response: &WebhookResponse) -> Result<()> {
    stream.write_all(&response.to_http_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Parses the request line and the headers this server cares about.
pub fn parse_head(head: &str) -> Result<RequestHead> {
    let mut lines = head.lines();
    let request_line = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| IntegrationError::Http("Empty request".to_string()))?;

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(IntegrationError::Http("Invalid request line".to_string()));
    }

    let (path, query) = match parts[1].split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (parts[1], HashMap::new()),
    };

    let mut content_length = 0;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value
                    .trim()
                    .parse()
                    .map_err(|_| IntegrationError::Http("Invalid Content-Length".to_string()))?;
            }
        }
    }

    Ok(RequestHead {
        method: Method::from(parts[0]),
        path: url_decode(path),
        query,
        content_length,
    })
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (url_decode(key), url_decode(value)),
            None => (url_decode(pair), String::new()),
        })
        .collect()
}

/// Percent-decoding; `+` is a space. Malformed escapes are kept as-is.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                decoded.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
                i += 2;
            }
            other => decoded.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
