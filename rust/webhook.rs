//! Webhook request/response types shared by integrations and the HTTP server

use crate::error::Result;
use serde::Serialize;
use serde_json::json;
use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Method {
    Get,
    Post,
    Options,
    Other,
}

impl From<&str> for Method {
    fn from(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "OPTIONS" => Method::Options,
            _ => Method::Other,
        }
    }
}

/// Route an integration exposes, relative to the integration's root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookRoute {
    pub method: Method,
    pub url_suffix: &'static str,
    pub label: &'static str,
}

impl WebhookRoute {
    pub fn get(url_suffix: &'static str, label: &'static str) -> Self {
        Self {
            method: Method::Get,
            url_suffix,
            label,
        }
    }

    pub fn post(url_suffix: &'static str, label: &'static str) -> Self {
        Self {
            method: Method::Post,
            url_suffix,
            label,
        }
    }

    /// Request path served by this route; the empty suffix is the root.
    pub fn path(&self) -> &'static str {
        if self.url_suffix.is_empty() {
            "/"
        } else {
            self.url_suffix
        }
    }

    pub fn matches(&self, request: &WebhookRequest) -> bool {
        self.method == request.method && self.path() == request.path
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl WebhookRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::new(Method::Post, path)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl WebhookResponse {
    pub fn empty_success() -> Self {
        Self {
            status: 200,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub fn blob_success(body: impl Into<Vec<u8>>, content_type: &str) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: body.into(),
        }
    }

    pub fn json<T: Serialize>(body: &T) -> Result<Self> {
        Ok(Self::blob_success(serde_json::to_vec(body)?, "application/json"))
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: json!({ "error": message }).to_string().into_bytes(),
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::error(404, &format!("Not found: {}", path))
    }

    pub fn bad_request(message: &str) -> Self {
        Self::error(400, message)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// HTTP/1.1 wire form, with permissive CORS headers.
    pub fn to_http_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, status_text(self.status));
        if let Some(content_type) = &self.content_type {
            head.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        head.push_str(
            "Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n",
        );
        head.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", self.body.len()));

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
