//! HTTP client abstraction.
//!
//! The engine never talks to the network directly. It builds
//! [`HttpRequest`] values and hands them to an [`HttpClient`], so the
//! CLI can plug in a real client and tests can plug in
//! [`FakeGhost`](crate::FakeGhost).

use std::fmt;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
            Method::Put => f.write_str("PUT"),
        }
    }
}

/// A single file part plus optional text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartForm {
    /// Form field name of the file part.
    pub field: String,
    /// File name sent with the part.
    pub file_name: String,
    /// MIME type of the part.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// Additional text fields.
    pub text_fields: Vec<(String, String)>,
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// Encoded JSON.
    Json(Vec<u8>),
    /// multipart/form-data.
    Multipart(MultipartForm),
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: RequestBody,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Looks up a header, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Value of the Content-Type header.
    pub content_type: Option<String>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a JSON response.
    pub fn json(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: Some("application/json; charset=utf-8".into()),
            body: body.into(),
        }
    }

    /// Creates a plain text response.
    pub fn text(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: Some("text/plain; charset=utf-8".into()),
            body: body.into(),
        }
    }

    /// Returns true if the body is declared as JSON.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"))
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body as trimmed text.
    pub fn text_body(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. An `Err`
/// means the request did not complete (connection, TLS, timeout);
/// any response the server sends, whatever its status, is `Ok`.
pub trait HttpClient: Send + Sync {
    /// Sends a request and waits for the full response.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_and_header_lookup() {
        let request = HttpRequest::new(Method::Get, "https://blog.example/ghost/api/admin/tiers/")
            .with_header("Authorization", "Ghost abc");

        assert_eq!(request.header("authorization"), Some("Ghost abc"));
        assert_eq!(request.header("content-type"), None);
        assert_eq!(request.body, RequestBody::Empty);
        assert_eq!(request.method.to_string(), "GET");
    }

    #[test]
    fn response_classification() {
        let response = HttpResponse::json(201, "{}");
        assert!(response.is_json());
        assert!(response.is_success());

        let response = HttpResponse::text(502, " Bad Gateway \n");
        assert!(!response.is_json());
        assert!(!response.is_success());
        assert_eq!(response.text_body(), "Bad Gateway");

        let response = HttpResponse {
            status: 200,
            content_type: None,
            body: Vec::new(),
        };
        assert!(!response.is_json());
    }
}
