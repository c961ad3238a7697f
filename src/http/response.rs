use std::time::SystemTime;

use bytes::Bytes;
use tokio::fs::File;

/// Value of the `Server` header.
pub const SERVER_NAME: &str = concat!("Lantern/", env!("CARGO_PKG_VERSION"));

/// HTTP status codes produced by the server.
///
/// - `Ok` (200): File served
/// - `BadRequest` (400): Malformed or oversized request head
/// - `Forbidden` (403): Path escapes the document root or cannot be opened
/// - `NotFound` (404): No such file
/// - `MethodNotAllowed` (405): Anything but GET or HEAD
/// - `RequestTimeout` (408): Client stopped sending mid-head
/// - `InternalServerError` (500): Unexpected filesystem failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 408 Request Timeout
    RequestTimeout,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::RequestTimeout => 408,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Where the response payload comes from.
#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Bytes),
    /// An open file streamed as-is; `len` is its size when it was opened.
    File { file: File, len: u64 },
}

impl Body {
    /// Number of bytes the body will put on the wire.
    pub fn len(&self) -> u64 {
        match self {
            Body::Empty => 0,
            Body::Bytes(b) => b.len() as u64,
            Body::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
///
/// Headers are kept in the order they go on the wire.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// `build` lays the headers out as `Date`, `Server`, `Content-Length`,
/// `Connection`, `Content-Type`, then any extra headers in insertion order.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .content_type("text/css")
///     .body(Bytes::from_static(b"p {}"))
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    content_type: Option<&'static str>,
    headers: Vec<(String, String)>,
    body: Body,
    date: Option<SystemTime>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            headers: Vec::new(),
            body: Body::Empty,
            date: None,
        }
    }

    pub fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Adds an extra header, emitted after the standard ones.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::Bytes(body.into());
        self
    }

    pub fn file(mut self, file: File, len: u64) -> Self {
        self.body = Body::File { file, len };
        self
    }

    /// Overrides the `Date` header, which otherwise is the build time.
    pub fn date(mut self, date: SystemTime) -> Self {
        self.date = Some(date);
        self
    }

    pub fn build(self) -> Response {
        let date = self.date.unwrap_or_else(SystemTime::now);

        let mut headers = vec![
            ("Date".to_string(), httpdate::fmt_http_date(date)),
            ("Server".to_string(), SERVER_NAME.to_string()),
            ("Content-Length".to_string(), self.body.len().to_string()),
            ("Connection".to_string(), "close".to_string()),
        ];
        if let Some(content_type) = self.content_type {
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }
        headers.extend(self.headers);

        Response {
            status: self.status,
            headers,
            body: self.body,
        }
    }
}

impl Response {
    /// A 200 response streaming `file`.
    pub fn file(file: File, len: u64, content_type: &'static str) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .content_type(content_type)
            .file(file, len)
            .build()
    }

    /// A header-only response for `status`.
    pub fn error(status: StatusCode) -> Self {
        ResponseBuilder::new(status).build()
    }

    /// A 405 response naming the methods that are served.
    pub fn method_not_allowed() -> Self {
        ResponseBuilder::new(StatusCode::MethodNotAllowed)
            .header("Allow", "GET, HEAD")
            .build()
    }

    /// Looks a header up by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
