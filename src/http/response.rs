//! HTTP/1.1 response serialization.
//!
//! Converts a [`Reply`] into wire bytes: status line, `Content-Type`,
//! `Content-Length`, any extra headers, a blank line, then the body.

use bytes::{BufMut, BytesMut};

use super::{Headers, Reply, StatusCode};

/// Content type used when a reply does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use wirehttp::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::OK).body(r#"{"status":"ok"}"#);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    content_type: String,
    headers: Headers,
    body: Vec<u8>,
}

impl Response {
    /// Creates a response with the given status, the default content type and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Adds an extra header.
    ///
    /// `Content-Type` replaces the default content type instead of adding a
    /// second header; `Content-Length` is ignored because it is always computed.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    /// Adds an extra header in place. Same rules as [`header`](Self::header).
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if name.eq_ignore_ascii_case("content-type") {
            self.content_type = value.into();
        } else if !name.eq_ignore_ascii_case("content-length") {
            self.headers.insert(name, value);
        }
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Serializes the response using HTTP/1.1 wire format.
    ///
    /// `Content-Length` is the byte length of the body.
    pub fn into_bytes(self) -> BytesMut {
        let content_length = self.body.len();
        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );
        buf.put(format!("Content-Type: {}\r\n", self.content_type).as_bytes());
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        buf.put(self.headers.to_string().as_bytes());
        buf.put(&b"\r\n"[..]);
        buf.put(self.body.as_slice());

        buf
    }
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        let (payload, status, headers) = reply.into_parts();
        let mut response = Response::new(status).body_bytes(payload.into_bytes());
        for (name, value) in headers.iter() {
            response.add_header(name, value);
        }
        response
    }
}
