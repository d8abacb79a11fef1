//! HTTP/1.x request parsing using the [`httparse`] crate.
//!
//! A request is parsed from the bytes of a single read. Everything after the
//! blank line that ends the head is the body; no `Content-Length` based
//! reassembly happens across reads.

use std::borrow::Cow;
use std::collections::HashMap;
use std::net::IpAddr;

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::{Headers, Method, ParsedBody, UnsupportedMethod};

/// Errors produced while turning raw bytes into a [`Request`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("request head is not terminated by a blank line")]
    Incomplete,

    #[error("malformed request: {0}")]
    Malformed(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error(transparent)]
    UnsupportedMethod(#[from] UnsupportedMethod),

    #[error("{part} is not valid UTF-8")]
    InvalidUtf8 { part: &'static str },

    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A parsed HTTP request.
///
/// Created by [`Request::parse`]; the connection worker then attaches the
/// client address with [`with_client_ip`](Self::with_client_ip) and decodes
/// the body with [`with_decoded_body`](Self::with_decoded_body).
///
/// # Examples
///
/// ```
/// use wirehttp::http::Request;
///
/// let raw = b"GET /hello?name=world HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let request = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/hello");
/// assert_eq!(request.query_param("name"), Some("world"));
/// assert_eq!(request.headers().get("host"), Some("localhost"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    params: HashMap<String, String>,
    headers: Headers,
    body: String,
    parsed_body: Option<ParsedBody>,
    client_ip: Option<IpAddr>,
}

impl Request {
    /// Maximum number of headers we support per request.
    const MAX_HEADERS: usize = 64;

    /// Parses a request from the bytes of one read.
    ///
    /// Trailing NUL padding is ignored.
    ///
    /// # Errors
    ///
    /// - [`ParseError::Incomplete`]: there is no blank line ending the head.
    /// - [`ParseError::Malformed`]: the request line or a header line is invalid
    ///   (for example a header without a colon).
    /// - [`ParseError::UnsupportedMethod`]: the verb is outside [`Method::ALL`].
    /// - [`ParseError::InvalidUtf8`]: a header value or the body is not UTF-8.
    ///
    /// The protocol version is not checked: any third token on the request
    /// line is accepted.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        let end = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let buf = normalize_version(&buf[..end]);
        let buf: &[u8] = &buf;

        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(ParseError::Incomplete),
        };

        let method: Method = raw_req
            .method
            .ok_or(ParseError::MissingField { field: "method" })?
            .parse()?;

        let target = raw_req
            .path
            .ok_or(ParseError::MissingField { field: "path" })?;

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
            None => (target.to_owned(), None),
        };

        let mut header_map = Headers::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            let value = std::str::from_utf8(header.value)
                .map_err(|_| ParseError::InvalidUtf8 { part: "header value" })?;
            header_map.insert(header.name, value);
        }

        let body = std::str::from_utf8(&buf[body_offset..])
            .map_err(|_| ParseError::InvalidUtf8 { part: "body" })?
            .to_owned();

        let params = query
            .as_deref()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Ok(Self {
            method,
            path,
            query,
            params,
            headers: header_map,
            body,
            parsed_body: None,
            client_ip: None,
        })
    }

    /// Attaches the address of the peer that sent this request.
    #[must_use]
    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    /// Decodes the raw body according to the `Content-Type` header.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidJson`] when a JSON body does not parse.
    pub fn with_decoded_body(mut self) -> Result<Self, ParseError> {
        let parsed = ParsedBody::decode(self.content_type(), &self.body)?;
        self.parsed_body = Some(parsed);
        Ok(self)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns a decoded query parameter value by key.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Returns the raw request body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the decoded body, once the worker has decoded it.
    pub fn parsed_body(&self) -> Option<&ParsedBody> {
        self.parsed_body.as_ref()
    }

    /// Returns the peer address, once the worker has attached it.
    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    /// Deserializes the raw body as JSON into `T`.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(&self.body)
    }

    /// Returns the route key this request dispatches to, e.g. `"GET /api/data"`.
    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

// Rewrites the version token of a `METHOD TARGET VERSION` request line to
// `HTTP/1.1` so that httparse accepts any version.
fn normalize_version(buf: &[u8]) -> Cow<'_, [u8]> {
    let Some(line_end) = buf.iter().position(|&b| b == b'\n') else {
        return Cow::Borrowed(buf);
    };
    let line = buf[..line_end].strip_suffix(b"\r").unwrap_or(&buf[..line_end]);
    let Some(last_space) = line.iter().rposition(|&b| b == b' ') else {
        return Cow::Borrowed(buf);
    };
    let version = &line[last_space + 1..];
    let spaces_before = line[..last_space].iter().filter(|&&b| b == b' ').count();
    if spaces_before != 1 || version == b"HTTP/1.1" || version == b"HTTP/1.0" {
        return Cow::Borrowed(buf);
    }

    let rest = &buf[line.len()..];
    let mut out = Vec::with_capacity(last_space + 9 + rest.len());
    out.extend_from_slice(&line[..=last_space]);
    out.extend_from_slice(b"HTTP/1.1");
    out.extend_from_slice(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.method(), Method::Get);
        assert_eq!(req.path(), "/");
        assert_eq!(req.headers().get("host"), Some("localhost"));
        assert_eq!(req.body(), "");
        assert!(req.parsed_body().is_none());
        assert!(req.client_ip().is_none());
    }

    #[test]
    fn parse_query_string() {
        let raw = b"GET /search?q=rust+lang&page=2 HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query_string(), Some("q=rust+lang&page=2"));
        assert_eq!(req.query_param("q"), Some("rust lang"));
        assert_eq!(req.query_param("page"), Some("2"));
        assert_eq!(req.route_key(), "GET /search");
    }

    #[test]
    fn body_is_everything_after_blank_line() {
        let raw = b"POST /submit HTTP/1.1\r\nContent-Type: text/plain\r\n\r\nhello\r\nworld";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.body(), "hello\r\nworld");
    }

    #[test]
    fn trailing_nul_padding_is_ignored() {
        let mut raw = b"POST /x HTTP/1.1\r\n\r\nabc".to_vec();
        raw.extend_from_slice(&[0; 16]);
        let req = Request::parse(&raw).unwrap();
        assert_eq!(req.body(), "abc");
    }

    #[test]
    fn missing_blank_line_is_incomplete() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n";
        assert!(matches!(Request::parse(raw), Err(ParseError::Incomplete)));
    }

    #[test]
    fn header_without_colon_is_malformed() {
        let raw = b"GET / HTTP/1.1\r\nNoColonHere\r\n\r\n";
        assert!(matches!(Request::parse(raw), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn garbage_request_line_is_malformed() {
        let raw = b"this is not http\r\n\r\n";
        assert!(Request::parse(raw).is_err());
    }

    #[test]
    fn protocol_version_is_not_checked() {
        for raw in [
            &b"GET /v HTTP/2.0\r\nHost: x\r\n\r\nbody"[..],
            b"GET /v FOO\r\nHost: x\r\n\r\nbody",
            b"GET /v HTTP/1.0\r\nHost: x\r\n\r\nbody",
            b"GET /v HTTP/9\nHost: x\n\nbody",
        ] {
            let req = Request::parse(raw).unwrap();
            assert_eq!(req.path(), "/v");
            assert_eq!(req.headers().get("host"), Some("x"));
            assert_eq!(req.body(), "body");
        }
    }

    #[test]
    fn request_line_needs_three_tokens() {
        assert!(Request::parse(b"GET\r\n\r\n").is_err());
        assert!(Request::parse(b"GET / HTTP/1.1 extra\r\n\r\n").is_err());
    }

    #[test]
    fn unknown_verb_is_rejected() {
        let raw = b"BREW /pot HTTP/1.1\r\n\r\n";
        assert!(matches!(
            Request::parse(raw),
            Err(ParseError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn empty_input_fails() {
        assert!(Request::parse(b"").is_err());
        assert!(Request::parse(&[0; 32]).is_err());
    }

    #[test]
    fn decode_json_body() {
        let raw = b"POST /api HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"k\":[1,2]}";
        let req = Request::parse(raw)
            .unwrap()
            .with_client_ip("10.0.0.7".parse().unwrap())
            .with_decoded_body()
            .unwrap();
        assert_eq!(
            req.parsed_body().and_then(ParsedBody::as_json),
            Some(&json!({"k": [1, 2]}))
        );
        assert_eq!(req.client_ip(), Some("10.0.0.7".parse().unwrap()));
    }

    #[test]
    fn decode_bad_json_body_fails() {
        let raw = b"POST /api HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{bad";
        let req = Request::parse(raw).unwrap();
        assert!(matches!(
            req.with_decoded_body(),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn typed_json_access() {
        #[derive(serde::Deserialize)]
        struct Login {
            user: String,
        }
        let raw = b"POST /login HTTP/1.1\r\n\r\n{\"user\":\"ada\"}";
        let req = Request::parse(raw).unwrap();
        let login: Login = req.json().unwrap();
        assert_eq!(login.user, "ada");
    }
}
