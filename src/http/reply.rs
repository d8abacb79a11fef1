//! Handler results.
//!
//! A [`Reply`] is what route handlers and middleware produce. It has exactly
//! three shapes, mirroring how handlers describe a response:
//!
//! - [`Reply::Body`]: a body, sent with `200 OK`.
//! - [`Reply::WithStatus`]: a body and a status code.
//! - [`Reply::WithHeaders`]: a body, a status code and extra headers.
//!
//! Tuples convert into the matching shape, so handlers can write
//! `("Rate limit exceeded", StatusCode::TOO_MANY_REQUESTS).into()`.

use std::io;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::Formatter;

use super::{Headers, StatusCode};

/// The body of a [`Reply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Sent verbatim as UTF-8 text.
    Text(String),
    /// Encoded with `serde_json` before sending.
    Json(Value),
    /// Sent verbatim; used for file contents.
    Bytes(Vec<u8>),
}

impl Payload {
    /// Encodes the payload into the bytes written on the wire.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(s) => s.into_bytes(),
            Self::Json(v) => encode_json(&v),
            Self::Bytes(b) => b,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Json(_) => false,
            Self::Bytes(b) => b.is_empty(),
        }
    }
}

// Compact JSON with a space after `:` and `,`, e.g. `{"message": "hi"}`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

fn encode_json(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    match value.serialize(&mut ser) {
        Ok(()) => out,
        Err(_) => value.to_string().into_bytes(),
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

/// The result of a handler: body, body + status, or body + status + headers.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wirehttp::http::{Reply, StatusCode};
///
/// let reply: Reply = json!({"message": "hi"}).into();
/// assert_eq!(reply.status(), StatusCode::OK);
///
/// let reply: Reply = ("Rate limit exceeded", 429u16).into();
/// assert_eq!(reply.status(), StatusCode::TOO_MANY_REQUESTS);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Body(Payload),
    WithStatus(Payload, StatusCode),
    WithHeaders(Payload, StatusCode, Headers),
}

impl Reply {
    /// A bare `200 OK` reply.
    pub fn new(body: impl Into<Payload>) -> Self {
        Self::Body(body.into())
    }

    /// An empty-bodied reply with the given status.
    pub fn empty(status: impl Into<StatusCode>) -> Self {
        Self::WithStatus(Payload::default(), status.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(_) => StatusCode::OK,
            Self::WithStatus(_, status) | Self::WithHeaders(_, status, _) => *status,
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Self::Body(p) | Self::WithStatus(p, _) | Self::WithHeaders(p, _, _) => p,
        }
    }

    /// Extra headers, present only in the [`Reply::WithHeaders`] shape.
    pub fn headers(&self) -> Option<&Headers> {
        match self {
            Self::WithHeaders(_, _, headers) => Some(headers),
            _ => None,
        }
    }

    /// Replaces the status, keeping body and any extra headers.
    #[must_use]
    pub fn with_status(self, status: impl Into<StatusCode>) -> Self {
        let status = status.into();
        match self {
            Self::Body(p) | Self::WithStatus(p, _) => Self::WithStatus(p, status),
            Self::WithHeaders(p, _, h) => Self::WithHeaders(p, status, h),
        }
    }

    /// Adds an extra header, promoting the reply to the [`Reply::WithHeaders`] shape.
    #[must_use]
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (payload, status, mut headers) = self.into_parts();
        headers.insert(name, value);
        Self::WithHeaders(payload, status, headers)
    }

    /// Splits into body, status and extra headers (empty for the shorter shapes).
    pub fn into_parts(self) -> (Payload, StatusCode, Headers) {
        match self {
            Self::Body(p) => (p, StatusCode::OK, Headers::new()),
            Self::WithStatus(p, s) => (p, s, Headers::new()),
            Self::WithHeaders(p, s, h) => (p, s, h),
        }
    }
}

impl From<Payload> for Reply {
    fn from(p: Payload) -> Self {
        Self::Body(p)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Self::Body(s.into())
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Self::Body(s.into())
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Self::Body(v.into())
    }
}

impl<P, S> From<(P, S)> for Reply
where
    P: Into<Payload>,
    S: Into<StatusCode>,
{
    fn from((body, status): (P, S)) -> Self {
        Self::WithStatus(body.into(), status.into())
    }
}

impl<P, S> From<(P, S, Headers)> for Reply
where
    P: Into<Payload>,
    S: Into<StatusCode>,
{
    fn from((body, status, headers): (P, S, Headers)) -> Self {
        Self::WithHeaders(body.into(), status.into(), headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shapes_from_tuples() {
        assert!(matches!(Reply::from("hi"), Reply::Body(_)));
        assert!(matches!(Reply::from(("hi", StatusCode::CREATED)), Reply::WithStatus(_, s) if s == StatusCode::CREATED));
        let reply = Reply::from(("hi", StatusCode::OK, Headers::from([("X-A", "1")])));
        assert_eq!(reply.headers().and_then(|h| h.get("x-a")), Some("1"));
    }

    #[test]
    fn with_header_keeps_status() {
        let reply = Reply::from(("gone", 410u16)).with_header("X-Why", "moved");
        assert_eq!(reply.status(), StatusCode::GONE);
        assert_eq!(reply.payload(), &Payload::from("gone"));
        assert_eq!(reply.headers().map(Headers::len), Some(1));
    }

    #[test]
    fn with_status_keeps_headers() {
        let reply = Reply::new("x").with_header("A", "b").with_status(StatusCode::ACCEPTED);
        assert_eq!(reply.status(), StatusCode::ACCEPTED);
        assert!(reply.headers().is_some());
    }

    #[test]
    fn json_payload_encodes() {
        let bytes = Payload::from(json!({"message": "hi"})).into_bytes();
        assert_eq!(bytes, br#"{"message": "hi"}"#);
        let bytes = Payload::from(json!({"a": [1, 2], "b": {}})).into_bytes();
        assert_eq!(bytes, br#"{"a": [1, 2], "b": {}}"#);
    }
}
