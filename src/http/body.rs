//! Request body decoding selected by the `Content-Type` header.

use std::collections::HashMap;

use serde_json::Value;

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// A request body decoded according to its `Content-Type`.
///
/// | Content-Type contains                 | Variant             |
/// |---------------------------------------|---------------------|
/// | `application/json`                    | [`ParsedBody::Json`] |
/// | `application/x-www-form-urlencoded`   | [`ParsedBody::Form`] |
/// | anything else, or no header           | [`ParsedBody::Raw`]  |
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Form(HashMap<String, String>),
    Raw(String),
}

impl ParsedBody {
    /// Decodes `body` according to `content_type`.
    ///
    /// An empty JSON body decodes to `null` so that bodiless requests carrying a
    /// JSON content type are not rejected.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when a JSON body is not valid JSON.
    pub fn decode(content_type: Option<&str>, body: &str) -> Result<Self, serde_json::Error> {
        let content_type = content_type.unwrap_or_default();
        if content_type.contains(JSON) {
            if body.trim().is_empty() {
                return Ok(Self::Json(Value::Null));
            }
            return serde_json::from_str(body).map(Self::Json);
        }
        if content_type.contains(FORM) {
            let form = url::form_urlencoded::parse(body.as_bytes())
                .into_owned()
                .collect();
            return Ok(Self::Form(form));
        }
        Ok(Self::Raw(body.to_owned()))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&HashMap<String, String>> {
        match self {
            Self::Form(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Raw(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_body() {
        let body = ParsedBody::decode(Some("application/json; charset=utf-8"), r#"{"a":1}"#).unwrap();
        assert_eq!(body.as_json(), Some(&json!({"a": 1})));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(ParsedBody::decode(Some("application/json"), "{nope").is_err());
    }

    #[test]
    fn empty_json_is_null() {
        let body = ParsedBody::decode(Some("application/json"), "").unwrap();
        assert_eq!(body, ParsedBody::Json(Value::Null));
    }

    #[test]
    fn form_body_is_percent_decoded() {
        let body = ParsedBody::decode(
            Some("application/x-www-form-urlencoded"),
            "name=Jane+Doe&city=S%C3%A3o%20Paulo&name=Last",
        )
        .unwrap();
        let form = body.as_form().unwrap();
        assert_eq!(form.get("name").map(String::as_str), Some("Last"));
        assert_eq!(form.get("city").map(String::as_str), Some("São Paulo"));
    }

    #[test]
    fn other_types_stay_raw() {
        let body = ParsedBody::decode(Some("text/plain"), "hello").unwrap();
        assert_eq!(body.as_raw(), Some("hello"));
        let body = ParsedBody::decode(None, "{}").unwrap();
        assert_eq!(body.as_raw(), Some("{}"));
    }
}
