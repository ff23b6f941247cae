//! Request binding.
//!
//! # Responsibilities
//! - Collect body, path, query and header values into one JSON object
//! - Deserialize that object into a handler's input type
//!
//! # Design Decisions
//! - Sources are applied in order: body, path, query, headers
//! - Binding is additive: a later source only fills a field that is absent,
//!   null or an empty string
//! - An empty body is not an error; bodies of unknown content type are
//!   ignored
//! - Path, query and header values bind as strings

use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// Client-caused failure to bind a request.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("failed to read request body: {0}")]
    Body(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("invalid path parameters: {0}")]
    Path(String),

    #[error("header '{name}' is not valid UTF-8")]
    Header { name: String },

    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Accumulates request fields before deserialization.
#[derive(Debug, Default)]
pub struct Binding {
    fields: Map<String, Value>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a request body according to its content type.
    pub fn bind_body(
        &mut self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<(), BindingError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());

        match mime.as_deref() {
            None | Some("application/json") => self.bind_json(body),
            Some(m) if m.ends_with("+json") => self.bind_json(body),
            Some("application/x-www-form-urlencoded") => {
                self.bind_pairs(url::form_urlencoded::parse(body));
                Ok(())
            }
            Some(other) => {
                tracing::debug!(content_type = %other, "Ignoring body of unsupported content type");
                Ok(())
            }
        }
    }

    fn bind_json(&mut self, body: &[u8]) -> Result<(), BindingError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| BindingError::MalformedBody(e.to_string()))?;
        match value {
            Value::Object(object) => {
                for (key, value) in object {
                    self.merge(key, value);
                }
                Ok(())
            }
            _ => Err(BindingError::NotAnObject),
        }
    }

    /// Bind string key/value pairs (path or query parameters).
    pub fn bind_pairs<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.merge(key.into(), Value::String(value.into()));
        }
    }

    /// Bind headers under their lowercase names.
    pub fn bind_headers(&mut self, headers: &HeaderMap) -> Result<(), BindingError> {
        for (name, value) in headers {
            let value = value.to_str().map_err(|_| BindingError::Header {
                name: name.to_string(),
            })?;
            self.merge(name.as_str().to_string(), Value::String(value.to_string()));
        }
        Ok(())
    }

    /// Deserialize the collected fields.
    pub fn finish<T: DeserializeOwned>(self) -> Result<T, BindingError> {
        serde_json::from_value(Value::Object(self.fields))
            .map_err(|e| BindingError::Invalid(e.to_string()))
    }

    fn merge(&mut self, key: String, value: Value) {
        match self.fields.get(&key) {
            Some(existing) if !is_unset(existing) => {}
            _ => {
                self.fields.insert(key, value);
            }
        }
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Input {
        id: String,
        name: String,
        page: String,
        #[serde(rename = "x-tenant")]
        tenant: String,
    }

    #[test]
    fn test_sources_bind_in_order_without_overwriting() {
        let mut binding = Binding::new();
        binding
            .bind_body(Some("application/json"), br#"{"id": "from-body", "name": ""}"#)
            .unwrap();
        binding.bind_pairs([("id", "from-path")]);
        binding.bind_pairs([("name", "from-query"), ("page", "2")]);

        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", HeaderValue::from_static("acme"));
        headers.insert("page", HeaderValue::from_static("9"));
        binding.bind_headers(&headers).unwrap();

        let input: Input = binding.finish().unwrap();
        assert_eq!(
            input,
            Input {
                id: "from-body".into(),
                name: "from-query".into(),
                page: "2".into(),
                tenant: "acme".into(),
            }
        );
    }

    #[test]
    fn test_null_fields_are_filled_by_later_sources() {
        let mut binding = Binding::new();
        binding.bind_body(None, br#"{"id": null}"#).unwrap();
        binding.bind_pairs([("id", "from-path")]);

        let input: Input = binding.finish().unwrap();
        assert_eq!(input.id, "from-path");
    }

    #[test]
    fn test_empty_body_yields_zero_value() {
        let mut binding = Binding::new();
        binding.bind_body(Some("application/json"), b"  \n").unwrap();
        let input: Input = binding.finish().unwrap();
        assert_eq!(input, Input::default());
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let mut binding = Binding::new();
        let err = binding.bind_body(None, b"{\"name\": ").unwrap_err();
        assert!(matches!(err, BindingError::MalformedBody(_)));
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        let mut binding = Binding::new();
        let err = binding.bind_body(Some("application/json"), b"[1, 2]").unwrap_err();
        assert!(matches!(err, BindingError::NotAnObject));
    }

    #[test]
    fn test_form_body_binds_pairs() {
        let mut binding = Binding::new();
        binding
            .bind_body(Some("application/x-www-form-urlencoded; charset=utf-8"), b"name=big+widget")
            .unwrap();
        let input: Input = binding.finish().unwrap();
        assert_eq!(input.name, "big widget");
    }

    #[test]
    fn test_unknown_content_type_is_ignored() {
        let mut binding = Binding::new();
        binding.bind_body(Some("text/plain"), b"not json at all").unwrap();
        let input: Input = binding.finish().unwrap();
        assert_eq!(input, Input::default());
    }

    #[test]
    fn test_type_mismatch_is_invalid() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Typed {
            count: u32,
        }

        let mut binding = Binding::new();
        binding.bind_body(None, br#"{"count": "many"}"#).unwrap();
        let err = binding.finish::<Typed>().unwrap_err();
        assert!(matches!(err, BindingError::Invalid(_)));
    }

    #[test]
    fn test_opaque_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-raw", HeaderValue::from_bytes(&[0xfa, 0xfb]).unwrap());
        let err = Binding::new().bind_headers(&headers).unwrap_err();
        assert!(matches!(err, BindingError::Header { ref name } if name == "x-raw"));
    }
}
