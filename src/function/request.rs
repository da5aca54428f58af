//! Inbound request model and `name` resolution

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::Value;

/// The triggering request as the function sees it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundRequest {
    /// Decoded query string; the first occurrence of a key wins
    pub query: HashMap<String, String>,
    /// Parsed JSON body, if any
    pub body: Option<Value>,
}

impl InboundRequest {
    pub fn new(query: Option<&str>, body: Option<Value>) -> Self {
        Self {
            query: parse_query(query),
            body,
        }
    }

    /// Resolve `name`: a non-empty query parameter wins, otherwise the
    /// body's `name` field if it is a truthy scalar.
    pub fn name(&self) -> Option<Cow<'_, str>> {
        self.query
            .get("name")
            .filter(|name| !name.is_empty())
            .map(|name| Cow::Borrowed(name.as_str()))
            .or_else(|| self.body_name())
    }

    /// `null`, `false`, `0` and `""` count as absent. Other scalars are
    /// rendered as text; arrays and objects are not names.
    fn body_name(&self) -> Option<Cow<'_, str>> {
        match self.body.as_ref()?.get("name")? {
            Value::String(s) if !s.is_empty() => Some(Cow::Borrowed(s.as_str())),
            Value::Bool(true) => Some(Cow::Borrowed("true")),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(Cow::Owned(n.to_string())),
            _ => None,
        }
    }
}

/// Decode an `application/x-www-form-urlencoded` query string
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(q) = query {
        for (key, value) in url::form_urlencoded::parse(q.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }
    params
}

/// Parse a request body as JSON. An empty (or whitespace-only) body is `None`.
pub fn parse_body(bytes: &[u8]) -> Result<Option<Value>, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes).map(Some)
}
