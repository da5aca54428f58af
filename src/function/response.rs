//! Outbound response model handed back to the runtime

use hyper::StatusCode;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// What the function produced for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl FunctionResponse {
    fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), TEXT_PLAIN.to_string())],
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::text(StatusCode::OK, body)
    }

    pub fn bad_request(body: impl Into<String>) -> Self {
        Self::text(StatusCode::BAD_REQUEST, body)
    }

    pub fn bad_gateway(body: impl Into<String>) -> Self {
        Self::text(StatusCode::BAD_GATEWAY, body)
    }

    pub fn internal_error(body: impl Into<String>) -> Self {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, body)
    }
}

impl Default for FunctionResponse {
    fn default() -> Self {
        Self::ok(String::new())
    }
}
