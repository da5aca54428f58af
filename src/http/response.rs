//! HTTP response building module
//!
//! Builders for the responses the host sends, plus the conversion of a
//! [`FunctionResponse`] into a hyper response.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::config::HttpConfig;
use crate::function::FunctionResponse;

/// Methods accepted on the function route
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// Convert what the function produced into the wire response
pub fn build_function_response(
    resp: FunctionResponse,
    http_config: &HttpConfig,
) -> Response<Full<Bytes>> {
    let status = resp.status;
    let mut builder = Response::builder()
        .status(status)
        .header("Server", &http_config.server_name);

    for (key, value) in &resp.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    if http_config.enable_cors {
        builder = builder.header("Access-Control-Allow-Origin", "*");
    }

    builder
        .body(Full::new(Bytes::from(resp.body)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            plain(500, "500 Internal Server Error")
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    plain(404, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", ALLOWED_METHODS)
        .body(Full::new(Bytes::from("405 Method Not Allowed")))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from("405 Method Not Allowed")))
        })
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(204)
        .header("Allow", ALLOWED_METHODS);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
            .header("Access-Control-Allow-Headers", "Content-Type")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    plain(413, "413 Payload Too Large")
}

/// Build health check response
pub fn build_health_response(status: &str) -> Response<Full<Bytes>> {
    plain(200, status)
}

fn plain(status: u16, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|e| {
            log_build_error(&status.to_string(), &e);
            Response::new(Full::new(Bytes::from(body.to_string())))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
