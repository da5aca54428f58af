//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: health probes, route and method
//! checks, body limits, then hand-off to the function.

use crate::config::AppState;
use crate::function::{self, FunctionResponse, InboundRequest};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let mut entry = access_entry(&req, remote_addr);

    let (response, invocation_id) = route_request(req, &state).await;

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().lower()).unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        entry.invocation_id = invocation_id;
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(response)
}

fn access_entry<B>(req: &Request<B>, remote_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = format!("{:?}", req.version()).trim_start_matches("HTTP/").to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}

/// Route request; the second value is the invocation id when the function ran
async fn route_request<B>(
    req: Request<B>,
    state: &Arc<AppState>,
) -> (Response<Full<Bytes>>, Option<u64>)
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let config = &state.config;
    let path = req.uri().path();

    // Health probes first, always cheap
    if config.health.enabled
        && (path == config.health.liveness_path || path == config.health.readiness_path)
    {
        return (http::build_health_response("ok"), None);
    }

    if path != config.function.route {
        return (http::build_404_response(), None);
    }

    if let Some(resp) = check_http_method(req.method(), config.http.enable_cors) {
        return (resp, None);
    }

    if let Some(resp) = check_body_size(&req, config.http.max_body_size) {
        return (resp, None);
    }

    let query = req.uri().query().map(ToString::to_string);
    let body = match read_body(req.into_body(), config.http.max_body_size).await {
        Ok(body) => body,
        Err(resp) => return (resp, None),
    };

    let inbound = InboundRequest::new(query.as_deref(), body);
    let id = state.next_invocation_id();
    let resp = run_function(inbound, state, id).await;
    logger::log_invocation(&config.function.name, id, resp.status.as_u16());

    (http::build_function_response(resp, &config.http), Some(id))
}

/// Run the function in its own task so a panic becomes a 500
async fn run_function(inbound: InboundRequest, state: &Arc<AppState>, id: u64) -> FunctionResponse {
    let task_state = Arc::clone(state);
    let task = tokio::spawn(async move {
        function::invoke(
            &inbound,
            task_state.upstream.as_ref(),
            &task_state.config.function,
        )
        .await
    });

    match task.await {
        Ok(resp) => resp,
        Err(err) => {
            logger::log_error(&format!("Invocation {id} aborted: {err}"));
            FunctionResponse::internal_error("500 Internal Server Error")
        }
    }
}

/// Check HTTP method and return early response for anything but GET/POST
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::POST => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Collect the body under the size limit and parse it as JSON.
/// Unreadable or non-JSON bodies count as no body.
async fn read_body<B>(
    body: B,
    max_body_size: u64,
) -> Result<Option<serde_json::Value>, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body exceeded {max_body_size} bytes"));
            return Err(http::build_413_response());
        }
        Err(err) => {
            logger::log_warning(&format!("Failed to read request body: {err}"));
            return Ok(None);
        }
    };

    match function::parse_body(&bytes) {
        Ok(value) => Ok(value),
        Err(err) => {
            logger::log_debug(&format!("Ignoring non-JSON request body: {err}"));
            Ok(None)
        }
    }
}
