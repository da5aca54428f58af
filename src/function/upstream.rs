//! Outbound call to the fixed upstream service
//!
//! The production client is built once at startup and shared by every
//! invocation. Redirects are followed for a bounded number of hops and the
//! final body is read frame by frame under a size limit.

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderMap, LOCATION, USER_AGENT};
use hyper::{Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// The service every invocation with a `name` calls
pub const UPSTREAM_URL: &str = "http://www.google.com";

/// Redirect hops followed before the call fails
pub const MAX_REDIRECTS: usize = 10;

/// Default cap on the upstream body, in bytes
pub const DEFAULT_MAX_BODY: usize = 8 * 1024 * 1024;

const CLIENT_AGENT: &str = concat!("http-trigger/", env!("CARGO_PKG_VERSION"));

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why the outbound call produced no usable data
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("upstream unreachable: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("upstream responded with {0}")]
    Status(StatusCode),

    #[error("upstream redirect is unusable: {0}")]
    Redirect(String),

    #[error("upstream redirected more than {0} times")]
    TooManyRedirects(usize),

    #[error("failed reading upstream body: {0}")]
    Body(BoxError),

    #[error("upstream body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("upstream body is not usable: {0}")]
    Decode(String),
}

/// A single outbound GET whose outcome is either the full body or an error
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self) -> Result<Bytes, UpstreamError>;
}

/// `Upstream` backed by a pooled hyper client
pub struct HyperUpstream {
    client: Client<HttpConnector, Empty<Bytes>>,
    uri: Uri,
    max_body: usize,
}

impl HyperUpstream {
    pub fn new() -> Self {
        Self::with_uri(Uri::from_static(UPSTREAM_URL))
    }

    fn with_uri(uri: Uri) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            uri,
            max_body: DEFAULT_MAX_BODY,
        }
    }

    /// Cap the number of body bytes read from the upstream
    #[must_use]
    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }

    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    async fn read_body(&self, body: Incoming) -> Result<Bytes, UpstreamError> {
        let mut body = Limited::new(body, self.max_body);
        let mut buf = Vec::new();
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|err| match err.downcast::<LengthLimitError>() {
                Ok(_) => UpstreamError::TooLarge(self.max_body),
                Err(err) => UpstreamError::Body(err),
            })?;
            // trailers carry no data
            if let Ok(chunk) = frame.into_data() {
                buf.extend_from_slice(&chunk);
            }
        }
        Ok(Bytes::from(buf))
    }
}

impl Default for HyperUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Upstream for HyperUpstream {
    async fn fetch(&self) -> Result<Bytes, UpstreamError> {
        let mut uri = self.uri.clone();

        for _ in 0..=MAX_REDIRECTS {
            let request = Request::get(uri.clone())
                .header(USER_AGENT, CLIENT_AGENT)
                .body(Empty::new())?;

            let response = self.client.request(request).await?;
            let status = response.status();

            // a 3xx without Location (304, 300) is reported as a status failure
            if status.is_redirection() {
                if let Some(next) = redirect_target(&uri, response.headers())? {
                    uri = next;
                    continue;
                }
            }
            if !status.is_success() {
                return Err(UpstreamError::Status(status));
            }
            return self.read_body(response.into_body()).await;
        }

        Err(UpstreamError::TooManyRedirects(MAX_REDIRECTS))
    }
}

/// Resolve a `Location` header against the URI that produced it
fn redirect_target(current: &Uri, headers: &HeaderMap) -> Result<Option<Uri>, UpstreamError> {
    let Some(location) = headers.get(LOCATION) else {
        return Ok(None);
    };
    let location = location
        .to_str()
        .map_err(|e| UpstreamError::Redirect(e.to_string()))?;
    let next = url::Url::parse(&current.to_string())
        .and_then(|base| base.join(location))
        .map_err(|e| UpstreamError::Redirect(format!("'{location}': {e}")))?;
    next.as_str()
        .parse::<Uri>()
        .map(Some)
        .map_err(|e| UpstreamError::Redirect(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::body::Incoming;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::Response;
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// Serve a fixed reply on an ephemeral local port
    async fn spawn_upstream(status: StatusCode, body: &'static str) -> Uri {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let service = service_fn(move |_req: Request<Incoming>| async move {
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .body(Full::new(Bytes::from_static(body.as_bytes())))
                                .unwrap(),
                        )
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        format!("http://{addr}/").parse().unwrap()
    }

    fn reply(status: StatusCode, location: Option<String>, body: &'static str) -> Response<Full<Bytes>> {
        let mut builder = Response::builder().status(status);
        if let Some(location) = location {
            builder = builder.header(LOCATION, location);
        }
        builder
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    /// `/start` redirects relatively to `/final`, `/absolute` redirects with
    /// a full URL, `/loop` redirects to itself
    async fn spawn_redirecting_upstream() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| async move {
                        let resp = match req.uri().path() {
                            "/start" => reply(StatusCode::FOUND, Some("/final".into()), "moved"),
                            "/absolute" => reply(
                                StatusCode::MOVED_PERMANENTLY,
                                Some(format!("http://{addr}/final")),
                                "",
                            ),
                            "/loop" => reply(StatusCode::TEMPORARY_REDIRECT, Some("/loop".into()), ""),
                            "/final" => reply(StatusCode::OK, None, "X"),
                            _ => reply(StatusCode::NOT_FOUND, None, ""),
                        };
                        Ok::<_, Infallible>(resp)
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_default_target() {
        let upstream = HyperUpstream::new();
        assert_eq!(upstream.uri().host(), Some("www.google.com"));
    }

    #[tokio::test]
    async fn test_fetch_body() {
        let uri = spawn_upstream(StatusCode::OK, "<html>hello</html>").await;
        let upstream = HyperUpstream::with_uri(uri);
        let body = upstream.fetch().await.unwrap();
        assert_eq!(&body[..], b"<html>hello</html>");
    }

    #[tokio::test]
    async fn test_client_is_reusable() {
        let uri = spawn_upstream(StatusCode::OK, "X").await;
        let upstream = HyperUpstream::with_uri(uri);
        for _ in 0..3 {
            assert_eq!(&upstream.fetch().await.unwrap()[..], b"X");
        }
    }

    #[tokio::test]
    async fn test_error_status() {
        let uri = spawn_upstream(StatusCode::SERVICE_UNAVAILABLE, "down").await;
        let upstream = HyperUpstream::with_uri(uri);
        let err = upstream.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::Status(StatusCode::SERVICE_UNAVAILABLE)
        ));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // grab a free port, then close it again
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let upstream = HyperUpstream::with_uri(format!("http://{addr}/").parse().unwrap());
        let err = upstream.fetch().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }

    #[tokio::test]
    async fn test_follows_relative_redirect() {
        let addr = spawn_redirecting_upstream().await;
        let upstream = HyperUpstream::with_uri(format!("http://{addr}/start").parse().unwrap());
        assert_eq!(&upstream.fetch().await.unwrap()[..], b"X");

        let function = crate::config::Config::load_from("does-not-exist/trigger")
            .unwrap()
            .function;
        let req = crate::function::InboundRequest::new(Some("name=Sam"), None);
        let resp = crate::function::invoke(&req, &upstream, &function).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, "Goodbye SamX");
    }

    #[tokio::test]
    async fn test_follows_absolute_redirect() {
        let addr = spawn_redirecting_upstream().await;
        let upstream = HyperUpstream::with_uri(format!("http://{addr}/absolute").parse().unwrap());
        assert_eq!(&upstream.fetch().await.unwrap()[..], b"X");
    }

    #[tokio::test]
    async fn test_redirect_loop_fails() {
        let addr = spawn_redirecting_upstream().await;
        let upstream = HyperUpstream::with_uri(format!("http://{addr}/loop").parse().unwrap());
        let err = upstream.fetch().await.unwrap_err();
        assert!(matches!(err, UpstreamError::TooManyRedirects(MAX_REDIRECTS)));
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_status() {
        let uri = spawn_upstream(StatusCode::FOUND, "moved").await;
        let upstream = HyperUpstream::with_uri(uri);
        let err = upstream.fetch().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(StatusCode::FOUND)));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let uri = spawn_upstream(StatusCode::OK, "0123456789").await;
        let upstream = HyperUpstream::with_uri(uri.clone()).with_max_body(4);
        let err = upstream.fetch().await.unwrap_err();
        assert!(matches!(err, UpstreamError::TooLarge(4)));
        assert!(err.to_string().contains("4 bytes"));

        let upstream = HyperUpstream::with_uri(uri).with_max_body(10);
        assert_eq!(&upstream.fetch().await.unwrap()[..], b"0123456789");
    }
}
