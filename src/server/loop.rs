// Server loop module
// Accepts connections until shutdown, then drains in-flight connections

use hyper_util::server::graceful::GracefulShutdown;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop until `shutdown` is notified.
///
/// After shutdown the listener is closed, every open connection is told to
/// finish its current request and close, and the loop waits up to
/// `performance.shutdown_grace` seconds for them.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &graceful);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                break;
            }
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));

    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    tokio::select! {
        () = graceful.shutdown() => {
            logger::log_info("[Shutdown] All connections closed");
        }
        () = tokio::time::sleep(grace) => {
            logger::log_warning(&format!(
                "Shutdown grace of {}s elapsed with {} connection(s) still open",
                grace.as_secs(),
                active_connections.load(Ordering::SeqCst)
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::function::upstream::UpstreamError;
    use crate::function::Upstream;
    use crate::server::create_listener;
    use async_trait::async_trait;
    use http_body_util::{BodyExt, Empty};
    use hyper::body::Bytes;
    use hyper::Request;
    use hyper_util::client::legacy::Client;
    use hyper_util::rt::TokioExecutor;

    struct EchoUpstream;

    #[async_trait]
    impl Upstream for EchoUpstream {
        async fn fetch(&self) -> Result<Bytes, UpstreamError> {
            Ok(Bytes::from_static(b"!"))
        }
    }

    fn serve(grace: u64) -> (std::net::SocketAddr, Arc<Notify>, tokio::task::JoinHandle<()>) {
        let mut cfg = Config::load_from("does-not-exist/trigger").unwrap();
        cfg.logging.access_log = false;
        cfg.performance.shutdown_grace = grace;

        let listener = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(cfg, Arc::new(EchoUpstream)));
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(start_server_loop(listener, state, Arc::clone(&shutdown)));
        (addr, shutdown, server)
    }

    #[tokio::test]
    async fn test_idle_keep_alive_does_not_hold_shutdown() {
        let (addr, shutdown, server) = serve(30);

        // the pooled client keeps its connection open after the response
        let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
        let req = Request::get(format!("http://{addr}/api/HttpTrigger?name=Sam"))
            .body(Empty::new())
            .unwrap();
        let resp = client.request(req).await.unwrap();
        resp.into_body().collect().await.unwrap();

        shutdown.notify_one();
        let stopped = tokio::time::timeout(Duration::from_secs(5), server).await;
        assert!(matches!(stopped, Ok(Ok(()))));
        drop(client);
    }

    #[tokio::test]
    async fn test_serves_then_shuts_down() {
        let (addr, shutdown, server) = serve(1);

        let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
        let req = Request::get(format!("http://{addr}/api/HttpTrigger?name=Sam"))
            .body(Empty::new())
            .unwrap();
        let resp = client.request(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Goodbye Sam!");
        drop(client);

        shutdown.notify_one();
        let stopped = tokio::time::timeout(Duration::from_secs(5), server).await;
        assert!(matches!(stopped, Ok(Ok(()))));
    }
}
