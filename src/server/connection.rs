// Connection handling module
// Serves one TCP connection per task and finalizes every response

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Version};
use hyper_util::rt::TokioIo;

use crate::config::AppState;
use crate::handler;
use crate::http::HttpResponse;
use crate::logger::{self, AccessLogEntry};

use super::stream::{FinalizingStream, ServedResponses};

/// Handle a single connection in a spawned task.
///
/// HTTP/1.1 with keep-alive when `keep_alive_timeout > 0`. The whole
/// connection is bounded by `max(read_timeout, write_timeout)`; zero
/// disables the bound. Error responses hyper writes itself go through
/// the interceptor in `FinalizingStream`.
pub fn spawn_connection(stream: tokio::net::TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let served = ServedResponses::default();
        let io = TokioIo::new(FinalizingStream::new(
            stream,
            Arc::clone(&state.interceptor),
            served.clone(),
        ));

        let perf = &state.config.performance;
        let timeout_secs = std::cmp::max(perf.read_timeout, perf.write_timeout);

        let mut builder = http1::Builder::new();
        builder.keep_alive(perf.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                let served = served.clone();
                async move {
                    let head_request = req.method() == Method::HEAD;
                    let response = respond(req, peer_addr, &state).await;
                    served.record(head_request);
                    Ok::<_, Infallible>(response)
                }
            }),
        );

        if timeout_secs == 0 {
            if let Err(err) = conn.await {
                logger::log_connection_error(&err);
            }
            return;
        }

        match tokio::time::timeout(Duration::from_secs(timeout_secs), conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {timeout_secs} seconds"
                ));
            }
        }
    });
}

/// Produce the final response for one request
///
/// The handler builds the response, then the interceptor runs on it
/// unconditionally, then it is access-logged and handed to hyper.
pub async fn respond<B>(req: Request<B>, peer_addr: SocketAddr, state: &AppState) -> HttpResponse {
    let started = Instant::now();
    // The body is never read: only GET/HEAD are served
    let (parts, _body) = req.into_parts();
    let req = Request::from_parts(parts, ());

    let mut response = handler::handle_request(&req, state).await;
    state.interceptor.on_response(&mut response);

    if state.config.logging.access_log {
        let entry = access_entry(&req, &response, peer_addr, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    response
}

fn access_entry(
    req: &Request<()>,
    response: &HttpResponse,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::interceptor::CrossOriginIsolation;

    #[tokio::test]
    async fn test_interceptor_runs_on_every_status() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mmapper.html"), b"ok").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let mut cfg = Config::default().with_root_and_port(dir.path().to_str().unwrap(), 0);
        cfg.logging.access_log = false;
        let state = AppState::new(cfg, Arc::new(CrossOriginIsolation)).unwrap();
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        let cases = [
            (Method::GET, "/mmapper.html", 200),
            (Method::GET, "/does-not-exist", 404),
            (Method::GET, "/sub", 301),
            (Method::DELETE, "/mmapper.html", 405),
            (Method::OPTIONS, "/", 204),
            (Method::HEAD, "/mmapper.html", 200),
        ];
        for (method, uri, status) in cases {
            let req = Request::builder().method(method).uri(uri).body(()).unwrap();
            let resp = respond(req, peer, &state).await;
            assert_eq!(resp.status(), status, "{uri}");
            assert_eq!(resp.headers()["cross-origin-opener-policy"], "same-origin", "{uri}");
            assert_eq!(resp.headers()["cross-origin-embedder-policy"], "require-corp", "{uri}");
        }
    }

    #[test]
    fn test_access_entry_fields() {
        let req = Request::builder()
            .uri("/a.js?x=1")
            .header("user-agent", "test-agent")
            .body(())
            .unwrap();
        let resp = crate::http::build_404_response();
        let entry = access_entry(&req, &resp, "10.0.0.2:4000".parse().unwrap(), Instant::now());
        assert_eq!(entry.remote_addr, "10.0.0.2");
        assert_eq!(entry.query.as_deref(), Some("x=1"));
        assert_eq!(entry.status, 404);
        assert_eq!(entry.body_bytes, "404 Not Found".len());
        assert_eq!(entry.user_agent.as_deref(), Some("test-agent"));
        assert!(entry.referer.is_none());
    }
}
