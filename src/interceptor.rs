//! Response interceptors
//!
//! An interceptor sees every response right before it is handed to hyper
//! for transmission, whatever the status, method or path. It may only touch
//! the response it is given.

use crate::http::HttpResponse;
use hyper::header::{HeaderName, HeaderValue};
use std::sync::Arc;

/// Hook invoked once per outgoing response
pub trait ResponseInterceptor: Send + Sync {
    fn on_response(&self, response: &mut HttpResponse);
}

pub const CROSS_ORIGIN_OPENER_POLICY: &str = "cross-origin-opener-policy";
pub const CROSS_ORIGIN_EMBEDDER_POLICY: &str = "cross-origin-embedder-policy";

/// Adds the headers browsers require before enabling cross-origin isolation
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossOriginIsolation;

impl ResponseInterceptor for CrossOriginIsolation {
    fn on_response(&self, response: &mut HttpResponse) {
        let headers = response.headers_mut();
        // insert() replaces any value the handler may have set
        headers.insert(
            HeaderName::from_static(CROSS_ORIGIN_OPENER_POLICY),
            HeaderValue::from_static("same-origin"),
        );
        headers.insert(
            HeaderName::from_static(CROSS_ORIGIN_EMBEDDER_POLICY),
            HeaderValue::from_static("require-corp"),
        );
    }
}

/// Overwrites a fixed set of headers on every response
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl StaticHeaders {
    pub const fn new() -> Self {
        Self { headers: Vec::new() }
    }

    #[must_use]
    pub fn with(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

impl ResponseInterceptor for StaticHeaders {
    fn on_response(&self, response: &mut HttpResponse) {
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }
}

/// Runs several interceptors in registration order
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl ResponseInterceptor for InterceptorChain {
    fn on_response(&self, response: &mut HttpResponse) {
        for interceptor in &self.interceptors {
            interceptor.on_response(response);
        }
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::Response;

    fn response(status: u16) -> HttpResponse {
        Response::builder()
            .status(status)
            .header("Content-Type", "text/plain")
            .body(Full::new(Bytes::from_static(b"body")))
            .unwrap()
    }

    #[test]
    fn test_cross_origin_headers_added() {
        let mut resp = response(200);
        CrossOriginIsolation.on_response(&mut resp);
        assert_eq!(resp.headers()[CROSS_ORIGIN_OPENER_POLICY], "same-origin");
        assert_eq!(resp.headers()[CROSS_ORIGIN_EMBEDDER_POLICY], "require-corp");
    }

    #[test]
    fn test_existing_values_overwritten() {
        let mut resp = response(404);
        resp.headers_mut()
            .append(CROSS_ORIGIN_OPENER_POLICY, HeaderValue::from_static("unsafe-none"));
        resp.headers_mut()
            .append(CROSS_ORIGIN_OPENER_POLICY, HeaderValue::from_static("same-origin-allow-popups"));

        CrossOriginIsolation.on_response(&mut resp);

        let values: Vec<_> = resp
            .headers()
            .get_all(CROSS_ORIGIN_OPENER_POLICY)
            .iter()
            .collect();
        assert_eq!(values, vec!["same-origin"]);
    }

    #[test]
    fn test_other_fields_untouched() {
        let mut resp = response(404);
        CrossOriginIsolation.on_response(&mut resp);
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers()["content-type"], "text/plain");
        assert_eq!(resp.headers().len(), 3);
    }

    #[test]
    fn test_chain_runs_in_order() {
        let chain = InterceptorChain::new()
            .with(
                StaticHeaders::new()
                    .with(HeaderName::from_static(CROSS_ORIGIN_EMBEDDER_POLICY), HeaderValue::from_static("credentialless"))
                    .with(HeaderName::from_static("x-dev-server"), HeaderValue::from_static("1")),
            )
            .with(CrossOriginIsolation);
        assert_eq!(chain.len(), 2);

        let mut resp = response(200);
        chain.on_response(&mut resp);
        assert_eq!(resp.headers()[CROSS_ORIGIN_EMBEDDER_POLICY], "require-corp");
        assert_eq!(resp.headers()["x-dev-server"], "1");
    }
}
