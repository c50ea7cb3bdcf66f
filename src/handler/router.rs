//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, then static
//! file lookup.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, HttpResponse};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request};

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    /// Raw (still percent-encoded) URL path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
    pub range_header: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        Self {
            path: req.uri().path(),
            query: req.uri().query(),
            is_head: req.method() == Method::HEAD,
            if_none_match: header_str(req, "if-none-match"),
            if_modified_since: header_str(req, "if-modified-since"),
            range_header: header_str(req, "range"),
        }
    }
}

fn header_str<'a, B>(req: &'a Request<B>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Main entry point for HTTP request handling
///
/// Never fails: every outcome, including errors, is a response.
pub async fn handle_request<B>(req: &Request<B>, state: &AppState) -> HttpResponse {
    if let Some(resp) = check_http_method(req.method()) {
        return resp;
    }

    let ctx = RequestContext::from_request(req);
    let response = static_files::serve_path(&ctx, state).await;

    if ctx.is_head {
        strip_body(response)
    } else {
        response
    }
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<HttpResponse> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// HEAD keeps every header of the GET response, including Content-Length
fn strip_body(response: HttpResponse) -> HttpResponse {
    let (parts, _) = response.into_parts();
    HttpResponse::from_parts(parts, Full::new(Bytes::new()))
}
