//! HTTP response building module
//!
//! Builders for the status codes the static file handler emits.

use super::range::ByteRange;
use super::HttpResponse;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderValue;
use hyper::Response;

/// Methods the file handler answers
pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";

/// Validators and caching headers attached to file responses
#[derive(Debug, Clone)]
pub struct FileMeta<'a> {
    pub content_type: &'a str,
    pub etag: &'a str,
    pub last_modified: Option<&'a str>,
    pub cache_control: &'a str,
}

/// Build 304 Not Modified response
pub fn build_304_response(meta: &FileMeta<'_>) -> HttpResponse {
    let mut builder = Response::builder()
        .status(304)
        .header("ETag", meta.etag)
        .header("Cache-Control", meta.cache_control);
    if let Some(last_modified) = meta.last_modified {
        builder = builder.header("Last-Modified", last_modified);
    }
    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("304", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 404 Not Found response
pub fn build_404_response() -> HttpResponse {
    plain_text(404, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> HttpResponse {
    let mut resp = plain_text(405, "405 Method Not Allowed");
    resp.headers_mut()
        .insert(hyper::header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    resp
}

/// Build OPTIONS response
pub fn build_options_response() -> HttpResponse {
    Response::builder()
        .status(204)
        .header("Allow", ALLOWED_METHODS)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: usize) -> HttpResponse {
    let mut resp = plain_text(416, "416 Range Not Satisfiable");
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{file_size}")) {
        resp.headers_mut().insert(hyper::header::CONTENT_RANGE, value);
    }
    resp
}

/// Build 301 redirect response
pub fn build_redirect_response(target: &str) -> HttpResponse {
    Response::builder()
        .status(301)
        .header("Location", target)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("301 Moved Permanently")))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build generic HTML response
pub fn build_html_response(content: String, cache_control: &str) -> HttpResponse {
    let content_length = content.len();
    Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .header("Cache-Control", cache_control)
        .body(Full::new(Bytes::from(content)))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 200 response carrying the whole file
pub fn build_file_response(data: Bytes, meta: &FileMeta<'_>) -> HttpResponse {
    let content_length = data.len();
    file_builder(200, meta)
        .header("Content-Length", content_length)
        .body(Full::new(data))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 206 Partial Content response
pub fn build_partial_response(
    data: &Bytes,
    range: ByteRange,
    meta: &FileMeta<'_>,
) -> HttpResponse {
    let total_size = data.len();
    file_builder(206, meta)
        .header("Content-Length", range.byte_count())
        .header("Content-Range", range.content_range(total_size))
        .body(Full::new(data.slice(range.start..=range.end)))
        .unwrap_or_else(|e| {
            log_build_error("206", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

fn file_builder(status: u16, meta: &FileMeta<'_>) -> hyper::http::response::Builder {
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", meta.content_type)
        .header("Accept-Ranges", "bytes")
        .header("ETag", meta.etag)
        .header("Cache-Control", meta.cache_control);
    if let Some(last_modified) = meta.last_modified {
        builder = builder.header("Last-Modified", last_modified);
    }
    builder
}

fn plain_text(status: u16, body: &'static str) -> HttpResponse {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", body.len())
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(body, &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
