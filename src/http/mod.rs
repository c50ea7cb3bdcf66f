//! HTTP protocol layer module
//!
//! Content types, cache validators, byte ranges and response builders used by
//! the static file handler.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

use http_body_util::Full;
use hyper::body::Bytes;

/// Response type produced by every handler in this crate
pub type HttpResponse = hyper::Response<Full<Bytes>>;

pub use range::{parse_range_header, RangeParseResult};
pub use response::{
    build_304_response, build_404_response, build_405_response, build_416_response,
    build_html_response, build_options_response, build_redirect_response, ALLOWED_METHODS,
};
