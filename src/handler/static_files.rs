//! Static file serving module
//!
//! Maps URL paths onto the document root, then serves files, index files,
//! directory listings and the redirects/validators around them.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::response::{build_file_response, build_partial_response, FileMeta};
use crate::http::{self, cache, mime, HttpResponse, RangeParseResult};
use crate::logger;
use hyper::body::Bytes;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// Serve whatever the request path points to under the document root
pub async fn serve_path(ctx: &RequestContext<'_>, state: &AppState) -> HttpResponse {
    let Some(relative) = decode_request_path(ctx.path) else {
        return http::build_404_response();
    };

    let Some(resolved) = resolve_within_root(&state.root.join(relative), &state.root).await
    else {
        return http::build_404_response();
    };

    // File not found is common (404), no need to log
    let Ok(metadata) = fs::metadata(&resolved).await else {
        return http::build_404_response();
    };

    if metadata.is_dir() {
        if !ctx.path.ends_with('/') {
            return http::build_redirect_response(&directory_location(ctx));
        }
        return serve_directory(ctx, state, &resolved).await;
    }

    serve_file(ctx, state, &resolved, metadata.modified().ok()).await
}

/// Turn the URL path into a path relative to the root
///
/// Empty, `.` and `..` segments are dropped, so the result can never climb
/// above the root lexically. Symlinks are handled by `resolve_within_root`.
pub fn decode_request_path(path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;

    let mut relative = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." | ".." => {}
            s if s.contains(['\\', '\0']) => return None,
            s if cfg!(windows) && s.contains(':') => return None,
            s => relative.push(s),
        }
    }
    Some(relative)
}

/// Canonicalize and make sure the target is still inside the root
async fn resolve_within_root(candidate: &Path, root: &Path) -> Option<PathBuf> {
    let canonical = fs::canonicalize(candidate).await.ok()?;
    if canonical.starts_with(root) {
        Some(canonical)
    } else {
        logger::log_warning(&format!(
            "Path escapes document root: {} -> {}",
            candidate.display(),
            canonical.display()
        ));
        None
    }
}

/// Location for a directory requested without its trailing slash
fn directory_location(ctx: &RequestContext<'_>) -> String {
    let mut location = format!("{}/", ctx.path);
    if let Some(query) = ctx.query {
        location.push('?');
        location.push_str(query);
    }
    location
}

async fn serve_directory(ctx: &RequestContext<'_>, state: &AppState, dir: &Path) -> HttpResponse {
    for index_file in &state.config.http.index_files {
        let index_path = dir.join(index_file);
        if let Ok(meta) = fs::metadata(&index_path).await {
            if meta.is_file() {
                return serve_file(ctx, state, &index_path, meta.modified().ok()).await;
            }
        }
    }

    if !state.config.http.directory_listing {
        return http::build_404_response();
    }

    let display_path = percent_decode_str(ctx.path).decode_utf8_lossy();
    match listing::render_listing(&display_path, dir).await {
        Ok(html) => http::build_html_response(html, &state.config.http.cache_control),
        Err(e) => {
            logger::log_error(&format!("Failed to list directory '{}': {e}", dir.display()));
            http::build_404_response()
        }
    }
}

async fn serve_file(
    ctx: &RequestContext<'_>,
    state: &AppState,
    path: &Path,
    modified: Option<SystemTime>,
) -> HttpResponse {
    let content = match fs::read(path).await {
        Ok(c) => Bytes::from(c),
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            return http::build_404_response();
        }
    };

    let etag = cache::generate_etag(&content);
    let last_modified = modified.map(cache::format_http_date);
    let meta = FileMeta {
        content_type: mime::get_content_type(path.extension().and_then(|e| e.to_str())),
        etag: &etag,
        last_modified: last_modified.as_deref(),
        cache_control: &state.config.http.cache_control,
    };

    if cache::is_not_modified(ctx.if_none_match, ctx.if_modified_since, &etag, modified) {
        return http::build_304_response(&meta);
    }

    match http::parse_range_header(ctx.range_header, content.len()) {
        RangeParseResult::Valid(range) => build_partial_response(&content, range, &meta),
        RangeParseResult::NotSatisfiable => http::build_416_response(content.len()),
        RangeParseResult::None => build_file_response(content, &meta),
    }
}
