//! HTTP cache validation module
//!
//! `ETag` and `Last-Modified` validators plus conditional request checks.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

/// IMF-fixdate, the only date format emitted on the wire
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Generate `ETag` using fast hashing
///
/// # Returns
/// Quoted `ETag` string, e.g., `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports a single `ETag`, a comma separated list, weak `W/` prefixes
/// and the `*` wildcard.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').any(|e| {
            let e = e.trim();
            e == "*" || e.strip_prefix("W/").unwrap_or(e) == etag
        })
    })
}

/// Format a file modification time as an HTTP date
pub fn format_http_date(time: SystemTime) -> String {
    let dt: DateTime<Utc> = time.into();
    dt.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date (IMF-fixdate only)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// True when the resource has not changed since the client's copy
///
/// HTTP dates have one-second resolution, so sub-second mtime is dropped
/// before comparing.
pub fn not_modified_since(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(since) = if_modified_since.and_then(parse_http_date) else {
        return false;
    };
    let modified: DateTime<Utc> = modified.into();
    modified.timestamp() <= since.timestamp()
}

/// Decide whether a conditional GET/HEAD should get `304 Not Modified`
///
/// `If-None-Match` takes precedence; `If-Modified-Since` is only
/// consulted when the client sent no entity tags.
pub fn is_not_modified(
    if_none_match: Option<&str>,
    if_modified_since: Option<&str>,
    etag: &str,
    modified: Option<SystemTime>,
) -> bool {
    if if_none_match.is_some() {
        return check_etag_match(if_none_match, etag);
    }
    modified.is_some_and(|m| not_modified_since(if_modified_since, m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_etag() {
        let etag = generate_etag(b"hello world");
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
        assert!(etag.len() > 2);
    }

    #[test]
    fn test_etag_consistency() {
        assert_eq!(generate_etag(b"same content"), generate_etag(b"same content"));
        assert_ne!(generate_etag(b"content a"), generate_etag(b"content b"));
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "\"abc123\"";
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"abc123\""), etag));
        assert!(check_etag_match(Some("W/\"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(None, etag));
    }

    #[test]
    fn test_http_date_roundtrip() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777);
        let formatted = format_http_date(time);
        assert_eq!(formatted, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&formatted).unwrap().timestamp(), 784_111_777);
        assert!(parse_http_date("yesterday").is_none());
    }

    #[test]
    fn test_not_modified_since() {
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_millis(784_111_777_250);
        assert!(not_modified_since(Some("Sun, 06 Nov 1994 08:49:37 GMT"), mtime));
        assert!(not_modified_since(Some("Mon, 07 Nov 1994 08:49:37 GMT"), mtime));
        assert!(!not_modified_since(Some("Sat, 05 Nov 1994 08:49:37 GMT"), mtime));
        assert!(!not_modified_since(Some("garbage"), mtime));
        assert!(!not_modified_since(None, mtime));
    }

    #[test]
    fn test_etag_takes_precedence() {
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777);
        let date = Some("Sun, 06 Nov 1994 08:49:37 GMT");
        assert!(!is_not_modified(Some("\"stale\""), date, "\"fresh\"", Some(mtime)));
        assert!(is_not_modified(None, date, "\"fresh\"", Some(mtime)));
        assert!(!is_not_modified(None, date, "\"fresh\"", None));
    }
}
