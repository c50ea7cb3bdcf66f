//! HTTP Range request parsing module
//!
//! Single byte-range support (RFC 7233). Multi-range requests are served in full.

/// Resolved byte range, both ends inclusive and within the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub const fn byte_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for this range
    pub fn content_range(&self, total_size: usize) -> String {
        format!("bytes {}-{}/{total_size}", self.start, self.end)
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    Valid(ByteRange),
    /// Syntactically valid but outside the file - 416
    NotSatisfiable,
    /// No Range header or malformed (ignore, return full content)
    None,
}

/// Parse HTTP Range header
///
/// Supported formats:
/// - `bytes=start-end`
/// - `bytes=start-`
/// - `bytes=-suffix` (last `suffix` bytes)
///
/// # Examples
/// ```
/// use coi_webserver::http::range::{parse_range_header, ByteRange, RangeParseResult};
///
/// let result = parse_range_header(Some("bytes=0-99"), 1000);
/// assert_eq!(result, RangeParseResult::Valid(ByteRange { start: 0, end: 99 }));
///
/// let result = parse_range_header(None, 1000);
/// assert_eq!(result, RangeParseResult::None);
/// ```
pub fn parse_range_header(range_header: Option<&str>, file_size: usize) -> RangeParseResult {
    let Some(range_set) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeParseResult::None;
    };

    if range_set.contains(',') {
        return RangeParseResult::None;
    }

    let Some((start_str, end_str)) = range_set.split_once('-') else {
        return RangeParseResult::None;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        parse_suffix_range(end_str, file_size)
    } else {
        parse_standard_range(start_str, end_str, file_size)
    }
}

fn parse_suffix_range(suffix_str: &str, file_size: usize) -> RangeParseResult {
    let Ok(suffix) = suffix_str.parse::<usize>() else {
        return RangeParseResult::None;
    };

    if suffix == 0 || file_size == 0 {
        return RangeParseResult::NotSatisfiable;
    }

    // Suffix larger than the file selects the whole file
    RangeParseResult::Valid(ByteRange {
        start: file_size.saturating_sub(suffix),
        end: file_size - 1,
    })
}

fn parse_standard_range(start_str: &str, end_str: &str, file_size: usize) -> RangeParseResult {
    let Ok(start) = start_str.parse::<usize>() else {
        return RangeParseResult::None;
    };

    let end = if end_str.is_empty() {
        None
    } else {
        let Ok(e) = end_str.parse::<usize>() else {
            return RangeParseResult::None;
        };
        Some(e)
    };

    if end.is_some_and(|e| start > e) {
        // last-byte-pos < first-byte-pos makes the header invalid, not unsatisfiable
        return RangeParseResult::None;
    }

    if start >= file_size {
        return RangeParseResult::NotSatisfiable;
    }

    let last = file_size - 1;
    RangeParseResult::Valid(ByteRange {
        start,
        end: end.map_or(last, |e| e.min(last)),
    })
}
