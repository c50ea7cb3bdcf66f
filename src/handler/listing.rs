//! Directory listing page

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write;
use std::io;
use std::path::Path;
use tokio::fs;

/// Characters left as-is in listing links
const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Render an HTML index of `dir`, titled with the decoded request path
///
/// Entries are sorted case-insensitively; directories get a trailing `/`.
pub async fn render_listing(display_path: &str, dir: &Path) -> io::Result<String> {
    let mut entries = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // follows symlinks, so a link to a directory lists as one
        let is_dir = fs::metadata(entry.path()).await.is_ok_and(|m| m.is_dir());
        entries.push((name, is_dir));
    }
    entries.sort_by_cached_key(|(name, _)| name.to_lowercase());

    let title = format!("Directory listing for {}", escape_html(display_path));
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"
    );
    for (name, is_dir) in &entries {
        let suffix = if *is_dir { "/" } else { "" };
        let _ = writeln!(
            html,
            "<li><a href=\"{}{suffix}\">{}{suffix}</a></li>",
            utf8_percent_encode(name, HREF),
            escape_html(name),
        );
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    Ok(html)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
