//! Logger module
//!
//! Server lifecycle messages, access logs and error/warning output.
//! Until `init` runs everything goes straight to stdout/stderr.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Startup banner: where content is served and how to stop
pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    for line in startup_banner(addr, config) {
        write_info(&line);
    }
}

/// Lines of the startup banner, first the URL, last how to stop
pub fn startup_banner(addr: &SocketAddr, config: &Config) -> Vec<String> {
    let mut lines = vec![
        format!("Serving HTTP on {} port {} (http://{addr}/) ...", addr.ip(), addr.port()),
        format!("Document root: {}", config.server.root),
    ];
    if let Some(workers) = config.server.workers {
        lines.push(format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        lines.push(format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        lines.push(format!("Error log: {path}"));
    }
    lines.push("Press Ctrl+C to stop".to_string());
    lines
}

pub fn log_info(message: &str) {
    write_info(message);
}

pub fn log_shutdown(signal: &str) {
    write_info(&format!("\n{signal} received, shutting down"));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    write_error(&format!("[ERROR] Failed to serve connection: {err}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_names_url_and_how_to_stop() {
        let addr: SocketAddr = "0.0.0.0:9742".parse().unwrap();
        let lines = startup_banner(&addr, &Config::default());

        assert_eq!(lines[0], "Serving HTTP on 0.0.0.0 port 9742 (http://0.0.0.0:9742/) ...");
        assert_eq!(lines[1], "Document root: .");
        assert_eq!(lines.last().map(String::as_str), Some("Press Ctrl+C to stop"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_banner_lists_optional_settings() {
        let mut cfg = Config::default();
        cfg.server.workers = Some(4);
        cfg.logging.access_log_file = Some("logs/access.log".to_string());
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();

        let lines = startup_banner(&addr, &cfg);
        assert_eq!(lines[0], "Serving HTTP on 127.0.0.1 port 8080 (http://127.0.0.1:8080/) ...");
        assert!(lines.contains(&"Worker threads: 4".to_string()));
        assert!(lines.contains(&"Access log: logs/access.log".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Error log")));
        assert_eq!(lines.last().map(String::as_str), Some("Press Ctrl+C to stop"));
    }
}
