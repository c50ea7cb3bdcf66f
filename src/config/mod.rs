// Configuration module entry point
// Loads the server configuration; values are immutable once loaded

mod state;
mod types;

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ServerError;

pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Config file looked up in the working directory (extension resolved by `config`)
pub const DEFAULT_CONFIG_FILE: &str = "coi_webserver";

/// Port the server listens on when nothing overrides it
pub const DEFAULT_PORT: u16 = 9742;

impl Config {
    /// Load configuration from the default file name
    pub fn load() -> Result<Self, ServerError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from specified file path (without extension)
    /// A missing file is not an error: every key has a default
    pub fn load_from(config_path: &str) -> Result<Self, ServerError> {
        let settings = with_defaults(
            config::Config::builder()
                .add_source(config::File::with_name(config_path).required(false)),
        )?
        .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ServerError::InvalidAddress(format!("{}:{}: {e}", self.server.host, self.server.port)))
    }

    /// Root directory as a path
    pub fn root_dir(&self) -> PathBuf {
        PathBuf::from(&self.server.root)
    }

    /// Same configuration served from another directory on another port
    #[must_use]
    pub fn with_root_and_port(mut self, root: impl Into<String>, port: u16) -> Self {
        self.server.root = root.into();
        self.server.port = port;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                root: ".".to_string(),
                workers: None,
            },
            logging: LoggingConfig {
                access_log: true,
                access_log_format: "common".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive_timeout: 75,
                read_timeout: 30,
                write_timeout: 30,
            },
            http: HttpConfig {
                index_files: vec!["index.html".to_string(), "index.htm".to_string()],
                directory_listing: true,
                cache_control: "no-cache".to_string(),
            },
        }
    }
}

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

fn with_defaults(builder: Builder) -> Result<Builder, config::ConfigError> {
    let defaults = Config::default();
    builder
        .set_default("server.host", defaults.server.host)?
        .set_default("server.port", i64::from(defaults.server.port))?
        .set_default("server.root", defaults.server.root)?
        .set_default("logging.access_log", defaults.logging.access_log)?
        .set_default("logging.access_log_format", defaults.logging.access_log_format)?
        .set_default("performance.keep_alive_timeout", defaults.performance.keep_alive_timeout)?
        .set_default("performance.read_timeout", defaults.performance.read_timeout)?
        .set_default("performance.write_timeout", defaults.performance.write_timeout)?
        .set_default("http.index_files", defaults.http.index_files)?
        .set_default("http.directory_listing", defaults.http.directory_listing)?
        .set_default("http.cache_control", defaults.http.cache_control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = Config::load_from("/nonexistent/coi_webserver_test").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.server.port, 9742);
        assert_eq!(cfg.server.host, "0.0.0.0");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 8123\nroot = \"dist\"\n[http]\ndirectory_listing = false").unwrap();

        let stem = dir.path().join("server");
        let cfg = Config::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 8123);
        assert_eq!(cfg.server.root, "dist");
        assert!(!cfg.http.directory_listing);
        assert_eq!(cfg.http.cache_control, "no-cache");
        assert_eq!(cfg.http.index_files, vec!["index.html", "index.htm"]);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::default();
        assert_eq!(cfg.socket_addr().unwrap().port(), 9742);
        assert!(cfg.socket_addr().unwrap().ip().is_unspecified());

        let mut bad = Config::default();
        bad.server.host = "not a host".to_string();
        assert!(matches!(bad.socket_addr(), Err(ServerError::InvalidAddress(_))));
    }
}
