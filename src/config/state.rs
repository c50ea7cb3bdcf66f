// Application state module
// Everything a connection task needs, shared read-only behind an Arc

use std::path::PathBuf;
use std::sync::Arc;

use super::types::Config;
use crate::error::ServerError;
use crate::interceptor::ResponseInterceptor;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Canonical form of `config.server.root`; every served path must stay under it
    pub root: PathBuf,
    pub interceptor: Arc<dyn ResponseInterceptor>,
}

impl AppState {
    /// Resolve the document root and bundle it with the interceptor
    pub fn new(
        config: Config,
        interceptor: Arc<dyn ResponseInterceptor>,
    ) -> Result<Self, ServerError> {
        let configured = config.root_dir();
        let root = configured
            .canonicalize()
            .and_then(|root| {
                if root.is_dir() {
                    Ok(root)
                } else {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "not a directory",
                    ))
                }
            })
            .map_err(|source| ServerError::InvalidRoot {
                path: configured,
                source,
            })?;

        Ok(Self {
            config,
            root,
            interceptor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::CrossOriginIsolation;

    #[test]
    fn test_root_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        let root = dir.path().join("site/../site");

        let cfg = Config::default().with_root_and_port(root.to_str().unwrap(), 0);
        let state = AppState::new(cfg, Arc::new(CrossOriginIsolation)).unwrap();
        assert_eq!(state.root, dir.path().join("site").canonicalize().unwrap());
    }

    #[test]
    fn test_missing_root_rejected() {
        let cfg = Config::default().with_root_and_port("/definitely/not/here", 0);
        let err = AppState::new(cfg, Arc::new(CrossOriginIsolation)).err().unwrap();
        assert!(matches!(err, ServerError::InvalidRoot { .. }));
    }

    #[test]
    fn test_file_root_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let cfg = Config::default().with_root_and_port(file.path().to_str().unwrap(), 0);
        assert!(AppState::new(cfg, Arc::new(CrossOriginIsolation)).is_err());
    }
}
