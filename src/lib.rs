//! Development static file server that makes every response cross-origin
//! isolated (`Cross-Origin-Opener-Policy: same-origin`,
//! `Cross-Origin-Embedder-Policy: require-corp`).

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod interceptor;
pub mod logger;
pub mod server;

use std::sync::Arc;

pub use config::Config;
pub use error::ServerError;
pub use interceptor::{CrossOriginIsolation, InterceptorChain, ResponseInterceptor, StaticHeaders};
pub use server::Server;

/// Bind `config.server.port` and serve `config.server.root` until SIGINT/SIGTERM
///
/// Returns early only with an error, typically `ServerError::Bind`.
pub async fn start(config: Config) -> Result<(), ServerError> {
    let server = Server::bind(config, Arc::new(CrossOriginIsolation))?;
    logger::log_info("Cross-origin isolation headers enabled (COOP: same-origin, COEP: require-corp)");
    server.run().await
}
