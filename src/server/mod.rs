//! Server module
//!
//! Binding, the accept loop and shutdown. A `Server` only exists once its
//! listener is bound, so holding one means the server is running or about
//! to accept.

pub mod connection;
pub mod listener;
pub mod signal;
pub mod stream;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::{AppState, Config};
use crate::error::ServerError;
use crate::interceptor::ResponseInterceptor;
use crate::logger;

pub use listener::create_listener;

/// Pause after a failed `accept` (e.g. out of file descriptors)
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Static file server with a response interceptor
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl Server {
    /// Resolve the document root and bind the listening socket
    ///
    /// Fails with `ServerError::Bind` if the port is taken or not
    /// permitted. There is no retry. Must be called inside a Tokio runtime.
    pub fn bind(
        config: Config,
        interceptor: Arc<dyn ResponseInterceptor>,
    ) -> Result<Self, ServerError> {
        let addr = config.socket_addr()?;
        let state = Arc::new(AppState::new(config, interceptor)?);
        let listener =
            create_listener(addr).map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self { listener, state })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until SIGINT or SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            let name = signal::shutdown_signal().await;
            logger::log_shutdown(name);
        })
        .await
    }

    /// Serve until `shutdown` resolves
    ///
    /// Prints the startup banner first. In-flight connections keep running
    /// in their own tasks; only the listener is closed on return.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        logger::log_server_start(&addr, &self.state.config);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            connection::spawn_connection(stream, peer_addr, Arc::clone(&self.state));
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }

                () = &mut shutdown => break,
            }
        }

        drop(self.listener);
        Ok(())
    }
}
