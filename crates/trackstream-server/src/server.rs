//! Stream server lifecycle management.
//!
//! [`bind_listener`] claims the TCP port; [`serve`] runs the Axum
//! router on it until [`StreamControl::stopped`] resolves.
//!
//! [`StreamControl::stopped`]: trackstream_core::StreamControl::stopped

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use trackstream_core::config::ServerSection;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Listen address for the stream server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSection::default())
    }
}

impl From<&ServerSection> for ServerConfig {
    fn from(section: &ServerSection) -> Self {
        Self {
            host: section.host.clone(),
            port: section.port,
        }
    }
}

impl ServerConfig {
    /// Parse `host:port` into a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the host is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ServerError::Bind(format!("invalid address {}:{}: {e}", self.host, self.port)))
    }
}

/// Bind the listening socket.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is invalid or in use.
pub async fn bind_listener(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.socket_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve the router on `listener` until a stop is requested.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    let control = Arc::clone(&state.control);
    let router = build_router(state);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Stream server listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { control.stopped().await })
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Stream server stopped");
    Ok(())
}

/// Errors that can occur when starting or running the stream server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
