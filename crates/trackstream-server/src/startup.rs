//! Server startup helper for embedding in the engine binary.
//!
//! [`spawn_server`] binds the listener before returning, so an address
//! already in use is reported to the caller instead of being logged from
//! a background task.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, bind_listener, serve};
use crate::state::AppState;

/// Errors that can occur when spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the listener and serve on a background task.
///
/// Returns the task handle and the bound address. The task ends after
/// the shared control requests a stop.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_server(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<(JoinHandle<()>, SocketAddr), StartupError> {
    let listener = bind_listener(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            tracing::error!(error = %e, "Stream server exited with error");
        }
    });

    tracing::info!(%addr, "Stream server spawned on background task");

    Ok((handle, addr))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use trackstream_core::StreamControl;

    use super::*;

    #[tokio::test]
    async fn serves_until_stopped() {
        let control = Arc::new(StreamControl::new(200));
        let state = Arc::new(AppState::new(1024, Arc::clone(&control)));
        let config = ServerConfig {
            host: String::from("127.0.0.1"),
            port: 0,
        };

        let (handle, addr) = spawn_server(&config, state).await.unwrap();
        assert_ne!(addr.port(), 0);
        control.request_stop();
        let joined = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn port_in_use_is_reported() {
        let control = Arc::new(StreamControl::new(200));
        let held = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = held.local_addr().unwrap();
        let config = ServerConfig {
            host: String::from("127.0.0.1"),
            port: addr.port(),
        };

        let state = Arc::new(AppState::new(1024, control));
        assert!(matches!(
            spawn_server(&config, state).await,
            Err(StartupError::Server(ServerError::Bind(_)))
        ));
    }
}
