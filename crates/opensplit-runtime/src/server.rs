//! TCP listener and WebSocket handshake
//!
//! Every accepted stream gets its own task. Only upgrade requests for the
//! configured path are accepted; anything else is answered with a 404 and
//! closed.

use crate::connection::serve_observer;
use crate::hub::HubHandle;
use opensplit_core::{
    config::ConnectionConfig, OpenSplitError, OpenSplitResult, RuntimeConfig, TransportError,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// A bound, not yet running, OpenSplit server
pub struct Server {
    listener: TcpListener,
    ws_path: Arc<str>,
    connection: ConnectionConfig,
}

impl Server {
    /// Validate the configuration and bind the listening socket
    pub async fn bind(config: RuntimeConfig) -> OpenSplitResult<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|e| OpenSplitError::Configuration {
                reason: format!("cannot listen on {}: {}", config.listen_addr, e),
            })?;

        Ok(Self {
            listener,
            ws_path: Arc::from(config.ws_path),
            connection: config.connection,
        })
    }

    /// The address actually bound, useful when listening on port 0
    pub fn local_addr(&self) -> OpenSplitResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the hub stops
    pub async fn run(self, hub: HubHandle) -> OpenSplitResult<()> {
        let addr = self.local_addr()?;
        info!(%addr, path = %self.ws_path, "OpenSplit server listening");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(handle_stream(
                            stream,
                            peer,
                            hub.clone(),
                            Arc::clone(&self.ws_path),
                            self.connection.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                _ = hub.closed() => {
                    info!("Hub stopped, closing listener");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_stream(
    stream: TcpStream,
    peer: SocketAddr,
    hub: HubHandle,
    ws_path: Arc<str>,
    connection: ConnectionConfig,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, "Could not disable Nagle: {}", e);
    }

    match handshake(stream, &ws_path, &connection).await {
        Ok(ws) => {
            debug!(%peer, "WebSocket upgrade complete");
            serve_observer(ws, hub, connection).await;
        }
        Err(e) => debug!(%peer, "Handshake rejected: {}", e),
    }
}

async fn handshake(
    stream: TcpStream,
    ws_path: &str,
    connection: &ConnectionConfig,
) -> Result<WebSocketStream<TcpStream>, TransportError> {
    let ws_config = WebSocketConfig {
        max_message_size: Some(connection.max_message_size),
        max_frame_size: Some(connection.max_message_size),
        ..WebSocketConfig::default()
    };

    let check_path = |request: &Request, response: Response| {
        if request.uri().path() == ws_path {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("Not Found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };

    let write_wait = connection.write_wait();
    let upgrade =
        tokio_tungstenite::accept_hdr_async_with_config(stream, check_path, Some(ws_config));
    match time::timeout(write_wait, upgrade).await {
        Ok(Ok(ws)) => Ok(ws),
        Ok(Err(e)) => Err(TransportError::WebSocket {
            reason: e.to_string(),
        }),
        Err(_) => Err(TransportError::Timeout {
            duration_ms: write_wait.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_reports_ephemeral_port() {
        let server = Server::bind(RuntimeConfig::testing()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let config = RuntimeConfig {
            ws_path: "ws".to_string(),
            ..RuntimeConfig::testing()
        };
        let result = Server::bind(config).await;
        assert!(matches!(result, Err(OpenSplitError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_bind_rejects_unparseable_address() {
        let config = RuntimeConfig {
            listen_addr: "not an address".to_string(),
            ..RuntimeConfig::testing()
        };
        assert!(Server::bind(config).await.is_err());
    }
}
