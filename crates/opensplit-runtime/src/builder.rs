//! Runtime Builder API
//!
//! Wires a hub and a server together and hands back a [`RuntimeHandle`]
//! that the CLI and tests use to submit commands and stop the instance.

use crate::hub::{Hub, HubHandle, HubStats};
use crate::server::Server;
use opensplit_core::{
    Clock, Command, OpenSplitError, OpenSplitResult, RuntimeConfig, SystemClock, TransportError,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long shutdown waits for the hub to drain
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

/// Builder for an OpenSplit server instance
pub struct RuntimeBuilder<C: Clock = SystemClock> {
    config: RuntimeConfig,
    clock: C,
}

impl RuntimeBuilder<SystemClock> {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            clock: SystemClock,
        }
    }
}

impl<C: Clock> RuntimeBuilder<C> {
    /// Drive the timer from a different clock
    pub fn with_clock<D: Clock>(self, clock: D) -> RuntimeBuilder<D> {
        RuntimeBuilder {
            config: self.config,
            clock,
        }
    }

    /// Override the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Bind the listener and start the hub and server tasks
    pub async fn build_and_start(self) -> OpenSplitResult<RuntimeHandle> {
        let server = Server::bind(self.config.clone()).await?;
        let local_addr = server.local_addr()?;

        let (hub, hub_handle) = Hub::with_clock(self.config.hub.clone(), self.clock);
        let hub_task = tokio::spawn(hub.run());
        let server_task = tokio::spawn(server.run(hub_handle.clone()));

        info!(%local_addr, "OpenSplit runtime started");

        Ok(RuntimeHandle {
            local_addr,
            hub: hub_handle,
            hub_task: Some(hub_task),
            server_task: Some(server_task),
        })
    }
}

// ----------------------------------------------------------------------------
// Runtime Handle
// ----------------------------------------------------------------------------

/// Handle to a running OpenSplit instance
pub struct RuntimeHandle {
    local_addr: SocketAddr,
    hub: HubHandle,
    hub_task: Option<JoinHandle<OpenSplitResult<HubStats>>>,
    server_task: Option<JoinHandle<OpenSplitResult<()>>>,
}

impl RuntimeHandle {
    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `ws://` URL of the observer endpoint, for local clients
    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.local_addr, path)
    }

    pub fn hub_handle(&self) -> HubHandle {
        self.hub.clone()
    }

    /// Apply a command as if an observer had sent it
    pub async fn submit(&self, command: Command) -> OpenSplitResult<()> {
        self.hub.submit(None, command).await
    }

    pub fn is_running(&self) -> bool {
        self.hub_task.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the hub to stop on its own
    pub async fn wait(&mut self) -> OpenSplitResult<HubStats> {
        let stats = match self.hub_task.take() {
            Some(handle) => join_hub(handle).await?,
            None => HubStats::default(),
        };
        self.stop_server().await;
        Ok(stats)
    }

    /// Stop the hub and the listener
    pub async fn shutdown(&mut self) -> OpenSplitResult<HubStats> {
        info!("Shutting down OpenSplit runtime");
        // Fails only when the hub already stopped, which is what we want
        let _ = self.hub.shutdown().await;

        let stats = match self.hub_task.take() {
            Some(handle) => match tokio::time::timeout(SHUTDOWN_TIMEOUT, join_hub(handle)).await {
                Ok(result) => result?,
                Err(_) => {
                    self.stop_server().await;
                    return Err(TransportError::Shutdown {
                        reason: format!("hub did not stop within {:?}", SHUTDOWN_TIMEOUT),
                    }
                    .into());
                }
            },
            None => HubStats::default(),
        };

        self.stop_server().await;
        info!(
            commands = stats.commands_applied,
            broadcasts = stats.broadcasts,
            "OpenSplit runtime shut down"
        );
        Ok(stats)
    }

    async fn stop_server(&mut self) {
        if let Some(handle) = self.server_task.take() {
            // The accept loop exits by itself once the hub is gone
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(Err(e))) => warn!("Server stopped with error: {}", e),
                Ok(Err(e)) => warn!("Server task failed: {}", e),
                Err(_) => warn!("Server did not stop within {:?}", SHUTDOWN_TIMEOUT),
                Ok(Ok(Ok(()))) => {}
            }
        }
    }
}

async fn join_hub(handle: JoinHandle<OpenSplitResult<HubStats>>) -> OpenSplitResult<HubStats> {
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(OpenSplitError::Channel {
            message: format!("Hub task panicked: {}", e),
        }),
    }
}
