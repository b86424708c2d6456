//! Centralized Configuration Management
//!
//! Protocol defaults plus the configuration structures shared by the runtime
//! and the CLI. Durations are stored as integer milliseconds so the structs
//! round-trip cleanly through TOML.

use crate::errors::{OpenSplitError, OpenSplitResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ----------------------------------------------------------------------------
// Protocol Defaults
// ----------------------------------------------------------------------------

/// Default listen address (all interfaces, port 8080)
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Path the WebSocket endpoint is served on
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Title shown when a layout arrives without one
pub const DEFAULT_TIMER_TITLE: &str = "OpenSplit";

/// Icon given to splits that arrive without one
pub const DEFAULT_SPLIT_ICON: &str = "🏃";

/// How often the running timer is broadcast
pub const TIMER_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Time allowed to write a message to the peer
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Time allowed to read the next pong from the peer
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Maximum inbound message size; large enough for base64 image icons
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Outbound queue capacity per observer
pub const OBSERVER_SEND_BUFFER_SIZE: usize = 256;

/// Capacity of the hub's event queue
pub const HUB_EVENT_BUFFER_SIZE: usize = 256;

// ----------------------------------------------------------------------------
// Hub Configuration
// ----------------------------------------------------------------------------

/// Configuration for the coordinator loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Tick period in milliseconds
    pub tick_interval_ms: u64,
    /// Buffer size for the hub event queue (register/unregister/command)
    pub event_buffer_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TIMER_TICK_INTERVAL.as_millis() as u64,
            event_buffer_size: HUB_EVENT_BUFFER_SIZE,
        }
    }
}

impl HubConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Configuration for tests: ticks effectively never fire
    pub fn testing() -> Self {
        Self {
            tick_interval_ms: 60 * 60 * 1000,
            event_buffer_size: 64,
        }
    }
}

// ----------------------------------------------------------------------------
// Connection Configuration
// ----------------------------------------------------------------------------

/// Per-observer connection limits and keepalive timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Write deadline in milliseconds
    pub write_wait_ms: u64,
    /// Read deadline in milliseconds, refreshed by every pong
    pub pong_wait_ms: u64,
    /// Keepalive ping period in milliseconds; must be below `pong_wait_ms`
    pub ping_period_ms: u64,
    /// Maximum inbound message size in bytes
    pub max_message_size: usize,
    /// Outbound queue capacity; an observer whose queue fills is dropped
    pub send_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let pong_wait_ms = PONG_WAIT.as_millis() as u64;
        Self {
            write_wait_ms: WRITE_WAIT.as_millis() as u64,
            pong_wait_ms,
            ping_period_ms: pong_wait_ms * 9 / 10,
            max_message_size: MAX_MESSAGE_SIZE,
            send_buffer_size: OBSERVER_SEND_BUFFER_SIZE,
        }
    }
}

impl ConnectionConfig {
    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_millis(self.ping_period_ms)
    }
}

// ----------------------------------------------------------------------------
// Runtime Configuration
// ----------------------------------------------------------------------------

/// Everything the server needs to start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Socket address to listen on, e.g. `0.0.0.0:8080`
    pub listen_addr: String,
    /// Request path the WebSocket endpoint answers on
    pub ws_path: String,
    pub hub: HubConfig,
    pub connection: ConnectionConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            ws_path: DEFAULT_WS_PATH.to_string(),
            hub: HubConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Loopback on an ephemeral port with a quiet hub
    pub fn testing() -> Self {
        Self {
            listen_addr: "127.0.0.1:0".to_string(),
            hub: HubConfig::testing(),
            ..Self::default()
        }
    }

    /// Reject settings the runtime cannot work with
    pub fn validate(&self) -> OpenSplitResult<()> {
        let invalid = |reason: &str| {
            Err(OpenSplitError::Configuration {
                reason: reason.to_string(),
            })
        };

        if self.listen_addr.trim().is_empty() {
            return invalid("listen_addr must not be empty");
        }
        if !self.ws_path.starts_with('/') {
            return invalid("ws_path must start with '/'");
        }
        if self.hub.tick_interval_ms == 0 {
            return invalid("hub.tick_interval_ms must be greater than zero");
        }
        if self.hub.event_buffer_size == 0 {
            return invalid("hub.event_buffer_size must be greater than zero");
        }
        let conn = &self.connection;
        if conn.write_wait_ms == 0 || conn.pong_wait_ms == 0 || conn.ping_period_ms == 0 {
            return invalid("connection timeouts must be greater than zero");
        }
        if conn.ping_period_ms >= conn.pong_wait_ms {
            return invalid("connection.ping_period_ms must be less than pong_wait_ms");
        }
        if conn.send_buffer_size == 0 {
            return invalid("connection.send_buffer_size must be greater than zero");
        }
        if conn.max_message_size == 0 {
            return invalid("connection.max_message_size must be greater than zero");
        }
        Ok(())
    }
}
