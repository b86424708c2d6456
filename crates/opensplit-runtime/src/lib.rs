//! OpenSplit Runtime
//!
//! This crate runs the OpenSplit server:
//! - `hub`: the coordinator task that owns the timer and the observer registry
//! - `connection`: the per-observer WebSocket read/write pumps
//! - `server`: the TCP accept loop and WebSocket handshake
//! - `builder`: wiring of the above into a running instance
//!
//! All timer state lives inside the hub task. Connections only ever talk to it
//! through [`HubHandle`], which keeps every mutation and every broadcast
//! decision on one logical thread of control.

pub mod builder;
pub mod connection;
pub mod hub;
pub mod observer;
pub mod server;

pub use builder::{RuntimeBuilder, RuntimeHandle};
pub use connection::{serve_observer, DisconnectReason};
pub use hub::{Hub, HubEvent, HubHandle, HubStats};
pub use observer::{ObserverId, OutboundReceiver, OutboundSender, Payload};
pub use server::Server;

// Re-export core types for convenience
pub use opensplit_core::{
    Command, OpenSplitError, OpenSplitResult, RuntimeConfig, TimerSnapshot, TimerStatus,
};
