//! OpenSplit Core
//!
//! This crate contains the pieces of the OpenSplit timer that do no I/O:
//! - `timer`: the timer/split state machine and its best-time bookkeeping
//! - `command`: decoding of inbound frames into typed commands
//! - `snapshot`: the outbound state snapshot broadcast to every observer
//! - `export`: the export/import document built on top of the snapshot
//! - `config`: runtime configuration and protocol defaults
//!
//! The async coordinator and the WebSocket plumbing live in `opensplit-runtime`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod command;
pub mod config;
pub mod duration;
pub mod errors;
pub mod export;
pub mod snapshot;
pub mod split;
pub mod time;
pub mod timer;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use command::{decode_command, BestTimesPatch, Command};
pub use config::{ConnectionConfig, HubConfig, RuntimeConfig};
pub use duration::Nanos;
pub use errors::{DecodeError, OpenSplitError, OpenSplitResult, TransportError};
pub use export::ExportDocument;
pub use snapshot::TimerSnapshot;
pub use split::{Split, SplitDefinition};
pub use time::{Clock, ManualClock, SystemClock};
pub use timer::{TimerState, TimerStatus};
