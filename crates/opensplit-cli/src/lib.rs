//! OpenSplit CLI library
//!
//! Argument parsing, configuration loading and the launcher that wires them
//! to an `opensplit-runtime` instance.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::OpenSplitApp;
pub use cli::Cli;
pub use config::{normalize_listen_addr, AppConfig, LoggingConfig};
pub use error::{CliError, Result};
