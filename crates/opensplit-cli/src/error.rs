//! Error handling for the OpenSplit CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("OpenSplit error: {0}")]
    OpenSplit(#[from] opensplit_core::OpenSplitError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load splits file: {0}")]
    SplitsFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
