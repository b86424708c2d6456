//! Command-line interface definitions and parsing

use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "OpenSplit",
    bin_name = "opensplit",
    author,
    version,
    about = "Speedrun timer server broadcasting its state over WebSocket",
    long_about = None,
    disable_version_flag = true
)]
pub struct Cli {
    /// Port (or host:port) to listen on; overrides PORT and the config file
    #[arg(short, long)]
    pub port: Option<String>,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Exported splits file to load before accepting observers
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{error::ErrorKind, CommandFactory};

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "opensplit",
            "-p",
            "9000",
            "--config",
            "opensplit.toml",
            "--load",
            "splits.json",
            "--verbose",
        ])
        .unwrap();

        assert_eq!(cli.port.as_deref(), Some("9000"));
        assert_eq!(cli.config, Some(PathBuf::from("opensplit.toml")));
        assert_eq!(cli.load, Some(PathBuf::from("splits.json")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["opensplit"]).unwrap();
        assert!(cli.port.is_none());
        assert!(cli.config.is_none());
        assert!(cli.load.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_short_v_prints_version() {
        let err = Cli::try_parse_from(["opensplit", "-v"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        assert!(err.to_string().starts_with("OpenSplit "));
    }
}
