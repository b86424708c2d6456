//! OpenSplit server entry point

use clap::Parser;
use tracing::{error, info};

use opensplit_cli::{
    app::OpenSplitApp,
    cli::Cli,
    config::{AppConfig, PORT_ENV_VAR},
    error::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_configuration(&cli)?;
    let env_port = std::env::var(PORT_ENV_VAR).ok();
    config.apply_port_override(cli.port.as_deref(), env_port.as_deref());

    setup_logging(cli.verbose || config.logging.verbose);

    let mut app = OpenSplitApp::new(config);
    if let Err(e) = app.start().await {
        error!("Failed to start server: {}", e);
        std::process::exit(1);
    }

    if let Some(path) = &cli.load {
        if let Err(e) = app.load_splits(path).await {
            error!("{}", e);
            let _ = app.shutdown().await;
            std::process::exit(1);
        }
    }

    let stats = app.run_until_ctrl_c().await?;
    info!(
        commands = stats.commands_applied,
        broadcasts = stats.broadcasts,
        snapshots = stats.snapshots_delivered,
        observers = stats.observers_registered,
        evicted = stats.observers_evicted,
        "OpenSplit exited"
    );
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => Ok(AppConfig::default()),
    }
}
