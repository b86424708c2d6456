//! Application launcher
//!
//! Starts the runtime, optionally preloads an exported splits file, and
//! keeps the server up until Ctrl-C.

use crate::config::AppConfig;
use crate::error::{CliError, Result};
use opensplit_core::ExportDocument;
use opensplit_runtime::{HubStats, RuntimeBuilder, RuntimeHandle};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

pub struct OpenSplitApp {
    config: AppConfig,
    runtime: Option<RuntimeHandle>,
}

impl OpenSplitApp {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            runtime: None,
        }
    }

    /// Bind the listener and start the hub
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let runtime = RuntimeBuilder::new(self.config.server.clone())
            .build_and_start()
            .await?;
        let addr = runtime.local_addr();
        info!(
            "OpenSplit listening on ws://{}{}",
            addr, self.config.server.ws_path
        );
        self.runtime = Some(runtime);
        Ok(addr)
    }

    /// Apply an exported splits file as if an observer had imported it
    ///
    /// Returns the number of splits in the loaded layout.
    pub async fn load_splits(&self, path: &Path) -> Result<usize> {
        let runtime = self.running()?;
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::SplitsFile(format!("{}: {}", path.display(), e)))?;
        let document = ExportDocument::from_json(&text)
            .map_err(|e| CliError::SplitsFile(format!("{}: {}", path.display(), e)))?;

        let split_count = document.state.predefined_splits.len();
        info!(
            file = %path.display(),
            title = %document.state.timer_title,
            splits = split_count,
            version = %document.version,
            "Loading splits"
        );
        for command in document.into_commands() {
            runtime.submit(command).await?;
        }
        Ok(split_count)
    }

    /// Serve until Ctrl-C (or until the hub stops by itself)
    pub async fn run_until_ctrl_c(&mut self) -> Result<HubStats> {
        let runtime = self
            .runtime
            .as_mut()
            .ok_or_else(|| CliError::Config("Runtime not started".to_string()))?;

        let finished = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Ctrl-C received, shutting down");
                None
            }
            stats = runtime.wait() => Some(stats),
        };

        match finished {
            Some(stats) => {
                self.runtime = None;
                Ok(stats?)
            }
            None => self.shutdown().await,
        }
    }

    pub async fn shutdown(&mut self) -> Result<HubStats> {
        match self.runtime.take() {
            Some(mut runtime) => Ok(runtime.shutdown().await?),
            None => Ok(HubStats::default()),
        }
    }

    fn running(&self) -> Result<&RuntimeHandle> {
        self.runtime
            .as_ref()
            .ok_or_else(|| CliError::Config("Runtime not started".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opensplit_core::{ManualClock, RuntimeConfig, SplitDefinition, TimerState};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn test_config() -> AppConfig {
        AppConfig {
            server: RuntimeConfig::testing(),
            ..AppConfig::default()
        }
    }

    fn export_file() -> NamedTempFile {
        let mut timer = TimerState::with_clock(ManualClock::new());
        timer.set_predefined_splits(
            vec![SplitDefinition::new("Forest"), SplitDefinition::new("Castle")],
            "Any%".to_string(),
        );
        let document = ExportDocument::from_snapshot(timer.snapshot(), Some(480));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(document.to_json_pretty().unwrap().as_bytes())
            .unwrap();
        file
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut app = OpenSplitApp::new(test_config());
        let addr = app.start().await.unwrap();
        assert!(addr.ip().is_loopback());

        let stats = app.shutdown().await.unwrap();
        assert_eq!(stats.commands_applied, 0);

        // Shutting down twice is harmless
        assert_eq!(app.shutdown().await.unwrap(), HubStats::default());
    }

    #[tokio::test]
    async fn test_load_splits_submits_import_commands() {
        let file = export_file();
        let mut app = OpenSplitApp::new(test_config());
        app.start().await.unwrap();

        let count = app.load_splits(file.path()).await.unwrap();
        assert_eq!(count, 2);

        let stats = app.shutdown().await.unwrap();
        assert_eq!(stats.commands_applied, 3);
    }

    #[tokio::test]
    async fn test_load_splits_rejects_garbage() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "definitely not an export").unwrap();

        let mut app = OpenSplitApp::new(test_config());
        app.start().await.unwrap();

        let result = app.load_splits(file.path()).await;
        assert!(matches!(result, Err(CliError::SplitsFile(_))));
        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_load_before_start_fails() {
        let file = export_file();
        let app = OpenSplitApp::new(test_config());
        assert!(app.load_splits(file.path()).await.is_err());
    }
}
