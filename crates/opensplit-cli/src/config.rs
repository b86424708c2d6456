//! OpenSplit CLI Configuration Management
//!
//! Configuration comes from, in increasing priority:
//! - built-in defaults
//! - a TOML file given with `--config`
//! - the `PORT` environment variable
//! - the `--port` flag

use crate::error::{CliError, Result};
use opensplit_core::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable consulted for the listen port
pub const PORT_ENV_VAR: &str = "PORT";

// ----------------------------------------------------------------------------
// Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the `opensplit` binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener, hub and connection settings
    pub server: RuntimeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log at DEBUG instead of INFO
    pub verbose: bool,
}

impl AppConfig {
    /// Load and validate a TOML configuration file; missing keys take defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        Ok(())
    }

    /// Apply the port overrides; the flag wins over the environment
    pub fn apply_port_override(&mut self, flag: Option<&str>, env: Option<&str>) {
        let port = [flag, env]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty());
        if let Some(port) = port {
            self.server.listen_addr = normalize_listen_addr(port);
        }
    }
}

/// Turn `8080` or `:8080` into `0.0.0.0:8080`; anything else is kept as is
pub fn normalize_listen_addr(value: &str) -> String {
    let value = value.trim();
    let port = value.strip_prefix(':').unwrap_or(value);
    if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
        format!("0.0.0.0:{}", port)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_normalize_listen_addr() {
        assert_eq!(normalize_listen_addr("8080"), "0.0.0.0:8080");
        assert_eq!(normalize_listen_addr(":9000"), "0.0.0.0:9000");
        assert_eq!(normalize_listen_addr(" 3000 "), "0.0.0.0:3000");
        assert_eq!(normalize_listen_addr("127.0.0.1:4000"), "127.0.0.1:4000");
        assert_eq!(normalize_listen_addr("[::1]:4000"), "[::1]:4000");
    }

    #[test]
    fn test_port_precedence() {
        let mut config = AppConfig::default();
        config.server.listen_addr = "127.0.0.1:7000".to_string();

        let mut from_file = config.clone();
        from_file.apply_port_override(None, None);
        assert_eq!(from_file.server.listen_addr, "127.0.0.1:7000");

        let mut from_env = config.clone();
        from_env.apply_port_override(None, Some("7001"));
        assert_eq!(from_env.server.listen_addr, "0.0.0.0:7001");

        let mut from_flag = config.clone();
        from_flag.apply_port_override(Some(":7002"), Some("7001"));
        assert_eq!(from_flag.server.listen_addr, "0.0.0.0:7002");

        // An empty PORT is treated as unset
        let mut empty_env = config;
        empty_env.apply_port_override(None, Some(""));
        assert_eq!(empty_env.server.listen_addr, "127.0.0.1:7000");
    }

    #[test]
    fn test_default_listen_addr() {
        let config = AppConfig::default();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.server.ws_path, "/ws");
        assert!(!config.logging.verbose);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
listen_addr = "127.0.0.1:9100"

[server.hub]
tick_interval_ms = 50

[logging]
verbose = true
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9100");
        assert_eq!(config.server.hub.tick_interval_ms, 50);
        assert_eq!(config.server.hub.event_buffer_size, 256);
        assert_eq!(config.server.ws_path, "/ws");
        assert!(config.logging.verbose);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server.connection]\nping_period_ms = 70000").unwrap();

        let result = AppConfig::load_from_file(file.path());
        assert!(matches!(result, Err(CliError::OpenSplit(_))));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server\nlisten_addr = ").unwrap();

        let result = AppConfig::load_from_file(file.path());
        assert!(matches!(result, Err(CliError::TomlParsing(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load_from_file(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
