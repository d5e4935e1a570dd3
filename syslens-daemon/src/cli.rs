//! CLI argument definitions for syslens-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.
//! Flags take precedence over environment variables and the config file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use syslens_core::config::SyslensConfig;

/// syslens syslog collector daemon.
///
/// Listens for RFC 3164 syslog datagrams over UDP, filters the live
/// stream with an editable query and archives events to daily files.
#[derive(Parser, Debug, Default)]
#[command(name = "syslens-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to syslens.toml configuration file.
    ///
    /// Built-in defaults are used when the file does not exist.
    #[arg(short, long, default_value = "syslens.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override the listener bind address (IP only).
    #[arg(long)]
    pub bind: Option<String>,

    /// Override the listener UDP port.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Initial filter query, e.g. `process=sshd && message("failed login")`.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Override the minimum severity (emergency .. debug).
    #[arg(long)]
    pub min_severity: Option<String>,

    /// Override the daily file directory.
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Disable the console display.
    #[arg(long)]
    pub no_display: bool,

    /// Disable daily file storage.
    #[arg(long)]
    pub no_storage: bool,

    /// Do not read filter edits from stdin.
    #[arg(long)]
    pub no_stdin: bool,
}

impl DaemonCli {
    /// Load the configuration file, then apply env and CLI overrides.
    ///
    /// A missing file at the configured path falls back to built-in defaults.
    pub async fn load_config(&self) -> Result<SyslensConfig> {
        let mut config = if self.config.exists() {
            SyslensConfig::from_file(&self.config)
                .await
                .with_context(|| format!("failed to load {}", self.config.display()))?
        } else {
            SyslensConfig::default()
        };
        config.apply_env_overrides();
        self.apply_overrides(&mut config);
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut SyslensConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_addr.clone_from(bind);
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(query) = &self.filter {
            config.filter.query.clone_from(query);
        }
        if let Some(severity) = &self.min_severity {
            config.filter.min_severity.clone_from(severity);
        }
        if let Some(dir) = &self.log_dir {
            config.storage.log_dir.clone_from(dir);
        }
        if self.no_display {
            config.display.enabled = false;
        }
        if self.no_storage {
            config.storage.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_config() {
        let cli = DaemonCli::parse_from(["syslens-daemon"]);
        assert_eq!(cli.config, PathBuf::from("syslens.toml"));
        assert!(!cli.validate);
        assert!(cli.port.is_none());
    }

    #[test]
    fn overrides_replace_config_values() {
        // Given: flags for port, filter and storage
        let cli = DaemonCli::parse_from([
            "syslens-daemon",
            "--port",
            "5514",
            "--filter",
            "process=sshd",
            "--log-dir",
            "/tmp/archive",
            "--no-display",
        ]);
        let mut config = SyslensConfig::default();

        // When
        cli.apply_overrides(&mut config);

        // Then
        assert_eq!(config.listener.port, 5514);
        assert_eq!(config.filter.query, "process=sshd");
        assert_eq!(config.storage.log_dir, "/tmp/archive");
        assert!(!config.display.enabled);
        assert!(config.storage.enabled);
    }

    #[test]
    fn absent_flags_leave_config_untouched() {
        let cli = DaemonCli::parse_from(["syslens-daemon"]);
        let mut config = SyslensConfig::default();
        config.filter.query = "severity=error".to_owned();

        cli.apply_overrides(&mut config);

        assert_eq!(config.filter.query, "severity=error");
        assert_eq!(config.listener.port, 5140);
    }
}
