//! Diagnostic logging for syslens-daemon.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use syslens_core::config::GeneralConfig;

/// Output shape of the daemon's own diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl LogFormat {
    /// Parse `general.log_format`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            )),
        }
    }
}

/// Build the level filter. `RUST_LOG` wins over `general.log_level`.
pub fn level_filter(config: &GeneralConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("invalid log level '{}'", config.log_level)),
    }
}

/// Install the global tracing subscriber. Call once, before the pipeline
/// starts.
///
/// Stdout belongs to the console sink: operators pipe the live event
/// stream into other tools, so daemon diagnostics are written to stderr
/// and never interleave with event lines. Pretty output only uses colour
/// when stderr is a terminal, which keeps redirected diagnostics plain.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let format = LogFormat::from_name(&config.log_format)?;
    let filter = level_filter(config)?;

    let output: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize {format:?} tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_names() {
        assert_eq!(LogFormat::from_name("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_name("pretty").unwrap(), LogFormat::Pretty);

        let err = LogFormat::from_name("syslog").unwrap_err();
        assert!(err.to_string().contains("unknown log format 'syslog'"));
    }

    #[test]
    fn level_filter_from_config() {
        let config = GeneralConfig {
            log_level: "debug".to_owned(),
            ..GeneralConfig::default()
        };
        // RUST_LOG may be set by the test runner; either way a filter is built.
        assert!(level_filter(&config).is_ok());
    }
}
