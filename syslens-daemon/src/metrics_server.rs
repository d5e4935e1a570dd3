//! Prometheus scrape endpoint for the `syslens_*` metrics.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use syslens_core::config::MetricsConfig;
use syslens_core::metrics as m;

/// Path served by the exporter's built-in listener. It cannot be changed.
pub const SCRAPE_PATH: &str = "/metrics";

/// Resolve the scrape address from `[metrics]`.
///
/// # Errors
///
/// The endpoint is not [`SCRAPE_PATH`], or the address does not parse.
pub fn scrape_address(config: &MetricsConfig) -> Result<SocketAddr> {
    if config.endpoint != SCRAPE_PATH {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '{SCRAPE_PATH}' is currently supported",
            config.endpoint
        ));
    }

    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}

/// Install the global recorder, start the scrape listener and publish the
/// metric descriptions and the build-info gauge.
///
/// The recorder is process-global, so this succeeds at most once.
/// Returns the scrape address.
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<SocketAddr> {
    let addr = scrape_address(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(listen_addr = %addr, "metrics endpoint is exposed on all interfaces");
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    tracing::info!(scrape = %format!("http://{addr}{SCRAPE_PATH}"), "metrics endpoint active");
    Ok(addr)
}
