//! Daemon orchestration -- assembly, lifecycle and operator input.
//!
//! The [`Orchestrator`] is the central coordinator of `syslens-daemon`.
//! It builds the log pipeline from configuration, starts it, wires the
//! operator's filter edits into the shared filter, reports health and
//! shuts everything down in order.
//!
//! # Startup Order
//!
//! 1. Log pipeline (binds the UDP socket, spawns one consumer per sink)
//! 2. Filter editor (applies operator lines to the active filter)
//!
//! # Shutdown Order
//!
//! 1. Filter editor (no more filter changes)
//! 2. Log pipeline (release the socket, drain queues, flush sinks)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use syslens_core::config::SyslensConfig;
use syslens_core::metrics as m;
use syslens_core::pipeline::{HealthStatus, Pipeline};
use syslens_log_pipeline::filter::ActiveFilter;
use syslens_log_pipeline::{LogPipeline, LogPipelineBuilder, PipelineConfig};

use crate::filter_input::{FilterEditor, spawn_stdin_reader};
use crate::health::{ComponentHealth, DaemonHealth, aggregate_status};
use crate::metrics_server;

/// Interval between periodic health reports.
const HEALTH_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Where operator filter edits come from.
enum FilterInput {
    /// No filter editing.
    Disabled,
    /// Lines read from the process stdin.
    Stdin,
    /// Lines supplied by the caller.
    Channel(mpsc::Receiver<String>),
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: SyslensConfig,
    /// The ingestion pipeline.
    pipeline: LogPipeline,
    /// Filter edit source, consumed on start.
    input: FilterInput,
    /// Whether filter editing was configured at all.
    input_enabled: bool,
    /// Running filter editor task.
    editor_task: Option<JoinHandle<()>>,
    /// Cancels background tasks and ends `run`.
    shutdown: CancellationToken,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from a file and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated,
    /// or if the pipeline cannot be built.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = SyslensConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Filter editing reads stdin by default; see [`Self::without_filter_input`]
    /// and [`Self::with_filter_input`].
    pub fn build_from_config(config: SyslensConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let pipeline_config = PipelineConfig::from_core(&config);
        let pipeline = LogPipelineBuilder::new()
            .config(pipeline_config)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build log pipeline: {}", e))?;

        tracing::info!(
            sinks = pipeline.sink_count(),
            bind_addr = %pipeline.config().bind_addr,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            pipeline,
            input: FilterInput::Stdin,
            input_enabled: true,
            editor_task: None,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
        })
    }

    /// Disable operator filter editing.
    pub fn without_filter_input(mut self) -> Self {
        self.input = FilterInput::Disabled;
        self.input_enabled = false;
        self
    }

    /// Read filter edits from `lines` instead of stdin.
    pub fn with_filter_input(mut self, lines: mpsc::Receiver<String>) -> Self {
        self.input = FilterInput::Channel(lines);
        self.input_enabled = true;
        self
    }

    /// Start the pipeline and the filter editor.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline fails to start (e.g. the UDP port
    /// is already bound).
    pub async fn start(&mut self) -> Result<()> {
        self.pipeline
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start log pipeline: {}", e))?;

        let lines = match std::mem::replace(&mut self.input, FilterInput::Disabled) {
            FilterInput::Disabled => None,
            FilterInput::Stdin => Some(spawn_stdin_reader()),
            FilterInput::Channel(rx) => Some(rx),
        };
        if let Some(lines) = lines {
            let editor = FilterEditor::new(self.pipeline.active_filter(), std::io::stderr());
            let cancel = self.shutdown.child_token();
            self.editor_task = Some(tokio::spawn(async move {
                editor.run(lines, cancel).await;
            }));
        }

        tracing::info!(
            local_addr = ?self.pipeline.local_addr(),
            filter_input = self.input_enabled,
            "syslens-daemon running"
        );
        Ok(())
    }

    /// Start, wait for SIGTERM/SIGINT or [`Self::shutdown_token`], then stop.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        let mut report = tokio::time::interval(HEALTH_REPORT_INTERVAL);
        report.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        report.tick().await;

        let shutdown = self.shutdown.clone();
        let signal = wait_for_shutdown_signal();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                result = &mut signal => {
                    match result {
                        Ok(name) => tracing::info!(signal = name, "shutdown signal received"),
                        Err(e) => tracing::error!(error = %e, "signal handling failed, shutting down"),
                    }
                    break;
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                _ = report.tick() => {
                    self.report_health().await;
                }
            }
        }

        self.shutdown().await
    }

    /// Stop the filter editor, then drain and stop the pipeline.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(task) = self.editor_task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "filter editor task failed");
            }
        }

        tracing::info!(
            delivered = self.pipeline.delivered_count(),
            filtered = self.pipeline.filtered_count(),
            dropped = self.pipeline.dropped_count(),
            "stopping log pipeline"
        );
        self.pipeline
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop log pipeline: {}", e))
    }

    /// Token that ends [`Self::run`] when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get the current aggregated health status.
    pub async fn health(&self) -> DaemonHealth {
        let editor_status = match &self.editor_task {
            Some(task) if task.is_finished() => {
                HealthStatus::Degraded("filter input closed".to_owned())
            }
            _ => HealthStatus::Healthy,
        };
        let components = vec![
            ComponentHealth {
                name: "log-pipeline".to_owned(),
                enabled: true,
                status: self.pipeline.health_check().await,
            },
            ComponentHealth {
                name: "filter-editor".to_owned(),
                enabled: self.input_enabled,
                status: editor_status,
            },
        ];

        let uptime_secs = self.start_time.elapsed().as_secs();
        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        DaemonHealth {
            status: aggregate_status(&components),
            uptime_secs,
            active_filter: self.pipeline.active_filter().load().query().to_owned(),
            delivered: self.pipeline.delivered_count(),
            filtered: self.pipeline.filtered_count(),
            dropped: self.pipeline.dropped_count(),
            components,
        }
    }

    async fn report_health(&self) {
        let health = self.health().await;
        match &health.status {
            HealthStatus::Healthy => tracing::debug!(
                uptime_secs = health.uptime_secs,
                delivered = health.delivered,
                filtered = health.filtered,
                dropped = health.dropped,
                "health check"
            ),
            status => tracing::warn!(
                status = ?status,
                dropped = health.dropped,
                "daemon health degraded"
            ),
        }
    }

    /// Shared filter handle.
    pub fn active_filter(&self) -> Arc<ActiveFilter> {
        self.pipeline.active_filter()
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.pipeline.local_addr()
    }

    /// The ingestion pipeline.
    pub fn pipeline(&self) -> &LogPipeline {
        &self.pipeline
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &SyslensConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl-C handler: {}", e))?;
    Ok("Ctrl-C")
}
