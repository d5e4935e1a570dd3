//! Aggregated health check reporting.
//!
//! The orchestrator polls each component and produces a unified
//! [`DaemonHealth`] report. The overall status is the worst status among
//! enabled components.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)

use serde::Serialize;

use syslens_core::pipeline::HealthStatus;

/// Aggregated health report for the entire daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall daemon health status (worst of all components).
    pub status: HealthStatus,
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    /// Query of the active filter (empty when every event passes).
    pub active_filter: String,
    /// Events handed to sinks so far.
    pub delivered: u64,
    /// Events rejected by the severity threshold or the filter.
    pub filtered: u64,
    /// Events dropped by queue overflow.
    pub dropped: u64,
    /// Per-component health reports.
    pub components: Vec<ComponentHealth>,
}

/// Health status for a single component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component name (e.g., "log-pipeline", "filter-editor").
    pub name: String,
    /// Whether the component is enabled in configuration.
    pub enabled: bool,
    /// Current health status of the component.
    pub status: HealthStatus,
}

/// Aggregate component statuses into a single status.
///
/// Returns the worst status found: Unhealthy > Degraded > Healthy.
/// Only considers enabled components.
pub fn aggregate_status(components: &[ComponentHealth]) -> HealthStatus {
    let mut worst = HealthStatus::Healthy;
    let mut reasons = Vec::new();

    for component in components.iter().filter(|c| c.enabled) {
        match &component.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => {
                if !worst.is_unhealthy() {
                    reasons.push(format!("{}: {}", component.name, reason));
                    worst = HealthStatus::Degraded(String::new());
                }
            }
            HealthStatus::Unhealthy(reason) => {
                reasons.push(format!("{}: {}", component.name, reason));
                worst = HealthStatus::Unhealthy(String::new());
            }
        }
    }

    match worst {
        HealthStatus::Healthy => HealthStatus::Healthy,
        HealthStatus::Degraded(_) => HealthStatus::Degraded(reasons.join("; ")),
        HealthStatus::Unhealthy(_) => HealthStatus::Unhealthy(reasons.join("; ")),
    }
}
