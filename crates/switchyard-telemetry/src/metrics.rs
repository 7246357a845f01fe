//! Prometheus metrics for Switchyard.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `switchyard_invocations_total` | Counter | `runtime`, `route`, `status` | Finished invocations |
//! | `switchyard_invocation_duration_seconds` | Histogram | `runtime`, `route` | Invocation latency |
//! | `switchyard_faults_total` | Counter | `kind` | Faults mapped into responses |
//! | `switchyard_in_flight_invocations` | Gauge | - | Invocations in progress |
//!
//! Recording functions are no-ops until [`init_metrics`] installs a recorder.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Counter of finished invocations.
pub const INVOCATIONS_TOTAL: &str = "switchyard_invocations_total";
/// Histogram of invocation latency.
pub const INVOCATION_DURATION_SECONDS: &str = "switchyard_invocation_duration_seconds";
/// Counter of faults mapped into responses.
pub const FAULTS_TOTAL: &str = "switchyard_faults_total";
/// Gauge of invocations in progress.
pub const IN_FLIGHT_INVOCATIONS: &str = "switchyard_in_flight_invocations";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether metrics are recorded.
    pub enabled: bool,

    /// Whether to serve `/metrics` over HTTP on `addr`. Serverless hosts
    /// usually leave this off and scrape through [`render_metrics`].
    pub listen: bool,

    /// Address of the scrape endpoint (e.g. `"0.0.0.0:9090"`).
    pub addr: String,

    /// Value of the `service` label added to every metric.
    pub service_name: String,

    /// Histogram buckets for invocation duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: false,
            addr: "0.0.0.0:9090".to_string(),
            service_name: "switchyard".to_string(),
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Renders the installed recorder.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Wraps a handle.
    #[must_use]
    pub const fn new(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// The registry installed by [`init_metrics`], if any.
    #[must_use]
    pub fn global() -> Option<Self> {
        METRICS_HANDLE.get().cloned().map(Self::new)
    }

    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the global Prometheus recorder.
///
/// Calling this again after a successful install is a no-op. With
/// `listen` set, the scrape endpoint is spawned on the current Tokio
/// runtime.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable `addr`, and
/// `TelemetryError::MetricsInit` if the recorder cannot be built or
/// installed, or if `listen` is set outside a Tokio runtime.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled || METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .add_global_label("service", config.service_name.clone())
        .set_buckets_for_metric(
            Matcher::Full(INVOCATION_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = if config.listen {
        let addr: SocketAddr = config
            .addr
            .parse()
            .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        let (recorder, exporter) = {
            let _entered = runtime.enter();
            builder
                .with_http_listener(addr)
                .build()
                .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        };
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        runtime.spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "metrics exporter stopped");
            }
        });
        handle
    } else {
        builder
            .install_recorder()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
    };

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format, or `None` before [`init_metrics`].
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(INVOCATIONS_TOTAL, "Total number of finished invocations");
    describe_histogram!(
        INVOCATION_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Invocation duration from receipt to the end stage"
    );
    describe_counter!(FAULTS_TOTAL, "Faults mapped into responses, by kind");
    describe_gauge!(IN_FLIGHT_INVOCATIONS, "Invocations currently in progress");
}

/// Records a finished invocation.
///
/// `route` is the matched route name, or `"unmatched"` when no route
/// matched.
pub fn record_invocation(runtime: &str, route: &str, status_code: u16, duration: Duration) {
    counter!(
        INVOCATIONS_TOTAL,
        "runtime" => runtime.to_string(),
        "route" => route.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        INVOCATION_DURATION_SECONDS,
        "runtime" => runtime.to_string(),
        "route" => route.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a fault mapped into a response.
pub fn record_fault(kind: &str) {
    counter!(FAULTS_TOTAL, "kind" => kind.to_string()).increment(1);
}

/// Increments the in-flight gauge.
pub fn increment_in_flight() {
    gauge!(IN_FLIGHT_INVOCATIONS).increment(1.0);
}

/// Decrements the in-flight gauge.
pub fn decrement_in_flight() {
    gauge!(IN_FLIGHT_INVOCATIONS).decrement(1.0);
}

/// Holds one slot of the in-flight gauge until dropped, including on
/// unwind or cancellation.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the gauge.
    #[must_use]
    pub fn new() -> Self {
        increment_in_flight();
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        decrement_in_flight();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert!(!config.listen);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_recording_without_recorder() {
        record_invocation("socket", "chat", 200, Duration::from_millis(3));
        record_fault("system");
        let guard = InFlightGuard::new();
        drop(guard);
    }

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_init_and_render() {
        let config = MetricsConfig {
            service_name: "telemetry-test".to_string(),
            ..Default::default()
        };
        init_metrics(&config).unwrap();
        // Second install is a no-op.
        init_metrics(&config).unwrap();

        record_invocation("http-framework", "item", 404, Duration::from_millis(12));
        record_fault("client");

        let rendered = render_metrics().unwrap();
        assert!(rendered.contains(INVOCATIONS_TOTAL));
        assert!(rendered.contains("route=\"item\""));
        assert!(rendered.contains(FAULTS_TOTAL));
        assert!(MetricsRegistry::global().is_some());
    }

    #[test]
    fn test_listen_rejects_bad_address() {
        let config = MetricsConfig {
            listen: true,
            addr: "not-an-address".to_string(),
            ..Default::default()
        };
        // Either the address check fails or another test already installed
        // the recorder.
        let result = init_metrics(&config);
        if METRICS_HANDLE.get().is_none() {
            assert!(matches!(result, Err(TelemetryError::InvalidAddress(_))));
        }
    }
}
