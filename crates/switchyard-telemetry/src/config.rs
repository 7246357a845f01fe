//! The `[telemetry]` section.
//!
//! The top-level `service_name` is authoritative: it labels every metric
//! series and log line, so [`TelemetryConfig::align_service_name`] copies
//! it into the nested sections after loading.

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Logging and metrics settings for one deployed orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Name reported as the `service` metric label and log field.
    pub service_name: String,

    /// Deployed version, logged once at startup.
    pub service_version: String,

    /// Deployment environment, e.g. `production`.
    pub environment: String,

    /// Prometheus recorder and scrape listener.
    pub metrics: MetricsConfig,

    /// Subscriber format and filter.
    pub logging: LogConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "switchyard".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            metrics: MetricsConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl TelemetryConfig {
    /// Defaults for a service called `name`.
    #[must_use]
    pub fn for_service(name: &str) -> Self {
        let mut config = Self {
            service_name: name.to_string(),
            ..Self::default()
        };
        config.align_service_name();
        config
    }

    /// Copies `service_name` into the metrics and logging sections.
    pub fn align_service_name(&mut self) {
        self.metrics.service_name.clone_from(&self.service_name);
        self.logging.service_name.clone_from(&self.service_name);
    }

    /// Sets the deployed version.
    #[must_use]
    pub fn with_version(mut self, version: &str) -> Self {
        self.service_version = version.to_string();
        self
    }

    /// Sets the deployment environment.
    #[must_use]
    pub fn with_environment(mut self, environment: &str) -> Self {
        self.environment = environment.to_string();
        self
    }

    /// Replaces the logging section, keeping the service name.
    #[must_use]
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self.align_service_name();
        self
    }

    /// Enables metrics and serves the scrape endpoint on `addr`.
    #[must_use]
    pub fn with_metrics_listener(mut self, addr: &str) -> Self {
        self.metrics.enabled = true;
        self.metrics.listen = true;
        self.metrics.addr = addr.to_string();
        self
    }
}
