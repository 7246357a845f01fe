//! Configuration sections owned by this crate.
//!
//! The `telemetry` section reuses [`switchyard_telemetry::TelemetryConfig`]
//! and `routes` reuses [`switchyard_router::Route`].

use serde::{Deserialize, Serialize};

/// Application identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Deployment environment (e.g. `development`, `production`).
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_environment(),
        }
    }
}

fn default_app_name() -> String {
    "switchyard-app".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Error response settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorsConfig {
    /// Message returned in place of data and system fault messages.
    #[serde(default = "default_internal_message")]
    pub internal_message: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            internal_message: default_internal_message(),
        }
    }
}

fn default_internal_message() -> String {
    "Internal Server Error".to_string()
}
