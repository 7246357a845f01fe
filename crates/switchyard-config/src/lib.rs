//! Typed configuration for Switchyard applications.
//!
//! - TOML and JSON configuration files
//! - `.env` files via `dotenvy`
//! - Environment variable overrides (`PREFIX__SECTION__KEY`)
//! - Strict parsing (unknown fields are errors)
//! - Validation of routes, log filters and the metrics address
//!
//! # Configuration File Format
//!
//! ```toml
//! [app]
//! name = "orders"
//! environment = "production"
//!
//! [env]
//! DATABASE_URL = "postgres://db/orders"
//!
//! [errors]
//! internal_message = "Internal Server Error"
//!
//! [telemetry]
//! service_name = "orders"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! listen = true
//! addr = "0.0.0.0:9090"
//!
//! [[routes]]
//! name = "item"
//! method = "get"
//! path = "/test/{id}"
//!
//! [[routes]]
//! name = "chat"
//! method = "socket"
//! path = "/chat/{room}"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use switchyard_config::ConfigLoader;
//!
//! # fn main() -> Result<(), switchyard_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("switchyard.toml")?
//!     .with_env_prefix("SWITCHYARD")
//!     .load()?;
//!
//! println!("{} routes declared", config.routes.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{SwitchyardConfig, SwitchyardConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{AppConfig, ErrorsConfig};
pub use switchyard_telemetry::{LogConfig, LogFormat, MetricsConfig, TelemetryConfig};
