//! The top-level [`SwitchyardConfig`] and its builder.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use switchyard_router::{Route, RouteTable};
use switchyard_telemetry::logging::{create_env_filter, LogFormat};
use switchyard_telemetry::TelemetryConfig;

use crate::{AppConfig, ConfigError, ErrorsConfig};

/// Complete configuration of a Switchyard application.
///
/// # Example
///
/// ```
/// use switchyard_config::SwitchyardConfig;
///
/// let config: SwitchyardConfig = toml::from_str(r#"
///     [app]
///     name = "orders"
///
///     [env]
///     DATABASE_URL = "postgres://localhost/orders"
///
///     [[routes]]
///     name = "item"
///     method = "get"
///     path = "/test/{id}"
/// "#).unwrap();
///
/// assert_eq!(config.routes[0].name, "item");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SwitchyardConfig {
    /// Application identity.
    #[serde(default)]
    pub app: AppConfig,

    /// Free-form values copied into the globals' environment map.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Error response settings.
    #[serde(default)]
    pub errors: ErrorsConfig,

    /// Ordered route declarations. The first matching route wins.
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl SwitchyardConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> SwitchyardConfigBuilder {
        SwitchyardConfigBuilder::new()
    }

    /// Builds the route table declared by `routes`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Routes` for empty or duplicate route names,
    /// routes without methods and malformed path patterns.
    pub fn route_table(&self) -> Result<RouteTable, ConfigError> {
        Ok(RouteTable::from_routes(self.routes.iter().cloned())?)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - A route is invalid (see [`SwitchyardConfig::route_table`])
    /// - The log filter cannot be parsed
    /// - The metrics listener is enabled with an invalid address
    /// - The internal error message is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.route_table()?;

        if self.telemetry.logging.enabled {
            create_env_filter(&self.telemetry.logging.level)
                .map_err(|e| ConfigError::invalid_field("telemetry.logging.level", e.to_string()))?;
        }

        let metrics = &self.telemetry.metrics;
        if metrics.enabled && metrics.listen && metrics.addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_field(
                "telemetry.metrics.addr",
                format!("invalid socket address: {}", metrics.addr),
            ));
        }

        if self.errors.internal_message.trim().is_empty() {
            return Err(ConfigError::invalid_field(
                "errors.internal_message",
                "must not be empty",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, no metrics listener.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.app.environment = "development".to_string();
        config.telemetry.environment = "development".to_string();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.ansi = true;
        config.telemetry.logging.file_line_info = true;
        config.telemetry.metrics.listen = false;
        config
    }

    /// Production preset: JSON info logs and a metrics listener.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.app.environment = "production".to_string();
        config.telemetry.environment = "production".to_string();
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.logging.ansi = false;
        config.telemetry.metrics.enabled = true;
        config.telemetry.metrics.listen = true;
        config
    }
}

/// Builder for [`SwitchyardConfig`].
#[derive(Debug, Default)]
pub struct SwitchyardConfigBuilder {
    app: Option<AppConfig>,
    env: BTreeMap<String, String>,
    telemetry: Option<TelemetryConfig>,
    errors: Option<ErrorsConfig>,
    routes: Vec<Route>,
}

impl SwitchyardConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application section.
    #[must_use]
    pub fn app(mut self, app: AppConfig) -> Self {
        self.app = Some(app);
        self
    }

    /// Add one environment value.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Set the error response section.
    #[must_use]
    pub fn errors(mut self, errors: ErrorsConfig) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Append a route.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SwitchyardConfig {
        SwitchyardConfig {
            app: self.app.unwrap_or_default(),
            env: self.env,
            telemetry: self.telemetry.unwrap_or_default(),
            errors: self.errors.unwrap_or_default(),
            routes: self.routes,
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<SwitchyardConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use switchyard_router::RouteMethod;

    #[test]
    fn test_default_config() {
        let config = SwitchyardConfig::default();
        assert_eq!(config.app.name, "switchyard-app");
        assert!(config.routes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_routes_keep_order() {
        let config = SwitchyardConfig::builder()
            .route(Route::new("item", Method::GET, "/test/{id}"))
            .route(Route::new("chat", RouteMethod::Socket, "/chat"))
            .env("STAGE", "test")
            .build_validated()
            .unwrap();

        let names: Vec<_> = config.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["item", "chat"]);
        assert_eq!(config.env["STAGE"], "test");
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let result = SwitchyardConfig::builder()
            .route(Route::new("item", Method::GET, "/a"))
            .route(Route::new("item", Method::POST, "/b"))
            .build_validated();

        let err = result.unwrap_err().to_string();
        assert!(err.contains("routes"));
        assert!(err.contains("item"));
    }

    #[test]
    fn test_malformed_pattern_rejected() {
        let config = SwitchyardConfig::builder()
            .route(Route::new("bad", Method::GET, "/items/{}"))
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_metrics_addr() {
        let mut config = SwitchyardConfig::production();
        config.telemetry.metrics.addr = "invalid".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("metrics.addr"));

        // Not checked without a listener.
        config.telemetry.metrics.listen = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_internal_message() {
        let config = SwitchyardConfig::builder()
            .errors(ErrorsConfig {
                internal_message: "  ".to_string(),
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets() {
        let dev = SwitchyardConfig::development();
        assert_eq!(dev.telemetry.logging.format, LogFormat::Pretty);
        assert_eq!(dev.telemetry.logging.level, "debug");
        assert!(!dev.telemetry.metrics.listen);

        let prod = SwitchyardConfig::production();
        assert_eq!(prod.telemetry.logging.format, LogFormat::Json);
        assert!(prod.telemetry.metrics.listen);
        assert_eq!(prod.app.environment, "production");
    }

    #[test]
    fn test_route_method_list() {
        let config: SwitchyardConfig = toml::from_str(
            r#"
            [[routes]]
            name = "item"
            method = ["get", "post"]
            path = "/items/{id}"
        "#,
        )
        .unwrap();
        let table = config.route_table().unwrap();
        assert!(table
            .match_route(&RouteMethod::Http(Method::POST), "/items/9")
            .is_some());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<SwitchyardConfig, _> = toml::from_str(
            r#"
            [app]
            name = "orders"
            region = "eu"
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let config = SwitchyardConfig::builder()
            .route(Route::new("item", Method::GET, "/test/{id}"))
            .build();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[app]"));
        assert!(toml_str.contains("[[routes]]"));

        let back: SwitchyardConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back, config);
    }
}
