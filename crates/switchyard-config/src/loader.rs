//! Layered configuration loading.
//!
//! Layers apply in order, later ones overriding earlier ones:
//! 1. Defaults or a preset
//! 2. A configuration file (TOML or JSON)
//! 3. A `.env` file, loaded into the process environment
//! 4. `PREFIX__SECTION__KEY` environment variables

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use switchyard_telemetry::LogFormat;

use crate::{ConfigError, SwitchyardConfig};

/// Configuration loader with a layered approach.
///
/// # Example
///
/// ```no_run
/// use switchyard_config::ConfigLoader;
///
/// # fn main() -> Result<(), switchyard_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_file("switchyard.toml")?
///     .with_dotenv()?
///     .with_env_prefix("SWITCHYARD")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: SwitchyardConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SwitchyardConfig::default(),
            env_prefix: None,
        }
    }

    /// Start from default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = SwitchyardConfig::default();
        self
    }

    /// Start from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = SwitchyardConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = SwitchyardConfig::production();
        self
    }

    /// Load a configuration file. The format follows the extension
    /// (`.toml` or `.json`).
    ///
    /// The file replaces the current configuration; sections it omits take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed
    /// or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        self.config = Self::parse_file(&content, path)?;

        Ok(self)
    }

    /// Load a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `format` (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use switchyard_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(r#"{ "app": { "name": "orders" } }"#, "json")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.app.name, "orders");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat(format.to_string()))
            }
        };
        Ok(self)
    }

    /// Load `.env` from the working directory or its parents, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if a `.env` file exists but is
    /// malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a specific `.env`-style file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or
    /// malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Apply `PREFIX__SECTION__KEY` overrides from the process environment
    /// when loading.
    ///
    /// - `SWITCHYARD__APP__NAME=orders`
    /// - `SWITCHYARD__ENV__DATABASE_URL=postgres://db/orders`
    /// - `SWITCHYARD__TELEMETRY__LOGGING__LEVEL=debug`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Apply overrides from an explicit variable list instead of the process
    /// environment. Keys must carry the `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::BadOverride` if a value cannot be parsed.
    pub fn with_env_vars<I, K, V>(mut self, prefix: &str, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let prefix = prefix.to_uppercase();
        for (key, value) in vars {
            if key.as_ref().starts_with(&prefix) {
                self.apply_env_var(key.as_ref(), value.as_ref(), &prefix)?;
            }
        }
        Ok(self)
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    pub fn load(mut self) -> Result<SwitchyardConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: HashMap<String, String> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            self = self.with_env_vars(&prefix, vars)?;
        }

        self.config.telemetry.align_service_name();
        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(mut self) -> SwitchyardConfig {
        self.config.telemetry.align_service_name();
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<SwitchyardConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::bad_override(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let telemetry = &mut self.config.telemetry;

        match parts.as_slice() {
            ["APP", "NAME"] => self.config.app.name = value.to_string(),
            ["APP", "ENVIRONMENT"] => self.config.app.environment = value.to_string(),

            // Environment values keep the key as written.
            ["ENV", name] if !name.is_empty() => {
                self.config.env.insert((*name).to_string(), value.to_string());
            }

            ["ERRORS", "INTERNAL_MESSAGE"] => {
                self.config.errors.internal_message = value.to_string();
            }

            ["TELEMETRY", "SERVICE_NAME"] => telemetry.service_name = value.to_string(),
            ["TELEMETRY", "SERVICE_VERSION"] => telemetry.service_version = value.to_string(),
            ["TELEMETRY", "ENVIRONMENT"] => telemetry.environment = value.to_string(),

            ["TELEMETRY", "METRICS", "ENABLED"] => {
                telemetry.metrics.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::bad_override(key, "expected boolean"))?;
            }
            ["TELEMETRY", "METRICS", "LISTEN"] => {
                telemetry.metrics.listen = parse_bool(value)
                    .ok_or_else(|| ConfigError::bad_override(key, "expected boolean"))?;
            }
            ["TELEMETRY", "METRICS", "ADDR"] => telemetry.metrics.addr = value.to_string(),

            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                telemetry.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::bad_override(key, "expected boolean"))?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => telemetry.logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    "compact" => LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::bad_override(
                            key,
                            "expected 'json', 'pretty' or 'compact'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "LOGGING", "ANSI"] => {
                telemetry.logging.ansi = parse_bool(value)
                    .ok_or_else(|| ConfigError::bad_override(key, "expected boolean"))?;
            }

            // Routes are structured and only come from files or code.
            _ => {}
        }

        Ok(())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.app.name, "switchyard-app");
    }

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.telemetry.logging.level, "debug");
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_with_string_toml() {
        let toml = r#"
            [app]
            name = "orders"

            [[routes]]
            name = "item"
            method = "get"
            path = "/test/{id}"
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.app.name, "orders");
        assert_eq!(config.routes.len(), 1);
    }

    #[test]
    fn test_service_name_reaches_metrics_and_logging() {
        let config = ConfigLoader::new()
            .with_string("[telemetry]\nservice_name = \"orders\"", "toml")
            .unwrap()
            .with_env_vars("SWITCHYARD", [("SWITCHYARD__TELEMETRY__SERVICE_NAME", "orders-eu")])
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.telemetry.service_name, "orders-eu");
        assert_eq!(config.telemetry.metrics.service_name, "orders-eu");
        assert_eq!(config.telemetry.logging.service_name, "orders-eu");
    }

    #[test]
    fn test_loader_unknown_format() {
        assert!(ConfigLoader::new().with_string("", "yaml").is_err());
    }

    #[test]
    fn test_loader_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [errors]
            internal_message = "Something went wrong"

            [telemetry.metrics]
            enabled = false
            "#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.errors.internal_message, "Something went wrong");
        assert!(!config.telemetry.metrics.enabled);
    }

    #[test]
    fn test_loader_with_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{ "routes": [{{ "name": "chat", "method": "socket", "path": "/chat" }}] }}"#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();
        assert!(config.routes[0].is_socket_only());
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/switchyard.toml");
        assert!(matches!(result, Err(ConfigError::MissingFile { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/switchyard.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, SwitchyardConfig::default());
    }

    #[test]
    fn test_loader_rejects_invalid_routes() {
        let toml = r#"
            [[routes]]
            name = "a"
            method = "get"
            path = "/x"

            [[routes]]
            name = "a"
            method = "get"
            path = "/y"
        "#;
        let result = ConfigLoader::new().with_string(toml, "toml").unwrap().load();
        assert!(result.is_err());
    }

    #[test]
    fn test_env_vars_override() {
        let config = ConfigLoader::new()
            .with_env_vars(
                "TEST",
                [
                    ("TEST__APP__NAME", "from-env"),
                    ("TEST__ENV__DATABASE_URL", "postgres://db"),
                    ("TEST__TELEMETRY__LOGGING__LEVEL", "warn"),
                    ("TEST__TELEMETRY__LOGGING__FORMAT", "compact"),
                    ("TEST__TELEMETRY__METRICS__LISTEN", "on"),
                    ("OTHER__APP__NAME", "ignored"),
                ],
            )
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.app.name, "from-env");
        assert_eq!(config.env["DATABASE_URL"], "postgres://db");
        assert_eq!(config.telemetry.logging.level, "warn");
        assert_eq!(config.telemetry.logging.format, LogFormat::Compact);
        assert!(config.telemetry.metrics.listen);
    }

    #[test]
    fn test_env_var_invalid_boolean() {
        let result = ConfigLoader::new()
            .with_env_vars("TEST", [("TEST__TELEMETRY__METRICS__ENABLED", "maybe")]);
        assert!(matches!(result, Err(ConfigError::BadOverride { .. })));
    }

    #[test]
    fn test_dotenv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "SWITCHYARD_DOTENV_TEST_MARKER=loaded").unwrap();

        ConfigLoader::new().with_dotenv_file(file.path()).unwrap();
        assert_eq!(
            env::var("SWITCHYARD_DOTENV_TEST_MARKER").as_deref(),
            Ok("loaded")
        );
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
