//! Why a configuration could not be loaded or accepted.

use std::path::PathBuf;

use switchyard_router::RouteError;
use thiserror::Error;

/// A configuration source was unreadable, unparseable or rejected.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested file does not exist.
    #[error("no configuration file at {}", path.display())]
    MissingFile {
        /// The path that was tried.
        path: PathBuf,
    },

    /// The file exists but reading it failed.
    #[error("could not read {}", path.display())]
    Unreadable {
        /// The file.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Neither TOML nor JSON.
    #[error("unsupported configuration format `{0}`")]
    UnsupportedFormat(String),

    /// TOML that does not fit the schema.
    #[error("TOML syntax: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON that does not fit the schema.
    #[error("JSON syntax: {0}")]
    Json(#[from] serde_json::Error),

    /// A `.env` file was present but malformed.
    #[error(".env: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// `[[routes]]` do not form a valid route table.
    #[error("routes: {0}")]
    Routes(#[from] RouteError),

    /// A field holds a value the orchestrator cannot use.
    #[error("`{field}` {reason}")]
    InvalidField {
        /// Dotted path of the field, e.g. `telemetry.metrics.addr`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A `PREFIX__SECTION__KEY` override could not be applied.
    #[error("environment override {var}: {reason}")]
    BadOverride {
        /// The variable name, prefix included.
        var: String,
        /// What was expected.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_override(var: &str, reason: &'static str) -> Self {
        Self::BadOverride {
            var: var.to_string(),
            reason,
        }
    }
}
