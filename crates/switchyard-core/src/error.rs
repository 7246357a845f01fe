//! Fault taxonomy.
//!
//! Every failure raised while handling an invocation is a [`Fault`] of one of
//! three kinds:
//!
//! | Kind | Raised by | Caller sees |
//! |---|---|---|
//! | `Client` | validation, not-found, authorization checks | its own status and message |
//! | `Data` | data-access collaborators | 500, generic message |
//! | `System` | misconfiguration, unexpected failures, panics | 500, generic message |
//!
//! Details and source errors of data and system faults are only ever logged.
//! Each fault also carries a [`LogLevel`] that decides how it is logged; the
//! level never changes what the caller receives.

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Message returned to callers for data and system faults.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Result type alias using [`Fault`].
pub type FaultResult<T> = Result<T, Fault>;

/// The three fault kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Expected failure caused by the caller.
    Client,
    /// Failure reported by a data-access collaborator.
    Data,
    /// Programming or configuration fault.
    System,
}

impl FaultKind {
    /// Returns `true` for data and system faults.
    #[must_use]
    pub const fn is_exceptional(&self) -> bool {
        !matches!(self, Self::Client)
    }

    /// Log level applied when a fault does not set one.
    #[must_use]
    pub const fn default_log_level(&self) -> LogLevel {
        match self {
            Self::Client => LogLevel::Info,
            Self::Data | Self::System => LogLevel::Error,
        }
    }

    /// Kind name as used in logs and metrics labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Data => "data",
            Self::System => "system",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How loudly a fault is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level, including details and the source chain.
    All,
    /// Error level.
    Error,
    /// Warning level.
    Warning,
    /// Info level.
    Info,
    /// Not logged.
    None,
}

impl LogLevel {
    /// Level name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::None => "none",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// A failure raised anywhere in an invocation.
///
/// # Example
///
/// ```
/// use switchyard_core::{Fault, FaultKind};
/// use http::StatusCode;
///
/// fn find(id: &str) -> Result<(), Fault> {
///     if id.is_empty() {
///         return Err(Fault::bad_request("id must not be empty"));
///     }
///     Err(Fault::not_found())
/// }
///
/// let fault = find("42").unwrap_err();
/// assert_eq!(fault.kind(), FaultKind::Client);
/// assert_eq!(fault.status_code(), StatusCode::NOT_FOUND);
/// assert_eq!(fault.public_message(), "Not Found");
/// ```
#[derive(Error, Debug)]
pub enum Fault {
    /// Failure caused by the caller; safe to expose.
    #[error("Client error ({status}): {message}")]
    Client {
        /// Status returned to the caller.
        status: StatusCode,
        /// Message returned to the caller.
        message: String,
        /// Structured details returned to the caller.
        details: Option<Value>,
        /// Logging verbosity.
        log_level: LogLevel,
    },

    /// Data-access failure; never exposed.
    #[error("Data error: {message}")]
    Data {
        /// Message, logged only.
        message: String,
        /// Driver-level details, logged only.
        details: Option<Value>,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
        /// Logging verbosity.
        log_level: LogLevel,
    },

    /// Programming, configuration or unexpected failure; never exposed.
    #[error("System error: {message}")]
    System {
        /// Message, logged only.
        message: String,
        /// Diagnostic details, logged only.
        details: Option<Value>,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
        /// Logging verbosity.
        log_level: LogLevel,
    },
}

impl Fault {
    /// Creates a client fault with an explicit status.
    #[must_use]
    pub fn client(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Client {
            status,
            message: message.into(),
            details: None,
            log_level: FaultKind::Client.default_log_level(),
        }
    }

    /// 400 client fault.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::client(StatusCode::BAD_REQUEST, message)
    }

    /// 401 client fault.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::client(StatusCode::UNAUTHORIZED, message)
    }

    /// 403 client fault.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::client(StatusCode::FORBIDDEN, message)
    }

    /// 404 client fault with the message `Not Found`.
    #[must_use]
    pub fn not_found() -> Self {
        Self::client(StatusCode::NOT_FOUND, "Not Found")
    }

    /// Creates a data fault.
    #[must_use]
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
            details: None,
            source: None,
            log_level: FaultKind::Data.default_log_level(),
        }
    }

    /// Creates a data fault wrapping a driver error.
    pub fn data_with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Data {
            message: message.into(),
            details: None,
            source: Some(source.into()),
            log_level: FaultKind::Data.default_log_level(),
        }
    }

    /// Creates a system fault.
    #[must_use]
    pub fn system(message: impl Into<String>) -> Self {
        Self::System {
            message: message.into(),
            details: None,
            source: None,
            log_level: FaultKind::System.default_log_level(),
        }
    }

    /// Creates a system fault wrapping another error.
    pub fn system_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::System {
            message: message.into(),
            details: None,
            source: Some(source.into()),
            log_level: FaultKind::System.default_log_level(),
        }
    }

    /// Creates a system fault from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let reason = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::system(format!("handler panicked: {reason}"))
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, value: Value) -> Self {
        match &mut self {
            Self::Client { details, .. } | Self::Data { details, .. } | Self::System { details, .. } => {
                *details = Some(value);
            }
        }
        self
    }

    /// Overrides the logging verbosity.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        match &mut self {
            Self::Client { log_level, .. }
            | Self::Data { log_level, .. }
            | Self::System { log_level, .. } => *log_level = level,
        }
        self
    }

    /// The fault kind.
    #[must_use]
    pub const fn kind(&self) -> FaultKind {
        match self {
            Self::Client { .. } => FaultKind::Client,
            Self::Data { .. } => FaultKind::Data,
            Self::System { .. } => FaultKind::System,
        }
    }

    /// The fault's own message. Not necessarily safe to expose; see
    /// [`Fault::public_message`].
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Client { message, .. } | Self::Data { message, .. } | Self::System { message, .. } => {
                message
            }
        }
    }

    /// Structured details, if any.
    #[must_use]
    pub const fn details(&self) -> Option<&Value> {
        match self {
            Self::Client { details, .. } | Self::Data { details, .. } | Self::System { details, .. } => {
                details.as_ref()
            }
        }
    }

    /// Logging verbosity.
    #[must_use]
    pub const fn log_level(&self) -> LogLevel {
        match self {
            Self::Client { log_level, .. }
            | Self::Data { log_level, .. }
            | Self::System { log_level, .. } => *log_level,
        }
    }

    /// Returns `true` for data and system faults.
    #[must_use]
    pub const fn is_exceptional(&self) -> bool {
        self.kind().is_exceptional()
    }

    /// Status returned to the caller.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Client { status, .. } => *status,
            Self::Data { .. } | Self::System { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller.
    #[must_use]
    pub fn public_message(&self) -> &str {
        match self {
            Self::Client { message, .. } => message,
            Self::Data { .. } | Self::System { .. } => INTERNAL_ERROR_MESSAGE,
        }
    }

    /// Details returned to the caller. Always `None` for exceptional faults.
    #[must_use]
    pub const fn public_details(&self) -> Option<&Value> {
        match self {
            Self::Client { details, .. } => details.as_ref(),
            Self::Data { .. } | Self::System { .. } => None,
        }
    }

    /// Source chain rendered on one line.
    #[must_use]
    pub fn source_chain(&self) -> Option<String> {
        match self {
            Self::Data { source, .. } | Self::System { source, .. } => {
                source.as_ref().map(|e| format!("{e:#}"))
            }
            Self::Client { .. } => None,
        }
    }

    /// Logs the fault according to its [`LogLevel`].
    pub fn report(&self) {
        let kind = self.kind().name();
        let status = self.status_code().as_u16();
        let error = self.message();

        match self.log_level() {
            LogLevel::None => {}
            LogLevel::Info => tracing::info!(fault_kind = kind, status, error, "invocation failed"),
            LogLevel::Warning => {
                tracing::warn!(fault_kind = kind, status, error, "invocation failed");
            }
            LogLevel::Error => {
                tracing::error!(fault_kind = kind, status, error, "invocation failed");
            }
            LogLevel::All => {
                let details = self.details().map(ToString::to_string);
                let source = self.source_chain();
                tracing::error!(
                    fault_kind = kind,
                    status,
                    error,
                    details = details.as_deref(),
                    source = source.as_deref(),
                    "invocation failed"
                );
            }
        }
    }
}

impl From<anyhow::Error> for Fault {
    fn from(err: anyhow::Error) -> Self {
        Self::system_with_source("unhandled failure", err)
    }
}

impl From<serde_json::Error> for Fault {
    fn from(err: serde_json::Error) -> Self {
        Self::system_with_source("JSON serialization failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_fault_is_exposed() {
        let fault = Fault::client(StatusCode::UNPROCESSABLE_ENTITY, "name is required")
            .with_details(json!({ "field": "name" }));

        assert_eq!(fault.kind(), FaultKind::Client);
        assert!(!fault.is_exceptional());
        assert_eq!(fault.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(fault.public_message(), "name is required");
        assert_eq!(fault.public_details(), Some(&json!({ "field": "name" })));
        assert_eq!(fault.log_level(), LogLevel::Info);
    }

    #[test]
    fn test_not_found() {
        let fault = Fault::not_found();
        assert_eq!(fault.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(fault.public_message(), "Not Found");
    }

    #[test]
    fn test_data_fault_is_hidden() {
        let fault = Fault::data_with_source("insert failed", anyhow::anyhow!("duplicate key"))
            .with_details(json!({ "table": "users" }));

        assert_eq!(fault.kind(), FaultKind::Data);
        assert!(fault.is_exceptional());
        assert_eq!(fault.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fault.public_message(), INTERNAL_ERROR_MESSAGE);
        assert!(fault.public_details().is_none());
        assert_eq!(fault.details(), Some(&json!({ "table": "users" })));
        assert_eq!(fault.source_chain().as_deref(), Some("duplicate key"));
    }

    #[test]
    fn test_system_fault_is_hidden() {
        let fault = Fault::system("controller missing");
        assert_eq!(fault.kind(), FaultKind::System);
        assert_eq!(fault.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fault.public_message(), INTERNAL_ERROR_MESSAGE);
        assert!(fault.to_string().contains("controller missing"));
    }

    #[test]
    fn test_log_level_override() {
        let fault = Fault::system("noisy").with_log_level(LogLevel::None);
        assert_eq!(fault.log_level(), LogLevel::None);
        assert_eq!(fault.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("all".parse::<LogLevel>().unwrap(), LogLevel::All);
        assert!("loud".parse::<LogLevel>().is_err());
        let level: LogLevel = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(level, LogLevel::None);
    }

    #[test]
    fn test_from_anyhow_is_system() {
        let fault: Fault = anyhow::anyhow!("boom").into();
        assert_eq!(fault.kind(), FaultKind::System);
        assert_eq!(fault.source_chain().as_deref(), Some("boom"));
    }

    #[test]
    fn test_from_panic_payload() {
        let payload: Box<dyn Any + Send> = Box::new("exploded");
        let fault = Fault::from_panic(payload.as_ref());
        assert_eq!(fault.kind(), FaultKind::System);
        assert!(fault.message().contains("exploded"));

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert!(Fault::from_panic(payload.as_ref()).message().contains("owned"));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Reports `fault` under a fresh subscriber and returns what it wrote.
    fn reported(fault: &Fault) -> String {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, || fault.report());
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn leaky(level: LogLevel) -> Fault {
        Fault::data_with_source("replica lag", anyhow::anyhow!("db-3 unreachable"))
            .with_details(json!({ "dsn": "postgres://db-3" }))
            .with_log_level(level)
    }

    #[test]
    fn test_report_none_is_silent() {
        assert_eq!(reported(&leaky(LogLevel::None)), "");
    }

    #[test]
    fn test_report_all_includes_details_and_source() {
        let out = reported(&leaky(LogLevel::All));
        assert!(out.contains("ERROR"), "{out}");
        assert!(out.contains("replica lag"), "{out}");
        assert!(out.contains("postgres://db-3"), "{out}");
        assert!(out.contains("db-3 unreachable"), "{out}");
    }

    #[test]
    fn test_report_error_omits_details() {
        let out = reported(&leaky(LogLevel::Error));
        assert!(out.contains("ERROR"), "{out}");
        assert!(out.contains("replica lag"), "{out}");
        assert!(!out.contains("postgres://db-3"), "{out}");
        assert!(!out.contains("db-3 unreachable"), "{out}");
    }

    #[test]
    fn test_report_uses_warning_and_info_levels() {
        let warn = reported(&leaky(LogLevel::Warning));
        assert!(warn.contains("WARN"), "{warn}");
        assert!(!warn.contains("ERROR"), "{warn}");

        let info = reported(&leaky(LogLevel::Info));
        assert!(info.contains("INFO"), "{info}");
        assert!(!info.contains("WARN"), "{info}");
        assert!(!info.contains("postgres://db-3"), "{info}");
    }
}
