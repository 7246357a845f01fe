//! Normalized responses.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Fault, FaultKind, INTERNAL_ERROR_MESSAGE};
use crate::request::RequestInfo;

/// Marks a response as produced from a fault rather than by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMarker {
    /// Kind of the fault.
    pub kind: FaultKind,
    /// Message exposed to the caller.
    pub message: String,
}

/// A normalized response.
///
/// Created from a controller's return value or from a fault, then passed
/// through the `out` and `end` handlers before a runtime adapter serializes
/// it for the host.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
    error: Option<ErrorMarker>,
    info: Option<RequestInfo>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl Response {
    /// A 200 response with `body`.
    #[must_use]
    pub fn new(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body,
            error: None,
            info: None,
        }
    }

    /// Maps a fault using the default generic message for exceptional faults.
    #[must_use]
    pub fn from_fault(fault: &Fault) -> Self {
        Self::from_fault_with_message(fault, INTERNAL_ERROR_MESSAGE)
    }

    /// Maps a fault, replacing the message of data and system faults with
    /// `internal_message`.
    ///
    /// Client faults keep their status, message and details. Data and system
    /// faults become a 500 carrying only `internal_message`.
    #[must_use]
    pub fn from_fault_with_message(fault: &Fault, internal_message: &str) -> Self {
        let message = if fault.is_exceptional() {
            internal_message
        } else {
            fault.public_message()
        };

        let mut body = json!({ "message": message });
        if let (Some(details), Value::Object(map)) = (fault.public_details(), &mut body) {
            map.insert("details".to_string(), details.clone());
        }

        Self {
            status: fault.status_code(),
            headers: HeaderMap::new(),
            body,
            error: Some(ErrorMarker {
                kind: fault.kind(),
                message: message.to_string(),
            }),
            info: None,
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Replaces the status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing existing values. Returns false if the name or
    /// value is invalid.
    pub fn insert_header(&mut self, name: &str, value: &str) -> bool {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
                true
            }
            _ => false,
        }
    }

    /// Body.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Mutable body.
    pub fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }

    /// Error marker, present when the response was mapped from a fault.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorMarker> {
        self.error.as_ref()
    }

    /// Returns true if the response was mapped from a fault.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Summary of the invocation this response answers.
    #[must_use]
    pub const fn info(&self) -> Option<&RequestInfo> {
        self.info.as_ref()
    }

    /// Labels the response with the invocation it answers.
    pub fn set_info(&mut self, info: RequestInfo) {
        self.info = Some(info);
    }

    /// Headers as a JSON object of strings, for the function and socket
    /// reply shapes. Repeated headers are joined with `, `.
    #[must_use]
    pub fn headers_json(&self) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        for name in self.headers.keys() {
            let joined = self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(", ");
            map.insert(name.as_str().to_string(), Value::String(joined));
        }
        map
    }
}

/// Conversion of controller return values into a [`Response`].
///
/// Bare payloads become a 200 response; pair a payload with a status to
/// override it.
pub trait IntoResponse {
    /// Performs the conversion.
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for Value {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::new(Value::String(self))
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::new(Value::String(self.to_string()))
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::new(Value::Null)
    }
}

impl<T: IntoResponse> IntoResponse for (StatusCode, T) {
    fn into_response(self) -> Response {
        self.1.into_response().with_status(self.0)
    }
}
