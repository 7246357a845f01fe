//! Runtime adapters.
//!
//! Each hosting environment delivers its own event shape and expects its own
//! reply shape. Adapters decode an [`Event`] into an [`Inbound`] call before
//! any stage runs and encode the final [`Response`] back into a [`Reply`].
//!
//! | Runtime            | Event                          | Reply                                  |
//! |--------------------|--------------------------------|----------------------------------------|
//! | `http-framework`   | `http::Request<Bytes>`         | `http::Response<Full<Bytes>>`          |
//! | `cloud-function-a` | gateway-proxy JSON event       | `{ statusCode, headers, body, isBase64Encoded }` |
//! | `cloud-function-b` | direct-invocation JSON event   | `{ status, headers, body }`            |
//! | `socket`           | JSON message on a connection   | [`SocketEmission`](switchyard_core::SocketEmission) on the same connection |
//!
//! Decoding is eager: path, query and body are parsed once, here. An event
//! that does not have the shape its runtime requires becomes a system fault
//! which only the `end` stage observes.

pub mod function_a;
pub mod function_b;
pub mod http;
pub mod socket;

use ::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use ::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use http_body_util::Full;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use switchyard_core::{
    Fault, Inbound, RequestId, RequestInfo, Response, RouteMethod, RuntimeKind, SocketHandle,
};

pub use self::socket::SocketHub;

/// Content type of every serialized body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// An inbound event, tagged with the runtime it came from.
#[derive(Debug)]
pub enum Event {
    /// A buffered HTTP request.
    Http(::http::Request<Bytes>),
    /// A gateway-proxy function event.
    FunctionA(Value),
    /// A direct-invocation function event.
    FunctionB(Value),
    /// One message received on a socket connection.
    Socket {
        /// Write side of the connection the message arrived on.
        handle: SocketHandle,
        /// The message.
        message: Value,
    },
}

impl Event {
    /// Runtime the event belongs to.
    #[must_use]
    pub const fn runtime(&self) -> RuntimeKind {
        match self {
            Self::Http(_) => RuntimeKind::HttpFramework,
            Self::FunctionA(_) => RuntimeKind::CloudFunctionA,
            Self::FunctionB(_) => RuntimeKind::CloudFunctionB,
            Self::Socket { .. } => RuntimeKind::Socket,
        }
    }

    /// A socket message event.
    #[must_use]
    pub const fn socket(handle: SocketHandle, message: Value) -> Self {
        Self::Socket { handle, message }
    }
}

impl From<::http::Request<Bytes>> for Event {
    fn from(request: ::http::Request<Bytes>) -> Self {
        Self::Http(request)
    }
}

/// The host-shaped reply to one event.
#[derive(Debug)]
pub enum Reply {
    /// HTTP response.
    Http(::http::Response<Full<Bytes>>),
    /// Gateway-proxy function result.
    FunctionA(Value),
    /// Direct-invocation function result.
    FunctionB(Value),
    /// The reply was written to the originating socket connection.
    Emitted,
}

impl Reply {
    /// Status carried by the reply. `None` for socket replies, whose status
    /// travels inside the emission.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http(response) => Some(response.status()),
            Self::FunctionA(value) => status_field(value, "statusCode"),
            Self::FunctionB(value) => status_field(value, "status"),
            Self::Emitted => None,
        }
    }

    /// The HTTP response, if this is an HTTP reply.
    #[must_use]
    pub fn into_http(self) -> Option<::http::Response<Full<Bytes>>> {
        match self {
            Self::Http(response) => Some(response),
            _ => None,
        }
    }

    /// The JSON result, if this is a function reply.
    #[must_use]
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::FunctionA(value) | Self::FunctionB(value) => Some(value),
            _ => None,
        }
    }
}

fn status_field(value: &Value, field: &str) -> Option<StatusCode> {
    value
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
}

/// Where the response of a decoded event goes.
#[derive(Debug)]
pub(crate) enum ReplyTarget {
    Http,
    FunctionA,
    FunctionB,
    Socket {
        handle: SocketHandle,
        correlation: Option<String>,
        path: String,
    },
}

impl ReplyTarget {
    /// The connection handle for socket replies.
    pub(crate) const fn socket(&self) -> Option<&SocketHandle> {
        match self {
            Self::Socket { handle, .. } => Some(handle),
            _ => None,
        }
    }

    pub(crate) fn encode(self, response: Response) -> Reply {
        match self {
            Self::Http => Reply::Http(http::encode(&response)),
            Self::FunctionA => Reply::FunctionA(function_a::encode(&response)),
            Self::FunctionB => Reply::FunctionB(function_b::encode(&response)),
            Self::Socket {
                handle,
                correlation,
                path,
            } => {
                socket::emit(&handle, correlation, path, &response);
                Reply::Emitted
            }
        }
    }
}

/// An event that could not be decoded, with what is known about it.
#[derive(Debug)]
pub(crate) struct Malformed {
    pub(crate) fault: Fault,
    pub(crate) info: RequestInfo,
}

impl Malformed {
    fn new(runtime: RuntimeKind, method: RouteMethod, path: &str, detail: impl std::fmt::Display) -> Self {
        let fault = Fault::system(format!("malformed {runtime} event: {detail}"));
        Self {
            fault,
            info: Inbound::new(runtime, method, path).info(),
        }
    }

    /// Keeps the fault a decoder produced, e.g. a client fault for a body
    /// that is not valid JSON.
    fn with_fault(fault: Fault, inbound: &Inbound) -> Self {
        Self {
            fault,
            info: inbound.info(),
        }
    }
}

/// A decoded event: where its reply goes and the call itself.
#[derive(Debug)]
pub(crate) struct Decoded {
    pub(crate) target: ReplyTarget,
    pub(crate) call: Result<Inbound, Malformed>,
}

impl Decoded {
    pub(crate) fn request_id(&self) -> RequestId {
        match &self.call {
            Ok(inbound) => inbound.id,
            Err(malformed) => malformed.info.id,
        }
    }
}

/// Decodes an event for its runtime.
pub(crate) fn decode(event: Event) -> Decoded {
    match event {
        Event::Http(request) => Decoded {
            target: ReplyTarget::Http,
            call: http::decode(request),
        },
        Event::FunctionA(event) => Decoded {
            target: ReplyTarget::FunctionA,
            call: function_a::decode(event),
        },
        Event::FunctionB(event) => Decoded {
            target: ReplyTarget::FunctionB,
            call: function_b::decode(event),
        },
        Event::Socket { handle, message } => socket::decode(handle, message),
    }
}

/// Parses a URL query string.
pub(crate) fn parse_query(query: &str) -> Result<IndexMap<String, String>, Fault> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map(|pairs| pairs.into_iter().collect())
        .map_err(|e| Fault::bad_request(format!("invalid query string: {e}")))
}

/// Flattens a JSON object of scalars into strings. `null` entries are dropped.
pub(crate) fn string_map(map: Option<&Map<String, Value>>) -> IndexMap<String, String> {
    map.into_iter()
        .flatten()
        .filter_map(|(key, value)| scalar_string(value).map(|v| (key.clone(), v)))
        .collect()
}

/// Builds a header map from a JSON object. Invalid names or values are
/// dropped.
pub(crate) fn header_map(map: Option<&Map<String, Value>>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (key, value) in string_map(map) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.append(name, value);
        }
    }
    headers
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Decodes a request body.
///
/// Empty bodies are `null`. JSON content types must parse; a form content
/// type becomes an object of strings. Anything else is parsed as JSON when
/// possible and otherwise kept as a string.
pub(crate) fn decode_body(body: &[u8], content_type: Option<&str>) -> Result<Value, Fault> {
    if body.is_empty() {
        return Ok(Value::Null);
    }

    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match mime.as_deref() {
        Some(ct) if ct == JSON_CONTENT_TYPE || ct.ends_with("+json") => serde_json::from_slice(body)
            .map_err(|e| Fault::bad_request(format!("invalid JSON body: {e}"))),
        Some("application/x-www-form-urlencoded") => {
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
                .map(|pairs| {
                    Value::Object(
                        pairs
                            .into_iter()
                            .map(|(k, v)| (k, Value::String(v)))
                            .collect(),
                    )
                })
                .map_err(|e| Fault::bad_request(format!("invalid form body: {e}")))
        }
        _ => Ok(serde_json::from_slice(body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(body).into_owned())
        })),
    }
}

/// Serializes a body for the wire. Bodies are already JSON values, so this
/// cannot fail in practice.
pub(crate) fn body_bytes(body: &Value) -> Bytes {
    serde_json::to_vec(body).map_or_else(|_| Bytes::from_static(b"null"), Bytes::from)
}

/// Response headers as a JSON object, with the JSON content type added when
/// no handler set one.
pub(crate) fn reply_headers(response: &Response) -> Map<String, Value> {
    let mut headers = response.headers_json();
    if !response.headers().contains_key(CONTENT_TYPE) {
        headers.insert(
            CONTENT_TYPE.as_str().to_string(),
            Value::String(JSON_CONTENT_TYPE.to_string()),
        );
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_body_variants() {
        assert_eq!(decode_body(b"", None).unwrap(), Value::Null);
        assert_eq!(
            decode_body(br#"{"a":1}"#, Some("application/json; charset=utf-8")).unwrap(),
            json!({ "a": 1 })
        );
        assert_eq!(
            decode_body(b"a=1&b=two", Some("application/x-www-form-urlencoded")).unwrap(),
            json!({ "a": "1", "b": "two" })
        );
        assert_eq!(decode_body(b"[1,2]", None).unwrap(), json!([1, 2]));
        assert_eq!(decode_body(b"plain", Some("text/plain")).unwrap(), json!("plain"));
    }

    #[test]
    fn test_invalid_json_body_is_client_fault() {
        let err = decode_body(b"{oops", Some("application/json")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_query() {
        let query = parse_query("q=rust%20lang&page=2").unwrap();
        assert_eq!(query.get("q").map(String::as_str), Some("rust lang"));
        assert_eq!(query.get("page").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_string_and_header_maps() {
        let raw = json!({ "n": 5, "flag": true, "s": "x", "gone": null });
        let map = string_map(raw.as_object());
        assert_eq!(map.get("n").map(String::as_str), Some("5"));
        assert_eq!(map.get("flag").map(String::as_str), Some("true"));
        assert!(!map.contains_key("gone"));

        let headers = header_map(json!({ "X-Tenant": "acme", "bad header": "v" }).as_object());
        assert_eq!(headers.get("x-tenant").unwrap(), "acme");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_reply_headers_default_content_type() {
        let response = Response::new(Value::Null);
        assert_eq!(reply_headers(&response)["content-type"], JSON_CONTENT_TYPE);

        let response = Response::new(Value::Null).with_header("content-type", "text/csv");
        assert_eq!(reply_headers(&response)["content-type"], "text/csv");
    }

    #[test]
    fn test_reply_status() {
        let reply = Reply::FunctionB(json!({ "status": 404 }));
        assert_eq!(reply.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(Reply::Emitted.status(), None);
    }
}
