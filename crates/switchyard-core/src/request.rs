//! Normalized requests.
//!
//! Every runtime adapter turns its native event into an [`Inbound`] call.
//! Once a route has matched, the call becomes a [`Request`] that flows
//! through the pipeline and into the controller.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use http::{Extensions, HeaderMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchyard_router::{Params, Route, RouteMethod};
use uuid::Uuid;

use crate::globals::Globals;

/// Time-ordered identifier of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new UUID v7 request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID, e.g. one received in a header.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The hosting environment an invocation arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeKind {
    /// Synchronous HTTP framework request/response.
    #[serde(rename = "http-framework")]
    HttpFramework,
    /// Gateway-proxy style cloud function.
    #[serde(rename = "cloud-function-a")]
    CloudFunctionA,
    /// Direct-invocation style cloud function.
    #[serde(rename = "cloud-function-b")]
    CloudFunctionB,
    /// Message on a persistent socket connection.
    #[serde(rename = "socket")]
    Socket,
}

impl RuntimeKind {
    /// Serialized name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::HttpFramework => "http-framework",
            Self::CloudFunctionA => "cloud-function-a",
            Self::CloudFunctionB => "cloud-function-b",
            Self::Socket => "socket",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The host event exactly as received. Opaque to the pipeline; adapters that
/// need it back can downcast to the type they stored.
#[derive(Clone)]
pub struct RawEvent(Arc<dyn Any + Send + Sync>);

impl RawEvent {
    /// Wraps a host event.
    pub fn new<T: Any + Send + Sync>(event: T) -> Self {
        Self(Arc::new(event))
    }

    /// An empty placeholder, used by requests built outside a runtime.
    #[must_use]
    pub fn none() -> Self {
        Self::new(())
    }

    /// Borrows the event as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawEvent(..)")
    }
}

/// Summary of an invocation, carried from the request onto its response so
/// `out` and `end` handlers know what they are finishing.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Request id.
    pub id: RequestId,
    /// Runtime the call arrived from.
    pub runtime: RuntimeKind,
    /// Method of the call.
    pub method: RouteMethod,
    /// Request path, without query string.
    pub path: String,
    /// Name of the matched route, if one matched.
    pub route: Option<String>,
    /// When the runtime adapter received the event.
    pub received_at: Instant,
}

/// A runtime event decoded into its common parts, before route matching.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// Runtime the call arrived from.
    pub runtime: RuntimeKind,
    /// Method of the call.
    pub method: RouteMethod,
    /// Request path, without query string.
    pub path: String,
    /// Query parameters.
    pub query: IndexMap<String, String>,
    /// Headers.
    pub headers: HeaderMap,
    /// Decoded body.
    pub body: Value,
    /// The original event.
    pub raw: RawEvent,
    /// Request id.
    pub id: RequestId,
    /// Receive time.
    pub received_at: Instant,
}

impl Inbound {
    /// Creates an inbound call with empty query, headers and body.
    pub fn new(runtime: RuntimeKind, method: RouteMethod, path: impl Into<String>) -> Self {
        Self {
            runtime,
            method,
            path: path.into(),
            query: IndexMap::new(),
            headers: HeaderMap::new(),
            body: Value::Null,
            raw: RawEvent::none(),
            id: RequestId::new(),
            received_at: Instant::now(),
        }
    }

    /// Summary of the call before any route has matched.
    #[must_use]
    pub fn info(&self) -> RequestInfo {
        RequestInfo {
            id: self.id,
            runtime: self.runtime,
            method: self.method.clone(),
            path: self.path.clone(),
            route: None,
            received_at: self.received_at,
        }
    }

    /// Binds the call to its matched route.
    #[must_use]
    pub fn into_request(self, route: Arc<Route>, params: Params, globals: Arc<Globals>) -> Request {
        let info = RequestInfo {
            route: Some(route.name.clone()),
            ..self.info()
        };
        Request {
            info,
            route,
            params,
            query: self.query,
            headers: self.headers,
            body: self.body,
            raw: self.raw,
            globals,
            extensions: Extensions::new(),
        }
    }
}

/// A normalized request.
///
/// The runtime, path, route, parameters and query are fixed when the request
/// is built. Stage handlers may rewrite headers and body and attach typed
/// extensions for later handlers and the controller.
#[derive(Debug, Clone)]
pub struct Request {
    info: RequestInfo,
    route: Arc<Route>,
    params: Params,
    query: IndexMap<String, String>,
    headers: HeaderMap,
    body: Value,
    raw: RawEvent,
    globals: Arc<Globals>,
    extensions: Extensions,
}

impl Request {
    /// Starts building a request for `route`, mainly for exercising handlers
    /// without a runtime.
    #[must_use]
    pub fn builder(route: Route) -> RequestBuilder {
        RequestBuilder::new(route)
    }

    /// Request id.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.info.id
    }

    /// Replaces the request id, e.g. with one propagated by the caller.
    pub fn set_id(&mut self, id: RequestId) {
        self.info.id = id;
    }

    /// Runtime the call arrived from.
    #[must_use]
    pub const fn runtime(&self) -> RuntimeKind {
        self.info.runtime
    }

    /// Method of the call.
    #[must_use]
    pub const fn method(&self) -> &RouteMethod {
        &self.info.method
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.info.path
    }

    /// The matched route.
    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Shared handle to the matched route.
    #[must_use]
    pub fn route_arc(&self) -> Arc<Route> {
        Arc::clone(&self.route)
    }

    /// Path parameters bound by the route pattern.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// One path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Query parameters.
    #[must_use]
    pub const fn query(&self) -> &IndexMap<String, String> {
        &self.query
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

    /// One header value, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decoded body.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }

    /// Deserializes the body. A mismatch is a 400 client fault.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, crate::Fault> {
        T::deserialize(&self.body)
            .map_err(|e| crate::Fault::bad_request(format!("invalid request body: {e}")))
    }

    /// The host event as received.
    #[must_use]
    pub const fn raw(&self) -> &RawEvent {
        &self.raw
    }

    /// Shared globals.
    #[must_use]
    pub fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    /// Typed extensions.
    #[must_use]
    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable typed extensions.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Summary used to label the response.
    #[must_use]
    pub const fn info(&self) -> &RequestInfo {
        &self.info
    }
}

/// Builder for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
    inbound: Inbound,
    route: Route,
    params: Params,
    globals: Arc<Globals>,
}

impl RequestBuilder {
    fn new(route: Route) -> Self {
        let method = route
            .methods
            .iter()
            .next()
            .cloned()
            .unwrap_or(RouteMethod::Http(http::Method::GET));
        let runtime = if method.is_socket() {
            RuntimeKind::Socket
        } else {
            RuntimeKind::HttpFramework
        };
        Self {
            inbound: Inbound::new(runtime, method, route.path.clone()),
            route,
            params: Params::new(),
            globals: Arc::new(Globals::new()),
        }
    }

    /// Sets the runtime.
    #[must_use]
    pub fn runtime(mut self, runtime: RuntimeKind) -> Self {
        self.inbound.runtime = runtime;
        self
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: impl Into<RouteMethod>) -> Self {
        self.inbound.method = method.into();
        self
    }

    /// Sets the path. Parameters are bound from the route pattern if it
    /// matches.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inbound.path = path.into();
        self
    }

    /// Adds a path parameter explicitly.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(name, value);
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inbound.query.insert(name.into(), value.into());
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            self.inbound.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.inbound.body = body;
        self
    }

    /// Sets the globals.
    #[must_use]
    pub fn globals(mut self, globals: Arc<Globals>) -> Self {
        self.globals = globals;
        self
    }

    /// Builds the request.
    #[must_use]
    pub fn build(self) -> Request {
        let mut params = switchyard_router::PathPattern::parse(&self.route.path)
            .ok()
            .and_then(|p| p.matches(&self.inbound.path))
            .unwrap_or_default();
        for (name, value) in &self.params {
            params.push(name, value);
        }
        self.inbound
            .into_request(Arc::new(self.route), params, self.globals)
    }
}
