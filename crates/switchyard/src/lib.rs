//! # Switchyard
//!
//! **One middleware pipeline behind every runtime.**
//!
//! Switchyard normalizes events from four hosting environments into one
//! request, runs it through a staged middleware pipeline, dispatches it to a
//! controller action and serializes the result back into the shape the host
//! expects:
//!
//! - `http-framework` - `http::Request<Bytes>` in, `http::Response` out
//! - `cloud-function-a` - gateway-proxy JSON event, `{ statusCode, body: "<json>" }` out
//! - `cloud-function-b` - direct-invocation JSON event, `{ status, body }` out
//! - `socket` - one JSON message in, one emission on the same connection out
//!
//! Pipeline semantics are identical across runtimes: ordering,
//! short-circuiting and what a caller gets to see of a failure do not depend
//! on where the event came from.
//!
//! ## Quick Start
//!
//! ```rust
//! use switchyard::prelude::*;
//! use http::Method;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let routes = RouteTable::from_routes([
//!     Route::new("item", Method::GET, "/test/{id}"),
//! ])
//! .unwrap();
//!
//! let mut app = Application::new(routes);
//! app.register_builtin_middleware();
//! app.controller(
//!     "item",
//!     Controller::new().get(|req, _globals| async move {
//!         match req.param("id") {
//!             Some("0") => Err(Fault::not_found()),
//!             id => Ok(json!({ "id": id })),
//!         }
//!     }),
//! );
//!
//! let request = http::Request::get("/test/42").body(bytes::Bytes::new()).unwrap();
//! let reply = app.run(Event::Http(request)).await.into_http().unwrap();
//! assert_eq!(reply.status(), http::StatusCode::OK);
//! assert!(reply.headers().contains_key("x-request-id"));
//! # });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Event → decode → match route → start → mount → in → controller → out → end → Reply
//!            │           │           └─────── any failure ─────────────┘     ↑
//!            └───────────┴──── malformed / unmatched ────────────────────────┘
//! ```
//!
//! Client faults reach the caller with their status and message. Data and
//! system faults (including panics) are answered with a generic 500; their
//! message, details and source are only logged.

#![doc(html_root_url = "https://docs.rs/switchyard/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod resolver;
pub mod runtime;

pub use app::Application;
pub use resolver::{ControllerResolver, StaticResolver};
pub use runtime::{Event, Reply, SocketHub};

// Re-export the member crates
pub use switchyard_config as config;
pub use switchyard_core as core;
pub use switchyard_middleware as middleware;
pub use switchyard_router as router;
pub use switchyard_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Application, ControllerResolver, Event, Reply, SocketHub, StaticResolver};

    pub use switchyard_core::{
        action, Controller, Fault, FaultKind, Globals, IntoResponse, LogLevel, Request,
        RequestId, Response, Route, RouteMethod, RuntimeKind, Service, SocketEmission,
        SocketHandle,
    };

    pub use switchyard_middleware::stages::{RequestIdMiddleware, TelemetryMiddleware};
    pub use switchyard_middleware::{Middleware, Stage};

    pub use switchyard_router::RouteTable;

    pub use switchyard_config::{ConfigLoader, SwitchyardConfig};
}
