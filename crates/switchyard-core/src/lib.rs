//! # Switchyard Core
//!
//! Core types shared by every Switchyard crate:
//!
//! - [`Request`] / [`Response`] - the normalized request and response
//! - [`Fault`] - the three-kind fault taxonomy and its exposure rules
//! - [`Globals`] - the read-only context shared by stages and controllers
//! - [`Service`] - the contract for registered collaborators
//! - [`Controller`] - per-method actions for one route
//! - [`SocketHandle`] - the write side of a socket connection

#![doc(html_root_url = "https://docs.rs/switchyard-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::future::Future;
use std::pin::Pin;

mod controller;
mod error;
mod globals;
mod request;
mod response;
mod service;
mod socket;

pub use controller::{action, Action, Controller};
pub use error::{Fault, FaultKind, FaultResult, LogLevel, INTERNAL_ERROR_MESSAGE};
pub use globals::Globals;
pub use request::{Inbound, RawEvent, Request, RequestBuilder, RequestId, RequestInfo, RuntimeKind};
pub use response::{ErrorMarker, IntoResponse, Response};
pub use service::{Service, ServiceEntry, ServiceRegistry};
pub use socket::{ConnectionId, SocketEmission, SocketHandle};

/// Re-exported route types used in requests.
pub use switchyard_router::{MethodSet, Params, Route, RouteMethod};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
