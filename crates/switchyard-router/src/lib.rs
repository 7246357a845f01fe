//! Route declarations and path matching for Switchyard.
//!
//! Routes are declared as an ordered list of `{ name, method, path }` entries.
//! Inbound calls are matched against that list front to back; the first route
//! that accepts the call's method and whose pattern matches the path wins, and
//! its `{param}` placeholders are bound into [`Params`].
//!
//! # Example
//!
//! ```rust
//! use switchyard_router::{Route, RouteMethod, RouteTable};
//! use http::Method;
//!
//! let table = RouteTable::from_routes([
//!     Route::new("list-files", Method::GET, "/files"),
//!     Route::new("file", Method::GET, "/files/*path"),
//!     Route::new("chat", RouteMethod::Socket, "/chat/{room}"),
//! ])
//! .unwrap();
//!
//! let found = table
//!     .match_route(&RouteMethod::Http(Method::GET), "/files/img/logo.png")
//!     .unwrap();
//! assert_eq!(found.route.name, "file");
//! assert_eq!(found.params.get("path"), Some("img/logo.png"));
//! ```

mod error;
mod method;
mod params;
mod pattern;
mod route;
mod table;

use std::sync::Arc;

pub use error::RouteError;
pub use method::{MethodSet, RouteMethod};
pub use params::Params;
pub use pattern::{PathPattern, Segment};
pub use route::Route;
pub use table::RouteTable;

/// A matched route with the parameters its pattern bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// The matched route.
    pub route: &'a Arc<Route>,
    /// Bound path parameters.
    pub params: Params,
}

impl<'a> RouteMatch<'a> {
    /// Creates a route match.
    #[must_use]
    pub fn new(route: &'a Arc<Route>, params: Params) -> Self {
        Self { route, params }
    }
}
