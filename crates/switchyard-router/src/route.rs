//! Route declarations.

use serde::{Deserialize, Serialize};

use crate::method::{MethodSet, RouteMethod};

/// A named route: which methods and which path pattern reach it.
///
/// Declared in configuration as
///
/// ```toml
/// [[routes]]
/// name = "item"
/// method = "get"
/// path = "/test/{id}"
/// ```
///
/// where `method` may also be a list such as `["get", "post"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    /// Route name, also the key used to resolve its controller.
    pub name: String,
    /// Accepted methods.
    #[serde(rename = "method")]
    pub methods: MethodSet,
    /// Path pattern with `{param}` placeholders.
    pub path: String,
}

impl Route {
    /// Creates a route.
    pub fn new(
        name: impl Into<String>,
        methods: impl Into<MethodSet>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            methods: methods.into(),
            path: path.into(),
        }
    }

    /// Returns true if the route accepts `method`.
    #[must_use]
    pub fn accepts(&self, method: &RouteMethod) -> bool {
        self.methods.contains(method)
    }

    /// Returns true if the route is only reachable from socket connections.
    #[must_use]
    pub fn is_socket_only(&self) -> bool {
        !self.methods.is_empty() && self.methods.iter().all(RouteMethod::is_socket)
    }
}
