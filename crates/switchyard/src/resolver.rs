//! Controller resolution.
//!
//! After the last `in` handler the application asks its resolver for the
//! action serving the matched route and the request method. Resolution
//! failures are configuration problems, so they surface as system faults and
//! never as client faults.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::json;
use switchyard_core::{Action, Controller, Fault, Route, RouteMethod};

/// Locates the action serving a route and method.
pub trait ControllerResolver: Send + Sync + 'static {
    /// Returns the action for `method` on `route`.
    fn resolve(&self, route: &Route, method: &RouteMethod) -> Result<Action, Fault>;
}

impl<R: ControllerResolver + ?Sized> ControllerResolver for Arc<R> {
    fn resolve(&self, route: &Route, method: &RouteMethod) -> Result<Action, Fault> {
        (**self).resolve(route, method)
    }
}

/// Controllers registered at startup, keyed by route name.
///
/// # Example
///
/// ```rust
/// use switchyard::resolver::{ControllerResolver, StaticResolver};
/// use switchyard::core::{Controller, Fault, Route};
/// use http::Method;
///
/// let mut resolver = StaticResolver::new();
/// resolver.insert("item", Controller::new().get(|_req, _g| async { Ok::<_, Fault>(()) }));
///
/// let route = Route::new("item", Method::GET, "/test/{id}");
/// assert!(resolver.resolve(&route, &Method::GET.into()).is_ok());
/// assert!(resolver.resolve(&route, &Method::POST.into()).is_err());
/// ```
#[derive(Clone, Default)]
pub struct StaticResolver {
    controllers: HashMap<String, Controller>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the controller for `route`, replacing any previous one.
    pub fn insert(&mut self, route: impl Into<String>, controller: Controller) {
        let route = route.into();
        if self.controllers.insert(route.clone(), controller).is_some() {
            tracing::warn!(route = %route, "controller replaced");
        }
    }

    /// Returns true if a controller is registered for `route`.
    #[must_use]
    pub fn contains(&self, route: &str) -> bool {
        self.controllers.contains_key(route)
    }

    /// Number of registered controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Returns true if no controller is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl ControllerResolver for StaticResolver {
    fn resolve(&self, route: &Route, method: &RouteMethod) -> Result<Action, Fault> {
        let controller = self.controllers.get(&route.name).ok_or_else(|| {
            Fault::system(format!("no controller registered for route '{}'", route.name))
                .with_details(json!({ "route": route.name, "path": route.path }))
        })?;

        controller.action(method).cloned().ok_or_else(|| {
            Fault::system(format!(
                "controller for route '{}' has no '{}' action",
                route.name, method
            ))
            .with_details(json!({ "route": route.name, "method": method.name() }))
        })
    }
}

impl fmt::Debug for StaticResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<&str> = self.controllers.keys().map(String::as_str).collect();
        routes.sort_unstable();
        f.debug_struct("StaticResolver").field("routes", &routes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use switchyard_core::FaultKind;

    fn resolver() -> StaticResolver {
        let mut resolver = StaticResolver::new();
        resolver.insert(
            "item",
            Controller::new().get(|_req, _globals| async { Ok::<_, Fault>("item") }),
        );
        resolver
    }

    #[test]
    fn test_resolves_registered_action() {
        let route = Route::new("item", Method::GET, "/test/{id}");
        assert!(resolver().resolve(&route, &Method::GET.into()).is_ok());
    }

    #[test]
    fn test_missing_controller_is_system_fault() {
        let route = Route::new("orders", Method::GET, "/orders");
        let err = resolver().resolve(&route, &Method::GET.into()).err().unwrap();
        assert_eq!(err.kind(), FaultKind::System);
        assert_eq!(err.details().unwrap()["route"], "orders");
    }

    #[test]
    fn test_missing_method_is_system_fault() {
        let route = Route::new("item", Method::GET, "/test/{id}");
        let err = resolver().resolve(&route, &RouteMethod::Socket).err().unwrap();
        assert_eq!(err.kind(), FaultKind::System);
        assert!(err.message().contains("socket"));
    }

    #[test]
    fn test_shared_resolver() {
        let shared: Arc<StaticResolver> = Arc::new(resolver());
        let route = Route::new("item", Method::GET, "/test/{id}");
        assert!(shared.resolve(&route, &Method::GET.into()).is_ok());
        assert_eq!(format!("{:?}", resolver()), "StaticResolver { routes: [\"item\"] }");
    }
}
