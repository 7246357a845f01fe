//! Ordered route table.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::RouteError;
use crate::method::RouteMethod;
use crate::params::Params;
use crate::pattern::PathPattern;
use crate::route::Route;
use crate::RouteMatch;

#[derive(Debug, Clone)]
struct Entry {
    route: Arc<Route>,
    pattern: PathPattern,
}

/// Routes in declaration order.
///
/// Matching walks the table front to back and returns the first route whose
/// method set contains the request method and whose pattern matches the path.
/// A more specific route declared after a general one is never reached.
///
/// # Example
///
/// ```rust
/// use switchyard_router::{Route, RouteMethod, RouteTable};
/// use http::Method;
///
/// let table = RouteTable::from_routes([
///     Route::new("item", Method::GET, "/test/{id}"),
/// ])
/// .unwrap();
///
/// let found = table.match_route(&RouteMethod::Http(Method::GET), "/test/42").unwrap();
/// assert_eq!(found.route.name, "item");
/// assert_eq!(found.params.get("id"), Some("42"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<Entry>,
    names: HashSet<String>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from routes in declaration order.
    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Result<Self, RouteError> {
        let mut table = Self::new();
        for route in routes {
            table.push(route)?;
        }
        Ok(table)
    }

    /// Appends a route after every route already declared.
    pub fn push(&mut self, route: Route) -> Result<(), RouteError> {
        if route.name.trim().is_empty() {
            return Err(RouteError::EmptyName(route.path));
        }
        if route.methods.is_empty() {
            return Err(RouteError::NoMethods(route.name));
        }
        if self.names.contains(&route.name) {
            return Err(RouteError::DuplicateName(route.name));
        }
        let pattern = PathPattern::parse(&route.path)?;
        self.names.insert(route.name.clone());
        self.entries.push(Entry {
            route: Arc::new(route),
            pattern,
        });
        Ok(())
    }

    /// Finds the first route accepting `method` whose pattern matches `path`.
    #[must_use]
    pub fn match_route(&self, method: &RouteMethod, path: &str) -> Option<RouteMatch<'_>> {
        self.entries.iter().find_map(|entry| {
            if !entry.route.accepts(method) {
                return None;
            }
            entry
                .pattern
                .matches(path)
                .map(|params: Params| RouteMatch::new(&entry.route, params))
        })
    }

    /// Looks a route up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
        self.entries
            .iter()
            .map(|e| &e.route)
            .find(|r| r.name == name)
    }

    /// Iterates routes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.entries.iter().map(|e| &e.route)
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no routes are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
