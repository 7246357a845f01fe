//! Controllers and their actions.
//!
//! A controller serves one route and provides one action per method it
//! supports. Actions receive the request (after every `in` handler ran) and
//! the shared globals, and return anything convertible into a [`Response`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use switchyard_router::RouteMethod;

use crate::error::Fault;
use crate::globals::Globals;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::BoxFuture;

/// A type-erased controller action.
pub type Action =
    Arc<dyn Fn(Request, Arc<Globals>) -> BoxFuture<'static, Result<Response, Fault>> + Send + Sync>;

/// Erases an async function into an [`Action`].
pub fn action<F, Fut, R>(f: F) -> Action
where
    F: Fn(Request, Arc<Globals>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Fault>> + Send + 'static,
    R: IntoResponse + 'static,
{
    Arc::new(move |request, globals| {
        let fut = f(request, globals);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    })
}

/// Actions of one controller, keyed by method.
///
/// # Example
///
/// ```rust
/// use switchyard_core::{Controller, Fault};
/// use serde_json::json;
///
/// let controller = Controller::new()
///     .get(|req, _globals| async move {
///         Ok::<_, Fault>(json!({ "id": req.param("id") }))
///     })
///     .delete(|_req, _globals| async move { Ok::<_, Fault>(()) });
///
/// assert_eq!(controller.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Controller {
    actions: HashMap<RouteMethod, Action>,
}

impl Controller {
    /// Creates a controller with no actions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action for `method`, replacing any previous one.
    #[must_use]
    pub fn on<F, Fut, R>(mut self, method: impl Into<RouteMethod>, f: F) -> Self
    where
        F: Fn(Request, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Fault>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.actions.insert(method.into(), action(f));
        self
    }

    /// Registers an already-erased action.
    #[must_use]
    pub fn on_action(mut self, method: impl Into<RouteMethod>, action: Action) -> Self {
        self.actions.insert(method.into(), action);
        self
    }

    /// Registers a GET action.
    #[must_use]
    pub fn get<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Fault>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(http::Method::GET, f)
    }

    /// Registers a POST action.
    #[must_use]
    pub fn post<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Fault>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(http::Method::POST, f)
    }

    /// Registers a PUT action.
    #[must_use]
    pub fn put<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Fault>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(http::Method::PUT, f)
    }

    /// Registers a PATCH action.
    #[must_use]
    pub fn patch<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Fault>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(http::Method::PATCH, f)
    }

    /// Registers a DELETE action.
    #[must_use]
    pub fn delete<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Fault>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(http::Method::DELETE, f)
    }

    /// Registers the action for socket messages.
    #[must_use]
    pub fn socket<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Fault>> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.on(RouteMethod::Socket, f)
    }

    /// The action for `method`.
    #[must_use]
    pub fn action(&self, method: &RouteMethod) -> Option<&Action> {
        self.actions.get(method)
    }

    /// Methods with an action.
    pub fn methods(&self) -> impl Iterator<Item = &RouteMethod> {
        self.actions.keys()
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if no action is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<String> = self.actions.keys().map(RouteMethod::name).collect();
        methods.sort();
        f.debug_struct("Controller").field("methods", &methods).finish()
    }
}
