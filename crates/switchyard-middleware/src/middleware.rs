//! Stage handlers and the middleware descriptor.
//!
//! A [`Middleware`] is a named bundle of optional handlers, one per
//! [`Stage`]. Request handlers (`start`, `mount`, `in`) take the request and
//! return it, possibly rewritten. Response handlers (`out`, `end`) take the
//! response and the shared globals and return the response.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use switchyard_core::{BoxFuture, Fault, Globals, Request, Response};

use crate::stage::Stage;

/// A type-erased request handler.
pub type RequestHandler =
    Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Request, Fault>> + Send + Sync>;

/// A type-erased response handler.
pub type ResponseHandler = Arc<
    dyn Fn(Response, Arc<Globals>) -> BoxFuture<'static, Result<Response, Fault>> + Send + Sync,
>;

/// Erases an async function into a [`RequestHandler`].
pub fn request_handler<F, Fut>(f: F) -> RequestHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// Erases an async function into a [`ResponseHandler`].
pub fn response_handler<F, Fut>(f: F) -> ResponseHandler
where
    F: Fn(Response, Arc<Globals>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Fault>> + Send + 'static,
{
    Arc::new(move |response, globals| Box::pin(f(response, globals)))
}

/// A handler for one stage.
#[derive(Clone)]
pub enum StageHandler {
    /// Handler for `start`, `mount` or `in`.
    Request(RequestHandler),
    /// Handler for `out` or `end`.
    Response(ResponseHandler),
}

impl StageHandler {
    /// Returns true if the handler fits `stage`.
    #[must_use]
    pub const fn fits(&self, stage: Stage) -> bool {
        matches!(self, Self::Request(_)) == stage.is_request_stage()
    }
}

impl fmt::Debug for StageHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(_) => f.write_str("StageHandler::Request"),
            Self::Response(_) => f.write_str("StageHandler::Response"),
        }
    }
}

/// A named set of optional stage handlers.
///
/// # Example
///
/// ```rust
/// use switchyard_middleware::{Middleware, Stage};
///
/// let audit = Middleware::new("audit")
///     .on_in(|request| async move { Ok(request) })
///     .on_end(|response, _globals| async move { Ok(response) });
///
/// assert!(audit.handler(Stage::In).is_some());
/// assert!(audit.handler(Stage::Start).is_none());
/// assert_eq!(audit.stages(), vec![Stage::In, Stage::End]);
/// ```
#[derive(Clone)]
pub struct Middleware {
    name: String,
    handlers: [Option<StageHandler>; 5],
}

impl Middleware {
    /// Creates a descriptor with no handlers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: [None, None, None, None, None],
        }
    }

    /// The descriptor name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the `start` handler.
    #[must_use]
    pub fn on_start<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
    {
        self.with_request(Stage::Start, request_handler(f))
    }

    /// Sets the `mount` handler.
    #[must_use]
    pub fn on_mount<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
    {
        self.with_request(Stage::Mount, request_handler(f))
    }

    /// Sets the `in` handler.
    #[must_use]
    pub fn on_in<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
    {
        self.with_request(Stage::In, request_handler(f))
    }

    /// Sets the `out` handler.
    #[must_use]
    pub fn on_out<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Response, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Fault>> + Send + 'static,
    {
        self.with_response(Stage::Out, response_handler(f))
    }

    /// Sets the `end` handler.
    #[must_use]
    pub fn on_end<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Response, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Fault>> + Send + 'static,
    {
        self.with_response(Stage::End, response_handler(f))
    }

    /// Sets an erased request handler. Ignored unless `stage` is a request
    /// stage.
    #[must_use]
    pub fn with_request(mut self, stage: Stage, handler: RequestHandler) -> Self {
        if stage.is_request_stage() {
            self.handlers[stage.index()] = Some(StageHandler::Request(handler));
        }
        self
    }

    /// Sets an erased response handler. Ignored unless `stage` is `Out` or
    /// `End`.
    #[must_use]
    pub fn with_response(mut self, stage: Stage, handler: ResponseHandler) -> Self {
        if !stage.is_request_stage() {
            self.handlers[stage.index()] = Some(StageHandler::Response(handler));
        }
        self
    }

    /// The handler for `stage`, if defined.
    #[must_use]
    pub fn handler(&self, stage: Stage) -> Option<&StageHandler> {
        self.handlers[stage.index()].as_ref()
    }

    /// Stages this descriptor defines a handler for, in order.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        Stage::all()
            .into_iter()
            .filter(|stage| self.handler(*stage).is_some())
            .collect()
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("stages", &self.stages())
            .finish()
    }
}

/// A single descriptor registers like a list of one.
impl IntoIterator for Middleware {
    type Item = Self;
    type IntoIter = std::iter::Once<Self>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_kind_must_fit_stage() {
        let handler = request_handler(|request| async move { Ok(request) });
        let mw = Middleware::new("misplaced").with_request(Stage::Out, handler.clone());
        assert!(mw.stages().is_empty());

        let mw = mw.with_request(Stage::Mount, handler);
        assert_eq!(mw.stages(), vec![Stage::Mount]);
        assert!(mw.handler(Stage::Mount).unwrap().fits(Stage::Mount));
        assert!(!mw.handler(Stage::Mount).unwrap().fits(Stage::End));
    }

    #[test]
    fn test_single_descriptor_iterates_once() {
        let mw = Middleware::new("one").on_out(|response, _| async move { Ok(response) });
        let all: Vec<_> = mw.into_iter().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name(), "one");
    }

    #[test]
    fn test_debug_lists_stages() {
        let mw = Middleware::new("audit")
            .on_start(|request| async move { Ok(request) })
            .on_end(|response, _| async move { Ok(response) });
        assert_eq!(
            format!("{mw:?}"),
            "Middleware { name: \"audit\", stages: [Start, End] }"
        );
    }
}
