//! The application orchestrator.
//!
//! An [`Application`] owns the route table, the controllers, the pipeline
//! and the shared globals. It is configured through `&mut self` methods and
//! then shared behind an `Arc`; from that point on it is read-only and can
//! serve any number of invocations in parallel.
//!
//! ## Invocation flow
//!
//! ```text
//! Event ─ decode ─┬─ malformed ──────────────────────────────┐
//!                 └─ match route ─┬─ no match (404) ─────────┤
//!                                 └─ start → mount → in      │
//!                                    → controller → out ─────┴→ end → Reply
//! ```
//!
//! Events that fail to decode and calls that match no route never reach
//! `start`, `mount`, `in` or `out`; only `end` observes their response.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use switchyard_config::{ConfigError, SwitchyardConfig};
use switchyard_core::{
    Action, Controller, Fault, Globals, Inbound, Request, Response, Route, RouteMethod,
    ServiceEntry,
};
use switchyard_middleware::stages::{RequestIdMiddleware, TelemetryMiddleware};
use switchyard_middleware::{Middleware, Pipeline, Stage, StageHandler};
use switchyard_router::RouteTable;
use switchyard_telemetry::metrics::InFlightGuard;
use tracing::Instrument;

use crate::resolver::{ControllerResolver, StaticResolver};
use crate::runtime::{self, Event, Reply};

/// Route label recorded on the invocation span when nothing matched.
const UNMATCHED: &str = "unmatched";

/// Orchestrates invocations from every runtime through one pipeline.
///
/// # Example
///
/// ```rust
/// use switchyard::{Application, Event};
/// use switchyard::core::{Controller, Fault, Route};
/// use switchyard::router::RouteTable;
/// use http::Method;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let routes = RouteTable::from_routes([Route::new("item", Method::GET, "/test/{id}")]).unwrap();
///
/// let mut app = Application::new(routes);
/// app.controller(
///     "item",
///     Controller::new().get(|req, _globals| async move {
///         Ok::<_, Fault>(json!({ "id": req.param("id") }))
///     }),
/// );
///
/// let reply = app
///     .run(Event::FunctionB(json!({ "method": "get", "path": "/test/42" })))
///     .await
///     .into_json()
///     .unwrap();
/// assert_eq!(reply["status"], 200);
/// assert_eq!(reply["body"]["id"], "42");
/// # });
/// ```
pub struct Application {
    routes: RouteTable,
    controllers: StaticResolver,
    resolver: Option<Arc<dyn ControllerResolver>>,
    pipeline: Pipeline,
    globals: Arc<Globals>,
}

impl Application {
    /// Creates an application serving `routes`, with no controllers,
    /// handlers or services yet.
    #[must_use]
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes,
            controllers: StaticResolver::new(),
            resolver: None,
            pipeline: Pipeline::new(),
            globals: Arc::new(Globals::new()),
        }
    }

    /// Creates an application from loaded configuration: its routes, its
    /// `env` section as the globals environment and its generic error
    /// message.
    pub fn from_config(config: &SwitchyardConfig) -> Result<Self, ConfigError> {
        let routes = config.route_table()?;
        Ok(Self::new(routes)
            .with_env(config.env.clone())
            .with_internal_message(config.errors.internal_message.clone()))
    }

    /// Replaces the environment configuration exposed through the globals.
    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        let globals = Arc::make_mut(&mut self.globals);
        *globals = std::mem::take(globals).with_env(env);
        self
    }

    /// Replaces the message data and system faults are answered with.
    #[must_use]
    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.pipeline = std::mem::take(&mut self.pipeline).with_internal_message(message);
        self
    }

    /// Consults `resolver` for routes with no controller registered through
    /// [`controller`](Self::controller).
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl ControllerResolver) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Registers the controller of the route named `route`.
    pub fn controller(&mut self, route: impl Into<String>, controller: Controller) -> &mut Self {
        let route = route.into();
        if self.routes.get(&route).is_none() {
            tracing::warn!(route = %route, "controller registered for an undeclared route");
        }
        self.controllers.insert(route, controller);
        self
    }

    /// Registers a service under its declared identifier.
    ///
    /// Fails with a system fault if the identifier is already taken; the
    /// first registration is kept.
    pub fn register_service(&mut self, service: impl Into<ServiceEntry>) -> Result<&mut Self, Fault> {
        Arc::make_mut(&mut self.globals).register_service(service)?;
        Ok(self)
    }

    /// Registers several services in order, stopping at the first
    /// collision.
    pub fn register_services<I>(&mut self, services: I) -> Result<&mut Self, Fault>
    where
        I: IntoIterator,
        I::Item: Into<ServiceEntry>,
    {
        for service in services {
            self.register_service(service)?;
        }
        Ok(self)
    }

    /// Registers one middleware descriptor or a list of them. Every stage
    /// handler a descriptor defines is appended to its stage.
    pub fn register_middleware<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = Middleware>,
    {
        self.pipeline.register(middleware);
        self
    }

    /// Registers the built-in `request-id` and `telemetry` middleware.
    pub fn register_builtin_middleware(&mut self) -> &mut Self {
        self.register_middleware([
            RequestIdMiddleware::new().into_middleware(),
            TelemetryMiddleware::new().into_middleware(),
        ])
    }

    /// Appends one handler to `stage` under `name`.
    ///
    /// Fails with a system fault if the handler shape does not fit the
    /// stage.
    pub fn on(&mut self, stage: Stage, name: &str, handler: StageHandler) -> Result<&mut Self, Fault> {
        self.pipeline.push(stage, name, handler)?;
        Ok(self)
    }

    /// Appends a `start` handler.
    pub fn on_start<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
    {
        self.pipeline.on_start(f);
        self
    }

    /// Appends a `mount` handler.
    pub fn on_mount<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
    {
        self.pipeline.on_mount(f);
        self
    }

    /// Appends an `in` handler.
    pub fn on_in<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
    {
        self.pipeline.on_in(f);
        self
    }

    /// Appends an `out` handler.
    pub fn on_out<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Response, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Fault>> + Send + 'static,
    {
        self.pipeline.on_out(f);
        self
    }

    /// Appends an `end` handler.
    pub fn on_end<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Response, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Fault>> + Send + 'static,
    {
        self.pipeline.on_end(f);
        self
    }

    /// Declared routes.
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Shared globals.
    #[must_use]
    pub const fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    /// Calls `connect` on every registered service. Returns each failure
    /// with the alias of the service that raised it.
    pub async fn connect_services(&self) -> Vec<(String, Fault)> {
        let failures = self.globals.services().connect_all().await;
        for (alias, fault) in &failures {
            tracing::error!(service = %alias, error = %fault, "service failed to connect");
        }
        failures
    }

    /// Calls `end` on every registered service, last registered first.
    pub async fn end_services(&self) -> Vec<(String, Fault)> {
        let failures = self.globals.services().end_all().await;
        for (alias, fault) in &failures {
            tracing::warn!(service = %alias, error = %fault, "service failed to end");
        }
        failures
    }

    /// Runs one invocation end to end. Never fails: every fault becomes the
    /// reply.
    pub async fn run(&self, event: Event) -> Reply {
        self.run_inner(event, None).await
    }

    /// Like [`run`](Self::run), but answers with a system fault if the
    /// pass through `start`..`out` takes longer than `limit`. The `end`
    /// stage still runs on that answer.
    pub async fn run_with_timeout(&self, event: Event, limit: Duration) -> Reply {
        self.run_inner(event, Some(limit)).await
    }

    async fn run_inner(&self, event: Event, limit: Option<Duration>) -> Reply {
        let _in_flight = InFlightGuard::new();
        let runtime = event.runtime();
        let decoded = runtime::decode(event);
        let span = tracing::info_span!(
            "invocation",
            request_id = %decoded.request_id(),
            runtime = %runtime,
            route = tracing::field::Empty,
        );
        let runtime::Decoded { target, call } = decoded;

        let globals = match target.socket() {
            Some(handle) => Arc::new(self.globals.with_socket(handle.clone())),
            None => Arc::clone(&self.globals),
        };

        let response = async {
            match call {
                Ok(inbound) => self.invoke(inbound, &globals, limit).await,
                Err(malformed) => {
                    tracing::Span::current().record("route", UNMATCHED);
                    self.pipeline
                        .reject(&malformed.fault, malformed.info, &globals)
                        .await
                }
            }
        }
        .instrument(span)
        .await;

        target.encode(response)
    }

    async fn invoke(&self, inbound: Inbound, globals: &Arc<Globals>, limit: Option<Duration>) -> Response {
        let Some(found) = self.routes.match_route(&inbound.method, &inbound.path) else {
            tracing::Span::current().record("route", UNMATCHED);
            tracing::debug!(method = %inbound.method, path = %inbound.path, "no route matched");
            return self
                .pipeline
                .reject(&Fault::not_found(), inbound.info(), globals)
                .await;
        };

        tracing::Span::current().record("route", found.route.name.as_str());
        let request = inbound.into_request(Arc::clone(found.route), found.params, Arc::clone(globals));
        let info = request.info().clone();
        let pass = self.pipeline.run(request, |request| self.dispatch(request));

        let Some(limit) = limit else {
            return pass.await;
        };
        match tokio::time::timeout(limit, pass).await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(request_id = %info.id, timeout_ms = limit.as_millis(), "invocation timed out");
                let fault = Fault::system(format!("invocation exceeded {}ms", limit.as_millis()));
                self.pipeline.reject(&fault, info, globals).await
            }
        }
    }

    /// Resolves and invokes the action for an already-processed request.
    fn dispatch(&self, request: Request) -> impl Future<Output = Result<Response, Fault>> + Send + '_ {
        let action = self.resolve(request.route(), request.method());
        async move {
            let action = action?;
            let globals = Arc::clone(request.globals());
            action(request, globals).await
        }
    }

    fn resolve(&self, route: &Route, method: &RouteMethod) -> Result<Action, Fault> {
        match &self.resolver {
            Some(custom) if !self.controllers.contains(&route.name) => custom.resolve(route, method),
            _ => self.controllers.resolve(route, method),
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<&str> = self.routes.iter().map(|r| r.name.as_str()).collect();
        let services: Vec<&str> = self.globals.services().aliases().collect();
        f.debug_struct("Application")
            .field("routes", &routes)
            .field("controllers", &self.controllers)
            .field("custom_resolver", &self.resolver.is_some())
            .field("pipeline", &self.pipeline)
            .field("services", &services)
            .finish()
    }
}
