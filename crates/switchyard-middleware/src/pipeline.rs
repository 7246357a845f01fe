//! The staged pipeline driver.
//!
//! ## Execution
//!
//! ```text
//! start* → mount* → in* → controller → out* → end*
//!    └──────── any failure ──────────────┘      ↑
//!              map fault → response ────────────┘
//! ```
//!
//! Handlers of a stage run in registration order, each receiving the
//! previous handler's output. The first failure (or panic) in `start`,
//! `mount`, `in`, the controller or `out` skips everything up to `end`. The
//! fault is then logged according to its log level and mapped into a
//! response. Every `end` handler runs exactly once; a failing `end` handler
//! is logged and the response it received is kept.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use switchyard_core::{
    Fault, Globals, Request, RequestInfo, Response, INTERNAL_ERROR_MESSAGE,
};
use switchyard_telemetry::metrics::record_fault;

use crate::middleware::{
    request_handler, response_handler, Middleware, RequestHandler, ResponseHandler, StageHandler,
};
use crate::stage::Stage;

/// Name used for handlers registered without a descriptor.
const ANONYMOUS: &str = "anonymous";

#[derive(Clone)]
struct Registered<H> {
    name: Arc<str>,
    handler: H,
}

/// Per-stage ordered handler lists.
///
/// # Example
///
/// ```rust
/// use switchyard_middleware::{Middleware, Pipeline, Stage};
///
/// let mut pipeline = Pipeline::new();
/// pipeline.register(vec![
///     Middleware::new("a").on_start(|r| async move { Ok(r) }),
///     Middleware::new("b")
///         .on_start(|r| async move { Ok(r) })
///         .on_end(|r, _| async move { Ok(r) }),
/// ]);
///
/// assert_eq!(pipeline.handler_names(Stage::Start), vec!["a", "b"]);
/// assert_eq!(pipeline.handler_names(Stage::End), vec!["b"]);
/// ```
#[derive(Clone)]
pub struct Pipeline {
    request_stages: [Vec<Registered<RequestHandler>>; 3],
    out: Vec<Registered<ResponseHandler>>,
    end: Vec<Registered<ResponseHandler>>,
    internal_message: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            request_stages: [Vec::new(), Vec::new(), Vec::new()],
            out: Vec::new(),
            end: Vec::new(),
            internal_message: INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the message returned for data and system faults.
    #[must_use]
    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = message.into();
        self
    }

    /// Message returned for data and system faults.
    #[must_use]
    pub fn internal_message(&self) -> &str {
        &self.internal_message
    }

    /// Appends every handler each descriptor defines to its stage.
    ///
    /// Accepts one [`Middleware`] or any iterator of them. Registering the
    /// same descriptor twice runs its handlers twice.
    pub fn register<I>(&mut self, middleware: I)
    where
        I: IntoIterator<Item = Middleware>,
    {
        for mw in middleware {
            let name: Arc<str> = Arc::from(mw.name());
            for stage in Stage::all() {
                if let Some(handler) = mw.handler(stage) {
                    self.push_named(stage, Arc::clone(&name), handler.clone());
                }
            }
        }
    }

    /// Appends one handler to `stage`.
    ///
    /// # Errors
    ///
    /// Returns a system fault if the handler kind does not fit the stage.
    pub fn push(
        &mut self,
        stage: Stage,
        name: &str,
        handler: StageHandler,
    ) -> Result<(), Fault> {
        if !handler.fits(stage) {
            return Err(Fault::system(format!(
                "handler '{name}' does not fit the {stage} stage"
            )));
        }
        self.push_named(stage, Arc::from(name), handler);
        Ok(())
    }

    fn push_named(&mut self, stage: Stage, name: Arc<str>, handler: StageHandler) {
        match (stage, handler) {
            (Stage::Out, StageHandler::Response(handler)) => {
                self.out.push(Registered { name, handler });
            }
            (Stage::End, StageHandler::Response(handler)) => {
                self.end.push(Registered { name, handler });
            }
            (stage, StageHandler::Request(handler)) if stage.is_request_stage() => {
                self.request_stages[stage.index()].push(Registered { name, handler });
            }
            (stage, _) => {
                tracing::warn!(stage = %stage, handler = %name, "handler does not fit stage, skipped");
            }
        }
    }

    /// Appends a `start` handler.
    pub fn on_start<F, Fut>(&mut self, f: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
    {
        self.push_named(Stage::Start, Arc::from(ANONYMOUS), StageHandler::Request(request_handler(f)));
    }

    /// Appends a `mount` handler.
    pub fn on_mount<F, Fut>(&mut self, f: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
    {
        self.push_named(Stage::Mount, Arc::from(ANONYMOUS), StageHandler::Request(request_handler(f)));
    }

    /// Appends an `in` handler.
    pub fn on_in<F, Fut>(&mut self, f: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, Fault>> + Send + 'static,
    {
        self.push_named(Stage::In, Arc::from(ANONYMOUS), StageHandler::Request(request_handler(f)));
    }

    /// Appends an `out` handler.
    pub fn on_out<F, Fut>(&mut self, f: F)
    where
        F: Fn(Response, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Fault>> + Send + 'static,
    {
        self.push_named(Stage::Out, Arc::from(ANONYMOUS), StageHandler::Response(response_handler(f)));
    }

    /// Appends an `end` handler.
    pub fn on_end<F, Fut>(&mut self, f: F)
    where
        F: Fn(Response, Arc<Globals>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Fault>> + Send + 'static,
    {
        self.push_named(Stage::End, Arc::from(ANONYMOUS), StageHandler::Response(response_handler(f)));
    }

    /// Names of the handlers registered for `stage`, in order.
    #[must_use]
    pub fn handler_names(&self, stage: Stage) -> Vec<&str> {
        match stage {
            Stage::Out => self.out.iter().map(|r| &*r.name).collect(),
            Stage::End => self.end.iter().map(|r| &*r.name).collect(),
            stage => self.request_stages[stage.index()]
                .iter()
                .map(|r| &*r.name)
                .collect(),
        }
    }

    /// Total number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.request_stages.iter().map(Vec::len).sum::<usize>() + self.out.len() + self.end.len()
    }

    /// Returns true if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs one invocation through every stage.
    ///
    /// `dispatch` resolves and invokes the controller action. It is called
    /// once, after the last `in` handler, and only if no earlier handler
    /// failed. Never fails: every fault becomes the returned response.
    pub async fn run<D, Fut>(&self, request: Request, dispatch: D) -> Response
    where
        D: FnOnce(Request) -> Fut + Send,
        Fut: Future<Output = Result<Response, Fault>> + Send,
    {
        let globals = Arc::clone(request.globals());
        let mut info = request.info().clone();

        let mut response = match self.run_main(request, dispatch, &globals, &mut info).await {
            Ok(response) => response,
            Err(fault) => self.map_fault(&fault, &info),
        };
        // An `out` handler may have returned a fresh response.
        if response.info().is_none() {
            response.set_info(info.clone());
        }

        self.run_end(response, &info, &globals).await
    }

    /// Maps a fault raised before a request could be built and runs only
    /// the `end` stage on it.
    ///
    /// Used for unmatched routes and malformed events: `start`, `mount`,
    /// `in` and `out` never see such calls.
    pub async fn reject(&self, fault: &Fault, info: RequestInfo, globals: &Arc<Globals>) -> Response {
        let response = self.map_fault(fault, &info);
        self.run_end(response, &info, globals).await
    }

    async fn run_main<D, Fut>(
        &self,
        mut request: Request,
        dispatch: D,
        globals: &Arc<Globals>,
        info: &mut RequestInfo,
    ) -> Result<Response, Fault>
    where
        D: FnOnce(Request) -> Fut + Send,
        Fut: Future<Output = Result<Response, Fault>> + Send,
    {
        for stage in &self.request_stages {
            for entry in stage {
                request = guarded(|| (entry.handler)(request)).await?;
                // Handlers may replace the request id.
                info.clone_from(request.info());
            }
        }

        let mut response = guarded(|| dispatch(request)).await?;
        response.set_info(info.clone());

        for entry in &self.out {
            response = guarded(|| (entry.handler)(response, Arc::clone(globals))).await?;
        }
        Ok(response)
    }

    fn map_fault(&self, fault: &Fault, info: &RequestInfo) -> Response {
        fault.report();
        record_fault(fault.kind().name());
        tracing::debug!(request_id = %info.id, route = info.route.as_deref(), "fault mapped into response");

        let mut response = Response::from_fault_with_message(fault, &self.internal_message);
        response.set_info(info.clone());
        response
    }

    async fn run_end(&self, mut response: Response, info: &RequestInfo, globals: &Arc<Globals>) -> Response {
        for entry in &self.end {
            let input = response.clone();
            match guarded(|| (entry.handler)(input, Arc::clone(globals))).await {
                Ok(mut next) => {
                    if next.info().is_none() {
                        next.set_info(info.clone());
                    }
                    response = next;
                }
                Err(fault) => {
                    // The fault's own verbosity applies; `none` stays silent.
                    tracing::info_span!("end_handler", request_id = %info.id, stage = %Stage::End, handler = %entry.name)
                        .in_scope(|| fault.report());
                    tracing::debug!(handler = %entry.name, fault_kind = fault.kind().name(), "end handler failed; response kept");
                }
            }
        }
        response
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for stage in Stage::all() {
            map.entry(&stage.name(), &self.handler_names(stage));
        }
        map.finish()
    }
}

/// Runs a handler, converting a panic (while building or polling its
/// future) into a system fault.
async fn guarded<T, F, Fut>(make: F) -> Result<T, Fault>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Fault>>,
{
    let future = std::panic::catch_unwind(AssertUnwindSafe(make))
        .map_err(|payload| Fault::from_panic(&*payload))?;
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(Fault::from_panic(&*payload)))
}
