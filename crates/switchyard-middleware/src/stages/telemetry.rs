//! Invocation logs and metrics.
//!
//! `start` logs the invocation at debug level. `end` logs completion and
//! records `switchyard_invocations_total` and
//! `switchyard_invocation_duration_seconds`, measured from the moment the
//! runtime adapter received the event. Because `end` always runs, failed
//! and unmatched invocations are counted too; the latter under the route
//! label `unmatched`.

use std::time::Duration;

use switchyard_telemetry::metrics::record_invocation;

use crate::middleware::Middleware;

/// Route label used when no route matched.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Emits completion logs and invocation metrics.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryMiddleware {
    record_metrics: bool,
}

impl Default for TelemetryMiddleware {
    fn default() -> Self {
        Self {
            record_metrics: true,
        }
    }
}

impl TelemetryMiddleware {
    /// Logs and records metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs only.
    #[must_use]
    pub const fn logs_only() -> Self {
        Self {
            record_metrics: false,
        }
    }

    /// Builds the descriptor.
    #[must_use]
    pub fn into_middleware(self) -> Middleware {
        Middleware::new("telemetry")
            .on_start(|request| async move {
                switchyard_telemetry::log_invocation_start!(
                    request.id(),
                    request.runtime(),
                    request.method(),
                    request.path()
                );
                Ok(request)
            })
            .on_end(move |response, _globals| async move {
                if let Some(info) = response.info() {
                    let elapsed = info.received_at.elapsed();
                    let status = response.status().as_u16();
                    switchyard_telemetry::log_invocation_complete!(
                        info.id,
                        status,
                        duration_millis(elapsed)
                    );
                    if self.record_metrics {
                        record_invocation(
                            info.runtime.name(),
                            info.route.as_deref().unwrap_or(UNMATCHED_ROUTE),
                            status,
                            elapsed,
                        );
                    }
                }
                Ok(response)
            })
    }
}

impl From<TelemetryMiddleware> for Middleware {
    fn from(mw: TelemetryMiddleware) -> Self {
        mw.into_middleware()
    }
}

fn duration_millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pipeline, Stage};
    use http::{Method, StatusCode};
    use switchyard_core::{Fault, Request, Response, Route};

    #[test]
    fn test_descriptor_stages() {
        let mw = TelemetryMiddleware::new().into_middleware();
        assert_eq!(mw.name(), "telemetry");
        assert_eq!(mw.stages(), vec![Stage::Start, Stage::End]);
    }

    #[test]
    fn test_duration_millis() {
        assert!((duration_millis(Duration::from_micros(1500)) - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_response_passes_through() {
        let mut pipeline = Pipeline::new();
        pipeline.register(TelemetryMiddleware::logs_only().into_middleware());

        let request = Request::builder(Route::new("item", Method::GET, "/items/{id}"))
            .path("/items/7")
            .build();
        let response = pipeline
            .run(request, |_| async move { Err::<Response, _>(Fault::not_found()) })
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body()["message"], "Not Found");
    }
}
