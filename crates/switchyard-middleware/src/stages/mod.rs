//! Built-in middleware.
//!
//! Neither is registered by default; add them with
//! [`Pipeline::register`](crate::Pipeline::register) like any other
//! descriptor.
//!
//! - [`request_id`] - adopt a caller's `x-request-id` and echo it back
//! - [`telemetry`] - completion logs and invocation metrics

pub mod request_id;
pub mod telemetry;

pub use request_id::RequestIdMiddleware;
pub use telemetry::TelemetryMiddleware;
