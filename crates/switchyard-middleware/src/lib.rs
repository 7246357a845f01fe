//! # Switchyard Middleware
//!
//! The staged pipeline every Switchyard invocation runs through.
//!
//! ## Stages
//!
//! ```text
//! start → mount → in → controller → out → end
//! ```
//!
//! | Stage   | Handler shape            | Skipped after a failure |
//! |---------|--------------------------|-------------------------|
//! | `start` | request → request        | yes                     |
//! | `mount` | request → request        | yes                     |
//! | `in`    | request → request        | yes                     |
//! | `out`   | response → response      | yes                     |
//! | `end`   | response → response      | never                   |
//!
//! Handlers are grouped into named [`Middleware`] descriptors. Registering a
//! descriptor appends each of its handlers to the matching stage, so one
//! descriptor can hook several stages while per-stage ordering stays
//! registration order.
//!
//! ## Example
//!
//! ```
//! use switchyard_middleware::{Middleware, Pipeline, Stage};
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.register(
//!     Middleware::new("auth").on_in(|request| async move { Ok(request) }),
//! );
//! pipeline.on_end(|response, _globals| async move { Ok(response) });
//!
//! assert_eq!(pipeline.handler_names(Stage::In), vec!["auth"]);
//! assert_eq!(pipeline.len(), 2);
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod stage;
pub mod stages;

pub use middleware::{
    request_handler, response_handler, Middleware, RequestHandler, ResponseHandler, StageHandler,
};
pub use pipeline::Pipeline;
pub use stage::{Stage, UnknownStage};
