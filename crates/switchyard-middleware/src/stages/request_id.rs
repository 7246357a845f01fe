//! Request id propagation.
//!
//! Every invocation already carries a generated UUID v7 id. This middleware
//! optionally adopts the caller's id from the `x-request-id` header in
//! `start`, and always echoes the final id on the response in `end`.

use switchyard_core::{Request, RequestId};

use crate::middleware::Middleware;

/// The header name for request id propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Adopts and echoes request ids.
///
/// Incoming ids are ignored unless the middleware was built with
/// [`RequestIdMiddleware::trust_incoming`]; external callers should not be
/// able to choose the id that appears in server logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Always keeps the generated id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts a valid UUID from `x-request-id` when present.
    #[must_use]
    pub const fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn extract_request_id(self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        request
            .header(REQUEST_ID_HEADER)
            .and_then(|value| value.trim().parse().ok())
    }

    /// Builds the descriptor.
    #[must_use]
    pub fn into_middleware(self) -> Middleware {
        Middleware::new("request_id")
            .on_start(move |mut request| {
                if let Some(id) = self.extract_request_id(&request) {
                    request.set_id(id);
                }
                async move { Ok(request) }
            })
            .on_end(|mut response, _globals| async move {
                if let Some(id) = response.info().map(|info| info.id.to_string()) {
                    response.insert_header(REQUEST_ID_HEADER, &id);
                }
                Ok(response)
            })
    }
}

impl From<RequestIdMiddleware> for Middleware {
    fn from(mw: RequestIdMiddleware) -> Self {
        mw.into_middleware()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pipeline;
    use http::Method;
    use switchyard_core::{Response, Route};

    const CALLER_ID: &str = "01890a5d-ac96-774b-bcce-b302099a8057";

    fn request_with_header() -> Request {
        Request::builder(Route::new("ping", Method::GET, "/ping"))
            .path("/ping")
            .header(REQUEST_ID_HEADER, CALLER_ID)
            .build()
    }

    async fn echo_id(request: Request) -> Result<Response, switchyard_core::Fault> {
        Ok(Response::new(serde_json::json!(request.id().to_string())))
    }

    #[tokio::test]
    async fn test_untrusted_header_is_ignored() {
        let mut pipeline = Pipeline::new();
        pipeline.register(RequestIdMiddleware::new().into_middleware());

        let request = request_with_header();
        let generated = request.id().to_string();
        let response = pipeline.run(request, echo_id).await;

        assert_eq!(response.body(), &serde_json::json!(generated));
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            generated.as_str()
        );
    }

    #[tokio::test]
    async fn test_trusted_header_is_adopted() {
        let mut pipeline = Pipeline::new();
        pipeline.register(Middleware::from(RequestIdMiddleware::trust_incoming()));

        let response = pipeline.run(request_with_header(), echo_id).await;
        assert_eq!(response.body(), &serde_json::json!(CALLER_ID));
        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), CALLER_ID);
        assert_eq!(response.info().unwrap().id.to_string(), CALLER_ID);
    }

    #[tokio::test]
    async fn test_invalid_header_keeps_generated_id() {
        let mut pipeline = Pipeline::new();
        pipeline.register(RequestIdMiddleware::trust_incoming().into_middleware());

        let request = Request::builder(Route::new("ping", Method::GET, "/ping"))
            .path("/ping")
            .header(REQUEST_ID_HEADER, "not-a-uuid")
            .build();
        let generated = request.id().to_string();

        let response = pipeline.run(request, echo_id).await;
        assert_eq!(response.body(), &serde_json::json!(generated));
    }

    #[tokio::test]
    async fn test_header_set_on_fault_response() {
        let mut pipeline = Pipeline::new();
        pipeline.register(RequestIdMiddleware::new().into_middleware());

        let response = pipeline
            .run(request_with_header(), |_| async move {
                Err(switchyard_core::Fault::not_found())
            })
            .await;
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }
}
