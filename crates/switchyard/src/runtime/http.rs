//! HTTP framework runtime.
//!
//! Hosts hand over a buffered `http::Request<Bytes>`; [`buffer_request`]
//! collects any other body type first. The reply is an
//! `http::Response<Full<Bytes>>` with a JSON body.

use ::http::header::{HeaderValue, CONTENT_TYPE};
use ::http::StatusCode;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use switchyard_core::{Inbound, RawEvent, Response, RouteMethod, RuntimeKind};

use super::{body_bytes, decode_body, parse_query, Malformed, JSON_CONTENT_TYPE};

/// Collects a streaming request body so the request can be run as an
/// [`Event::Http`](super::Event::Http).
pub async fn buffer_request<B>(request: ::http::Request<B>) -> Result<::http::Request<Bytes>, B::Error>
where
    B: BodyExt,
{
    let (parts, body) = request.into_parts();
    let collected = body.collect().await?;
    Ok(::http::Request::from_parts(parts, collected.to_bytes()))
}

pub(crate) fn decode(request: ::http::Request<Bytes>) -> Result<Inbound, Malformed> {
    let mut inbound = Inbound::new(
        RuntimeKind::HttpFramework,
        RouteMethod::Http(request.method().clone()),
        request.uri().path(),
    );

    if let Some(query) = request.uri().query() {
        inbound.query = parse_query(query).map_err(|f| Malformed::with_fault(f, &inbound))?;
    }

    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    inbound.body = decode_body(request.body(), content_type)
        .map_err(|f| Malformed::with_fault(f, &inbound))?;
    inbound.headers = request.headers().clone();
    inbound.raw = RawEvent::new(request);
    Ok(inbound)
}

pub(crate) fn encode(response: &Response) -> ::http::Response<Full<Bytes>> {
    let status = response.status();
    let bodiless = status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED;

    let body = if bodiless {
        Bytes::new()
    } else {
        body_bytes(response.body())
    };

    let mut reply = ::http::Response::new(Full::new(body));
    *reply.status_mut() = status;
    *reply.headers_mut() = response.headers().clone();
    if !bodiless && !reply.headers().contains_key(CONTENT_TYPE) {
        reply
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::http::Method;
    use serde_json::{json, Value};

    fn request(method: Method, uri: &str, body: &'static [u8]) -> ::http::Request<Bytes> {
        ::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-tenant", "acme")
            .body(Bytes::from_static(body))
            .unwrap()
    }

    #[test]
    fn test_decode_parts() {
        let inbound = decode(request(Method::POST, "/items/7?verbose=true", br#"{"name":"w"}"#)).unwrap();
        assert_eq!(inbound.runtime, RuntimeKind::HttpFramework);
        assert_eq!(inbound.method, RouteMethod::Http(Method::POST));
        assert_eq!(inbound.path, "/items/7");
        assert_eq!(inbound.query.get("verbose").map(String::as_str), Some("true"));
        assert_eq!(inbound.body, json!({ "name": "w" }));
        assert_eq!(inbound.headers.get("x-tenant").unwrap(), "acme");
        assert!(inbound.raw.downcast_ref::<::http::Request<Bytes>>().is_some());
    }

    #[test]
    fn test_decode_bad_json_keeps_call_info() {
        let malformed = decode(request(Method::POST, "/items", b"{nope")).unwrap_err();
        assert_eq!(malformed.fault.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(malformed.info.path, "/items");
    }

    #[test]
    fn test_encode_sets_json_content_type() {
        let reply = encode(&Response::new(json!({ "ok": true })).with_status(StatusCode::CREATED));
        assert_eq!(reply.status(), StatusCode::CREATED);
        assert_eq!(reply.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_encode_no_content_has_no_body_headers() {
        let reply = encode(&Response::new(Value::Null).with_status(StatusCode::NO_CONTENT));
        assert!(!reply.headers().contains_key(CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_buffer_request_collects_body() {
        let streaming = ::http::Request::builder()
            .uri("/x")
            .body(Full::new(Bytes::from_static(b"[1]")))
            .unwrap();
        let buffered = buffer_request(streaming).await.unwrap();
        assert_eq!(buffered.body(), &Bytes::from_static(b"[1]"));
        assert_eq!(buffered.uri().path(), "/x");
    }
}
