//! Direct-invocation cloud function runtime (`cloud-function-b`).
//!
//! The event carries an already-decoded JSON body:
//!
//! ```json
//! { "method": "get", "path": "/test/42", "query": {}, "headers": {}, "body": null }
//! ```
//!
//! The result keeps the body as a JSON value: `{ "status", "headers", "body" }`.

use ::http::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use switchyard_core::{Inbound, RawEvent, Response, RouteMethod, RuntimeKind};

use super::{header_map, parse_query, reply_headers, string_map, Malformed};

#[derive(Debug, Deserialize)]
struct InvocationEvent {
    method: String,
    path: String,
    #[serde(default)]
    query: Option<Map<String, Value>>,
    #[serde(default)]
    headers: Option<Map<String, Value>>,
    #[serde(default)]
    body: Value,
}

pub(crate) fn decode(event: Value) -> Result<Inbound, Malformed> {
    let runtime = RuntimeKind::CloudFunctionB;
    let parsed = match InvocationEvent::deserialize(&event) {
        Ok(parsed) => parsed,
        Err(e) => {
            let path = event.get("path").and_then(Value::as_str).unwrap_or("/");
            return Err(Malformed::new(runtime, RouteMethod::Http(Method::GET), path, e));
        }
    };

    let method = Method::from_bytes(parsed.method.to_ascii_uppercase().as_bytes())
        .map_err(|e| Malformed::new(runtime, RouteMethod::Http(Method::GET), &parsed.path, e))?;

    // A query string left on the path is merged under the explicit query.
    let (path, inline_query) = match parsed.path.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (parsed.path, None),
    };

    let mut inbound = Inbound::new(runtime, RouteMethod::Http(method), path);
    if let Some(query) = inline_query {
        inbound.query = parse_query(&query).map_err(|f| Malformed::with_fault(f, &inbound))?;
    }
    inbound.query.extend(string_map(parsed.query.as_ref()));
    inbound.headers = header_map(parsed.headers.as_ref());
    inbound.body = parsed.body;
    inbound.raw = RawEvent::new(event);
    Ok(inbound)
}

pub(crate) fn encode(response: &Response) -> Value {
    json!({
        "status": response.status().as_u16(),
        "headers": reply_headers(response),
        "body": response.body(),
    })
}
