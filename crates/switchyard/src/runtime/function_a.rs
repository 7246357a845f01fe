//! Gateway-proxy cloud function runtime (`cloud-function-a`).
//!
//! Event:
//!
//! ```json
//! {
//!   "httpMethod": "POST",
//!   "path": "/items/7",
//!   "queryStringParameters": { "verbose": "true" },
//!   "headers": { "content-type": "application/json" },
//!   "body": "{\"name\":\"widget\"}",
//!   "isBase64Encoded": false
//! }
//! ```
//!
//! Result: `{ "statusCode", "headers", "body": <JSON string>, "isBase64Encoded": false }`.
//! Fields the gateway adds beyond these (request context, stage variables)
//! are ignored but stay reachable through the raw event.

use ::http::header::CONTENT_TYPE;
use ::http::Method;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use switchyard_core::{Inbound, RawEvent, Response, RouteMethod, RuntimeKind};

use super::{decode_body, header_map, reply_headers, string_map, Malformed};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayEvent {
    http_method: String,
    path: String,
    #[serde(default)]
    query_string_parameters: Option<Map<String, Value>>,
    #[serde(default)]
    headers: Option<Map<String, Value>>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: bool,
}

pub(crate) fn decode(event: Value) -> Result<Inbound, Malformed> {
    let runtime = RuntimeKind::CloudFunctionA;
    let parsed = match GatewayEvent::deserialize(&event) {
        Ok(parsed) => parsed,
        Err(e) => {
            let path = event.get("path").and_then(Value::as_str).unwrap_or("/");
            return Err(Malformed::new(runtime, RouteMethod::Http(Method::GET), path, e));
        }
    };

    let method = Method::from_bytes(parsed.http_method.to_ascii_uppercase().as_bytes())
        .map_err(|e| Malformed::new(runtime, RouteMethod::Http(Method::GET), &parsed.path, e))?;

    let mut inbound = Inbound::new(runtime, RouteMethod::Http(method), parsed.path);
    inbound.query = string_map(parsed.query_string_parameters.as_ref());
    inbound.headers = header_map(parsed.headers.as_ref());

    let raw_body = match parsed.body {
        Some(body) if parsed.is_base64_encoded => STANDARD.decode(body.as_bytes()).map_err(|e| {
            Malformed::new(runtime, inbound.method.clone(), &inbound.path, format!("body is not base64: {e}"))
        })?,
        Some(body) => body.into_bytes(),
        None => Vec::new(),
    };
    let content_type = inbound
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    inbound.body = decode_body(&raw_body, content_type).map_err(|f| Malformed::with_fault(f, &inbound))?;
    inbound.raw = RawEvent::new(event);
    Ok(inbound)
}

pub(crate) fn encode(response: &Response) -> Value {
    json!({
        "statusCode": response.status().as_u16(),
        "headers": reply_headers(response),
        "body": response.body().to_string(),
        "isBase64Encoded": false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::http::StatusCode;

    #[test]
    fn test_decode_gateway_event() {
        let inbound = decode(json!({
            "httpMethod": "post",
            "path": "/items/7",
            "queryStringParameters": { "verbose": "true" },
            "headers": { "Content-Type": "application/json" },
            "body": "{\"name\":\"widget\"}",
            "isBase64Encoded": false,
            "requestContext": { "stage": "prod" }
        }))
        .unwrap();

        assert_eq!(inbound.runtime, RuntimeKind::CloudFunctionA);
        assert_eq!(inbound.method, RouteMethod::Http(Method::POST));
        assert_eq!(inbound.query.get("verbose").map(String::as_str), Some("true"));
        assert_eq!(inbound.body, json!({ "name": "widget" }));
        let raw = inbound.raw.downcast_ref::<Value>().unwrap();
        assert_eq!(raw["requestContext"]["stage"], "prod");
    }

    #[test]
    fn test_decode_base64_body() {
        let inbound = decode(json!({
            "httpMethod": "PUT",
            "path": "/blob",
            "body": STANDARD.encode(br#"{"n":1}"#),
            "isBase64Encoded": true
        }))
        .unwrap();
        assert_eq!(inbound.body, json!({ "n": 1 }));
    }

    #[test]
    fn test_null_sections_are_empty() {
        let inbound = decode(json!({
            "httpMethod": "GET",
            "path": "/",
            "queryStringParameters": null,
            "headers": null,
            "body": null
        }))
        .unwrap();
        assert!(inbound.query.is_empty());
        assert_eq!(inbound.body, Value::Null);
    }

    #[test]
    fn test_missing_method_is_malformed() {
        let malformed = decode(json!({ "path": "/items" })).unwrap_err();
        assert_eq!(malformed.fault.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(malformed.fault.message().contains("cloud-function-a"));
        assert_eq!(malformed.info.path, "/items");
    }

    #[test]
    fn test_encode_embeds_json_string() {
        let reply = encode(&Response::new(json!({ "id": "42" })));
        assert_eq!(reply["statusCode"], 200);
        assert_eq!(reply["body"], "{\"id\":\"42\"}");
        assert_eq!(reply["isBase64Encoded"], false);
        assert_eq!(reply["headers"]["content-type"], "application/json");
    }
}
