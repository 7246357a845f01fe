//! The same application answered through every runtime.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use switchyard::prelude::*;

fn application() -> Application {
    let routes = RouteTable::from_routes([
        Route::new("item", Method::GET, "/test/{id}"),
        Route::new("create", Method::POST, "/items"),
        Route::new("secret", Method::GET, "/secret"),
    ])
    .unwrap();

    let mut app = Application::new(routes);
    app.controller(
        "item",
        Controller::new().get(|req, _globals| async move {
            Ok::<_, Fault>(json!({ "id": req.param("id"), "q": req.query().get("q") }))
        }),
    );
    app.controller(
        "create",
        Controller::new().post(|req, _globals| async move {
            let name = req.body()["name"]
                .as_str()
                .ok_or_else(|| Fault::bad_request("name is required"))?
                .to_string();
            Ok::<_, Fault>((StatusCode::CREATED, json!({ "name": name })))
        }),
    );
    app.controller(
        "secret",
        Controller::new().get(|_req, _globals| async move {
            Err::<(), _>(
                Fault::data("replica lag on db-3").with_details(json!({ "dsn": "postgres://admin:pw@db-3" })),
            )
        }),
    );
    app
}

async fn http_body(reply: Reply) -> (StatusCode, http::HeaderMap, Value) {
    let response = reply.into_http().expect("http reply");
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    (parts.status, parts.headers, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_http_runtime() {
    let app = application();
    let request = http::Request::get("/test/42?q=rust")
        .body(Bytes::new())
        .unwrap();

    let (status, headers, body) = http_body(app.run(Event::Http(request)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(body, json!({ "id": "42", "q": "rust" }));
}

#[tokio::test]
async fn test_http_client_fault() {
    let app = application();
    let request = http::Request::post("/items")
        .header("content-type", "application/json")
        .body(Bytes::from_static(br#"{"name": 5}"#))
        .unwrap();

    let (status, _, body) = http_body(app.run(Event::Http(request)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "name is required" }));
}

#[tokio::test]
async fn test_http_unparseable_body_is_400() {
    let app = application();
    let request = http::Request::post("/items")
        .header("content-type", "application/json")
        .body(Bytes::from_static(b"{name"))
        .unwrap();

    let (status, _, _) = http_body(app.run(Event::Http(request)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unparseable_body_wins_over_unmatched_path() {
    let mut app = application();
    let ended = Arc::new(std::sync::Mutex::new(Vec::new()));
    let statuses = Arc::clone(&ended);
    app.on_end(move |response: Response, _globals| {
        statuses.lock().unwrap().push(response.status().as_u16());
        async move { Ok(response) }
    });

    let request = http::Request::post("/nowhere")
        .header("content-type", "application/json")
        .body(Bytes::from_static(b"{name"))
        .unwrap();
    let (status, _, _) = http_body(app.run(Event::Http(request)).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = http::Request::post("/nowhere")
        .header("content-type", "application/json")
        .body(Bytes::from_static(b"{}"))
        .unwrap();
    let (status, _, _) = http_body(app.run(Event::Http(request)).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(*ended.lock().unwrap(), [400, 404]);
}

#[tokio::test]
async fn test_function_a_runtime() {
    let app = application();
    let reply = app
        .run(Event::FunctionA(json!({
            "httpMethod": "POST",
            "path": "/items",
            "headers": { "content-type": "application/json" },
            "body": "{\"name\":\"widget\"}",
            "isBase64Encoded": false
        })))
        .await
        .into_json()
        .unwrap();

    assert_eq!(reply["statusCode"], 201);
    assert_eq!(reply["isBase64Encoded"], false);
    let body: Value = serde_json::from_str(reply["body"].as_str().unwrap()).unwrap();
    assert_eq!(body, json!({ "name": "widget" }));
}

#[tokio::test]
async fn test_function_b_runtime() {
    let app = application();
    let reply = app
        .run(Event::FunctionB(json!({
            "method": "post",
            "path": "/items",
            "body": { "name": "widget" }
        })))
        .await
        .into_json()
        .unwrap();

    assert_eq!(reply["status"], 201);
    assert_eq!(reply["body"], json!({ "name": "widget" }));
}

#[tokio::test]
async fn test_data_fault_hidden_in_every_runtime() {
    let app = application();

    let request = http::Request::get("/secret").body(Bytes::new()).unwrap();
    let (status, _, body) = http_body(app.run(Event::Http(request)).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Internal Server Error" }));

    let reply = app
        .run(Event::FunctionA(json!({ "httpMethod": "GET", "path": "/secret" })))
        .await
        .into_json()
        .unwrap();
    assert_eq!(reply["statusCode"], 500);
    assert!(!reply["body"].as_str().unwrap().contains("db-3"));

    let reply = app
        .run(Event::FunctionB(json!({ "method": "GET", "path": "/secret" })))
        .await
        .into_json()
        .unwrap();
    assert_eq!(reply["status"], 500);
    assert!(!reply.to_string().contains("admin:pw"));
}

#[tokio::test]
async fn test_malformed_function_event_is_500_through_end() {
    let mut app = application();
    let ended = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&ended);
    app.on_end(move |response, _globals| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        async move { Ok(response) }
    });

    let reply = app
        .run(Event::FunctionA(json!({ "path": "/items" })))
        .await
        .into_json()
        .unwrap();
    assert_eq!(reply["statusCode"], 500);
    assert_eq!(ended.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_invocations_share_application() {
    let app = Arc::new(application());
    let calls: Vec<_> = (0..16)
        .map(|i| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                let event = Event::FunctionB(json!({ "method": "GET", "path": format!("/test/{i}") }));
                app.run(event).await.into_json().unwrap()
            })
        })
        .collect();

    for (i, call) in calls.into_iter().enumerate() {
        let reply = call.await.unwrap();
        assert_eq!(reply["body"]["id"], i.to_string());
    }
}
