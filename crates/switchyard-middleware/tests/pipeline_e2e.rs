//! End-to-end pipeline tests.
//!
//! These drive a pipeline with several descriptors, the built-in stages and
//! a controller stand-in, checking ordering and failure handling together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::{Method, StatusCode};
use serde_json::json;
use switchyard_core::{Fault, FaultKind, Globals, LogLevel, Request, Response, Route};
use switchyard_middleware::stages::request_id::REQUEST_ID_HEADER;
use switchyard_middleware::stages::{RequestIdMiddleware, TelemetryMiddleware};
use switchyard_middleware::{Middleware, Pipeline, Stage};

fn item_request() -> Request {
    Request::builder(Route::new("item", Method::GET, "/test/{id}"))
        .path("/test/42")
        .globals(Arc::new(Globals::new()))
        .build()
}

/// Appends its tag to the body array in every request stage.
fn tagger(tag: &'static str) -> Middleware {
    let push = move |mut request: Request| {
        let mut body = request.body().clone();
        if !body.is_array() {
            body = json!([]);
        }
        if let Some(items) = body.as_array_mut() {
            items.push(json!(tag));
        }
        request.set_body(body);
        async move { Ok(request) }
    };
    Middleware::new(tag).on_start(push).on_in(push)
}

#[tokio::test]
async fn test_handlers_see_previous_output() {
    let mut pipeline = Pipeline::new();
    pipeline.register(vec![tagger("h1"), tagger("h2"), tagger("h3")]);

    let response = pipeline
        .run(item_request(), |request| async move {
            Ok(Response::new(request.body().clone()))
        })
        .await;

    assert_eq!(
        response.body(),
        &json!(["h1", "h2", "h3", "h1", "h2", "h3"])
    );
}

#[tokio::test]
async fn test_failing_handler_stops_later_handlers_and_action() {
    let later = Arc::new(AtomicUsize::new(0));
    let ends = Arc::new(AtomicUsize::new(0));
    let action_calls = Arc::new(AtomicUsize::new(0));

    let mut pipeline = Pipeline::new();
    pipeline.register(tagger("h1"));
    pipeline.register(
        Middleware::new("h2").on_mount(|_| async move { Err(Fault::unauthorized("token expired")) }),
    );
    let counter = later.clone();
    pipeline.register(Middleware::new("h3").on_in(move |request| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(request) }
    }));
    for _ in 0..2 {
        let ends = ends.clone();
        pipeline.on_end(move |response, _| {
            ends.fetch_add(1, Ordering::SeqCst);
            async move { Ok(response) }
        });
    }

    let calls = action_calls.clone();
    let response = pipeline
        .run(item_request(), move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Response::default()) }
        })
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.body()["message"], "token expired");
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert_eq!(action_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ends.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_not_found_fault_is_verbatim() {
    let pipeline = Pipeline::new();
    let response = pipeline
        .run(item_request(), |_| async move { Err(Fault::not_found()) })
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body()["message"], "Not Found");
}

#[tokio::test]
async fn test_data_fault_details_stay_private() {
    let pipeline = Pipeline::new();
    let response = pipeline
        .run(item_request(), |_| async move {
            Err(Fault::data("duplicate key value violates unique constraint")
                .with_details(json!({ "table": "users", "password_hash": "x9f" }))
                .with_log_level(LogLevel::All))
        })
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.body().to_string();
    assert!(!body.contains("password_hash"));
    assert!(!body.contains("duplicate key"));
    assert!(response.body().get("details").is_none());
    assert_eq!(response.error().unwrap().kind, FaultKind::Data);
}

#[tokio::test]
async fn test_all_stages_registration_runs_out_and_end_once() {
    let outs = Arc::new(AtomicUsize::new(0));
    let ends = Arc::new(AtomicUsize::new(0));
    let (o, e) = (outs.clone(), ends.clone());

    let mw = Middleware::new("audit")
        .on_out(move |response, _| {
            o.fetch_add(1, Ordering::SeqCst);
            async move { Ok(response) }
        })
        .on_end(move |response, _| {
            e.fetch_add(1, Ordering::SeqCst);
            async move { Ok(response) }
        });
    assert_eq!(mw.stages(), vec![Stage::Out, Stage::End]);

    let mut pipeline = Pipeline::new();
    pipeline.register(mw);
    pipeline
        .run(item_request(), |_| async move { Ok(Response::default()) })
        .await;

    assert_eq!(outs.load(Ordering::SeqCst), 1);
    assert_eq!(ends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_builtins_with_failing_teardown() {
    let seen = Arc::new(Mutex::new(None));
    let seen_status = seen.clone();

    let mut pipeline = Pipeline::new();
    pipeline.register(vec![
        RequestIdMiddleware::new().into_middleware(),
        TelemetryMiddleware::logs_only().into_middleware(),
    ]);
    pipeline.on_end(|_, _| async move { Err(Fault::system("flush failed")) });
    pipeline.on_end(move |response, _| {
        *seen_status.lock().unwrap() = Some(response.status());
        async move { Ok(response) }
    });

    let response = pipeline
        .run(item_request(), |request| async move {
            Ok(Response::new(json!({ "id": request.param("id") })))
        })
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), &json!({ "id": "42" }));
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    assert_eq!(*seen.lock().unwrap(), Some(StatusCode::OK));
}
