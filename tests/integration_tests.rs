//! Integration tests using wiremock to simulate HTTP servers.

use chaincall::hooks::{BaseUrl, RetryOnStatus, StaticHeader};
use chaincall::{
    Action, Body, Decoded, Error, Pipeline, RequestParameters, Response, Session,
};
use futures::StreamExt;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
}

fn session_for(server: &MockServer) -> Session {
    Session::builder()
        .base_url(server.uri())
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn plain_get_returns_response_with_json_view() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/users/1");

    let response = pipeline.execute(params).await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json().unwrap()["id"], 1);
    assert_eq!(response.params.path, "/users/1");
}

#[tokio::test]
async fn pre_hook_prepends_base_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    // The session has no base URL; the hook supplies the absolute prefix.
    let pipeline = Pipeline::builder()
        .pre_hook(BaseUrl::new(server.uri()))
        .build();
    let params = RequestParameters::new(Session::new(), Method::GET, "/users/1");

    let response = pipeline.execute(params).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn pre_hook_failure_makes_no_transport_call() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = Pipeline::builder()
        .pre_hook(|_params: RequestParameters| -> chaincall::Result<RequestParameters> {
            Err(Error::hook("token store is empty"))
        })
        .build();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/users/1");

    let result = pipeline.execute(params).await;
    assert!(matches!(result, Err(Error::Hook(_))));
}

#[tokio::test]
async fn retry_on_unauthorized_delivers_the_retried_response() {
    let server = MockServer::start().await;

    // Mounted first so the credentialed retry matches before the fallback.
    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("granted"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/secure"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let pipeline = Pipeline::builder()
        .post_hook(RetryOnStatus::with_prepare(
            StatusCode::UNAUTHORIZED,
            |params| {
                params
                    .with_header("authorization", "Bearer fresh")
                    .expect("static header is valid")
            },
        ))
        .build();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/secure");

    let response = pipeline.execute(params).await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "granted");
    // The embedded parameters are the retried ones, not the originals.
    assert_eq!(
        response.params.headers.get("authorization").unwrap(),
        "Bearer fresh"
    );
}

#[tokio::test]
async fn completed_now_short_circuits_the_chain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .mount(&server)
        .await;

    let later_step_ran = Arc::new(AtomicBool::new(false));
    let flag = later_step_ran.clone();

    let pipeline = Pipeline::builder()
        .post_hook(|_r: &Response, _o: &RequestParameters| -> chaincall::Result<Action> {
            Ok(Action::CompletedNow)
        })
        .post_hook(move |_r: &Response, _o: &RequestParameters| -> chaincall::Result<Action> {
            flag.store(true, Ordering::SeqCst);
            Ok(Action::Continue)
        })
        .build();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/test");

    let response = pipeline.execute(params).await.unwrap();

    assert_eq!(response.text(), "first");
    assert!(!later_step_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn failed_retry_aborts_the_remaining_chain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let later_step_ran = Arc::new(AtomicBool::new(false));
    let flag = later_step_ran.clone();

    // The retry targets a closed port, so the nested call fails.
    let pipeline = Pipeline::builder()
        .post_hook(|response: &Response, _o: &RequestParameters| -> chaincall::Result<Action> {
            Ok(Action::MakeNewRequest(
                response.params.clone().with_path("http://127.0.0.1:1/retry"),
            ))
        })
        .post_hook(move |_r: &Response, _o: &RequestParameters| -> chaincall::Result<Action> {
            flag.store(true, Ordering::SeqCst);
            Ok(Action::Continue)
        })
        .build();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/test");

    let result = pipeline.execute(params).await;

    assert!(matches!(result, Err(Error::NoInternet(_))));
    assert!(!later_step_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn connect_failure_classifies_as_no_internet() {
    let session = Session::builder()
        .base_url("http://127.0.0.1:1")
        .unwrap()
        .build()
        .unwrap();
    let pipeline = Pipeline::new();
    let params = RequestParameters::new(session, Method::GET, "/test");

    match pipeline.execute(params).await {
        Err(Error::NoInternet(_)) => {}
        other => panic!("expected NoInternet, got {:?}", other),
    }
}

#[tokio::test]
async fn session_default_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .and(header("user-agent", "test-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::builder()
        .base_url(server.uri())
        .unwrap()
        .default_header("User-Agent", "test-agent")
        .unwrap()
        .build()
        .unwrap();
    let pipeline = Pipeline::new();
    let params = RequestParameters::new(session, Method::GET, "/test");

    let response = pipeline.execute(params).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn static_header_hook_applies_to_every_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::builder()
        .pre_hook(StaticHeader::new("x-api-key", "secret").unwrap())
        .build();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/test");

    let response = pipeline.execute(params).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn fields_body_posts_a_json_object() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(serde_json::json!({"query": "rust", "limit": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new();
    let params = RequestParameters::new(session_for(&server), Method::POST, "/search")
        .with_field("query", "rust")
        .with_field("limit", 10);
    assert!(!matches!(params.body, Body::Empty));

    let response = pipeline.execute(params).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[test]
fn callback_adapter_delivers_exactly_once() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;
        server
    });

    let pipeline = Pipeline::new();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/test");
    let (tx, rx) = std::sync::mpsc::channel();

    pipeline.execute_callback(params, move |result| {
        tx.send(result).unwrap();
    });

    let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(result.unwrap().status, StatusCode::OK);
    // The sender is consumed by the single permitted delivery.
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn blocking_adapter_round_trip() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
            .mount(&server)
            .await;
        server
    });

    let pipeline = Pipeline::new();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/test");

    let response = pipeline.execute_blocking(params).unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json().unwrap()["id"], 1);
}

#[tokio::test]
async fn blocking_adapter_refuses_to_run_inside_a_runtime() {
    let pipeline = Pipeline::new();
    let params = RequestParameters::new(Session::new(), Method::GET, "http://127.0.0.1:1/test");

    let result = pipeline.execute_blocking(params);
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn stream_emits_exactly_one_value() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/test");

    let mut stream = pipeline.execute_stream(params);

    let first = stream.next().await.expect("one value is emitted").unwrap();
    assert_eq!(first.status, StatusCode::OK);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn cancelled_stream_delivers_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let pipeline = Pipeline::new();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/slow");

    let mut stream = pipeline.execute_stream(params);
    let handle = stream.cancel_handle();

    // Let the transport call get in flight, then cancel mid-way.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let cancelled_at = Instant::now();
    handle.cancel();

    assert!(stream.next().await.is_none());
    assert!(handle.is_cancelled());
    // The stream ended without waiting out the server's delay.
    assert!(cancelled_at.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
async fn typed_bridge_encodes_and_decodes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_json(serde_json::json!({"id": 0, "name": "Alice"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 1, "name": "Alice"})),
        )
        .mount(&server)
        .await;

    let session = session_for(&server);
    let pipeline = Pipeline::new();

    let new_user = User {
        id: 0,
        name: "Alice".to_string(),
    };
    let created: Decoded<User> = pipeline.post(&session, "/users", &new_user).await.unwrap();

    assert_eq!(created.data.id, 1);
    assert_eq!(created.data.name, "Alice");
    assert_eq!(created.response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn decode_failure_is_a_distinct_error_kind() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let pipeline = Pipeline::new();

    match pipeline.get::<User>(&session, "/users/1").await {
        Err(Error::Decoding { response, .. }) => {
            // The HTTP call itself succeeded; only the decode failed.
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.text(), "not json");
            assert_eq!(response.params.path, "/users/1");
        }
        other => panic!("expected Decoding, got {:?}", other),
    }
}

#[tokio::test]
async fn typed_stream_decodes_on_emission() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1, "name": "Ada"})),
        )
        .mount(&server)
        .await;

    let pipeline = Pipeline::new();
    let params = RequestParameters::new(session_for(&server), Method::GET, "/users/1");

    let mut stream = pipeline.execute_typed_stream::<(), User>(params, None);

    let user = stream.next().await.expect("one value is emitted").unwrap();
    assert_eq!(user.data.name, "Ada");
    assert!(stream.next().await.is_none());
}
