//! Failure injection tests against real sockets.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crawl_client::config::ClientConfig;
use crawl_client::net::TransportError;
use crawl_client::observability::{ClientEvent, MemorySink};
use crawl_client::resilience::RetryPolicy;
use crawl_client::{ClientError, RequestOptions, Session};

mod common;

fn fast_retries(attempts: u32) -> RetryPolicy {
    RetryPolicy::default().with_attempts(attempts).with_backoff_factor(0.05)
}

async fn open_session(endpoint: String, retry: RetryPolicy) -> (Session, Arc<MemorySink>) {
    let mut config = ClientConfig::new(endpoint);
    config.retry = retry;
    let events = Arc::new(MemorySink::new());
    let mut session = Session::new(config).unwrap().with_events(events.clone());
    session.open().await.unwrap();
    (session, events)
}

#[tokio::test]
async fn test_retry_on_failure() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let addr = common::start_programmable_backend(move |_| {
        let cc = cc.clone();
        async move {
            let count = cc.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                (503, "Service Unavailable".into())
            } else {
                (200, "Success".into())
            }
        }
    })
    .await;

    let (session, events) = open_session(format!("http://{addr}"), fast_retries(3)).await;
    let response = session
        .get("/", RequestOptions::new())
        .await
        .unwrap()
        .expect("request should succeed after retries");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Success");
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
    assert_eq!(events.retry_delays().len(), 2);
}

#[tokio::test]
async fn test_connection_refused_returns_none() {
    let addr = common::closed_port().await;
    let (session, events) = open_session(format!("http://{addr}"), fast_retries(1)).await;

    let result = session.get("/", RequestOptions::new()).await.unwrap();
    assert!(result.is_none());

    let failed = events
        .events()
        .into_iter()
        .find(|e| matches!(e, ClientEvent::RequestFailed { .. }))
        .expect("failure should be reported");
    assert!(matches!(failed, ClientEvent::RequestFailed { exhausted: true, .. }));
}

#[tokio::test]
async fn test_connection_refused_surfaces_through_try_request() {
    let addr = common::closed_port().await;
    let (session, _) = open_session(format!("http://{addr}"), RetryPolicy::none()).await;

    let err = session.try_request(crawl_client::Method::GET, "/", RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Connect(_))));
}

#[tokio::test]
async fn test_slow_backend_times_out_then_recovers() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let addr = common::start_programmable_backend(move |_| {
        let cc = cc.clone();
        async move {
            if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            (200, "late but fine".into())
        }
    })
    .await;

    let (session, events) = open_session(format!("http://{addr}"), fast_retries(2)).await;
    let response = session
        .get("/slow", RequestOptions::new().timeout(0.5))
        .await
        .unwrap()
        .expect("second attempt should answer in time");

    assert_eq!(response.text().await.unwrap(), "late but fine");
    assert!(call_count.load(Ordering::SeqCst) >= 2);
    let causes: Vec<String> = events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ClientEvent::RetryScheduled { cause, .. } => Some(cause),
            _ => None,
        })
        .collect();
    assert!(causes[0].contains("timed out"));
}

#[tokio::test]
async fn test_truncated_body_is_retried_then_reported() {
    let addr = common::start_truncating_backend("partial").await;
    let (session, events) = open_session(format!("http://{addr}"), fast_retries(1)).await;

    let result = session.get("/", RequestOptions::new()).await.unwrap();
    assert!(result.is_none());
    assert_eq!(events.retry_delays().len(), 1);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let addr = common::start_programmable_backend(move |_| {
        cc.fetch_add(1, Ordering::SeqCst);
        async { (404, "missing".into()) }
    })
    .await;

    let (session, _) = open_session(format!("http://{addr}"), fast_retries(3)).await;
    let err = session
        .try_request(crawl_client::Method::GET, "/nope", RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 404, .. }));
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_json_body_and_headers_reach_backend() {
    let seen = Arc::new(std::sync::Mutex::new(String::new()));
    let sink = seen.clone();
    let addr = common::start_programmable_backend(move |request| {
        *sink.lock().unwrap() = request;
        async { (200, r#"{"ok":true,"items":[1,2,3]}"#.into()) }
    })
    .await;

    let (mut session, _) = open_session(format!("http://{addr}"), fast_retries(0)).await;
    session.headers_mut().insert("X-Session".into(), "persistent".into());
    session.cookies_mut().insert("sid".into(), "abc".into());

    let response = session
        .post(
            "/items?page=2",
            RequestOptions::new()
                .json(&serde_json::json!({ "name": "widget" }))
                .param("sort", "asc"),
        )
        .await
        .unwrap()
        .unwrap();

    let body = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["items"][2], 3);
    assert_eq!(&response.bytes().await.unwrap()[..], br#"{"ok":true,"items":[1,2,3]}"#);

    let request = seen.lock().unwrap().to_lowercase();
    assert!(request.starts_with("post /items?page=2&sort=asc"));
    assert!(request.contains("x-session: persistent"));
    assert!(request.contains("cookie: sid=abc"));
    assert!(request.contains("content-type: application/json"));
    assert!(request.ends_with(r#"{"name":"widget"}"#));
}

#[tokio::test]
async fn test_bearer_auth_header_sent() {
    let seen = Arc::new(std::sync::Mutex::new(String::new()));
    let sink = seen.clone();
    let addr = common::start_programmable_backend(move |request| {
        *sink.lock().unwrap() = request;
        async { (200, "ok".into()) }
    })
    .await;

    let (session, _) = open_session(format!("http://{addr}"), RetryPolicy::none()).await;
    session
        .get("/", RequestOptions::new().auth(crawl_client::Credential::bearer("t0ken")))
        .await
        .unwrap()
        .unwrap();

    assert!(seen.lock().unwrap().to_lowercase().contains("authorization: bearer t0ken"));
}
