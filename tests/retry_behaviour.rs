//! Retry state machine driven through a scripted transport on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use crawl_client::config::{ClientConfig, ValidationError};
use crawl_client::net::{ProxyConfig, TransportError};
use crawl_client::observability::{ClientEvent, MemorySink};
use crawl_client::resilience::RetryPolicy;
use crawl_client::{ClientError, Method, RequestOptions, Session};

mod common;
use common::{ScriptedTransport, Step};

async fn scripted_session(retry: RetryPolicy, steps: Vec<Step>) -> (Session, Arc<ScriptedTransport>, Arc<MemorySink>) {
    let mut config = ClientConfig::new("https://api.example.com");
    config.retry = retry;
    let transport = ScriptedTransport::new(steps);
    let events = Arc::new(MemorySink::new());
    let mut session = Session::new(config)
        .unwrap()
        .with_transport(transport.clone())
        .with_events(events.clone());
    session.open().await.unwrap();
    (session, transport, events)
}

fn failures(events: &MemorySink) -> Vec<ClientEvent> {
    events
        .events()
        .into_iter()
        .filter(|e| matches!(e, ClientEvent::RequestFailed { .. }))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_retryable_statuses_then_success() {
    let policy = RetryPolicy::default().with_attempts(2).with_backoff_factor(0.5);
    let (session, transport, events) = scripted_session(
        policy,
        vec![
            Step::Respond(503, "busy"),
            Step::Respond(503, "busy"),
            Step::Respond(200, "done"),
        ],
    )
    .await;

    let response = session.get("/jobs", RequestOptions::new()).await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "done");
    assert_eq!(transport.sends(), 3);
    assert_eq!(
        events.retry_delays(),
        vec![Duration::from_millis(500), Duration::from_millis(1000)]
    );
    assert!(failures(&events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_return_none() {
    let policy = RetryPolicy::default().with_attempts(1).with_backoff_factor(0.1);
    let (session, transport, events) = scripted_session(policy, vec![Step::Respond(500, "boom")]).await;

    let result = session.get("/jobs", RequestOptions::new()).await.unwrap();
    assert!(result.is_none());
    assert_eq!(transport.sends(), 2);

    let failed = failures(&events);
    assert_eq!(failed.len(), 1);
    match &failed[0] {
        ClientEvent::RequestFailed {
            method,
            url,
            exhausted,
            ..
        } => {
            assert_eq!(method, "GET");
            assert_eq!(url, "https://api.example.com/jobs");
            assert!(*exhausted);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_try_request_surfaces_status() {
    let (session, transport, _) = scripted_session(RetryPolicy::none(), vec![Step::Respond(502, "bad gateway")]).await;

    let err = session
        .try_request(Method::GET, "/jobs", RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 502, .. }));
    assert_eq!(transport.sends(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_status_fails_immediately() {
    let (session, transport, events) = scripted_session(RetryPolicy::default(), vec![Step::Respond(401, "nope")]).await;

    assert!(session.get("/jobs", RequestOptions::new()).await.unwrap().is_none());
    assert_eq!(transport.sends(), 1);
    assert!(matches!(
        failures(&events)[0],
        ClientEvent::RequestFailed { exhausted: false, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_connect_errors_are_retried() {
    let policy = RetryPolicy::default().with_attempts(3).with_backoff_factor(1.0);
    let (session, transport, events) = scripted_session(
        policy,
        vec![
            Step::Fail(TransportError::Connect("connection refused".into())),
            Step::Respond(200, "up"),
        ],
    )
    .await;

    let response = session.get("/", RequestOptions::new()).await.unwrap().unwrap();
    assert_eq!(response.text().await.unwrap(), "up");
    assert_eq!(transport.sends(), 2);
    assert_eq!(events.retry_delays(), vec![Duration::from_secs(1)]);
}

#[tokio::test(start_paused = true)]
async fn test_request_errors_are_not_retried() {
    let (session, transport, _) = scripted_session(
        RetryPolicy::default(),
        vec![Step::Fail(TransportError::Request("bad header".into()))],
    )
    .await;

    let err = session.try_request(Method::GET, "/", RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Request(_))));
    assert_eq!(transport.sends(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_attempt_hits_total_deadline() {
    let policy = RetryPolicy::default().with_attempts(1).with_backoff_factor(0.1);
    let (session, transport, events) =
        scripted_session(policy, vec![Step::Hang, Step::Respond(200, "finally")]).await;

    let response = session
        .get("/", RequestOptions::new().timeout(2.0))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "finally");
    assert_eq!(transport.sends(), 2);

    let causes: Vec<_> = events
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ClientEvent::RetryScheduled { cause, .. } => Some(cause),
            _ => None,
        })
        .collect();
    assert_eq!(causes.len(), 1);
    assert!(causes[0].contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_broken_body_is_retried() {
    let policy = RetryPolicy::default().with_attempts(1).with_backoff_factor(0.1);
    let (session, transport, _) = scripted_session(
        policy,
        vec![Step::BrokenBody(200, "half"), Step::Respond(200, "whole")],
    )
    .await;

    let response = session.get("/", RequestOptions::new()).await.unwrap().unwrap();
    assert_eq!(response.text().await.unwrap(), "whole");
    assert_eq!(transport.sends(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_proxy_never_reaches_transport() {
    let (session, transport, events) = scripted_session(RetryPolicy::default(), vec![Step::Respond(200, "ok")]).await;

    let err = session
        .get("/", RequestOptions::new().proxy(ProxyConfig::new("proxy.local", 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Config(ValidationError::Proxy(_))));
    assert_eq!(transport.sends(), 0);
    assert!(events.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_per_request_retry_override() {
    let (session, transport, _) = scripted_session(RetryPolicy::none(), vec![Step::Respond(503, "busy")]).await;

    let options = RequestOptions::new().retry(RetryPolicy::default().with_attempts(4).with_backoff_factor(0.01));
    assert!(session.get("/", options).await.unwrap().is_none());
    assert_eq!(transport.sends(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_retry_reuses_prepared_request() {
    let policy = RetryPolicy::default().with_attempts(1).with_backoff_factor(0.1);
    let (session, transport, _) = scripted_session(
        policy,
        vec![Step::Respond(503, "busy"), Step::Respond(200, "ok")],
    )
    .await;

    session
        .post("/items", RequestOptions::new().text("payload").header("X-Trace", "t1"))
        .await
        .unwrap()
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://api.example.com/items");
        assert_eq!(&request.body[..], b"payload");
        assert_eq!(request.headers["X-Trace"], "t1");
    }
}
